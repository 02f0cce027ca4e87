// Pure schedule queries over a slice of flights. Nothing here allocates beyond the result.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::flight::Flight;

// Flights running on `weekday`, ordered by departure time.
// The sort is stable, so flights leaving at the same minute keep table order.
pub fn flights_on_weekday(flights: &[Flight], weekday: Weekday) -> Vec<Flight> {
    let mut selected: Vec<Flight> = flights
        .iter()
        .filter(|flight| flight.runs_on(weekday))
        .cloned()
        .collect();

    selected.sort_by_key(|flight| flight.departure_time);
    selected
}

// Calendar date, no timezone involved
pub fn flights_on_date(flights: &[Flight], date: NaiveDate) -> Vec<Flight> {
    flights_on_weekday(flights, date.weekday())
}
