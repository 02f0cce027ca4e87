// Flight records and the shared, immutable table that holds them

use std::{ops::Deref, sync::Arc};

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

// One scheduled service. Serialises as
// {"departureTime":"09:00","destination":..,"iata":..,"flightNo":..,"days":["MONDAY",..]}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    #[serde(with = "hh_mm")]
    pub departure_time: NaiveTime,
    pub destination: String,
    pub iata: String,
    pub flight_no: String,
    // Parse order is kept, not calendar order
    #[serde(with = "weekday_names")]
    pub days: Vec<Weekday>,
}

impl Flight {
    pub fn new(
        departure_time: NaiveTime,
        destination: impl Into<String>,
        iata: impl Into<String>,
        flight_no: impl Into<String>,
        days: Vec<Weekday>,
    ) -> Self {
        Self {
            departure_time,
            destination: destination.into(),
            iata: iata.into(),
            flight_no: flight_no.into(),
            days,
        }
    }

    pub fn runs_on(&self, weekday: Weekday) -> bool {
        self.days.contains(&weekday)
    }
}

// Ordered flights in dataset order.
// Cloning is cheap: every clone shares the same rows, and nothing hands out
// mutable access to them once the table is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightTable {
    flights: Arc<[Flight]>,
}

impl FlightTable {
    pub fn new(flights: Vec<Flight>) -> Self {
        Self {
            flights: Arc::from(flights),
        }
    }

    // True when both handles point at the same loaded rows
    pub fn shares_rows_with(&self, other: &FlightTable) -> bool {
        Arc::ptr_eq(&self.flights, &other.flights)
    }
}

impl Default for FlightTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Flight>> for FlightTable {
    fn from(flights: Vec<Flight>) -> Self {
        Self::new(flights)
    }
}

impl Deref for FlightTable {
    type Target = [Flight];

    fn deref(&self) -> &[Flight] {
        &self.flights
    }
}

impl<'a> IntoIterator for &'a FlightTable {
    type Item = &'a Flight;
    type IntoIter = std::slice::Iter<'a, Flight>;

    fn into_iter(self) -> Self::IntoIter {
        self.flights.iter()
    }
}

// Parses a strict 24-hour `HH:MM` time. `9:00`, `9:0` and `24:00` are rejected.
pub fn parse_departure_time(value: &str) -> Option<NaiveTime> {
    let b = value.as_bytes();
    if b.len() != 5 || b[2] != b':' || !b[..2].iter().chain(&b[3..]).all(u8::is_ascii_digit) {
        return None;
    }

    let hour = u32::from(b[0] - b'0') * 10 + u32::from(b[1] - b'0');
    let minute = u32::from(b[3] - b'0') * 10 + u32::from(b[4] - b'0');
    NaiveTime::from_hms_opt(hour, minute, 0)
}

// Full weekday names and three letter abbreviations, any case.
pub fn parse_weekday(token: &str) -> Option<Weekday> {
    let weekday = match token.to_ascii_lowercase().as_str() {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

mod hh_mm {
    use chrono::NaiveTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_departure_time(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid time {value:?}, expected HH:MM")))
    }
}

mod weekday_names {
    use chrono::Weekday;
    use serde::{de::Error as _, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(days.len()))?;
        for day in days {
            seq.serialize_element(super::weekday_name(*day))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Weekday>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|token| {
                super::parse_weekday(token)
                    .ok_or_else(|| D::Error::custom(format!("unknown weekday {token:?}")))
            })
            .collect()
    }
}
