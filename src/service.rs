// Service layer between the results resource and the repository

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::{flight::Flight, repository::FlightInfoRepository};

#[async_trait]
pub trait FlightInfoService: Send + Sync + 'static {
    // Flights for the travel date sorted by departure time, None if there is no dataset
    async fn find_flight_by_date(&self, travel_date: NaiveDate) -> Option<Vec<Flight>>;
}

pub struct RepositoryService<R> {
    repository: R,
}

impl<R: FlightInfoRepository> RepositoryService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

#[async_trait]
impl<R: FlightInfoRepository> FlightInfoService for RepositoryService<R> {
    async fn find_flight_by_date(&self, travel_date: NaiveDate) -> Option<Vec<Flight>> {
        let flights = self.repository.find_flights_by_date(travel_date).await;
        debug!(%travel_date, found = flights.is_some(), "service lookup");
        flights
    }
}
