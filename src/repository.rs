// Async facade over the query engine for callers living on a Tokio runtime

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::error;

use crate::{
    engine::FlightQueryEngine,
    flight::{Flight, FlightTable},
};

#[async_trait]
pub trait FlightInfoRepository: Send + Sync + 'static {
    // All flights, None if there is no dataset
    async fn find_all(&self) -> Option<FlightTable>;

    // Flights for the travel date sorted by departure time, None if there is no dataset
    async fn find_flights_by_date(&self, travel_date: NaiveDate) -> Option<Vec<Flight>>;
}

// Runs engine calls on the blocking pool. The first call may read the dataset
// from disk and must not stall an async worker while doing so.
#[derive(Clone)]
pub struct EngineRepository {
    engine: Arc<FlightQueryEngine>,
}

impl EngineRepository {
    pub fn new(engine: Arc<FlightQueryEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<FlightQueryEngine> {
        &self.engine
    }

    async fn run<T, F>(&self, op: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&FlightQueryEngine) -> Option<T> + Send + 'static,
    {
        let engine = self.engine.clone();
        match tokio::task::spawn_blocking(move || op(&engine)).await {
            Ok(result) => result,
            Err(e) => {
                error!("flight query task failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl FlightInfoRepository for EngineRepository {
    async fn find_all(&self) -> Option<FlightTable> {
        self.run(|engine| engine.find_all()).await
    }

    async fn find_flights_by_date(&self, travel_date: NaiveDate) -> Option<Vec<Flight>> {
        self.run(move |engine| engine.find_by_date(travel_date)).await
    }
}
