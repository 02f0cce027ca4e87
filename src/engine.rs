// Flight query engine: loads the dataset at most once and answers schedule queries from it

use std::sync::{
    atomic::{AtomicU8, AtomicUsize, Ordering},
    Arc,
};

use chrono::{NaiveDate, Weekday};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::{
    config::DataSourceConfig,
    error::LoadError,
    flight::{Flight, FlightTable},
    loader::DatasetLoader,
    query,
};

// Lifecycle of the backing table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Unloaded,
    Loading,
    Loaded,
    LoadFailed,
}

impl TableState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TableState::Unloaded,
            1 => TableState::Loading,
            2 => TableState::Loaded,
            _ => TableState::LoadFailed,
        }
    }
}

enum TableSlot {
    Unloaded,
    Loaded(FlightTable),
    Failed(Arc<LoadError>),
}

// Answers `find_all` and `find_by_date` against a table loaded at most once.
// The first query (or `table()`) triggers the load. Callers racing on a load
// wait on the slot's write lock and then take its outcome, so one physical load
// runs per wave of concurrent callers, retries included. Once loaded, queries
// only hold the read lock long enough to clone the table handle.
pub struct FlightQueryEngine {
    loader: Option<DatasetLoader>,
    location: String,
    retry_failed_load: bool,
    slot: RwLock<TableSlot>,
    state: AtomicU8,
    load_attempts: AtomicUsize,
    // Bumped under the write lock once an outcome is stored
    completed_loads: AtomicUsize,
}

impl FlightQueryEngine {
    // Lazy: nothing is read until the first query
    pub fn new(loader: DatasetLoader, location: impl Into<String>) -> Self {
        Self {
            loader: Some(loader),
            location: location.into(),
            retry_failed_load: false,
            slot: RwLock::new(TableSlot::Unloaded),
            state: AtomicU8::new(TableState::Unloaded as u8),
            load_attempts: AtomicUsize::new(0),
            completed_loads: AtomicUsize::new(0),
        }
    }

    // Eager: the table was built by an explicit initialisation step
    pub fn from_table(table: FlightTable) -> Self {
        Self {
            loader: None,
            location: String::new(),
            retry_failed_load: false,
            slot: RwLock::new(TableSlot::Loaded(table)),
            state: AtomicU8::new(TableState::Loaded as u8),
            load_attempts: AtomicUsize::new(0),
            completed_loads: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &DataSourceConfig) -> Self {
        Self::new(config.loader(), config.csv_location.clone())
            .retry_failed_load(config.retry_failed_load)
    }

    // When set, every query after a failed load makes a fresh attempt until one
    // succeeds. Off by default, in which case a failure is final.
    pub fn retry_failed_load(mut self, retry: bool) -> Self {
        self.retry_failed_load = retry;
        self
    }

    pub fn state(&self) -> TableState {
        TableState::from_u8(self.state.load(Ordering::Acquire))
    }

    // Number of physical loads performed so far
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::Acquire)
    }

    pub fn load_error(&self) -> Option<Arc<LoadError>> {
        match &*self.slot.read() {
            TableSlot::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    // Returns the loaded table, loading it first if needed.
    pub fn table(&self) -> Result<FlightTable, Arc<LoadError>> {
        let seen = self.completed_loads.load(Ordering::Acquire);

        if let Some(outcome) = self.settled(&self.slot.read()) {
            return outcome;
        }

        let mut slot = self.slot.write();
        // Another caller may have finished loading while we waited for the lock
        if let Some(outcome) = self.settled(&slot) {
            return outcome;
        }
        // With retry on, a failure stored after we arrived is still our answer
        if let TableSlot::Failed(err) = &*slot {
            if self.completed_loads.load(Ordering::Acquire) != seen {
                return Err(err.clone());
            }
        }

        let outcome = self.load_now();
        *slot = match &outcome {
            Ok(table) => TableSlot::Loaded(table.clone()),
            Err(err) => TableSlot::Failed(err.clone()),
        };
        self.completed_loads.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    // Every flight in dataset order, or `None` if no dataset could be loaded.
    pub fn find_all(&self) -> Option<FlightTable> {
        self.table().ok()
    }

    // Flights operating on the weekday of `date`, ordered by departure time.
    // `Some(vec![])` means the dataset is loaded but nothing flies that day;
    // `None` means there is no dataset.
    pub fn find_by_date(&self, date: NaiveDate) -> Option<Vec<Flight>> {
        let table = self.table().ok()?;
        let flights = query::flights_on_date(&table, date);
        debug!(%date, matches = flights.len(), "flights by date");
        Some(flights)
    }

    pub fn find_by_weekday(&self, weekday: Weekday) -> Option<Vec<Flight>> {
        let table = self.table().ok()?;
        Some(query::flights_on_weekday(&table, weekday))
    }

    fn settled(&self, slot: &TableSlot) -> Option<Result<FlightTable, Arc<LoadError>>> {
        match slot {
            TableSlot::Loaded(table) => Some(Ok(table.clone())),
            TableSlot::Failed(err) if !self.retry_failed_load => Some(Err(err.clone())),
            _ => None,
        }
    }

    // Caller must hold the slot write lock
    fn load_now(&self) -> Result<FlightTable, Arc<LoadError>> {
        let Some(loader) = &self.loader else {
            // from_table engines start Loaded and never get here
            return Err(Arc::new(LoadError::ResourceNotFound(self.location.clone())));
        };

        self.state.store(TableState::Loading as u8, Ordering::Release);
        let attempt = self.load_attempts.fetch_add(1, Ordering::AcqRel) + 1;
        info!(location = %self.location, attempt, "loading flight dataset");

        match loader.load(&self.location) {
            Ok(table) => {
                self.state.store(TableState::Loaded as u8, Ordering::Release);
                Ok(table)
            }
            Err(err) => {
                warn!(location = %self.location, attempt, error = %err, "flight dataset failed to load");
                self.state.store(TableState::LoadFailed as u8, Ordering::Release);
                Err(Arc::new(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{FlightField, RecordDefect},
        source::{InMemoryResolver, ResourceResolver},
    };
    use chrono::NaiveTime;
    use std::{io::Read, sync::Barrier, thread, time::Duration};

    // Counts opens and can be made slow to widen race windows
    struct CountingResolver {
        inner: InMemoryResolver,
        opens: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl ResourceResolver for CountingResolver {
        fn open(&self, location: &str) -> Result<Box<dyn Read + Send>, LoadError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.inner.open(location)
        }
    }

    fn counting_engine(data: &'static str, delay: Duration) -> (FlightQueryEngine, Arc<AtomicUsize>) {
        let opens = Arc::new(AtomicUsize::new(0));
        let resolver = CountingResolver {
            inner: InMemoryResolver::new().with_resource("flights.csv", data),
            opens: opens.clone(),
            delay,
        };
        let engine = FlightQueryEngine::new(DatasetLoader::new(resolver), "flights.csv");
        (engine, opens)
    }

    fn sample_engine() -> FlightQueryEngine {
        FlightQueryEngine::from_config(&DataSourceConfig::default())
    }

    fn hhmm(flights: &[Flight]) -> Vec<String> {
        flights
            .iter()
            .map(|f| f.departure_time.format("%H:%M").to_string())
            .collect()
    }

    const EXPECTED_TIMES: [&str; 9] = [
        "09:00", "09:00", "10:15", "10:35", "11:00", "11:05", "11:10", "13:00", "15:35",
    ];

    #[test]
    fn test_find_all_sample() {
        let engine = sample_engine();
        assert_eq!(engine.state(), TableState::Unloaded);

        let flights = engine.find_all().unwrap();
        assert_eq!(engine.state(), TableState::Loaded);
        assert_eq!(flights.len(), 27);
        assert_eq!(flights[0].departure_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(flights[0].destination, "Antigua");
        assert_eq!(flights[0].iata, "ANU");
        assert_eq!(flights[0].flight_no, "VS033");
        assert_eq!(flights[0].days, vec![Weekday::Tue]);
    }

    #[test]
    fn test_find_by_date_monday() {
        let engine = sample_engine();
        // 2022-09-26 is a Monday
        let flights = engine
            .find_by_date(NaiveDate::from_ymd_opt(2022, 9, 26).unwrap())
            .unwrap();

        assert_eq!(flights.len(), 9);
        assert!(flights.iter().all(|f| f.runs_on(Weekday::Mon)));
        assert_eq!(hhmm(&flights), EXPECTED_TIMES);

        // Barbados precedes Havana in the file; both leave at 09:00
        assert_eq!(flights[0].iata, "BGI");
        assert_eq!(flights[1].iata, "HAV");
    }

    #[test]
    fn test_find_by_date_thursday() {
        let engine = sample_engine();
        // 2022-07-07 is a Thursday
        let flights = engine
            .find_by_date(NaiveDate::from_ymd_opt(2022, 7, 7).unwrap())
            .unwrap();

        assert_eq!(flights.len(), 9);
        assert!(flights.iter().all(|f| f.runs_on(Weekday::Thu)));
        assert_eq!(hhmm(&flights), EXPECTED_TIMES);
    }

    #[test]
    fn test_empty_match_is_present() {
        let (engine, _) = counting_engine("09:00,Antigua,ANU,VS033,Tuesday\n", Duration::ZERO);
        // 2022-09-28 is a Wednesday
        let flights = engine.find_by_date(NaiveDate::from_ymd_opt(2022, 9, 28).unwrap());
        assert_eq!(flights, Some(vec![]));
        assert_eq!(engine.find_by_weekday(Weekday::Tue).map(|f| f.len()), Some(1));
    }

    #[test]
    fn test_load_failure_is_absent() {
        let (engine, opens) = counting_engine(
            "09:00,Antigua,ANU,VS033,Tuesday\n9:0,Dubai,DXB,VS400,Friday\n",
            Duration::ZERO,
        );

        assert!(engine.find_all().is_none());
        assert!(engine.find_by_date(NaiveDate::from_ymd_opt(2022, 9, 27).unwrap()).is_none());
        assert_eq!(engine.state(), TableState::LoadFailed);

        // No retry by default
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(engine.load_attempts(), 1);

        match engine.load_error().as_deref() {
            Some(LoadError::MalformedRecord { row, field, defect }) => {
                assert_eq!(*row, 1);
                assert_eq!(*field, FlightField::DepartureTime);
                assert_eq!(*defect, RecordDefect::InvalidTime("9:0".to_string()));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_dataset_is_absent() {
        let engine = FlightQueryEngine::new(DatasetLoader::new(InMemoryResolver::new()), "flights.csv");
        assert!(engine.find_all().is_none());
        assert!(engine.table().unwrap_err().is_not_found());
    }

    #[test]
    fn test_retry_after_failure() {
        let resolver = Arc::new(InMemoryResolver::new());
        let engine = FlightQueryEngine::new(DatasetLoader::from_shared(resolver.clone()), "flights.csv")
            .retry_failed_load(true);

        assert!(engine.find_all().is_none());
        assert!(engine.find_all().is_none());
        assert_eq!(engine.load_attempts(), 2);

        resolver.insert("flights.csv", "09:00,Antigua,ANU,VS033,Tuesday\n");
        assert_eq!(engine.find_all().map(|t| t.len()), Some(1));
        assert_eq!(engine.state(), TableState::Loaded);
        assert!(engine.load_error().is_none());

        // Loaded is terminal
        resolver.remove("flights.csv");
        assert_eq!(engine.find_all().map(|t| t.len()), Some(1));
        assert_eq!(engine.load_attempts(), 3);
    }

    #[test]
    fn test_find_all_is_idempotent_without_reparsing() {
        let (engine, opens) = counting_engine(
            "09:00,Antigua,ANU,VS033,Tuesday\n10:00,Dubai,DXB,VS400,Friday\n",
            Duration::ZERO,
        );

        let first = engine.find_all().unwrap();
        let second = engine.find_all().unwrap();
        let _ = engine.find_by_date(NaiveDate::from_ymd_opt(2022, 9, 30).unwrap());

        assert_eq!(first, second);
        assert!(first.shares_rows_with(&second));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_load_is_single_flight() {
        let (engine, opens) = counting_engine(
            "09:00,Antigua,ANU,VS033,Tuesday\n10:00,Dubai,DXB,VS400,Friday\n",
            Duration::from_millis(100),
        );
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || engine.find_all().unwrap())
            })
            .collect();

        let tables: Vec<FlightTable> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(engine.load_attempts(), 1);
        assert!(tables.iter().all(|t| t.shares_rows_with(&tables[0])));
    }

    #[test]
    fn test_concurrent_retry_shares_one_failed_load() {
        let (engine, opens) = counting_engine(
            "09:00,Antigua,ANU,VS033,Tuesday\n9:0,Dubai,DXB,VS400,Friday\n",
            Duration::from_millis(200),
        );
        let engine = Arc::new(engine.retry_failed_load(true));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    engine.table()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_err());
        }
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(engine.load_attempts(), 1);

        // A later caller still gets a fresh attempt
        assert!(engine.find_all().is_none());
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_table_never_loads() {
        let table = FlightTable::from(vec![Flight::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            "Antigua",
            "ANU",
            "VS033",
            vec![Weekday::Tue],
        )]);
        let engine = FlightQueryEngine::from_table(table.clone());

        assert_eq!(engine.state(), TableState::Loaded);
        assert!(engine.find_all().unwrap().shares_rows_with(&table));
        assert_eq!(engine.load_attempts(), 0);
    }

    #[test]
    fn test_queries_do_not_mutate_table() {
        let engine = sample_engine();
        let before = engine.find_all().unwrap().to_vec();
        let _ = engine.find_by_date(NaiveDate::from_ymd_opt(2022, 9, 26).unwrap());
        assert_eq!(engine.find_all().unwrap().to_vec(), before);
    }
}
