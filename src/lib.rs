// Flight schedule library: loads a static flight dataset and answers "what flies on this date" queries

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod flight;
pub mod loader;
pub mod query;
pub mod repository;
pub mod service;
pub mod source;

// Re-export key types for convenience
pub use config::DataSourceConfig;
pub use engine::{FlightQueryEngine, TableState};
pub use error::{ConfigError, FlightField, LoadError, RecordDefect};
pub use flight::{Flight, FlightTable};
pub use loader::{DatasetLoader, HeaderPolicy};
pub use repository::{EngineRepository, FlightInfoRepository};
pub use service::{FlightInfoService, RepositoryService};
pub use source::{FileSystemResolver, InMemoryResolver, ResourceResolver};
