// Error types for dataset loading and configuration

use std::fmt;

use chrono::Weekday;
use thiserror::Error;

// Positional fields of a dataset record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightField {
    DepartureTime,
    Destination,
    Iata,
    FlightNo,
    Days,
}

impl FlightField {
    pub const ALL: [FlightField; 5] = [
        FlightField::DepartureTime,
        FlightField::Destination,
        FlightField::Iata,
        FlightField::FlightNo,
        FlightField::Days,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FlightField::DepartureTime => "departureTime",
            FlightField::Destination => "destination",
            FlightField::Iata => "iata",
            FlightField::FlightNo => "flightNo",
            FlightField::Days => "days",
        }
    }
}

impl fmt::Display for FlightField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// What exactly was wrong with a field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordDefect {
    #[error("field is missing")]
    Missing,

    #[error("field is empty")]
    Empty,

    #[error("unterminated quote")]
    UnterminatedQuote,

    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("unknown weekday {0:?}")]
    UnknownWeekday(String),

    #[error("no operating days")]
    NoDays,

    #[error("weekday {0} listed more than once")]
    DuplicateWeekday(Weekday),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Dataset not found: {0}")]
    ResourceNotFound(String),

    #[error("I/O error while reading dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error while reading dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed record at row {row}, field {field}: {defect}")]
    MalformedRecord {
        row: usize,
        field: FlightField,
        defect: RecordDefect,
    },
}

impl LoadError {
    pub fn malformed(row: usize, field: FlightField, defect: RecordDefect) -> Self {
        LoadError::MalformedRecord { row, field, defect }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::ResourceNotFound(_))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_message_names_row_and_field() {
        let err = LoadError::malformed(
            4,
            FlightField::DepartureTime,
            RecordDefect::InvalidTime("9:0".to_string()),
        );
        let msg = err.to_string();
        assert!(msg.contains("row 4"), "{msg}");
        assert!(msg.contains("departureTime"), "{msg}");
        assert!(msg.contains("9:0"), "{msg}");
    }

    #[test]
    fn test_not_found_predicate() {
        assert!(LoadError::ResourceNotFound("flights.csv".into()).is_not_found());
        assert!(!LoadError::malformed(0, FlightField::Days, RecordDefect::NoDays).is_not_found());
    }
}
