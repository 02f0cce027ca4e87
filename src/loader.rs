// Dataset loading: resolves the configured location and parses every line into a Flight.
// One bad line fails the whole load; there is no partial table.

use std::{fmt, io::Read, str::FromStr, sync::Arc, time::Instant};

use chrono::Weekday;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{ConfigError, FlightField, LoadError, RecordDefect},
    flight::{parse_departure_time, parse_weekday, Flight, FlightTable},
    source::ResourceResolver,
};

// How to treat the first non-blank line of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    // Skip it only if its first field has no digit or colon in it
    #[default]
    Auto,
    Present,
    Absent,
}

impl FromStr for HeaderPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(HeaderPolicy::Auto),
            "present" => Ok(HeaderPolicy::Present),
            "absent" => Ok(HeaderPolicy::Absent),
            _ => Err(ConfigError::InvalidValue {
                key: "header",
                value: s.to_string(),
                expected: "one of auto, present, absent",
            }),
        }
    }
}

#[derive(Clone)]
pub struct DatasetLoader {
    resolver: Arc<dyn ResourceResolver>,
    header: HeaderPolicy,
}

impl fmt::Debug for DatasetLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetLoader")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl DatasetLoader {
    pub fn new(resolver: impl ResourceResolver) -> Self {
        Self::from_shared(Arc::new(resolver))
    }

    pub fn from_shared(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self {
            resolver,
            header: HeaderPolicy::default(),
        }
    }

    pub fn with_header_policy(mut self, header: HeaderPolicy) -> Self {
        self.header = header;
        self
    }

    pub fn header_policy(&self) -> HeaderPolicy {
        self.header
    }

    // ResourceNotFound when the resolver cannot find `location`, Io when it is
    // not UTF-8 text, MalformedRecord for the first line that does not parse.
    pub fn load(&self, location: &str) -> Result<FlightTable, LoadError> {
        let started = Instant::now();

        let mut text = String::new();
        self.resolver.open(location)?.read_to_string(&mut text)?;

        let flights = parse_dataset(&text, self.header)?;

        info!(
            location,
            flights = flights.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "flight dataset loaded"
        );

        Ok(FlightTable::new(flights))
    }
}

// Parses a whole dataset. Row numbers in errors are zero-based physical line
// indexes, so blank and header lines are counted.
pub fn parse_dataset(text: &str, header: HeaderPolicy) -> Result<Vec<Flight>, LoadError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    // No Trim here: an unterminated quote shows up as a field holding a line break
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut flights = Vec::new();
    let mut header_pending = header != HeaderPolicy::Absent;
    let mut record = StringRecord::new();

    while reader.read_record(&mut record)? {
        let row = record
            .position()
            .map_or(0, |pos| pos.line().saturating_sub(1) as usize);

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if header_pending {
            header_pending = false;
            if header == HeaderPolicy::Present || looks_like_header(&record) {
                debug!(row, "skipping header line");
                continue;
            }
        }

        flights.push(parse_record(row, &record)?);
    }

    Ok(flights)
}

// A header's first field has nothing time-shaped in it; anything with a digit
// or a colon is treated as data and must parse.
fn looks_like_header(record: &StringRecord) -> bool {
    let first = record.get(0).unwrap_or_default();
    !first.chars().any(|c| c.is_ascii_digit() || c == ':')
}

// Parses one record: HH:MM, destination, iata, flightNo, days...
// Every field from the fifth on belongs to the day list, and inside a field
// days are separated by '/' or ','.
pub fn parse_record(row: usize, record: &StringRecord) -> Result<Flight, LoadError> {
    if let Some(index) = record.iter().position(|field| field.contains(['\n', '\r'])) {
        let field = FlightField::ALL
            .get(index)
            .copied()
            .unwrap_or(FlightField::Days);
        return Err(LoadError::malformed(row, field, RecordDefect::UnterminatedQuote));
    }

    let text = |field: FlightField| -> Result<&str, LoadError> {
        let value = record
            .get(field as usize)
            .map(str::trim)
            .ok_or_else(|| LoadError::malformed(row, field, RecordDefect::Missing))?;

        if value.is_empty() {
            return Err(LoadError::malformed(row, field, RecordDefect::Empty));
        }
        Ok(value)
    };

    let raw_time = text(FlightField::DepartureTime)?;
    let departure_time = parse_departure_time(raw_time).ok_or_else(|| {
        LoadError::malformed(
            row,
            FlightField::DepartureTime,
            RecordDefect::InvalidTime(raw_time.to_string()),
        )
    })?;

    let destination = text(FlightField::Destination)?.to_string();
    let iata = text(FlightField::Iata)?.to_string();
    let flight_no = text(FlightField::FlightNo)?.to_string();

    if record.len() <= FlightField::Days as usize {
        return Err(LoadError::malformed(row, FlightField::Days, RecordDefect::Missing));
    }
    let days = parse_days(record.iter().skip(FlightField::Days as usize))
        .map_err(|defect| LoadError::malformed(row, FlightField::Days, defect))?;

    Ok(Flight {
        departure_time,
        destination,
        iata,
        flight_no,
        days,
    })
}

fn parse_days<'a>(fields: impl Iterator<Item = &'a str>) -> Result<Vec<Weekday>, RecordDefect> {
    let mut days = Vec::with_capacity(7);

    let tokens = fields
        .flat_map(|field| field.split(['/', ',']))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    for token in tokens {
        let day =
            parse_weekday(token).ok_or_else(|| RecordDefect::UnknownWeekday(token.to_string()))?;
        if days.contains(&day) {
            return Err(RecordDefect::DuplicateWeekday(day));
        }
        days.push(day);
    }

    if days.is_empty() {
        return Err(RecordDefect::NoDays);
    }
    Ok(days)
}
