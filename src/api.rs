// HTTP-facing resource: turns a travel date string into a status code and JSON body.
// Transport agnostic; a web framework handler only has to copy status and body across.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{flight::Flight, service::FlightInfoService};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    NoContent,
    BadRequest,
}

impl ResponseStatus {
    pub fn code(self) -> u16 {
        match self {
            ResponseStatus::Ok => 200,
            ResponseStatus::NoContent => 204,
            ResponseStatus::BadRequest => 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Empty,
    Flights(Vec<Flight>),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: ResponseStatus,
    pub body: ResponseBody,
}

impl ApiResponse {
    fn flights(flights: Vec<Flight>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            body: ResponseBody::Flights(flights),
        }
    }

    fn no_content() -> Self {
        Self {
            status: ResponseStatus::NoContent,
            body: ResponseBody::Empty,
        }
    }

    fn bad_request(error: &str, message: String) -> Self {
        Self {
            status: ResponseStatus::BadRequest,
            body: ResponseBody::Error(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        }
    }

    pub fn has_body(&self) -> bool {
        !matches!(self.body, ResponseBody::Empty)
    }

    // None for 204 responses
    pub fn body_json(&self) -> Result<Option<String>, serde_json::Error> {
        match &self.body {
            ResponseBody::Empty => Ok(None),
            ResponseBody::Flights(flights) => serde_json::to_string(flights).map(Some),
            ResponseBody::Error(error) => serde_json::to_string(error).map(Some),
        }
    }
}

pub struct FlightInfoResource<S> {
    service: S,
}

impl<S: FlightInfoService> FlightInfoResource<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    // Handles a results request for a `YYYY-MM-DD` travel date.
    // 200 with the flights when any operate that day; 204 when none do or the
    // dataset is unavailable; 400 when the date does not parse.
    pub async fn get_results(&self, travel_date: &str) -> ApiResponse {
        let date = match NaiveDate::parse_from_str(travel_date.trim(), DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                warn!(travel_date, "rejecting request with invalid date: {e}");
                return ApiResponse::bad_request(
                    "invalid_date",
                    format!("travel date {travel_date:?} is not a YYYY-MM-DD date"),
                );
            }
        };

        match self.service.find_flight_by_date(date).await {
            Some(flights) if !flights.is_empty() => {
                debug!(%date, count = flights.len(), "returning flights");
                ApiResponse::flights(flights)
            }
            Some(_) => ApiResponse::no_content(),
            None => {
                warn!(%date, "no flight dataset available");
                ApiResponse::no_content()
            }
        }
    }
}
