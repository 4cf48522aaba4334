//! Track, car and driver summary of the current session

use serde::{Deserialize, Serialize};

use super::{QueryError, SessionText};

/// The handful of session facts most consumers need.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    /// Track display name, falling back to the internal track name
    pub track_name: String,
    pub track_config: Option<String>,
    /// Leading number of the published track length
    pub track_length_km: Option<f64>,
    /// Car index of the local player
    pub driver_car_idx: Option<i32>,
    pub driver_name: Option<String>,
    /// Car screen name, falling back to the car path
    pub car_name: Option<String>,
    /// Session info update counter the summary was read from
    pub update: i32,
}

fn optional<T>(result: Result<T, QueryError>) -> Result<Option<T>, QueryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(QueryError::NotFound { .. } | QueryError::EmptyValue { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

impl SessionSummary {
    /// Extract the summary; fails only when no track name is published.
    pub fn from_text(text: &SessionText<'_>) -> Result<Self, QueryError> {
        let track_name = match text.as_owned_string("WeekendInfo:TrackDisplayName") {
            Ok(name) => name,
            Err(QueryError::NotFound { .. } | QueryError::EmptyValue { .. }) => {
                text.as_owned_string("WeekendInfo:TrackName")?
            }
            Err(e) => return Err(e),
        };

        let track_config = optional(text.as_owned_string("WeekendInfo:TrackConfigName"))?;
        let track_length_km = optional(text.as_measure("WeekendInfo:TrackLength"))
            .ok()
            .flatten()
            .map(|(length, _unit)| length);
        let driver_car_idx = optional(text.as_int("DriverInfo:DriverCarIdx")).ok().flatten();

        let (driver_name, car_name) = match driver_car_idx {
            Some(idx) => {
                let field = |name: &str| {
                    optional(text.as_owned_string(&format!("DriverInfo:Drivers:CarIdx:{{{}}}{}", idx, name)))
                };
                let car_name = match field("CarScreenName")? {
                    Some(name) => Some(name),
                    None => field("CarPath")?,
                };
                (field("UserName")?, car_name)
            }
            None => (None, None),
        };

        Ok(Self {
            track_name,
            track_config,
            track_length_km,
            driver_car_idx,
            driver_name,
            car_name,
            update: text.update(),
        })
    }
}
