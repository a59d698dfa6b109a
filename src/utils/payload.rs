use std::fmt;
use std::num::ParseFloatError;
use std::str::FromStr;

use thiserror::Error;

use crate::utils::geo::Coordinate;

pub const OPEN_MAP: &str = "mapa";
pub const SEND_PHOTO: &str = "send_photo";
pub const MARK_TAG: &str = "mark";

const SEPARATOR: char = '|';

/// Routing of the data attached to an inline button.
#[derive(Clone, Debug, PartialEq)]
pub enum CallbackData {
    OpenMap,
    SendPhoto,
    /// Anything else is a marker candidate and gets validated by
    /// [`MarkerPayload::from_str`], so unknown payloads surface as a
    /// user-facing error instead of being dropped.
    Marker(String),
}

impl CallbackData {
    pub fn parse(data: &str) -> CallbackData {
        match data {
            OPEN_MAP => CallbackData::OpenMap,
            SEND_PHOTO => CallbackData::SendPhoto,
            other => CallbackData::Marker(other.to_owned()),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MarkerError {
    #[error("expected 3 fields, got {0}")]
    FieldCount(usize),
    #[error("unknown tag '{0}'")]
    Tag(String),
    #[error("invalid latitude: {0}")]
    Latitude(ParseFloatError),
    #[error("invalid longitude: {0}")]
    Longitude(ParseFloatError),
}

/// Point the user confirmed as the parcel location, carried in the button
/// data as `mark|<lat>|<lon>`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerPayload {
    pub latitude: f64,
    pub longitude: f64,
}

impl MarkerPayload {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl From<Coordinate> for MarkerPayload {
    fn from(coordinate: Coordinate) -> Self {
        MarkerPayload {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        }
    }
}

impl fmt::Display for MarkerPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{MARK_TAG}{SEPARATOR}{:?}{SEPARATOR}{:?}",
            self.latitude, self.longitude
        )
    }
}

impl FromStr for MarkerPayload {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(SEPARATOR).collect();
        let [tag, latitude, longitude] = fields[..] else {
            return Err(MarkerError::FieldCount(fields.len()));
        };
        if tag != MARK_TAG {
            return Err(MarkerError::Tag(tag.to_owned()));
        }
        Ok(MarkerPayload {
            latitude: latitude.trim().parse().map_err(MarkerError::Latitude)?,
            longitude: longitude.trim().parse().map_err(MarkerError::Longitude)?,
        })
    }
}
