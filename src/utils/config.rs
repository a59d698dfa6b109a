use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::utils::geo::AreaBoundary;

pub const TOKEN_VAR: &str = "TELOXIDE_TOKEN";
pub const DATA_VAR: &str = "PACZKA_BOT_DATA";
pub const PHOTO_FLOW_VAR: &str = "PACZKA_BOT_PHOTO_FLOW";
pub const AREA_VAR: &str = "PACZKA_BOT_AREA";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("you have to set {0}")]
    Missing(&'static str),
    #[error("{var} must be one of true/false/1/0/yes/no, got '{value}'")]
    Flag { var: &'static str, value: String },
    #[error("{var} must be 'min_lat,max_lat,min_lon,max_lon', got '{value}'")]
    Area { var: &'static str, value: String },
}

/// Settings fixed for the lifetime of the process.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub token: String,
    pub area: AreaBoundary,
    pub photo_flow: bool,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(TOKEN_VAR)
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing(TOKEN_VAR))?;

        let photo_flow = match lookup(PHOTO_FLOW_VAR) {
            Some(value) => parse_flag(PHOTO_FLOW_VAR, &value)?,
            None => true,
        };

        let area = match lookup(AREA_VAR) {
            Some(value) => parse_area(AREA_VAR, &value)?,
            None => AreaBoundary::tri_city(),
        };

        let data_dir = lookup(DATA_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Config {
            token,
            area,
            photo_flow,
            data_dir,
        })
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Flag {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_area(var: &'static str, value: &str) -> Result<AreaBoundary, ConfigError> {
    let invalid = || ConfigError::Area {
        var,
        value: value.to_string(),
    };
    let bounds = value
        .split(',')
        .map(|bound| bound.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| invalid())?;
    match bounds[..] {
        [min_lat, max_lat, min_lon, max_lon] if bounds.iter().all(|b| b.is_finite()) => {
            Ok(AreaBoundary::new(min_lat, max_lat, min_lon, max_lon))
        }
        _ => Err(invalid()),
    }
}
