//! Error types for Lakshya

use thiserror::Error;

/// Lakshya error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApproachError {
    /// A required capability or parameter is missing at setup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Depth frame missing or sampled depth unusable
    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("No transform available from '{from}' to '{to}'")]
    TransformUnavailable { from: String, to: String },

    /// The alternating sweep around the standoff circle is used up
    #[error("No reachable approach location after {attempts} candidates")]
    RetryExhausted { attempts: u32 },

    /// The object finder could not be reached
    #[error("Communication error: {0}")]
    Communication(String),

    /// Malformed start command, rejected before it reaches the controller
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// The scan succeeded but the detection batch held no matching label
    #[error("Object finder is not seeing any '{label}'")]
    NoMatchingDetection { label: String },

    /// A navigation device call failed
    #[error("Navigation error: {0}")]
    Navigation(String),
}

impl From<toml::de::Error> for ApproachError {
    fn from(e: toml::de::Error) -> Self {
        ApproachError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApproachError>;
