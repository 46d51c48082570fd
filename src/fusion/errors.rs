//! Error types for the fusion engine
//!
//! Every public operation returns an explicit `Result`. Configuration errors
//! are fatal to `init`; input errors are scoped to one observation or frame
//! and are logged and skipped; numerical errors are scoped to one track.

use std::fmt;

/// Invalid main-sensor list or strategy parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No main sensor was configured
    EmptyMainSensors,

    /// A main sensor identifier is empty or whitespace
    BlankSensorId,

    /// The same main sensor appears twice
    DuplicateMainSensor(String),

    /// A strategy parameter is out of range
    InvalidParameter {
        /// Parameter name (e.g. "association.gate_cost")
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyMainSensors => write!(f, "Main sensor list is empty"),
            ConfigError::BlankSensorId => write!(f, "Main sensor list contains a blank id"),
            ConfigError::DuplicateMainSensor(id) => {
                write!(f, "Main sensor '{}' is listed more than once", id)
            }
            ConfigError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter {}: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Malformed input. Scoped to one frame or one observation.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// Sensor-to-world transform has NaN or infinite components
    NonFiniteTransform,

    /// Frame timestamp is NaN or infinite
    NonFiniteTimestamp,

    /// Frame is not newer than the last processed frame of its sensor
    TimestampRegression {
        /// Sensor that produced the frame
        sensor: String,
        /// Last accepted timestamp for that sensor
        last: f64,
        /// Timestamp of the rejected frame
        received: f64,
    },

    /// Observation carries a non-finite value
    NonFiniteObservation {
        /// Sensor-local observation id
        observation_id: u32,
        /// Offending field
        field: &'static str,
    },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::NonFiniteTransform => write!(f, "Sensor-to-world transform is not finite"),
            InputError::NonFiniteTimestamp => write!(f, "Frame timestamp is not finite"),
            InputError::TimestampRegression {
                sensor,
                last,
                received,
            } => write!(
                f,
                "Frame from '{}' at {:.6} is not newer than last processed {:.6}",
                sensor, received, last
            ),
            InputError::NonFiniteObservation {
                observation_id,
                field,
            } => write!(
                f,
                "Observation {} has non-finite {}",
                observation_id, field
            ),
        }
    }
}

impl std::error::Error for InputError {}

/// Covariance could not be kept valid.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericalError {
    /// Covariance contains NaN or infinite entries
    NonFiniteCovariance {
        /// Where it happened (e.g. "prediction")
        context: &'static str,
    },

    /// Information matrix could not be inverted
    SingularInformation {
        /// Where it happened
        context: &'static str,
    },
}

impl fmt::Display for NumericalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericalError::NonFiniteCovariance { context } => {
                write!(f, "Non-finite covariance during {}", context)
            }
            NumericalError::SingularInformation { context } => {
                write!(f, "Singular information matrix during {}", context)
            }
        }
    }
}

impl std::error::Error for NumericalError {}

/// Strategy registry misuse.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// A strategy with this name is already registered
    DuplicateStrategy(String),

    /// No strategy with this name is registered
    UnknownStrategy(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateStrategy(name) => {
                write!(f, "Strategy '{}' is already registered", name)
            }
            RegistryError::UnknownStrategy(name) => write!(f, "Unknown strategy '{}'", name),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors returned from engine operations
#[derive(Debug, Clone, PartialEq)]
pub enum FusionError {
    /// `fuse` was called before a successful `init`
    NotInitialized,

    /// Configuration problem
    Config(ConfigError),

    /// Unrecoverable numerical problem
    Numerical(NumericalError),
}

impl fmt::Display for FusionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionError::NotInitialized => write!(f, "Engine used before successful init"),
            FusionError::Config(e) => write!(f, "Configuration error: {}", e),
            FusionError::Numerical(e) => write!(f, "Numerical error: {}", e),
        }
    }
}

impl std::error::Error for FusionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FusionError::Config(e) => Some(e),
            FusionError::Numerical(e) => Some(e),
            FusionError::NotInitialized => None,
        }
    }
}

impl From<ConfigError> for FusionError {
    fn from(e: ConfigError) -> Self {
        FusionError::Config(e)
    }
}

impl From<NumericalError> for FusionError {
    fn from(e: NumericalError) -> Self {
        FusionError::Numerical(e)
    }
}
