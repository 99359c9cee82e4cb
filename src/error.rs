//! Error types for the parts of this crate that can actually fail. The protocol engine itself
//! never returns an error: a malformed or out-of-turn message is a transient condition handled
//! by dropping or replying, not by propagating a `Result`. Configuration loading is the one
//! place a caller needs a typed failure to match on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    NotFound {
        path: String,
        #[source]
        source: config::ConfigError,
    },

    #[error("could not parse config file {path:?}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: config::ConfigError,
    },

    #[error("config field {field:?} has an invalid value: {source}")]
    InvalidField {
        field: String,
        #[source]
        source: config::ConfigError,
    },
}
