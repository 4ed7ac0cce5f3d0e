//! Typed error definitions for the status engine.
//!
//! [`StatusError`] covers everything that can stop the tick loop; the
//! [`ConfigError`] family covers problems found while registering modules.
//! Both implement `std::error::Error` via `thiserror`, so they compose with
//! `anyhow::Result` in the runner.

use thiserror::Error;

/// Convenience alias used across the engine crates.
pub type Result<T, E = StatusError> = std::result::Result<T, E>;

/// Errors raised by the protocol engine.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The input stream ended: closed, interrupted, or an empty line arrived.
    ///
    /// This is the normal way for a session to finish, not a failure.
    #[error("end of stream")]
    EndOfStream,

    /// Reading from or writing to the underlying byte streams failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A tick line could not be parsed as a JSON array.
    #[error("malformed tick line {line:?}: {source}")]
    Protocol {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing a tick array back to JSON failed.
    #[error("failed to serialize tick: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A module could not be registered.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StatusError {
    /// Returns `true` for the end-of-stream condition.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, StatusError::EndOfStream)
    }
}

/// Errors raised while turning user configuration into module instances.
///
/// Every message starts with the offending module's name so the user can fix
/// the configuration without reading source.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting key the module does not declare.
    #[error("Module '{module}': invalid option '{key}'")]
    InvalidOption { module: String, key: String },

    /// Required settings that were not supplied.
    #[error("Module '{module}': missing required options: {}", .missing.join(", "))]
    MissingOptions { module: String, missing: Vec<String> },

    /// A setting whose value does not have the expected shape.
    #[error("Module '{module}': invalid value for option '{key}': {reason}")]
    InvalidValue {
        module: String,
        key: String,
        reason: String,
    },

    /// More than one concrete module kind in one candidate source.
    #[error(
        "Module '{module}': ambiguous module specification, found multiple classes: {}",
        .classes.join(", ")
    )]
    Ambiguous { module: String, classes: Vec<String> },

    /// No concrete module kind in the candidate source.
    #[error("Module '{module}': no class found")]
    NoClass { module: String },

    /// Constructor arguments were supplied alongside a pre-built instance.
    #[error("Module '{module}': additional arguments are invalid for a pre-built module")]
    PrebuiltWithArguments { module: String },

    /// Positional arguments that cannot be interpreted as a settings mapping.
    #[error("Module '{module}': invalid positional arguments: {reason}")]
    InvalidArguments { module: String, reason: String },

    /// A module source identifier that is not in the catalog.
    #[error("Module '{module}': unknown module")]
    UnknownModule { module: String },

    /// Two module sources registered under the same identifier.
    #[error("Module '{module}': duplicate module source")]
    DuplicateSource { module: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_module() {
        let err = ConfigError::InvalidOption {
            module: "CpuFreq".into(),
            key: "foo".into(),
        };
        assert_eq!(err.to_string(), "Module 'CpuFreq': invalid option 'foo'");

        let err = ConfigError::MissingOptions {
            module: "Clock".into(),
            missing: vec!["format".into(), "zone".into()],
        };
        assert_eq!(
            err.to_string(),
            "Module 'Clock': missing required options: format, zone"
        );
    }

    #[test]
    fn ambiguous_lists_every_class() {
        let err = ConfigError::Ambiguous {
            module: "bundle".into(),
            classes: vec!["Alpha".into(), "Beta".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Alpha"));
        assert!(msg.contains("Beta"));
    }

    #[test]
    fn config_error_converts_into_status_error() {
        let err: StatusError = ConfigError::NoClass { module: "x".into() }.into();
        assert!(matches!(err, StatusError::Config(ConfigError::NoClass { .. })));
        assert!(!err.is_end_of_stream());
        assert!(StatusError::EndOfStream.is_end_of_stream());
    }
}
