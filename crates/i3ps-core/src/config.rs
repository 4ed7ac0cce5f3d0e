//! Configuration parsing for the status engine.
//!
//! The whole setup lives in one JSON file: engine options plus a `modules`
//! array where each entry describes one module instance to register.
//!
//! # Example config
//!
//! ```json
//! {
//!   "standalone": false,
//!   "interval": 1.0,
//!   "log_level": "info",
//!   "modules": [
//!     { "module": "cpu_freq", "position": 0, "settings": { "format": "{avgg} GHz" } }
//!   ]
//! }
//! ```

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Default pause between simulated ticks in standalone mode, in seconds.
pub const DEFAULT_STANDALONE_INTERVAL_SECS: f64 = 1.0;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Run without a protocol host, fabricating empty ticks.
    pub standalone: Option<bool>,

    /// Seconds between simulated ticks in standalone mode.
    pub interval: Option<f64>,

    /// Default log level when `RUST_LOG` is unset.
    pub log_level: Option<String>,

    /// Directory for daily-rotating log files.
    pub log_dir: Option<String>,

    /// Modules to register, in registration order.
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

impl AppConfig {
    pub fn is_standalone(&self) -> bool {
        self.standalone.unwrap_or(false)
    }

    /// Standalone tick interval; 1s when unset. Negative or non-finite
    /// values are rejected.
    pub fn standalone_interval(&self) -> anyhow::Result<Duration> {
        let secs = self.interval.unwrap_or(DEFAULT_STANDALONE_INTERVAL_SECS);
        Duration::try_from_secs_f64(secs).with_context(|| format!("invalid interval {secs}"))
    }
}

/// One module registration request.
///
/// `position` is kept as a raw JSON value: a non-integer position with no
/// extra `args` is reinterpreted as the settings mapping at registration time.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    /// Catalog identifier of the module source (e.g. `"cpu_freq"`).
    pub module: String,

    /// Insertion index into each tick array (default 0).
    #[serde(default)]
    pub position: Option<Value>,

    /// Extra positional constructor arguments.
    #[serde(default)]
    pub args: Vec<Value>,

    /// Keyword settings.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = r##"{
            "standalone": true,
            "interval": 0.5,
            "log_level": "debug",
            "modules": [
                {"module": "cpu_freq", "position": 2, "settings": {"color": "#00FF00"}},
                {"module": "cpu_freq", "position": {"format": "{avg}"}}
            ]
        }"##;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.is_standalone());
        assert_eq!(cfg.standalone_interval().unwrap(), Duration::from_millis(500));
        assert_eq!(cfg.modules.len(), 2);
        assert_eq!(cfg.modules[0].position, Some(Value::from(2)));
        assert_eq!(cfg.modules[0].settings["color"], "#00FF00");
        assert!(cfg.modules[1].position.as_ref().unwrap().is_object());
        assert!(cfg.modules[1].args.is_empty());
    }

    #[test]
    fn defaults_when_empty() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert!(!cfg.is_standalone());
        assert_eq!(cfg.standalone_interval().unwrap(), Duration::from_secs(1));
        assert!(cfg.modules.is_empty());
    }

    #[test]
    fn negative_interval_is_rejected() {
        let cfg: AppConfig = serde_json::from_str(r#"{"interval": -3}"#).unwrap();
        let err = cfg.standalone_interval().unwrap_err();
        assert!(err.to_string().contains("invalid interval -3"));
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        assert!(serde_json::from_str::<AppConfig>(r#"{"bogus": 1}"#).is_err());
    }
}
