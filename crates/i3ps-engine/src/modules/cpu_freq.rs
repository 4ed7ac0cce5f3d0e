//! CPU frequency module.
//!
//! Reads `/proc/cpuinfo` (or the configured `file`) every interval and
//! renders the per-core `cpu MHz` values through a format string.
//!
//! # Placeholders
//!
//! - `{avg}`: mean of all cores in MHz, 3 decimals
//! - `{avgg}`: mean of all cores in GHz, 2 decimals
//! - `{coreN}`: core `N` in MHz, 3 decimals
//! - `{coreNg}`: core `N` in GHz, 2 decimals

use std::path::PathBuf;
use std::time::Duration;

use ahash::AHashMap;
use anyhow::{Context, Result, anyhow, bail};
use i3ps_core::ConfigError;
use serde_json::{Value, json};

use crate::module::{DEFAULT_PERIOD, IntervalModule, Module, Periodic};
use crate::registry::{BaseRole, Candidate, ModuleKind, ModuleSource};
use crate::settings::{Setting, Settings};

const CLASS: &str = "CpuFreq";
const DEFAULT_FORMAT: &str = "{avgg}";
const DEFAULT_COLOR: &str = "#FFFFFF";
const DEFAULT_FILE: &str = "/proc/cpuinfo";

pub const SETTINGS: &[Setting] = &[
    Setting::new("format").doc("Format string, see the placeholder list"),
    Setting::new("color").doc("The text color"),
    Setting::new("file").doc("override default path"),
    Setting::new("interval").doc("Seconds between updates"),
];

pub const KIND: ModuleKind = ModuleKind {
    class: CLASS,
    settings: SETTINGS,
    build,
};

/// Catalog entry for this module.
pub fn source() -> ModuleSource {
    ModuleSource::new("cpu_freq")
        .with(Candidate::Base(BaseRole::IntervalModule))
        .with_kind(KIND)
}

fn build(settings: &Settings) -> Result<Box<dyn Module>, ConfigError> {
    Ok(Box::new(IntervalModule::new(CLASS, CpuFreq::from_settings(settings)?)))
}

/// Periodic worker behind the `cpu_freq` module.
#[derive(Debug, Clone)]
pub struct CpuFreq {
    format: String,
    color: String,
    file: PathBuf,
    interval: Duration,
}

impl CpuFreq {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let interval = match settings.get::<f64>("interval")? {
            None => DEFAULT_PERIOD,
            Some(secs) => positive_secs(secs).map_err(|reason| ConfigError::InvalidValue {
                module: settings.module().to_string(),
                key: "interval".to_string(),
                reason,
            })?,
        };
        Ok(Self {
            format: settings.get_or("format", DEFAULT_FORMAT.to_string())?,
            color: settings.get_or("color", DEFAULT_COLOR.to_string())?,
            file: settings.get_or("file", PathBuf::from(DEFAULT_FILE))?,
            interval,
        })
    }

    /// Placeholder values for the current contents of the cpuinfo file.
    fn values(&self) -> Result<AHashMap<String, String>> {
        let content = std::fs::read_to_string(&self.file)
            .with_context(|| format!("reading {}", self.file.display()))?;
        placeholders(&parse_cpuinfo(&content))
            .with_context(|| format!("no 'cpu MHz' entries in {}", self.file.display()))
    }
}

fn positive_secs(secs: f64) -> std::result::Result<Duration, String> {
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if d.is_zero() => Err("must be greater than zero".to_string()),
        Ok(d) => Ok(d),
        Err(e) => Err(e.to_string()),
    }
}

impl Periodic for CpuFreq {
    fn interval(&self) -> Duration {
        self.interval
    }

    fn run(&mut self) -> Result<Value> {
        let values = self.values()?;
        Ok(json!({
            "full_text": render(&self.format, &values)?,
            "color": self.color,
            "format": self.format,
        }))
    }
}

/// Per-core MHz values from `cpu MHz : <value>` lines.
pub fn parse_cpuinfo(content: &str) -> Vec<f64> {
    content
        .lines()
        .filter(|line| line.starts_with("cpu MHz"))
        .filter_map(|line| line.split(':').nth(1))
        .filter_map(|value| fast_float2::parse::<f64, _>(value.trim()).ok())
        .collect()
}

/// Placeholder map for a set of per-core MHz values.
pub fn placeholders(mhz: &[f64]) -> Result<AHashMap<String, String>> {
    if mhz.is_empty() {
        bail!("no cores");
    }
    let mut values = AHashMap::with_capacity(mhz.len() * 2 + 2);
    for (core, &freq) in mhz.iter().enumerate() {
        values.insert(format!("core{core}"), format!("{freq:4.3}"));
        values.insert(format!("core{core}g"), format!("{:1.2}", freq / 1000.0));
    }
    let avg = mhz.iter().sum::<f64>() / mhz.len() as f64;
    values.insert("avg".to_string(), format!("{avg:4.3}"));
    values.insert("avgg".to_string(), format!("{:1.2}", avg / 1000.0));
    Ok(values)
}

/// Substitute `{name}` placeholders; `{{` and `}}` are literal braces.
pub fn render(format: &str, values: &AHashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => bail!("unclosed placeholder in format {format:?}"),
                    }
                }
                let value = values
                    .get(&name)
                    .ok_or_else(|| anyhow!("unknown placeholder {{{name}}}"))?;
                out.push_str(value);
            }
            '}' => bail!("single '}}' in format {format:?}"),
            other => out.push(other),
        }
    }
    Ok(out)
}
