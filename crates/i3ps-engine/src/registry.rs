//! Module catalog: resolves registration requests into module instances.
//!
//! Module kinds are grouped into [`ModuleSource`]s keyed by a stable
//! identifier (the name used in the config file). A source lists candidate
//! entries; exactly one of them must be a concrete [`ModuleKind`]. The
//! abstract base roles and unrelated entries are skipped.

use std::fmt;

use ahash::AHashMap;
use i3ps_core::ConfigError;
use serde_json::{Map, Value};

use crate::module::Module;
use crate::settings::{Setting, Settings};

/// Constructor for one module kind, fed with validated settings.
pub type Builder = fn(&Settings) -> Result<Box<dyn Module>, ConfigError>;

/// A concrete, instantiable module kind.
#[derive(Clone, Copy)]
pub struct ModuleKind {
    /// Name reported in configuration errors (e.g. `"CpuFreq"`).
    pub class: &'static str,
    /// Recognized settings, in documentation order.
    pub settings: &'static [Setting],
    pub build: Builder,
}

impl ModuleKind {
    /// Validate `values` against the schema and build an instance.
    pub fn instantiate(&self, values: Map<String, Value>) -> Result<Box<dyn Module>, ConfigError> {
        let settings = Settings::validate(self.class, self.settings, values)?;
        (self.build)(&settings)
    }
}

impl fmt::Debug for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleKind")
            .field("class", &self.class)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// The three abstract roles a source may re-export without being ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseRole {
    Module,
    AsyncModule,
    IntervalModule,
}

/// One entry in a module source.
#[derive(Debug, Clone)]
pub enum Candidate {
    Kind(ModuleKind),
    Base(BaseRole),
    /// Anything else a source carries (helpers, constants).
    Other(&'static str),
}

/// A named collection of candidates, resolved to one [`ModuleKind`].
#[derive(Debug, Clone)]
pub struct ModuleSource {
    id: String,
    candidates: Vec<Candidate>,
}

impl ModuleSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            candidates: Vec::new(),
        }
    }

    pub fn with(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn with_kind(self, kind: ModuleKind) -> Self {
        self.with(Candidate::Kind(kind))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The unique concrete kind in this source.
    pub fn find_kind(&self) -> Result<&ModuleKind, ConfigError> {
        let kinds: Vec<&ModuleKind> = self
            .candidates
            .iter()
            .filter_map(|c| match c {
                Candidate::Kind(kind) => Some(kind),
                Candidate::Base(_) | Candidate::Other(_) => None,
            })
            .collect();

        match kinds.as_slice() {
            [] => Err(ConfigError::NoClass {
                module: self.id.clone(),
            }),
            [kind] => Ok(*kind),
            many => Err(ConfigError::Ambiguous {
                module: self.id.clone(),
                classes: many.iter().map(|k| k.class.to_string()).collect(),
            }),
        }
    }
}

/// Module sources available to the config file, keyed by identifier.
#[derive(Debug, Default)]
pub struct ModuleCatalog {
    sources: AHashMap<String, ModuleSource>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. Identifiers must be unique.
    pub fn add(&mut self, source: ModuleSource) -> Result<(), ConfigError> {
        if self.sources.contains_key(source.id()) {
            return Err(ConfigError::DuplicateSource {
                module: source.id().to_string(),
            });
        }
        self.sources.insert(source.id().to_string(), source);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&ModuleSource, ConfigError> {
        self.sources.get(id).ok_or_else(|| ConfigError::UnknownModule {
            module: id.to_string(),
        })
    }

    /// Identifiers in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

// ---------------------------------------------------------------------------
// Registration requests
// ---------------------------------------------------------------------------

/// What to register: a ready instance or a source to instantiate from.
pub enum ModuleSpec<'a> {
    Instance(Box<dyn Module>),
    Source(&'a ModuleSource),
}

/// Constructor arguments accompanying a [`ModuleSpec`].
///
/// `position` is raw: when it is not an integer and `args` is empty, it is
/// taken as the settings mapping and the position becomes 0.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub position: Option<Value>,
    pub args: Vec<Value>,
    pub settings: Map<String, Value>,
}

impl Registration {
    pub fn at(position: i64) -> Self {
        Self {
            position: Some(Value::from(position)),
            ..Self::default()
        }
    }

    pub fn settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = settings;
        self
    }
}

/// Resolve a registration request into an instance and its position.
pub fn resolve(
    spec: ModuleSpec<'_>,
    request: Registration,
) -> Result<(Box<dyn Module>, i64), ConfigError> {
    let Registration {
        position,
        mut args,
        settings,
    } = request;

    match spec {
        ModuleSpec::Instance(module) => {
            if !args.is_empty() || !settings.is_empty() {
                return Err(ConfigError::PrebuiltWithArguments {
                    module: module.name().to_string(),
                });
            }
            let position = match position {
                None => 0,
                Some(v) => v.as_i64().ok_or_else(|| ConfigError::InvalidArguments {
                    module: module.name().to_string(),
                    reason: format!("position must be an integer, got {v}"),
                })?,
            };
            Ok((module, position))
        }
        ModuleSpec::Source(source) => {
            let kind = source.find_kind()?;

            let position = match position {
                None => 0,
                Some(v) => match v.as_i64() {
                    Some(p) => p,
                    None if args.is_empty() => {
                        // settings passed where the position goes
                        args.push(v);
                        0
                    }
                    None => {
                        return Err(ConfigError::InvalidArguments {
                            module: source.id().to_string(),
                            reason: format!("position must be an integer, got {v}"),
                        });
                    }
                },
            };

            let values = settings_from_call(source.id(), args, settings)?;
            Ok((kind.instantiate(values)?, position))
        }
    }
}

/// Merge positional and keyword constructor arguments into one mapping.
///
/// A lone positional object with no keyword settings is the settings mapping.
fn settings_from_call(
    module: &str,
    args: Vec<Value>,
    settings: Map<String, Value>,
) -> Result<Map<String, Value>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidArguments {
        module: module.to_string(),
        reason,
    };

    match <[Value; 1]>::try_from(args) {
        Ok([Value::Object(map)]) if settings.is_empty() => Ok(map),
        Ok([other]) if settings.is_empty() => Err(invalid(format!(
            "expected a settings object, got {other}"
        ))),
        Ok(_) => Err(invalid(
            "positional settings cannot be combined with keyword settings".to_string(),
        )),
        Err(args) if args.is_empty() => Ok(settings),
        Err(args) => Err(invalid(format!(
            "expected at most one positional argument, got {}",
            args.len()
        ))),
    }
}
