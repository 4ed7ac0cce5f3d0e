//! The status engine: module registry plus the per-tick merge.
//!
//! # Architecture
//!
//! ```text
//! register() ──► resolve ──► set position ──► registered() hook ──► push
//! run()      ──► JsonIo::handshake ──► for each tick: merge() ──► write back
//! ```
//!
//! The tick loop is strictly sequential: read, merge, write. Modules feed it
//! through their output slots from their own threads.

use i3ps_core::Result;
use i3ps_core::config::ModuleEntry;
use serde_json::Value;
use tracing::{debug, info};

use crate::io::LineChannel;
use crate::json_io::{JsonIo, Tick};
use crate::module::{Module, Phase};
use crate::registry::{ModuleCatalog, ModuleSpec, Registration, resolve};

/// Ordered set of registered modules and the catalog used to build them.
#[derive(Default)]
pub struct StatusEngine {
    modules: Vec<Box<dyn Module>>,
    catalog: ModuleCatalog,
}

impl StatusEngine {
    /// Engine with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that resolves config entries against `catalog`.
    pub fn with_catalog(catalog: ModuleCatalog) -> Self {
        Self {
            modules: Vec::new(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// Registered modules in registration order.
    pub fn modules(&self) -> &[Box<dyn Module>] {
        &self.modules
    }

    /// Register a pre-built module at `position`.
    pub fn register(&mut self, module: Box<dyn Module>, position: i64) -> Result<()> {
        self.register_with(ModuleSpec::Instance(module), Registration::at(position))
    }

    /// Resolve and register a module from an explicit spec.
    pub fn register_with(&mut self, spec: ModuleSpec<'_>, request: Registration) -> Result<()> {
        let (module, position) = resolve(spec, request)?;
        self.install(module, position)
    }

    /// Register a module described by a config file entry.
    pub fn register_entry(&mut self, entry: &ModuleEntry) -> Result<()> {
        let source = self.catalog.get(&entry.module)?;
        let request = Registration {
            position: entry.position.clone(),
            args: entry.args.clone(),
            settings: entry.settings.clone(),
        };
        let (module, position) = resolve(ModuleSpec::Source(source), request)?;
        self.install(module, position)
    }

    fn install(&mut self, mut module: Box<dyn Module>, position: i64) -> Result<()> {
        module.set_position(position);
        module.state_mut().set_phase(Phase::Registered);
        module.registered(&*self)?;
        info!(
            "registered module '{}' at position {position} ({} total)",
            module.name(),
            self.modules.len() + 1
        );
        self.modules.push(module);
        Ok(())
    }

    /// Insert every module's current output into `tick`.
    ///
    /// Modules are visited in registration order and each output is inserted
    /// at the module's position, shifting anything already there to the
    /// right. No sorting and no filtering of `null` outputs.
    pub fn merge(&self, tick: &mut Tick) {
        for module in &self.modules {
            insert_at(tick, module.position(), module.output());
        }
    }

    /// Run the protocol over `io` until end-of-stream.
    ///
    /// Returns the number of ticks written. End-of-stream during the
    /// handshake is reported as [`i3ps_core::StatusError::EndOfStream`].
    pub async fn run<C: LineChannel>(&self, io: C) -> Result<u64> {
        let mut json = JsonIo::handshake(io).await?;
        let ticks = json
            .run(|tick| {
                self.merge(tick);
                Ok(())
            })
            .await?;
        debug!("tick loop finished after {ticks} tick(s)");
        Ok(ticks)
    }
}

/// List insertion: past-the-end appends, negative counts from the end.
fn insert_at(tick: &mut Tick, position: i64, value: Value) {
    let len = i64::try_from(tick.len()).unwrap_or(i64::MAX);
    let index = if position < 0 {
        (len + position).max(0)
    } else {
        position.min(len)
    };
    // 0 <= index <= len
    tick.insert(index as usize, value);
}
