//! Modules shipped with the binary.

pub mod cpu_freq;

use i3ps_core::ConfigError;

use crate::registry::ModuleCatalog;

/// Catalog of every built-in module source.
pub fn builtin_catalog() -> Result<ModuleCatalog, ConfigError> {
    let mut catalog = ModuleCatalog::new();
    catalog.add(cpu_freq::source())?;
    Ok(catalog)
}
