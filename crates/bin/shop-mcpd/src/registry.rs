use shop_core::config::{ConfigError, ConfigSources, load_into};
use shop_core::registry::StoreRegistry;
use tracing::info;

/// Builds the store registry from the highest-priority configuration source.
pub fn build_registry(sources: &ConfigSources) -> Result<StoreRegistry, ConfigError> {
    let mut registry = StoreRegistry::new();
    let origin = load_into(&mut registry, sources)?;
    for store in registry.list_stores() {
        info!(
            alias = %store.alias,
            domain = %store.domain,
            api_version = %store.api_version,
            source = %origin,
            "store configured"
        );
    }
    Ok(registry)
}
