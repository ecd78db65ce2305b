//! Alias-keyed store registry with lazily built, cached clients.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::client::ShopClient;
use crate::models::{DEFAULT_API_VERSION, StoreConfig, StoreInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    NotFound { alias: String, available: Vec<String> },
    NoDefault { available: Vec<String> },
    ClientBuild { alias: String, message: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { alias, available } => write!(
                f,
                "store \"{alias}\" not found; available stores: {}",
                describe_aliases(available)
            ),
            Self::NoDefault { available } => write!(
                f,
                "no store specified and no default store could be resolved \
                 (available stores: {}); pass a `store` argument or configure a default store",
                describe_aliases(available)
            ),
            Self::ClientBuild { alias, message } => {
                write!(f, "failed to build client for store \"{alias}\": {message}")
            }
        }
    }
}

impl Error for RegistryError {}

fn describe_aliases(aliases: &[String]) -> String {
    if aliases.is_empty() {
        "none configured".to_string()
    } else {
        aliases.join(", ")
    }
}

/// Lowercases an alias so storage and lookup agree regardless of casing.
#[must_use]
pub fn normalize_alias(alias: &str) -> String {
    alias.trim().to_lowercase()
}

/// Registered store with its API version already resolved.
struct StoreEntry {
    domain: String,
    credential: String,
    api_version: String,
}

/// Registry mapping store aliases to credentials and cached clients.
///
/// Populated through `&mut self` during start-up, then shared behind an `Arc`.
/// Only the client cache is mutated afterwards, under its own lock.
#[derive(Default)]
pub struct StoreRegistry {
    stores: HashMap<String, StoreEntry>,
    clients: Mutex<HashMap<String, Arc<ShopClient>>>,
    default_alias: Option<String>,
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.list_aliases())
            .field("default_alias", &self.default_alias)
            .finish_non_exhaustive()
    }
}

impl StoreRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a store. Any cached client for the alias is
    /// dropped so the next lookup is built from the new settings.
    ///
    /// Blank aliases are ignored; a blank `store` argument always means the
    /// default store.
    pub fn register(&mut self, alias: &str, config: StoreConfig) {
        let alias = normalize_alias(alias);
        if alias.is_empty() {
            warn!(domain = %config.domain, "ignoring store registered under a blank alias");
            return;
        }
        let api_version = config
            .api_version
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        self.clients.get_mut().remove(&alias);
        let replaced = self
            .stores
            .insert(
                alias.clone(),
                StoreEntry {
                    domain: config.domain,
                    credential: config.credential,
                    api_version,
                },
            )
            .is_some();
        debug!(alias = %alias, replaced, "registered store");
    }

    /// Marks an existing store as the default.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] when no store has that alias; the
    /// current default is left untouched.
    pub fn set_default(&mut self, alias: &str) -> Result<(), RegistryError> {
        let alias = normalize_alias(alias);
        if !self.stores.contains_key(&alias) {
            return Err(self.not_found(alias));
        }
        debug!(alias = %alias, "default store set");
        self.default_alias = Some(alias);
        Ok(())
    }

    #[must_use]
    pub fn has_store(&self, alias: &str) -> bool {
        self.stores.contains_key(&normalize_alias(alias))
    }

    /// The explicit default, else the sole registered store, else `None`.
    #[must_use]
    pub fn default_alias(&self) -> Option<&str> {
        self.default_alias.as_deref().or_else(|| {
            if self.stores.len() == 1 {
                self.stores.keys().next().map(String::as_str)
            } else {
                None
            }
        })
    }

    /// Resolves the alias a caller should use. A blank alias counts as absent.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] for an unknown alias,
    /// [`RegistryError::NoDefault`] when none was given and no default resolves.
    pub fn resolve_alias(&self, alias: Option<&str>) -> Result<String, RegistryError> {
        match alias.map(str::trim).filter(|value| !value.is_empty()) {
            Some(alias) => {
                let alias = normalize_alias(alias);
                if self.stores.contains_key(&alias) {
                    Ok(alias)
                } else {
                    Err(self.not_found(alias))
                }
            }
            None => self
                .default_alias()
                .map(str::to_string)
                .ok_or_else(|| RegistryError::NoDefault {
                    available: self.list_aliases(),
                }),
        }
    }

    /// Returns the cached client for the resolved alias, building it on first
    /// use.
    ///
    /// # Errors
    /// Alias resolution errors, or [`RegistryError::ClientBuild`] when the
    /// client cannot be constructed.
    pub fn client(&self, alias: Option<&str>) -> Result<Arc<ShopClient>, RegistryError> {
        let alias = self.resolve_alias(alias)?;
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&alias) {
            return Ok(Arc::clone(client));
        }

        let Some(entry) = self.stores.get(&alias) else {
            return Err(self.not_found(alias));
        };
        let client = ShopClient::new(&entry.domain, &entry.api_version, &entry.credential)
            .map_err(|err| RegistryError::ClientBuild {
                alias: alias.clone(),
                message: err.to_string(),
            })?;
        let client = Arc::new(client);
        debug!(alias = %alias, endpoint = client.endpoint(), "created store client");
        clients.insert(alias, Arc::clone(&client));
        Ok(client)
    }

    /// Describes the resolved store. The alias is returned in its lowercase
    /// canonical form.
    ///
    /// # Errors
    /// Same alias resolution errors as [`StoreRegistry::client`].
    pub fn store_info(&self, alias: Option<&str>) -> Result<StoreInfo, RegistryError> {
        let alias = self.resolve_alias(alias)?;
        match self.stores.get(&alias) {
            Some(entry) => Ok(info_for(&alias, entry)),
            None => Err(self.not_found(alias)),
        }
    }

    /// All registered stores, ordered by alias.
    #[must_use]
    pub fn list_stores(&self) -> Vec<StoreInfo> {
        let mut stores: Vec<StoreInfo> = self
            .stores
            .iter()
            .map(|(alias, entry)| info_for(alias, entry))
            .collect();
        stores.sort_by(|left, right| left.alias.cmp(&right.alias));
        stores
    }

    /// All registered aliases, sorted.
    #[must_use]
    pub fn list_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.stores.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    fn not_found(&self, alias: String) -> RegistryError {
        RegistryError::NotFound {
            alias,
            available: self.list_aliases(),
        }
    }
}

fn info_for(alias: &str, entry: &StoreEntry) -> StoreInfo {
    StoreInfo {
        alias: alias.to_string(),
        domain: entry.domain.clone(),
        api_version: entry.api_version.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(domain: &str) -> StoreConfig {
        StoreConfig::new(domain, "shpat_test")
    }

    fn two_store_registry() -> StoreRegistry {
        let mut registry = StoreRegistry::new();
        registry.register("alpha", store("alpha.myshopify.com"));
        registry.register("beta", store("beta.myshopify.com"));
        registry
    }

    #[test]
    fn lookups_ignore_alias_casing() {
        let mut registry = StoreRegistry::new();
        registry.register("AcMe", store("acme.myshopify.com"));

        for casing in ["acme", "ACME", "Acme", "aCmE"] {
            assert!(registry.has_store(casing), "{casing} should resolve");
            let info = registry
                .store_info(Some(casing))
                .expect("store should resolve");
            assert_eq!(info.alias, "acme");
            assert_eq!(info.domain, "acme.myshopify.com");
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn aliases_differing_only_by_case_share_one_entry() {
        let mut registry = StoreRegistry::new();
        registry.register("Shop", store("first.myshopify.com"));
        registry.register("SHOP", store("second.myshopify.com"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_aliases(), vec!["shop".to_string()]);
        let info = registry.store_info(Some("shop")).expect("store should resolve");
        assert_eq!(info.domain, "second.myshopify.com");
    }

    #[test]
    fn missing_api_version_gets_default() {
        let mut registry = StoreRegistry::new();
        registry.register("plain", store("plain.myshopify.com"));
        registry.register(
            "pinned",
            store("pinned.myshopify.com").with_api_version("2024-10"),
        );
        registry.register(
            "blank",
            store("blank.myshopify.com").with_api_version("  "),
        );

        let versions: Vec<(String, String)> = registry
            .list_stores()
            .into_iter()
            .map(|info| (info.alias, info.api_version))
            .collect();
        assert_eq!(
            versions,
            vec![
                ("blank".to_string(), DEFAULT_API_VERSION.to_string()),
                ("pinned".to_string(), "2024-10".to_string()),
                ("plain".to_string(), DEFAULT_API_VERSION.to_string()),
            ]
        );
    }

    #[test]
    fn client_is_cached_per_alias() {
        let registry = two_store_registry();

        let first = registry.client(Some("alpha")).expect("client should build");
        let second = registry.client(Some("ALPHA")).expect("client should build");
        let other = registry.client(Some("beta")).expect("client should build");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(
            first.endpoint(),
            "https://alpha.myshopify.com/admin/api/2023-07/graphql.json"
        );
    }

    #[test]
    fn reregistering_invalidates_cached_client() {
        let mut registry = StoreRegistry::new();
        registry.register("acme", store("old.myshopify.com"));
        let before = registry.client(None).expect("client should build");

        registry.register("ACME", store("new.myshopify.com"));
        let after = registry.client(None).expect("client should build");

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.endpoint().contains("new.myshopify.com"));
    }

    #[test]
    fn empty_registry_has_no_default() {
        let registry = StoreRegistry::new();

        assert!(registry.is_empty());
        assert_eq!(registry.default_alias(), None);
        assert_eq!(
            registry.client(None).expect_err("no default"),
            RegistryError::NoDefault { available: vec![] }
        );
        assert!(matches!(
            registry.store_info(None),
            Err(RegistryError::NoDefault { .. })
        ));
        assert!(registry.list_stores().is_empty());
        assert!(registry.list_aliases().is_empty());
    }

    #[test]
    fn single_store_is_implicit_default() {
        let mut registry = StoreRegistry::new();
        registry.register("Solo", store("solo.myshopify.com"));

        assert_eq!(registry.default_alias(), Some("solo"));
        let info = registry.store_info(None).expect("implicit default");
        assert_eq!(info.alias, "solo");
    }

    #[test]
    fn multiple_stores_need_explicit_default() {
        let mut registry = two_store_registry();

        assert_eq!(registry.default_alias(), None);
        let err = registry.store_info(None).expect_err("ambiguous default");
        assert!(matches!(err, RegistryError::NoDefault { .. }));
        let message = err.to_string();
        assert!(message.contains("alpha, beta"));
        assert!(message.contains("pass a `store` argument"));

        registry.set_default("Beta").expect("beta exists");
        assert_eq!(registry.default_alias(), Some("beta"));
        assert_eq!(registry.store_info(None).expect("default").alias, "beta");
    }

    #[test]
    fn set_default_on_unknown_alias_keeps_previous_default() {
        let mut registry = two_store_registry();
        registry.set_default("alpha").expect("alpha exists");

        let err = registry.set_default("gamma").expect_err("gamma is unknown");
        assert_eq!(
            err,
            RegistryError::NotFound {
                alias: "gamma".to_string(),
                available: vec!["alpha".to_string(), "beta".to_string()],
            }
        );
        assert!(err.to_string().contains("available stores: alpha, beta"));
        assert_eq!(registry.default_alias(), Some("alpha"));
    }

    #[test]
    fn unknown_alias_is_distinct_from_missing_default() {
        let mut registry = StoreRegistry::new();
        registry.register("alpha", store("alpha.myshopify.com"));

        assert!(matches!(
            registry.client(Some("alhpa")),
            Err(RegistryError::NotFound { .. })
        ));
        assert_eq!(registry.resolve_alias(Some("  ")), Ok("alpha".to_string()));
    }

    #[test]
    fn blank_alias_is_not_registered() {
        let mut registry = StoreRegistry::new();
        registry.register("", store("empty.myshopify.com"));
        registry.register("   ", store("spaces.myshopify.com"));

        assert!(registry.is_empty());
        assert!(registry.list_aliases().is_empty());

        registry.register("main", store("main.myshopify.com"));
        registry.register(" ", store("other.myshopify.com"));
        assert_eq!(registry.list_aliases(), vec!["main".to_string()]);
        assert_eq!(
            registry.store_info(Some("")).expect("blank resolves to default").domain,
            "main.myshopify.com"
        );
    }

    #[test]
    fn invalid_credential_surfaces_as_client_build_error() {
        let mut registry = StoreRegistry::new();
        registry.register("broken", StoreConfig::new("broken.myshopify.com", "bad\r\ntoken"));

        let err = registry.client(None).expect_err("credential is not a header value");
        assert!(matches!(err, RegistryError::ClientBuild { ref alias, .. } if alias == "broken"));
    }
}
