//! Store configuration resolution.
//!
//! Exactly one source is used, tried in priority order:
//! 1. an explicit configuration file path (`--config`),
//! 2. the multi-store environment variable (inline JSON or a path to a file),
//! 3. the legacy single-store environment variables,
//! 4. the single-store CLI flags.

use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};
use tracing::info;

use crate::models::StoreConfig;
use crate::registry::{RegistryError, StoreRegistry, normalize_alias};

pub const STORES_CONFIG_ENV: &str = "SHOPIFY_STORES_CONFIG";
pub const ACCESS_TOKEN_ENV: &str = "SHOPIFY_ACCESS_TOKEN";
pub const DOMAIN_ENV: &str = "MYSHOPIFY_DOMAIN";

/// Alias used for stores configured through the single-store sources.
pub const DEFAULT_ALIAS: &str = "default";

/// One structural problem found in a JSON configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub reason: String,
}

impl SchemaIssue {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    NotFound { path: PathBuf },
    Io { path: PathBuf, message: String },
    Parse { source: String, message: String },
    Schema { source: String, issues: Vec<SchemaIssue> },
    EmptyConfig { source: String },
    Validation(String),
    NoConfiguration,
    Registry(RegistryError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(f, "configuration file not found: {}", path.display())
            }
            Self::Io { path, message } => {
                write!(f, "failed to read configuration file {}: {message}", path.display())
            }
            Self::Parse { source, message } => {
                write!(f, "failed to parse store configuration from {source}: {message}")
            }
            Self::Schema { source, issues } => {
                write!(f, "invalid store configuration in {source}:")?;
                for issue in issues {
                    write!(f, "\n  - {issue}")?;
                }
                Ok(())
            }
            Self::EmptyConfig { source } => {
                write!(f, "store configuration in {source} does not define any stores")
            }
            Self::Validation(message) => write!(f, "{message}"),
            Self::NoConfiguration => write!(
                f,
                "no store configuration found. Provide one of:\n  \
                 1. --config <path> pointing at a JSON stores file\n  \
                 2. {STORES_CONFIG_ENV} containing inline JSON or a path to a JSON file\n  \
                 3. {ACCESS_TOKEN_ENV} and {DOMAIN_ENV} environment variables\n  \
                 4. --accessToken <token> and --domain <domain> flags"
            ),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {}

impl From<RegistryError> for ConfigError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

/// The source a configuration was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    EnvFile(PathBuf),
    EnvInline,
    LegacyEnv,
    CliFlags,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "config file {}", path.display()),
            Self::EnvFile(path) => {
                write!(f, "{STORES_CONFIG_ENV} file {}", path.display())
            }
            Self::EnvInline => write!(f, "{STORES_CONFIG_ENV} (inline JSON)"),
            Self::LegacyEnv => write!(f, "{ACCESS_TOKEN_ENV}/{DOMAIN_ENV}"),
            Self::CliFlags => write!(f, "--accessToken/--domain flags"),
        }
    }
}

/// Raw inputs the loader chooses between. Paths are resolved against
/// `working_dir`.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub config_path: Option<PathBuf>,
    pub stores_env: Option<String>,
    pub env_access_token: Option<String>,
    pub env_domain: Option<String>,
    pub cli_access_token: Option<String>,
    pub cli_domain: Option<String>,
    pub working_dir: PathBuf,
}

impl ConfigSources {
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Self::default()
        }
    }

    /// Captures the store-related environment variables and the current
    /// directory.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the current directory is unavailable.
    pub fn from_process_env() -> Result<Self, ConfigError> {
        let working_dir = std::env::current_dir().map_err(|err| ConfigError::Io {
            path: PathBuf::from("."),
            message: err.to_string(),
        })?;
        Ok(Self {
            stores_env: std::env::var(STORES_CONFIG_ENV).ok(),
            env_access_token: std::env::var(ACCESS_TOKEN_ENV).ok(),
            env_domain: std::env::var(DOMAIN_ENV).ok(),
            ..Self::new(working_dir)
        })
    }

    #[must_use]
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    #[must_use]
    pub fn with_stores_env(mut self, value: impl Into<String>) -> Self {
        self.stores_env = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_legacy_env(
        mut self,
        access_token: Option<String>,
        domain: Option<String>,
    ) -> Self {
        self.env_access_token = access_token;
        self.env_domain = domain;
        self
    }

    #[must_use]
    pub fn with_cli_flags(mut self, access_token: Option<String>, domain: Option<String>) -> Self {
        self.cli_access_token = access_token;
        self.cli_domain = domain;
        self
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        normalize_path(&self.working_dir.join(path))
    }
}

/// Drops `.` segments and folds `..` into its parent without touching the
/// filesystem, so paths read cleanly even when the file does not exist.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Stores and default alias produced by a single configuration source.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub origin: ConfigOrigin,
    pub stores: Vec<(String, StoreConfig)>,
    pub default_store: Option<String>,
}

impl LoadedConfig {
    fn single_store(origin: ConfigOrigin, domain: &str, credential: &str) -> Self {
        Self {
            origin,
            stores: vec![(
                DEFAULT_ALIAS.to_string(),
                StoreConfig::new(domain.trim(), credential.trim()),
            )],
            default_store: Some(DEFAULT_ALIAS.to_string()),
        }
    }
}

/// Picks the highest-priority source that is present and parses it.
///
/// # Errors
/// Returns the first failure of the chosen source; lower-priority sources are
/// never consulted once a higher one is present.
pub fn resolve(sources: &ConfigSources) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = sources.config_path.as_deref() {
        let path = sources.resolve_path(path);
        if !path.is_file() {
            return Err(ConfigError::NotFound { path });
        }
        return read_file(&path, ConfigOrigin::File(path.clone()));
    }

    if let Some(value) = present(sources.stores_env.as_deref()) {
        if let Some(path) = env_value_as_path(value, sources) {
            return read_file(&path, ConfigOrigin::EnvFile(path.clone()));
        }
        return parse_document(value, ConfigOrigin::EnvInline);
    }

    if let (Some(token), Some(domain)) = (
        legacy_value(sources.env_access_token.as_deref()),
        legacy_value(sources.env_domain.as_deref()),
    ) {
        return Ok(LoadedConfig::single_store(ConfigOrigin::LegacyEnv, domain, token));
    }

    match (
        present(sources.cli_access_token.as_deref()),
        present(sources.cli_domain.as_deref()),
    ) {
        (Some(token), Some(domain)) => Ok(LoadedConfig::single_store(
            ConfigOrigin::CliFlags,
            domain,
            token,
        )),
        (None, None) => Err(ConfigError::NoConfiguration),
        _ => Err(ConfigError::Validation(
            "both --accessToken and --domain must be provided together".to_string(),
        )),
    }
}

/// Resolves configuration and registers every store it defines.
///
/// # Errors
/// Any [`resolve`] error, or [`ConfigError::Registry`] when `defaultStore`
/// names a store that was not defined.
pub fn load_into(
    registry: &mut StoreRegistry,
    sources: &ConfigSources,
) -> Result<ConfigOrigin, ConfigError> {
    let loaded = resolve(sources)?;
    for (alias, config) in loaded.stores {
        registry.register(&alias, config);
    }
    if let Some(default_store) = loaded.default_store.as_deref() {
        registry.set_default(default_store)?;
    }
    info!(
        origin = %loaded.origin,
        stores = registry.len(),
        default_store = registry.default_alias().unwrap_or("<none>"),
        "loaded store configuration"
    );
    Ok(loaded.origin)
}

/// Parses a JSON stores document.
///
/// # Errors
/// [`ConfigError::Parse`] for malformed JSON, [`ConfigError::Schema`] listing
/// every structural violation, [`ConfigError::EmptyConfig`] when no stores are
/// defined.
pub fn parse_document(text: &str, origin: ConfigOrigin) -> Result<LoadedConfig, ConfigError> {
    let document: Value = serde_json::from_str(text).map_err(|err| ConfigError::Parse {
        source: origin.to_string(),
        message: err.to_string(),
    })?;

    let (stores, default_store) =
        validate_document(&document).map_err(|issues| ConfigError::Schema {
            source: origin.to_string(),
            issues,
        })?;

    if stores.is_empty() {
        return Err(ConfigError::EmptyConfig {
            source: origin.to_string(),
        });
    }

    Ok(LoadedConfig {
        origin,
        stores,
        default_store,
    })
}

fn read_file(path: &Path, origin: ConfigOrigin) -> Result<LoadedConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    parse_document(&text, origin)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn legacy_value(value: Option<&str>) -> Option<&str> {
    present(value).filter(|value| *value != "undefined")
}

fn env_value_as_path(value: &str, sources: &ConfigSources) -> Option<PathBuf> {
    let looks_like_path =
        value.ends_with(".json") || value.starts_with('/') || value.starts_with("./");
    if !looks_like_path {
        return None;
    }
    let path = sources.resolve_path(Path::new(value));
    path.is_file().then_some(path)
}

type ValidatedStores = (Vec<(String, StoreConfig)>, Option<String>);

fn validate_document(document: &Value) -> Result<ValidatedStores, Vec<SchemaIssue>> {
    let mut issues = Vec::new();
    let Some(root) = document.as_object() else {
        return Err(vec![SchemaIssue::new("$", "expected a JSON object")]);
    };

    let mut stores = Vec::new();
    match root.get("stores") {
        None => issues.push(SchemaIssue::new("stores", "is required")),
        Some(Value::Object(entries)) => {
            let mut seen = HashSet::new();
            for (alias, entry) in entries {
                let path = format!("stores.{alias}");
                if alias.trim().is_empty() {
                    issues.push(SchemaIssue::new(&path, "alias must not be empty"));
                    continue;
                }
                if !seen.insert(normalize_alias(alias)) {
                    issues.push(SchemaIssue::new(
                        &path,
                        "duplicates another alias (aliases are case-insensitive)",
                    ));
                }
                if let Some(config) = validate_store(&path, entry, &mut issues) {
                    stores.push((alias.clone(), config));
                }
            }
        }
        Some(_) => issues.push(SchemaIssue::new(
            "stores",
            "expected an object mapping aliases to stores",
        )),
    }

    let default_store = match root.get("defaultStore") {
        None | Some(Value::Null) => None,
        Some(Value::String(alias)) if !alias.trim().is_empty() => Some(alias.clone()),
        Some(Value::String(_)) => {
            issues.push(SchemaIssue::new("defaultStore", "must not be empty"));
            None
        }
        Some(_) => {
            issues.push(SchemaIssue::new("defaultStore", "expected a string"));
            None
        }
    };

    if issues.is_empty() {
        Ok((stores, default_store))
    } else {
        Err(issues)
    }
}

fn validate_store(path: &str, entry: &Value, issues: &mut Vec<SchemaIssue>) -> Option<StoreConfig> {
    let Some(fields) = entry.as_object() else {
        issues.push(SchemaIssue::new(path, "expected an object"));
        return None;
    };

    let domain = required_string(fields, path, "domain", issues);
    let credential = if fields.contains_key("accessToken") {
        required_string(fields, path, "accessToken", issues)
    } else if fields.contains_key("credential") {
        required_string(fields, path, "credential", issues)
    } else {
        issues.push(SchemaIssue::new(
            format!("{path}.accessToken"),
            "is required (`credential` is accepted as an alternative key)",
        ));
        None
    };

    let api_version = match fields.get("apiVersion") {
        None | Some(Value::Null) => None,
        Some(Value::String(version)) => Some(version.trim().to_string()),
        Some(_) => {
            issues.push(SchemaIssue::new(
                format!("{path}.apiVersion"),
                "expected a string",
            ));
            None
        }
    };

    let (domain, credential) = (domain?, credential?);
    let mut config = StoreConfig::new(domain, credential);
    config.api_version = api_version.filter(|version| !version.is_empty());
    Some(config)
}

fn required_string(
    fields: &Map<String, Value>,
    path: &str,
    key: &str,
    issues: &mut Vec<SchemaIssue>,
) -> Option<String> {
    let field_path = format!("{path}.{key}");
    match fields.get(key) {
        None | Some(Value::Null) => {
            issues.push(SchemaIssue::new(field_path, "is required"));
            None
        }
        Some(Value::String(value)) if value.trim().is_empty() => {
            issues.push(SchemaIssue::new(field_path, "must not be empty"));
            None
        }
        Some(Value::String(value)) => Some(value.trim().to_string()),
        Some(_) => {
            issues.push(SchemaIssue::new(field_path, "expected a string"));
            None
        }
    }
}
