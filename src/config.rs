use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Static configuration of a nested set model.
///
/// Column mapping lives in the typed `NestedSetModel` column getters; this
/// holds what is decided at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedSetConfig {
    entity_name: String,
    table_name: String,
    advisory_lock_strategy: AdvisoryLockStrategy,
}

impl NestedSetConfig {
    /// Create a new configuration for the given entity and its table.
    pub fn new(entity_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        let entity_name = entity_name.into();
        let table_name = table_name.into();

        let default_lock = AdvisoryLockStrategy::Namespaced(AdvisoryLockKey::derived_from(
            &entity_name,
            &table_name,
        ));

        Self {
            entity_name,
            table_name,
            advisory_lock_strategy: default_lock,
        }
    }

    /// Merge options produced by [`NestedSetOptions`].
    pub(crate) fn apply_options(mut self, options: NestedSetOptions) -> Self {
        if let Some(strategy) = options.advisory_lock_strategy {
            self.advisory_lock_strategy = strategy;
        }
        self
    }

    /// Human-readable Rust struct name for the entity.
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Advisory lock strategy (PostgreSQL only).
    pub fn advisory_lock_strategy(&self) -> &AdvisoryLockStrategy {
        &self.advisory_lock_strategy
    }
}

/// Builder-style overrides attached to a derived model with
/// `#[nested_set(options = "path::to::fn")]`, where the function returns
/// `NestedSetOptions`.
///
/// The options deserialize from application configuration:
///
/// ```
/// # use nested_set::{AdvisoryLockStrategy, NestedSetConfig, NestedSetOptions};
/// let options: NestedSetOptions =
///     serde_json::from_str(r#"{ "advisory_lock_strategy": "disabled" }"#).unwrap();
/// let config = options.apply(NestedSetConfig::new("Category", "categories"));
/// assert_eq!(config.advisory_lock_strategy(), &AdvisoryLockStrategy::Disabled);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedSetOptions {
    advisory_lock_strategy: Option<AdvisoryLockStrategy>,
}

impl NestedSetOptions {
    pub fn advisory_lock_strategy(mut self, strategy: AdvisoryLockStrategy) -> Self {
        self.advisory_lock_strategy = Some(strategy);
        self
    }

    pub fn apply(self, base: NestedSetConfig) -> NestedSetConfig {
        base.apply_options(self)
    }
}

/// Key used for PostgreSQL advisory locks.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AdvisoryLockKey(String);

impl AdvisoryLockKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Narrow the key to a single tree so writers of different scopes do
    /// not wait on each other.
    pub fn scoped(&self, scope: Option<&str>) -> String {
        match scope {
            Some(scope) => format!("{}::{scope}", self.0),
            None => self.0.clone(),
        }
    }

    fn derived_from(entity: &str, table: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(entity.as_bytes());
        hasher.update(b"/");
        hasher.update(table.as_bytes());
        let crc = hasher.finalize();
        Self(format!("nested-set::{entity}::{table}::{crc:x}"))
    }
}

/// Configuration describing how to acquire advisory locks.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryLockStrategy {
    Disabled,
    Namespaced(AdvisoryLockKey),
}

impl AdvisoryLockStrategy {
    pub fn key(&self) -> Option<&AdvisoryLockKey> {
        match self {
            AdvisoryLockStrategy::Disabled => None,
            AdvisoryLockStrategy::Namespaced(key) => Some(key),
        }
    }
}
