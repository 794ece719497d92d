//! Configuration loading for crsearch.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/crsearch/config.toml.

use std::collections::BTreeMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::node::{DimensionCombination, FulltextSettings, NodeType, LIVE_WORKSPACE};

fn default_true() -> bool {
    true
}

/// Serde adapter storing a name-keyed map as a list of `{ name, .. }` tables.
///
/// The `config` crate lowercases table keys, which would mangle node type
/// names such as `Acme.Site:Page`; values keep their case.
mod named_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    struct Entry<T> {
        name: String,
        #[serde(flatten)]
        value: T,
    }

    #[derive(Serialize)]
    struct EntryRef<'a, T> {
        name: &'a str,
        #[serde(flatten)]
        value: &'a T,
    }

    pub fn serialize<S, T>(map: &BTreeMap<String, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(map.iter().map(|(name, value)| EntryRef { name, value }))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let entries = Vec::<Entry<T>>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|e| (e.name, e.value)).collect())
    }
}

/// Search backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the search backend
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password (load from env var, not the config file)
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,
}

fn default_backend_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
            username: None,
            password: None,
        }
    }
}

/// Indexing behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingSettings {
    /// Backend-side retries for conflicting fulltext updates
    #[serde(default = "default_retry_on_conflict")]
    pub retry_on_conflict: u32,

    /// Keep-alive for scroll cursors (backend duration syntax)
    #[serde(default = "default_scroll_keep_alive")]
    pub scroll_keep_alive: String,

    /// Nodes between rebuild progress reports
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_retry_on_conflict() -> u32 {
    3
}

fn default_scroll_keep_alive() -> String {
    "1m".to_string()
}

fn default_progress_interval() -> usize {
    100
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            retry_on_conflict: default_retry_on_conflict(),
            scroll_keep_alive: default_scroll_keep_alive(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Indexing configuration of one node property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertySchema {
    /// Mapping fragment sent to the backend (e.g. `{"type": "keyword"}`)
    #[serde(default)]
    pub mapping: Option<Value>,

    /// Whether the property is stored as a document field
    #[serde(default = "default_true")]
    pub indexed: bool,

    /// Fulltext bucket the property's text goes to
    #[serde(default)]
    pub fulltext_bucket: Option<String>,
}

impl Default for PropertySchema {
    fn default() -> Self {
        Self {
            mapping: None,
            indexed: true,
            fulltext_bucket: None,
        }
    }
}

/// Search configuration of one node type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeTypeSchema {
    #[serde(default)]
    pub fulltext_root: bool,

    #[serde(default = "default_true")]
    pub fulltext_enabled: bool,

    /// Listed as `[[node_types.properties]]` entries with a `name`
    #[serde(default, with = "named_list")]
    pub properties: BTreeMap<String, PropertySchema>,
}

impl Default for NodeTypeSchema {
    fn default() -> Self {
        Self {
            fulltext_root: false,
            fulltext_enabled: true,
            properties: BTreeMap::new(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Alias name; physical indices are named `<index_name>-<postfix>`
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Index every workspace instead of only the live one
    #[serde(default)]
    pub index_all_workspaces: bool,

    #[serde(default = "default_live_workspace")]
    pub live_workspace: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub indexing: IndexingSettings,

    /// Node type name -> search schema, listed as `[[node_types]]` entries
    /// with a `name`
    #[serde(default, with = "named_list")]
    pub node_types: BTreeMap<String, NodeTypeSchema>,

    /// Allowed dimension combinations (empty: single default combination)
    #[serde(default)]
    pub dimensions: Vec<DimensionCombination>,
}

fn default_index_name() -> String {
    "crsearch".to_string()
}

fn default_live_workspace() -> String {
    LIVE_WORKSPACE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            index_all_workspaces: false,
            live_workspace: default_live_workspace(),
            log_level: default_log_level(),
            backend: BackendSettings::default(),
            indexing: IndexingSettings::default(),
            node_types: BTreeMap::new(),
            dimensions: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/crsearch/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (CRSEARCH_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, CoreError> {
        let config_dir = ProjectDirs::from("", "", "crsearch")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("index_name", default_index_name())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("live_workspace", default_live_workspace())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("backend.url", default_backend_url())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CRSEARCH_INDEX_NAME, CRSEARCH_BACKEND__URL, CRSEARCH_BACKEND__PASSWORD, ...
        builder = builder.add_source(
            Environment::with_prefix("CRSEARCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CoreError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.index_name.is_empty() {
            return Err(CoreError::Config("index_name must not be empty".to_string()));
        }
        if self.index_name.contains(',') || self.index_name.contains('*') {
            return Err(CoreError::Config(format!(
                "index_name must not contain ',' or '*', got {}",
                self.index_name
            )));
        }
        if self.indexing.progress_interval == 0 {
            return Err(CoreError::Config(
                "indexing.progress_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve a node type name against the schema registry.
    ///
    /// Unknown node types get default search settings.
    pub fn node_type(&self, name: &str) -> NodeType {
        match self.node_types.get(name) {
            Some(schema) => NodeType {
                name: name.to_string(),
                fulltext: FulltextSettings {
                    enable: schema.fulltext_enabled,
                    is_root: schema.fulltext_root,
                },
            },
            None => NodeType::new(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.index_name, "crsearch");
        assert_eq!(settings.live_workspace, "live");
        assert!(!settings.index_all_workspaces);
        assert_eq!(settings.backend.url, "http://localhost:9200");
        assert_eq!(settings.indexing.retry_on_conflict, 3);
        assert_eq!(settings.indexing.scroll_keep_alive, "1m");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
index_name = "site"
index_all_workspaces = true

[backend]
url = "http://search:9200"

[[node_types]]
name = "Acme.Site:Page"
fulltext_root = true

[[node_types.properties]]
name = "navigationTitle"
mapping = {{ type = "text" }}
fulltext_bucket = "h1"

[[node_types.properties]]
name = "hiddenInIndex"
indexed = false

[[node_types]]
name = "Acme.Site:Text"
fulltext_enabled = false
"#
        )
        .unwrap();

        let settings = Settings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.index_name, "site");
        assert!(settings.index_all_workspaces);
        assert_eq!(settings.backend.url, "http://search:9200");

        let names: Vec<&str> = settings.node_types.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Acme.Site:Page", "Acme.Site:Text"]);

        let schema = &settings.node_types["Acme.Site:Page"];
        assert!(schema.fulltext_root);
        assert!(schema.fulltext_enabled);
        let title = &schema.properties["navigationTitle"];
        assert_eq!(title.fulltext_bucket.as_deref(), Some("h1"));
        assert_eq!(title.mapping, Some(serde_json::json!({"type": "text"})));
        assert!(title.indexed);
        assert!(!schema.properties["hiddenInIndex"].indexed);

        assert!(settings.node_type("Acme.Site:Page").is_fulltext_root());
        assert!(!settings.node_type("Acme.Site:Text").is_fulltext_enabled());
    }

    #[test]
    fn test_node_types_serialize_as_named_list() {
        let mut settings = Settings::default();
        let mut schema = NodeTypeSchema::default();
        schema
            .properties
            .insert("navigationTitle".to_string(), PropertySchema::default());
        settings.node_types.insert("Acme.Site:Page".to_string(), schema);

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["node_types"][0]["name"], "Acme.Site:Page");
        assert_eq!(
            value["node_types"][0]["properties"][0]["name"],
            "navigationTitle"
        );

        let back: Settings = serde_json::from_value(value).unwrap();
        assert_eq!(back.node_types, settings.node_types);
    }

    #[test]
    fn test_backend_password_is_redacted() {
        use secrecy::ExposeSecret;

        let settings: BackendSettings =
            serde_json::from_str(r#"{"username": "elastic", "password": "changeme"}"#).unwrap();
        assert_eq!(
            settings.password.as_ref().map(|p| p.expose_secret()),
            Some("changeme")
        );
        assert!(!format!("{:?}", settings).contains("changeme"));
        assert!(!serde_json::to_string(&settings).unwrap().contains("changeme"));
    }

    #[test]
    fn test_validate_rejects_wildcard_index_name() {
        let settings = Settings {
            index_name: "site*".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            index_name: String::new(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_node_type_resolution() {
        let mut settings = Settings::default();
        settings.node_types.insert(
            "Acme:Page".to_string(),
            NodeTypeSchema {
                fulltext_root: true,
                ..Default::default()
            },
        );

        assert!(settings.node_type("Acme:Page").is_fulltext_root());
        let unknown = settings.node_type("Acme:Text");
        assert!(!unknown.is_fulltext_root());
        assert!(unknown.is_fulltext_enabled());
    }
}
