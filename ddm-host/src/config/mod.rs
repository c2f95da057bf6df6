//! Configuration module for ddm-host.
//!
//! Handles loading configuration from a TOML file and CLI arguments, and
//! turning the declarative adapter sections into coordinator adapters.

pub mod file;

use crate::config::file::{AdapterSection, CoordinatorSection, FileConfig};
use compact_str::CompactString;
use ddm_core::CoordinatorConfig;
use ddm_core::coordinator::{AdapterConfig, Trigger};
use ddm_sdk::Event;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub coordinator: CoordinatorConfig,
    pub state: Value,
    pub adapters: Vec<AdapterConfig>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    force_gate_override: bool,
}

impl ConfigLoader {
    /// Create a new config loader. Without a path the defaults are used.
    pub fn new(config_path: Option<&Path>, force_gate_override: bool) -> Self {
        Self {
            config_path: config_path.map(Path::to_path_buf),
            force_gate_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if any
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = match &self.config_path {
            Some(path) => {
                let config_content = std::fs::read_to_string(path)?;
                toml::from_str(&config_content)?
            }
            None => FileConfig::default(),
        };

        if self.force_gate_override {
            file_config.coordinator.force_gate_synthesis = true;
        }

        validate(&file_config)?;

        Ok(build_loaded_config(file_config))
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let coordinator = &config.coordinator;
    if coordinator.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "coordinator.tick_interval_ms must be positive".to_string(),
        ));
    }
    if coordinator.gate_event.is_empty() {
        return Err(ConfigError::ValidationError(
            "coordinator.gate_event must not be empty".to_string(),
        ));
    }
    if let Some(state) = &config.state {
        if !state.is_object() {
            return Err(ConfigError::ValidationError(
                "state must be a table".to_string(),
            ));
        }
    }

    for (index, adapter) in config.adapters.iter().enumerate() {
        if adapter.name.is_empty() || adapter.setting.is_empty() || adapter.emit.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "adapter #{index} needs a name, an event/selector and an emit name"
            )));
        }
        if config.adapters[..index]
            .iter()
            .any(|other| other.name == adapter.name)
        {
            return Err(ConfigError::ValidationError(format!(
                "duplicate adapter name {:?}",
                adapter.name
            )));
        }
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        coordinator: convert_coordinator(file_config.coordinator),
        state: file_config
            .state
            .unwrap_or_else(|| Value::Object(Map::new())),
        adapters: file_config
            .adapters
            .into_iter()
            .map(convert_adapter)
            .collect(),
    }
}

fn convert_coordinator(c: CoordinatorSection) -> CoordinatorConfig {
    CoordinatorConfig {
        tick_interval: Duration::from_millis(c.tick_interval_ms),
        gate_event: c.gate_event.into(),
        synthetic_gate_source: c.synthetic_gate_source.into(),
        force_gate_synthesis: c.force_gate_synthesis,
        enrich_keys: c.enrich_keys.into_iter().map(CompactString::from).collect(),
    }
}

/// Event keys a payload may not overwrite.
const RESERVED_FIELDS: [&str; 4] = ["name", "timestamp", "hasFired", "enrichEventData"];

/// Build an adapter that appends `emit` with the static fields.
///
/// For external triggers the fields of an object payload are copied onto
/// the event first; static fields win on conflict.
fn convert_adapter(a: AdapterSection) -> AdapterConfig {
    let trigger = Trigger::from(a.trigger.as_str());
    let copy_payload = trigger != Trigger::Event;
    let emit = a.emit;
    let fields = a.fields;
    AdapterConfig {
        name: a.name.into(),
        trigger,
        setting: a.setting.into(),
        handler: Box::new(move |payload: &Value| {
            let mut event = Event::new(emit.as_str());
            if copy_payload {
                if let Value::Object(map) = payload {
                    event.fields.extend(
                        map.iter()
                            .filter(|(k, _)| !RESERVED_FIELDS.contains(&k.as_str()))
                            .map(|(k, v)| (k.clone(), v.clone())),
                    );
                }
            }
            event
                .fields
                .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(Some(event))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ddm-host-{}-{name}.toml", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let loaded = ConfigLoader::new(None, false).load().unwrap();
        assert_eq!(loaded.coordinator, CoordinatorConfig::default());
        assert_eq!(loaded.state, json!({}));
        assert!(loaded.adapters.is_empty());
    }

    #[test]
    fn test_cli_override_forces_gate() {
        let loaded = ConfigLoader::new(None, true).load().unwrap();
        assert!(loaded.coordinator.force_gate_synthesis);
    }

    #[test]
    fn test_load_from_file() {
        let path = write_config(
            "load",
            r#"
[coordinator]
tick_interval_ms = 50

[state.website]
region = "eu"

[[adapters]]
name = "scroll"
trigger = "scroll"
selector = "50%"
emit = "Scrolled Half"
"#,
        );
        let loaded = ConfigLoader::new(Some(&path), false).load().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.coordinator.tick_interval, Duration::from_millis(50));
        assert_eq!(loaded.state, json!({"website": {"region": "eu"}}));
        assert_eq!(loaded.adapters.len(), 1);
        assert_eq!(
            loaded.adapters[0].trigger,
            Trigger::External("scroll".into())
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = FileConfig::default();
        config.coordinator.tick_interval_ms = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError(_))
        ));

        let adapter = AdapterSection {
            name: "a".to_string(),
            trigger: "event".to_string(),
            setting: "Viewed Page".to_string(),
            emit: "X".to_string(),
            fields: Map::new(),
        };
        let config = FileConfig {
            adapters: vec![adapter.clone(), adapter],
            ..FileConfig::default()
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("ddm-host-does-not-exist.toml");
        assert!(matches!(
            ConfigLoader::new(Some(&path), false).load(),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_adapter_handler_builds_event() {
        let mut external = convert_adapter(AdapterSection {
            name: "banner".to_string(),
            trigger: "click".to_string(),
            setting: ".banner".to_string(),
            emit: "Clicked Banner".to_string(),
            fields: [("position".to_string(), json!("top"))].into_iter().collect(),
        });
        let event = (external.handler)(&json!({"id": "b1", "position": "side", "name": "x"}))
            .unwrap()
            .unwrap();
        assert_eq!(event.name, "Clicked Banner");
        assert_eq!(event.field("name"), None);
        assert_eq!(event.field("id"), Some(&json!("b1")));
        assert_eq!(event.field("position"), Some(&json!("top")));

        let mut chained = convert_adapter(AdapterSection {
            name: "cart".to_string(),
            trigger: "event".to_string(),
            setting: "Viewed Page".to_string(),
            emit: "Viewed Cart".to_string(),
            fields: Map::new(),
        });
        let event = (chained.handler)(&json!({"name": "Viewed Page", "page": "cart"}))
            .unwrap()
            .unwrap();
        assert_eq!(event.field("page"), None);
    }
}
