use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub agent_socket: String,
    pub index_patterns: Vec<String>,
    pub raster_width: f64,
    pub raster_height: f64,
    pub related_events_page_size: usize,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_socket: default_uds_path(),
            index_patterns: vec!["logs-endpoint.*".to_string()],
            raster_width: 1280.0,
            raster_height: 720.0,
            related_events_page_size: 100,
            log_filter: "info".to_string(),
        }
    }
}

pub fn default_uds_path() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| {
            if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
                format!("{dir}/resolver.sock")
            } else {
                "/tmp/resolver.sock".to_string()
            }
        })
        .clone()
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "resolver")?;
    Some(proj.config_dir().join("engine.toml"))
}

pub fn load_or_default() -> EngineConfig {
    let Some(path) = config_file_path() else {
        return EngineConfig::default();
    };
    load_or_default_from_path(&path)
}

pub fn load_or_default_from_path(path: &Path) -> EngineConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return EngineConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), %err, "ignoring malformed engine config");
        EngineConfig::default()
    })
}

pub fn save(cfg: &EngineConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

pub fn save_to_path(cfg: &EngineConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize engine config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write engine config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn engine_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("engine.toml");
        let cfg = EngineConfig {
            agent_socket: "/tmp/other.sock".to_string(),
            index_patterns: vec!["a-*".to_string(), "b-*".to_string()],
            related_events_page_size: 25,
            ..EngineConfig::default()
        };

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("engine.toml");
        fs::write(&path, "log_filter = \"debug\"\n").expect("write config");

        let loaded = load_or_default_from_path(&path);
        assert_eq!(loaded.log_filter, "debug");
        assert_eq!(loaded.index_patterns, vec!["logs-endpoint.*".to_string()]);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("engine.toml");
        fs::write(&path, "raster_width = \"wide\"").expect("write config");

        assert_eq!(load_or_default_from_path(&path), EngineConfig::default());
        assert_eq!(
            load_or_default_from_path(&dir.path().join("absent.toml")),
            EngineConfig::default()
        );
    }
}
