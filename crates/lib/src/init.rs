//! Initialize the configuration directory: create ~/.relay, a default config and PERSONA.md.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config;

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing (all settings default or come from env).
/// - Seeds `PERSONA.md` with the bundled persona if missing.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config::config_dir(config_path);
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let persona = config_dir.join("PERSONA.md");
    if !persona.exists() {
        std::fs::write(&persona, config::DEFAULT_PERSONA)
            .with_context(|| format!("writing default PERSONA.md to {}", persona.display()))?;
        log::info!("wrote default PERSONA.md to {}", persona.display());
    } else {
        log::debug!("PERSONA.md already exists at {}, skipping", persona.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("relay-init-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn creates_config_and_persona() {
        let dir = temp_dir();
        let config_path = dir.join("config.json");
        let out = init_config_dir(&config_path).unwrap();
        assert_eq!(out, dir);
        assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "{}");
        assert_eq!(
            std::fs::read_to_string(dir.join("PERSONA.md")).unwrap(),
            config::DEFAULT_PERSONA
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn keeps_existing_files() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.json");
        std::fs::write(&config_path, r#"{"gateway":{"port":8080}}"#).unwrap();
        std::fs::write(dir.join("PERSONA.md"), "Custom persona").unwrap();

        init_config_dir(&config_path).unwrap();

        let (config, _) = config::load_config(Some(config_path.clone())).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config::resolve_persona(&config, &config_path), "Custom persona");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
