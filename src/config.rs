// Lecture de la configuration du routeur, resolue par hostname.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InterfaceConfig {
    pub name: String,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub bandwidth_bps: f64,
    /// Port local sur lequel cette interface ecoute les connexions entrantes.
    /// Chaque interface bind son propre listener, a l'image de `router.py`
    /// ou chaque `Interface` possede son propre `IfaceRx`.
    pub listen_port: u16,
    pub peer_addr: String,
    pub peer_port: u16,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RouterConfig {
    pub router_id: String,
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
    #[serde(default)]
    pub control_port: Option<u16>,
}

/// Lit la configuration du routeur local, deduite du hostname de la machine.
pub fn read_router_config(config_dir: &str) -> Result<RouterConfig> {
    let hostname = local_hostname()?;
    read_router_config_for(config_dir, &hostname)
}

/// Lit la configuration d'un routeur donne par son nom, sans passer par le hostname.
/// Utilise par les tests et par `read_router_config`.
pub fn read_router_config_for(config_dir: &str, name: &str) -> Result<RouterConfig> {
    let config_path = format!("{}/config_{}.toml", config_dir, name);

    if !Path::new(&config_path).exists() {
        return Err(AppError::ConfigError(format!(
            "Config file not found: {}. Available configs: {}",
            config_path,
            list_available_configs(config_dir)
        )));
    }

    let config_content = fs::read_to_string(&config_path)
        .map_err(|e| AppError::ConfigError(format!("Failed to read config file {}: {}", config_path, e)))?;

    let config: RouterConfig = toml::from_str(&config_content)
        .map_err(|e| AppError::ConfigError(format!("Failed to parse config file {}: {}", config_path, e)))?;

    log::info!("Loaded configuration for router: {}", name);
    log::debug!("Config: {:?}", config);

    Ok(config)
}

fn local_hostname() -> Result<String> {
    hostname::get()
        .map_err(|e| AppError::ConfigError(format!("Failed to get hostname: {}", e)))?
        .to_string_lossy()
        .to_string()
        .split('.')
        .next()
        .ok_or_else(|| AppError::ConfigError("Invalid hostname".to_string()))
        .map(|s| s.to_string())
}

fn list_available_configs(config_dir: &str) -> String {
    if let Ok(entries) = fs::read_dir(config_dir) {
        let configs: Vec<String> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if path.extension()? == "toml" {
                    path.file_name()?.to_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect();
        configs.join(", ")
    } else {
        "Unable to list config directory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_a_config_file_by_explicit_name() {
        let dir = std::env::temp_dir().join(format!("ospf_cfg_test_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config_R1.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
            router_id = "R1"

            [[interfaces]]
            name = "eth0"
            address = "10.0.0.1"
            netmask = "255.255.255.0"
            bandwidth_bps = 1.0e8
            listen_port = 9000
            peer_addr = "127.0.0.1"
            peer_port = 9001
            "#
        )
        .unwrap();

        let cfg = read_router_config_for(dir.to_str().unwrap(), "R1").unwrap();
        assert_eq!(cfg.router_id, "R1");
        assert_eq!(cfg.interfaces.len(), 1);
        assert_eq!(cfg.interfaces[0].name, "eth0");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let dir = std::env::temp_dir().join(format!("ospf_cfg_missing_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let result = read_router_config_for(dir.to_str().unwrap(), "ghost");
        assert!(matches!(result, Err(AppError::ConfigError(_))));
        fs::remove_dir_all(&dir).ok();
    }
}
