// zbxctl - CLI for the Zabbix JSON-RPC API
// Copyright (C) 2024 zbxctl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_PROTOCOL: &str = "https";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerEntry>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub address: String,
    pub username: String,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a config directory for the current user")]
    MissingConfigDir,
    #[error("no such zabbix server: {0}")]
    UnknownServer(String),
}

/// Connection details for one alias after both scopes are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProfile {
    pub address: String,
    pub username: String,
    pub protocol: String,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".zbxctl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("ZBXCTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("zbxctl").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn resolve(cwd: &Path, alias: &str) -> Result<ServerProfile> {
    let merged = load(cwd)?;
    let entry = merged
        .servers
        .get(alias)
        .ok_or_else(|| ConfigError::UnknownServer(alias.to_string()))?;

    Ok(ServerProfile {
        address: entry.address.trim().to_string(),
        username: entry.username.clone(),
        protocol: entry
            .protocol
            .clone()
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(user: Config, local: Config) -> Config {
    let mut servers = user.servers;
    servers.extend(local.servers);
    Config { servers }
}
