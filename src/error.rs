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

use serde_json::Value;
use thiserror::Error;

/// Failures that abort a run. Every variant ends the process with status 1.
#[derive(Debug, Error)]
pub enum ZbxError {
    #[error("{0}")]
    Argument(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with an `error` member or an empty `result`.
    #[error("api error: {message}")]
    Api { message: String, envelope: Value },
    /// An interactive answer was rejected, e.g. an empty name.
    #[error("{0}")]
    Input(String),
    #[error("user cancel")]
    UserCancelled,
    #[error("{0}")]
    Precondition(String),
}

impl ZbxError {
    pub fn missing_flags(operation: &str, flags: &[&str]) -> Self {
        let rendered: Vec<String> = flags.iter().map(|f| format!("--{f}")).collect();
        ZbxError::Argument(format!(
            "if execute {operation}, {} option is needed",
            rendered.join(" and ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_flags_lists_every_flag() {
        let err = ZbxError::missing_flags("map_update", &["mapid", "host"]);
        assert_eq!(
            err.to_string(),
            "if execute map_update, --mapid and --host option is needed"
        );
    }
}
