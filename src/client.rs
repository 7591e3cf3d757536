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

//! Single-session JSON-RPC client for the Zabbix API.

use crate::error::ZbxError;
use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

pub const API_PATH: &str = "zabbix/api_jsonrpc.php";
const JSONRPC_VERSION: &str = "2.0";
const CONTENT_TYPE_JSONRPC: &str = "application/json-rpc";

#[derive(Debug, Serialize)]
struct RequestEnvelope<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    auth: Option<&'a str>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug)]
pub struct ZabbixClient {
    endpoint: Url,
    http: Client,
    auth: Option<String>,
    next_id: u64,
}

impl ZabbixClient {
    /// Opens a session: issues `user.login` and keeps the returned token.
    pub fn login(address: &str, protocol: &str, user: &str, password: &str) -> Result<Self> {
        let mut client = Self::unauthenticated(address, protocol)?;
        let params = json!({ "user": user, "password": password });

        let envelope = client.call("user.login", &params).map_err(|err| {
            let rejected = match err.downcast_ref::<ZbxError>() {
                Some(ZbxError::Transport(_)) | None => None,
                Some(other) => Some(other.to_string()),
            };
            match rejected {
                Some(reason) => ZbxError::Authentication(reason).into(),
                None => err,
            }
        })?;

        let token = envelope
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| ZbxError::Authentication("wrong password".into()))?;
        client.auth = Some(token.to_string());
        debug!(user, "logged in");
        Ok(client)
    }

    fn unauthenticated(address: &str, protocol: &str) -> Result<Self> {
        let raw = format!("{protocol}://{address}/{API_PATH}");
        let endpoint = Url::parse(&raw)
            .map_err(|err| ZbxError::Transport(format!("invalid endpoint `{raw}`: {err}")))?;
        let http = Client::builder()
            .user_agent(HeaderValue::from_static("zbxctl/0.1"))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            endpoint,
            http,
            auth: None,
            next_id: 1,
        })
    }

    /// Id the next envelope will carry.
    pub fn next_request_id(&self) -> u64 {
        self.next_id
    }

    /// Sends one request and returns the checked response envelope.
    pub fn call(&mut self, method: &str, params: &Value) -> Result<Value> {
        let id = self.next_id;
        let body = serde_json::to_vec(&RequestEnvelope {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            auth: self.auth.as_deref(),
            id,
        })
        .context("serializing request envelope")?;
        self.next_id += 1;

        debug!(method, id, "sending request");
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSONRPC))
            .header(USER_AGENT, HeaderValue::from_static("zbxctl/0.1"))
            .body(body)
            .send()
            .map_err(|err| ZbxError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|err| ZbxError::Transport(format!("reading response body: {err}")))?;
        if !status.is_success() {
            warn!(method, id, %status, "http failure");
            return Err(ZbxError::Transport(format!("HTTP {status}: {text}")).into());
        }

        let envelope: Value = serde_json::from_str(&text)
            .map_err(|err| ZbxError::Transport(format!("response is not JSON: {err}")))?;
        check_envelope(envelope)
    }

    /// Like [`call`](Self::call) but hands back only the `result` member.
    pub fn call_result(&mut self, method: &str, params: &Value) -> Result<Value> {
        let mut envelope = self.call(method, params)?;
        Ok(envelope
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

/// Rejects an error envelope and an empty `result`, even where an empty
/// list would be a legitimate answer.
fn check_envelope(envelope: Value) -> Result<Value> {
    if let Some(raw) = envelope.get("error") {
        let message = match serde_json::from_value::<RpcError>(raw.clone()) {
            Ok(err) => describe(&err),
            Err(_) => raw.to_string(),
        };
        warn!(%message, "api returned an error");
        return Err(ZbxError::Api { message, envelope }.into());
    }

    let empty = match envelope.get("result") {
        None => Some("response carries no result"),
        Some(result) if is_empty(result) => Some("empty result"),
        Some(_) => None,
    };
    if let Some(message) = empty {
        return Err(ZbxError::Api {
            message: message.to_string(),
            envelope,
        }
        .into());
    }

    Ok(envelope)
}

fn describe(err: &RpcError) -> String {
    let data = match &err.data {
        Value::Null => String::new(),
        Value::String(s) => format!(" {s}"),
        other => format!(" {other}"),
    };
    format!("{}{} (code {})", err.message, data, err.code)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
