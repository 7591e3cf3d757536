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

//! The named operations `-m` can select, plus the raw file passthrough.

use crate::client::ZabbixClient;
use crate::error::ZbxError;
use crate::maps::{self, DEFAULT_ADAPTERS};
use crate::output::print_json;
use crate::prompt::Prompt;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, TimeZone};
use clap::Args;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::io::Write;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

pub const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
const MAINTENANCE_PERIOD_SECS: u64 = 5 * 60 * 60;

pub const OPERATIONS: [&str; 8] = [
    "host_get_search",
    "host_get_gid",
    "maintenance_create",
    "map_create",
    "map_delete",
    "map_update",
    "item_get_search",
    "history_get",
];

#[derive(Debug, Clone, Args)]
pub struct OperationArgs {
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON file sent verbatim as the params of the -m API method (no validation)"
    )]
    pub file: Option<PathBuf>,
    #[arg(long, help = "Host name (substring match)")]
    pub host: Option<String>,
    #[arg(long, value_name = "ID", help = "Map id")]
    pub mapid: Option<String>,
    #[arg(long, value_name = "ID", help = "Host group id")]
    pub gid: Option<u64>,
    #[arg(long, help = "Item key (substring match)")]
    pub key: Option<String>,
    #[arg(long, value_name = "ID", help = "Item id")]
    pub itemid: Option<u64>,
    #[arg(
        long = "time_from",
        value_name = "YYYY/MM/DD HH:MM:SS",
        help = "History start, local time"
    )]
    pub time_from: Option<String>,
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_ADAPTERS,
        help = "Network adapters map_update attaches to the host"
    )]
    pub ports: usize,
}

/// A fully validated request for one run. Building it touches no network.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Raw { method: String, params: Value },
    HostGetSearch { host: String },
    HostGetGid { group_id: u64 },
    MaintenanceCreate { host: String },
    MapCreate { group_id: u64 },
    MapDelete { map_id: String },
    MapUpdate { map_id: String, host: String, adapters: usize },
    ItemGetSearch { host: String, key: String },
    HistoryGet { item_id: u64, time_from: i64 },
}

impl Invocation {
    pub fn from_args(method: &str, args: &OperationArgs) -> Result<Self, ZbxError> {
        if let Some(path) = &args.file {
            return Ok(Invocation::Raw {
                method: method.to_string(),
                params: read_params(path)?,
            });
        }

        let missing = |flags: &[&str]| ZbxError::missing_flags(method, flags);
        let invocation = match method {
            "host_get_search" => Invocation::HostGetSearch {
                host: args.host.clone().ok_or_else(|| missing(&["host"]))?,
            },
            "host_get_gid" => Invocation::HostGetGid {
                group_id: args.gid.ok_or_else(|| missing(&["gid"]))?,
            },
            "maintenance_create" => Invocation::MaintenanceCreate {
                host: args.host.clone().ok_or_else(|| missing(&["host"]))?,
            },
            "map_create" => Invocation::MapCreate {
                group_id: args.gid.ok_or_else(|| missing(&["gid"]))?,
            },
            "map_delete" => Invocation::MapDelete {
                map_id: args.mapid.clone().ok_or_else(|| missing(&["mapid"]))?,
            },
            "map_update" => match (&args.mapid, &args.host) {
                (Some(map_id), Some(host)) => Invocation::MapUpdate {
                    map_id: map_id.clone(),
                    host: host.clone(),
                    adapters: args.ports,
                },
                _ => return Err(missing(&["mapid", "host"])),
            },
            "item_get_search" => match (&args.host, &args.key) {
                (Some(host), Some(key)) => Invocation::ItemGetSearch {
                    host: host.clone(),
                    key: key.clone(),
                },
                _ => return Err(missing(&["host", "key"])),
            },
            "history_get" => match (args.itemid, &args.time_from) {
                (Some(item_id), Some(time_from)) => Invocation::HistoryGet {
                    item_id,
                    time_from: parse_local_time(time_from)?,
                },
                _ => return Err(missing(&["itemid", "time_from"])),
            },
            _ => {
                return Err(ZbxError::Argument(format!(
                    "no such function: {method} (expected one of {})",
                    OPERATIONS.join(", ")
                )));
            }
        };
        Ok(invocation)
    }

    pub fn execute(
        self,
        client: &mut ZabbixClient,
        prompt: &mut dyn Prompt,
        out: &mut dyn Write,
    ) -> Result<()> {
        match self {
            Invocation::Raw { method, params } => raw_request(client, out, &method, &params),
            Invocation::HostGetSearch { host } => host_get_search(client, out, &host),
            Invocation::HostGetGid { group_id } => host_get_gid(client, out, group_id),
            Invocation::MaintenanceCreate { host } => {
                maintenance_create(client, prompt, out, &host)
            }
            Invocation::MapCreate { group_id } => maps::map_create(client, prompt, out, group_id),
            Invocation::MapDelete { map_id } => maps::map_delete(client, prompt, out, &map_id),
            Invocation::MapUpdate {
                map_id,
                host,
                adapters,
            } => maps::map_update(client, prompt, out, &map_id, &host, adapters),
            Invocation::ItemGetSearch { host, key } => item_get_search(client, out, &host, &key),
            Invocation::HistoryGet { item_id, time_from } => {
                history_get(client, out, item_id, time_from)
            }
        }
    }
}

fn read_params(path: &Path) -> Result<Value, ZbxError> {
    if !path.is_file() {
        return Err(ZbxError::Argument(format!(
            "file is not exists: {}",
            path.display()
        )));
    }
    let contents = fs::read_to_string(path)
        .map_err(|err| ZbxError::Argument(format!("reading {}: {err}", path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|err| ZbxError::Argument(format!("parsing {}: {err}", path.display())))
}

/// Epoch seconds for a `YYYY/MM/DD HH:MM:SS` wall-clock time in the local zone.
pub fn parse_local_time(text: &str) -> Result<i64, ZbxError> {
    let naive = NaiveDateTime::parse_from_str(text, TIME_FORMAT).map_err(|_| {
        ZbxError::Argument(format!(
            "--time_from must look like YYYY/MM/DD HH:MM:SS, got `{text}`"
        ))
    })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.timestamp())
        .ok_or_else(|| ZbxError::Argument(format!("`{text}` does not exist in the local time zone")))
}

pub fn format_local_time(epoch: i64) -> Option<String> {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|t| t.format(TIME_FORMAT).to_string())
}

/// Unchecked passthrough: `params` go to `method` exactly as read.
pub fn raw_request(
    client: &mut ZabbixClient,
    out: &mut dyn Write,
    method: &str,
    params: &Value,
) -> Result<()> {
    info!(method, "raw request from file");
    let result = client.call_result(method, params)?;
    print_json(out, &result)
}

pub fn host_get_search(client: &mut ZabbixClient, out: &mut dyn Write, host: &str) -> Result<()> {
    let result = client.call_result(
        "host.get",
        &json!({
            "output": ["host"],
            "selectInventory": ["model", "serialno_a"],
            "selectGroups": "extend",
            "search": {"host": host}
        }),
    )?;
    print_json(out, &result)
}

pub fn host_get_gid(client: &mut ZabbixClient, out: &mut dyn Write, group_id: u64) -> Result<()> {
    let result = client.call_result(
        "host.get",
        &json!({"output": ["host"], "sortfield": "host", "groupids": group_id}),
    )?;
    print_json(out, &result)
}

/// Puts the confirmed groups of every matching host into a five hour
/// one-time maintenance. Each group is asked about once.
pub fn maintenance_create(
    client: &mut ZabbixClient,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
    host: &str,
) -> Result<()> {
    let hosts = client.call_result(
        "host.get",
        &json!({"output": "extend", "selectGroups": "extend", "search": {"host": host}}),
    )?;

    let mut asked = HashSet::new();
    let mut group_ids = Vec::new();
    for record in records(&hosts) {
        writeln!(out, "[{}]", text_field(record, "host")?).context("writing output")?;
        let groups = record.get("groups").map(records).unwrap_or_default();
        for group in groups {
            let group_id = text_field(group, "groupid")?;
            if !asked.insert(group_id.clone()) {
                continue;
            }
            let name = text_field(group, "name")?;
            if prompt.confirm(&format!("{name} really maintenance? (y/n): "))? {
                writeln!(out, "add!").context("writing output")?;
                group_ids.push(group_id);
            } else {
                writeln!(out, "not add!").context("writing output")?;
            }
        }
    }

    if group_ids.is_empty() {
        return Err(ZbxError::Precondition("no hostgroup to maintenance".into()).into());
    }
    let name = prompt.ask("maintenance name: ")?;
    if name.is_empty() {
        return Err(ZbxError::Input("you have to register a name".into()).into());
    }

    let result = client.call_result(
        "maintenance.create",
        &json!({
            "name": name,
            "groupids": group_ids,
            "timeperiods": [{"timeperiod_type": 0, "period": MAINTENANCE_PERIOD_SECS}]
        }),
    )?;
    print_json(out, &result)
}

pub fn item_get_search(
    client: &mut ZabbixClient,
    out: &mut dyn Write,
    host: &str,
    key: &str,
) -> Result<()> {
    let result = client.call_result(
        "item.get",
        &json!({
            "output": ["itemid", "key_", "name"],
            "host": host,
            "search": {"key_": key}
        }),
    )?;
    print_json(out, &result)
}

/// Prints one `YYYY/MM/DD HH:MM:SS,value` line per sample.
pub fn history_get(
    client: &mut ZabbixClient,
    out: &mut dyn Write,
    item_id: u64,
    time_from: i64,
) -> Result<()> {
    let result = client.call_result(
        "history.get",
        &json!({"output": "extend", "itemids": item_id, "time_from": time_from}),
    )?;

    for sample in records(&result) {
        let clock = text_field(sample, "clock")?;
        let stamp = clock
            .parse::<i64>()
            .ok()
            .and_then(format_local_time)
            .ok_or_else(|| ZbxError::Precondition(format!("sample clock `{clock}` is not a time")))?;
        let value = text_field(sample, "value")?;
        writeln!(out, "{stamp},{value}").context("writing output")?;
    }
    Ok(())
}

pub(crate) fn records(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// Zabbix encodes ids and sizes as strings; accept plain numbers as well.
pub(crate) fn text_field(record: &Value, key: &str) -> Result<String> {
    match record.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ZbxError::Precondition(format!("response record lacks `{key}`")).into()),
    }
}
