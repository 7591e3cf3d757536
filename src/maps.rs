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

//! Network map operations and the element/link layout they submit.

use crate::client::ZabbixClient;
use crate::error::ZbxError;
use crate::operations::{records, text_field};
use crate::output::print_json;
use crate::prompt::Prompt;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::io::Write;
use tracing::{info, warn};

const GRID_ORIGIN_X: i64 = 36;
const GRID_ORIGIN_Y: i64 = 51;
const GRID_STEP_X: i64 = 160;
const GRID_STEP_Y: i64 = 80;
const GRID_WRAP_X: i64 = 1000;

const SERVER_ICON: &str = "95"; // Rackmountable_1U_server_3D_(128)
const ADAPTER_ICON: &str = "62"; // Network_adapter_(24)
const HOST_LABEL: &str = "{HOST.NAME}";
const LINK_COLOR: &str = "00CC00";
const IF_STATUS_ITEM: &str = "ifOperStatus";

const UPDATE_HOST_X: i64 = 20;
const UPDATE_ADAPTER_X: i64 = 200;
const UPDATE_BOTTOM_MARGIN: i64 = 100;
const UPDATE_ADAPTER_LABEL: &str = "ethernet";

pub const DEFAULT_ADAPTERS: usize = 4;

const INTERFACE_ABBREVIATIONS: [(&str, &str); 3] = [
    ("FastEthernet", "Fa"),
    ("GigabitEthernet", "Gi"),
    ("Port-channel", "Po"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementType {
    #[serde(rename = "0")]
    Host,
    #[serde(rename = "4")]
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapElement {
    #[serde(rename = "elementid")]
    pub element_id: String,
    #[serde(rename = "selementid")]
    pub local_id: u64,
    #[serde(rename = "elementtype")]
    pub element_type: ElementType,
    pub label: String,
    #[serde(rename = "iconid_off")]
    pub icon_id: &'static str,
    pub x: i64,
    pub y: i64,
}

/// Edge between two elements, by their map-local ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapLink {
    #[serde(rename = "selementid1")]
    pub from: u64,
    #[serde(rename = "selementid2")]
    pub to: u64,
    pub color: &'static str,
}

impl MapLink {
    fn new(from: u64, to: u64) -> Self {
        Self {
            from,
            to,
            color: LINK_COLOR,
        }
    }
}

/// Row-major placement cursor; wraps to a new row once x passes 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    x: i64,
    y: i64,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            x: GRID_ORIGIN_X,
            y: GRID_ORIGIN_Y,
        }
    }
}

impl Grid {
    pub fn next_slot(&mut self) -> (i64, i64) {
        let slot = (self.x, self.y);
        self.x += GRID_STEP_X;
        if self.x > GRID_WRAP_X {
            self.x = GRID_ORIGIN_X;
            self.y += GRID_STEP_Y;
        }
        slot
    }
}

/// Elements and links of a map under construction. Local ids are handed
/// out in insertion order, so every link points at an existing element.
#[derive(Debug, Default)]
pub struct MapLayout {
    grid: Grid,
    next_local_id: u64,
    elements: Vec<MapElement>,
    links: Vec<MapLink>,
}

impl MapLayout {
    pub fn add_host(&mut self, host_id: &str) -> u64 {
        let local_id = self.take_local_id();
        let (x, y) = self.grid.next_slot();
        self.elements.push(MapElement {
            element_id: host_id.to_string(),
            local_id,
            element_type: ElementType::Host,
            label: HOST_LABEL.to_string(),
            icon_id: SERVER_ICON,
            x,
            y,
        });
        local_id
    }

    pub fn add_interface(&mut self, host: u64, label: String) -> u64 {
        let local_id = self.take_local_id();
        let (x, y) = self.grid.next_slot();
        self.elements.push(MapElement {
            element_id: local_id.to_string(),
            local_id,
            element_type: ElementType::Image,
            label,
            icon_id: ADAPTER_ICON,
            x,
            y,
        });
        self.links.push(MapLink::new(host, local_id));
        local_id
    }

    pub fn elements(&self) -> &[MapElement] {
        &self.elements
    }

    pub fn links(&self) -> &[MapLink] {
        &self.links
    }

    fn take_local_id(&mut self) -> u64 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        id
    }
}

/// Short label for an `ifOperStatus[...]` item: the bracketed interface
/// name with the usual Cisco prefixes abbreviated.
pub fn interface_label(item_name: &str) -> Option<String> {
    let raw = item_name.split(['[', ']']).nth(1)?;
    let label = INTERFACE_ABBREVIATIONS
        .iter()
        .fold(raw.to_string(), |acc, (long, short)| acc.replace(long, short));
    Some(label)
}

pub fn map_create(
    client: &mut ZabbixClient,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
    group_id: u64,
) -> Result<()> {
    let hosts = client.call_result("host.get", &json!({"output": ["host"], "groupids": group_id}))?;

    let name = prompt.ask("map name: ")?;
    if name.is_empty() {
        return Err(ZbxError::Input("you have to register a name".into()).into());
    }

    let mut layout = MapLayout::default();
    for host in records(&hosts) {
        let host_id = text_field(host, "hostid")?;
        let host_local = layout.add_host(&host_id);

        let items = client.call_result(
            "item.get",
            &json!({
                "output": ["name"],
                "hostids": host_id,
                "search": {"name": IF_STATUS_ITEM}
            }),
        )?;
        for item in records(&items) {
            let item_name = item.get("name").and_then(Value::as_str).unwrap_or_default();
            match interface_label(item_name) {
                Some(label) => {
                    layout.add_interface(host_local, label);
                }
                None => warn!(item = item_name, "item name has no bracketed interface"),
            }
        }
    }
    info!(
        elements = layout.elements().len(),
        links = layout.links().len(),
        "creating map"
    );

    let params = json!({
        "name": name,
        "width": 1200,
        "height": 1200,
        "label_type": 0,
        "label_location": 0,
        "highlight": 0,
        "expandproblem": 0,
        "expand_macros": 1,
        "grid_size": 40,
        "selements": layout.elements(),
        "links": layout.links(),
        "urls": []
    });
    let result = client.call_result("map.create", &params)?;
    print_json(out, &result)
}

pub fn map_delete(
    client: &mut ZabbixClient,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
    map_id: &str,
) -> Result<()> {
    let maps = client.call_result("map.get", &json!({"output": ["name"], "sysmapids": map_id}))?;
    let name = records(&maps)
        .first()
        .map(|map| text_field(map, "name"))
        .transpose()?
        .unwrap_or_default();

    if !prompt.confirm(&format!("Delete map [{name}] OK? (y/n): "))? {
        return Err(ZbxError::UserCancelled.into());
    }

    let result = client.call_result("map.delete", &json!([map_id]))?;
    print_json(out, &result)
}

/// Appends one host and `adapters` network adapter images, all linked to
/// the host, along the bottom edge of an existing map.
pub fn map_update(
    client: &mut ZabbixClient,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
    map_id: &str,
    host: &str,
    adapters: usize,
) -> Result<()> {
    let maps = client.call_result(
        "map.get",
        &json!({
            "output": ["name", "height"],
            "selectSelements": "extend",
            "selectLinks": "extend",
            "sysmapids": map_id
        }),
    )?;
    let [map] = records(&maps) else {
        return Err(ZbxError::Precondition("number of map is not 1".into()).into());
    };
    let name = text_field(map, "name")?;
    let height: i64 = text_field(map, "height")?
        .parse()
        .map_err(|_| ZbxError::Precondition(format!("map [{name}] has no numeric height")))?;
    let mut selements = map
        .get("selements")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut links = map
        .get("links")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let hosts = client.call_result("host.get", &json!({"output": ["hostid"], "search": {"host": host}}))?;
    let [found] = records(&hosts) else {
        return Err(ZbxError::Precondition("number of host is not 1".into()).into());
    };
    let host_id = text_field(found, "hostid")?;

    if !prompt.confirm(&format!("Update map [{name}] OK? (y/n): "))? {
        return Err(ZbxError::UserCancelled.into());
    }

    let y = height - UPDATE_BOTTOM_MARGIN;
    let host_element = MapElement {
        element_id: host_id,
        local_id: 0,
        element_type: ElementType::Host,
        label: HOST_LABEL.to_string(),
        icon_id: SERVER_ICON,
        x: UPDATE_HOST_X,
        y,
    };
    selements.push(serde_json::to_value(&host_element).context("encoding map element")?);
    for local_id in 1..=adapters as u64 {
        let adapter = MapElement {
            element_id: "0".to_string(),
            local_id,
            element_type: ElementType::Image,
            label: UPDATE_ADAPTER_LABEL.to_string(),
            icon_id: ADAPTER_ICON,
            x: UPDATE_ADAPTER_X,
            y,
        };
        selements.push(serde_json::to_value(&adapter).context("encoding map element")?);
        links.push(serde_json::to_value(MapLink::new(0, local_id)).context("encoding map link")?);
    }

    let result = client.call_result(
        "map.update",
        &json!({"sysmapid": map_id, "selements": selements, "links": links}),
    )?;
    print_json(out, &result)
}
