// Device inventory tools

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    guid_schema, json_schema_boolean, json_schema_enum, json_schema_object, parse_args,
    parse_guid, remote_failure, Tool,
};
use anyhow::Result;
use dmt_sdk::{Device, DeviceStatusFilter, DmtClient};
use serde::Deserialize;
use std::sync::Arc;

/// Tool to list devices known to MPS
pub struct GetDevicesTool {
    client: Arc<DmtClient>,
}

impl GetDevicesTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct GetDevicesArgs {
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    all: bool,
}

fn device_block(device: &Device) -> String {
    format!(
        "\nConnection Status: {}\nHostname: {}\nGUID: {}\nFriendly Name: {}\n",
        device.connection_label(),
        device.hostname.as_deref().unwrap_or("-"),
        device.guid,
        device.friendly_name.as_deref().unwrap_or("-"),
    )
}

#[async_trait::async_trait]
impl Tool for GetDevicesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_devices".to_string(),
            description: "Lists all Intel AMT devices / Remote Provisioning Clients (RPC) known to the Management Presence Server (MPS).".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "status": json_schema_enum(&[0, 1], "Connection status to filter by: 0 for disconnected devices, 1 for connected devices (default: 1)"),
                    "all": json_schema_boolean("Return devices regardless of connection status; overrides status (default: false)")
                }),
                vec![],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: GetDevicesArgs = parse_args("get_devices", arguments)?;

        let filter = if args.all {
            DeviceStatusFilter::All
        } else {
            match DeviceStatusFilter::from_code(args.status.unwrap_or(1)) {
                Ok(filter) => filter,
                Err(e) => return Ok(CallToolResult::error(e.to_string())),
            }
        };

        let devices = match self.client.devices().list(filter).await {
            Ok(devices) => devices,
            Err(e) => return Ok(remote_failure("Unable to fetch devices", &e)),
        };

        if devices.is_empty() {
            return Ok(CallToolResult::text("No device."));
        }

        let blocks: Vec<String> = devices.iter().map(device_block).collect();
        Ok(CallToolResult::text(blocks.join("\n---\n")))
    }
}

/// Tool to get one device record
pub struct GetDeviceTool {
    client: Arc<DmtClient>,
}

impl GetDeviceTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct GuidArgs {
    guid: String,
}

#[async_trait::async_trait]
impl Tool for GetDeviceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_device".to_string(),
            description: "Get the MPS record of a single Intel AMT device: connection status, tags, MPS instance and connection timestamps.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({ "guid": guid_schema() }),
                vec!["guid"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: GuidArgs = parse_args("get_device", arguments)?;
        let guid = match parse_guid(&args.guid) {
            Ok(guid) => guid,
            Err(result) => return Ok(result),
        };

        let device = match self.client.devices().get(&guid).await {
            Ok(device) => device,
            Err(e) => return Ok(remote_failure("Unable to fetch device", &e)),
        };

        let mut output = device_block(&device);
        let tags = if device.tags.is_empty() {
            "-".to_string()
        } else {
            device.tags.join(", ")
        };
        output.push_str(&format!("Tags: {}\n", tags));
        output.push_str(&format!(
            "MPS Instance: {}\n",
            device.mps_instance.as_deref().filter(|s| !s.is_empty()).unwrap_or("-")
        ));
        if let Some(suffix) = device.dns_suffix.as_deref().filter(|s| !s.is_empty()) {
            output.push_str(&format!("DNS Suffix: {}\n", suffix));
        }
        for (label, stamp) in [
            ("Last Connected", device.last_connected),
            ("Last Seen", device.last_seen),
            ("Last Disconnected", device.last_disconnected),
        ] {
            if let Some(stamp) = stamp {
                output.push_str(&format!("{}: {}\n", label, stamp.to_rfc3339()));
            }
        }

        Ok(CallToolResult::text(output))
    }
}

/// Tool to get device counts
pub struct GetDeviceStatsTool {
    client: Arc<DmtClient>,
}

impl GetDeviceStatsTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for GetDeviceStatsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_device_stats".to_string(),
            description: "Count the devices known to MPS: total, connected and disconnected.".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
            annotations: None,
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        match self.client.devices().stats().await {
            Ok(stats) => Ok(CallToolResult::text(format!(
                "Total Devices: {}\nConnected: {}\nDisconnected: {}",
                stats.total_count, stats.connected_count, stats.disconnected_count
            ))),
            Err(e) => Ok(remote_failure("Unable to fetch device stats", &e)),
        }
    }
}
