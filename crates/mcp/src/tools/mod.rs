pub mod amt;
pub mod devices;
pub mod power;
pub mod provisioning;
mod registry;

pub use amt::{GetAmtVersionTool, GetAuditLogTool, GetEventLogTool, GetHardwareInfoTool};
pub use devices::{GetDeviceStatsTool, GetDeviceTool, GetDevicesTool};
pub use power::{DoPowerActionTool, GetPowerCapabilitiesTool, GetPowerStateTool};
pub use provisioning::{ListDomainsTool, ListProfilesTool};
pub use registry::{
    json_schema_boolean, json_schema_enum, json_schema_integer, json_schema_object,
    json_schema_string, Tool, ToolRegistry, ToolTier,
};

use crate::protocol::CallToolResult;
use anyhow::Context;
use dmt_sdk::{DeviceGuid, DmtClient, DmtError};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Register every DMT tool against `client`
pub fn register_dmt_tools(registry: &mut ToolRegistry, client: Arc<DmtClient>) {
    // Inventory
    registry.register(Arc::new(GetDevicesTool::new(client.clone())));
    registry.register(Arc::new(GetDeviceTool::new(client.clone())));
    registry.register(Arc::new(GetDeviceStatsTool::new(client.clone())));

    // Power
    registry.register(Arc::new(GetPowerStateTool::new(client.clone())));
    registry.register(Arc::new(GetPowerCapabilitiesTool::new(client.clone())));
    registry.register(Arc::new(DoPowerActionTool::new(client.clone())));

    // AMT information and logs
    registry.register(Arc::new(GetAmtVersionTool::new(client.clone())));
    registry.register(Arc::new(GetHardwareInfoTool::new(client.clone())));
    registry.register(Arc::new(GetEventLogTool::new(client.clone())));
    registry.register(Arc::new(GetAuditLogTool::new(client.clone())));

    // Provisioning (RPS)
    registry.register(Arc::new(ListProfilesTool::new(client.clone())));
    registry.register(Arc::new(ListDomainsTool::new(client)));
}

/// Deserialize tool arguments, treating a missing object as empty
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, arguments: serde_json::Value) -> anyhow::Result<T> {
    let arguments = if arguments.is_null() {
        serde_json::json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).with_context(|| format!("Invalid arguments for {}", tool))
}

/// Validate a GUID argument, or produce the error result to return
pub(crate) fn parse_guid(raw: &str) -> Result<DeviceGuid, CallToolResult> {
    DeviceGuid::parse(raw).map_err(|e| CallToolResult::error(e.to_string()))
}

/// Tool error result for a failed MPS/RPS call
pub(crate) fn remote_failure(what: &str, error: &DmtError) -> CallToolResult {
    tracing::warn!(error = %error, "{}", what);
    CallToolResult::error(format!("{}: {}", what, error))
}

pub(crate) fn guid_schema() -> serde_json::Value {
    json_schema_string("GUID of the Intel AMT device, e.g. 4c4c4544-0044-4810-8033-b4c04f4e4332")
}
