// Power state and power action tools

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    guid_schema, json_schema_boolean, json_schema_enum, json_schema_object, parse_args,
    parse_guid, remote_failure, Tool, ToolTier,
};
use anyhow::Result;
use dmt_sdk::{DmtClient, PowerAction};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct GuidArgs {
    guid: String,
}

/// Tool to read the current power state of a device
pub struct GetPowerStateTool {
    client: Arc<DmtClient>,
}

impl GetPowerStateTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for GetPowerStateTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_power_state".to_string(),
            description: "Retrieve the current power state of an Intel AMT device. \
                Possible states: On (S0), Sleep - Light (S1/S2), Sleep - Deep (S3), \
                Off - Hard (G3/S5), Hibernate (Off - Soft, S4), Off - Soft (G2/S5), \
                Power Cycle (Off-Hard), Off - Hard Graceful."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({ "guid": guid_schema() }),
                vec!["guid"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: GuidArgs = parse_args("get_power_state", arguments)?;
        let guid = match parse_guid(&args.guid) {
            Ok(guid) => guid,
            Err(result) => return Ok(result),
        };

        match self.client.power().state(&guid).await {
            Ok(state) => Ok(CallToolResult::text(format!("Power State: {}", state))),
            Err(e) => Ok(remote_failure("Unable to get power state of device", &e)),
        }
    }
}

/// Tool to list the power actions a device supports
pub struct GetPowerCapabilitiesTool {
    client: Arc<DmtClient>,
}

impl GetPowerCapabilitiesTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for GetPowerCapabilitiesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_power_capabilities".to_string(),
            description: "List the out-of-band power actions an Intel AMT device supports, with the action number to pass to do_power_action.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({ "guid": guid_schema() }),
                vec!["guid"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: GuidArgs = parse_args("get_power_capabilities", arguments)?;
        let guid = match parse_guid(&args.guid) {
            Ok(guid) => guid,
            Err(result) => return Ok(result),
        };

        let capabilities = match self.client.power().capabilities(&guid).await {
            Ok(capabilities) => capabilities,
            Err(e) => return Ok(remote_failure("Unable to get power capabilities", &e)),
        };

        let entries = capabilities.entries();
        if entries.is_empty() {
            return Ok(CallToolResult::text("No power capabilities reported."));
        }

        let lines: Vec<String> = entries
            .into_iter()
            .map(|(name, code)| match code {
                Some(code) => format!("{}: {}", name, code),
                None => name.to_string(),
            })
            .collect();
        Ok(CallToolResult::text(lines.join("\n")))
    }
}

/// Tool to perform an out-of-band power action
pub struct DoPowerActionTool {
    client: Arc<DmtClient>,
}

impl DoPowerActionTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct DoPowerActionArgs {
    guid: String,
    action: u16,
    #[serde(default, rename = "useSOL", alias = "use_sol", deserialize_with = "bool_or_string")]
    use_sol: bool,
}

// Clients sometimes send the flag as the string "true"/"false"
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid boolean `{}`", other))),
        },
    }
}

#[async_trait::async_trait]
impl Tool for DoPowerActionTool {
    fn schema(&self) -> ToolSchema {
        let codes: Vec<i64> = PowerAction::ALL.iter().map(|a| a.code() as i64).collect();
        let legend = PowerAction::ALL
            .iter()
            .map(|a| format!("{} = {}", a.code(), a.label()))
            .collect::<Vec<_>>()
            .join(", ");

        ToolSchema {
            name: "do_power_action".to_string(),
            description: "Perform an out-of-band (OOB) power action on an Intel AMT device. This changes the device's power state.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "guid": guid_schema(),
                    "action": json_schema_enum(&codes, &format!("Power action number: {}", legend)),
                    "useSOL": json_schema_boolean("Use Serial over LAN, redirecting the managed system's serial port over IP (default: false)")
                }),
                vec!["guid", "action"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: DoPowerActionArgs = parse_args("do_power_action", arguments)?;
        let guid = match parse_guid(&args.guid) {
            Ok(guid) => guid,
            Err(result) => return Ok(result),
        };
        let action = match PowerAction::from_code(args.action) {
            Ok(action) => action,
            Err(e) => return Ok(CallToolResult::error(e.to_string())),
        };

        let outcome = match self.client.power().action(&guid, action, args.use_sol).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return Ok(remote_failure(
                    "Unable to perform power action on the device",
                    &e,
                ))
            }
        };

        match outcome.succeeded() {
            Some(true) => Ok(CallToolResult::text(format!(
                "Power action {} performed successfully.",
                action
            ))),
            Some(false) => Ok(CallToolResult::error(format!(
                "Failed to perform power action {}: device returned {}{}",
                action,
                outcome.code().unwrap_or_default(),
                outcome
                    .description()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            ))),
            None => Ok(CallToolResult::error(
                "Unable to perform power action on the device: response carried no ReturnValue",
            )),
        }
    }

    fn tier(&self) -> ToolTier {
        ToolTier::DeviceControl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{authorized_client, GUID};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text(result: &CallToolResult) -> &str {
        result.content[0].as_text()
    }

    #[tokio::test]
    async fn test_get_power_state_label() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/mps/api/v1/amt/power/state/{}", GUID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "powerstate": 2 })))
            .mount(&server)
            .await;

        let result = GetPowerStateTool::new(client)
            .execute(serde_json::json!({ "guid": GUID }))
            .await
            .unwrap();
        assert_eq!(text(&result), "Power State: On");
    }

    #[tokio::test]
    async fn test_get_power_state_unknown_code() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/mps/api/v1/amt/power/state/{}", GUID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "powerstate": 42 })))
            .mount(&server)
            .await;

        let result = GetPowerStateTool::new(client)
            .execute(serde_json::json!({ "guid": GUID }))
            .await
            .unwrap();
        assert_eq!(text(&result), "Power State: Unknown");
    }

    #[tokio::test]
    async fn test_power_capabilities_listing() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/mps/api/v1/amt/power/capabilities/{}", GUID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Power up": 2, "Reset": 10
            })))
            .mount(&server)
            .await;

        let result = GetPowerCapabilitiesTool::new(client)
            .execute(serde_json::json!({ "guid": GUID }))
            .await
            .unwrap();
        assert_eq!(text(&result), "Power up: 2\nReset: 10");
    }

    #[tokio::test]
    async fn test_power_action_success() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("/mps/api/v1/amt/power/action/{}", GUID)))
            .and(body_json(serde_json::json!({ "action": 10, "useSOL": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ReturnValue": 0 })))
            .expect(1)
            .mount(&server)
            .await;

        let result = DoPowerActionTool::new(client)
            .execute(serde_json::json!({ "guid": GUID, "action": 10, "useSOL": "true" }))
            .await
            .unwrap();
        assert!(!result.is_error());
        assert_eq!(text(&result), "Power action Reset (10) performed successfully.");
    }

    #[tokio::test]
    async fn test_power_action_device_failure() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("/mps/api/v1/amt/power/action/{}", GUID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Body": { "ReturnValue": 2, "ReturnValueStr": "NOT_READY" }
            })))
            .mount(&server)
            .await;

        let result = DoPowerActionTool::new(client)
            .execute(serde_json::json!({ "guid": GUID, "action": 8 }))
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(text(&result).contains("device returned 2 (NOT_READY)"));
    }

    #[tokio::test]
    async fn test_power_action_without_return_value() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("/mps/api/v1/amt/power/action/{}", GUID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let result = DoPowerActionTool::new(client)
            .execute(serde_json::json!({ "guid": GUID, "action": 2 }))
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(text(&result).contains("no ReturnValue"));
    }

    #[tokio::test]
    async fn test_unsupported_action_not_forwarded() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("/mps/api/v1/amt/power/action/{}", GUID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ReturnValue": 0 })))
            .expect(0)
            .mount(&server)
            .await;

        let result = DoPowerActionTool::new(client)
            .execute(serde_json::json!({ "guid": GUID, "action": 99 }))
            .await
            .unwrap();
        assert!(result.is_error());
        assert_eq!(text(&result), "Error: unsupported power action 99");
    }

    #[test]
    fn test_use_sol_accepts_bool_or_string() {
        let args: DoPowerActionArgs = serde_json::from_value(serde_json::json!({
            "guid": GUID, "action": 5, "use_sol": false
        }))
        .unwrap();
        assert!(!args.use_sol);

        let args: DoPowerActionArgs = serde_json::from_value(serde_json::json!({
            "guid": GUID, "action": 5, "useSOL": "TRUE"
        }))
        .unwrap();
        assert!(args.use_sol);

        let bad = serde_json::from_value::<DoPowerActionArgs>(serde_json::json!({
            "guid": GUID, "action": 5, "useSOL": "maybe"
        }));
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn test_power_action_is_device_control() {
        let server = MockServer::start().await;
        let tool = DoPowerActionTool::new(crate::tools::test_support::unauthorized_client(&server));

        assert_eq!(tool.tier(), ToolTier::DeviceControl);
        let schema = tool.schema();
        assert_eq!(schema.input_schema["required"], serde_json::json!(["guid", "action"]));
        assert!(schema.input_schema["properties"]["action"]["enum"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!(10)));
    }
}
