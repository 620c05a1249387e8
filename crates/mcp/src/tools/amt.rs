// AMT firmware information and log tools

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    guid_schema, json_schema_integer, json_schema_object, parse_args, parse_guid,
    remote_failure, Tool,
};
use anyhow::Result;
use dmt_sdk::DmtClient;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_EVENT_LIMIT: usize = 20;
const MAX_OUTPUT_BYTES: usize = 100_000;

#[derive(Debug, Deserialize)]
struct GuidArgs {
    guid: String,
}

fn pretty_json(value: &serde_json::Value) -> Result<String> {
    let mut output = serde_json::to_string_pretty(value)?;
    if output.len() > MAX_OUTPUT_BYTES {
        let mut cut = MAX_OUTPUT_BYTES;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("\n\n... (truncated, content too large)");
    }
    Ok(output)
}

/// Tool to get AMT firmware version details
pub struct GetAmtVersionTool {
    client: Arc<DmtClient>,
}

impl GetAmtVersionTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for GetAmtVersionTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_amt_version".to_string(),
            description: "Get the Intel AMT firmware and software version details of a device.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({ "guid": guid_schema() }),
                vec!["guid"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: GuidArgs = parse_args("get_amt_version", arguments)?;
        let guid = match parse_guid(&args.guid) {
            Ok(guid) => guid,
            Err(result) => return Ok(result),
        };

        match self.client.amt().version(&guid).await {
            Ok(version) => Ok(CallToolResult::text(pretty_json(&version)?)),
            Err(e) => Ok(remote_failure("Unable to get AMT version", &e)),
        }
    }
}

/// Tool to get hardware inventory
pub struct GetHardwareInfoTool {
    client: Arc<DmtClient>,
}

impl GetHardwareInfoTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for GetHardwareInfoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_hardware_info".to_string(),
            description: "Get the hardware inventory (computer system, BIOS, processor, memory, chassis) of an Intel AMT device.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({ "guid": guid_schema() }),
                vec!["guid"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: GuidArgs = parse_args("get_hardware_info", arguments)?;
        let guid = match parse_guid(&args.guid) {
            Ok(guid) => guid,
            Err(result) => return Ok(result),
        };

        match self.client.amt().hardware_info(&guid).await {
            Ok(info) => Ok(CallToolResult::text(pretty_json(&info)?)),
            Err(e) => Ok(remote_failure("Unable to get hardware information", &e)),
        }
    }
}

/// Tool to read the AMT event log
pub struct GetEventLogTool {
    client: Arc<DmtClient>,
}

impl GetEventLogTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct EventLogArgs {
    guid: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[async_trait::async_trait]
impl Tool for GetEventLogTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_event_log".to_string(),
            description: "Read the Intel AMT event log of a device (boot progress, sensor and platform events).".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "guid": guid_schema(),
                    "limit": json_schema_integer("Maximum number of entries to return (default: 20)")
                }),
                vec!["guid"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: EventLogArgs = parse_args("get_event_log", arguments)?;
        let guid = match parse_guid(&args.guid) {
            Ok(guid) => guid,
            Err(result) => return Ok(result),
        };
        let limit = args.limit.unwrap_or(DEFAULT_EVENT_LIMIT).max(1);

        let entries = match self.client.amt().event_log(&guid).await {
            Ok(entries) => entries,
            Err(e) => return Ok(remote_failure("Unable to read event log", &e)),
        };

        if entries.is_empty() {
            return Ok(CallToolResult::text("Event log is empty."));
        }

        let total = entries.len();
        let mut lines: Vec<String> = entries.iter().take(limit).map(|e| e.summary()).collect();
        if total > limit {
            lines.push(format!("... ({} more entries)", total - limit));
        }
        Ok(CallToolResult::text(lines.join("\n")))
    }
}

/// Tool to read the AMT audit log
pub struct GetAuditLogTool {
    client: Arc<DmtClient>,
}

impl GetAuditLogTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct AuditLogArgs {
    guid: String,
    #[serde(default)]
    start_index: u32,
}

#[async_trait::async_trait]
impl Tool for GetAuditLogTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_audit_log".to_string(),
            description: "Read one page of the Intel AMT audit log of a device (security-relevant configuration and access events).".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "guid": guid_schema(),
                    "start_index": json_schema_integer("Index of the first record to return (default: 0)")
                }),
                vec!["guid"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: AuditLogArgs = parse_args("get_audit_log", arguments)?;
        let guid = match parse_guid(&args.guid) {
            Ok(guid) => guid,
            Err(result) => return Ok(result),
        };

        let log = match self.client.amt().audit_log(&guid, args.start_index).await {
            Ok(log) => log,
            Err(e) => return Ok(remote_failure("Unable to read audit log", &e)),
        };

        let mut output = format!(
            "Total Records: {} (showing {} from index {})\n",
            log.total_count,
            log.records.len(),
            args.start_index
        );
        for record in &log.records {
            output.push_str(&record.summary());
            output.push('\n');
        }
        Ok(CallToolResult::text(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{authorized_client, GUID};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text(result: &CallToolResult) -> &str {
        result.content[0].as_text()
    }

    #[tokio::test]
    async fn test_amt_version_pretty_json() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/mps/api/v1/amt/version/{}", GUID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "CIM_SoftwareIdentity": { "responses": [{ "InstanceID": "AMT", "VersionString": "16.1.27" }] }
            })))
            .mount(&server)
            .await;

        let result = GetAmtVersionTool::new(client)
            .execute(serde_json::json!({ "guid": GUID }))
            .await
            .unwrap();
        assert!(text(&result).contains("\"VersionString\": \"16.1.27\""));
    }

    #[tokio::test]
    async fn test_hardware_info_remote_error() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/mps/api/v1/amt/hardwareInfo/{}", GUID)))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "Not Found", "message": "Device not found/connected"
            })))
            .mount(&server)
            .await;

        let result = GetHardwareInfoTool::new(client)
            .execute(serde_json::json!({ "guid": GUID }))
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(text(&result).contains("Device not found/connected"));
    }

    #[tokio::test]
    async fn test_event_log_limit() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        let entries: Vec<_> = (0..5)
            .map(|i| {
                serde_json::json!({
                    "DeviceAddress": 255,
                    "Time": format!("t{}", i),
                    "Desc": "Boot",
                    "EventSeverity": "Monitor",
                    "Entity": "BIOS",
                    "EntityStr": "BIOS"
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/mps/api/v1/amt/log/event/{}", GUID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(entries))
            .mount(&server)
            .await;

        let result = GetEventLogTool::new(client)
            .execute(serde_json::json!({ "guid": GUID, "limit": 2 }))
            .await
            .unwrap();
        assert_eq!(
            text(&result),
            "t0 [Monitor] BIOS: Boot\nt1 [Monitor] BIOS: Boot\n... (3 more entries)"
        );
    }

    #[tokio::test]
    async fn test_audit_log_page() {
        let server = MockServer::start().await;
        let client = authorized_client(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/mps/api/v1/amt/log/audit/{}", GUID)))
            .and(query_param("startIndex", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalCnt": 1,
                "records": [{ "Time": "2024-05-01T10:00:00.000Z", "AuditApp": "Security Admin", "Event": "Provisioning Started", "Initiator": "Local" }]
            })))
            .mount(&server)
            .await;

        let result = GetAuditLogTool::new(client)
            .execute(serde_json::json!({ "guid": GUID }))
            .await
            .unwrap();
        let output = text(&result);
        assert!(output.starts_with("Total Records: 1 (showing 1 from index 0)"));
        assert!(output.contains("Security Admin: Provisioning Started by Local"));
    }

    #[test]
    fn test_pretty_json_truncates_large_payloads() {
        let big = serde_json::Value::String("x".repeat(MAX_OUTPUT_BYTES * 2));
        let output = pretty_json(&big).unwrap();
        assert!(output.ends_with("(truncated, content too large)"));
        assert!(output.len() < MAX_OUTPUT_BYTES + 64);
    }
}
