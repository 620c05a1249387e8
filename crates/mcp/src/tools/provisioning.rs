// Provisioning configuration tools (RPS)

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, remote_failure, Tool};
use anyhow::Result;
use dmt_sdk::{DmtClient, Domain, Profile};
use std::sync::Arc;

fn profile_line(profile: &Profile) -> String {
    let mut line = format!("{}: {}", profile.profile_name, profile.activation);
    if let Some(cira) = profile.cira_config_name.as_deref().filter(|c| !c.is_empty()) {
        line.push_str(&format!(", CIRA config {}", cira));
    }
    if let Some(dhcp) = profile.dhcp_enabled {
        line.push_str(if dhcp { ", DHCP" } else { ", static IP" });
    }
    if !profile.tags.is_empty() {
        line.push_str(&format!(", tags [{}]", profile.tags.join(", ")));
    }
    line
}

fn domain_line(domain: &Domain) -> String {
    match domain.expiration_date.as_deref() {
        Some(expires) => format!(
            "{}: {} (certificate expires {})",
            domain.profile_name, domain.domain_suffix, expires
        ),
        None => format!("{}: {}", domain.profile_name, domain.domain_suffix),
    }
}

/// Tool to list AMT provisioning profiles
pub struct ListProfilesTool {
    client: Arc<DmtClient>,
}

impl ListProfilesTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for ListProfilesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_profiles".to_string(),
            description: "List the AMT provisioning profiles configured in the Remote Provisioning Server, with activation mode (ACM/CCM), CIRA configuration and tags.".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
            annotations: None,
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        match self.client.provisioning().profiles().await {
            Ok(profiles) if profiles.is_empty() => {
                Ok(CallToolResult::text("No provisioning profiles."))
            }
            Ok(profiles) => Ok(CallToolResult::text(
                profiles.iter().map(profile_line).collect::<Vec<_>>().join("\n"),
            )),
            Err(e) => Ok(remote_failure("Unable to list provisioning profiles", &e)),
        }
    }
}

/// Tool to list provisioning certificate domains
pub struct ListDomainsTool {
    client: Arc<DmtClient>,
}

impl ListDomainsTool {
    pub fn new(client: Arc<DmtClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for ListDomainsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_domains".to_string(),
            description: "List the provisioning certificate domains used for Admin Control Mode activation, with their DNS suffix and certificate expiration.".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
            annotations: None,
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        match self.client.provisioning().domains().await {
            Ok(domains) if domains.is_empty() => Ok(CallToolResult::text("No domains.")),
            Ok(domains) => Ok(CallToolResult::text(
                domains.iter().map(domain_line).collect::<Vec<_>>().join("\n"),
            )),
            Err(e) => Ok(remote_failure("Unable to list domains", &e)),
        }
    }
}
