// Core domain types for the DMT MCP bridge

pub mod logs;
pub mod power;
pub mod provisioning;
pub mod types;

pub use logs::{AuditLog, AuditRecord, EventLogEntry};
pub use power::{
    PowerAction, PowerActionOutcome, PowerActionRequest, PowerCapabilities, PowerState,
    PowerStateResponse,
};
pub use provisioning::{ActivationMode, Domain, Profile};
pub use types::*;
