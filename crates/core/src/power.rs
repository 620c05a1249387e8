// Power states, power actions and their MPS encodings

use crate::types::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Power state of an AMT device (CIM_AssociatedPowerManagementService.PowerState)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    SleepLight,
    SleepDeep,
    OffHard,
    Hibernate,
    OffSoft,
    PowerCycle,
    OffHardGraceful,
    Unknown(i64),
}

impl PowerState {
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Self::On,
            3 => Self::SleepLight,
            4 => Self::SleepDeep,
            6 => Self::OffHard,
            7 => Self::Hibernate,
            8 => Self::OffSoft,
            9 => Self::PowerCycle,
            13 => Self::OffHardGraceful,
            other => Self::Unknown(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::On => "On",
            Self::SleepLight => "Sleep - Light",
            Self::SleepDeep => "Sleep - Deep",
            Self::OffHard => "Off - Hard",
            Self::Hibernate => "Hibernate (Off - Soft)",
            Self::OffSoft => "Off - Soft",
            Self::PowerCycle => "Power Cycle (Off-Hard)",
            Self::OffHardGraceful => "Off - Hard Graceful",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw `/amt/power/state/{guid}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerStateResponse {
    pub powerstate: i64,
}

impl PowerStateResponse {
    pub fn state(&self) -> PowerState {
        PowerState::from_code(self.powerstate)
    }
}

/// Out-of-band power action accepted by `/amt/power/action/{guid}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerAction {
    PowerUp,
    PowerCycle,
    PowerDown,
    Reset,
    SoftOff,
    SoftReset,
    PowerUpToBios,
    ResetToBios,
    ResetToPxe,
    PowerUpToPxe,
}

impl PowerAction {
    pub const ALL: [PowerAction; 10] = [
        Self::PowerUp,
        Self::PowerCycle,
        Self::PowerDown,
        Self::Reset,
        Self::SoftOff,
        Self::SoftReset,
        Self::PowerUpToBios,
        Self::ResetToBios,
        Self::ResetToPxe,
        Self::PowerUpToPxe,
    ];

    pub fn code(&self) -> u16 {
        match self {
            Self::PowerUp => 2,
            Self::PowerCycle => 5,
            Self::PowerDown => 8,
            Self::Reset => 10,
            Self::SoftOff => 12,
            Self::SoftReset => 14,
            Self::PowerUpToBios => 100,
            Self::ResetToBios => 101,
            Self::ResetToPxe => 400,
            Self::PowerUpToPxe => 401,
        }
    }

    pub fn from_code(code: u16) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|action| action.code() == code)
            .ok_or(CoreError::UnsupportedPowerAction(code))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PowerUp => "Power up/on",
            Self::PowerCycle => "Power cycle",
            Self::PowerDown => "Power down/off",
            Self::Reset => "Reset",
            Self::SoftOff => "Soft off",
            Self::SoftReset => "Soft reset",
            Self::PowerUpToBios => "Power up to BIOS",
            Self::ResetToBios => "Reset to BIOS",
            Self::ResetToPxe => "Reset to PXE",
            Self::PowerUpToPxe => "Power up to PXE",
        }
    }
}

impl std::fmt::Display for PowerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

/// Request body for a power action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerActionRequest {
    pub action: u16,
    #[serde(rename = "useSOL")]
    pub use_sol: bool,
}

impl PowerActionRequest {
    pub fn new(action: PowerAction, use_sol: bool) -> Self {
        Self {
            action: action.code(),
            use_sol,
        }
    }
}

/// Response to a power action
///
/// Older MPS releases return `ReturnValue` at the top level, newer ones nest it
/// under `Body`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerActionOutcome {
    #[serde(rename = "ReturnValue", default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<i64>,
    #[serde(rename = "ReturnValueStr", default, skip_serializing_if = "Option::is_none")]
    pub return_value_str: Option<String>,
    #[serde(rename = "Body", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<PowerActionOutcome>>,
}

impl PowerActionOutcome {
    pub fn code(&self) -> Option<i64> {
        self.return_value
            .or_else(|| self.body.as_ref().and_then(|body| body.code()))
    }

    pub fn description(&self) -> Option<&str> {
        self.return_value_str
            .as_deref()
            .or_else(|| self.body.as_ref().and_then(|body| body.description()))
    }

    /// `None` when the response carried no return value at all
    pub fn succeeded(&self) -> Option<bool> {
        self.code().map(|code| code == 0)
    }
}

/// Power capabilities of a device, keyed by capability name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerCapabilities(pub BTreeMap<String, serde_json::Value>);

impl PowerCapabilities {
    /// Capabilities paired with their action code, in name order
    pub fn entries(&self) -> Vec<(&str, Option<i64>)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_i64()))
            .collect()
    }
}
