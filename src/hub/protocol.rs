//! Formatting of hub commands and parsing of their replies.

use std::collections::BTreeMap;

use crate::error::HubError;

use super::port::{PortId, PortRecord, Power};

/// Model string reported by the only hub firmware this tool speaks to.
pub const SUPPORTED_HUB: &str = "cambrionix U12S 12 Port USB Charge+Sync";

pub(crate) const SYSTEM: &str = "system";
pub(crate) const STATE: &str = "state";

pub(crate) fn state_command(port: PortId) -> String {
    format!("{} {}", STATE, port.wire())
}

pub(crate) fn mode_command(port: PortId, power: Power) -> String {
    format!("mode {} {}", power.mode_char(), port.wire())
}

/// Identification and attributes reported by the `system` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    /// The model line, e.g. `cambrionix U12S 12 Port USB Charge+Sync`.
    pub description: String,
    /// The `key: value` lines following the model line.
    pub attributes: BTreeMap<String, String>,
}
impl SystemInfo {
    pub fn parse(lines: &[String]) -> Self {
        let mut info = SystemInfo::default();
        for line in lines {
            match line.find(':') {
                Some(colon) => {
                    info.attributes.insert(
                        line[..colon].trim().to_owned(),
                        line[colon + 1..].trim().to_owned(),
                    );
                }
                None if info.description.is_empty() => info.description = line.clone(),
                None => {}
            }
        }
        info
    }

    pub fn is_supported(&self) -> bool {
        self.description.contains(SUPPORTED_HUB)
    }
}

pub(crate) fn parse_state(command: &str, lines: &[String]) -> Result<Vec<PortRecord>, HubError> {
    lines
        .iter()
        .map(|line| {
            PortRecord::parse(line).map_err(|reason| HubError::MalformedReply {
                command: command.to_owned(),
                reason,
            })
        })
        .collect()
}

/// The hub answers `mode` with an empty payload; anything starting with
/// `Error` is a refusal.
pub(crate) fn check_mode_reply(command: &str, lines: &[String]) -> Result<(), HubError> {
    match lines
        .iter()
        .find(|l| l.to_ascii_lowercase().starts_with("error"))
    {
        Some(refusal) => Err(HubError::MalformedReply {
            command: command.to_owned(),
            reason: refusal.clone(),
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
