//! Hub ports, their power state and the records reported by `state`.

use std::{fmt, str::FromStr};

use crate::error::HubError;

/// Number of downstream ports on the supported hub.
pub const MAX_PORTS: usize = 12;

/// Zero-based index of a downstream hub port.
///
/// The hub numbers its ports from `1` on the wire. `PortId` always holds the
/// zero-based index and only converts when a command is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(usize);
impl PortId {
    pub fn new(index: usize) -> Result<Self, HubError> {
        if index < MAX_PORTS {
            Ok(PortId(index))
        } else {
            Err(HubError::PortOutOfRange(index))
        }
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// The port number as printed on the hub and used in commands.
    pub fn wire(self) -> usize {
        self.0 + 1
    }

    /// All the ports of the hub, in ascending order.
    pub fn all() -> impl Iterator<Item = PortId> {
        (0..MAX_PORTS).map(PortId)
    }
}
impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Selects a single port or all of them at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSelector {
    One(PortId),
    All,
}
impl From<PortId> for PortSelector {
    fn from(port: PortId) -> Self {
        PortSelector::One(port)
    }
}

/// Requested power for a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    On,
    Off,
}
impl Power {
    /// Mode letter of the `mode` command: `s`ync powers the port and
    /// connects its data lines, `o`ff cuts both.
    pub(crate) fn mode_char(self) -> char {
        match self {
            Power::On => 's',
            Power::Off => 'o',
        }
    }
}
impl FromStr for Power {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Ok(Power::On),
            "off" => Ok(Power::Off),
            other => Err(format!("`{}` is not a valid power state, use on|off", other)),
        }
    }
}
impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Power::On => f.write_str("on"),
            Power::Off => f.write_str("off"),
        }
    }
}

/// Power state of a port as reported by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    On,
    Off,
    Unknown,
}
impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortState::On => f.write_str("on"),
            PortState::Off => f.write_str("off"),
            PortState::Unknown => f.write_str("unknown"),
        }
    }
}

/// One line of the reply to the `state` command, for example:
///
/// ```text
/// 12, 0000, R D O, 0, 0, x, 0.00
/// ```
///
/// Fields are kept as the hub printed them, trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortRecord {
    pub port_num: String,
    pub current_ma: String,
    pub flags: String,
    pub profile_id: String,
    pub time_charging: String,
    pub time_charged: String,
    pub energy: String,
}
impl PortRecord {
    /// Parse a comma separated `state` line. The port number, the current and
    /// the flags are mandatory; the hub may omit the trailing columns.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut fields = line.split(',').map(str::trim);
        let mut next = || fields.next().unwrap_or_default().to_owned();

        let record = PortRecord {
            port_num: next(),
            current_ma: next(),
            flags: next(),
            profile_id: next(),
            time_charging: next(),
            time_charged: next(),
            energy: next(),
        };

        if record.port_num.is_empty() || record.number().is_none() {
            return Err(format!("`{}` does not start with a port number", line.trim()));
        }
        if record.flags.is_empty() {
            return Err(format!("`{}` has no flags column", line.trim()));
        }
        Ok(record)
    }

    /// The one-based port number of the record.
    pub fn number(&self) -> Option<usize> {
        self.port_num.parse().ok()
    }

    /// Individual status flags, e.g. `R`, `D`, `O`.
    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.flags.split_whitespace()
    }

    /// `S` (sync) means the port is powered, `O` means it is off.
    pub fn state(&self) -> PortState {
        if self.flags().any(|f| f == "S") {
            PortState::On
        } else if self.flags().any(|f| f == "O") {
            PortState::Off
        } else {
            PortState::Unknown
        }
    }
}
impl fmt::Display for PortRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>2}  {:>6} mA  [{:<8}]  profile {:<2} charging {:>6}s charged {:>6}s  {} Wh",
            self.port_num,
            self.current_ma,
            self.flags,
            self.profile_id,
            self.time_charging,
            self.time_charged,
            self.energy
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_id_range() {
        assert_eq!(PortId::new(0).unwrap().wire(), 1);
        assert_eq!(PortId::new(11).unwrap().wire(), 12);
        assert!(matches!(PortId::new(12), Err(HubError::PortOutOfRange(12))));
        assert_eq!(PortId::all().count(), MAX_PORTS);
    }

    #[test]
    fn parse_state_line() {
        let record = PortRecord::parse("12, 0000, R D O, 0, 0, x, 0.00").unwrap();
        assert_eq!(record.port_num, "12");
        assert_eq!(record.number(), Some(12));
        assert_eq!(record.flags, "R D O");
        assert_eq!(record.time_charged, "x");
        assert_eq!(record.energy, "0.00");
        assert_eq!(record.state(), PortState::Off);
    }

    #[test]
    fn sync_flag_means_on() {
        let record = PortRecord::parse("3, 0120, A S, 1, 10, 0, 0.10").unwrap();
        assert_eq!(record.state(), PortState::On);
    }

    #[test]
    fn charge_only_is_unknown() {
        let record = PortRecord::parse("4, 0500, A C, 1, 10, 0, 0.10").unwrap();
        assert_eq!(record.state(), PortState::Unknown);
    }

    #[test]
    fn short_lines() {
        let record = PortRecord::parse("1, 0000, O").unwrap();
        assert_eq!(record.energy, "");
        assert!(PortRecord::parse("").is_err());
        assert!(PortRecord::parse("Error: bad command").is_err());
        assert!(PortRecord::parse("5, 0000").is_err());
    }

    #[test]
    fn power_from_str() {
        assert_eq!("on".parse::<Power>(), Ok(Power::On));
        assert_eq!("OFF".parse::<Power>(), Ok(Power::Off));
        assert!("toggle".parse::<Power>().is_err());
    }
}
