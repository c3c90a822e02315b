use std::{path::PathBuf, time::Duration};

use super::{release::WeekParity, toolchain::ToolPaths};

/// Upstream repository of the firmware tree.
pub const UPSTREAM: &str = "https://github.com/mbedmicro/mbed.git";

/// Directory of the build and test scripts inside the firmware tree.
pub const TOOLS_DIR: &str = "workspace_tools";

/// What a firmware job does and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareOptions {
    /// The CI server already checked the tree out in the working directory.
    pub jenkins: bool,
    /// Directory of the tree when not running under the CI server.
    pub project: String,
    pub upstream: String,

    pub clean: bool,
    pub clone: bool,
    pub build: bool,
    pub test: bool,
    pub test_net: bool,
    pub build_release: bool,
    pub sync: bool,

    pub toolchain: String,
    pub target: String,
    /// Target id of the board under test, as shown by the device listing.
    pub target_id: Option<String>,
    pub comport: Option<String>,
    pub disk: Option<String>,

    /// Power the board off and on through the hub before testing, and off
    /// again afterwards.
    pub power_restart: bool,
    pub power_off_settle: Duration,
    pub power_on_settle: Duration,

    pub release_week: WeekParity,
    pub tool_paths: ToolPaths,
}
impl Default for FirmwareOptions {
    fn default() -> Self {
        FirmwareOptions {
            jenkins: false,
            project: String::new(),
            upstream: UPSTREAM.into(),
            clean: false,
            clone: false,
            build: false,
            test: false,
            test_net: false,
            build_release: false,
            sync: false,
            toolchain: "GCC_ARM".into(),
            target: "K64F".into(),
            target_id: None,
            comport: None,
            disk: None,
            power_restart: false,
            power_off_settle: Duration::from_secs(3),
            power_on_settle: Duration::from_secs(10),
            release_week: WeekParity::Odd,
            tool_paths: ToolPaths::default(),
        }
    }
}
impl FirmwareOptions {
    /// Root of the firmware tree.
    pub fn tree(&self) -> PathBuf {
        if self.jenkins || self.project.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.project)
        }
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.tree().join(TOOLS_DIR)
    }

    /// The board under test as named in the hub port maps.
    pub fn platform(&self) -> String {
        format!("{}[0]", self.target)
    }

    /// Comport and disk given explicitly on the command line.
    pub(crate) fn explicit_device(&self) -> Option<(&str, &str)> {
        match (self.comport.as_deref(), self.disk.as_deref()) {
            (Some(port), Some(disk)) if !port.is_empty() && !disk.is_empty() => Some((port, disk)),
            _ => None,
        }
    }

    pub fn junit_report(&self) -> PathBuf {
        self.tree().join(format!("{}_junit_report.xml", self.target))
    }

    pub fn html_report(&self) -> PathBuf {
        self.tree().join(format!("{}_html_report.html", self.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_follows_mode() {
        let mut opts = FirmwareOptions {
            project: "mbedmicro".into(),
            ..FirmwareOptions::default()
        };
        assert_eq!(opts.tools_dir(), PathBuf::from("mbedmicro/workspace_tools"));
        opts.jenkins = true;
        assert_eq!(opts.tree(), PathBuf::from("."));
    }

    #[test]
    fn device_needs_both_halves() {
        let mut opts = FirmwareOptions {
            comport: Some("/dev/ttyACM0".into()),
            ..FirmwareOptions::default()
        };
        assert_eq!(opts.explicit_device(), None);
        opts.disk = Some("/media/MBED".into());
        assert_eq!(opts.explicit_device(), Some(("/dev/ttyACM0", "/media/MBED")));
        assert_eq!(opts.platform(), "K64F[0]");
    }
}
