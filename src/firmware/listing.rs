//! Parsing the table printed by the device-listing utility (`mbedls`):
//!
//! ```text
//! +---------------+----------------------+-------------+-------------+--------------------------+
//! |platform_name  |platform_name_unique  |mount_point  |serial_port  |target_id                 |
//! +---------------+----------------------+-------------+-------------+--------------------------+
//! |K64F           |K64F[0]               |/media/MBED  |/dev/ttyACM0 |0240000032044e4500257009  |
//! +---------------+----------------------+-------------+-------------+--------------------------+
//! ```
//!
//! Older releases print four columns and no header: name, mount point,
//! serial port and target id.

use log::trace;

use crate::{
    error::CiError,
    exec::{CommandRunner, ShellCommand},
};

pub const LISTING_TOOL: &str = "mbedls";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListedDevice {
    pub platform_name: String,
    pub platform_name_unique: Option<String>,
    pub mount_point: String,
    pub serial_port: String,
    pub target_id: String,
}

struct Columns {
    name: usize,
    unique: Option<usize>,
    mount_point: usize,
    serial_port: usize,
    target_id: usize,
}
impl Columns {
    const LEGACY: Columns = Columns {
        name: 0,
        unique: None,
        mount_point: 1,
        serial_port: 2,
        target_id: 3,
    };

    fn from_header(cells: &[&str]) -> Option<Self> {
        let at = |name: &str| cells.iter().position(|c| *c == name);
        Some(Columns {
            name: at("platform_name")?,
            unique: at("platform_name_unique"),
            mount_point: at("mount_point")?,
            serial_port: at("serial_port")?,
            target_id: at("target_id")?,
        })
    }
}

fn cells(line: &str) -> Option<Vec<&str>> {
    let line = line.trim();
    if !line.starts_with('|') {
        return None;
    }
    let inner = line.trim_start_matches('|').trim_end_matches('|');
    Some(inner.split('|').map(str::trim).collect())
}

/// Parse every board row of the listing.
pub fn parse(output: &str) -> Vec<ListedDevice> {
    let mut columns = Columns::LEGACY;
    let mut devices = vec![];

    for row in output.lines().filter_map(cells) {
        if row.contains(&"target_id") {
            if let Some(header) = Columns::from_header(&row) {
                columns = header;
            }
            continue;
        }
        let cell = |i: usize| row.get(i).map_or("", |c| *c).to_owned();
        let device = ListedDevice {
            platform_name: cell(columns.name),
            platform_name_unique: columns.unique.map(|i| cell(i)).filter(|u| !u.is_empty()),
            mount_point: cell(columns.mount_point),
            serial_port: cell(columns.serial_port),
            target_id: cell(columns.target_id),
        };
        trace!("listed {:?}", device);
        if !device.target_id.is_empty() {
            devices.push(device);
        }
    }
    devices
}

/// Run the listing tool and return every board it reports.
pub fn list(runner: &mut dyn CommandRunner) -> Result<Vec<ListedDevice>, CiError> {
    let output = runner.output(&ShellCommand::new(LISTING_TOOL))?;
    Ok(parse(&output))
}

/// Run the listing tool and find the board with `target_id`. The board must
/// have both a serial port and a mount point for the test runner to use it.
pub fn locate(runner: &mut dyn CommandRunner, target_id: &str) -> Result<ListedDevice, CiError> {
    let device = list(runner)?
        .into_iter()
        .find(|d| d.target_id == target_id)
        .ok_or_else(|| CiError::TargetNotListed(target_id.to_owned()))?;

    if device.serial_port.is_empty() {
        return Err(CiError::IncompleteListing {
            target_id: target_id.to_owned(),
            field: "serial port",
        });
    }
    if device.mount_point.is_empty() {
        return Err(CiError::IncompleteListing {
            target_id: target_id.to_owned(),
            field: "mount point",
        });
    }
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = "\
+---------------+----------------------+-------------+-------------+--------------------------+
|platform_name  |platform_name_unique  |mount_point  |serial_port  |target_id                 |
+---------------+----------------------+-------------+-------------+--------------------------+
|K64F           |K64F[0]               |/media/MBED  |/dev/ttyACM0 |0240000032044e4500257009  |
|NUCLEO_F091RC  |NUCLEO_F091RC[0]      |/media/NODE  |/dev/ttyACM1 |075002000750051938359374  |
+---------------+----------------------+-------------+-------------+--------------------------+
";

    const LEGACY: &str = "\
|unknown              |G:                 |COM18              |075002000750051938359374                |
";

    #[test]
    fn current_layout() {
        let devices = parse(CURRENT);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].platform_name, "NUCLEO_F091RC");
        assert_eq!(
            devices[1].platform_name_unique.as_deref(),
            Some("NUCLEO_F091RC[0]")
        );
        assert_eq!(devices[1].serial_port, "/dev/ttyACM1");
        assert_eq!(devices[1].mount_point, "/media/NODE");
    }

    #[test]
    fn legacy_layout() {
        let devices = parse(LEGACY);
        assert_eq!(
            devices,
            vec![ListedDevice {
                platform_name: "unknown".into(),
                platform_name_unique: None,
                mount_point: "G:".into(),
                serial_port: "COM18".into(),
                target_id: "075002000750051938359374".into(),
            }]
        );
    }

    struct Canned(&'static str);
    impl CommandRunner for Canned {
        fn run(&mut self, _: &ShellCommand) -> Result<(), CiError> {
            Ok(())
        }
        fn output(&mut self, command: &ShellCommand) -> Result<String, CiError> {
            assert_eq!(command.program(), LISTING_TOOL);
            Ok(self.0.to_owned())
        }
    }

    #[test]
    fn list_every_attached_board() {
        let devices = list(&mut Canned(CURRENT)).unwrap();
        let unique: Vec<_> = devices
            .iter()
            .filter_map(|d| d.platform_name_unique.as_deref())
            .collect();
        assert_eq!(unique, vec!["K64F[0]", "NUCLEO_F091RC[0]"]);
        assert!(list(&mut Canned("")).unwrap().is_empty());
    }

    #[test]
    fn locate_by_target_id() {
        let device = locate(&mut Canned(CURRENT), "0240000032044e4500257009").unwrap();
        assert_eq!(device.serial_port, "/dev/ttyACM0");
        assert!(matches!(
            locate(&mut Canned(CURRENT), "ffff"),
            Err(CiError::TargetNotListed(_))
        ));
    }

    #[test]
    fn locate_needs_a_mount_point() {
        let listing = "|K64F |  |/dev/ttyACM0 |1234 |\n";
        assert!(matches!(
            locate(&mut Canned(listing), "1234"),
            Err(CiError::IncompleteListing { field: "mount point", .. })
        ));
    }
}
