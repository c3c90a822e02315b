//! Hub registry and per-hub port maps.
//!
//! The bench is described by two kinds of JSON files living in one
//! directory. The registry, `usb_hubs.json`, names the hubs:
//!
//! ```json
//! {
//!     "0": { "serial_port": "/dev/ttyUSB0", "config_file": "hub0_ports.json" },
//!     "1": { "serial_port": "/dev/ttyUSB1", "config_file": "hub1_ports.json" }
//! }
//! ```
//!
//! and each hub's port map tells which board is plugged where:
//!
//! ```json
//! {
//!     "0": { "platform_name_unique": "K64F[0]", "hub_port_id": 0 },
//!     "1": { "platform_name_unique": "NUCLEO_F401RE[0]", "hub_port_id": "1" }
//! }
//! ```

mod natural;

use std::{
    collections::BTreeMap,
    convert::TryFrom,
    env, fs,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{error::ConfigError, hub::PortId};

pub(crate) use natural::natural_cmp;

/// At most this many hubs are chained on one bench.
pub const MAX_HUBS: usize = 2;

/// File name of the hub registry inside the configuration directory.
pub const REGISTRY_FILE: &str = "usb_hubs.json";

/// Environment variable naming the configuration directory.
pub const CONFIG_DIR_ENV: &str = "BENCHCTL_CONFIG_DIR";

/// The configuration directory: an explicit choice, else the environment,
/// else the working directory.
pub fn config_dir(explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(dir) => PathBuf::from(dir),
        None => env::var_os(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubEntry {
    pub serial_port: String,
    pub config_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry {
    pub platform_name_unique: String,
    #[serde(deserialize_with = "number_or_string")]
    pub hub_port_id: i64,
}

pub type PortMap = BTreeMap<String, PortEntry>;

/// Where a platform is plugged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub hub_id: String,
    pub serial_port: String,
    pub port: PortId,
}

/// The hub registry, loaded from the configuration directory.
#[derive(Debug, Clone)]
pub struct Registry {
    dir: PathBuf,
    hubs: BTreeMap<String, HubEntry>,
}
impl Registry {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref().to_path_buf();
        let hubs: BTreeMap<String, HubEntry> = read_json(&dir.join(REGISTRY_FILE))?;
        if hubs.len() > MAX_HUBS {
            return Err(ConfigError::TooManyHubs(hubs.len()));
        }
        debug!("{} hub(s) registered in {}", hubs.len(), dir.display());
        Ok(Registry { dir, hubs })
    }

    pub fn hubs(&self) -> impl Iterator<Item = (&str, &HubEntry)> {
        self.hubs.iter().map(|(id, hub)| (id.as_str(), hub))
    }

    pub fn hub(&self, hub_id: &str) -> Result<&HubEntry, ConfigError> {
        self.hubs
            .get(hub_id)
            .ok_or_else(|| ConfigError::HubNotFound(hub_id.to_owned()))
    }

    /// Load the port map of one hub.
    pub fn port_map(&self, hub_id: &str) -> Result<PortMap, ConfigError> {
        let hub = self.hub(hub_id)?;
        read_json(&self.dir.join(&hub.config_file))
    }

    /// Find the hub and port a platform is plugged into. Hubs are searched in
    /// id order and the first matching entry wins.
    pub fn resolve(&self, platform: &str) -> Result<Resolved, ConfigError> {
        for (hub_id, hub) in self.hubs() {
            let ports = self.port_map(hub_id)?;
            trace!("hub {}: {} port entries", hub_id, ports.len());
            if let Some(entry) = ports
                .values()
                .find(|entry| entry.platform_name_unique == platform)
            {
                let port = usize::try_from(entry.hub_port_id)
                    .ok()
                    .and_then(|index| PortId::new(index).ok())
                    .ok_or_else(|| ConfigError::PortOutOfRange {
                        platform: platform.to_owned(),
                        port: entry.hub_port_id,
                    })?;
                debug!("{} is on hub {} port {}", platform, hub_id, port);
                return Ok(Resolved {
                    hub_id: hub_id.to_owned(),
                    serial_port: hub.serial_port.clone(),
                    port,
                });
            }
        }
        Err(ConfigError::PlatformNotFound(platform.to_owned()))
    }

    /// Every platform identifier of every hub, in natural order.
    pub fn platforms(&self) -> Result<Vec<String>, ConfigError> {
        let mut names = vec![];
        for (hub_id, _) in self.hubs() {
            names.extend(
                self.port_map(hub_id)?
                    .into_iter()
                    .map(|(_, entry)| entry.platform_name_unique),
            );
        }
        names.sort_by(|a, b| natural_cmp(a, b));
        Ok(names)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Port ids appear both as `3` and `"3"` in hand-written port maps.
fn number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(ConfigError::InvalidPortId(s))),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn bench(hubs: &[(&str, Value)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = serde_json::Map::new();
        for (id, ports) in hubs {
            let file = format!("hub{}_ports.json", id);
            registry.insert(
                (*id).to_owned(),
                json!({ "serial_port": format!("/dev/ttyUSB{}", id), "config_file": file }),
            );
            fs::write(dir.path().join(&file), ports.to_string()).unwrap();
        }
        fs::write(
            dir.path().join(REGISTRY_FILE),
            Value::Object(registry).to_string(),
        )
        .unwrap();
        dir
    }

    fn two_hubs() -> TempDir {
        bench(&[
            (
                "0",
                json!({
                    "0": { "platform_name_unique": "K64F[0]", "hub_port_id": 0 },
                    "1": { "platform_name_unique": "K64F[10]", "hub_port_id": "5" }
                }),
            ),
            (
                "1",
                json!({
                    "0": { "platform_name_unique": "K64F[2]", "hub_port_id": 11 },
                    "1": { "platform_name_unique": "NRF51_DK[0]", "hub_port_id": 3 }
                }),
            ),
        ])
    }

    #[test]
    fn resolve_on_second_hub() {
        let dir = two_hubs();
        let registry = Registry::load(dir.path()).unwrap();
        let resolved = registry.resolve("NRF51_DK[0]").unwrap();
        assert_eq!(resolved.hub_id, "1");
        assert_eq!(resolved.serial_port, "/dev/ttyUSB1");
        assert_eq!(resolved.port, PortId::new(3).unwrap());
    }

    #[test]
    fn port_id_as_string() {
        let dir = two_hubs();
        let registry = Registry::load(dir.path()).unwrap();
        assert_eq!(registry.resolve("K64F[10]").unwrap().port.index(), 5);
    }

    #[test]
    fn unknown_platform() {
        let dir = two_hubs();
        let registry = Registry::load(dir.path()).unwrap();
        assert!(matches!(
            registry.resolve("LPC1768[0]"),
            Err(ConfigError::PlatformNotFound(_))
        ));
    }

    #[test]
    fn out_of_range_port_in_config() {
        let dir = bench(&[(
            "0",
            json!({ "0": { "platform_name_unique": "K64F[0]", "hub_port_id": 12 } }),
        )]);
        let registry = Registry::load(dir.path()).unwrap();
        assert!(matches!(
            registry.resolve("K64F[0]"),
            Err(ConfigError::PortOutOfRange { port: 12, .. })
        ));
    }

    #[test]
    fn platforms_in_natural_order() {
        let dir = two_hubs();
        let registry = Registry::load(dir.path()).unwrap();
        assert_eq!(
            registry.platforms().unwrap(),
            vec!["K64F[0]", "K64F[2]", "K64F[10]", "NRF51_DK[0]"]
        );
    }

    #[test]
    fn missing_registry() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Registry::load(dir.path()),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn too_many_hubs() {
        let empty = json!({});
        let dir = bench(&[("0", empty.clone()), ("1", empty.clone()), ("2", empty)]);
        assert!(matches!(
            Registry::load(dir.path()),
            Err(ConfigError::TooManyHubs(3))
        ));
    }

    #[test]
    fn bad_port_id_text() {
        let err = serde_json::from_value::<PortEntry>(
            json!({ "platform_name_unique": "K64F[0]", "hub_port_id": "three" }),
        );
        assert!(err.is_err());
    }

    #[test]
    fn first_hub_wins_for_duplicate_platform() {
        let dir = bench(&[
            (
                "0",
                json!({ "0": { "platform_name_unique": "K64F[0]", "hub_port_id": 7 } }),
            ),
            (
                "1",
                json!({ "0": { "platform_name_unique": "K64F[0]", "hub_port_id": 2 } }),
            ),
        ]);
        let registry = Registry::load(dir.path()).unwrap();
        let resolved = registry.resolve("K64F[0]").unwrap();
        assert_eq!(resolved.hub_id, "0");
        assert_eq!(resolved.serial_port, "/dev/ttyUSB0");
        assert_eq!(resolved.port.index(), 7);
    }

    #[test]
    fn explicit_config_dir_wins() {
        assert_eq!(config_dir(Some("/etc/bench")), PathBuf::from("/etc/bench"));
    }

    // The only test touching the variable, so it cannot race another one.
    #[test]
    fn config_dir_from_environment() {
        env::set_var(CONFIG_DIR_ENV, "/srv/bench");
        assert_eq!(config_dir(None), PathBuf::from("/srv/bench"));
        assert_eq!(config_dir(Some("/etc/bench")), PathBuf::from("/etc/bench"));

        env::remove_var(CONFIG_DIR_ENV);
        assert_eq!(config_dir(None), PathBuf::from("."));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Resolution agrees with a plain scan of the raw JSON files.
        #[test]
        fn resolution_matches_linear_scan(
            ports in prop::collection::btree_map(0usize..12, "[A-Z0-9_]{2,10}", 1..12),
            split in 0usize..12,
        ) {
            let mut hub0 = serde_json::Map::new();
            let mut hub1 = serde_json::Map::new();
            for (n, (port, name)) in ports.iter().enumerate() {
                let entry = json!({
                    "platform_name_unique": format!("{}[{}]", name, n),
                    "hub_port_id": port,
                });
                if n < split {
                    hub0.insert(n.to_string(), entry);
                } else {
                    hub1.insert(n.to_string(), entry);
                }
            }
            let dir = bench(&[("0", Value::Object(hub0.clone())), ("1", Value::Object(hub1.clone()))]);
            let registry = Registry::load(dir.path()).unwrap();

            for (hub_id, map) in &[("0", &hub0), ("1", &hub1)] {
                for entry in map.values() {
                    let name = entry["platform_name_unique"].as_str().unwrap();
                    let expected = entry["hub_port_id"].as_u64().unwrap() as usize;
                    let resolved = registry.resolve(name).unwrap();
                    prop_assert_eq!(resolved.hub_id.as_str(), *hub_id);
                    prop_assert_eq!(resolved.port.index(), expected);
                }
            }
        }
    }
}
