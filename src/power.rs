//! Power operations on bench boards: the verbs of `benchctl power`.
//!
//! A board is addressed either directly, by the hub serial line and a port
//! index, or by its platform unique identifier looked up in the
//! [`Registry`](crate::config::Registry).

use std::{
    io::{Read, Write},
    path::Path,
    time::Duration,
};

use log::info;

use crate::{
    config::Registry,
    error::{CiError, ConfigError, HubError},
    hub::{self, Hub, PortId, PortRecord, PortSelector, PortState, Power},
    settings::Settings,
    utils::{enumerate_serial_ports, select_platform, settle},
};

/// A hub serial line and the port(s) to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub serial_port: String,
    pub port: PortSelector,
}
impl Address {
    /// Look a platform up in the registry stored in `config_dir`.
    pub fn of_platform(config_dir: &Path, platform: &str) -> Result<Self, ConfigError> {
        let resolved = Registry::load(config_dir)?.resolve(platform)?;
        Ok(Address {
            serial_port: resolved.serial_port,
            port: PortSelector::One(resolved.port),
        })
    }
}

/// Time to wait after switching a board, in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleTimes {
    pub on: Duration,
    pub off: Duration,
}
impl SettleTimes {
    fn after(&self, power: Power) -> Duration {
        match power {
            Power::On => self.on,
            Power::Off => self.off,
        }
    }
}

/// Open the hub on `address.serial_port`, reusing the line parameters of
/// `settings`.
pub fn open(settings: &Settings, address: &Address) -> Result<hub::SerialHub, HubError> {
    let mut settings = settings.clone();
    settings.path = Some(address.serial_port.clone());
    hub::open(&settings)
}

/// State of one port.
pub fn get<S: Read + Write>(hub: &mut Hub<S>, port: PortId) -> Result<PortState, HubError> {
    let state = hub.port_state(port)?;
    info!("port {} is {}", port, state);
    Ok(state)
}

/// Switch the selected port(s), then wait for the host to catch up.
pub fn set<S: Read + Write>(
    hub: &mut Hub<S>,
    port: PortSelector,
    power: Power,
    settle_times: SettleTimes,
) -> Result<(), HubError> {
    hub.set(port, power)?;
    settle(settle_times.after(power), &format!("power {}", power));
    Ok(())
}

/// Power a board off then on again.
pub fn restart<S: Read + Write>(
    hub: &mut Hub<S>,
    port: PortSelector,
    settle_times: SettleTimes,
) -> Result<(), HubError> {
    set(hub, port, Power::Off, settle_times)?;
    set(hub, port, Power::On, settle_times)
}

/// Power every port on, one at a time, waiting `between` after each so that
/// the host enumerates the boards in port order.
pub fn sequential_up<S: Read + Write>(hub: &mut Hub<S>, between: Duration) -> Result<(), HubError> {
    for port in PortId::all() {
        hub.set(PortSelector::One(port), Power::On)?;
        settle(between, &format!("powering port {}", port));
    }
    Ok(())
}

/// Records of every port.
pub fn status<S: Read + Write>(hub: &mut Hub<S>) -> Result<Vec<PortRecord>, HubError> {
    hub.state_all()
}

/// Platform identifiers across the bench, in natural order.
pub fn platforms(config_dir: &Path) -> Result<Vec<String>, ConfigError> {
    Registry::load(config_dir)?.platforms()
}

/// Ask the operator which platform to work with.
pub fn choose_platform(config_dir: &Path) -> Result<Option<String>, ConfigError> {
    Ok(select_platform(&platforms(config_dir)?))
}

/// Serial devices currently visible on this host.
pub fn serial_devices() -> Vec<String> {
    enumerate_serial_ports()
}

/// Switches test boards for the firmware driver.
pub trait TargetPower {
    fn power(&mut self, platform: &str, power: Power, settle_for: Duration) -> Result<(), CiError>;
}

/// Switches boards through the hubs described in a configuration directory.
pub struct HubPower<'a> {
    pub config_dir: &'a Path,
    pub settings: &'a Settings,
}
impl TargetPower for HubPower<'_> {
    fn power(&mut self, platform: &str, power: Power, settle_for: Duration) -> Result<(), CiError> {
        let address = Address::of_platform(self.config_dir, platform)?;
        let mut hub = open(self.settings, &address)?;
        info!("switching {} {}", platform, power);
        set(
            &mut hub,
            address.port,
            power,
            SettleTimes {
                on: settle_for,
                off: settle_for,
            },
        )?;
        Ok(())
    }
}
