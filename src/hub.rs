//! Control of the USB charging hub over its serial command line.
//!
//! The hub understands three commands that matter here:
//!
//! * `system` identifies the hub model and firmware,
//! * `state [n]` reports one or all ports,
//! * `mode {o|s} n` switches port `n` off or on (sync).
//!
//! **Example** - Power cycling the first port:
//! ```no_run
//! use benchctl::{hub, PortId, Power, PortSelector, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
//! let mut hub = hub::open(&settings)?;
//! let port = PortId::new(0)?;
//! hub.set(PortSelector::One(port), Power::Off)?;
//! hub.set(PortSelector::One(port), Power::On)?;
//! println!("port {} is {}", port, hub.port_state(port)?);
//! # Ok::<(), benchctl::HubError>(())
//! ```

mod port;
mod protocol;
mod transport;

use std::io::{Read, Write};

use log::{debug, info};
use serialport::SerialPort;

use crate::{error::HubError, settings::Settings, utils::open_and_setup_port};

pub use port::{PortId, PortRecord, PortSelector, PortState, Power, MAX_PORTS};
pub use protocol::{SystemInfo, SUPPORTED_HUB};
pub use transport::{Transport, PROMPT};

/// A hub reached through an open serial line.
pub type SerialHub = Hub<Box<dyn SerialPort>>;

/// Open the serial line described by `settings` and identify the hub.
pub fn open(settings: &Settings) -> Result<SerialHub, HubError> {
    let port = open_and_setup_port(settings)?;
    Hub::connect(port, settings)
}

/// A conversation with one hub.
pub struct Hub<S> {
    link: Transport<S>,
    info: SystemInfo,
}
impl<S: Read + Write> Hub<S> {
    /// Reset the hub command line and check it is a supported model. The
    /// stream is dropped, which closes the line, when the model is unknown.
    pub fn connect(stream: S, settings: &Settings) -> Result<Self, HubError> {
        let mut link = Transport::new(stream, settings);
        link.reset()?;

        let info = SystemInfo::parse(&link.transact(protocol::SYSTEM)?);
        if !info.is_supported() {
            return Err(HubError::UnsupportedHub {
                found: info.description,
            });
        }
        info!("Connected to `{}`", info.description);
        Ok(Hub { link, info })
    }

    /// What the hub reported when the connection was established.
    pub fn info(&self) -> &SystemInfo {
        &self.info
    }

    /// Issue `system` again and return the fresh report.
    pub fn system(&mut self) -> Result<SystemInfo, HubError> {
        Ok(SystemInfo::parse(&self.link.transact(protocol::SYSTEM)?))
    }

    /// The record of a single port.
    pub fn state(&mut self, port: PortId) -> Result<PortRecord, HubError> {
        let command = protocol::state_command(port);
        let lines = self.link.transact(&command)?;
        protocol::parse_state(&command, &lines)?
            .into_iter()
            .next()
            .ok_or_else(|| HubError::MalformedReply {
                command,
                reason: "empty reply".into(),
            })
    }

    /// The records of every port.
    pub fn state_all(&mut self) -> Result<Vec<PortRecord>, HubError> {
        let lines = self.link.transact(protocol::STATE)?;
        protocol::parse_state(protocol::STATE, &lines)
    }

    /// Interpret the flags of `port`. A record for another port than the one
    /// requested yields [`PortState::Unknown`].
    pub fn port_state(&mut self, port: PortId) -> Result<PortState, HubError> {
        let record = self.state(port)?;
        if record.number() != Some(port.wire()) {
            debug!(
                "asked for port {} but the hub reported `{}`",
                port.wire(),
                record.port_num
            );
            return Ok(PortState::Unknown);
        }
        Ok(record.state())
    }

    /// Switch one port, or every port in order, on or off. The new state is
    /// not read back.
    pub fn set(&mut self, selector: PortSelector, power: Power) -> Result<(), HubError> {
        match selector {
            PortSelector::One(port) => self.mode(port, power),
            PortSelector::All => PortId::all().try_for_each(|port| self.mode(port, power)),
        }
    }

    fn mode(&mut self, port: PortId, power: Power) -> Result<(), HubError> {
        let command = protocol::mode_command(port, power);
        debug!("port {} -> {}", port, power);
        let lines = self.link.transact(&command)?;
        protocol::check_mode_reply(&command, &lines)
    }

    /// End the conversation and hand back the stream.
    pub fn close(self) -> S {
        self.link.into_inner()
    }
}
