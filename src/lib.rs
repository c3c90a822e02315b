//! Benchctl runs a hardware-in-the-loop test bench: development boards are
//! attached to the build node through programmable USB charging hubs, and
//! their power is switched over each hub's serial command line so a board
//! can be reset, brought up in a known order or kept off between runs.
//!
//! On top of the hub control, benchctl drives the two kinds of builds the
//! bench exists for:
//!
//! * [`firmware`] builds the mbed firmware tree for a target, flashes and
//!   tests it on a board of the bench, and publishes releases;
//! * [`distro`] checks the Linux distribution out of its many repositories,
//!   optionally pinning some of them to chosen revisions, and builds it.
//!
//! The layers, from the wire up:
//!
//! * [`Settings`] describe the serial line to a hub and are built with a
//!   [`SettingsBuilder`].
//! * [`hub`] frames replies on the hub prompt, parses the `system` and
//!   `state` reports and switches ports with `mode`.
//! * [`config`] maps the platform identifier of a board (`K64F[0]`) to the
//!   hub and port it hangs from.
//! * [`power`] combines both into the operations of `benchctl power`.
//!
//! Build drivers run external tools through the [`exec::CommandRunner`]
//! trait and switch boards through [`power::TargetPower`], which keeps them
//! testable without a bench.

pub mod config;
pub mod distro;
pub mod exec;
pub mod firmware;
pub mod hub;
pub mod power;

mod error;
mod settings;
mod utils;

pub use error::{CiError, ConfigError, HubError};
pub use hub::{Hub, PortId, PortRecord, PortSelector, PortState, Power, SystemInfo, MAX_PORTS};
pub use settings::{Settings, SettingsBuilder};
