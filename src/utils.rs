//! Helper functions for the serial line and the terminal.

mod ports;
mod select;
mod settle;

pub(crate) use ports::{enumerate_serial_ports, open_and_setup_port};
pub(crate) use select::select_platform;
pub(crate) use settle::settle;
