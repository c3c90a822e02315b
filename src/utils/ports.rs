//! Serial port device manipulation.

use log::{debug, info};
use serialport::{available_ports, SerialPort, SerialPortType};

use crate::Settings;

//==============================================================================
// Public Interface
//==============================================================================

/// Open the hub serial line, retrying a few times as the device node may
/// still be settling after the hub itself was plugged in.
pub(crate) fn open_and_setup_port(
    settings: &Settings,
) -> Result<Box<dyn SerialPort>, serialport::Error> {
    use retry::{delay, retry_with_index};

    let path = settings.path.clone().ok_or_else(|| {
        serialport::Error::new(
            serialport::ErrorKind::InvalidInput,
            "no serial port given for the hub",
        )
    })?;

    let result = retry_with_index(
        delay::Fixed::from_millis(1000).take(4),
        |index| -> Result<Box<dyn SerialPort>, serialport::Error> {
            debug!("Trying to connect {} ({})", path, index);
            serialport::new(&path, settings.baud_rate)
                .data_bits(settings.data_bits)
                .stop_bits(settings.stop_bits)
                .parity(settings.parity)
                .flow_control(settings.flow_control)
                .timeout(settings.read_timeout)
                .open()
        },
    );
    match result {
        Ok(port) => {
            info!(
                "Connected to {} at {} baud",
                path,
                port.baud_rate().unwrap_or(settings.baud_rate)
            );
            debug!("data_bits    : {:#?}", port.data_bits());
            debug!("stop_bits    : {:#?}", port.stop_bits());
            debug!("parity       : {:#?}", port.parity());
            debug!("flow control : {:#?}", port.flow_control());
            Ok(port)
        }
        Err(err) => match err {
            retry::Error::Operation {
                error,
                total_delay,
                tries,
            } => {
                info!(
                    "Failed to open the port after {:?} and {} tries: {}",
                    total_delay, tries, error,
                );
                Err(error)
            }
            retry::Error::Internal(_) => {
                info!("Internal retry error while opening port");
                Err(serialport::Error::new(
                    serialport::ErrorKind::Unknown,
                    "internal error while retrying to open the port",
                ))
            }
        },
    }
}

/// Serial devices present on the system, with the USB manufacturer and
/// product when known. Handy to find which device node a hub got.
pub(crate) fn enumerate_serial_ports() -> Vec<String> {
    let mut found = vec![];
    match available_ports() {
        Ok(ports) => {
            for p in ports {
                match p.port_type {
                    SerialPortType::UsbPort(info) => {
                        found.push(format!(
                            "{}: ({} / {})",
                            p.port_name,
                            info.manufacturer.as_ref().map_or("", String::as_str),
                            info.product.as_ref().map_or("", String::as_str)
                        ));
                    }
                    _ => found.push(p.port_name),
                }
            }
        }
        Err(ref e) => {
            info!("error: {}", e);
        }
    }
    found
}
