use std::io::{self, Read, Write};
use std::time::Duration;

use serde::Serialize;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::link::{Connector, LinkError, LinkOptions, Transport};

pub const ID_MANUFACTURER: &str = "ladecadence.net";
pub const ID_PRODUCT: &str = "GB Flasher";

/// FTDI FT232R, the USB bridge on the flasher board.
pub const FTDI_VID: u16 = 0x0403;
pub const FTDI_PID: u16 = 0x6001;

pub const BAUD_115_2K: u32 = 115_200;
pub const BAUD_230_4K: u32 = 230_400;
pub const BAUD_1M: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlasherPort {
    pub port_name: String,
    pub vid: u16,
    pub pid: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

pub fn matches_identity(manufacturer: Option<&str>, product: Option<&str>) -> bool {
    manufacturer == Some(ID_MANUFACTURER) && product == Some(ID_PRODUCT)
}

/// Every serial port whose USB strings identify it as a GB Shooper.
pub fn list_devices() -> Result<Vec<FlasherPort>, LinkError> {
    let ports = serialport::available_ports().map_err(LinkError::Enumerate)?;
    let mut out: Vec<FlasherPort> = Vec::new();

    for p in ports {
        let serialport::SerialPortInfo {
            port_name,
            port_type,
        } = p;

        let serialport::SerialPortType::UsbPort(usb) = port_type else {
            continue;
        };

        if !matches_identity(usb.manufacturer.as_deref(), usb.product.as_deref()) {
            continue;
        }

        out.push(FlasherPort {
            port_name,
            vid: usb.vid,
            pid: usb.pid,
            serial_number: usb.serial_number,
            manufacturer: usb.manufacturer,
            product: usb.product,
        });
    }

    out.sort_by(|a, b| a.port_name.cmp(&b.port_name));
    Ok(out)
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    port_name: String,
    timeout: Duration,
}

impl SerialTransport {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let timeout = Duration::from_millis(10);
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|e| LinkError::Open {
                port: port_name.to_string(),
                source: e,
            })?;

        tracing::info!(port = port_name, baud_rate, "opened flasher serial port");

        Ok(Self {
            port,
            port_name: port_name.to_string(),
            timeout,
        })
    }
}

/// Maps one single-byte read to the `Transport::read_byte` contract.
///
/// A zero-length read means the port went away, not that it is idle.
fn read_outcome(result: io::Result<usize>, byte: u8) -> Result<Option<u8>, LinkError> {
    match result {
        Ok(0) => Err(LinkError::Read(io::ErrorKind::UnexpectedEof.into())),
        Ok(_) => Ok(Some(byte)),
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            Ok(None)
        }
        Err(e) => Err(LinkError::Read(e)),
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(data).map_err(LinkError::Write)?;
        self.port.flush().map_err(LinkError::Write)
    }

    fn read_byte(&mut self, wait: Duration) -> Result<Option<u8>, LinkError> {
        if wait != self.timeout {
            self.port
                .set_timeout(wait)
                .map_err(|e| LinkError::Read(io::Error::from(e)))?;
            self.timeout = wait;
        }

        let mut buf = [0u8; 1];
        let result = self.port.read(&mut buf);
        read_outcome(result, buf[0])
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| LinkError::Read(io::Error::from(e)))
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        tracing::info!(port = %self.port_name, "closed flasher serial port");
    }
}

/// Opens the first port matching the flasher identity.
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    pub options: LinkOptions,
}

impl SerialConnector {
    pub fn new(options: LinkOptions) -> Self {
        Self { options }
    }
}

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn connect(&self) -> Result<SerialTransport, LinkError> {
        let devices = list_devices()?;
        let dev = devices.first().ok_or(LinkError::NoDevice)?;
        if devices.len() > 1 {
            tracing::warn!(
                count = devices.len(),
                port = %dev.port_name,
                "multiple flashers detected, using the first"
            );
        }
        SerialTransport::open(&dev.port_name, self.options.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_requires_exact_strings() {
        assert!(matches_identity(Some("ladecadence.net"), Some("GB Flasher")));
        assert!(!matches_identity(Some("ladecadence.net"), Some("GB Flasher ")));
        assert!(!matches_identity(Some("FTDI"), Some("FT232R USB UART")));
        assert!(!matches_identity(None, Some("GB Flasher")));
        assert!(!matches_identity(Some("ladecadence.net"), None));
    }

    #[test]
    fn read_outcome_separates_idle_from_disconnect() {
        assert_eq!(read_outcome(Ok(1), 0x5A).unwrap(), Some(0x5A));
        let idle = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(read_outcome(Err(idle), 0).unwrap(), None);

        let eof = read_outcome(Ok(0), 0).unwrap_err();
        assert!(
            matches!(&eof, LinkError::Read(e) if e.kind() == io::ErrorKind::UnexpectedEof),
            "{eof:?}"
        );
        let broken = io::Error::from(io::ErrorKind::BrokenPipe);
        assert!(matches!(read_outcome(Err(broken), 0), Err(LinkError::Read(_))));
    }
}
