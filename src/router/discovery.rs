// ABOUTME: Finds serial ports that should get a modem session
// ABOUTME: Either by USB vendor/product id through serialport enumeration or from a fixed list

use serialport::{SerialPortInfo, SerialPortType};

/// Source of candidate serial ports, polled on every discovery pass
pub trait PortDiscovery: Send + 'static {
    fn discover(&mut self) -> Result<Vec<String>, serialport::Error>;
}

/// Ports whose USB adapter matches a vendor and product id.
///
/// Defaults to the WCH CH340 bridge found on most SIM800 boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbPortScanner {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl Default for UsbPortScanner {
    fn default() -> Self {
        Self::new(0x1A86, 0x7523)
    }
}

impl UsbPortScanner {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Names of the ports in `ports` that match this scanner
    pub fn select(&self, ports: Vec<SerialPortInfo>) -> Vec<String> {
        ports
            .into_iter()
            .filter(|port| match &port.port_type {
                SerialPortType::UsbPort(usb) => {
                    usb.vid == self.vendor_id && usb.pid == self.product_id
                }
                _ => false,
            })
            .map(|port| port.port_name)
            .collect()
    }
}

impl PortDiscovery for UsbPortScanner {
    fn discover(&mut self) -> Result<Vec<String>, serialport::Error> {
        Ok(self.select(serialport::available_ports()?))
    }
}

/// A fixed set of port names, for boards without a USB bridge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPorts(pub Vec<String>);

impl PortDiscovery for StaticPorts {
    fn discover(&mut self) -> Result<Vec<String>, serialport::Error> {
        Ok(self.0.clone())
    }
}
