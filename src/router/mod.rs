//! Router module - Forwarding matrix between the physical MIDI interfaces
//!
//! Every inbound message is evaluated once per destination interface:
//! - Six hop flags enable forwarding between distinct interfaces
//! - `midi_io_thru` and `usb_host_thru` echo back on the source interface
//! - The reserved control port/channel is consumed locally and never forwarded
//! - Port 2 of the USB device interface carries editor traffic and stays local
//!
//! Forwarding is single-hop: a forwarded message is never routed again.

#[cfg(test)]
mod tests;

use crate::midi::{format_hex, MidiMessage};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Editor port on the USB device interface
pub const CTRL_PORT: u8 = 2;

/// Highest port index on any interface
pub const MAX_PORT: u8 = 2;

/// Physical MIDI interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    /// Connection to the host computer
    UsbDevice,
    /// Devices plugged into the host socket
    UsbHost,
    /// DIN / jack MIDI ports
    MidiIo,
}

impl Interface {
    pub const ALL: [Interface; 3] = [Interface::UsbDevice, Interface::UsbHost, Interface::MidiIo];
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interface::UsbDevice => "usb-dev",
            Interface::UsbHost => "usb-host",
            Interface::MidiIo => "midi-io",
        };
        f.write_str(name)
    }
}

/// Where a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiSource {
    pub interface: Interface,
    pub port: u8,
}

impl MidiSource {
    pub fn new(interface: Interface, port: u8) -> Self {
        Self { interface, port }
    }

    pub fn is_ctrl(&self) -> bool {
        self.interface == Interface::UsbDevice && self.port == CTRL_PORT
    }
}

impl fmt::Display for MidiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.interface, self.port)
    }
}

/// Port and channel reserved for controlling the surface itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPort {
    /// Port index 0-2
    pub port: u8,
    /// MIDI channel 1-16, 0 matches any channel
    #[serde(default)]
    pub channel: u8,
}

impl ControlPort {
    /// `channel` is 0-15 as carried by the message
    pub fn matches(&self, port: u8, channel: u8) -> bool {
        self.port == port && (self.channel == 0 || self.channel == channel + 1)
    }
}

/// Link-enable matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub usb_dev_to_usb_host: bool,
    pub usb_dev_to_midi_io: bool,
    pub usb_host_to_usb_dev: bool,
    pub usb_host_to_midi_io: bool,
    pub midi_io_to_usb_dev: bool,
    pub midi_io_to_usb_host: bool,
    pub midi_io_thru: bool,
    pub usb_host_thru: bool,
    pub control_port: Option<ControlPort>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            usb_dev_to_usb_host: true,
            usb_dev_to_midi_io: true,
            usb_host_to_usb_dev: true,
            usb_host_to_midi_io: true,
            midi_io_to_usb_dev: true,
            midi_io_to_usb_host: true,
            midi_io_thru: false,
            usb_host_thru: false,
            control_port: None,
        }
    }
}

impl RouterConfig {
    /// Matrix with every link disabled
    pub fn isolated() -> Self {
        Self {
            usb_dev_to_usb_host: false,
            usb_dev_to_midi_io: false,
            usb_host_to_usb_dev: false,
            usb_host_to_midi_io: false,
            midi_io_to_usb_dev: false,
            midi_io_to_usb_host: false,
            midi_io_thru: false,
            usb_host_thru: false,
            control_port: None,
        }
    }

    /// Whether traffic from `from` is emitted on `to`
    pub fn link(&self, from: Interface, to: Interface) -> bool {
        use Interface::*;
        match (from, to) {
            (UsbDevice, UsbHost) => self.usb_dev_to_usb_host,
            (UsbDevice, MidiIo) => self.usb_dev_to_midi_io,
            (UsbHost, UsbDevice) => self.usb_host_to_usb_dev,
            (UsbHost, MidiIo) => self.usb_host_to_midi_io,
            (MidiIo, UsbDevice) => self.midi_io_to_usb_dev,
            (MidiIo, UsbHost) => self.midi_io_to_usb_host,
            (MidiIo, MidiIo) => self.midi_io_thru,
            (UsbHost, UsbHost) => self.usb_host_thru,
            (UsbDevice, UsbDevice) => false,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(control) = self.control_port {
            if control.port > MAX_PORT {
                anyhow::bail!("router.control_port.port must be 0-{}", MAX_PORT);
            }
            if control.channel > 16 {
                anyhow::bail!("router.control_port.channel must be 0-16");
            }
        }
        Ok(())
    }
}

/// What the local consumer does with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Parameter data or editor sysex
    Local,
    /// Surface control bindings and program/bank navigation only
    Control,
    /// Not consumed locally
    Drop,
}

/// Routing decision for one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Interfaces to emit the message on, same port index as the source
    pub forward: Vec<Interface>,
    pub delivery: Delivery,
}

impl Route {
    fn consumed(delivery: Delivery) -> Self {
        Self {
            forward: Vec::new(),
            delivery,
        }
    }
}

/// One piece of a sysex frame as delivered by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysexChunk {
    pub data: Vec<u8>,
    /// The chunk ends the frame
    pub complete: bool,
}

/// Per-message forwarding matrix
#[derive(Debug, Clone, Default)]
pub struct MidiRouter {
    config: RouterConfig,
}

impl MidiRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Reserve a port/channel for surface control; `channel` 0 means any
    pub fn set_control_port(&mut self, port: u8, channel: u8) {
        self.config.control_port = Some(ControlPort { port, channel });
        debug!("Control port set to {} channel {}", port, channel);
    }

    pub fn control_port(&self) -> Option<ControlPort> {
        self.config.control_port
    }

    /// Route a complete short message
    pub fn route(&self, source: MidiSource, bytes: &[u8]) -> Route {
        let channel = MidiMessage::parse(bytes).and_then(|m| m.channel());

        if let Some(ch) = channel {
            if self
                .config
                .control_port
                .is_some_and(|c| c.matches(source.port, ch))
            {
                trace!("Control port {} <- {}", source, format_hex(bytes));
                return Route::consumed(Delivery::Control);
            }
        }

        if source.is_ctrl() {
            let delivery = if channel.is_some() { Delivery::Drop } else { Delivery::Local };
            return Route::consumed(delivery);
        }

        Route {
            forward: self.destinations(source.interface),
            delivery: Delivery::Local,
        }
    }

    /// Route one sysex chunk; forwarding happens chunk by chunk
    pub fn route_sysex(&self, source: MidiSource, chunk: &SysexChunk) -> Route {
        trace!(
            "Sysex chunk {} bytes from {}{}",
            chunk.data.len(),
            source,
            if chunk.complete { " (end)" } else { "" }
        );
        let delivery = if source.interface == Interface::UsbDevice {
            Delivery::Local
        } else {
            Delivery::Drop
        };
        if source.is_ctrl() {
            return Route::consumed(delivery);
        }
        Route {
            forward: self.destinations(source.interface),
            delivery,
        }
    }

    fn destinations(&self, from: Interface) -> Vec<Interface> {
        Interface::ALL
            .into_iter()
            .filter(|to| self.config.link(from, *to))
            .collect()
    }
}
