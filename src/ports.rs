//! System MIDI ports backing the surface interfaces
//!
//! Each configured interface port is bound to a system input and/or output
//! by case-insensitive name substring. Input callbacks run on driver threads
//! and only push [`InboundEvent`]s into the processing channel.

use crate::config::PortMapping;
use crate::midi::{format_hex, SYSEX_END, SYSEX_START};
use crate::router::{MidiSource, SysexChunk};
use crate::surface::Outgoing;
use anyhow::{Context, Result};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Message received on an interface port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Midi { source: MidiSource, bytes: Vec<u8> },
    Sysex { source: MidiSource, chunk: SysexChunk },
}

/// Classifies raw input for one port. Drivers may split long sysex
/// messages; chunks are tracked until the closing F7.
#[derive(Debug, Clone, Copy)]
pub struct InputDecoder {
    source: MidiSource,
    in_sysex: bool,
}

impl InputDecoder {
    pub fn new(source: MidiSource) -> Self {
        Self {
            source,
            in_sysex: false,
        }
    }

    pub fn decode(&mut self, data: &[u8]) -> Option<InboundEvent> {
        let first = *data.first()?;
        if first == SYSEX_START || (self.in_sysex && first < 0x80) {
            let complete = data.last() == Some(&SYSEX_END);
            self.in_sysex = !complete;
            return Some(InboundEvent::Sysex {
                source: self.source,
                chunk: SysexChunk {
                    data: data.to_vec(),
                    complete,
                },
            });
        }
        if first < 0x80 {
            trace!("Stray data byte from {}: {}", self.source, format_hex(data));
            return None;
        }
        if first < 0xF8 {
            // any other status byte aborts an unfinished sysex
            self.in_sysex = false;
        }
        Some(InboundEvent::Midi {
            source: self.source,
            bytes: data.to_vec(),
        })
    }
}

/// Open connections of every mapped port
#[derive(Default)]
pub struct PortSet {
    inputs: Vec<(MidiSource, MidiInputConnection<()>)>,
    outputs: HashMap<MidiSource, Arc<Mutex<MidiOutputConnection>>>,
}

impl PortSet {
    /// Connect every mapping. Ports that cannot be opened are logged and
    /// skipped, the surface runs with whatever is available.
    pub fn open(mappings: &[PortMapping], event_tx: mpsc::Sender<InboundEvent>) -> Self {
        let mut ports = Self::default();
        for mapping in mappings {
            let source = MidiSource::new(mapping.interface, mapping.port);
            if let Some(pattern) = mapping.input.as_deref().filter(|p| !p.is_empty()) {
                match connect_input(source, pattern, event_tx.clone()) {
                    Ok(conn) => ports.inputs.push((source, conn)),
                    Err(e) => warn!("Input {} not connected: {:#}", source, e),
                }
            }
            if let Some(pattern) = mapping.output.as_deref().filter(|p| !p.is_empty()) {
                match connect_output(source, pattern) {
                    Ok(conn) => {
                        ports.outputs.insert(source, Arc::new(Mutex::new(conn)));
                    }
                    Err(e) => warn!("Output {} not connected: {:#}", source, e),
                }
            }
        }
        info!(
            "MIDI ports connected: {} inputs, {} outputs",
            ports.inputs.len(),
            ports.outputs.len()
        );
        ports
    }

    /// Send queued bytes to their port; unmapped targets are dropped
    pub fn deliver(&self, outgoing: &Outgoing) {
        let Some(conn) = self.outputs.get(&outgoing.target) else {
            trace!("No output for {}, {} bytes dropped", outgoing.target, outgoing.bytes.len());
            return;
        };
        if let Err(e) = conn.lock().send(&outgoing.bytes) {
            warn!("Send to {} failed: {}", outgoing.target, e);
        }
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn close(&mut self) {
        for (source, conn) in self.inputs.drain(..) {
            debug!("Closing input {}", source);
            conn.close();
        }
        self.outputs.clear();
    }
}

/// Find a port by case-insensitive substring match
fn find_port<T: midir::MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    let pattern = pattern.to_lowercase();
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        name.to_lowercase()
            .contains(&pattern)
            .then_some((port, name))
    })
}

fn connect_input(
    source: MidiSource,
    pattern: &str,
    event_tx: mpsc::Sender<InboundEvent>,
) -> Result<MidiInputConnection<()>> {
    let mut midi_in =
        MidiInput::new(&format!("electra-core-{}", source)).context("Failed to create MIDI input")?;
    midi_in.ignore(Ignore::None);

    let (port, name) = find_port(&midi_in, pattern)
        .ok_or_else(|| anyhow::anyhow!("Input port '{}' not found", pattern))?;
    info!("Input {} <- {}", source, name);

    let mut decoder = InputDecoder::new(source);
    midi_in
        .connect(
            &port,
            "electra-core",
            move |_timestamp, data, _| {
                if let Some(event) = decoder.decode(data) {
                    // never block the driver thread
                    if let Err(e) = event_tx.try_send(event) {
                        warn!("Inbound event from {} dropped: {}", source, e);
                    }
                }
            },
            (),
        )
        .map_err(|e| anyhow::anyhow!("Failed to connect to input port '{}': {}", name, e))
}

fn connect_output(source: MidiSource, pattern: &str) -> Result<MidiOutputConnection> {
    let midi_out = MidiOutput::new(&format!("electra-core-{}", source))
        .context("Failed to create MIDI output")?;
    let (port, name) = find_port(&midi_out, pattern)
        .ok_or_else(|| anyhow::anyhow!("Output port '{}' not found", pattern))?;
    info!("Output {} -> {}", source, name);

    midi_out
        .connect(&port, "electra-core")
        .map_err(|e| anyhow::anyhow!("Failed to connect to output port '{}': {}", name, e))
}

/// Print the system MIDI ports
pub fn list_ports() -> Result<()> {
    use colored::*;

    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    let midi_in = MidiInput::new("electra-core-scanner")?;
    println!("\n{}", "Input Ports:".bold());
    let inputs: Vec<String> = midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect();
    if inputs.is_empty() {
        println!("  {}", "No input ports found".dimmed());
    }
    for (index, name) in inputs.iter().enumerate() {
        println!("  {} {}", format!("[{}]", index).green(), name);
    }

    let midi_out = MidiOutput::new("electra-core-scanner")?;
    println!("\n{}", "Output Ports:".bold());
    let outputs: Vec<String> = midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect();
    if outputs.is_empty() {
        println!("  {}", "No output ports found".dimmed());
    }
    for (index, name) in outputs.iter().enumerate() {
        println!("  {} {}", format!("[{}]", index).green(), name);
    }
    println!();

    Ok(())
}
