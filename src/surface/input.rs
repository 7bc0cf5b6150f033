//! Inbound MIDI - routing and parameter updates from channel messages

use super::Surface;
use crate::codec::{relative, ByteOrder, MessageKind};
use crate::control::ValueRef;
use crate::midi::{cc, format_hex, MidiMessage};
use crate::router::{Delivery, MidiSource, SysexChunk};
use crate::state::{Origin, WireKey};
use crate::sysex::reply::Event;
use crate::sysex::CommandKind;
use tracing::{debug, trace};

/// NRPN/RPN parameter selected on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterNumberState {
    /// Nrpn or Rpn, `None` until a selection arrives
    pub kind: Option<MessageKind>,
    pub msb: u8,
    pub lsb: u8,
}

impl ParameterNumberState {
    fn select(&mut self, kind: MessageKind, msb: Option<u8>, lsb: Option<u8>) {
        if self.kind != Some(kind) {
            *self = Self {
                kind: Some(kind),
                ..Self::default()
            };
        }
        if let Some(msb) = msb {
            self.msb = msb;
        }
        if let Some(lsb) = lsb {
            self.lsb = lsb;
        }
    }

    /// Selected address; the RPN null parameter selects nothing
    fn selected(&self) -> Option<(MessageKind, u16)> {
        let kind = self.kind?;
        if self.msb == 127 && self.lsb == 127 {
            return None;
        }
        Some((kind, (u16::from(self.msb) << 7) | u16::from(self.lsb)))
    }
}

/// Which half of a split value a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fragment {
    Msb,
    Lsb,
}

impl Surface {
    /// Process one complete non-sysex message from `source`
    pub fn handle_midi(&mut self, source: MidiSource, bytes: &[u8]) {
        let route = self.router.route(source, bytes);
        for interface in &route.forward {
            self.send(MidiSource::new(*interface, source.port), bytes.to_vec());
        }

        let Some(msg) = MidiMessage::parse(bytes) else {
            trace!("Unparsed input from {}: {}", source, format_hex(bytes));
            return;
        };
        match route.delivery {
            Delivery::Control => self.handle_control_message(&msg),
            Delivery::Local => self.handle_parameter_message(source, &msg),
            Delivery::Drop => {}
        }
    }

    /// Process one sysex chunk from `source`; complete editor frames are
    /// dispatched as commands
    pub fn handle_sysex(&mut self, source: MidiSource, chunk: SysexChunk) {
        let route = self.router.route_sysex(source, &chunk);
        for interface in &route.forward {
            self.send(MidiSource::new(*interface, source.port), chunk.data.clone());
        }
        if route.delivery != Delivery::Local {
            return;
        }

        let buffer = self.sysex_buffers.entry(source).or_default();
        let frame = buffer.push(&chunk.data, chunk.complete);
        let uploading = frame.is_none()
            && buffer.pending().get(1).copied().and_then(CommandKind::from_byte)
                == Some(CommandKind::FileUpload);
        self.track_transfer(source, uploading);

        if let Some(frame) = frame {
            self.dispatch_frame(source, &frame);
        }
    }

    /// Hold the busy flag while an upload from `source` is in progress, so
    /// storage commands arriving meanwhile are rejected
    fn track_transfer(&mut self, source: MidiSource, uploading: bool) {
        let owner = self.transfer.as_ref().map(|(owner, _)| *owner);
        match owner {
            Some(owner) if owner == source && !uploading => {
                debug!("Transfer from {} ended", source);
                self.transfer = None;
            }
            None if uploading => match self.busy.try_acquire() {
                Some(guard) => {
                    debug!("Transfer from {} started", source);
                    self.transfer = Some((source, guard));
                }
                None => debug!("Transfer from {} started while storage is busy", source),
            },
            _ => {}
        }
    }

    fn handle_parameter_message(&mut self, source: MidiSource, msg: &MidiMessage) {
        if self.midi_learn {
            self.report_learn(source, msg);
        }

        let Some(channel) = msg.channel() else {
            if let MidiMessage::SongPosition { position } = *msg {
                for device_id in self.devices_on(source.port, None) {
                    let key = WireKey::new(device_id, MessageKind::SongPosition, 0);
                    self.set_bound(key, position);
                }
            }
            return;
        };

        for device_id in self.devices_on(source.port, Some(channel)) {
            match *msg {
                MidiMessage::ControlChange { controller, value, .. } => {
                    self.control_change(source, device_id, channel, controller, value)
                }
                MidiMessage::NoteOn { note, velocity, .. } => {
                    self.set_bound(WireKey::new(device_id, MessageKind::Note, note.into()), velocity.into())
                }
                MidiMessage::NoteOff { note, .. } => {
                    self.set_bound(WireKey::new(device_id, MessageKind::Note, note.into()), 0)
                }
                MidiMessage::ProgramChange { program, .. } => {
                    self.set_bound(WireKey::new(device_id, MessageKind::Program, 0), program.into())
                }
                MidiMessage::PitchBend { value, .. } => {
                    self.set_bound(WireKey::new(device_id, MessageKind::Pitchbend, 0), value)
                }
                MidiMessage::PolyPressure { note, pressure, .. } => self.set_bound(
                    WireKey::new(device_id, MessageKind::AftertouchPoly, note.into()),
                    pressure.into(),
                ),
                MidiMessage::ChannelPressure { pressure, .. } => self.set_bound(
                    WireKey::new(device_id, MessageKind::AftertouchChannel, 0),
                    pressure.into(),
                ),
                _ => {}
            }
        }
    }

    /// Preset devices listening on `port`, and on `channel` (0-15) if given
    fn devices_on(&self, port: u8, channel: Option<u8>) -> Vec<u8> {
        self.preset
            .devices
            .iter()
            .filter(|d| d.port == port && channel.map_or(true, |ch| d.channel == ch + 1))
            .map(|d| d.id)
            .collect()
    }

    fn control_change(&mut self, source: MidiSource, device_id: u8, channel: u8, controller: u8, value: u8) {
        let state = self.parameter_numbers.entry((source, channel)).or_default();
        match controller {
            cc::NRPN_MSB => return state.select(MessageKind::Nrpn, Some(value), None),
            cc::NRPN_LSB => return state.select(MessageKind::Nrpn, None, Some(value)),
            cc::RPN_MSB => return state.select(MessageKind::Rpn, Some(value), None),
            cc::RPN_LSB => return state.select(MessageKind::Rpn, None, Some(value)),
            _ => {}
        }

        if let Some((kind, number)) = state.selected() {
            let key = WireKey::new(device_id, kind, number);
            match controller {
                cc::DATA_ENTRY_MSB => return self.data_entry(key, Fragment::Msb, value),
                cc::DATA_ENTRY_LSB => return self.data_entry(key, Fragment::Lsb, value),
                cc::DATA_INCREMENT => return self.data_step(key, 1),
                cc::DATA_DECREMENT => return self.data_step(key, -1),
                _ => {}
            }
        }

        let number = u16::from(controller);
        let relcc = WireKey::new(device_id, MessageKind::RelativeCc, number);
        if self.is_bound(&relcc) {
            self.apply_relative(relcc, value);
        }
        let cc7 = WireKey::new(device_id, MessageKind::Cc7, number);
        if self.is_bound(&cc7) {
            self.set_bound(cc7, value.into());
        }
        if controller < 32 {
            let cc14 = WireKey::new(device_id, MessageKind::Cc14, number);
            if self.is_bound(&cc14) {
                self.fragment(cc14, Fragment::Msb, value);
            }
        } else if controller < 64 {
            let cc14 = WireKey::new(device_id, MessageKind::Cc14, number - 32);
            if self.is_bound(&cc14) {
                self.fragment(cc14, Fragment::Lsb, value);
            }
        }
    }

    fn data_entry(&mut self, key: WireKey, fragment: Fragment, value: u8) {
        let Some(r) = self.first_destination(&key) else {
            return;
        };
        let Some(message) = self.controls.value(r).map(|cv| cv.message.clone()) else {
            return;
        };
        if message.is_relative() {
            if fragment == Fragment::Msb {
                self.apply_relative(key, value);
            }
            return;
        }
        if message.effective_bit_width() > 7 {
            self.fragment(key, fragment, value);
        } else if fragment == Fragment::Msb {
            self.registry.set_value(key, value.into(), Origin::Midi);
        }
    }

    fn data_step(&mut self, key: WireKey, step: i32) {
        let Some(r) = self.first_destination(&key) else {
            return;
        };
        let Some(width) = self.controls.value(r).map(|cv| cv.message.effective_bit_width()) else {
            return;
        };
        let max = (1i32 << width) - 1;
        let current = i32::from(self.registry.value(&key).unwrap_or(0));
        let next = (current + step).clamp(0, max) as u16;
        self.registry.set_value(key, next, Origin::Midi);
    }

    /// Store one half of a 14-bit value. The half sent first by the
    /// message's byte order replaces the value, the other one is OR-ed in.
    fn fragment(&mut self, key: WireKey, fragment: Fragment, value: u8) {
        let Some(r) = self.first_destination(&key) else {
            return;
        };
        let Some(message) = self.controls.value(r).map(|cv| cv.message.clone()) else {
            return;
        };
        if message.is_relative() {
            if fragment == Fragment::Msb {
                self.apply_relative(key, value);
            }
            return;
        }

        let first = match message.byte_order {
            ByteOrder::MsbFirst => Fragment::Msb,
            ByteOrder::LsbFirst => Fragment::Lsb,
        };
        let bits = match fragment {
            Fragment::Msb => u16::from(value & 0x7F) << 7,
            Fragment::Lsb => u16::from(value & 0x7F),
        };
        if fragment == first {
            self.registry.set_value(key, bits, Origin::Midi);
        } else {
            self.registry.apply_fragment(key, bits, Origin::Midi);
        }
    }

    /// Apply a relative delta byte to the value held for `key`. The result
    /// reaches every destination on the next flush.
    fn apply_relative(&mut self, key: WireKey, byte: u8) {
        let Some(r) = self.first_destination(&key) else {
            return;
        };
        let Some((control_type, cv, overlay)) = self.controls.resolve(r) else {
            return;
        };
        let (lo, hi) = cv.bounds();
        let current = self
            .registry
            .value(&key)
            .map_or(cv.value, |s| cv.from_registry(control_type, overlay, s));
        let next = relative::apply(current, byte, cv.message.relative_mode, cv.message.accelerated, lo, hi);
        let stored = cv.to_registry(control_type, overlay, next);
        trace!("{} relative {} -> {}", key, byte, next);
        self.registry.set_value(key, stored, Origin::Midi);
    }

    fn is_bound(&self, key: &WireKey) -> bool {
        self.registry.get(key).is_some_and(|entry| entry.has_destinations())
    }

    fn first_destination(&self, key: &WireKey) -> Option<ValueRef> {
        self.registry
            .get(key)
            .and_then(|entry| entry.destinations().first().copied())
    }

    /// Set an absolute value if the address has destinations
    fn set_bound(&mut self, key: WireKey, value: u16) {
        if !self.is_bound(&key) {
            return;
        }
        let relative = self
            .first_destination(&key)
            .and_then(|r| self.controls.value(r))
            .is_some_and(|cv| cv.message.is_relative());
        if relative {
            self.apply_relative(key, (value & 0x7F) as u8);
        } else {
            self.registry.set_value(key, value, Origin::Midi);
        }
    }

    fn report_learn(&mut self, source: MidiSource, msg: &MidiMessage) {
        let (kind, parameter, value) = match *msg {
            MidiMessage::ControlChange { controller, value, .. } => {
                (MessageKind::Cc7, u16::from(controller), u16::from(value))
            }
            MidiMessage::NoteOn { note, velocity, .. } => {
                (MessageKind::Note, u16::from(note), u16::from(velocity))
            }
            MidiMessage::NoteOff { note, .. } => (MessageKind::Note, u16::from(note), 0),
            MidiMessage::ProgramChange { program, .. } => {
                (MessageKind::Program, 0, u16::from(program))
            }
            MidiMessage::PitchBend { value, .. } => (MessageKind::Pitchbend, 0, value),
            MidiMessage::PolyPressure { note, pressure, .. } => {
                (MessageKind::AftertouchPoly, u16::from(note), u16::from(pressure))
            }
            MidiMessage::ChannelPressure { pressure, .. } => {
                (MessageKind::AftertouchChannel, 0, u16::from(pressure))
            }
            _ => return,
        };
        let channel = msg.channel().map_or(0, |ch| ch + 1);
        debug!("MIDI learn: {} ch {} #{} = {}", kind, channel, parameter, value);
        self.notify(Event::MidiLearn {
            port: source.port,
            kind: kind.to_byte(),
            channel,
            parameter,
            value,
        });
    }
}
