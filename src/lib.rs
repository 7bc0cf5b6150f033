//! Electra Core - protocol and state core of a MIDI control surface
//!
//! - `codec`: value ranges, 7/14-bit splitting, relative deltas, sysex templates
//! - `control`: parameter tree of the loaded preset
//! - `state`: wire registry mapping MIDI addresses to parameter values
//! - `sysex`: editor command protocol
//! - `router`: routing matrix between the MIDI interfaces
//! - `storage`: presets and snapshot persistence
//! - `surface`: the local consumer tying everything together

pub mod codec;
pub mod config;
pub mod control;
pub mod midi;
pub mod midi_control;
pub mod paths;
pub mod ports;
pub mod preset;
pub mod router;
pub mod state;
pub mod storage;
pub mod surface;
pub mod sysex;
