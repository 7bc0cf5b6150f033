//! Value codec - translation between logical values and MIDI wire bytes
//!
//! Stateless: every function takes a [`Message`] descriptor and plain
//! integers. Out-of-range inputs are clamped, nothing here returns an error.

pub mod linear;
pub mod message;
pub mod relative;
pub mod wire;

pub use message::{
    ByteOrder, Message, MessageKind, RelativeMode, SignMode, TemplateByte, TemplateToken,
};
