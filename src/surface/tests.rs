//! Tests for Surface module

use super::*;
use crate::control::ControlId;
use crate::midi_control::{BindingKind, ControlEvent, MidiControlBinding};
use crate::router::{RouterConfig, SysexChunk};
use crate::sysex::events;
use crate::sysex::reply::{ack, nack};
use tempfile::TempDir;

const PRESET: &str = r#"{
    "version": 2,
    "name": "Test",
    "projectId": "proj",
    "devices": [{"id": 1, "name": "Synth", "port": 0, "channel": 1}],
    "controls": [
        {"id": 1, "type": "fader", "name": "Cutoff",
         "values": [{"message": {"deviceId": 1, "type": "cc7", "parameterNumber": 74}}]},
        {"id": 2, "type": "fader", "pageId": 2, "name": "Cutoff copy",
         "values": [{"message": {"deviceId": 1, "type": "cc7", "parameterNumber": 74}}]},
        {"id": 3, "type": "fader",
         "values": [{"min": 0, "max": 16383,
                     "message": {"deviceId": 1, "type": "cc14", "parameterNumber": 1, "max": 16383, "bitWidth": 14}}]},
        {"id": 4, "type": "fader",
         "values": [{"min": 0, "max": 16383,
                     "message": {"deviceId": 1, "type": "nrpn", "parameterNumber": 300, "max": 16383, "bitWidth": 14}}]},
        {"id": 5, "type": "relative",
         "values": [{"min": 0, "max": 100, "defaultValue": 50,
                     "message": {"deviceId": 1, "type": "relcc", "parameterNumber": 20}}]}
    ]
}"#;

/// Controls 1 and 2 share a virtual address, control 3 is relative
const VIRTUAL_PRESET: &str = r#"{
    "name": "Virtual",
    "projectId": "proj",
    "devices": [{"id": 1, "name": "Synth", "port": 0, "channel": 1}],
    "controls": [
        {"id": 1, "type": "fader",
         "values": [{"min": 0, "max": 1000, "defaultValue": 10,
                     "message": {"deviceId": 1, "type": "virtual", "parameterNumber": 3}}]},
        {"id": 2, "type": "fader", "pageId": 1,
         "values": [{"min": 0, "max": 1000, "defaultValue": 10,
                     "message": {"deviceId": 1, "type": "virtual", "parameterNumber": 3}}]},
        {"id": 3, "type": "relative",
         "values": [{"min": 0, "max": 100, "defaultValue": 50,
                     "message": {"deviceId": 1, "type": "relcc", "parameterNumber": 20}}]}
    ]
}"#;

fn make_test_surface(dir: &TempDir) -> Surface {
    make_surface_with(dir, PRESET)
}

fn make_surface_with(dir: &TempDir, preset: &str) -> Surface {
    let mut surface = Surface::new(
        dir.path(),
        MidiRouter::new(RouterConfig::isolated()),
        MidiControl::default(),
    );
    surface.load_preset(Preset::parse(preset.as_bytes()).unwrap());
    surface.flush();
    surface.take_outgoing();
    surface
}

fn frame(head: &[u8], body: &str) -> Vec<u8> {
    let mut frame = vec![0xF0];
    frame.extend_from_slice(head);
    frame.extend_from_slice(body.as_bytes());
    frame.push(0xF7);
    frame
}

fn send_sysex(surface: &mut Surface, frame: &[u8]) {
    surface.handle_sysex(
        editor(),
        SysexChunk {
            data: frame.to_vec(),
            complete: true,
        },
    );
}

/// Frames queued for the editor port, other output discarded
fn editor_frames(surface: &mut Surface) -> Vec<Vec<u8>> {
    surface
        .take_outgoing()
        .into_iter()
        .filter(|o| o.target == editor())
        .map(|o| o.bytes)
        .collect()
}

fn value_of(surface: &Surface, control: ControlId) -> i32 {
    surface.controls().value(ValueRef::new(control, 0)).unwrap().value
}

fn midi_io() -> MidiSource {
    MidiSource::new(Interface::MidiIo, 0)
}

#[test]
fn test_preset_load_emits_nothing() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    assert_eq!(surface.controls().len(), 5);
    assert_eq!(value_of(&surface, 5), 50);
    assert!(surface.take_outgoing().is_empty());
}

#[test]
fn test_snapshot_bank_switch_range() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    send_sysex(&mut surface, &[0xF0, 0x09, 0x08, 12, 0xF7]);
    assert_eq!(editor_frames(&mut surface), vec![nack()]);
    assert_eq!(surface.navigation().snapshot_bank, 0);

    send_sysex(&mut surface, &[0xF0, 0x09, 0x08, 5, 0xF7]);
    assert_eq!(editor_frames(&mut surface), vec![ack()]);
    assert_eq!(surface.navigation().snapshot_bank, 5);
}

#[test]
fn test_program_change_selects_preset_slot() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.router.set_control_port(0, 0);
    surface.subscribed = events::PRESET_SLOT;

    surface.handle_midi(midi_io(), &[0xC0, 40]);

    let nav = surface.navigation();
    assert_eq!((nav.preset_bank, nav.preset_slot), (3, 4));
    assert_eq!(nav.mode, Mode::Preset);
    assert_eq!(
        editor_frames(&mut surface),
        vec![vec![0xF0, 0x7E, 0x02, 3, 4, 0xF7]]
    );
    // empty slot: empty preset
    assert!(surface.controls().is_empty());
}

#[test]
fn test_bank_select_and_program_load_snapshot() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.router.set_control_port(1, 0);

    surface.handle_midi(midi_io(), &[0xB0, 74, 90]);
    surface.flush();
    surface.save_snapshot("proj", 2, 1, "Lead", 0xFF0000).unwrap();
    surface.handle_midi(midi_io(), &[0xB0, 74, 10]);
    surface.flush();
    assert_eq!(value_of(&surface, 1), 10);

    let control = MidiSource::new(Interface::MidiIo, 1);
    surface.handle_midi(control, &[0xB0, 0, 3]);
    assert_eq!(surface.navigation().mode, Mode::Snapshot);
    assert_eq!(surface.navigation().snapshot_bank, 2);

    surface.handle_midi(control, &[0xC0, 2]);
    surface.flush();
    assert_eq!(value_of(&surface, 1), 90);

    surface.handle_midi(control, &[0xB0, 0, 0]);
    assert_eq!(surface.navigation().mode, Mode::Preset);
}

#[test]
fn test_shared_address_values() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    surface.handle_midi(MidiSource::new(Interface::UsbDevice, 0), &[0xB0, 74, 100]);
    assert_eq!(surface.flush(), 1);
    assert_eq!(value_of(&surface, 1), 100);
    assert_eq!(value_of(&surface, 2), 100);
    assert_eq!(surface.controls().value(ValueRef::new(2, 0)).unwrap().label, "100");
    // MIDI input is not echoed
    assert!(surface.take_outgoing().is_empty());

    assert!(surface.set_control_value(ValueRef::new(2, 0), 64));
    surface.flush();
    assert_eq!(value_of(&surface, 1), 64);
    let out = surface.take_outgoing();
    assert_eq!(out.len(), 3);
    assert!(out.iter().all(|o| o.bytes == vec![0xB0, 74, 64] && o.target.port == 0));
}

#[test]
fn test_burst_is_flushed_once() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    for value in [10, 20, 30] {
        surface.set_control_value(ValueRef::new(1, 0), value);
    }
    assert_eq!(surface.tick(), 1);
    let out = surface.take_outgoing();
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].bytes, vec![0xB0, 74, 30]);
    assert_eq!(surface.tick(), 0);
}

#[test]
fn test_cc14_and_nrpn_input() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    surface.handle_midi(midi_io(), &[0xB0, 1, 0x40]);
    surface.handle_midi(midi_io(), &[0xB0, 33, 0x01]);

    for bytes in [[0xB0, 99, 2], [0xB0, 98, 44], [0xB0, 6, 0x10], [0xB0, 38, 0x05]] {
        surface.handle_midi(midi_io(), &bytes);
    }
    surface.flush();

    assert_eq!(value_of(&surface, 3), 8193);
    assert_eq!(value_of(&surface, 4), (0x10 << 7) | 0x05);

    // data increment on the selected parameter
    surface.handle_midi(midi_io(), &[0xB0, 96, 0]);
    surface.flush();
    assert_eq!(value_of(&surface, 4), ((0x10 << 7) | 0x05) + 1);
}

#[test]
fn test_relative_input() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    surface.handle_midi(midi_io(), &[0xB0, 20, 1]);
    surface.flush();
    assert_eq!(value_of(&surface, 5), 51);
    surface.handle_midi(midi_io(), &[0xB0, 20, 127]);
    surface.flush();
    assert_eq!(value_of(&surface, 5), 50);

    // several deltas within one tick accumulate
    surface.handle_midi(midi_io(), &[0xB0, 20, 1]);
    surface.handle_midi(midi_io(), &[0xB0, 20, 1]);
    assert_eq!(surface.flush(), 1);
    assert_eq!(value_of(&surface, 5), 52);
    assert!(surface.take_outgoing().is_empty());

    // local change is sent as a delta right away, and not again on flush
    surface.set_control_value(ValueRef::new(5, 0), 54);
    let out = surface.take_outgoing();
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].bytes, vec![0xB0, 20, 2]);
    surface.flush();
    assert_eq!(value_of(&surface, 5), 54);
    assert!(surface.take_outgoing().is_empty());
}

#[test]
fn test_virtual_values_share_an_address() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_surface_with(&dir, VIRTUAL_PRESET);

    assert!(surface.set_control_value(ValueRef::new(1, 0), 77));
    assert_eq!(surface.flush(), 1);
    assert_eq!(value_of(&surface, 1), 77);
    assert_eq!(value_of(&surface, 2), 77);
    assert_eq!(surface.controls().value(ValueRef::new(2, 0)).unwrap().label, "77");

    // virtual values never reach the wire
    assert!(surface.take_outgoing().is_empty());
}

#[test]
fn test_snapshot_keeps_virtual_and_relative_values() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_surface_with(&dir, VIRTUAL_PRESET);

    surface.set_control_value(ValueRef::new(1, 0), 77);
    surface.handle_midi(midi_io(), &[0xB0, 20, 1]);
    surface.flush();
    surface.save_snapshot("proj", 0, 0, "A", 0).unwrap();

    surface.set_control_value(ValueRef::new(2, 0), 10);
    surface.handle_midi(midi_io(), &[0xB0, 20, 1]);
    surface.flush();
    assert_eq!((value_of(&surface, 1), value_of(&surface, 3)), (10, 52));
    surface.take_outgoing();

    surface.load_snapshot("proj", 0, 0).unwrap();
    surface.flush();
    assert_eq!(value_of(&surface, 1), 77);
    assert_eq!(value_of(&surface, 2), 77);
    assert_eq!(value_of(&surface, 3), 51);
    assert!(surface.take_outgoing().is_empty());
}

#[test]
fn test_snapshot_save_and_load() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    surface.handle_midi(midi_io(), &[0xB0, 74, 100]);
    surface.flush();
    send_sysex(
        &mut surface,
        &frame(&[0x14, 0x06], r#"{"projectId":"proj","bankNumber":0,"slot":1,"name":"A","color":"00FF00"}"#),
    );
    assert_eq!(editor_frames(&mut surface), vec![ack()]);

    surface.handle_midi(midi_io(), &[0xB0, 74, 5]);
    surface.flush();
    surface.take_outgoing();

    send_sysex(
        &mut surface,
        &frame(&[0x09, 0x06], r#"{"projectId":"proj","bankNumber":0,"slot":1}"#),
    );
    let out = surface.take_outgoing();
    let restored: Vec<_> = out
        .iter()
        .filter(|o| o.target == midi_io() && o.bytes == vec![0xB0, 74, 100])
        .collect();
    assert_eq!(restored.len(), 1);
    assert_eq!(out.last().unwrap().bytes, ack());

    let key = WireKey::new(1, crate::codec::MessageKind::Cc7, 74);
    assert_eq!(surface.registry().get(&key).unwrap().origin(), Origin::File);

    // restored values reach the tree without being sent again
    surface.flush();
    assert_eq!(value_of(&surface, 1), 100);
    assert_eq!(value_of(&surface, 2), 100);
    assert!(surface.take_outgoing().is_empty());

    let record = surface.snapshot_store("proj").unwrap().info(0, 1).unwrap().unwrap();
    assert_eq!(record.name, "A");
    assert_eq!(record.color, 0x00FF00);
}

#[test]
fn test_snapshot_commands_require_project() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    send_sysex(&mut surface, &frame(&[0x09, 0x06], r#"{"bankNumber":0,"slot":1}"#));
    assert_eq!(editor_frames(&mut surface), vec![nack()]);

    // empty slot
    send_sysex(
        &mut surface,
        &frame(&[0x09, 0x06], r#"{"projectId":"proj","bankNumber":0,"slot":2}"#),
    );
    assert_eq!(editor_frames(&mut surface), vec![nack()]);
}

#[test]
fn test_swap_moves_into_empty_slot() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.save_snapshot("proj", 0, 0, "A", 0xFF0000).unwrap();

    send_sysex(
        &mut surface,
        &frame(
            &[0x06, 0x06],
            r#"{"projectId":"proj","sourceBankNumber":0,"sourceSlot":0,"destBankNumber":1,"destSlot":5}"#,
        ),
    );
    assert_eq!(editor_frames(&mut surface), vec![ack()]);

    let store = surface.snapshot_store("proj").unwrap();
    assert!(store.info(0, 0).unwrap().is_none());
    let moved = store.info(1, 5).unwrap().unwrap();
    assert_eq!((moved.bank_number, moved.slot, moved.name.as_str()), (1, 5, "A"));
}

#[test]
fn test_busy_storage_is_nacked() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.save_snapshot("proj", 0, 0, "A", 0).unwrap();

    let flag = surface.busy_flag().clone();
    let guard = flag.try_acquire().unwrap();
    let swap = frame(
        &[0x06, 0x06],
        r#"{"projectId":"proj","sourceBankNumber":0,"sourceSlot":0,"destBankNumber":0,"destSlot":1}"#,
    );
    send_sysex(&mut surface, &swap);
    assert_eq!(editor_frames(&mut surface), vec![nack()]);

    drop(guard);
    send_sysex(&mut surface, &swap);
    assert_eq!(editor_frames(&mut surface), vec![ack()]);
}

#[test]
fn test_unknown_and_malformed_commands() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    // foreign manufacturer sysex is dropped silently
    send_sysex(&mut surface, &[0xF0, 0x43, 0x10, 0x4C, 0xF7]);
    assert!(editor_frames(&mut surface).is_empty());

    // missing parameter byte
    send_sysex(&mut surface, &[0xF0, 0x09, 0x0A, 3, 0xF7]);
    assert_eq!(editor_frames(&mut surface), vec![nack()]);

    // fire and forget event, even when out of range
    send_sysex(&mut surface, &[0xF0, 0x7C, 0x08, 4, 0xF7]);
    send_sysex(&mut surface, &[0xF0, 0x7C, 0x08, 40, 0xF7]);
    assert!(editor_frames(&mut surface).is_empty());
    assert_eq!(surface.navigation().snapshot_bank, 4);
}

#[test]
fn test_preset_upload_in_chunks() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    send_sysex(&mut surface, &[0xF0, 0x14, 0x10, events::ALL, 0xF7]);
    assert_eq!(editor_frames(&mut surface), vec![ack()]);

    let upload = frame(&[0x01, 0x01], &PRESET.replace("\"Test\"", "\"Uploaded\""));
    let (first, rest) = upload.split_at(40);
    surface.handle_sysex(editor(), SysexChunk { data: first.to_vec(), complete: false });
    assert!(surface.take_outgoing().is_empty());
    surface.handle_sysex(editor(), SysexChunk { data: rest.to_vec(), complete: true });

    assert_eq!(
        editor_frames(&mut surface),
        vec![vec![0xF0, 0x7E, 0x02, 0, 0, 0xF7], ack()]
    );
    assert_eq!(surface.preset().name, "Uploaded");
    assert!(surface.library().load_preset(0, 0).unwrap().is_some());
}

#[test]
fn test_storage_commands_wait_for_upload() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.save_snapshot("proj", 0, 0, "A", 0).unwrap();

    let upload = frame(&[0x01, 0x01], PRESET);
    let (first, rest) = upload.split_at(60);
    surface.handle_sysex(editor(), SysexChunk { data: first.to_vec(), complete: false });
    assert!(surface.busy_flag().is_busy());

    let port0 = MidiSource::new(Interface::UsbDevice, 0);
    let swap = frame(
        &[0x06, 0x06],
        r#"{"projectId":"proj","sourceBankNumber":0,"sourceSlot":0,"destBankNumber":0,"destSlot":1}"#,
    );
    let replies_on = |surface: &mut Surface, target: MidiSource| -> Vec<Vec<u8>> {
        surface
            .take_outgoing()
            .into_iter()
            .filter(|o| o.target == target)
            .map(|o| o.bytes)
            .collect()
    };
    surface.handle_sysex(port0, SysexChunk { data: swap.clone(), complete: true });
    assert_eq!(replies_on(&mut surface, port0), vec![nack()]);

    surface.handle_sysex(editor(), SysexChunk { data: rest.to_vec(), complete: true });
    assert!(!surface.busy_flag().is_busy());
    assert_eq!(editor_frames(&mut surface), vec![ack()]);

    surface.handle_sysex(port0, SysexChunk { data: swap, complete: true });
    assert_eq!(replies_on(&mut surface, port0), vec![ack()]);
}

#[test]
fn test_overflowing_upload_releases_storage() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    surface.handle_sysex(editor(), SysexChunk { data: vec![0xF0, 0x01, 0x01, b'{'], complete: false });
    assert!(surface.busy_flag().is_busy());

    let filler = vec![b' '; crate::sysex::MAX_SYSEX_SIZE];
    surface.handle_sysex(editor(), SysexChunk { data: filler, complete: false });
    assert!(!surface.busy_flag().is_busy());
}

#[test]
fn test_invalid_preset_upload_is_nacked() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    send_sysex(&mut surface, &frame(&[0x01, 0x01], r#"{"devices":[{"id":1,"channel":17}]}"#));
    assert_eq!(editor_frames(&mut surface), vec![nack()]);
    assert_eq!(surface.preset().name, "Test");
    assert!(surface.library().load_preset(0, 0).unwrap().is_none());
}

#[test]
fn test_config_upload_is_pending() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    send_sysex(&mut surface, &frame(&[0x01, 0x02], r#"{"tick_ms":5}"#));
    assert_eq!(editor_frames(&mut surface), vec![ack()]);
    let pending = surface.library().take_pending_config().unwrap().unwrap();
    assert_eq!(pending, br#"{"tick_ms":5}"#);

    send_sysex(&mut surface, &frame(&[0x01, 0x02], "not json"));
    assert_eq!(editor_frames(&mut surface), vec![nack()]);
}

#[test]
fn test_snapshot_list_request() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.save_snapshot("proj", 3, 7, "Pad", 0x0000FF).unwrap();

    send_sysex(&mut surface, &frame(&[0x02, 0x05], r#"{"projectId":"proj"}"#));
    let frames = editor_frames(&mut surface);
    assert!(!frames.is_empty());

    let mut payload = Vec::new();
    for f in &frames {
        assert_eq!(&f[..3], &[0xF0, 0x01, 0x05]);
        payload.extend_from_slice(&f[3..f.len() - 1]);
    }
    let list: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(list["projectId"], "proj");
    assert_eq!(list["snapshots"][0]["bankNumber"], 3);
    assert_eq!(list["snapshots"][0]["color"], "0000FF");
}

#[test]
fn test_snapshot_request_is_7bit_packed() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.handle_midi(midi_io(), &[0xB0, 74, 100]);
    surface.flush();
    surface.save_snapshot("proj", 0, 0, "A", 0).unwrap();
    let stored = surface.snapshot_store("proj").unwrap().load(0, 0).unwrap();

    send_sysex(&mut surface, &frame(&[0x02, 0x06], r#"{"projectId":"proj","bankNumber":0,"slot":0}"#));
    let frames = editor_frames(&mut surface);
    let mut packed = Vec::new();
    for f in &frames {
        packed.extend_from_slice(&f[3..f.len() - 1]);
    }
    assert_eq!(crate::sysex::reply::unpack_7bit(&packed), stored);
}

#[test]
fn test_midi_learn_reports_input() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    send_sysex(&mut surface, &[0xF0, 0x03, 0x11, 1, 0xF7]);
    assert_eq!(editor_frames(&mut surface), vec![ack()]);
    assert!(surface.midi_learn());

    surface.handle_midi(midi_io(), &[0xB1, 7, 99]);
    assert_eq!(
        editor_frames(&mut surface),
        vec![vec![0xF0, 0x7E, 0x07, 0, 1, 2, 7, 0, 99, 0, 0xF7]]
    );

    send_sysex(&mut surface, &[0xF0, 0x03, 0x11, 0, 0xF7]);
    surface.take_outgoing();
    surface.handle_midi(midi_io(), &[0xB1, 7, 99]);
    assert!(editor_frames(&mut surface).is_empty());
}

#[test]
fn test_update_commands() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    send_sysex(&mut surface, &[0xF0, 0x14, 0x0F, 1, 10, 0xF7]);
    send_sysex(&mut surface, &frame(&[0x14, 0x0D, 1, 0], r#"{"name":"Res","color":"f45c51","visible":false}"#));
    send_sysex(&mut surface, &frame(&[0x15, 0x0E, 3, 0, 0], r#"{"text":"-12 dB"}"#));
    assert_eq!(editor_frames(&mut surface), vec![ack(), ack(), ack()]);

    let control_port = surface.router().control_port().unwrap();
    assert_eq!((control_port.port, control_port.channel), (1, 10));

    let control = surface.controls().get(1).unwrap();
    assert_eq!(control.name, "Res");
    assert_eq!(control.color, "F45C51");
    assert!(!control.visible);
    assert_eq!(surface.controls().value(ValueRef::new(3, 0)).unwrap().label, "-12 dB");

    // out of range port, unknown control
    send_sysex(&mut surface, &[0xF0, 0x14, 0x0F, 3, 0, 0xF7]);
    send_sysex(&mut surface, &frame(&[0x14, 0x0D, 0x7F, 0x7F], "{}"));
    assert_eq!(editor_frames(&mut surface), vec![nack(), nack()]);
}

#[test]
fn test_system_call() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);

    send_sysex(&mut surface, &[0xF0, 0x7F, 0x12, 0xF7]);
    assert_eq!(editor_frames(&mut surface), vec![ack()]);
    assert_eq!(surface.take_system_call(), Some(SystemCall::Reboot));
    assert_eq!(surface.take_system_call(), None);
}

#[test]
fn test_midi_control_bindings() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.midi_control = MidiControl::new(vec![
        MidiControlBinding {
            event: ControlEvent::PageNext,
            kind: BindingKind::Note,
            number: 47,
            target: None,
        },
        MidiControlBinding {
            event: ControlEvent::PageAndControlSet,
            kind: BindingKind::Cc,
            number: 20,
            target: None,
        },
    ]);
    surface.router.set_control_port(0, 16);
    surface.subscribed = events::PAGE | events::CONTROL_SET;

    surface.handle_midi(midi_io(), &[0x9F, 47, 127]);
    assert_eq!(surface.navigation().page, 1);
    assert_eq!(editor_frames(&mut surface), vec![vec![0xF0, 0x7E, 0x05, 1, 0xF7]]);

    surface.handle_midi(midi_io(), &[0xBF, 20, 14]);
    assert_eq!(surface.navigation().page, 2);
    assert_eq!(surface.navigation().control_set, 1);

    // same controller on another channel is parameter data
    surface.take_outgoing();
    surface.handle_midi(midi_io(), &[0xB0, 20, 1]);
    assert_eq!(surface.navigation().page, 2);
    assert_eq!(value_of(&surface, 5), 51);
}

#[test]
fn test_router_forwards_raw_bytes() {
    let dir = TempDir::new().unwrap();
    let mut surface = make_test_surface(&dir);
    surface.router = MidiRouter::new(RouterConfig {
        usb_dev_to_midi_io: true,
        ..RouterConfig::isolated()
    });

    surface.handle_midi(MidiSource::new(Interface::UsbDevice, 1), &[0x92, 60, 100]);
    let out = surface.take_outgoing();
    assert_eq!(
        out,
        vec![Outgoing {
            target: MidiSource::new(Interface::MidiIo, 1),
            bytes: vec![0x92, 60, 100],
        }]
    );
}
