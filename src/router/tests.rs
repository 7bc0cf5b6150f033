//! Tests for Router module

use super::*;

const CC: [u8; 3] = [0xB0, 7, 100];

fn make_test_router(config: RouterConfig) -> MidiRouter {
    MidiRouter::new(config)
}

fn usb_dev(port: u8) -> MidiSource {
    MidiSource::new(Interface::UsbDevice, port)
}

#[test]
fn test_usb_device_to_midi_io_only() {
    let router = make_test_router(RouterConfig {
        usb_dev_to_midi_io: true,
        ..RouterConfig::isolated()
    });

    let route = router.route(usb_dev(0), &CC);
    assert_eq!(route.forward, vec![Interface::MidiIo]);
    assert_eq!(route.delivery, Delivery::Local);

    // other sources have no enabled link
    let route = router.route(MidiSource::new(Interface::MidiIo, 0), &CC);
    assert!(route.forward.is_empty());
    assert_eq!(route.delivery, Delivery::Local);
}

#[test]
fn test_control_port_messages_are_emitted_nowhere() {
    let mut router = make_test_router(RouterConfig::default());
    router.set_control_port(1, 0);

    for interface in Interface::ALL {
        let route = router.route(MidiSource::new(interface, 1), &CC);
        assert!(route.forward.is_empty(), "forwarded from {}", interface);
        assert_eq!(route.delivery, Delivery::Control);
    }

    // other ports are untouched
    let route = router.route(usb_dev(0), &CC);
    assert_eq!(route.delivery, Delivery::Local);
    assert_eq!(route.forward.len(), 2);
}

#[test]
fn test_control_channel_filter() {
    let mut router = make_test_router(RouterConfig::default());
    router.set_control_port(0, 16);

    assert_eq!(router.route(usb_dev(0), &[0xBF, 0, 1]).delivery, Delivery::Control);
    assert_eq!(router.route(usb_dev(0), &[0xB0, 0, 1]).delivery, Delivery::Local);
}

#[test]
fn test_thru_echoes_on_source_interface() {
    let router = make_test_router(RouterConfig {
        midi_io_thru: true,
        ..RouterConfig::default()
    });

    let route = router.route(MidiSource::new(Interface::MidiIo, 0), &CC);
    assert_eq!(
        route.forward,
        vec![Interface::UsbDevice, Interface::UsbHost, Interface::MidiIo]
    );

    // at most two emissions without thru
    let route = router.route(MidiSource::new(Interface::UsbHost, 0), &CC);
    assert_eq!(route.forward, vec![Interface::UsbDevice, Interface::MidiIo]);
}

#[test]
fn test_ctrl_port_is_never_forwarded() {
    let router = make_test_router(RouterConfig::default());

    let route = router.route(usb_dev(CTRL_PORT), &CC);
    assert!(route.forward.is_empty());
    assert_eq!(route.delivery, Delivery::Drop);

    let chunk = SysexChunk {
        data: vec![0xF0, 0x09, 0x08, 5, 0xF7],
        complete: true,
    };
    let route = router.route_sysex(usb_dev(CTRL_PORT), &chunk);
    assert!(route.forward.is_empty());
    assert_eq!(route.delivery, Delivery::Local);
}

#[test]
fn test_ctrl_port_as_control_port() {
    let mut router = make_test_router(RouterConfig::default());
    router.set_control_port(CTRL_PORT, 0);

    let route = router.route(usb_dev(CTRL_PORT), &[0xC0, 40]);
    assert!(route.forward.is_empty());
    assert_eq!(route.delivery, Delivery::Control);
}

#[test]
fn test_sysex_chunks_follow_the_matrix() {
    let router = make_test_router(RouterConfig {
        midi_io_to_usb_host: true,
        ..RouterConfig::isolated()
    });

    let first = SysexChunk {
        data: vec![0xF0, 0x43, 0x10],
        complete: false,
    };
    let route = router.route_sysex(MidiSource::new(Interface::MidiIo, 0), &first);
    assert_eq!(route.forward, vec![Interface::UsbHost]);
    assert_eq!(route.delivery, Delivery::Drop);

    let route = router.route_sysex(usb_dev(0), &first);
    assert!(route.forward.is_empty());
    assert_eq!(route.delivery, Delivery::Local);
}

#[test]
fn test_config_validation() {
    let mut config = RouterConfig::default();
    assert!(config.validate().is_ok());

    config.control_port = Some(ControlPort { port: 3, channel: 0 });
    assert!(config.validate().is_err());

    config.control_port = Some(ControlPort { port: 2, channel: 17 });
    assert!(config.validate().is_err());
}

#[test]
fn test_config_yaml_defaults() {
    let config: RouterConfig = serde_yaml::from_str("midi_io_thru: true\n").unwrap();
    assert!(config.midi_io_thru);
    assert!(config.usb_dev_to_midi_io);
    assert_eq!(config.control_port, None);

    let config: RouterConfig =
        serde_yaml::from_str("control_port:\n  port: 1\n").unwrap();
    assert_eq!(config.control_port, Some(ControlPort { port: 1, channel: 0 }));
}
