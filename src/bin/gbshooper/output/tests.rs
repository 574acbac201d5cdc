use std::path::PathBuf;

use gbshooper::api::{ErrorKind, Status};
use gbshooper::cart;
use gbshooper::operation::{Memory, Operation};
use gbshooper::serial::FlasherPort;

use super::human::HumanOutput;
use super::json::event_to_json;
use super::{format_port_line, Event};

fn port(name: &str) -> FlasherPort {
    FlasherPort {
        port_name: name.to_string(),
        vid: 0x0403,
        pid: 0x6001,
        serial_number: Some("A50285BI".to_string()),
        manufacturer: Some("ladecadence.net".to_string()),
        product: Some("GB Flasher".to_string()),
    }
}

#[test]
fn json_event_has_schema_and_event() {
    let ev = event_to_json(Event::Progress {
        operation: Operation::WriteFlash,
        percent: 42,
    });
    let v = serde_json::to_value(&ev).unwrap();
    assert_eq!(v.get("schema").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(v.get("event").and_then(|v| v.as_str()), Some("progress"));
    assert_eq!(v.get("operation").and_then(|v| v.as_str()), Some("write_flash"));
    assert_eq!(v.get("percent").and_then(|v| v.as_u64()), Some(42));
}

#[test]
fn json_status_nests_result() {
    let ev = event_to_json(Event::Status(Status {
        device_id: 0x17,
        major: 0,
        minor: 2,
    }));
    let v = serde_json::to_value(&ev).unwrap();
    assert_eq!(v["event"], "status");
    assert_eq!(v["result"]["device_id"], 0x17);
    assert_eq!(v["result"]["minor"], 2);
}

#[test]
fn json_error_carries_kind() {
    let ev = event_to_json(Event::Error {
        code: 14,
        kind: Some(ErrorKind::BadChecksum),
        message: "bad checksum".to_string(),
    });
    let v = serde_json::to_value(&ev).unwrap();
    assert_eq!(v["code"], 14);
    assert_eq!(v["kind"], "bad_checksum");
}

#[test]
fn json_transfer_and_erase() {
    let v = serde_json::to_value(event_to_json(Event::Transferred {
        operation: Operation::ReadRam,
        path: PathBuf::from("save.sav"),
        bytes: 8192,
    }))
    .unwrap();
    assert_eq!(v["event"], "done");
    assert_eq!(v["path"], "save.sav");
    assert_eq!(v["bytes"], 8192);

    let v = serde_json::to_value(event_to_json(Event::Erased {
        memory: Memory::Ram,
    }))
    .unwrap();
    assert_eq!(v["memory"], "ram");
}

#[test]
fn list_json_indexes_devices() {
    let v = serde_json::to_value(event_to_json(Event::ListDevices(vec![
        port("/dev/ttyUSB0"),
        port("/dev/ttyUSB1"),
    ])))
    .unwrap();
    assert_eq!(v["count"], 2);
    assert_eq!(v["devices"][1]["index"], 1);
    assert_eq!(v["devices"][1]["port_name"], "/dev/ttyUSB1");
}

#[test]
fn port_line_shows_usb_ids() {
    let line = format_port_line(0, &port("/dev/ttyUSB0"));
    assert_eq!(line, "[0] /dev/ttyUSB0 0403:6001 A50285BI");
}

#[test]
fn header_lines_name_codes() {
    let header = gbshooper::api::RomHeader {
        title: "TESTGAME".to_string(),
        title_bytes: *b"TESTGAME\0\0\0\0\0\0\0\0",
        cart: cart::cart_type(0x13),
        rom: cart::rom_size(0x02),
        ram: cart::ram_size(0x02),
    };
    let lines = HumanOutput::header_lines(&header);
    assert_eq!(lines[0], "title: TESTGAME");
    assert!(lines[1].contains("ROM+MBC3+RAM+BATT (0x13)"));
    assert_eq!(lines[2], "ROM size: 128KB");
    assert_eq!(lines[3], "RAM size: 8KB");
}
