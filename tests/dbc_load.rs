//! End-to-end scenarios: DBC text → loaded bus → payload/signal round trips.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use can_db::dbc::parse::{from_file, load_dbc};
use can_db::types::signal::{ByteOrder, ValueType};
use can_db::{BusEvent, BusRegistry};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load(content: &str) -> (BusRegistry, String) {
    init_tracing();
    let mut file = tempfile::Builder::new()
        .suffix(".dbc")
        .tempfile()
        .expect("temp file");
    file.write_all(content.as_bytes()).expect("write dbc");

    let mut registry = BusRegistry::new();
    let name = from_file(&mut registry, file.path().to_str().unwrap()).expect("load dbc");
    (registry, name)
}

const STEERING_DBC: &str = r#"
VERSION "1.0"

BU_: NEO EPAS

BO_ 1160 DAS_steeringCmd: 8 NEO
 SG_ DAS_steeringAngle : 16|14@0- (0.1,-1638.35) [-1638.35|1638.35] "deg" EPAS
"#;

#[test]
fn steering_dbc_builds_the_expected_signal() {
    let (registry, name) = load(STEERING_DBC);
    let bus = registry.get_bus(&name).unwrap();

    let msg = bus.get_message_by_id(1160).unwrap();
    assert_eq!(msg.name, "DAS_steeringCmd");
    assert_eq!(msg.byte_length, 8);
    assert_eq!(msg.transmitter, "NEO");

    let msg_key = bus.get_msg_key_by_id(1160).unwrap();
    let sig_key = bus.get_signal(msg_key, "DAS_steeringAngle").unwrap();
    let sig = bus.get_sig_by_key(sig_key).unwrap();
    assert_eq!(sig.start_bit, 16);
    assert_eq!(sig.bit_length, 14);
    assert_eq!(sig.byte_order, ByteOrder::Motorola);
    assert_eq!(sig.value_type, ValueType::Signed);
    assert_eq!(sig.factor, 0.1);
    assert_eq!(sig.offset, -1638.35);
}

#[test]
fn steering_payload_decodes_through_the_motorola_translation() {
    let (mut registry, name) = load(STEERING_DBC);
    let bus = registry.get_bus_mut(&name).unwrap();
    let msg_key = bus.get_msg_key_by_id(1160).unwrap();
    let sig_key = bus.get_signal(msg_key, "DAS_steeringAngle").unwrap();

    // field bits: byte2 bit0 (MSB), byte3 bits 7..0, byte4 bits 7..3
    bus.set_message_data(msg_key, &[0x00, 0x00, 0x00, 0xFF, 0xF8, 0, 0, 0])
        .unwrap();
    let sig = bus.get_sig_by_key(sig_key).unwrap();
    assert_eq!(sig.raw_value, 8191);
    assert!((sig.physical_value - (819.1 - 1638.35)).abs() < 1e-3);

    // sign bit set → sign extension
    bus.set_message_data(msg_key, &[0x00, 0x00, 0x7F, 0xFF, 0xF8, 0, 0, 0])
        .unwrap();
    let sig = bus.get_sig_by_key(sig_key).unwrap();
    assert_eq!(sig.raw_value as i64, -1);
    assert!((sig.physical_value - (-0.1 - 1638.35)).abs() < 1e-3);
}

#[test]
fn set_physical_packs_and_notifies_once() {
    let (mut registry, name) = load(STEERING_DBC);
    let bus = registry.get_bus_mut(&name).unwrap();
    let msg_key = bus.get_msg_key_by_id(1160).unwrap();
    let sig_key = bus.get_signal(msg_key, "DAS_steeringAngle").unwrap();

    let message_updates: Rc<RefCell<usize>> = Rc::default();
    let sink = Rc::clone(&message_updates);
    bus.subscribe(move |ev| {
        if matches!(ev, BusEvent::MessageUpdated { .. }) {
            *sink.borrow_mut() += 1;
        }
    });

    bus.set_signal_physical(sig_key, 10.0).unwrap();
    assert_eq!(*message_updates.borrow(), 1);

    // raw = round((10 - (-1638.35)) / 0.1)
    let sig = bus.get_sig_by_key(sig_key).unwrap();
    assert_eq!(sig.raw_value, 16483);

    // the packed field carries the raw clamped to 14 bits
    let data = bus.get_message_by_id(1160).unwrap().get_data().to_vec();
    let extracted =
        can_db::codec::extract(&data, 16, 14, ByteOrder::Motorola).unwrap();
    assert_eq!(extracted, 16483 & 0x3FFF);
}

#[test]
fn extended_id_can_fd_message() {
    let (registry, name) = load(
        "BU_: GW\n\nBO_ 305419896 FdFrame: 16 GW\n SG_ Counter : 0|8@1+ (1,0) [0|255] \"\" GW\n",
    );
    let bus = registry.get_bus(&name).unwrap();

    let msg = bus.get_message_by_id(0x12345678).unwrap();
    assert_eq!(msg.byte_length, 16);
    assert_eq!(msg.get_data(), &[0u8; 16]);
    assert_eq!(bus.iter_messages().count(), 1);
}

#[test]
fn duplicate_message_lines_keep_the_first() {
    let (registry, name) = load(
        "BU_: X\n\nBO_ 42 A: 8 X\n SG_ S1 : 0|8@1+ (1,0) [0|255] \"\" X\nBO_ 42 B: 8 X\n",
    );
    let bus = registry.get_bus(&name).unwrap();
    assert_eq!(bus.iter_messages().count(), 1);
    assert_eq!(bus.get_message_by_id(42).unwrap().name, "A");
}

#[test]
fn signal_before_any_message_is_ignored() {
    let (registry, name) = load(
        " SG_ Early : 0|8@1+ (1,0) [0|255] \"\" X\nBU_: X\nBO_ 42 A: 8 X\n",
    );
    let bus = registry.get_bus(&name).unwrap();
    assert_eq!(bus.iter_messages().count(), 1);
    assert!(bus.get_message_by_id(42).unwrap().signals.is_empty());
}

#[test]
fn additional_transmitters_and_value_types_resolve() {
    let (registry, name) = load(
        r#"
BU_: ECM GW TCM

BO_ 256 EngineData: 8 ECM
 SG_ Temperature : 0|32@1+ (1,0) [0|100] "degC" GW
 SG_ Counter : 32|8@1+ (1,0) [0|255] "" GW

BO_TX_BU_ 256 : GW, TCM;
BO_TX_BU_ 999 : GW;
SIG_VALTYPE_ 256 Temperature : 1;
SIG_VALTYPE_ 256 Missing : 2;
"#,
    );
    let bus = registry.get_bus(&name).unwrap();

    let msg = bus.get_message_by_id(256).unwrap();
    assert_eq!(
        msg.additional_transmitters,
        vec!["GW".to_string(), "TCM".to_string()]
    );

    let msg_key = bus.get_msg_key_by_id(256).unwrap();
    let temp = bus
        .get_sig_by_key(bus.get_signal(msg_key, "Temperature").unwrap())
        .unwrap();
    assert_eq!(temp.value_type, ValueType::IeeeFloat);
    let counter = bus
        .get_sig_by_key(bus.get_signal(msg_key, "Counter").unwrap())
        .unwrap();
    assert_eq!(counter.value_type, ValueType::Unsigned);
}

#[test]
fn comments_and_cycle_times_are_ingested() {
    let (registry, name) = load(
        r#"
BU_: ECM GW

BO_ 100 Status: 8 ECM
 SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" GW

CM_ "Body network";
CM_ BU_ ECM "Engine controller";
CM_ BO_ 100 "Periodic status
frame";
CM_ SG_ 100 Speed "Vehicle speed";
BA_ "GenMsgCycleTime" BO_ 100 50;
BA_ "GenMsgSendType" BO_ 100 0;
VAL_ 100 Speed 0 "standstill";
"#,
    );
    let bus = registry.get_bus(&name).unwrap();
    assert_eq!(bus.comment, "Body network");

    let node = bus.iter_nodes().find(|n| n.name == "ECM").unwrap();
    assert_eq!(node.comment, "Engine controller");

    let msg = bus.get_message_by_id(100).unwrap();
    assert_eq!(msg.comment, "Periodic status\nframe");
    assert_eq!(msg.cycle_ms, 50.0);

    let msg_key = bus.get_msg_key_by_id(100).unwrap();
    let sig = bus
        .get_sig_by_key(bus.get_signal(msg_key, "Speed").unwrap())
        .unwrap();
    assert_eq!(sig.comment, "Vehicle speed");
}

#[test]
fn ieee_float_payload_decodes_without_scaling() {
    let (mut registry, name) = load(
        "BU_: ECM\n\nBO_ 256 M: 8 ECM\n SG_ Temp : 0|32@1+ (0.5,10) [0|100] \"degC\" ECM\nSIG_VALTYPE_ 256 Temp : 1;\n",
    );
    let bus = registry.get_bus_mut(&name).unwrap();
    let msg_key = bus.get_msg_key_by_id(256).unwrap();
    let sig_key = bus.get_signal(msg_key, "Temp").unwrap();

    let mut payload = [0u8; 8];
    payload[..4].copy_from_slice(&36.5f32.to_bits().to_le_bytes());
    bus.set_message_data(msg_key, &payload).unwrap();

    let sig = bus.get_sig_by_key(sig_key).unwrap();
    assert_eq!(sig.physical_value, 36.5);
}

#[test]
fn set_data_of_own_data_is_stable() {
    let (mut registry, name) = load(
        r#"
BU_: ECM

BO_ 100 Mixed: 8 ECM
 SG_ A : 0|12@1+ (1,0) [0|4095] "" ECM
 SG_ B : 12|4@1- (1,0) [-8|7] "" ECM
 SG_ C : 23|16@0+ (1,0) [0|65535] "" ECM
"#,
    );
    let bus = registry.get_bus_mut(&name).unwrap();
    let msg_key = bus.get_msg_key_by_id(100).unwrap();

    bus.set_message_data(msg_key, &[0x12, 0xF4, 0x56, 0x78, 0x9A, 0, 0, 0])
        .unwrap();
    let snapshot = |bus: &can_db::CanBus| -> Vec<(String, u64)> {
        let msg = bus.get_message_by_id(100).unwrap();
        bus.iter_signals_of(msg)
            .map(|s| (s.name.clone(), s.raw_value))
            .collect()
    };
    let raws = snapshot(bus);
    assert_eq!(raws.len(), 3);

    let data = bus.get_message_by_id(100).unwrap().get_data().to_vec();
    bus.set_message_data(msg_key, &data).unwrap();
    assert_eq!(snapshot(bus), raws);
}

#[test]
fn signed_round_trip_within_field_width() {
    let (mut registry, name) = load(
        "BU_: ECM\n\nBO_ 7 M: 8 ECM\n SG_ S : 8|10@1- (1,0) [-512|511] \"\" ECM\n",
    );
    let bus = registry.get_bus_mut(&name).unwrap();
    let msg_key = bus.get_msg_key_by_id(7).unwrap();
    let sig_key = bus.get_signal(msg_key, "S").unwrap();

    for raw in [-512i64, -1, 0, 1, 511] {
        bus.set_signal_raw(sig_key, raw as u64).unwrap();
        let data = bus.get_message_by_id(7).unwrap().get_data().to_vec();
        bus.set_message_data(msg_key, &data).unwrap();
        assert_eq!(
            bus.get_sig_by_key(sig_key).unwrap().raw_value as i64,
            raw,
            "raw {raw} must survive the payload round trip"
        );
    }
}

#[test]
fn load_dbc_reports_success() {
    let mut file = tempfile::Builder::new().suffix(".dbc").tempfile().unwrap();
    file.write_all(b"BU_: ECM\n").unwrap();
    let mut registry = BusRegistry::new();
    assert!(load_dbc(&mut registry, file.path().to_str().unwrap()));
    assert_eq!(registry.iter_buses().count(), 1);
}
