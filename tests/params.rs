//! Typed parameter extraction scenarios, driven the way a command consumer
//! would use the parser.

use std::net::Ipv4Addr;
use std::sync::Arc;

use gcode_ingest::{
    ExpressionValue, MachineState, ObjectModel, ParseErrorKind, Parser, ParserConfig,
};

struct PrinterModel;

impl ObjectModel for PrinterModel {
    fn lookup(&self, name: &str) -> Option<ExpressionValue> {
        match name {
            "tools.standby" => Some(ExpressionValue::Int(160)),
            "network.hostname" => Some(ExpressionValue::Str("voron".to_string())),
            _ => None,
        }
    }
}

fn decode(line: &str) -> (Parser, MachineState) {
    let mut parser =
        Parser::new(ParserConfig::default()).with_object_model(Arc::new(PrinterModel));
    let mut machine = MachineState::new();
    assert!(parser.put_bytes(line.as_bytes(), &mut machine).unwrap());
    (parser, machine)
}

#[test]
fn test_float_array_of_four() {
    let (mut parser, _) = decode("G1 X1:2:3:4");
    assert!(parser.seen('X'));
    let values = parser.get_float_array(4, false).unwrap();
    assert_eq!(values, [1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_single_value_pads_to_requested_length() {
    let (mut parser, _) = decode("G1 X5");
    assert!(parser.seen('X'));
    let values = parser.get_float_array(4, true).unwrap();
    assert_eq!(values, [5.0, 5.0, 5.0, 5.0]);
}

#[test]
fn test_wifi_credentials_with_escaped_quote() {
    let (mut parser, _) = decode("M587 S\"My SSID\" P\"pa\"\"ss\"");
    assert!(parser.seen('S'));
    assert_eq!(parser.get_quoted_string().unwrap(), "My SSID");
    assert!(parser.seen('P'));
    assert_eq!(parser.get_quoted_string().unwrap(), "pa\"ss");
}

#[test]
fn test_quoted_hex_network_parameter() {
    let (mut parser, _) = decode("M552 P\"0xC0A80101\"");
    assert!(parser.seen('P'));
    assert_eq!(parser.get_ui_value().unwrap(), 0xC0A8_0101);
}

#[test]
fn test_mac_address_sextet() {
    let (mut parser, _) = decode("M540 P11:22:33:44:55:66");
    assert!(parser.seen('P'));
    assert_eq!(
        parser.get_mac_address().unwrap(),
        [0x11, 0x22, 0x33, 0x44, 0x55, 0x66]
    );
}

#[test]
fn test_ip_address_parameter() {
    let (mut parser, _) = decode("M552 P192.168.1.101");
    assert!(parser.seen('P'));
    assert_eq!(
        parser.get_ip_address().unwrap(),
        Ipv4Addr::new(192, 168, 1, 101)
    );
}

#[test]
fn test_expression_parameters_resolve_through_model() {
    let (mut parser, _) = decode("M104 S{tools.standby}");
    assert!(parser.seen('S'));
    assert_eq!(parser.get_i_value().unwrap(), 160);

    let (mut parser, _) = decode("M550 P{network.hostname}");
    assert!(parser.seen('P'));
    assert_eq!(parser.get_quoted_string().unwrap(), "voron");
}

#[test]
fn test_filename_after_m23() {
    let (mut parser, _) = decode("M23 prints/benchy v2.gcode");
    assert_eq!(
        parser.get_unprecedented_string(false).unwrap(),
        "prints/benchy v2.gcode"
    );
}

#[test]
fn test_mixed_parameter_line() {
    let (mut parser, _) = decode("M569 P0 S1 T2.5:2.5:5:0");
    assert!(parser.seen('P'));
    assert_eq!(parser.get_ui_value().unwrap(), 0);
    assert!(parser.seen('S'));
    assert_eq!(parser.get_i_value().unwrap(), 1);
    assert!(parser.seen('T'));
    assert_eq!(
        parser.get_float_array(4, false).unwrap(),
        [2.5, 2.5, 5.0, 0.0]
    );
}

#[test]
fn test_seen_does_not_match_inside_strings() {
    let (mut parser, _) = decode("M117 \"X marks the spot\"");
    assert!(!parser.seen('X'));
}

#[test]
fn test_errors_carry_column_offsets() {
    let (mut parser, _) = decode("M587 Splain");
    assert!(parser.seen('S'));
    let e = parser.get_quoted_string().unwrap_err();
    assert!(matches!(e.kind, ParseErrorKind::StringExpected));
    // The column points at the offending byte, past "M587 S".
    assert_eq!(e.column, 6);
}
