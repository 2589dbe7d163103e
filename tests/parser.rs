//! End-to-end ingest and decode tests against a serial-style byte stream.

use gcode_ingest::{MachineState, MemoryFile, Parser, ParserConfig};

fn feed(parser: &mut Parser, machine: &mut MachineState, text: &str) -> bool {
    let mut ready = false;
    for &b in text.as_bytes() {
        ready = parser.put(b, machine).unwrap();
        if ready {
            break;
        }
    }
    ready
}

#[test]
fn test_full_line_with_checksum_and_parameters() {
    let line = "N10 G1 X20.5 Y-3 E1.2";
    let checksum = line.bytes().fold(0u8, |a, b| a ^ b);

    let mut parser = Parser::new(ParserConfig::default());
    let mut machine = MachineState::new();
    assert!(feed(
        &mut parser,
        &mut machine,
        &format!("{line}*{checksum}\n")
    ));

    assert_eq!(parser.command_letter(), 'G');
    assert!(parser.has_command_number());
    assert_eq!(parser.command_number(), 1);
    assert_eq!(parser.command_fraction(), None);
    assert_eq!(machine.line_number, 10);

    assert!(parser.seen('X'));
    assert_eq!(parser.get_f_value().unwrap(), 20.5);
    assert!(parser.seen('E'));
    assert_eq!(parser.get_f_value().unwrap(), 1.2);
    assert!(parser.seen('Y'));
    assert_eq!(parser.get_f_value().unwrap(), -3.0);

    parser.set_finished(&mut machine);
    assert!(!parser.is_ready());
}

#[test]
fn test_checksum_property_for_arbitrary_lines() {
    let lines = ["G28", "M140 S60", "G1 X1 Y2 Z3 E4 F1500", "T0"];
    let mut parser = Parser::new(ParserConfig::default());
    let mut machine = MachineState::new();
    for (i, line) in lines.iter().enumerate() {
        let numbered = format!("N{} {line}", i + 1);
        let checksum = numbered.bytes().fold(0u8, |a, b| a ^ b);
        assert!(
            feed(&mut parser, &mut machine, &format!("{numbered}*{checksum}\n")),
            "{numbered}"
        );
        assert_eq!(machine.line_number, (i + 1) as u32);
        parser.set_finished(&mut machine);
    }
}

#[test]
fn test_bad_checksum_requests_resend() {
    let mut parser = Parser::new(ParserConfig::default());
    let mut machine = MachineState::new();
    assert!(feed(&mut parser, &mut machine, "N5 G1 X1*99\n"));
    assert_eq!(parser.command_letter(), 'M');
    assert_eq!(parser.command_number(), 998);
    assert!(parser.seen('P'));
    assert_eq!(parser.get_i_value().unwrap(), 5);

    let mut full = String::new();
    parser.append_full_command(&mut full);
    assert_eq!(full, "M998 P5");
}

#[test]
fn test_set_finished_traverses_sub_commands() {
    let mut parser = Parser::new(ParserConfig::default());
    let mut machine = MachineState::new();
    assert!(parser
        .put_bytes(b"G91 G1 Z5 F200 M400", &mut machine)
        .unwrap());

    let mut printed = Vec::new();
    printed.push(parser.print_command());
    parser.set_finished(&mut machine);
    while parser.is_ready() {
        printed.push(parser.print_command());
        parser.set_finished(&mut machine);
    }
    assert_eq!(printed, ["G91", "G1", "M400"]);
}

#[test]
fn test_g53_cleared_when_line_finishes() {
    let mut parser = Parser::new(ParserConfig::default());
    let mut machine = MachineState::new();
    machine.g53_active = true;

    assert!(parser.put_bytes(b"G53 G1 X10", &mut machine).unwrap());
    parser.set_finished(&mut machine);
    // Second sub-command still on the same line.
    assert!(machine.g53_active);
    assert!(parser.is_ready());
    parser.set_finished(&mut machine);
    assert!(!machine.g53_active);
}

#[test]
fn test_file_position_reflects_command_start() {
    let mut parser = Parser::new(ParserConfig::default());
    let mut machine =
        MachineState::with_file(Box::new(MemoryFile::new(b"G28 G1 X5\nM400\n".to_vec())));

    // No command yet: drive bytes through by hand.
    let mut offsets = Vec::new();
    loop {
        let b = match machine.read_file_byte().unwrap() {
            Some(b) => b,
            None => break,
        };
        if parser.put(b, &mut machine).unwrap() {
            offsets.push(parser.file_position(&machine).unwrap());
            parser.set_finished(&mut machine);
            while parser.is_ready() {
                offsets.push(parser.file_position(&machine).unwrap());
                parser.set_finished(&mut machine);
            }
        }
    }
    // "G28" at 0, "G1 X5" at 4, "M400" at 10.
    assert_eq!(offsets, [0, 4, 10]);
}

#[test]
fn test_file_position_is_none_off_file() {
    let mut parser = Parser::new(ParserConfig::default());
    let mut machine = MachineState::new();
    assert!(parser.put_bytes(b"G28", &mut machine).unwrap());
    assert_eq!(parser.file_position(&machine), None);
}

#[test]
fn test_line_numbers_continue_without_prefix() {
    let mut parser = Parser::new(ParserConfig::default());
    let mut machine = MachineState::new();
    assert!(feed(&mut parser, &mut machine, "N100 G28\n"));
    parser.set_finished(&mut machine);
    assert_eq!(machine.line_number, 100);
    assert!(feed(&mut parser, &mut machine, "G1 X0\n"));
    parser.set_finished(&mut machine);
    assert_eq!(machine.line_number, 101);
    assert!(feed(&mut parser, &mut machine, "N200 G1 X1\n"));
    parser.set_finished(&mut machine);
    assert_eq!(machine.line_number, 200);
}
