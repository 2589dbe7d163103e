//! Locating and decoding commands within an assembled line.

use crate::config::MachineType;
use crate::parser::{IngestState, Parser};

impl Parser {
    /// Decode the command at `command_start` and find where the next one on
    /// the same line begins. Leaves the parser in the ready state.
    pub(crate) fn decode_command(&mut self) {
        let cl = self.byte_at(self.command_start).to_ascii_uppercase();
        self.command_fraction = None;
        if cl == b'G' || cl == b'M' || cl == b'T' {
            self.command_letter = cl as char;
            self.has_command_number = false;
            self.command_number = -1;
            self.parameter_start = self.command_start + 1;
            let negative = self.byte_at(self.parameter_start) == b'-';
            if negative {
                self.parameter_start += 1;
            }
            if self.byte_at(self.parameter_start).is_ascii_digit() {
                self.has_command_number = true;
                self.command_number = 0;
                while self.byte_at(self.parameter_start).is_ascii_digit() {
                    self.command_number = self
                        .command_number
                        .wrapping_mul(10)
                        .wrapping_add((self.byte_at(self.parameter_start) - b'0') as i32);
                    self.parameter_start += 1;
                }
                if negative {
                    self.command_number = -self.command_number;
                }

                // Single fractional digit, as in G38.2.
                if self.byte_at(self.parameter_start) == b'.' {
                    self.parameter_start += 1;
                    let d = self.byte_at(self.parameter_start);
                    if d.is_ascii_digit() {
                        self.command_fraction = Some(d - b'0');
                        self.parameter_start += 1;
                    }
                }
            }

            // A G or M preceded by whitespace and not inside quotes starts
            // the next command on this line.
            let mut in_quotes = false;
            let mut primed = false;
            self.command_end = self.parameter_start;
            while self.command_end < self.line_len() {
                let c = self.byte_at(self.command_end);
                if c == b'"' {
                    in_quotes = !in_quotes;
                    primed = false;
                } else if !in_quotes {
                    let c2 = c.to_ascii_uppercase();
                    if primed && (c2 == b'G' || c2 == b'M') {
                        break;
                    }
                    primed = c == b' ' || c == b'\t';
                }
                self.command_end += 1;
            }
        } else if self.has_command_number
            && self.command_letter == 'G'
            && (0..=3).contains(&self.command_number)
            && (self.config.axis_letters.as_bytes().contains(&cl)
                || ((cl == b'I' || cl == b'J') && self.command_number >= 2))
            && self.config.machine_type == MachineType::Cnc
        {
            // Fanuc-style continuation: repeat the previous G0..G3 command
            // with the new parameters.
            self.parameter_start = self.command_start;
            self.command_end = self.line_len();
        } else {
            self.command_letter = cl as char;
            self.has_command_number = false;
            self.command_number = -1;
            self.command_fraction = None;
            self.parameter_start = self.command_start;
            self.command_end = self.line_len();
        }

        self.state = IngestState::Ready;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{MachineType, ParserConfig};
    use crate::machine::MachineState;
    use crate::parser::Parser;

    fn decode(line: &str) -> (Parser, MachineState) {
        let mut p = Parser::new(ParserConfig::default());
        let mut m = MachineState::new();
        assert!(p.put_bytes(line.as_bytes(), &mut m).unwrap());
        (p, m)
    }

    #[test]
    fn test_letter_number_fraction() {
        let (p, _) = decode("G38.2 X10");
        assert_eq!(p.command_letter(), 'G');
        assert!(p.has_command_number());
        assert_eq!(p.command_number(), 38);
        assert_eq!(p.command_fraction(), Some(2));
    }

    #[test]
    fn test_lowercase_letter_accepted() {
        let (p, _) = decode("m115");
        assert_eq!(p.command_letter(), 'M');
        assert_eq!(p.command_number(), 115);
        assert_eq!(p.command_fraction(), None);
    }

    #[test]
    fn test_letter_without_number() {
        let (p, _) = decode("T");
        assert_eq!(p.command_letter(), 'T');
        assert!(!p.has_command_number());
    }

    #[test]
    fn test_negative_command_number() {
        let (p, _) = decode("T-1");
        assert_eq!(p.command_letter(), 'T');
        assert!(p.has_command_number());
        assert_eq!(p.command_number(), -1);
    }

    #[test]
    fn test_multiple_commands_per_line() {
        let (mut p, mut m) = decode("G1 X1 M400 G28");
        assert_eq!(p.command_number(), 1);
        assert_eq!(p.command_slice(), b"G1 X1 ");
        p.set_finished(&mut m);
        assert!(p.is_ready());
        assert_eq!(p.command_letter(), 'M');
        assert_eq!(p.command_number(), 400);
        p.set_finished(&mut m);
        assert_eq!(p.command_letter(), 'G');
        assert_eq!(p.command_number(), 28);
        p.set_finished(&mut m);
        assert!(!p.is_ready());
    }

    #[test]
    fn test_quoted_letters_do_not_split_commands() {
        let (mut p, mut m) = decode("M117 \"say G28 or M1\" G4 P0");
        assert_eq!(p.command_number(), 117);
        p.set_finished(&mut m);
        assert_eq!(p.command_letter(), 'G');
        assert_eq!(p.command_number(), 4);
    }

    #[test]
    fn test_invalid_command_letter() {
        let (p, _) = decode("Z123");
        assert_eq!(p.command_letter(), 'Z');
        assert!(!p.has_command_number());
        assert_eq!(p.command_number(), -1);
    }

    fn cnc_parser() -> (Parser, MachineState) {
        let config = ParserConfig {
            machine_type: MachineType::Cnc,
            ..ParserConfig::default()
        };
        (Parser::new(config), MachineState::new())
    }

    #[test]
    fn test_fanuc_continuation_line() {
        let (mut p, mut m) = cnc_parser();
        assert!(p.put_bytes(b"G2 X10 Y10 I5 J0", &mut m).unwrap());
        assert_eq!(p.command_number(), 2);
        p.set_finished(&mut m);

        assert!(p.put_bytes(b"X20 Y20 I5 J0", &mut m).unwrap());
        assert_eq!(p.command_letter(), 'G');
        assert_eq!(p.command_number(), 2);
        assert!(p.seen('X'));
        assert_eq!(p.get_f_value().unwrap(), 20.0);
        assert!(p.seen('I'));
        assert_eq!(p.get_f_value().unwrap(), 5.0);
    }

    #[test]
    fn test_fanuc_ij_requires_arc_move() {
        let (mut p, mut m) = cnc_parser();
        assert!(p.put_bytes(b"G1 X10", &mut m).unwrap());
        p.set_finished(&mut m);

        // I/J continuation only applies after G2/G3.
        assert!(p.put_bytes(b"I5 J0", &mut m).unwrap());
        assert_eq!(p.command_letter(), 'I');
        assert!(!p.has_command_number());
    }

    #[test]
    fn test_fanuc_fallback_disabled_off_cnc() {
        let (mut p, mut m) = decode("G2 X10 Y10 I5 J0");
        p.set_finished(&mut m);
        assert!(p.put_bytes(b"X20 Y20", &mut m).unwrap());
        assert_eq!(p.command_letter(), 'X');
        assert!(!p.has_command_number());
    }
}
