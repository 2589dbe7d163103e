//! Streaming G-code command parser core for printer and CNC firmware hosts.
//!
//! Bytes from a serial port, file or network stream are fed one at a time
//! into a [`Parser`]; once a full line has been assembled and vetted
//! (checksum, line number, comments, control-flow keywords) the current
//! command is exposed through typed parameter accessors:
//!
//! ```
//! use gcode_ingest::{MachineState, Parser, ParserConfig};
//!
//! let mut parser = Parser::new(ParserConfig::default());
//! let mut machine = MachineState::new();
//! assert!(parser.put_bytes(b"G1 X20.5 Y-3", &mut machine).unwrap());
//! assert_eq!(parser.command_letter(), 'G');
//! assert_eq!(parser.command_number(), 1);
//! assert!(parser.seen('X'));
//! assert_eq!(parser.get_f_value().unwrap(), 20.5);
//! parser.set_finished(&mut machine);
//! ```
//!
//! When executing from a file the parser also interprets the small
//! structured-control language (`if`/`else`/`while`/`break`) layered on top
//! of G-code, with indentation delimiting blocks and loops restarted by
//! rewinding the file reader.

mod blocks;
mod conditions;
mod config;
mod decoder;
mod error;
mod expression;
mod file;
mod machine;
mod params;
mod parser;
mod types;

pub use config::{ConfigError, MachineType, ParserConfig};
pub use error::{NumericKind, ParseError, ParseErrorKind};
pub use file::{DiskFile, FileReader, MemoryFile};
pub use machine::{BlockState, MachineState};
pub use parser::Parser;
pub use types::{DriverId, ExpressionValue, NullObjectModel, ObjectModel};
