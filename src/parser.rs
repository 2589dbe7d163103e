//! Line assembly: the byte-at-a-time ingest state machine.
//!
//! Bytes are fed one at a time through [`Parser::put`]. The state machine
//! strips comments, validates an optional `*NNN` checksum, collects the
//! leading line number and indent, and retains the rest of the line in a
//! fixed-capacity buffer. When a terminator arrives the finished line is
//! vetted (checksum, block keywords) and decoded into the current command
//! view, at which point `put` returns `true` and the typed parameter
//! getters become usable until [`Parser::set_finished`].

use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::machine::MachineState;
use crate::types::{NullObjectModel, ObjectModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IngestState {
    NotStarted,
    LineNumber,
    Whitespace,
    Code,
    BracketedComment,
    QuotedString,
    Checksum,
    Discarding,
    Ready,
}

/// Streaming G-code command parser.
///
/// One parser is exclusively owned by one command channel. The enclosing
/// machine state is borrowed for the duration of each call.
pub struct Parser {
    pub(crate) config: ParserConfig,
    pub(crate) model: Arc<dyn ObjectModel>,

    /// Retained bytes of the current line (comments, line number, indent
    /// and checksum stripped).
    pub(crate) buf: Vec<u8>,
    /// Every byte consumed for this line, including stripped ones. Used
    /// for file-position accounting.
    pub(crate) total_consumed: u64,
    pub(crate) state: IngestState,

    pub(crate) had_line_number: bool,
    pub(crate) received_line_number: u32,
    pub(crate) had_checksum: bool,
    pub(crate) declared_checksum: u8,
    pub(crate) computed_checksum: u8,
    pub(crate) command_indent: u16,

    pub(crate) command_start: usize,
    pub(crate) parameter_start: usize,
    pub(crate) command_end: usize,
    pub(crate) command_letter: char,
    pub(crate) has_command_number: bool,
    pub(crate) command_number: i32,
    pub(crate) command_fraction: Option<u8>,

    /// Parameter cursor; `None` means no read is pending.
    pub(crate) read_pointer: Option<usize>,

    /// When skipping a false branch or untaken loop, lines indented deeper
    /// than this are swallowed without decoding.
    pub(crate) indent_to_skip_to: Option<u16>,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        let mut parser = Self {
            config,
            model: Arc::new(NullObjectModel),
            buf: Vec::new(),
            total_consumed: 0,
            state: IngestState::NotStarted,
            had_line_number: false,
            received_line_number: 0,
            had_checksum: false,
            declared_checksum: 0,
            computed_checksum: 0,
            command_indent: 0,
            command_start: 0,
            parameter_start: 0,
            command_end: 0,
            command_letter: 'Q',
            has_command_number: false,
            command_number: -1,
            command_fraction: None,
            read_pointer: None,
            indent_to_skip_to: None,
        };
        parser.buf.reserve(parser.config.max_line_length);
        parser.init();
        parser
    }

    /// Attach the variable resolver used by `{...}` expressions.
    pub fn with_object_model(mut self, model: Arc<dyn ObjectModel>) -> Self {
        self.model = model;
        self
    }

    /// Reset line assembly. Does not touch the remembered command view (the
    /// previous command letter/number stay available for continuation
    /// lines) or the block-skip state.
    pub fn init(&mut self) {
        self.buf.clear();
        self.total_consumed = 0;
        self.read_pointer = None;
        self.had_line_number = false;
        self.had_checksum = false;
        self.computed_checksum = 0;
        self.command_indent = 0;
        self.state = IngestState::NotStarted;
    }

    /// Byte at `i`, with reads past the retained line yielding 0.
    pub(crate) fn byte_at(&self, i: usize) -> u8 {
        self.buf.get(i).copied().unwrap_or(0)
    }

    pub(crate) fn line_len(&self) -> usize {
        self.buf.len()
    }

    fn add_to_checksum(&mut self, c: u8) {
        self.computed_checksum ^= c;
    }

    fn store_and_add_to_checksum(&mut self, c: u8) {
        self.computed_checksum ^= c;
        if self.buf.len() < self.config.max_line_length {
            self.buf.push(c);
        }
    }

    /// Feed one byte. Returns `true` once a command is ready to be acted
    /// upon; the command stays current until [`Parser::set_finished`].
    pub fn put(&mut self, c: u8, machine: &mut MachineState) -> Result<bool, ParseError> {
        if c != 0 {
            self.total_consumed += 1;
        }

        if c == 0 || c == b'\n' || c == b'\r' {
            return self.line_finished(machine);
        }

        if c == 0x7F && self.state != IngestState::Discarding {
            // The UART receiver stores 0x7F on an overrun or framing error.
            // Drop the line and resync on the next newline.
            self.buf.clear();
            self.state = IngestState::Discarding;
        }

        let mut again = true;
        while again {
            again = false;
            match self.state {
                IngestState::NotStarted => match c {
                    b'N' | b'n' => {
                        self.had_line_number = true;
                        self.add_to_checksum(c);
                        self.received_line_number = 0;
                        self.state = IngestState::LineNumber;
                    }
                    b' ' | b'\t' => {
                        self.add_to_checksum(c);
                        self.command_indent = self.command_indent.saturating_add(1);
                    }
                    _ => {
                        self.state = IngestState::Code;
                        self.command_start = 0;
                        again = true;
                    }
                },

                IngestState::LineNumber => {
                    if c.is_ascii_digit() {
                        self.add_to_checksum(c);
                        self.received_line_number = self
                            .received_line_number
                            .wrapping_mul(10)
                            .wrapping_add((c - b'0') as u32);
                    } else {
                        self.state = IngestState::Whitespace;
                        again = true;
                    }
                }

                IngestState::Whitespace => match c {
                    b' ' | b'\t' => self.add_to_checksum(c),
                    _ => {
                        self.state = IngestState::Code;
                        self.command_start = 0;
                        again = true;
                    }
                },

                IngestState::Code => match c {
                    b'*' => {
                        self.declared_checksum = 0;
                        self.had_checksum = true;
                        self.state = IngestState::Checksum;
                    }
                    b';' => self.state = IngestState::Discarding,
                    b'(' => {
                        self.add_to_checksum(c);
                        self.state = IngestState::BracketedComment;
                    }
                    b'"' => {
                        self.store_and_add_to_checksum(c);
                        self.state = IngestState::QuotedString;
                    }
                    _ => self.store_and_add_to_checksum(c),
                },

                IngestState::BracketedComment => {
                    self.add_to_checksum(c);
                    if c == b')' {
                        self.state = IngestState::Code;
                    }
                }

                IngestState::QuotedString => {
                    self.store_and_add_to_checksum(c);
                    if c == b'"' {
                        self.state = IngestState::Code;
                    }
                }

                IngestState::Checksum => {
                    if c.is_ascii_digit() {
                        self.declared_checksum = self
                            .declared_checksum
                            .wrapping_mul(10)
                            .wrapping_add(c - b'0');
                    } else {
                        self.state = IngestState::Discarding;
                        again = true;
                    }
                }

                IngestState::Discarding | IngestState::Ready => {}
            }
        }

        Ok(false)
    }

    /// Feed a whole string as one line, terminating it if needed.
    pub fn put_bytes(&mut self, data: &[u8], machine: &mut MachineState) -> Result<bool, ParseError> {
        self.init();
        for &b in data {
            if self.put(b, machine)? {
                return Ok(true);
            }
        }
        self.put(b'\n', machine)
    }

    /// The input file is exhausted. Feeds a synthetic newline so a final
    /// line without a terminator still yields its command.
    pub fn file_ended(&mut self, machine: &mut MachineState) -> Result<bool, ParseError> {
        if self.buf.is_empty() {
            Ok(false)
        } else {
            self.put(b'\n', machine)
        }
    }

    /// Called on a terminator byte. Vets the assembled line and decodes the
    /// first command on it.
    fn line_finished(&mut self, machine: &mut MachineState) -> Result<bool, ParseError> {
        if self.buf.is_empty() {
            self.init();
            return Ok(false);
        }

        if self.buf.len() >= self.config.max_line_length {
            tracing::error!(
                capacity = self.config.max_line_length,
                "G-code line buffer length overflow, line discarded"
            );
            self.init();
            return Ok(false);
        }

        let bad_checksum = self.had_checksum && self.computed_checksum != self.declared_checksum;
        let missing_checksum =
            self.config.checksum_required && !self.had_checksum && machine.is_outermost();
        tracing::debug!(
            line = %String::from_utf8_lossy(&self.buf),
            bad_checksum,
            missing_checksum,
            "line assembled"
        );

        if bad_checksum {
            if self.had_line_number {
                tracing::warn!(
                    line_number = self.received_line_number,
                    computed = self.computed_checksum,
                    declared = self.declared_checksum,
                    "checksum mismatch, requesting resend"
                );
                let resend = format!("M998 P{}", self.received_line_number);
                self.buf.clear();
                self.buf.extend_from_slice(resend.as_bytes());
            } else {
                self.init();
                return Ok(false);
            }
        } else if missing_checksum {
            self.init();
            return Ok(false);
        }

        if self.had_line_number {
            machine.line_number = self.received_line_number;
        } else {
            machine.line_number = machine.line_number.wrapping_add(1);
        }

        if machine.doing_file() {
            if let Some(skip) = self.indent_to_skip_to {
                if self.command_indent > skip {
                    // Still inside the block being skipped.
                    self.init();
                    return Ok(false);
                }
            }
            let mut skipped_if_false = false;
            if let Some(skip) = self.indent_to_skip_to {
                if skip >= self.command_indent {
                    if skip == self.command_indent {
                        skipped_if_false = machine.current_block().is_if_false();
                        machine.set_current_block(crate::machine::BlockState::Plain);
                    }
                    self.indent_to_skip_to = None;
                }
            }
            match self.process_block_command(skipped_if_false, machine) {
                Ok(true) => {
                    self.init();
                    return Ok(false);
                }
                Ok(false) => {}
                Err(e) => {
                    self.init();
                    return Err(e);
                }
            }
        }

        self.command_start = 0;
        self.decode_command();
        Ok(true)
    }

    /// Whether a completed command is currently exposed.
    pub fn is_ready(&self) -> bool {
        self.state == IngestState::Ready
    }

    /// The consumer is done with the current command: move on to the next
    /// sub-command on the same line, or reset for the next line.
    pub fn set_finished(&mut self, machine: &mut MachineState) {
        if self.command_end < self.buf.len() {
            self.command_start = self.command_end;
            self.decode_command();
        } else {
            // G53 does not persist beyond the current line.
            machine.g53_active = false;
            self.init();
        }
    }

    pub fn command_letter(&self) -> char {
        self.command_letter
    }

    pub fn has_command_number(&self) -> bool {
        self.has_command_number
    }

    pub fn command_number(&self) -> i32 {
        self.command_number
    }

    /// Single fractional digit of commands like `G38.2`, if present.
    pub fn command_fraction(&self) -> Option<u8> {
        self.command_fraction
    }

    /// Byte offset in the source file of the first byte of the current
    /// command. `None` when not executing from a file.
    pub fn file_position(&self, machine: &MachineState) -> Option<u64> {
        let file = machine.file()?;
        Some(
            (file.position() - file.bytes_cached()).saturating_sub(self.total_consumed)
                + self.command_start as u64,
        )
    }

    /// `"<letter><number>[.<fraction>]"` for the current command.
    pub fn print_command(&self) -> String {
        let mut s = String::new();
        s.push(self.command_letter);
        if self.has_command_number {
            let _ = write!(s, "{}", self.command_number);
            if let Some(fraction) = self.command_fraction {
                let _ = write!(s, ".{fraction}");
            }
        }
        s
    }

    /// Append the full retained line content.
    pub fn append_full_command(&self, out: &mut String) {
        out.push_str(&String::from_utf8_lossy(&self.buf));
    }

    /// The bytes of the current command, parameters included.
    pub fn command_slice(&self) -> &[u8] {
        &self.buf[self.command_start..self.command_end]
    }
}
