//! Indent-based block control: `if`/`else`/`while`/`break`/`var`.
//!
//! Blocks are delimited by indentation (each leading space or tab counts
//! one level). A `while` whose condition holds bookmarks the file position
//! of its own line; when the block ends naturally the file reader is
//! rewound there so the condition is evaluated again.

use crate::error::{ParseError, ParseErrorKind};
use crate::machine::{BlockState, MachineState};
use crate::parser::Parser;

impl Parser {
    /// Check for a control-flow keyword on the completed line, adjusting
    /// the block stack for the line's indent first. Returns `true` when the
    /// line was consumed here and must not be decoded as G-code.
    pub(crate) fn process_block_command(
        &mut self,
        skipped_if_false: bool,
        machine: &mut MachineState,
    ) -> Result<bool, ParseError> {
        if self.command_indent > machine.indent_level() {
            while machine.indent_level() < self.command_indent {
                machine.create_block();
            }
        } else if self.command_indent < machine.indent_level() && self.end_blocks(machine)? {
            return Ok(true);
        }

        // Keyword words are 2..=5 lowercase letters followed by the end of
        // the line or whitespace.
        let mut len = 0;
        while len < self.line_len() && self.buf[len].is_ascii_lowercase() {
            len += 1;
            if len == 6 {
                break;
            }
        }
        if (2..6).contains(&len) && matches!(self.byte_at(len), 0 | b' ' | b'\t') {
            match &self.buf[..len] {
                b"if" => {
                    self.process_if(machine)?;
                    return Ok(true);
                }
                b"else" => {
                    self.process_else(skipped_if_false, machine)?;
                    return Ok(true);
                }
                b"while" => {
                    self.process_while(machine)?;
                    return Ok(true);
                }
                b"break" => {
                    self.process_break(machine)?;
                    return Ok(true);
                }
                b"var" => {
                    return Err(ParseError::new(0, ParseErrorKind::VarNotImplemented));
                }
                _ => {}
            }
        }

        Ok(false)
    }

    /// Close blocks until the stack matches the line's indent. Returns
    /// `true` when a loop block was reached and the file has been rewound;
    /// the current line must then be dropped.
    fn end_blocks(&mut self, machine: &mut MachineState) -> Result<bool, ParseError> {
        while machine.indent_level() > self.command_indent {
            machine.end_block();
            if let BlockState::Loop {
                file_position,
                line_number,
            } = *machine.current_block()
            {
                tracing::debug!(file_position, line_number, "loop block ended, rewinding");
                machine.line_number = line_number;
                machine.seek_file(file_position)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn process_if(&mut self, machine: &mut MachineState) -> Result<(), ParseError> {
        if self.evaluate_condition(2, "if")? {
            machine.set_current_block(BlockState::IfTrue);
        } else {
            machine.set_current_block(BlockState::IfFalse);
            // Skip forward to the end of the block.
            self.indent_to_skip_to = Some(machine.indent_level());
        }
        Ok(())
    }

    fn process_else(
        &mut self,
        skipped_if_false: bool,
        machine: &mut MachineState,
    ) -> Result<(), ParseError> {
        if skipped_if_false {
            // The if-branch was false, so the else-block executes as a
            // plain block.
            machine.set_current_block(BlockState::Plain);
        } else if *machine.current_block() == BlockState::IfTrue {
            self.indent_to_skip_to = Some(machine.indent_level());
        } else {
            return Err(ParseError::new(0, ParseErrorKind::ElseWithoutIf));
        }
        Ok(())
    }

    fn process_while(&mut self, machine: &mut MachineState) -> Result<(), ParseError> {
        let file_position = self.file_position(machine).unwrap_or(0);
        let line_number = machine.line_number;
        if self.evaluate_condition(5, "while")? {
            machine.set_current_block(BlockState::Loop {
                file_position,
                line_number,
            });
        } else {
            self.indent_to_skip_to = Some(machine.indent_level());
        }
        Ok(())
    }

    fn process_break(&mut self, machine: &mut MachineState) -> Result<(), ParseError> {
        loop {
            if machine.indent_level() == 0 {
                return Err(ParseError::new(0, ParseErrorKind::BreakOutsideLoop));
            }
            machine.end_block();
            if machine.current_block().is_loop() {
                break;
            }
        }
        // Turning the loop frame into a plain block ends the loop when the
        // block next closes.
        machine.set_current_block(BlockState::Plain);
        Ok(())
    }
}
