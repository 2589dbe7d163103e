//! Typed parameter extraction from the current command.
//!
//! A read is a two-step affair: `seen('X')` positions the cursor just after
//! the parameter letter, then one typed getter consumes the value and
//! clears the cursor. Calling a getter without a successful `seen` is a
//! caller bug and reported as `Internal`.

use std::net::Ipv4Addr;

use crate::error::{NumericKind, ParseError, ParseErrorKind};
use crate::parser::Parser;
use crate::types::{DriverId, ExpressionValue};

const LIST_SEPARATOR: u8 = b':';

/// Longest run of unsigned digits starting at `start` (after optional
/// whitespace), or `None` if there are no digits there.
fn scan_unsigned(bytes: &[u8], start: usize, base: u32) -> Option<(u32, usize)> {
    let mut p = start;
    while matches!(bytes.get(p), Some(b' ' | b'\t')) {
        p += 1;
    }
    let mut value: u32 = 0;
    let mut any = false;
    while let Some(d) = bytes.get(p).and_then(|&b| (b as char).to_digit(base)) {
        value = value.saturating_mul(base).saturating_add(d);
        any = true;
        p += 1;
    }
    if any {
        Some((value, p))
    } else {
        None
    }
}

fn scan_signed(bytes: &[u8], start: usize) -> Option<(i32, usize)> {
    let mut p = start;
    while matches!(bytes.get(p), Some(b' ' | b'\t')) {
        p += 1;
    }
    let negative = match bytes.get(p) {
        Some(b'-') => {
            p += 1;
            true
        }
        Some(b'+') => {
            p += 1;
            false
        }
        _ => false,
    };
    let (magnitude, end) = scan_unsigned(bytes, p, 10)?;
    let value = if negative {
        (magnitude as i64).wrapping_neg() as i32
    } else {
        magnitude as i32
    };
    Some((value, end))
}

/// Longest float at `start`: optional sign, digits with optional decimal
/// point, optional exponent. Returns `None` when no digits are present.
fn scan_float(bytes: &[u8], start: usize) -> Option<(f32, usize)> {
    let mut p = start;
    while matches!(bytes.get(p), Some(b' ' | b'\t')) {
        p += 1;
    }
    let num_start = p;
    if matches!(bytes.get(p), Some(b'+' | b'-')) {
        p += 1;
    }
    let mut any = false;
    while bytes.get(p).is_some_and(|b| b.is_ascii_digit()) {
        p += 1;
        any = true;
    }
    if bytes.get(p) == Some(&b'.') {
        p += 1;
        while bytes.get(p).is_some_and(|b| b.is_ascii_digit()) {
            p += 1;
            any = true;
        }
    }
    if !any {
        return None;
    }
    let mut end = p;
    if matches!(bytes.get(p), Some(b'e' | b'E')) {
        let mut q = p + 1;
        if matches!(bytes.get(q), Some(b'+' | b'-')) {
            q += 1;
        }
        if bytes.get(q).is_some_and(|b| b.is_ascii_digit()) {
            while bytes.get(q).is_some_and(|b| b.is_ascii_digit()) {
                q += 1;
            }
            end = q;
        }
    }
    let text = std::str::from_utf8(&bytes[num_start..end]).ok()?;
    Some((text.parse().unwrap_or(0.0), end))
}

impl Parser {
    /// Scan the current command's parameters for an unquoted, unbraced
    /// occurrence of `c` (which must be uppercase) and leave the cursor
    /// just after it.
    ///
    /// `E` does not match directly after a digit, so the exponent in
    /// `X1E3` is not mistaken for an extruder parameter.
    pub fn seen(&mut self, c: char) -> bool {
        let target = c as u8;
        let mut in_quotes = false;
        let mut brace_depth = 0u32;
        let mut rp = self.parameter_start;
        while rp < self.command_end {
            let b = self.byte_at(rp);
            if b == b'"' {
                in_quotes = !in_quotes;
            } else if !in_quotes {
                if brace_depth == 0
                    && b.to_ascii_uppercase() == target
                    && (target != b'E'
                        || rp == self.parameter_start
                        || !self.byte_at(rp - 1).is_ascii_digit())
                {
                    self.read_pointer = Some(rp + 1);
                    return true;
                }
                if b == b'{' {
                    brace_depth += 1;
                } else if b == b'}' && brace_depth != 0 {
                    brace_depth -= 1;
                }
            }
            rp += 1;
        }
        self.read_pointer = None;
        false
    }

    fn pending_read(&self) -> Result<usize, ParseError> {
        self.read_pointer
            .ok_or_else(|| ParseError::new(0, ParseErrorKind::Internal))
    }

    pub(crate) fn error_at(&self, column: usize, kind: ParseErrorKind) -> ParseError {
        ParseError::new(column, kind)
    }

    /// Float value after a letter found by `seen`.
    pub fn get_f_value(&mut self) -> Result<f32, ParseError> {
        let mut rp = self.pending_read()?;
        let value = self.read_float(&mut rp)?;
        self.read_pointer = None;
        Ok(value)
    }

    /// Signed integer value after a letter found by `seen`.
    pub fn get_i_value(&mut self) -> Result<i32, ParseError> {
        let mut rp = self.pending_read()?;
        let value = self.read_i32(&mut rp)?;
        self.read_pointer = None;
        Ok(value)
    }

    /// Unsigned integer value after a letter found by `seen`. Accepts
    /// quoted hex (`"xNN"`, `"0xNN"`).
    pub fn get_ui_value(&mut self) -> Result<u32, ParseError> {
        let mut rp = self.pending_read()?;
        let value = self.read_u32(&mut rp)?;
        self.read_pointer = None;
        Ok(value)
    }

    /// Driver id after a letter found by `seen`: `board.driver` with CAN
    /// expansion, a bare driver number otherwise.
    pub fn get_driver_id(&mut self) -> Result<DriverId, ParseError> {
        let mut rp = self.pending_read()?;
        let value = self.read_driver_id(&mut rp)?;
        self.read_pointer = None;
        Ok(value)
    }

    fn read_float(&self, rp: &mut usize) -> Result<f32, ParseError> {
        if self.byte_at(*rp) == b'{' {
            let column = *rp;
            return match self.evaluate_expression(rp)? {
                ExpressionValue::Float(f)
                | ExpressionValue::Float2(f)
                | ExpressionValue::Float3(f) => Ok(f),
                ExpressionValue::Int(i) => Ok(i as f32),
                ExpressionValue::UInt(u) => Ok(u as f32),
                _ => Err(self.error_at(
                    column,
                    ParseErrorKind::ExpectedNumeric {
                        kind: NumericKind::Float,
                    },
                )),
            };
        }
        match scan_float(&self.buf, *rp) {
            Some((value, end)) => {
                *rp = end;
                Ok(value)
            }
            None => Ok(0.0),
        }
    }

    fn read_u32(&self, rp: &mut usize) -> Result<u32, ParseError> {
        if self.byte_at(*rp) == b'{' {
            let column = *rp;
            return match self.evaluate_expression(rp)? {
                ExpressionValue::UInt(u) => Ok(u),
                ExpressionValue::Int(i) if i >= 0 => Ok(i as u32),
                ExpressionValue::Int(_) => {
                    Err(self.error_at(column, ParseErrorKind::ValueMustBeNonNegative))
                }
                _ => Err(self.error_at(
                    column,
                    ParseErrorKind::ExpectedNumeric {
                        kind: NumericKind::Uint,
                    },
                )),
            };
        }

        let mut base = 10;
        let mut skip_trailing_quote = 0;
        // Allow "xNNNN" and "0xNNNN" hex values wrapped in double quotes.
        if self.byte_at(*rp) == b'"' {
            *rp += 1;
            skip_trailing_quote = 1;
            match self.byte_at(*rp) {
                b'x' | b'X' => {
                    base = 16;
                    *rp += 1;
                }
                b'0' if matches!(self.byte_at(*rp + 1), b'x' | b'X') => {
                    base = 16;
                    *rp += 2;
                }
                _ => {}
            }
        }

        match scan_unsigned(&self.buf, *rp, base) {
            Some((value, end)) => {
                *rp = end + skip_trailing_quote;
                Ok(value)
            }
            None => {
                *rp += skip_trailing_quote;
                Ok(0)
            }
        }
    }

    fn read_i32(&self, rp: &mut usize) -> Result<i32, ParseError> {
        if self.byte_at(*rp) == b'{' {
            let column = *rp;
            return match self.evaluate_expression(rp)? {
                ExpressionValue::Int(i) => Ok(i),
                ExpressionValue::UInt(u) => Ok(u as i32),
                _ => Err(self.error_at(
                    column,
                    ParseErrorKind::ExpectedNumeric {
                        kind: NumericKind::Int,
                    },
                )),
            };
        }
        match scan_signed(&self.buf, *rp) {
            Some((value, end)) => {
                *rp = end;
                Ok(value)
            }
            None => Ok(0),
        }
    }

    fn read_driver_id(&self, rp: &mut usize) -> Result<DriverId, ParseError> {
        let first = self.read_u32(rp)?;
        if self.config.can_expansion && self.byte_at(*rp) == b'.' {
            *rp += 1;
            let second = self.read_u32(rp)?;
            Ok(DriverId {
                board_address: first as u8,
                local_driver: second as u8,
            })
        } else {
            Ok(DriverId {
                board_address: 0,
                local_driver: first as u8,
            })
        }
    }

    /// Colon-separated float list. With `do_pad`, a single supplied value
    /// is broadcast to `max_len` elements.
    pub fn get_float_array(&mut self, max_len: usize, do_pad: bool) -> Result<Vec<f32>, ParseError> {
        let mut rp = self.pending_read()?;
        let mut values = Vec::new();
        loop {
            if values.len() >= max_len {
                return Err(self.error_at(rp, ParseErrorKind::ArrayTooLong { max: max_len }));
            }
            let v = self.read_float(&mut rp)?;
            values.push(v);
            if self.byte_at(rp) != LIST_SEPARATOR {
                break;
            }
            rp += 1;
        }
        if do_pad && values.len() == 1 && max_len > 1 {
            let v = values[0];
            values.resize(max_len, v);
        }
        self.read_pointer = None;
        Ok(values)
    }

    /// Colon-separated signed integer list, with the same pad semantics as
    /// [`Parser::get_float_array`].
    pub fn get_int_array(&mut self, max_len: usize, do_pad: bool) -> Result<Vec<i32>, ParseError> {
        let mut rp = self.pending_read()?;
        let mut values = Vec::new();
        loop {
            if values.len() >= max_len {
                return Err(self.error_at(rp, ParseErrorKind::ArrayTooLong { max: max_len }));
            }
            let v = self.read_i32(&mut rp)?;
            values.push(v);
            if self.byte_at(rp) != LIST_SEPARATOR {
                break;
            }
            rp += 1;
        }
        if do_pad && values.len() == 1 && max_len > 1 {
            let v = values[0];
            values.resize(max_len, v);
        }
        self.read_pointer = None;
        Ok(values)
    }

    /// Colon-separated unsigned integer list, with the same pad semantics
    /// as [`Parser::get_float_array`].
    pub fn get_unsigned_array(
        &mut self,
        max_len: usize,
        do_pad: bool,
    ) -> Result<Vec<u32>, ParseError> {
        let mut rp = self.pending_read()?;
        let mut values = Vec::new();
        loop {
            if values.len() >= max_len {
                return Err(self.error_at(rp, ParseErrorKind::ArrayTooLong { max: max_len }));
            }
            let v = self.read_u32(&mut rp)?;
            values.push(v);
            if self.byte_at(rp) != LIST_SEPARATOR {
                break;
            }
            rp += 1;
        }
        if do_pad && values.len() == 1 && max_len > 1 {
            let v = values[0];
            values.resize(max_len, v);
        }
        self.read_pointer = None;
        Ok(values)
    }

    /// Colon-separated driver id list. Driver ids do not pad.
    pub fn get_driver_id_array(&mut self, max_len: usize) -> Result<Vec<DriverId>, ParseError> {
        let mut rp = self.pending_read()?;
        let mut values = Vec::new();
        loop {
            if values.len() >= max_len {
                return Err(self.error_at(rp, ParseErrorKind::ArrayTooLong { max: max_len }));
            }
            let v = self.read_driver_id(&mut rp)?;
            values.push(v);
            if self.byte_at(rp) != LIST_SEPARATOR {
                break;
            }
            rp += 1;
        }
        self.read_pointer = None;
        Ok(values)
    }

    /// String parameter that must be quoted (or a string expression).
    pub fn get_quoted_string(&mut self) -> Result<String, ParseError> {
        let mut rp = self.pending_read()?;
        let result = match self.byte_at(rp) {
            b'"' => self.internal_get_quoted_string(&mut rp),
            b'{' => self.get_string_expression(&mut rp),
            _ => Err(self.error_at(rp, ParseErrorKind::StringExpected)),
        };
        self.read_pointer = None;
        result
    }

    /// The current byte is a double quote; read the quoted string body.
    ///
    /// `""` escapes a quote; `'x` lowercases the letter x; `''` is a single
    /// quote; control characters are rejected (an unterminated string runs
    /// into the 0 sentinel past the line end and is rejected the same way).
    pub(crate) fn internal_get_quoted_string(&self, rp: &mut usize) -> Result<String, ParseError> {
        let mut s = String::new();
        *rp += 1;
        loop {
            let c = self.byte_at(*rp);
            *rp += 1;
            if c < 0x20 {
                return Err(self.error_at(*rp - 1, ParseErrorKind::ControlCharInString));
            }
            if c == b'"' {
                if self.byte_at(*rp) == b'"' {
                    *rp += 1;
                    s.push('"');
                } else {
                    return Ok(s);
                }
            } else if c == b'\'' {
                let next = self.byte_at(*rp);
                if next.is_ascii_alphabetic() {
                    *rp += 1;
                    s.push(next.to_ascii_lowercase() as char);
                } else if next == b'\'' {
                    *rp += 1;
                    s.push('\'');
                } else {
                    s.push('\'');
                }
            } else {
                s.push(c as char);
            }
        }
    }

    /// String parameter that may be quoted. Unquoted, it runs to the end of
    /// the line with trailing whitespace stripped.
    pub fn get_possibly_quoted_string(&mut self, allow_empty: bool) -> Result<String, ParseError> {
        let mut rp = self.pending_read()?;
        let result = self.internal_get_possibly_quoted_string(&mut rp, allow_empty);
        self.read_pointer = None;
        result
    }

    fn internal_get_possibly_quoted_string(
        &mut self,
        rp: &mut usize,
        allow_empty: bool,
    ) -> Result<String, ParseError> {
        let s = match self.byte_at(*rp) {
            b'"' => self.internal_get_quoted_string(rp)?,
            b'{' => self.get_string_expression(rp)?,
            _ => {
                // The string is the remainder of the line.
                self.command_end = self.line_len();
                let mut s = String::new();
                loop {
                    let c = self.byte_at(*rp);
                    if c < 0x20 {
                        break;
                    }
                    *rp += 1;
                    s.push(c as char);
                }
                let stripped = s.trim_end_matches([' ', '\t']).len();
                s.truncate(stripped);
                s
            }
        };
        if !allow_empty && s.is_empty() {
            return Err(self.error_at(*rp, ParseErrorKind::NonEmptyStringExpected));
        }
        Ok(s)
    }

    /// Rest-of-line string with no preceding parameter letter, as used by
    /// legacy `M23 <filename>`.
    pub fn get_unprecedented_string(&mut self, allow_empty: bool) -> Result<String, ParseError> {
        let mut rp = self.parameter_start;
        while rp < self.command_end && matches!(self.byte_at(rp), b' ' | b'\t') {
            rp += 1;
        }
        let result = self.internal_get_possibly_quoted_string(&mut rp, allow_empty);
        self.read_pointer = None;
        result
    }

    /// Quoted string lowercased with `_`, `-` and spaces elided, for
    /// case-insensitive matching of names.
    pub fn get_reduced_string(&mut self) -> Result<String, ParseError> {
        let mut rp = self.pending_read()?;
        if self.byte_at(rp) != b'"' {
            self.read_pointer = None;
            return Err(self.error_at(rp, ParseErrorKind::StringExpected));
        }
        let mut s = String::new();
        rp += 1;
        let result = loop {
            let c = self.byte_at(rp);
            rp += 1;
            match c {
                b'"' => {
                    if self.byte_at(rp) == b'"' {
                        rp += 1;
                        s.push('"');
                    } else {
                        break Ok(s);
                    }
                }
                b'_' | b'-' | b' ' => {}
                c if c < 0x20 => {
                    break Err(self.error_at(rp - 1, ParseErrorKind::ControlCharInString))
                }
                c => s.push(c.to_ascii_lowercase() as char),
            }
        };
        self.read_pointer = None;
        result
    }

    /// Four decimal octets separated by dots.
    pub fn get_ip_address(&mut self) -> Result<Ipv4Addr, ParseError> {
        let mut rp = self.pending_read()?;
        self.read_pointer = None;
        let mut octets = [0u8; 4];
        let mut n = 0;
        loop {
            let (value, end) = match scan_unsigned(&self.buf, rp, 10) {
                Some(ok) => ok,
                None => return Err(self.error_at(rp, ParseErrorKind::InvalidIpAddress)),
            };
            if value > 255 {
                return Err(self.error_at(rp, ParseErrorKind::InvalidIpAddress));
            }
            octets[n] = value as u8;
            n += 1;
            rp = end;
            if self.byte_at(rp) != b'.' {
                break;
            }
            if n == 4 {
                return Err(self.error_at(rp, ParseErrorKind::InvalidIpAddress));
            }
            rp += 1;
        }
        if n != 4 {
            return Err(self.error_at(rp, ParseErrorKind::InvalidIpAddress));
        }
        Ok(Ipv4Addr::from(octets))
    }

    /// Six hex octets separated by colons.
    pub fn get_mac_address(&mut self) -> Result<[u8; 6], ParseError> {
        let mut rp = self.pending_read()?;
        self.read_pointer = None;
        let mut mac = [0u8; 6];
        let mut n = 0;
        loop {
            let (value, end) = match scan_unsigned(&self.buf, rp, 16) {
                Some(ok) => ok,
                None => return Err(self.error_at(rp, ParseErrorKind::InvalidMacAddress)),
            };
            if value > 255 {
                return Err(self.error_at(rp, ParseErrorKind::InvalidMacAddress));
            }
            mac[n] = value as u8;
            n += 1;
            rp = end;
            if self.byte_at(rp) != b':' {
                break;
            }
            if n == 6 {
                return Err(self.error_at(rp, ParseErrorKind::InvalidMacAddress));
            }
            rp += 1;
        }
        if n != 6 {
            return Err(self.error_at(rp, ParseErrorKind::InvalidMacAddress));
        }
        Ok(mac)
    }
}
