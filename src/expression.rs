//! `{...}` expression evaluation.
//!
//! The only expression form currently realized is a single variable name,
//! resolved through the channel's [`crate::ObjectModel`]. Names are made of
//! letters, digits, `_`, `.` and balanced parentheses, as in
//! `move.axes(0).machinePosition`.

use crate::error::{ParseError, ParseErrorKind};
use crate::parser::Parser;
use crate::types::ExpressionValue;

impl Parser {
    /// Evaluate the expression at `*rp`, whose current byte is `{`. Leaves
    /// the cursor just past the closing `}`.
    pub(crate) fn evaluate_expression(&self, rp: &mut usize) -> Result<ExpressionValue, ParseError> {
        *rp += 1; // skip the '{'
        if !self.byte_at(*rp).is_ascii_alphabetic() {
            return Err(ParseError::new(*rp, ParseErrorKind::ExpectedVariableName));
        }
        let start = *rp;
        let mut open_parens = 0u32;
        loop {
            let c = self.byte_at(*rp);
            let accepted = c.is_ascii_alphanumeric()
                || c == b'_'
                || c == b'.'
                || c == b'('
                || (c == b')' && open_parens != 0);
            if !accepted {
                break;
            }
            if c == b'(' {
                open_parens += 1;
            } else if c == b')' {
                open_parens -= 1;
            }
            *rp += 1;
        }
        if *rp - start > self.config.max_variable_name_length {
            return Err(ParseError::new(
                start,
                ParseErrorKind::VariableNameTooLong {
                    max: self.config.max_variable_name_length,
                },
            ));
        }
        let name = std::str::from_utf8(&self.buf[start..*rp])
            .expect("variable names are built from ASCII bytes");
        let value = self.model.lookup(name).ok_or_else(|| {
            ParseError::new(
                start,
                ParseErrorKind::UnknownVariable {
                    name: name.to_string(),
                },
            )
        })?;
        if self.byte_at(*rp) != b'}' {
            return Err(ParseError::new(*rp, ParseErrorKind::ExpectedCloseBrace));
        }
        *rp += 1;
        Ok(value)
    }

    /// Evaluate the expression at `*rp` and render the result as a string.
    /// Float values carry a decimals hint in their variant.
    pub(crate) fn get_string_expression(&self, rp: &mut usize) -> Result<String, ParseError> {
        let value = self.evaluate_expression(rp)?;
        Ok(match value {
            ExpressionValue::Str(s) => s,
            ExpressionValue::Float(f) => format!("{f:.1}"),
            ExpressionValue::Float2(f) => format!("{f:.2}"),
            ExpressionValue::Float3(f) => format!("{f:.3}"),
            ExpressionValue::UInt(u) => u.to_string(),
            ExpressionValue::Int(i) => i.to_string(),
            ExpressionValue::Bool(b) => if b { "true" } else { "false" }.to_string(),
            ExpressionValue::IPv4(ip) => ip.to_string(),
        })
    }
}

/// Parse a numeric literal starting at `*pos` (the byte there must be a
/// decimal digit). Integers overflow into `TooManyDigits`; a decimal point
/// or exponent makes the value a float.
pub(crate) fn parse_number(bytes: &[u8], pos: &mut usize) -> Result<ExpressionValue, ParseError> {
    let at = |p: usize| bytes.get(p).copied().unwrap_or(0);

    let mut before_point: u32 = 0;
    while at(*pos).is_ascii_digit() {
        let digit = (at(*pos) - b'0') as u32;
        before_point = before_point
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| ParseError::new(*pos, ParseErrorKind::TooManyDigits))?;
        *pos += 1;
    }

    let mut after_point: u32 = 0;
    let mut digits_after_point = 0i32;
    let mut is_float = at(*pos) == b'.';
    if is_float {
        *pos += 1;
        while at(*pos).is_ascii_digit() {
            let digit = (at(*pos) - b'0') as u32;
            after_point = after_point
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| ParseError::new(*pos, ParseErrorKind::TooManyDigits))?;
            digits_after_point += 1;
            *pos += 1;
        }
    }

    let mut exponent = 0i32;
    if at(*pos).to_ascii_uppercase() == b'E' {
        is_float = true;
        *pos += 1;
        let exp_negative = at(*pos) == b'-';
        if exp_negative || at(*pos) == b'+' {
            *pos += 1;
        }
        while at(*pos).is_ascii_digit() {
            exponent = exponent.wrapping_mul(10).wrapping_add((at(*pos) - b'0') as i32);
            *pos += 1;
        }
        if exp_negative {
            exponent = -exponent;
        }
    }

    if is_float {
        let value = if after_point != 0 {
            if before_point == 0 {
                after_point as f64 * 10f64.powi(exponent - digits_after_point)
            } else {
                (after_point as f64 / 10f64.powi(digits_after_point) + before_point as f64)
                    * 10f64.powi(exponent)
            }
        } else {
            before_point as f64 * 10f64.powi(exponent)
        };
        Ok(ExpressionValue::Float(value as f32))
    } else {
        Ok(ExpressionValue::UInt(before_point))
    }
}
