//! Evaluating the condition that follows `if` or `while`.
//!
//! The grammar accepts numeric literals, `true`/`false`, `{variable}`
//! lookups, arithmetic (`+ - * / ^`), comparisons
//! (`== != < <= > >=`), boolean negation `!` and parentheses. The result
//! must be a boolean.

use crate::error::{ParseError, ParseErrorKind};
use crate::expression::parse_number;
use crate::parser::Parser;
use crate::types::ExpressionValue;

#[derive(Debug, Clone, Copy, PartialEq)]
enum CondValue {
    Num(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Value(CondValue),
    Op(&'static str),
}

impl Parser {
    /// Evaluate the condition text starting at `offset` (just past the
    /// keyword). Any failure is reported as `ConditionEvaluationFailed`
    /// naming the keyword.
    pub(crate) fn evaluate_condition(
        &self,
        offset: usize,
        keyword: &'static str,
    ) -> Result<bool, ParseError> {
        self.evaluate_condition_inner(offset).map_err(|reason| {
            ParseError::new(
                offset,
                ParseErrorKind::ConditionEvaluationFailed { keyword, reason },
            )
        })
    }

    fn evaluate_condition_inner(&self, offset: usize) -> Result<bool, String> {
        let tokens = self.tokenize_condition(offset)?;
        if tokens.is_empty() {
            return Err("condition is empty".to_string());
        }
        let (value, rest) = parse_expr_bp(&tokens, 0)?;
        if !rest.is_empty() {
            return Err("unexpected tokens after condition".to_string());
        }
        match value {
            CondValue::Bool(b) => Ok(b),
            CondValue::Num(_) => Err("condition is not a boolean".to_string()),
        }
    }

    fn tokenize_condition(&self, offset: usize) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        let mut pos = offset;
        while pos < self.line_len() {
            let c = self.byte_at(pos);
            match c {
                b' ' | b'\t' => pos += 1,
                b'0'..=b'9' | b'.' => {
                    let value = parse_number(&self.buf, &mut pos).map_err(|e| e.to_string())?;
                    tokens.push(Token::Value(condition_value(value)?));
                }
                b'{' => {
                    let value = self
                        .evaluate_expression(&mut pos)
                        .map_err(|e| e.to_string())?;
                    tokens.push(Token::Value(condition_value(value)?));
                }
                b'a'..=b'z' => {
                    let start = pos;
                    while self.byte_at(pos).is_ascii_lowercase() {
                        pos += 1;
                    }
                    match &self.buf[start..pos] {
                        b"true" => tokens.push(Token::Value(CondValue::Bool(true))),
                        b"false" => tokens.push(Token::Value(CondValue::Bool(false))),
                        word => {
                            return Err(format!(
                                "unknown word '{}' in condition",
                                String::from_utf8_lossy(word)
                            ))
                        }
                    }
                }
                b'=' if self.byte_at(pos + 1) == b'=' => {
                    tokens.push(Token::Op("=="));
                    pos += 2;
                }
                b'!' if self.byte_at(pos + 1) == b'=' => {
                    tokens.push(Token::Op("!="));
                    pos += 2;
                }
                b'!' => {
                    tokens.push(Token::Op("!"));
                    pos += 1;
                }
                b'<' if self.byte_at(pos + 1) == b'=' => {
                    tokens.push(Token::Op("<="));
                    pos += 2;
                }
                b'<' => {
                    tokens.push(Token::Op("<"));
                    pos += 1;
                }
                b'>' if self.byte_at(pos + 1) == b'=' => {
                    tokens.push(Token::Op(">="));
                    pos += 2;
                }
                b'>' => {
                    tokens.push(Token::Op(">"));
                    pos += 1;
                }
                b'+' => {
                    tokens.push(Token::Op("+"));
                    pos += 1;
                }
                b'-' => {
                    tokens.push(Token::Op("-"));
                    pos += 1;
                }
                b'*' => {
                    tokens.push(Token::Op("*"));
                    pos += 1;
                }
                b'/' => {
                    tokens.push(Token::Op("/"));
                    pos += 1;
                }
                b'^' => {
                    tokens.push(Token::Op("^"));
                    pos += 1;
                }
                b'(' => {
                    tokens.push(Token::Op("("));
                    pos += 1;
                }
                b')' => {
                    tokens.push(Token::Op(")"));
                    pos += 1;
                }
                c => {
                    return Err(format!("unexpected character '{}' in condition", c as char));
                }
            }
        }
        Ok(tokens)
    }
}

fn condition_value(value: ExpressionValue) -> Result<CondValue, String> {
    match value {
        ExpressionValue::Float(f) | ExpressionValue::Float2(f) | ExpressionValue::Float3(f) => {
            Ok(CondValue::Num(f as f64))
        }
        ExpressionValue::Int(i) => Ok(CondValue::Num(i as f64)),
        ExpressionValue::UInt(u) => Ok(CondValue::Num(u as f64)),
        ExpressionValue::Bool(b) => Ok(CondValue::Bool(b)),
        other => Err(format!("value {other:?} is not usable in a condition")),
    }
}

// Pratt parser over the token slice with explicit binding powers.
fn parse_expr_bp(tokens: &[Token], min_bp: u8) -> Result<(CondValue, &[Token]), String> {
    let (mut lhs, mut rest) = match tokens.split_first() {
        Some((Token::Value(v), rest)) => (*v, rest),
        Some((Token::Op("-"), rest)) => {
            let (rhs, rest) = parse_expr_bp(rest, 100)?;
            match rhs {
                CondValue::Num(n) => (CondValue::Num(-n), rest),
                CondValue::Bool(_) => return Err("'-' needs a numeric operand".to_string()),
            }
        }
        Some((Token::Op("+"), rest)) => {
            let (rhs, rest) = parse_expr_bp(rest, 100)?;
            match rhs {
                CondValue::Num(_) => (rhs, rest),
                CondValue::Bool(_) => return Err("'+' needs a numeric operand".to_string()),
            }
        }
        Some((Token::Op("!"), rest)) => {
            let (rhs, rest) = parse_expr_bp(rest, 100)?;
            match rhs {
                CondValue::Bool(b) => (CondValue::Bool(!b), rest),
                CondValue::Num(_) => return Err("'!' needs a boolean operand".to_string()),
            }
        }
        Some((Token::Op("("), rest)) => {
            let (value, rest) = parse_expr_bp(rest, 0)?;
            match rest.split_first() {
                Some((Token::Op(")"), rest)) => (value, rest),
                _ => return Err("expected ')'".to_string()),
            }
        }
        Some((token, _)) => return Err(format!("unexpected token {token:?}")),
        None => return Err("unexpected end of condition".to_string()),
    };

    loop {
        let op = match rest.first() {
            Some(Token::Op(op)) if *op != "(" && *op != ")" && *op != "!" => *op,
            _ => break,
        };
        let (l_bp, r_bp) = match op {
            "==" | "!=" | "<" | "<=" | ">" | ">=" => (1, 2),
            "+" | "-" => (3, 4),
            "*" | "/" => (5, 6),
            "^" => (9, 8),
            _ => break,
        };
        if l_bp < min_bp {
            break;
        }
        let (rhs, new_rest) = parse_expr_bp(&rest[1..], r_bp)?;
        lhs = apply_binary(op, lhs, rhs)?;
        rest = new_rest;
    }

    Ok((lhs, rest))
}

fn apply_binary(op: &str, lhs: CondValue, rhs: CondValue) -> Result<CondValue, String> {
    use CondValue::*;
    Ok(match (op, lhs, rhs) {
        ("+", Num(a), Num(b)) => Num(a + b),
        ("-", Num(a), Num(b)) => Num(a - b),
        ("*", Num(a), Num(b)) => Num(a * b),
        ("/", Num(a), Num(b)) => Num(a / b),
        ("^", Num(a), Num(b)) => Num(a.powf(b)),
        ("<", Num(a), Num(b)) => Bool(a < b),
        ("<=", Num(a), Num(b)) => Bool(a <= b),
        (">", Num(a), Num(b)) => Bool(a > b),
        (">=", Num(a), Num(b)) => Bool(a >= b),
        ("==", Num(a), Num(b)) => Bool(a == b),
        ("==", Bool(a), Bool(b)) => Bool(a == b),
        ("!=", Num(a), Num(b)) => Bool(a != b),
        ("!=", Bool(a), Bool(b)) => Bool(a != b),
        _ => {
            return Err(format!(
                "operator '{op}' cannot be applied to {lhs:?} and {rhs:?}"
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::config::ParserConfig;
    use crate::error::ParseErrorKind;
    use crate::parser::Parser;
    use crate::types::{ExpressionValue, ObjectModel};
    use std::sync::Arc;

    struct StubModel;

    impl ObjectModel for StubModel {
        fn lookup(&self, name: &str) -> Option<ExpressionValue> {
            match name {
                "heat.current" => Some(ExpressionValue::Float(59.5)),
                "heat.target" => Some(ExpressionValue::Float(60.0)),
                "job.active" => Some(ExpressionValue::Bool(false)),
                "iterations" => Some(ExpressionValue::Int(2)),
                _ => None,
            }
        }
    }

    fn evaluate(condition: &str) -> Result<bool, crate::error::ParseError> {
        let mut p = Parser::new(ParserConfig::default()).with_object_model(Arc::new(StubModel));
        p.buf = format!("if {condition}").into_bytes();
        p.evaluate_condition(2, "if")
    }

    #[test]
    fn test_boolean_literals() {
        assert!(evaluate("true").unwrap());
        assert!(!evaluate("false").unwrap());
        assert!(!evaluate("!true").unwrap());
    }

    #[test]
    fn test_comparisons() {
        assert!(evaluate("1 < 2").unwrap());
        assert!(!evaluate("2 < 1").unwrap());
        assert!(evaluate("2 <= 2").unwrap());
        assert!(evaluate("3 > 2.5").unwrap());
        assert!(evaluate("2 >= 2").unwrap());
        assert!(evaluate("1.5 == 1.5").unwrap());
        assert!(evaluate("1 != 2").unwrap());
        assert!(evaluate("true == true").unwrap());
        assert!(evaluate("true != false").unwrap());
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert!(evaluate("1 + 2 * 3 == 7").unwrap());
        assert!(evaluate("(1 + 2) * 3 == 9").unwrap());
        assert!(evaluate("2 ^ 3 == 8").unwrap());
        assert!(evaluate("2 ^ 3 ^ 2 == 512").unwrap());
        assert!(evaluate("-1 + 2 == 1").unwrap());
        assert!(evaluate("10 / 4 == 2.5").unwrap());
    }

    #[test]
    fn test_variables_in_conditions() {
        assert!(evaluate("{heat.current} < {heat.target}").unwrap());
        assert!(evaluate("{iterations} < 3").unwrap());
        assert!(!evaluate("{job.active}").unwrap());
        assert!(evaluate("!{job.active}").unwrap());
    }

    #[test]
    fn test_failures_name_the_keyword() {
        for condition in ["", "1 + 2", "true ==", "1 < true", "$?", "{missing}", "(1"] {
            let e = evaluate(condition).unwrap_err();
            match e.kind {
                ParseErrorKind::ConditionEvaluationFailed { keyword, .. } => {
                    assert_eq!(keyword, "if", "{condition}")
                }
                other => panic!("{condition}: unexpected error {other:?}"),
            }
        }
    }
}
