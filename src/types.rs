//! Value types shared between the parser and its collaborators.

use std::fmt;
use std::net::Ipv4Addr;

/// A value produced by evaluating a `{...}` expression.
///
/// `Float2`/`Float3` carry the same `f32` payload as `Float`; the variant
/// only records how many decimals to print when the value is rendered as a
/// string.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionValue {
    Float(f32),
    Float2(f32),
    Float3(f32),
    Int(i32),
    UInt(u32),
    Bool(bool),
    Str(String),
    IPv4(Ipv4Addr),
}

/// Identifies one stepper driver, optionally on a CAN expansion board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverId {
    pub board_address: u8,
    pub local_driver: u8,
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.board_address != 0 {
            write!(f, "{}.{}", self.board_address, self.local_driver)
        } else {
            write!(f, "{}", self.local_driver)
        }
    }
}

/// Resolver for variable names appearing in `{...}` expressions.
///
/// The parser owns no variables itself; names are looked up through this
/// seam. Return `None` for names you do not recognize.
pub trait ObjectModel: Send + Sync {
    fn lookup(&self, name: &str) -> Option<ExpressionValue>;
}

/// Object model that knows no variables. Every `{...}` lookup fails.
pub struct NullObjectModel;

impl ObjectModel for NullObjectModel {
    fn lookup(&self, _name: &str) -> Option<ExpressionValue> {
        None
    }
}
