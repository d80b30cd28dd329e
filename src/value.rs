//! Stack elements.
//!
//! Scripts are human-readable, so every element has a textual form: numbers are base 10 and byte
//! strings are hex. Nothing on the stack records which of the two an element is meant to be – that
//! is decided by the opcode that consumes it. [`Value`] keeps track of how an element was
//! _produced_, so opcodes that produce numbers or bytes don’t have to round-trip through text, but
//! equality and every conversion behave exactly as if the element were its text.

use std::borrow::Cow;
use std::fmt;

use crate::num;

/// The marker that makes a token an opcode rather than a literal.
pub const OPCODE_PREFIX: &str = "OP_";

/// Returns true if `token` has the shape of an opcode (whether or not the opcode exists).
pub fn is_opcode(token: &str) -> bool {
    token.len() > OPCODE_PREFIX.len() && token.starts_with(OPCODE_PREFIX)
}

/// A single stack element.
#[derive(Clone, Debug)]
pub enum Value {
    /// A literal pushed verbatim from a script.
    Literal(String),
    /// The result of an arithmetic or boolean operation.
    Num(i64),
    /// The result of a hash operation.
    Bytes(Vec<u8>),
}

impl Value {
    /// The canonical “true” element.
    pub const TRUE: Value = Value::Num(1);

    /// The canonical “false” element.
    pub const FALSE: Value = Value::Num(0);

    /// Returns the canonical element for `b`.
    pub fn from_bool(b: bool) -> Self {
        if b {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    /// The textual form of the element. Numbers are base 10, bytes are lower-case hex.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Value::Literal(s) => Cow::Borrowed(s),
            Value::Num(n) => Cow::Owned(num::serialize(*n)),
            Value::Bytes(b) => Cow::Owned(hex::encode(b)),
        }
    }

    /// Interpret the element as a number.
    pub fn to_num(&self) -> Result<i64, num::Error> {
        match self {
            Value::Num(n) => Ok(*n),
            _ => num::parse(&self.text()),
        }
    }

    /// Interpret the element as hex-encoded bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        match self {
            Value::Bytes(b) => Ok(b.clone()),
            _ => hex::decode(self.text().as_ref()),
        }
    }

    /// Only the exact text `1` is true. Anything else – including `01`, `0x1`, or `2` – is false.
    pub fn is_true(&self) -> bool {
        self.text() == "1"
    }

    /// Only the exact text `0` is false in a final result. This is deliberately not `!is_true()`.
    pub fn is_false(&self) -> bool {
        self.text() == "0"
    }

    /// See [`is_opcode`].
    pub fn is_opcode(&self) -> bool {
        match self {
            Value::Literal(s) => is_opcode(s),
            // Neither decimal nor lower-case hex can start with the opcode prefix.
            Value::Num(_) | Value::Bytes(_) => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => self.text() == other.text(),
        }
    }
}

impl Eq for Value {}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.text() == *other
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Literal(value.to_owned())
    }
}
