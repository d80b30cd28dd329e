//! Evaluation state shared by every opcode: the stack, the errors an opcode can raise, the flags
//! that adjust evaluation, and the signature checker.

use std::slice::Iter;

use thiserror::Error;

use crate::{external::pubkey::PubKey, num, signature, value::Value};

/// Any error that can happen while evaluating a single opcode.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug, Error)]
pub enum Error {
    #[error("expected {needed} stack elements, but only {available} available")]
    StackUnderflow { needed: usize, available: usize },

    #[error("stack element isn’t a number: {0}")]
    NotANumber(num::Error),

    #[error("stack element isn’t valid hex: {0}")]
    InvalidEncoding(hex::FromHexError),

    #[error("malformed key or signature: {0}")]
    MalformedCryptoInput(signature::Error),

    #[error("unsupported opcode: {0}")]
    UnsupportedOpcode(String),

    #[error("verify operation failed")]
    VerificationFailed,

    #[error("OP_RETURN encountered")]
    IntentionalHalt,

    #[error("public key count is negative: {0}")]
    PubKeyCount(i64),

    #[error("signature count is negative: {0}")]
    SigCount(i64),

    #[error("arithmetic result doesn’t fit in a 64-bit signed integer")]
    Overflow,
}

impl From<num::Error> for Error {
    fn from(value: num::Error) -> Self {
        Error::NotANumber(value)
    }
}

impl From<hex::FromHexError> for Error {
    fn from(value: hex::FromHexError) -> Self {
        Error::InvalidEncoding(value)
    }
}

impl From<signature::Error> for Error {
    fn from(value: signature::Error) -> Self {
        Error::MalformedCryptoInput(value)
    }
}

bitflags::bitflags! {
    /// Script evaluation flags
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Evaluating a public key that is not (0x04 + 64 bytes) or (0x02 or 0x03 + 32 bytes) by
        /// a checksig operation causes script failure.
        const StrictEnc = 1 << 1;

        /// Passing a signature with S > order/2 to a checksig operation causes script failure.
        /// Without this, such signatures are normalized before they’re checked.
        const LowS = 1 << 3;

        /// Using an opcode in the unlock script causes script failure, before anything is
        /// evaluated.
        const SigPushOnly = 1 << 5;

        /// Require that exactly one stack element remains after evaluation. This changes the
        /// success criterion from "at least one stack element must remain, and the top one must
        /// not be `0`" to "exactly one stack element must remain, and it must not be `0`".
        const CleanStack = 1 << 8;

        /// The flags used by [`crate::Script::verify`].
        const STANDARD = Self::CleanStack.bits();
    }
}

/// Checks signatures against whatever they’re meant to sign. Keys and signatures have already
/// been decoded by the time they get here, so a checker can only say yes or no.
pub trait SignatureChecker {
    fn check_sig(&self, _sig: &signature::Decoded, _pub_key: &PubKey) -> bool {
        false
    }
}

/// Rejects every signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NullSignatureChecker();

impl SignatureChecker for NullSignatureChecker {}

/// Checks signatures over a caller-supplied message. The same message is used for every
/// signature in an evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MessageSignatureChecker {
    digest: [u8; signature::DIGEST_SIZE],
}

impl MessageSignatureChecker {
    /// See [`signature::message_digest`] for how `signed_message` becomes a digest.
    pub fn new(signed_message: &[u8]) -> Self {
        MessageSignatureChecker {
            digest: signature::message_digest(signed_message),
        }
    }

    pub fn digest(&self) -> &[u8; signature::DIGEST_SIZE] {
        &self.digest
    }
}

impl SignatureChecker for MessageSignatureChecker {
    fn check_sig(&self, sig: &signature::Decoded, pub_key: &PubKey) -> bool {
        sig.verify(pub_key, &self.digest)
    }
}

/// The stack an evaluation runs on. The top is the end of the vector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack<T>(Vec<T>);

impl<T: Clone> Stack<T> {
    pub fn new() -> Self {
        Stack(vec![])
    }

    /// Fails unless at least `needed` elements are on the stack.
    pub fn check_len(&self, needed: usize) -> Result<(), Error> {
        let available = self.0.len();
        if needed <= available {
            Ok(())
        } else {
            Err(Error::StackUnderflow { needed, available })
        }
    }

    pub fn pop(&mut self) -> Result<T, Error> {
        self.0.pop().ok_or(Error::StackUnderflow {
            needed: 1,
            available: 0,
        })
    }

    pub fn push(&mut self, value: T) {
        self.0.push(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.0.iter()
    }

    pub fn last(&self) -> Result<&T, Error> {
        self.0.last().ok_or(Error::StackUnderflow {
            needed: 1,
            available: 0,
        })
    }
}

impl Stack<Value> {
    /// Pops the top element and reads it as a number.
    pub fn pop_int(&mut self) -> Result<i64, Error> {
        Ok(self.pop()?.to_num()?)
    }

    /// The text of every element, bottom first.
    pub fn snapshot(&self) -> Vec<String> {
        self.0.iter().map(|v| v.text().into_owned()).collect()
    }
}

impl<T> From<Vec<T>> for Stack<T> {
    fn from(value: Vec<T>) -> Self {
        Stack(value)
    }
}

pub(crate) fn unop<T: Clone>(
    stack: &mut Stack<T>,
    op: impl Fn(T) -> Result<T, Error>,
) -> Result<(), Error> {
    stack.check_len(1)?;
    let item = stack.pop()?;
    op(item).map(|res| stack.push(res))
}

/// Pops two elements and hands them to `op` in push order, so `x2` is the former top.
pub(crate) fn binfn<T: Clone, R>(
    stack: &mut Stack<T>,
    op: impl Fn(T, T) -> Result<R, Error>,
) -> Result<R, Error> {
    stack.check_len(2)?;
    let x2 = stack.pop()?;
    let x1 = stack.pop()?;
    op(x1, x2)
}

pub(crate) fn binbasic_num<R>(
    stack: &mut Stack<Value>,
    op: impl Fn(i64, i64) -> Result<R, Error>,
) -> Result<R, Error> {
    binfn(stack, |x1, x2| {
        let bn2 = x2.to_num()?;
        let bn1 = x1.to_num()?;
        op(bn1, bn2)
    })
}

pub(crate) fn binop<T: Clone>(
    stack: &mut Stack<T>,
    op: impl Fn(T, T) -> Result<T, Error>,
) -> Result<(), Error> {
    binfn(stack, op).map(|res| stack.push(res))
}
