#![allow(non_camel_case_types)]

use std::fmt;

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::{
    external::pubkey::PubKey,
    interpreter::{self, binbasic_num, binfn, binop, unop, Error, Stack},
    signature,
    value::Value,
};

/// Every operation a script can name. Tokens that aren’t opcodes are pushed as literals, so
/// there’s no push-value counterpart here.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Operation {
    // constants
    OP_FALSE,
    OP_TRUE,

    // control
    OP_VERIFY,
    OP_RETURN,

    // stack ops
    OP_DROP,
    OP_DUP,

    // bit logic
    OP_EQUAL,
    OP_EQUALVERIFY,

    // numeric
    OP_NOT,
    OP_ADD,
    OP_SUB,
    OP_BOOLAND,
    OP_BOOLOR,

    // crypto
    OP_RIPEMD160,
    OP_SHA1,
    OP_SHA256,
    OP_HASH160,
    OP_HASH256,
    OP_CHECKSIG,
    OP_CHECKSIGVERIFY,
    OP_CHECKMULTISIG,
    OP_CHECKMULTISIGVERIFY,
}

use Operation::*;

impl Operation {
    /// The full registry, in declaration order.
    pub const ALL: [Operation; 22] = [
        OP_FALSE,
        OP_TRUE,
        OP_VERIFY,
        OP_RETURN,
        OP_DROP,
        OP_DUP,
        OP_EQUAL,
        OP_EQUALVERIFY,
        OP_NOT,
        OP_ADD,
        OP_SUB,
        OP_BOOLAND,
        OP_BOOLOR,
        OP_RIPEMD160,
        OP_SHA1,
        OP_SHA256,
        OP_HASH160,
        OP_HASH256,
        OP_CHECKSIG,
        OP_CHECKSIGVERIFY,
        OP_CHECKMULTISIG,
        OP_CHECKMULTISIGVERIFY,
    ];

    /// The token that names this operation in a script.
    pub fn name(&self) -> &'static str {
        match self {
            OP_FALSE => "OP_FALSE",
            OP_TRUE => "OP_TRUE",
            OP_VERIFY => "OP_VERIFY",
            OP_RETURN => "OP_RETURN",
            OP_DROP => "OP_DROP",
            OP_DUP => "OP_DUP",
            OP_EQUAL => "OP_EQUAL",
            OP_EQUALVERIFY => "OP_EQUALVERIFY",
            OP_NOT => "OP_NOT",
            OP_ADD => "OP_ADD",
            OP_SUB => "OP_SUB",
            OP_BOOLAND => "OP_BOOLAND",
            OP_BOOLOR => "OP_BOOLOR",
            OP_RIPEMD160 => "OP_RIPEMD160",
            OP_SHA1 => "OP_SHA1",
            OP_SHA256 => "OP_SHA256",
            OP_HASH160 => "OP_HASH160",
            OP_HASH256 => "OP_HASH256",
            OP_CHECKSIG => "OP_CHECKSIG",
            OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY",
            OP_CHECKMULTISIG => "OP_CHECKMULTISIG",
            OP_CHECKMULTISIGVERIFY => "OP_CHECKMULTISIGVERIFY",
        }
    }

    /// Looks up an opcode token. `OP_0` and `OP_1` are accepted as the usual aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "OP_0" => Some(OP_FALSE),
            "OP_1" => Some(OP_TRUE),
            _ => Self::ALL.into_iter().find(|op| op.name() == name),
        }
    }

    /// Apply the operation to the stack.
    ///
    /// On failure, the stack is left in whatever state the operation reached.
    pub fn eval(
        &self,
        flags: interpreter::Flags,
        checker: &dyn interpreter::SignatureChecker,
        stack: &mut Stack<Value>,
    ) -> Result<(), Error> {
        match self {
            OP_FALSE => stack.push(Value::FALSE),
            OP_TRUE => stack.push(Value::TRUE),

            OP_VERIFY => unfn(stack, |x| verify(x.is_true()))?,

            OP_RETURN => return Err(Error::IntentionalHalt),

            // Both of these quietly do nothing on an empty stack.
            OP_DROP => {
                if !stack.is_empty() {
                    stack.pop()?;
                }
            }
            OP_DUP => {
                if let Ok(top) = stack.last().cloned() {
                    stack.push(top)
                }
            }

            OP_EQUAL => binop(stack, |x1, x2| Ok(Value::from_bool(x1 == x2)))?,
            OP_EQUALVERIFY => binfn(stack, |x1, x2| verify(x1 == x2))?,

            OP_NOT => unop(stack, |x| Ok(Value::from_bool(x.is_false())))?,
            OP_ADD => {
                let sum = binbasic_num(stack, |x1, x2| {
                    x1.checked_add(x2).ok_or(Error::Overflow)
                })?;
                stack.push(Value::Num(sum))
            }
            OP_SUB => {
                let difference = binbasic_num(stack, |x1, x2| {
                    x1.checked_sub(x2).ok_or(Error::Overflow)
                })?;
                stack.push(Value::Num(difference))
            }
            OP_BOOLAND => binop(stack, |x1, x2| {
                Ok(Value::from_bool(x1.is_true() && x2.is_true()))
            })?,
            OP_BOOLOR => binop(stack, |x1, x2| {
                Ok(Value::from_bool(x1.is_true() || x2.is_true()))
            })?,

            OP_RIPEMD160 => hash(stack, |vch| Ripemd160::digest(vch).to_vec())?,
            OP_SHA1 => hash(stack, |vch| Sha1::digest(vch).to_vec())?,
            OP_SHA256 => hash(stack, |vch| Sha256::digest(vch).to_vec())?,
            OP_HASH160 => hash(stack, |vch| {
                Ripemd160::digest(Sha256::digest(vch)).to_vec()
            })?,
            OP_HASH256 => hash(stack, |vch| {
                Sha256::digest(Sha256::digest(vch)).to_vec()
            })?,

            OP_CHECKSIG => {
                let success = check_sig(flags, checker, stack)?;
                stack.push(Value::from_bool(success))
            }
            OP_CHECKSIGVERIFY => verify(check_sig(flags, checker, stack)?)?,
            OP_CHECKMULTISIG => {
                let success = check_multisig(flags, checker, stack)?;
                stack.push(Value::from_bool(success))
            }
            OP_CHECKMULTISIGVERIFY => verify(check_multisig(flags, checker, stack)?)?,
        }
        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn verify(success: bool) -> Result<(), Error> {
    if success {
        Ok(())
    } else {
        Err(Error::VerificationFailed)
    }
}

/// Like [`unop`], but consumes the element without pushing anything back.
fn unfn<R>(stack: &mut Stack<Value>, op: impl Fn(Value) -> Result<R, Error>) -> Result<R, Error> {
    stack.check_len(1)?;
    op(stack.pop()?)
}

fn hash(stack: &mut Stack<Value>, digest: impl Fn(&[u8]) -> Vec<u8>) -> Result<(), Error> {
    unop(stack, |x| Ok(Value::Bytes(digest(&x.to_bytes()?))))
}

fn decode_pub_key(flags: interpreter::Flags, x: &Value) -> Result<PubKey, Error> {
    Ok(signature::decode_pub_key(
        &x.to_bytes()?,
        flags.contains(interpreter::Flags::StrictEnc),
    )?)
}

fn decode_sig(flags: interpreter::Flags, x: &Value) -> Result<signature::Decoded, Error> {
    Ok(signature::Decoded::from_bytes(
        &x.to_bytes()?,
        flags.contains(interpreter::Flags::LowS),
    )?)
}

/// Pops a public key, then a signature. A key or signature that can’t be decoded is an error,
/// while one that simply doesn’t verify is `Ok(false)`.
fn check_sig(
    flags: interpreter::Flags,
    checker: &dyn interpreter::SignatureChecker,
    stack: &mut Stack<Value>,
) -> Result<bool, Error> {
    stack.check_len(2)?;
    let vch_pub_key = stack.pop()?;
    let vch_sig = stack.pop()?;
    let pub_key = decode_pub_key(flags, &vch_pub_key)?;
    let sig = decode_sig(flags, &vch_sig)?;
    Ok(checker.check_sig(&sig, &pub_key))
}

/// Pops a key count, that many keys, a signature count, then that many signatures. Every
/// signature has to verify against at least one of the keys. Keys aren’t used up, so one key may
/// satisfy several signatures.
fn check_multisig(
    flags: interpreter::Flags,
    checker: &dyn interpreter::SignatureChecker,
    stack: &mut Stack<Value>,
) -> Result<bool, Error> {
    let keys_count = stack.pop_int()?;
    let keys_count = usize::try_from(keys_count).map_err(|_| Error::PubKeyCount(keys_count))?;
    stack.check_len(keys_count)?;
    let pub_keys = (0..keys_count)
        .map(|_| decode_pub_key(flags, &stack.pop()?))
        .collect::<Result<Vec<_>, _>>()?;

    let sigs_count = stack.pop_int()?;
    let sigs_count = usize::try_from(sigs_count).map_err(|_| Error::SigCount(sigs_count))?;
    stack.check_len(sigs_count)?;
    let sigs = (0..sigs_count)
        .map(|_| decode_sig(flags, &stack.pop()?))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sigs.iter().all(|sig| {
        pub_keys
            .iter()
            .any(|pub_key| checker.check_sig(sig, pub_key))
    }))
}
