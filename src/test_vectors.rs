//! End-to-end cases. Each one pairs an unlock script with a lock script and the outcome of
//! evaluating them together.

use crate::{
    interpreter::{Error, Flags, MessageSignatureChecker},
    num,
    opcode::Operation::{self, *},
    script::{self, ComponentType::*, Token},
    signature, testing, AnnError, Script,
};

/// The message every signature in the vectors is made over.
pub const SIGNED_MESSAGE: &[u8] = b"txscript test vectors";

#[derive(Debug)]
pub struct TestVector {
    pub name: &'static str,
    pub unlock: String,
    pub lock: String,
    pub flags: Flags,
    pub result: Result<bool, AnnError>,
}

impl TestVector {
    /// Panics if evaluation doesn’t produce the expected result.
    pub fn run(&self) {
        let script = Script::from_asm(&self.unlock, &self.lock);
        let actual = script.eval(self.flags, &MessageSignatureChecker::new(SIGNED_MESSAGE));
        assert_eq!(actual, self.result, "{}: {:?}", self.name, self);
        if self.flags == Flags::STANDARD {
            assert_eq!(
                script.verify(SIGNED_MESSAGE),
                self.result == Ok(true),
                "{}",
                self.name
            );
        }
    }
}

fn at(op: Operation, err: Error) -> script::Error {
    script::Error::Interpreter(Some(Token::Operation(op)), err)
}

fn standard(
    name: &'static str,
    unlock: impl Into<String>,
    lock: impl Into<String>,
    result: Result<bool, AnnError>,
) -> TestVector {
    TestVector {
        name,
        unlock: unlock.into(),
        lock: lock.into(),
        flags: Flags::STANDARD,
        result,
    }
}

pub fn test_vectors() -> Vec<TestVector> {
    let keys = [
        testing::key_pair(1),
        testing::key_pair(2),
        testing::key_pair(3),
    ];
    let sig = |i: usize| testing::sig_hex(&keys[i], SIGNED_MESSAGE);
    let pk = |i: usize| testing::pub_key_hex(&keys[i]);
    let two_of_three = testing::multisig_lock(2, &keys);

    vec![
        standard("add and compare", "2 3", "OP_ADD 5 OP_EQUAL", Ok(true)),
        standard(
            "failed equal verify",
            "2 1",
            "OP_ADD 5 OP_EQUALVERIFY OP_TRUE",
            Err((Lock, at(OP_EQUALVERIFY, Error::VerificationFailed))),
        ),
        standard("radix literals", "0x10 0b1", "OP_ADD 17 OP_EQUAL", Ok(true)),
        standard("subtraction order", "10 3", "OP_SUB 7 OP_EQUAL", Ok(true)),
        standard(
            "overflow",
            "9223372036854775807 1",
            "OP_ADD",
            Err((Lock, at(OP_ADD, Error::Overflow))),
        ),
        standard(
            "not a number",
            "abc 1",
            "OP_ADD",
            Err((
                Lock,
                at(
                    OP_ADD,
                    Error::NotANumber(num::Error::InvalidDigit("abc".to_owned(), 10)),
                ),
            )),
        ),
        standard("zero result", "1", "OP_NOT", Ok(false)),
        standard(
            "too many results",
            "1 2",
            "OP_DUP",
            Err((Lock, script::Error::CleanStack(3))),
        ),
        TestVector {
            name: "too many results without a clean stack",
            unlock: "1 2".to_owned(),
            lock: "OP_DUP".to_owned(),
            flags: Flags::empty(),
            result: Ok(true),
        },
        standard(
            "empty unlock",
            "",
            "OP_TRUE",
            Err((Unlock, script::Error::EmptyStack)),
        ),
        standard(
            "empty result",
            "1",
            "OP_DROP",
            Err((Lock, script::Error::EmptyStack)),
        ),
        standard(
            "return",
            "1",
            "OP_RETURN",
            Err((Lock, at(OP_RETURN, Error::IntentionalHalt))),
        ),
        standard(
            "unsupported opcode",
            "1",
            "OP_MUL",
            Err((
                Lock,
                script::Error::Interpreter(
                    Some(Token::Unknown("OP_MUL".to_owned())),
                    Error::UnsupportedOpcode("OP_MUL".to_owned()),
                ),
            )),
        ),
        TestVector {
            name: "unlock with an opcode",
            unlock: "1 OP_DUP".to_owned(),
            lock: "OP_EQUAL".to_owned(),
            flags: Flags::STANDARD | Flags::SigPushOnly,
            result: Err((Unlock, script::Error::SigPushOnly)),
        },
        standard(
            "hash preimage",
            "616263",
            "OP_SHA256 ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad OP_EQUAL",
            Ok(true),
        ),
        standard(
            "odd-length hex",
            "abc",
            "OP_SHA256",
            Err((
                Lock,
                at(OP_SHA256, Error::InvalidEncoding(hex::FromHexError::OddLength)),
            )),
        ),
        standard(
            "checksig",
            format!("{} {}", sig(0), pk(0)),
            "OP_CHECKSIG",
            Ok(true),
        ),
        standard(
            "checksig with the wrong key",
            format!("{} {}", sig(0), pk(1)),
            "OP_CHECKSIG",
            Ok(false),
        ),
        standard(
            "checksigverify with the wrong key",
            format!("{} {}", sig(0), pk(1)),
            "OP_CHECKSIGVERIFY OP_TRUE",
            Err((Lock, at(OP_CHECKSIGVERIFY, Error::VerificationFailed))),
        ),
        standard(
            "checksig with a truncated key",
            sig(0),
            "02 OP_CHECKSIG",
            Err((
                Lock,
                at(
                    OP_CHECKSIG,
                    Error::MalformedCryptoInput(signature::Error::PubKey(
                        secp256k1::Error::InvalidPublicKey,
                    )),
                ),
            )),
        ),
        standard(
            "two of three",
            format!("{} {}", sig(0), sig(1)),
            two_of_three.clone(),
            Ok(true),
        ),
        standard(
            "two of three with a repeated signer",
            format!("{} {}", sig(2), sig(2)),
            two_of_three.clone(),
            Ok(true),
        ),
        standard(
            "two of three with one signature",
            sig(0),
            two_of_three,
            Err((
                Lock,
                at(
                    OP_CHECKMULTISIG,
                    Error::StackUnderflow {
                        needed: 2,
                        available: 1,
                    },
                ),
            )),
        ),
        standard("zero of zero", "1", "OP_DROP 0 0 OP_CHECKMULTISIG", Ok(true)),
    ]
}
