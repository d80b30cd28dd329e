//! Evaluation of human-readable, Bitcoin-style transaction scripts.
//!
//! An output is locked by a script, and an input spends it by providing an unlock script. The
//! unlock script runs first, and the lock script then runs on the stack it left behind. The input
//! is authorized if exactly one element remains and that element isn’t `0`.
//!
//! Scripts are whitespace-separated tokens. A token starting with `OP_` names an opcode, anything
//! else is pushed verbatim. Depending on the opcode that consumes it, an element is read as a
//! base 10 number (a `0x`, `0o`, or `0b` prefix is also accepted) or as hex-encoded bytes.
//!
//! ```
//! use txscript::Script;
//!
//! let script = Script::from_asm("2 3", "OP_ADD 5 OP_EQUAL");
//! assert!(script.verify(&[]));
//! ```

mod external;
pub mod interpreter;
pub mod num;
pub mod opcode;
pub mod script;
pub mod signature;
pub mod value;

#[cfg(any(test, feature = "test-dependencies"))]
pub mod test_vectors;

use tracing::debug;

pub use external::pubkey::PubKey;
pub use interpreter::{Flags, MessageSignatureChecker, SignatureChecker};

/// An error annotated with the script component it occurred in.
pub type AnnError = (script::ComponentType, script::Error);

/// An unlock script paired with the lock script it’s meant to satisfy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    /// Provided by the spending input.
    pub unlock: script::Code,
    /// Attached to the output being spent.
    pub lock: script::Code,
}

impl Script {
    /// Build a script from the human-readable forms of its components.
    pub fn from_asm(unlock: &str, lock: &str) -> Self {
        Script {
            unlock: script::Code::from_asm(unlock),
            lock: script::Code::from_asm(lock),
        }
    }

    /// Statically analyze both components. That is, this identifies potential runtime errors
    /// without needing to evaluate the script.
    pub fn analyze(&self) -> Result<(), (script::ComponentType, Vec<interpreter::Error>)> {
        self.unlock
            .analyze()
            .map_err(|errs| (script::ComponentType::Unlock, errs))?;
        self.lock
            .analyze()
            .map_err(|errs| (script::ComponentType::Lock, errs))
    }

    /// Evaluate an entire script.
    ///
    /// `Ok(false)` means evaluation finished, but with `0` as the result.
    pub fn eval(
        &self,
        flags: interpreter::Flags,
        checker: &dyn interpreter::SignatureChecker,
    ) -> Result<bool, AnnError> {
        let result = script::eval_script(&self.unlock, &self.lock, flags, checker);
        match &result {
            Ok(true) => (),
            Ok(false) => debug!("script rejected: evaluated to 0"),
            Err((component, err)) => debug!(?component, %err, "script rejected"),
        }
        result
    }

    /// Returns true if the unlock script authorizes spending with signatures over
    /// `signed_message`. Every failure is just `false`. Use [`Script::eval`] to find out why.
    pub fn verify(&self, signed_message: &[u8]) -> bool {
        self.eval(
            interpreter::Flags::STANDARD,
            &MessageSignatureChecker::new(signed_message),
        )
        .unwrap_or(false)
    }
}

/// Utilities useful for tests in other modules and crates.
#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing {
    use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

    use crate::signature;

    /// A secp256k1 key pair.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct KeyPair {
        /// Signs.
        pub secret_key: SecretKey,
        /// Verifies.
        pub public_key: PublicKey,
    }

    /// A fixed key pair, so tests are reproducible. Different seeds give different keys.
    pub fn key_pair(seed: u8) -> KeyPair {
        let mut secret = [0x11; 32];
        secret[31] = seed;
        let secret_key = SecretKey::from_slice(&secret).expect("well below the curve order");
        KeyPair {
            secret_key,
            public_key: PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret_key),
        }
    }

    /// A DER-encoded signature over `signed_message`, as the opcodes expect it.
    pub fn sign(key: &KeyPair, signed_message: &[u8]) -> Vec<u8> {
        let digest = Message::from_digest(signature::message_digest(signed_message));
        Secp256k1::signing_only()
            .sign_ecdsa(&digest, &key.secret_key)
            .serialize_der()
            .to_vec()
    }

    /// [`sign`], as a script token.
    pub fn sig_hex(key: &KeyPair, signed_message: &[u8]) -> String {
        hex::encode(sign(key, signed_message))
    }

    /// The compressed public key, as a script token.
    pub fn pub_key_hex(key: &KeyPair) -> String {
        hex::encode(key.public_key.serialize())
    }

    /// A lock script requiring `required` signatures from `keys`.
    pub fn multisig_lock(required: usize, keys: &[KeyPair]) -> String {
        let pub_keys: Vec<_> = keys.iter().map(pub_key_hex).collect();
        format!(
            "{} {} {} OP_CHECKMULTISIG",
            required,
            pub_keys.join(" "),
            keys.len()
        )
    }

    /// An unlock script for [`multisig_lock`], given the signers in order.
    pub fn multisig_unlock(signers: &[KeyPair], signed_message: &[u8]) -> String {
        signers
            .iter()
            .map(|key| sig_hex(key, signed_message))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
