//! Signature handling.
//!
//! Public keys and signatures arrive on the stack as hex. This module turns the decoded bytes into
//! curve objects and prepares the digest they’re checked against, so the opcodes only have to
//! deal with well-formed values.

use secp256k1::{ecdsa, PublicKey};
use thiserror::Error;

use crate::external::pubkey::PubKey;

/// The size of the digest that ECDSA signs over a 256-bit curve.
pub const DIGEST_SIZE: usize = 32;

/// Errors that occur when parsing public keys and signatures.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("public key couldn’t be parsed: {0}")]
    PubKey(secp256k1::Error),

    #[error("public key is neither a compressed nor an uncompressed encoding")]
    PubKeyType,

    #[error("signature isn’t a valid DER encoding: {0}")]
    SigDER(secp256k1::Error),

    #[error("signature s value is too high")]
    SigHighS,
}

/// Parse a public key.
///
/// With `is_strict`, only the 33-byte compressed and 65-byte uncompressed encodings are allowed.
pub fn decode_pub_key(vch_pub_key: &[u8], is_strict: bool) -> Result<PubKey, Error> {
    if is_strict && !PubKey::is_compressed_or_uncompressed(vch_pub_key) {
        Err(Error::PubKeyType)
    } else {
        PublicKey::from_slice(vch_pub_key)
            .map(PubKey)
            .map_err(Error::PubKey)
    }
}

/// This contains a validated ECDSA signature, ready to be checked against a digest. It’s an opaque
/// value, so we can ensure the signature is in low-S form.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    sig: ecdsa::Signature,
}

impl Decoded {
    /// Decodes a strict-DER ECDSA signature.
    ///
    /// High-S signatures are valid ECDSA, but the curve library only verifies the low-S form. If
    /// `require_low_s` is set they’re rejected, otherwise they’re normalized.
    pub fn from_bytes(vch_sig: &[u8], require_low_s: bool) -> Result<Self, Error> {
        let mut sig = ecdsa::Signature::from_der(vch_sig).map_err(Error::SigDER)?;
        if PubKey::check_low_s(&sig) {
            Ok(Decoded { sig })
        } else if require_low_s {
            Err(Error::SigHighS)
        } else {
            sig.normalize_s();
            Ok(Decoded { sig })
        }
    }

    /// Checks this signature over `digest` under `pub_key`.
    pub fn verify(&self, pub_key: &PubKey, digest: &[u8; DIGEST_SIZE]) -> bool {
        pub_key.verify(digest, &self.sig)
    }
}

/// Converts the signed-message bytes into the digest that signatures are checked against.
///
/// The bytes are used verbatim when they’re exactly [`DIGEST_SIZE`] long. ECDSA only uses the
/// leftmost bits of the digest, so longer messages are truncated and shorter ones are read as a
/// smaller big-endian integer (i.e., left-padded with zeros).
pub fn message_digest(msg: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut digest = [0; DIGEST_SIZE];
    if msg.len() >= DIGEST_SIZE {
        digest.copy_from_slice(&msg[..DIGEST_SIZE]);
    } else {
        digest[DIGEST_SIZE - msg.len()..].copy_from_slice(msg);
    }
    digest
}
