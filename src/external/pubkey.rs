use secp256k1::{ecdsa, Message, PublicKey, Secp256k1};

/// A parsed secp256k1 public key.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PubKey(pub PublicKey);

impl PubKey {
    pub const PUBLIC_KEY_SIZE: usize = 65;
    pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;

    /// Check that the encoding is a plain SEC1 compressed or uncompressed key. The curve library
    /// also accepts the “hybrid” encoding, which this excludes.
    pub fn is_compressed_or_uncompressed(vch_pub_key: &[u8]) -> bool {
        match vch_pub_key.first() {
            Some(0x04) => vch_pub_key.len() == Self::PUBLIC_KEY_SIZE,
            Some(0x02 | 0x03) => vch_pub_key.len() == Self::COMPRESSED_PUBLIC_KEY_SIZE,
            _ => false,
        }
    }

    /// Verify a signature over a 32-byte digest.
    ///
    /// The curve library only accepts low-S signatures, so callers that want to accept both forms
    /// need to normalize first.
    pub fn verify(&self, hash: &[u8; 32], sig: &ecdsa::Signature) -> bool {
        let secp = Secp256k1::verification_only();
        secp.verify_ecdsa(&Message::from_digest(*hash), sig, &self.0)
            .is_ok()
    }

    pub fn check_low_s(sig: &ecdsa::Signature) -> bool {
        let mut check = *sig;
        check.normalize_s();
        *sig == check
    }
}
