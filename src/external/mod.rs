//! Wrappers around the curve library.

pub mod pubkey;
