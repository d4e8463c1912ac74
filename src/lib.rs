//! Shamir three-pass channel and GOST R 34.10-94 signature library.
//!
//! This crate contains a small, self-contained implementation of the Shamir no-key
//! (three-pass) protocol, run byte by byte between two in-process endpoints, together
//! with a GOST R 34.10-94 style signer and the binary framing that joins the two.

pub mod config;
pub mod error;
pub mod framing;
pub mod gost;
pub mod keygen;
pub mod session;
pub mod shamir3pass;
pub mod utils;

#[cfg(test)]
pub mod tests;

pub use crate::config::{CipherScheme, SessionConfig, SignatureScheme, Timeouts};
pub use crate::error::CryptorError;
pub use crate::gost::{GostPublicKey, GostSigner, Signature, Verification};
pub use crate::keygen::{
    generate_dh_parameters, generate_gost_parameters, generate_shamir_keypair, random_in_range,
    random_integer, DhParameters, GostParameters, ShamirKeypair,
};
pub use crate::session::{Received, Session};
pub use crate::shamir3pass::{Endpoint, EndpointState, Shamir3Pass, ShamirChannel};
pub use crate::utils::{decode_biguint_b64u, encode_biguint_b64u};
