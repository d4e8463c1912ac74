//! Library configuration and protocol parameters.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CryptorError;

/// Minimum acceptable size (in bits) for a Shamir modulus `p`; 9 bits guarantees `p > 255`.
pub const SHAMIR_MIN_PRIME_BITS: usize = 9;

/// Default size (in bits) of the Shamir modulus.
pub const SHAMIR_DEFAULT_PRIME_BITS: usize = 256;

/// Default GOST R 34.10-94 modulus sizes.
pub const GOST_DEFAULT_P_BITS: usize = 512;
pub const GOST_DEFAULT_Q_BITS: usize = 256;

/// Upper bit length used by range sampling when no maximum is given.
pub const MAX_RANDOM_BITS: usize = 1024;

/// Primality certainty: error probability is at most `2^-PRIMALITY_CERTAINTY`.
pub const PRIMALITY_CERTAINTY: u32 = 100;

/// Maximum candidates drawn when looking for a prime of a fixed bit length.
pub const PRIME_GEN_MAX_ATTEMPTS: usize = 100_000;

/// Nonces drawn per signature before the parameters are deemed unusable.
pub const SIGNATURE_MAX_ATTEMPTS: usize = 1_000;

/// Default multiplier `B` in `p = q*B + 1` for Diffie-Hellman groups.
pub const DH_DEFAULT_MULTIPLIER: u32 = 2;

pub const DEFAULT_SEARCH_BUDGET: Duration = Duration::from_secs(10);
pub const DEFAULT_GENERATOR_BUDGET: Duration = Duration::from_millis(100);
pub const DEFAULT_DH_BUDGET: Duration = Duration::from_secs(5);

/// Wall-clock budgets for the probabilistic searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// `random_in_range` resampling.
    pub range: Duration,
    /// Shamir exponent search (`gcd(c, p-1) = 1`).
    pub shamir_keys: Duration,
    /// Outer GOST search over `q` and `b`.
    pub gost_parameters: Duration,
    /// Inner GOST search for the generator `a`.
    pub gost_generator: Duration,
    /// Each Diffie-Hellman search.
    pub dh_search: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            range: DEFAULT_SEARCH_BUDGET,
            shamir_keys: DEFAULT_SEARCH_BUDGET,
            gost_parameters: DEFAULT_SEARCH_BUDGET,
            gost_generator: DEFAULT_GENERATOR_BUDGET,
            dh_search: DEFAULT_DH_BUDGET,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CipherScheme {
    Shamir,
    DiffieHellman,
}

impl CipherScheme {
    pub fn code(&self) -> &'static str {
        match self {
            CipherScheme::Shamir => "shamir",
            CipherScheme::DiffieHellman => "diffie-hellman",
        }
    }
}

impl FromStr for CipherScheme {
    type Err = CryptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shamir" | "sha" => Ok(CipherScheme::Shamir),
            "diffie-hellman" | "dh" => Ok(CipherScheme::DiffieHellman),
            other => Err(CryptorError::InvalidParameters(format!(
                "unknown cipher scheme `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for CipherScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureScheme {
    Gost341094,
}

impl SignatureScheme {
    pub fn code(&self) -> &'static str {
        match self {
            SignatureScheme::Gost341094 => "gost34.10-94",
        }
    }
}

impl FromStr for SignatureScheme {
    type Err = CryptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gost34.10-94" => Ok(SignatureScheme::Gost341094),
            other => Err(CryptorError::InvalidParameters(format!(
                "unknown signature scheme `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Everything a [`Session`](crate::session::Session) needs to be built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub cipher: CipherScheme,
    pub shamir_p_bits: usize,
    /// `None` sends the message unsigned.
    pub signature: Option<SignatureScheme>,
    pub gost_p_bits: usize,
    pub gost_q_bits: usize,
    pub timeouts: Timeouts,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cipher: CipherScheme::Shamir,
            shamir_p_bits: SHAMIR_DEFAULT_PRIME_BITS,
            signature: None,
            gost_p_bits: GOST_DEFAULT_P_BITS,
            gost_q_bits: GOST_DEFAULT_Q_BITS,
            timeouts: Timeouts::default(),
        }
    }
}

impl SessionConfig {
    /// Reject bit lengths that could never produce a working channel or signer.
    pub fn validate(&self) -> Result<(), CryptorError> {
        if self.shamir_p_bits < SHAMIR_MIN_PRIME_BITS {
            return Err(CryptorError::PrimeTooSmall {
                bits: self.shamir_p_bits,
                min_bits: SHAMIR_MIN_PRIME_BITS,
            });
        }
        if self.signature.is_some() {
            validate_gost_lengths(self.gost_p_bits, self.gost_q_bits)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_gost_lengths(p_bits: usize, q_bits: usize) -> Result<(), CryptorError> {
    if q_bits < 2 {
        return Err(CryptorError::InvalidParameters(format!(
            "q must have at least 2 bits, got {}",
            q_bits
        )));
    }
    // p = b*q + 1 with b >= 2 needs at least one more bit than q.
    if p_bits <= q_bits {
        return Err(CryptorError::InvalidParameters(format!(
            "p length ({} bits) must exceed q length ({} bits)",
            p_bits, q_bits
        )));
    }
    Ok(())
}
