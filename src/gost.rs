//! DSA-style signatures after GOST R 34.10-94.
//!
//! A signed message is the length-framed payload followed by `r` and `s`, each as a
//! length-prefixed big-endian two's-complement integer:
//!
//! ```text
//! u32 len ‖ payload ‖ u32 len(r) ‖ r ‖ u32 len(s) ‖ s
//! ```
//!
//! The digest covers the framed payload (`u32 len ‖ payload`).

use log::{debug, info};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};

use crate::config::{Timeouts, PRIMALITY_CERTAINTY, SIGNATURE_MAX_ATTEMPTS};
use crate::error::CryptorError;
use crate::framing::{self, put_chunk, FrameReader};
pub use crate::keygen::GostParameters;
use crate::keygen::generate_gost_parameters;
use crate::utils::{
    decode_biguint_b64u, encode_biguint_b64u, is_probably_prime, mod_inverse, random_biguint_below,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r: BigUint,
    pub s: BigUint,
}

impl Signature {
    /// Append `r` and `s` in wire form.
    pub fn append_to(&self, out: &mut Vec<u8>) -> Result<(), CryptorError> {
        put_chunk(out, &to_signed_bytes(&self.r))?;
        put_chunk(out, &to_signed_bytes(&self.s))
    }
}

/// Outcome of a verification. An invalid signature still yields the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    pub payload: Vec<u8>,
    pub valid: bool,
}

/// Public verification material: `(p, q, a)` and `y = a^x mod p`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GostPublicKey {
    pub p: BigUint,
    pub q: BigUint,
    pub a: BigUint,
    pub y: BigUint,
}

impl GostPublicKey {
    /// Export as `p.q.a.y`, each part base64url (unpadded).
    pub fn to_b64u(&self) -> String {
        [&self.p, &self.q, &self.a, &self.y]
            .iter()
            .map(|x| encode_biguint_b64u(x))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn from_b64u(s: &str) -> Result<Self, CryptorError> {
        let parts = s
            .split('.')
            .map(decode_biguint_b64u)
            .collect::<Result<Vec<_>, _>>()?;
        let key = match <[BigUint; 4]>::try_from(parts) {
            Ok([p, q, a, y]) => Self { p, q, a, y },
            Err(parts) => {
                return Err(CryptorError::InvalidEncoding(format!(
                    "expected 4 key components, got {}",
                    parts.len()
                )))
            }
        };
        key.validate().map_err(|e| match e {
            CryptorError::InvalidParameters(msg) => CryptorError::InvalidEncoding(msg),
            other => other,
        })?;
        Ok(key)
    }

    /// Check the domain parameters and that `0 < y < p`.
    pub fn validate(&self) -> Result<(), CryptorError> {
        validate_domain(&self.p, &self.q, &self.a)?;
        if self.y.is_zero() || self.y >= self.p {
            return Err(CryptorError::InvalidParameters(format!(
                "public value y = {} is outside (0, p)",
                self.y
            )));
        }
        Ok(())
    }

    /// Parse a signed message and check its signature.
    ///
    /// Truncated input is an error; a wrong or out-of-range signature is not.
    pub fn verify(&self, signed: &[u8]) -> Result<Verification, CryptorError> {
        info!("GOST R34.10-94: signature verification...");

        let mut reader = FrameReader::new(signed);
        let payload = reader.read_chunk()?;
        let framed = reader.consumed();
        let r = BigInt::from_signed_bytes_be(reader.read_chunk()?);
        let s = BigInt::from_signed_bytes_be(reader.read_chunk()?);

        let valid = self.check(framed, &r, &s);
        info!(
            "GOST R34.10-94: signature is{} correct",
            if valid { "" } else { "n't" }
        );

        Ok(Verification {
            payload: payload.to_vec(),
            valid,
        })
    }

    fn check(&self, framed: &[u8], r: &BigInt, s: &BigInt) -> bool {
        let (Some(r), Some(s)) = (r.to_biguint(), s.to_biguint()) else {
            return false;
        };
        if self.p.is_zero() || r.is_zero() || s.is_zero() || r >= self.q || s >= self.q {
            return false;
        }

        let h = digest_mod(framed, &self.q);
        let Some(h_inv) = mod_inverse(&h, &self.q) else {
            return false;
        };
        let u1 = (&h_inv * &s) % &self.q;
        let u2 = ((&self.q - &r) * &h_inv) % &self.q;
        let v = (self.a.modpow(&u1, &self.p) * self.y.modpow(&u2, &self.p)) % &self.p % &self.q;

        debug!(
            "GOST R34.10-94: h = {}, h^(-1) = {}, r = {}, s = {}, u1 = {}, u2 = {}, v = {}",
            h, h_inv, r, s, u1, u2, v
        );
        v == r
    }
}

/// Signer bound to one parameter set and one keypair for its whole lifetime.
#[derive(Clone, Debug)]
pub struct GostSigner {
    params: GostParameters,
    x: BigUint,
    public: GostPublicKey,
}

impl GostSigner {
    /// Generate domain parameters of the given sizes and a keypair over them.
    pub fn generate(p_bits: usize, q_bits: usize, timeouts: &Timeouts) -> Result<Self, CryptorError> {
        info!("GOST R34.10-94: preparing...");
        let params = generate_gost_parameters(p_bits, q_bits, timeouts)?;
        let signer = Self::with_parameters(params)?;
        info!("GOST R34.10-94: prepared");
        Ok(signer)
    }

    /// Draw a keypair over existing domain parameters.
    pub fn with_parameters(params: GostParameters) -> Result<Self, CryptorError> {
        validate_domain(&params.p, &params.q, &params.a)?;
        if params.p != &params.b * &params.q + 1u32 {
            return Err(CryptorError::InvalidParameters(format!(
                "p = {} is not b*q + 1 for b = {}",
                params.p, params.b
            )));
        }

        let x = random_scalar(&params.q)?;
        let y = params.a.modpow(&x, &params.p);
        debug!("GOST R34.10-94: x = {}, y = {}", x, y);

        let public = GostPublicKey {
            p: params.p.clone(),
            q: params.q.clone(),
            a: params.a.clone(),
            y,
        };
        Ok(Self { params, x, public })
    }

    pub fn parameters(&self) -> &GostParameters {
        &self.params
    }

    pub fn public_key(&self) -> &GostPublicKey {
        &self.public
    }

    /// Frame `payload` and append its signature.
    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptorError> {
        let (mut signed, signature) = self.sign_detached(payload)?;
        signature.append_to(&mut signed)?;
        Ok(signed)
    }

    /// Frame `payload` and return the frame with its signature kept apart.
    pub fn sign_detached(&self, payload: &[u8]) -> Result<(Vec<u8>, Signature), CryptorError> {
        info!("GOST R34.10-94: signature calculation...");

        let framed = framing::encode(payload)?;
        let q = &self.params.q;
        let h = digest_mod(&framed, q);
        if h.is_zero() {
            return Err(CryptorError::InvalidHash);
        }
        debug!("GOST R34.10-94: hash = {}", h);

        let mut attempts = 0;
        let signature = loop {
            if attempts == SIGNATURE_MAX_ATTEMPTS {
                return Err(CryptorError::InvalidParameters(format!(
                    "no nonzero signature after {} nonces",
                    attempts
                )));
            }
            attempts += 1;

            let k = random_scalar(q)?;
            let r = self.params.a.modpow(&k, &self.params.p) % q;
            if r.is_zero() {
                continue;
            }
            let s = (&k * &h + &self.x * &r) % q;
            if s.is_zero() {
                continue;
            }
            break Signature { r, s };
        };

        info!("GOST R34.10-94: signature calculated");
        debug!("GOST R34.10-94: r = {}, s = {}", signature.r, signature.s);
        Ok((framed, signature))
    }

    pub fn verify(&self, signed: &[u8]) -> Result<Verification, CryptorError> {
        self.public.verify(signed)
    }
}

/// `p` odd, `q` an odd prime dividing `p-1`, and `a` of order `q` modulo `p`.
fn validate_domain(p: &BigUint, q: &BigUint, a: &BigUint) -> Result<(), CryptorError> {
    let one = BigUint::one();
    let invalid = |msg: String| -> Result<(), CryptorError> {
        Err(CryptorError::InvalidParameters(msg))
    };

    if p <= &BigUint::from(2u32) || (p % 2u32).is_zero() {
        return invalid(format!("modulus p = {} is not an odd number above 2", p));
    }
    if q <= &BigUint::from(2u32) || !is_probably_prime(q, PRIMALITY_CERTAINTY)? {
        return invalid(format!("q = {} is not an odd prime", q));
    }
    if !((p - &one) % q).is_zero() {
        return invalid(format!("q = {} does not divide p-1", q));
    }
    if a <= &one || a >= p || a.modpow(q, p) != one {
        return invalid(format!("a = {} does not have order q modulo p", a));
    }
    Ok(())
}

/// SHA-256 of `data`, reduced modulo `q`.
fn digest_mod(data: &[u8], q: &BigUint) -> BigUint {
    BigUint::from_bytes_be(&Sha256::digest(data)) % q
}

/// Uniform value in `[1, q-1]`.
fn random_scalar(q: &BigUint) -> Result<BigUint, CryptorError> {
    Ok(random_biguint_below(&(q - BigUint::one()))? + BigUint::one())
}

fn to_signed_bytes(x: &BigUint) -> Vec<u8> {
    BigInt::from(x.clone()).to_signed_bytes_be()
}
