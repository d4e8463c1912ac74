//! Random integers, probable primes and the key material each protocol needs.
//!
//! Every generator here is a probabilistic search; each one is bounded by an explicit
//! wall-clock budget and reports [`CryptorError::Timeout`] instead of spinning forever.

use std::time::{Duration, Instant};

use log::{debug, warn};
use num_bigint::BigUint;
use num_traits::One;

use crate::config::{validate_gost_lengths, Timeouts, MAX_RANDOM_BITS, PRIMALITY_CERTAINTY};
use crate::error::CryptorError;
use crate::utils::{
    gcd_biguint, generate_prime, is_probably_prime, mod_inverse, random_bits, random_usize_below,
    retry_until,
};

/// Shamir exponent pair: `c*d ≡ 1 (mod p-1)`.
#[derive(Clone, Debug)]
pub struct ShamirKeypair {
    pub c: BigUint, // Lock exponent
    pub d: BigUint, // Unlock exponent
}

/// GOST R 34.10-94 domain parameters: `p = b*q + 1`, `a` of order `q` mod `p`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GostParameters {
    pub p: BigUint,
    pub q: BigUint,
    pub b: BigUint,
    pub a: BigUint,
}

/// Diffie-Hellman group parameters: `p = q*B + 1`, `g^q mod p != 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DhParameters {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
}

/// Uniform integer below `2^bits`, or a probable prime of exactly `bits` bits.
pub fn random_integer(bits: usize, want_prime: bool) -> Result<BigUint, CryptorError> {
    if want_prime {
        generate_prime(bits, PRIMALITY_CERTAINTY)
    } else {
        random_bits(bits)
    }
}

/// Sample a value in `[min, max]`.
///
/// The bit length is drawn between the lengths of the bounds (up to [`MAX_RANDOM_BITS`]
/// when `max` is absent), then values are resampled until one lands inside the range.
pub fn random_in_range(
    min: Option<&BigUint>,
    max: Option<&BigUint>,
    want_prime: bool,
    budget: Duration,
) -> Result<BigUint, CryptorError> {
    match (min, max) {
        (None, None) => {
            return Err(CryptorError::InvalidRange(
                "both bounds are absent".to_string(),
            ))
        }
        (Some(lo), Some(hi)) if lo > hi => {
            return Err(CryptorError::InvalidRange(format!(
                "min {} exceeds max {}",
                lo, hi
            )))
        }
        (Some(lo), Some(hi)) if lo == hi => {
            if want_prime && !is_probably_prime(lo, PRIMALITY_CERTAINTY)? {
                return Err(CryptorError::InvalidRange(format!(
                    "[{}, {}] contains no prime",
                    lo, hi
                )));
            }
            return Ok(lo.clone());
        }
        _ => {}
    }

    let min_bits = min.map_or(0, |m| m.bits() as usize);
    let max_bits = max.map_or(MAX_RANDOM_BITS.max(min_bits), |m| m.bits() as usize);

    retry_until(budget, "random range", || {
        let bits = min_bits + random_usize_below(max_bits - min_bits + 1)?;
        if want_prime && bits < 2 {
            return Ok(None);
        }
        let candidate = random_integer(bits, want_prime)?;
        if min.map_or(false, |lo| &candidate < lo) || max.map_or(false, |hi| &candidate > hi) {
            return Ok(None);
        }
        Ok(Some(candidate))
    })
}

/// Pick `c` coprime to `p-1` and its inverse `d`.
pub fn generate_shamir_keypair(p: &BigUint, budget: Duration) -> Result<ShamirKeypair, CryptorError> {
    let one = BigUint::one();
    if p <= &(&one + &one) {
        return Err(CryptorError::InvalidParameters(format!(
            "Shamir modulus {} is too small",
            p
        )));
    }

    let p_minus_1 = p - &one;
    let bits = p_minus_1.bits() as usize;

    retry_until(budget, "Shamir keypair", || {
        let c = random_integer(bits, false)? % &p_minus_1;
        // c ≡ 1 (mod p-1) would leave the byte unlocked.
        if c <= one || gcd_biguint(&c, &p_minus_1) != one {
            return Ok(None);
        }
        let d = mod_inverse(&c, &p_minus_1).ok_or(CryptorError::ModularInverseNotFound)?;
        Ok(Some(ShamirKeypair { c, d }))
    })
}

/// Generate `(p, q, b, a)` with `q` of `q_bits` and `p` of exactly `p_bits` bits.
pub fn generate_gost_parameters(
    p_bits: usize,
    q_bits: usize,
    timeouts: &Timeouts,
) -> Result<GostParameters, CryptorError> {
    validate_gost_lengths(p_bits, q_bits)?;

    let started = Instant::now();
    retry_until(timeouts.gost_parameters, "GOST parameters", || {
        let q = random_integer(q_bits, true)?;
        let Some((p, b)) = find_gost_modulus(&q, p_bits, started, timeouts.gost_parameters)? else {
            return Ok(None);
        };

        match find_gost_generator(&p, &b, p_bits, timeouts.gost_generator) {
            Ok(a) => {
                debug!("GOST parameters: q = {}, p = {}, b = {}, a = {}", q, p, b, a);
                Ok(Some(GostParameters { p, q, b, a }))
            }
            Err(CryptorError::Timeout { .. }) => {
                warn!("GOST generator search gave up for p = {}, restarting", p);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    })
}

/// Smallest even `b` with `b*q + 1` prime, keeping `p` at exactly `p_bits` bits.
///
/// Gives up with `None` once `budget` has elapsed since `started`.
pub(crate) fn find_gost_modulus(
    q: &BigUint,
    p_bits: usize,
    started: Instant,
    budget: Duration,
) -> Result<Option<(BigUint, BigUint)>, CryptorError> {
    let mut b = BigUint::from(2u32);
    while ((&b * q).bits() as usize) < p_bits {
        b <<= 1;
    }

    loop {
        if started.elapsed() >= budget {
            return Ok(None);
        }
        let p = &b * q + 1u32;
        if p.bits() as usize != p_bits {
            return Ok(None);
        }
        if is_probably_prime(&p, PRIMALITY_CERTAINTY)? {
            return Ok(Some((p, b)));
        }
        // q is odd, so odd b would give an even p.
        b += 2u32;
    }
}

fn find_gost_generator(
    p: &BigUint,
    b: &BigUint,
    p_bits: usize,
    budget: Duration,
) -> Result<BigUint, CryptorError> {
    let one = BigUint::one();
    retry_until(budget, "GOST generator", || {
        let g = random_integer(p_bits, false)?;
        let a = g.modpow(b, p);
        Ok((a > one).then_some(a))
    })
}

/// Generate a Diffie-Hellman group with `p = q*multiplier + 1` of `p_bits` bits.
pub fn generate_dh_parameters(
    q_bits: usize,
    p_bits: usize,
    multiplier: u32,
    certainty: u32,
    budget: Duration,
) -> Result<DhParameters, CryptorError> {
    if multiplier < 2 {
        return Err(CryptorError::InvalidParameters(format!(
            "multiplier must be at least 2, got {}",
            multiplier
        )));
    }
    if q_bits < 2 {
        return Err(CryptorError::InvalidParameters(format!(
            "q must have at least 2 bits, got {}",
            q_bits
        )));
    }

    let (p, q) = retry_until(budget, "Diffie-Hellman modulus", || {
        let q = generate_prime(q_bits, certainty)?;
        let p = &q * multiplier + 1u32;
        if p.bits() as usize == p_bits && is_probably_prime(&p, certainty)? {
            Ok(Some((p, q)))
        } else {
            Ok(None)
        }
    })?;

    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let upper = &p - &two;
    let g = retry_until(budget, "Diffie-Hellman generator", || {
        let g = random_in_range(Some(&two), Some(&upper), false, budget)?;
        Ok((g.modpow(&q, &p) != one).then_some(g))
    })?;

    debug!("Diffie-Hellman parameters: q = {}, p = {}, g = {}", q, p, g);
    Ok(DhParameters { p, q, g })
}
