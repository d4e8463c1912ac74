use std::time::{Duration, Instant};

use base64ct::{Base64UrlUnpadded, Encoding};
use getrandom::getrandom;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive, Zero};

use crate::config::PRIME_GEN_MAX_ATTEMPTS;
use crate::error::CryptorError;

/// Extended Euclidean algorithm.
pub fn extended_gcd(a: BigInt, b: BigInt) -> (BigInt, BigInt, BigInt) {
    if b.is_zero() {
        return (a, BigInt::one(), BigInt::zero());
    }

    let (gcd, x1, y1) = extended_gcd(b.clone(), &a % &b);
    let x = y1.clone();
    let y = x1 - (&a / &b) * y1;

    (gcd, x, y)
}

pub fn gcd_biguint(a: &BigUint, b: &BigUint) -> BigUint {
    let mut x = a.clone();
    let mut y = b.clone();
    while !y.is_zero() {
        let r = &x % &y;
        x = y;
        y = r;
    }
    x
}

/// Compute `a^-1 mod m`, or `None` when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }

    let a_bigint = BigInt::from_biguint(Sign::Plus, a.clone());
    let m_bigint = BigInt::from_biguint(Sign::Plus, m.clone());

    let (gcd, x, _) = extended_gcd(a_bigint, m_bigint.clone());
    if gcd != BigInt::one() {
        return None;
    }

    // Ensure a positive result.
    let mut x_mod = x % &m_bigint;
    if x_mod.sign() == Sign::Minus {
        x_mod += &m_bigint;
    }

    x_mod.to_biguint()
}

/// Encode BigUint as base64url (unpadded).
pub fn encode_biguint_b64u(x: &BigUint) -> String {
    Base64UrlUnpadded::encode_string(&x.to_bytes_be())
}

/// Decode BigUint from base64url (unpadded).
pub fn decode_biguint_b64u(s: &str) -> Result<BigUint, CryptorError> {
    let bytes = Base64UrlUnpadded::decode_vec(s)
        .map_err(|e| CryptorError::InvalidEncoding(e.to_string()))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Run `attempt` until it yields a value or `budget` of wall-clock time has elapsed.
///
/// `attempt` returns `Ok(None)` to ask for another try; errors abort the search.
pub fn retry_until<T, F>(budget: Duration, what: &'static str, mut attempt: F) -> Result<T, CryptorError>
where
    F: FnMut() -> Result<Option<T>, CryptorError>,
{
    let started = Instant::now();
    loop {
        if started.elapsed() >= budget {
            return Err(CryptorError::Timeout { what, budget });
        }
        if let Some(value) = attempt()? {
            return Ok(value);
        }
    }
}

pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), CryptorError> {
    getrandom(buf).map_err(|_| CryptorError::RandomGenerationFailed)
}

/// Uniform integer in `[0, 2^bits)`.
pub fn random_bits(bits: usize) -> Result<BigUint, CryptorError> {
    if bits == 0 {
        return Ok(BigUint::zero());
    }

    let bytes_len = (bits + 7) / 8;
    let top_bits = bits % 8;

    let mut buf = vec![0u8; bytes_len];
    fill_random(&mut buf)?;
    if top_bits != 0 {
        buf[0] &= (1u8 << top_bits) - 1;
    }

    Ok(BigUint::from_bytes_be(&buf))
}

/// Uniform integer in `[0, upper)`.
pub fn random_biguint_below(upper: &BigUint) -> Result<BigUint, CryptorError> {
    if upper.is_zero() {
        return Ok(BigUint::zero());
    }

    // Rejection-sample to avoid modulo bias.
    let bits = upper.bits() as usize;
    loop {
        let n = random_bits(bits)?;
        if &n < upper {
            return Ok(n);
        }
    }
}

pub(crate) fn random_usize_below(upper: usize) -> Result<usize, CryptorError> {
    random_biguint_below(&BigUint::from(upper))?
        .to_usize()
        .ok_or(CryptorError::RandomGenerationFailed)
}

/// Generate a probable prime with exactly `bits` bits.
pub fn generate_prime(bits: usize, certainty: u32) -> Result<BigUint, CryptorError> {
    if bits < 2 {
        return Err(CryptorError::InvalidParameters(format!(
            "a prime needs at least 2 bits, got {}",
            bits
        )));
    }

    let bytes_len = (bits + 7) / 8;
    let top_bits = bits % 8;

    for _ in 0..PRIME_GEN_MAX_ATTEMPTS {
        let mut buf = vec![0u8; bytes_len];
        fill_random(&mut buf)?;

        // Ensure the generated number has exactly `bits` bits (set the MSB).
        if top_bits != 0 {
            let mask = (1u8 << top_bits) - 1;
            buf[0] &= mask;
            buf[0] |= 1u8 << (top_bits - 1);
        } else {
            buf[0] |= 0x80;
        }

        // Ensure odd.
        buf[bytes_len - 1] |= 1;

        let n = BigUint::from_bytes_be(&buf);
        if is_probably_prime(&n, certainty)? {
            return Ok(n);
        }
    }

    Err(CryptorError::RandomGenerationFailed)
}

/// Miller-Rabin test; a composite passes with probability at most `2^-certainty`.
pub fn is_probably_prime(n: &BigUint, certainty: u32) -> Result<bool, CryptorError> {
    let one = BigUint::one();
    let two = &one + &one;
    let three = &two + &one;

    if n < &two {
        return Ok(false);
    }
    if n == &two || n == &three {
        return Ok(true);
    }
    if (n % &two).is_zero() {
        return Ok(false);
    }

    // Quick trial division by a few small primes.
    const SMALL_PRIMES: [u32; 11] = [3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    for p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if n == &p {
            return Ok(true);
        }
        if (n % &p).is_zero() {
            return Ok(false);
        }
    }

    // Write n-1 as d * 2^s with d odd.
    let n_minus_1 = n - &one;
    let mut d = n_minus_1.clone();
    let mut s: u32 = 0;
    while (&d % &two).is_zero() {
        d >>= 1;
        s += 1;
    }

    // Each round errs with probability <= 1/4.
    let rounds = ((certainty + 1) / 2).max(1);
    for _ in 0..rounds {
        let a = random_biguint_below(&(n - &three))? + &two; // a ∈ [2, n-2]
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue;
        }

        let mut passed = false;
        for _ in 1..s {
            x = (&x * &x) % n;
            if x == n_minus_1 {
                passed = true;
                break;
            }
            if x == one {
                return Ok(false);
            }
        }

        if !passed {
            return Ok(false);
        }
    }

    Ok(true)
}
