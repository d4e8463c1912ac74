//! Shamir 3-pass Protocol Implementation
//!
//! Two endpoints exchange a message one byte at a time without sharing a key. For each
//! byte both sides pick private exponent pairs `(c, d)` over a common prime `p`:
//!
//! 1. Sender locks the byte: `x1 = m^cS mod p`
//! 2. Receiver adds its lock: `x2 = x1^cR mod p`
//! 3. Sender removes its lock: `x3 = x2^dS mod p`
//! 4. Receiver removes its lock: `x4 = x3^dR mod p = m`
//!
//! Exponentiation modulo the same prime commutes, so the locks cancel in any order.

use std::time::Duration;

use log::{debug, info};
use num_bigint::BigUint;

use crate::config::{Timeouts, PRIMALITY_CERTAINTY, SHAMIR_MIN_PRIME_BITS};
use crate::error::CryptorError;
use crate::keygen::{generate_shamir_keypair, random_integer, ShamirKeypair};
use crate::utils::{decode_biguint_b64u, encode_biguint_b64u, is_probably_prime};

/// The prime modulus shared by both endpoints for one send.
#[derive(Clone, Debug)]
pub struct Shamir3Pass {
    p: BigUint,
}

impl Shamir3Pass {
    /// Create a new instance with the given prime `p` (base64url, unpadded).
    pub fn new(p_b64u: &str) -> Result<Self, CryptorError> {
        let p = decode_biguint_b64u(p_b64u)?;
        Self::new_with_biguint(p)
    }

    pub fn new_with_biguint(p: BigUint) -> Result<Self, CryptorError> {
        let bits = p.bits() as usize;
        if bits < SHAMIR_MIN_PRIME_BITS {
            return Err(CryptorError::PrimeTooSmall {
                bits,
                min_bits: SHAMIR_MIN_PRIME_BITS,
            });
        }
        if !is_probably_prime(&p, PRIMALITY_CERTAINTY)? {
            return Err(CryptorError::InvalidParameters(format!(
                "Shamir modulus {} is not prime",
                p
            )));
        }

        Ok(Self { p })
    }

    /// Generate a fresh prime modulus of `bits` bits.
    pub fn generate(bits: usize) -> Result<Self, CryptorError> {
        if bits < SHAMIR_MIN_PRIME_BITS {
            return Err(CryptorError::PrimeTooSmall {
                bits,
                min_bits: SHAMIR_MIN_PRIME_BITS,
            });
        }
        let p = random_integer(bits, true)?;
        Ok(Self { p })
    }

    /// Get the prime `p`.
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Get prime as base64url (unpadded).
    pub fn p_b64u(&self) -> String {
        encode_biguint_b64u(&self.p)
    }

    /// Modular exponentiation: `base^exp mod p`.
    pub fn modexp(&self, base: &BigUint, exp: &BigUint) -> BigUint {
        base.modpow(exp, &self.p)
    }

    /// Generate lock keys `(c, d)` where `c*d ≡ 1 (mod p-1)`.
    pub fn generate_lock_keys(&self, budget: Duration) -> Result<ShamirKeypair, CryptorError> {
        generate_shamir_keypair(&self.p, budget)
    }

    /// Add a lock: compute `base^c mod p`.
    pub fn add_lock(&self, base: &BigUint, keys: &ShamirKeypair) -> BigUint {
        self.modexp(base, &keys.c)
    }

    /// Remove a lock: compute `base^d mod p`.
    pub fn remove_lock(&self, base: &BigUint, keys: &ShamirKeypair) -> BigUint {
        self.modexp(base, &keys.d)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointState {
    Idle,
    Receiving,
    Received,
}

/// One side of the channel.
///
/// Key pairs are drawn per byte and never leave the endpoint; the receiving side keeps
/// its pair only between the two steps of a single byte.
#[derive(Debug)]
pub struct Endpoint {
    name: &'static str,
    state: EndpointState,
    buffer: Vec<u8>,
    pending: Option<ShamirKeypair>,
    key_budget: Duration,
}

impl Endpoint {
    pub fn new(name: &'static str, key_budget: Duration) -> Self {
        Self {
            name,
            state: EndpointState::Idle,
            buffer: Vec::new(),
            pending: None,
            key_budget,
        }
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// The received message; only readable once the peer has finished sending.
    pub fn message(&self) -> Result<&[u8], CryptorError> {
        match self.state {
            EndpointState::Received => Ok(&self.buffer),
            _ => Err(CryptorError::NotReady),
        }
    }

    /// Send `message` to `peer`, byte by byte, over `modulus`.
    pub fn send(
        &self,
        message: &[u8],
        peer: &mut Endpoint,
        modulus: &Shamir3Pass,
    ) -> Result<(), CryptorError> {
        info!("{}: start sending {} bytes to {}", self.name, message.len(), peer.name);
        peer.begin_receiving();

        for (index, &byte) in message.iter().enumerate() {
            debug!("{}: message byte {} = {}", self.name, index + 1, byte);
            self.send_byte(byte, peer, modulus)?;
        }

        peer.finish_receiving();
        Ok(())
    }

    fn send_byte(
        &self,
        byte: u8,
        peer: &mut Endpoint,
        modulus: &Shamir3Pass,
    ) -> Result<(), CryptorError> {
        let keys = modulus.generate_lock_keys(self.key_budget)?;
        debug!("{}: c = {}, d = {}", self.name, keys.c, keys.d);

        let x1 = modulus.add_lock(&BigUint::from(byte), &keys);
        debug!("{}: x1 = {}", self.name, x1);
        let x2 = peer.first_step(modulus, &x1)?;
        let x3 = modulus.remove_lock(&x2, &keys);
        debug!("{}: x3 = {}", self.name, x3);
        peer.second_step(modulus, &x3)
    }

    fn begin_receiving(&mut self) {
        self.buffer.clear();
        self.pending = None;
        self.state = EndpointState::Receiving;
    }

    fn first_step(&mut self, modulus: &Shamir3Pass, x1: &BigUint) -> Result<BigUint, CryptorError> {
        let keys = modulus.generate_lock_keys(self.key_budget)?;
        debug!("{}: c = {}, d = {}", self.name, keys.c, keys.d);

        let x2 = modulus.add_lock(x1, &keys);
        debug!("{}: x2 = {}", self.name, x2);
        self.pending = Some(keys);
        Ok(x2)
    }

    fn second_step(&mut self, modulus: &Shamir3Pass, x3: &BigUint) -> Result<(), CryptorError> {
        let keys = self.pending.take().ok_or_else(|| {
            CryptorError::Malformed("second protocol step without a first".to_string())
        })?;

        let x4 = modulus.remove_lock(x3, &keys);
        debug!("{}: x4 = {}", self.name, x4);
        let byte = u8::try_from(&x4).map_err(|_| {
            CryptorError::Malformed(format!("recovered value {} does not fit in a byte", x4))
        })?;
        self.buffer.push(byte);
        Ok(())
    }

    fn finish_receiving(&mut self) {
        self.state = EndpointState::Received;
        info!("{}: message received ({} bytes)", self.name, self.buffer.len());
    }
}

/// A sender/receiver pair that draws a fresh prime for every message.
#[derive(Debug)]
pub struct ShamirChannel {
    prime_bits: usize,
    sender: Endpoint,
    receiver: Endpoint,
}

impl ShamirChannel {
    pub fn new(prime_bits: usize, timeouts: &Timeouts) -> Result<Self, CryptorError> {
        if prime_bits < SHAMIR_MIN_PRIME_BITS {
            return Err(CryptorError::PrimeTooSmall {
                bits: prime_bits,
                min_bits: SHAMIR_MIN_PRIME_BITS,
            });
        }

        Ok(Self {
            prime_bits,
            sender: Endpoint::new("client", timeouts.shamir_keys),
            receiver: Endpoint::new("server", timeouts.shamir_keys),
        })
    }

    pub fn prime_bits(&self) -> usize {
        self.prime_bits
    }

    /// Run the protocol for every byte of `message` under one fresh prime.
    pub fn transmit(&mut self, message: &[u8]) -> Result<(), CryptorError> {
        let modulus = Shamir3Pass::generate(self.prime_bits)?;
        debug!("Shamir scheme: p = {}", modulus.p());
        self.sender.send(message, &mut self.receiver, &modulus)
    }

    pub fn receiver(&self) -> &Endpoint {
        &self.receiver
    }

    /// The receiver's buffer; `NotReady` until a transmission has completed.
    pub fn received(&self) -> Result<&[u8], CryptorError> {
        self.receiver.message()
    }
}
