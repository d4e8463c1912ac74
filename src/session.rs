//! Ties framing, signing and the Shamir channel into one send/receive flow.

use log::info;

use crate::config::{CipherScheme, SessionConfig, SignatureScheme};
use crate::error::CryptorError;
use crate::framing;
use crate::gost::GostSigner;
use crate::shamir3pass::ShamirChannel;

/// What the receiving endpoint ends up with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Received {
    pub payload: Vec<u8>,
    /// `None` when the message was sent unsigned.
    pub signature_valid: Option<bool>,
}

/// Frame (and optionally sign) `payload`, then push it through `channel`.
pub fn send(
    payload: &[u8],
    signer: Option<&GostSigner>,
    channel: &mut ShamirChannel,
) -> Result<(), CryptorError> {
    let wire = match signer {
        Some(signer) => signer.sign(payload)?,
        None => framing::encode(payload)?,
    };
    channel.transmit(&wire)
}

/// Read what the channel delivered, verify it when a signer is given, strip the framing.
pub fn receive(
    channel: &ShamirChannel,
    signer: Option<&GostSigner>,
) -> Result<Received, CryptorError> {
    let wire = channel.received()?;
    match signer {
        Some(signer) => {
            let verification = signer.verify(wire)?;
            Ok(Received {
                payload: verification.payload,
                signature_valid: Some(verification.valid),
            })
        }
        None => Ok(Received {
            payload: framing::decode(wire)?.to_vec(),
            signature_valid: None,
        }),
    }
}

/// A configured channel plus an optional signer.
#[derive(Debug)]
pub struct Session {
    channel: ShamirChannel,
    signer: Option<GostSigner>,
}

impl Session {
    /// Validate `config` and prepare the engines it selects.
    ///
    /// Unsupported schemes are rejected before any key generation starts.
    pub fn new(config: &SessionConfig) -> Result<Self, CryptorError> {
        match config.cipher {
            CipherScheme::Shamir => {}
            CipherScheme::DiffieHellman => {
                return Err(CryptorError::NotImplemented(format!(
                    "no sending engine for the `{}` cipher scheme",
                    config.cipher
                )))
            }
        }
        config.validate()?;
        info!("cipher scheme `{}`", config.cipher);

        let channel = ShamirChannel::new(config.shamir_p_bits, &config.timeouts)?;
        let signer = match config.signature {
            Some(SignatureScheme::Gost341094) => {
                info!("signature scheme `{}`", SignatureScheme::Gost341094);
                Some(GostSigner::generate(
                    config.gost_p_bits,
                    config.gost_q_bits,
                    &config.timeouts,
                )?)
            }
            None => None,
        };

        Ok(Self { channel, signer })
    }

    pub fn channel(&self) -> &ShamirChannel {
        &self.channel
    }

    pub fn signer(&self) -> Option<&GostSigner> {
        self.signer.as_ref()
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<(), CryptorError> {
        send(payload, self.signer.as_ref(), &mut self.channel)
    }

    pub fn receive(&self) -> Result<Received, CryptorError> {
        receive(&self.channel, self.signer.as_ref())
    }

    /// Send `payload` and return what the receiving side recovered.
    pub fn transfer(&mut self, payload: &[u8]) -> Result<Received, CryptorError> {
        self.send(payload)?;
        self.receive()
    }
}
