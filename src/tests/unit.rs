use std::time::Duration;

use num_bigint::BigUint;

use crate::config::{CipherScheme, SessionConfig, SignatureScheme, SHAMIR_MIN_PRIME_BITS};
use crate::error::CryptorError;
use crate::framing::{self, FrameReader};
use crate::utils::{
    decode_biguint_b64u, encode_biguint_b64u, generate_prime, is_probably_prime, mod_inverse,
    retry_until,
};

#[test]
fn test_mod_inverse() {
    let inv = mod_inverse(&BigUint::from(3u32), &BigUint::from(40u32)).unwrap();
    assert_eq!(inv, BigUint::from(27u32));
    assert!(mod_inverse(&BigUint::from(4u32), &BigUint::from(40u32)).is_none());
}

#[test]
fn test_primality_of_known_values() {
    for n in [2u32, 3, 5, 257, 65537, 2_147_483_647] {
        assert!(is_probably_prime(&BigUint::from(n), 100).unwrap(), "{} is prime", n);
    }
    for n in [0u32, 1, 4, 255, 561, 65535, 2_147_483_649] {
        assert!(!is_probably_prime(&BigUint::from(n), 100).unwrap(), "{} is composite", n);
    }
}

#[test]
fn test_generated_prime_has_requested_length() {
    for bits in [2usize, 9, 16, 33, 64] {
        let p = generate_prime(bits, 100).unwrap();
        assert_eq!(p.bits() as usize, bits);
        assert!(is_probably_prime(&p, 100).unwrap());
    }
    assert!(generate_prime(1, 100).unwrap_err().is_invalid_parameters());
}

#[test]
fn test_retry_until_times_out() {
    let err = retry_until::<(), _>(Duration::from_millis(20), "never", || Ok(None)).unwrap_err();
    assert!(matches!(err, CryptorError::Timeout { what: "never", .. }));
}

#[test]
fn test_b64u_round_trip() {
    let x = BigUint::from(0xdead_beef_u64);
    assert_eq!(decode_biguint_b64u(&encode_biguint_b64u(&x)).unwrap(), x);
    assert!(matches!(
        decode_biguint_b64u("not base64!"),
        Err(CryptorError::InvalidEncoding(_))
    ));
}

#[test]
fn test_encode_layout() {
    assert_eq!(framing::encode(b"HI").unwrap(), vec![0, 0, 0, 2, 0x48, 0x49]);
    assert_eq!(framing::encode(&[]).unwrap(), vec![0, 0, 0, 0]);
}

#[test]
fn test_decode_ignores_trailing_bytes() {
    let framed = [0, 0, 0, 1, 0xAA, 0xBB, 0xCC];
    assert_eq!(framing::decode(&framed).unwrap(), &[0xAA]);
}

#[test]
fn test_decode_short_input_is_malformed() {
    for framed in [&[][..], &[0, 0, 1][..], &[0, 0, 0, 3, 1, 2][..]] {
        assert!(matches!(framing::decode(framed), Err(CryptorError::Malformed(_))));
    }
}

#[test]
fn test_frame_reader_tracks_position() {
    let mut buf = framing::encode(b"abc").unwrap();
    framing::put_chunk(&mut buf, &[7]).unwrap();

    let mut reader = FrameReader::new(&buf);
    assert_eq!(reader.read_chunk().unwrap(), b"abc");
    assert_eq!(reader.consumed(), &buf[..7]);
    assert_eq!(reader.read_chunk().unwrap(), &[7]);
    assert!(reader.remaining().is_empty());
    assert_eq!(reader.position(), buf.len());
}

#[test]
fn test_scheme_codes() {
    assert_eq!("shamir".parse::<CipherScheme>().unwrap(), CipherScheme::Shamir);
    assert_eq!("SHA".parse::<CipherScheme>().unwrap(), CipherScheme::Shamir);
    assert_eq!("dh".parse::<CipherScheme>().unwrap(), CipherScheme::DiffieHellman);
    assert_eq!(
        "gost34.10-94".parse::<SignatureScheme>().unwrap(),
        SignatureScheme::Gost341094
    );
    assert!("rsa".parse::<CipherScheme>().unwrap_err().is_invalid_parameters());
    assert!("ecdsa".parse::<SignatureScheme>().unwrap_err().is_invalid_parameters());
}

#[test]
fn test_config_rejects_undersized_modulus() {
    let config = SessionConfig {
        shamir_p_bits: SHAMIR_MIN_PRIME_BITS - 1,
        ..SessionConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, CryptorError::PrimeTooSmall { bits: 8, .. }));
    assert!(err.is_invalid_parameters());
}

#[test]
fn test_config_rejects_inconsistent_gost_lengths() {
    let config = SessionConfig {
        signature: Some(SignatureScheme::Gost341094),
        gost_p_bits: 32,
        gost_q_bits: 32,
        ..SessionConfig::default()
    };
    assert!(config.validate().unwrap_err().is_invalid_parameters());
    assert!(SessionConfig::default().validate().is_ok());
}
