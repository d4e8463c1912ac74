use std::time::Duration;

use num_bigint::BigUint;
use num_traits::One;

use super::{shamir, signer, TEST_GOST_P_BITS, TEST_GOST_Q_BITS};
use crate::config::Timeouts;
use crate::error::CryptorError;
use crate::gost::{GostParameters, GostPublicKey, GostSigner, Signature};
use crate::framing;

#[test]
fn test_lock_keys_independence() {
    let shamir = shamir();
    let mut c_values = std::collections::HashSet::new();
    let mut d_values = std::collections::HashSet::new();

    // Generate many key pairs and check for collisions
    for _ in 0..25 {
        let keys = shamir.generate_lock_keys(Duration::from_secs(10)).unwrap();
        assert!(c_values.insert(keys.c.clone()), "Duplicate c value");
        assert!(d_values.insert(keys.d.clone()), "Duplicate d value");
    }
}

#[test]
fn test_signatures_are_randomized() {
    let signer = signer();
    let (_, first) = signer.sign_detached(b"same message").unwrap();
    let (_, second) = signer.sign_detached(b"same message").unwrap();
    let (_, third) = signer.sign_detached(b"same message").unwrap();

    // Fresh k per signature; three equal draws from a 32-bit group are not plausible.
    assert!(first != second || second != third);
}

#[test]
fn test_signature_values_in_range() {
    let signer = signer();
    let q = &signer.parameters().q;
    for _ in 0..20 {
        let (_, signature) = signer.sign_detached(b"range").unwrap();
        assert!(signature.r > BigUint::from(0u32) && &signature.r < q);
        assert!(signature.s > BigUint::from(0u32) && &signature.s < q);
    }
}

#[test]
fn test_other_signer_rejects_signature() {
    let alice = signer();
    let mallory =
        GostSigner::generate(TEST_GOST_P_BITS, TEST_GOST_Q_BITS, &Timeouts::default()).unwrap();

    let signed = alice.sign(b"from alice").unwrap();
    let verification = mallory.verify(&signed).unwrap();
    assert!(!verification.valid);
    assert_eq!(verification.payload, b"from alice".to_vec());
}

#[test]
fn test_same_parameters_different_keys() {
    let alice = signer();
    let bob = GostSigner::with_parameters(alice.parameters().clone()).unwrap();

    let signed = bob.sign(b"from bob").unwrap();
    assert!(bob.verify(&signed).unwrap().valid);
    assert!(!alice.verify(&signed).unwrap().valid);
}

#[test]
fn test_out_of_range_signature_still_returns_payload() {
    let signer = signer();
    let (framed, signature) = signer.sign_detached(b"edge").unwrap();
    let q = signer.parameters().q.clone();

    for forged in [
        Signature { r: signature.r.clone(), s: q.clone() },
        Signature { r: BigUint::from(0u32), s: signature.s.clone() },
        Signature { r: &q + BigUint::one(), s: signature.s.clone() },
    ] {
        let mut message = framed.clone();
        forged.append_to(&mut message).unwrap();
        let verification = signer.verify(&message).unwrap();
        assert!(!verification.valid);
        assert_eq!(verification.payload, b"edge".to_vec());
    }
}

#[test]
fn test_negative_signature_encoding_is_invalid() {
    let signer = signer();
    let (mut message, _) = signer.sign_detached(b"sign bit").unwrap();
    framing::put_chunk(&mut message, &[0xFF]).unwrap(); // r = -1
    framing::put_chunk(&mut message, &[0x01]).unwrap();

    let verification = signer.verify(&message).unwrap();
    assert!(!verification.valid);
}

#[test]
fn test_signature_wire_format_keeps_sign_bit_clear() {
    let signature = Signature {
        r: BigUint::from(0x80u32),
        s: BigUint::from(0x7Fu32),
    };
    let mut out = Vec::new();
    signature.append_to(&mut out).unwrap();
    assert_eq!(out, vec![0, 0, 0, 2, 0x00, 0x80, 0, 0, 0, 1, 0x7F]);
}

#[test]
fn test_truncated_signed_message_is_malformed() {
    let signer = signer();
    let signed = signer.sign(b"truncate me").unwrap();

    for cut in [1, 5, signed.len() - 3] {
        let result = signer.verify(&signed[..signed.len() - cut]);
        assert!(matches!(result, Err(CryptorError::Malformed(_))), "cut {}", cut);
    }
}

#[test]
fn test_exported_public_key_verifies() {
    let signer = signer();
    let exported = signer.public_key().to_b64u();
    let public = GostPublicKey::from_b64u(&exported).unwrap();
    assert_eq!(&public, signer.public_key());

    let signed = signer.sign(b"portable").unwrap();
    assert!(public.verify(&signed).unwrap().valid);

    assert!(matches!(
        GostPublicKey::from_b64u("AQ.AQ"),
        Err(CryptorError::InvalidEncoding(_))
    ));
}

#[test]
fn test_imported_key_with_bad_domain_is_rejected() {
    let signer = signer();
    let signed = signer.sign(b"x").unwrap();

    let mut zero_modulus = signer.public_key().clone();
    zero_modulus.p = BigUint::from(0u32);
    assert!(matches!(
        GostPublicKey::from_b64u(&zero_modulus.to_b64u()),
        Err(CryptorError::InvalidEncoding(_))
    ));
    // Built by hand, the key still fails verification rather than panicking.
    assert!(!zero_modulus.verify(&signed).unwrap().valid);

    let mut trivial_generator = signer.public_key().clone();
    trivial_generator.a = BigUint::one();
    let mut zero_public = signer.public_key().clone();
    zero_public.y = BigUint::from(0u32);
    let mut wrong_order = signer.public_key().clone();
    wrong_order.q += 2u32;

    for key in [trivial_generator, zero_public, wrong_order] {
        assert!(key.validate().unwrap_err().is_invalid_parameters());
        assert!(matches!(
            GostPublicKey::from_b64u(&key.to_b64u()),
            Err(CryptorError::InvalidEncoding(_))
        ));
    }
}

#[test]
fn test_signer_rejects_bad_parameters() {
    let good = signer().parameters().clone();

    let two_order = GostParameters {
        p: BigUint::from(7u32),
        q: BigUint::from(2u32),
        b: BigUint::from(3u32),
        a: BigUint::from(6u32),
    };
    let mut trivial_generator = good.clone();
    trivial_generator.a = BigUint::one();
    let mut wrong_cofactor = good.clone();
    wrong_cofactor.b += 2u32;
    let mut even_modulus = good;
    even_modulus.p += 1u32;

    for params in [two_order, trivial_generator, wrong_cofactor, even_modulus] {
        let err = GostSigner::with_parameters(params).unwrap_err();
        assert!(matches!(err, CryptorError::InvalidParameters(_)));
    }
}

#[test]
fn test_signing_gives_up_when_every_nonce_yields_zero() {
    // Both non-identity elements of order 3 mod 13 (3 and 9) are multiples of 3, so r is always 0.
    let params = GostParameters {
        p: BigUint::from(13u32),
        q: BigUint::from(3u32),
        b: BigUint::from(4u32),
        a: BigUint::from(3u32),
    };
    let signer = GostSigner::with_parameters(params).unwrap();

    let err = signer.sign(b"degenerate").unwrap_err();
    assert!(matches!(
        err,
        CryptorError::InvalidParameters(_) | CryptorError::InvalidHash
    ));
}
