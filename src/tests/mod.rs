use std::sync::OnceLock;

use crate::config::Timeouts;
use crate::gost::GostSigner;

pub(crate) const TEST_PRIME_BITS: usize = 32;
pub(crate) const TEST_GOST_P_BITS: usize = 64;
pub(crate) const TEST_GOST_Q_BITS: usize = 32;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_p_b64u() -> &'static str {
    static P: OnceLock<String> = OnceLock::new();
    P.get_or_init(|| {
        crate::Shamir3Pass::generate(TEST_PRIME_BITS)
            .expect("Shamir3Pass::generate failed")
            .p_b64u()
    })
    .as_str()
}

fn shamir() -> crate::Shamir3Pass {
    init_logging();
    crate::Shamir3Pass::new(test_p_b64u()).expect("Shamir3Pass::new failed")
}

fn signer() -> GostSigner {
    static SIGNER: OnceLock<GostSigner> = OnceLock::new();
    init_logging();
    SIGNER
        .get_or_init(|| {
            GostSigner::generate(TEST_GOST_P_BITS, TEST_GOST_Q_BITS, &Timeouts::default())
                .expect("GostSigner::generate failed")
        })
        .clone()
}




pub mod security_tests;

pub mod unit;
