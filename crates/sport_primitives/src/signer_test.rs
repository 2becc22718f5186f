use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::chain_config::ChainConfig;
use crate::signer::{Signer, SignerError};
use crate::test_utils::{address_of, signed_tx, test_key};

fn config(eip155_block: Option<u64>) -> ChainConfig {
    ChainConfig { chain_id: 51, eip155_block, ..Default::default() }
}

#[test]
fn recovers_protected_sender_past_activation() {
    let key = test_key(1);
    let tx = signed_tx(&key, 0, 10, 21_000, Some(51));

    let signer = Signer::new(&config(Some(10)), 10);
    assert_eq!(signer.sender(&tx).unwrap(), address_of(&key));
}

#[test]
fn recovers_unprotected_sender_before_activation() {
    let key = test_key(2);
    let tx = signed_tx(&key, 0, 10, 21_000, None);

    let signer = Signer::new(&config(Some(10)), 9);
    assert_eq!(signer, Signer::Homestead);
    assert_eq!(signer.sender(&tx).unwrap(), address_of(&key));
}

#[test]
fn rejects_chain_id_mismatch() {
    let key = test_key(3);
    let tx = signed_tx(&key, 0, 10, 21_000, Some(99));

    let signer = Signer::new(&config(Some(0)), 1);
    assert_matches!(signer.sender(&tx), Err(SignerError::InvalidChainId));
}

#[test]
fn rejects_protected_tx_under_homestead_signer() {
    let key = test_key(4);
    let tx = signed_tx(&key, 0, 10, 21_000, Some(51));

    assert_matches!(Signer::Homestead.sender(&tx), Err(SignerError::Protected));
}
