//! Credential rotation tests
//!
//! Tests cover the mismatch short-circuit, reversibility failures that must
//! leave every file untouched, a full commit, rollback of a failed commit,
//! outcome reasons and the queued worker.

mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use strongroom_core::{PaymentRequest, WalletCredentials};
use strongroom_service::{
    CredentialRotation, PaymentsError, RotationEngine, RotationOutcome, RotationReason,
};
use strongroom_storage::{AesGcmCipher, EncryptedFileStore, KdfParams, KeyCipher, WalletSummary};

fn store() -> EncryptedFileStore {
    EncryptedFileStore::new(Arc::new(light_cipher()))
}

#[test]
fn test_wrong_old_credential_does_no_crypto() {
    let fixture = Fixture::new();
    let before = fixture.summary_bytes();
    let cipher = Arc::new(CountingCipher::new(None));
    let engine = RotationEngine::new(Arc::clone(&fixture.context), cipher.clone());

    let result = engine.rotate("not the credential", NEW_CREDENTIAL);

    assert!(matches!(result, Err(PaymentsError::CredentialMismatch)));
    assert_eq!(cipher.derivations.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.summary_bytes(), before);
    assert!(fixture.wallet.credential_calls.lock().is_empty());
    assert_eq!(
        RotationOutcome::from_result(&result).reason,
        RotationReason::WrongOldPassword
    );
}

#[test]
fn test_corrupted_backup_key_wrap_aborts() {
    assert_corruption_aborts(1);
}

#[test]
fn test_corrupted_credential_wrap_aborts() {
    assert_corruption_aborts(2);
}

fn assert_corruption_aborts(corrupt_encryption: usize) {
    let fixture = Fixture::new();
    let payments = fixture.payments();
    payments.initialise().unwrap();
    payments
        .add_payment_request(PaymentRequest::new("myShop", 10, chrono::Utc::now()))
        .unwrap();
    payments.write_payments().unwrap();

    let summary_before = fixture.summary_bytes();
    let payments_before = std::fs::read(fixture.payments_path()).unwrap();
    let contacts = Arc::new(RecordingStore::default());
    let engine = RotationEngine::new(
        Arc::clone(&fixture.context),
        Arc::new(CountingCipher::new(Some(corrupt_encryption))),
    )
    .with_store(contacts.clone())
    .with_store(payments.clone());

    let result = engine.rotate(OLD_CREDENTIAL, NEW_CREDENTIAL);

    assert!(
        matches!(result, Err(PaymentsError::ReversibilityFailure(_))),
        "unexpected result: {:?}",
        result
    );
    assert_eq!(fixture.summary_bytes(), summary_before);
    assert_eq!(std::fs::read(fixture.payments_path()).unwrap(), payments_before);
    assert!(contacts.rewrites.lock().is_empty());
    assert!(fixture.wallet.credential_calls.lock().is_empty());
    assert!(fixture.wallet.check_password(OLD_CREDENTIAL));
    assert_eq!(fixture.context.credential().as_str(), OLD_CREDENTIAL);

    let outcome = RotationOutcome::from_result(&result);
    assert!(!outcome.success);
    assert_eq!(outcome.reason, RotationReason::ReversibilityFailure);
    assert!(outcome.detail.is_some());
}

#[test]
fn test_successful_rotation_commits_everything() {
    let fixture = Fixture::new();
    let payments = fixture.payments();
    payments.initialise().unwrap();
    payments
        .add_payment_request(PaymentRequest::new("myShop", 10, chrono::Utc::now()))
        .unwrap();
    payments.write_payments().unwrap();

    let contacts = Arc::new(RecordingStore::default());
    let engine = RotationEngine::new(Arc::clone(&fixture.context), Arc::new(light_cipher()))
        .with_store(contacts.clone())
        .with_store(payments.clone());

    engine.rotate(OLD_CREDENTIAL, NEW_CREDENTIAL).unwrap();

    // wallet re-keyed after being decrypted with the old credential
    assert_eq!(*fixture.wallet.credential_calls.lock(), vec!["decrypt", "encrypt"]);
    assert!(fixture.wallet.check_password(NEW_CREDENTIAL));
    assert!(fixture.wallet.is_encrypted());
    assert_eq!(fixture.context.credential().as_str(), NEW_CREDENTIAL);
    assert_eq!(*contacts.rewrites.lock(), vec![NEW_CREDENTIAL.to_string()]);

    // summary on disk unwraps under the new credential only
    let cipher = light_cipher();
    let summary = WalletSummary::read(&fixture.context.summary_path()).unwrap();
    assert_eq!(summary, fixture.context.summary());
    let new_key = cipher.derive_key(NEW_CREDENTIAL).unwrap();
    let backup_key = summary.backup_key(&cipher, &new_key).unwrap();
    assert_eq!(summary.credential(&cipher, &backup_key).unwrap().as_str(), NEW_CREDENTIAL);
    let old_key = cipher.derive_key(OLD_CREDENTIAL).unwrap();
    assert!(summary.backup_key(&cipher, &old_key).is_err());

    // payments file follows the new credential
    let path = fixture.payments_path();
    assert!(store().load(&path, OLD_CREDENTIAL).is_err());
    let reopened = fixture.payments();
    reopened.initialise().unwrap();
    assert!(reopened.take_load_failure().is_none());
    assert!(reopened.payment_request("myShop").is_some());
}

#[test]
fn test_failed_store_rewrite_rolls_back() {
    let fixture = Fixture::new();
    let payments = fixture.payments();
    payments.initialise().unwrap();
    payments
        .add_payment_request(PaymentRequest::new("myShop", 10, chrono::Utc::now()))
        .unwrap();
    payments.write_payments().unwrap();
    let summary_before = fixture.summary_bytes();

    let contacts = Arc::new(RecordingStore::default());
    let engine = RotationEngine::new(Arc::clone(&fixture.context), Arc::new(light_cipher()))
        .with_store(payments.clone())
        .with_store(contacts.clone())
        .with_store(Arc::new(FailingStore));

    let result = engine.rotate(OLD_CREDENTIAL, NEW_CREDENTIAL);

    assert!(matches!(result, Err(PaymentsError::SaveFailure(_))));
    assert_eq!(
        RotationOutcome::from_result(&result).reason,
        RotationReason::SaveFailure
    );

    // wallet locked again under the old credential
    assert_eq!(*fixture.wallet.credential_calls.lock(), vec!["decrypt", "encrypt"]);
    assert!(fixture.wallet.is_encrypted());
    assert!(fixture.wallet.check_password(OLD_CREDENTIAL));
    assert_eq!(fixture.context.credential().as_str(), OLD_CREDENTIAL);

    // every file back under the old credential
    assert_eq!(fixture.summary_bytes(), summary_before);
    assert_eq!(
        *contacts.rewrites.lock(),
        vec![NEW_CREDENTIAL.to_string(), OLD_CREDENTIAL.to_string()]
    );
    assert!(store().load(&fixture.payments_path(), NEW_CREDENTIAL).is_err());
    let reopened = fixture.payments();
    reopened.initialise().unwrap();
    assert!(reopened.take_load_failure().is_none());
    assert!(reopened.payment_request("myShop").is_some());

    // a later rotation still starts from the old credential
    let engine = RotationEngine::new(Arc::clone(&fixture.context), Arc::new(light_cipher()))
        .with_store(reopened.clone());
    engine.rotate(OLD_CREDENTIAL, NEW_CREDENTIAL).unwrap();
    assert!(fixture.wallet.check_password(NEW_CREDENTIAL));
}

#[test]
fn test_outcome_reasons_are_distinct() {
    let io = || strongroom_storage::Error::Io(std::io::Error::other("disk"));
    let cases = [
        (Ok(()), RotationReason::Success),
        (Err(PaymentsError::CredentialMismatch), RotationReason::WrongOldPassword),
        (
            Err(PaymentsError::ReversibilityFailure("mismatch".to_string())),
            RotationReason::ReversibilityFailure,
        ),
        (Err(PaymentsError::LoadFailure(io())), RotationReason::LoadFailure),
        (Err(PaymentsError::SaveFailure(io())), RotationReason::SaveFailure),
        (
            Err(PaymentsError::PreconditionViolation("stopped".to_string())),
            RotationReason::PreconditionViolation,
        ),
        (
            Err(PaymentsError::Ledger(strongroom_core::Error::Wallet(
                "locked".to_string(),
            ))),
            RotationReason::Ledger,
        ),
    ];

    let mut seen = std::collections::HashSet::new();
    for (result, reason) in cases {
        let outcome = RotationOutcome::from_result(&result);
        assert_eq!(outcome.reason, reason);
        assert_eq!(outcome.success, result.is_ok());
        assert!(seen.insert(outcome.reason));
    }
}

#[test]
fn test_stale_summary_cannot_unwrap_backup_key() {
    let fixture = Fixture::new();
    // summary wrapped under a different credential than the wallet's
    let (foreign, _) = WalletSummary::create(
        fixture.context.wallet_id(),
        "Foreign",
        "someone else",
        &AesGcmCipher::new(KdfParams::new(256, 1, 1)),
    )
    .unwrap();
    fixture.context.set_summary(foreign);
    let before = fixture.summary_bytes();

    let engine = RotationEngine::new(Arc::clone(&fixture.context), Arc::new(light_cipher()));
    let result = engine.rotate(OLD_CREDENTIAL, NEW_CREDENTIAL);

    assert!(matches!(result, Err(PaymentsError::LoadFailure(_))));
    assert_eq!(
        RotationOutcome::from_result(&result).reason,
        RotationReason::LoadFailure
    );
    assert_eq!(fixture.summary_bytes(), before);
    assert!(fixture.wallet.credential_calls.lock().is_empty());
}

#[tokio::test]
async fn test_worker_publishes_outcomes_in_order() {
    let fixture = Fixture::new();
    let engine = RotationEngine::new(Arc::clone(&fixture.context), Arc::new(light_cipher()));
    let rotation = CredentialRotation::with_config(engine, &fixture.config);
    let mut outcomes = rotation.subscribe();

    rotation.request("wrong", NEW_CREDENTIAL).await.unwrap();
    rotation.request(OLD_CREDENTIAL, NEW_CREDENTIAL).await.unwrap();
    rotation.request(NEW_CREDENTIAL, "third credential").await.unwrap();

    let first = outcomes.recv().await.unwrap();
    assert!(!first.success);
    assert_eq!(first.reason, RotationReason::WrongOldPassword);

    let second = outcomes.recv().await.unwrap();
    assert!(second.success, "{:?}", second.detail);
    assert_eq!(second.reason, RotationReason::Success);

    let third = outcomes.recv().await.unwrap();
    assert!(third.success, "{:?}", third.detail);

    rotation.shutdown().await;
    assert!(fixture.wallet.check_password("third credential"));
    assert_eq!(fixture.context.credential().as_str(), "third credential");
}
