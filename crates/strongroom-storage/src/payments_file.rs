//! Payments file layout
//!
//! The payments snapshot lives at `<wallet-directory>/payments/payments.aes`.

use std::path::{Path, PathBuf};

use crate::codec::{self, Snapshot};
use crate::encrypted_file::EncryptedFileStore;
use crate::Result;
use strongroom_core::{PaymentRequest, TransactionAnnotation};

/// Directory under the wallet directory
pub const PAYMENTS_DIRECTORY_NAME: &str = "payments";

/// Snapshot file name
pub const PAYMENTS_DATABASE_NAME: &str = "payments.aes";

/// Payments snapshot file of one wallet
#[derive(Debug, Clone)]
pub struct PaymentsFile {
    directory: PathBuf,
    path: PathBuf,
}

impl PaymentsFile {
    /// Layout under a wallet directory
    pub fn for_wallet_directory(wallet_directory: &Path) -> Self {
        let directory = wallet_directory.join(PAYMENTS_DIRECTORY_NAME);
        let path = directory.join(PAYMENTS_DATABASE_NAME);
        Self { directory, path }
    }

    /// Payments directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the payments directory if needed
    pub fn ensure_directory(&self) -> Result<()> {
        std::fs::create_dir_all(&self.directory)?;
        Ok(())
    }

    /// Encode and seal the store contents
    pub fn save(
        &self,
        store: &EncryptedFileStore,
        credential: &str,
        requests: &[PaymentRequest],
        annotations: &[TransactionAnnotation],
    ) -> Result<()> {
        self.ensure_directory()?;
        let plaintext = codec::encode(requests, annotations);
        store.save(&self.path, credential, &plaintext)
    }

    /// Open and decode the snapshot; `None` when the file does not exist yet
    pub fn load(&self, store: &EncryptedFileStore, credential: &str) -> Result<Option<Snapshot>> {
        match store.load(&self.path, credential) {
            Ok(plaintext) => codec::decode(&plaintext).map(Some),
            Err(e) if e.is_missing() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{AesGcmCipher, KdfParams};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use strongroom_core::FiatPayment;

    #[test]
    fn test_layout_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = PaymentsFile::for_wallet_directory(dir.path());
        assert_eq!(file.path(), dir.path().join("payments").join("payments.aes"));

        let store =
            EncryptedFileStore::new(Arc::new(AesGcmCipher::new(KdfParams::new(256, 1, 1))));
        assert!(file.load(&store, "pw").unwrap().is_none());

        let request = PaymentRequest::new("1A", 10, Utc.timestamp_millis_opt(1_000).unwrap());
        let annotation = TransactionAnnotation::new("ff", FiatPayment::default());
        file.save(&store, "pw", &[request.clone()], &[annotation.clone()])
            .unwrap();

        let snapshot = file.load(&store, "pw").unwrap().unwrap();
        assert_eq!(snapshot.requests, vec![request]);
        assert_eq!(snapshot.annotations, vec![annotation]);
    }
}
