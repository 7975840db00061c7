use std::path::Path;

use data_encoding::HEXLOWER_PERMISSIVE;
use hmac::{Hmac, Mac};
use rocket::tokio::fs;
use sha2::Sha256;

use super::{fs_reader::METADATA_FILE_NAME, ArtifactAuthenticator, AuthenticationError};

/// Signature file within an export directory.
pub const SIGNATURE_FILE_NAME: &str = "signature";

pub type HmacSha256 = Hmac<Sha256>;

/// Verifies the HMAC-SHA256 signature a scanner writes over its export
/// metadata, which in turn commits to every record.
#[derive(Clone)]
pub struct HmacAuthenticator {
    key: Vec<u8>,
}

impl HmacAuthenticator {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

/// Hex signature of the given metadata bytes, as a scanner would write it.
pub fn sign_metadata(key: &[u8], metadata: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(metadata);
    data_encoding::HEXLOWER.encode(&mac.finalize().into_bytes())
}

#[rocket::async_trait]
impl ArtifactAuthenticator for HmacAuthenticator {
    async fn verify(&self, export_path: &Path) -> Result<(), AuthenticationError> {
        let metadata = fs::read(export_path.join(METADATA_FILE_NAME))
            .await
            .map_err(|e| AuthenticationError(format!("Cannot read metadata: {e}")))?;
        let signature = fs::read_to_string(export_path.join(SIGNATURE_FILE_NAME))
            .await
            .map_err(|e| AuthenticationError(format!("Cannot read signature: {e}")))?;
        let signature = HEXLOWER_PERMISSIVE
            .decode(signature.trim().as_bytes())
            .map_err(|_| AuthenticationError("Signature is not valid hex".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(&metadata);
        mac.verify_slice(&signature)
            .map_err(|_| AuthenticationError("Signature does not match".to_string()))
    }
}
