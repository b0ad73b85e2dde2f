//! Derived artifacts attached to a recipe before it is saved: a durable
//! thumbnail, the semantic embedding, and optional step-zero narration.

mod embedding;
mod narration;
mod thumbnail;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ai::AiError;
use crate::media::ResolveError;
use crate::storage::StorageError;

pub use embedding::{embedding_fingerprint, generate_embedding};
pub use narration::synthesize_narration;
pub use thumbnail::persist_thumbnail;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Content service error: {0}")]
    Ai(#[from] AiError),

    #[error("Content service returned an empty embedding")]
    EmptyEmbedding,

    #[error("{0} timed out after {1}s")]
    TimedOut(&'static str, u64),

    #[error("Thumbnail fetch failed: {0}")]
    Retrieval(#[from] ResolveError),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lowercase hex SHA-256 of `data`, used as a content-addressed object name.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
