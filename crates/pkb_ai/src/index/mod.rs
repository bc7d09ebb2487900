pub mod model;
pub mod store;

use sha2::{Digest, Sha256};

pub use model::{IndexChunk, IndexMeta, PolicyIndex, PolicySummary, INDEX_SCHEMA};
pub use store::{IndexBuildInput, IndexStore};

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
