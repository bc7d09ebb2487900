pub mod domain;
pub mod error;
pub mod ingest;
pub mod normalize;
