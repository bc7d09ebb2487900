pub mod extract;
pub mod filename;
pub mod scan;

pub use extract::{extract_docx, extract_text, SourceFormat};
pub use filename::parse_policy_filename;
pub use scan::{load_policy_documents, scan_policy_dir};
