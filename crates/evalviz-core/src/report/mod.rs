pub mod console;
pub mod summary;

pub use summary::{dataset_digest, write_summary, Provenance, Summary};
