mod batch;
mod injector;
mod stats;

pub use batch::{start_injects, BatchReport};
pub use injector::{generate_unique_id, inject, inject_into_document, InjectOptions};
pub use stats::{ErrorKind, InjectStats, OutcomeStatus};
