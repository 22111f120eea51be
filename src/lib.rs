pub mod config;
pub mod error;
pub mod extraction;
pub mod injection;
pub mod mapping;
pub mod progress;
pub mod svg;
pub mod textutil;
pub mod titles;
pub mod workflows;

pub use error::SvgTextError;
pub use extraction::{extract, extract_from_document};
pub use injection::{inject, start_injects, BatchReport, ErrorKind, InjectOptions, InjectStats};
pub use mapping::{GlobalTranslationMapping, TranslationMap};
pub use textutil::normalize_text;
pub use titles::{derive_title_mapping, reconstruct_titles};
pub use workflows::{svg_extract_and_inject, svg_extract_and_injects};
