use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::mapping::GlobalTranslationMapping;
use crate::progress::Diagnostics;
use crate::svg::xml::save_svg;

use super::injector::{inject, InjectOptions};
use super::stats::{ErrorKind, InjectStats};

/// Aggregate result of a batch run, one `files` entry per input file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub saved_done: usize,
    pub no_save: usize,
    pub nested_files: usize,
    pub files: BTreeMap<String, InjectStats>,
}

/// Injects `translations` into every file and writes the results to
/// `output_dir/<file name>`. Keys are matched with the case folding the mapping was
/// extracted with (folded when unrecorded).
///
/// Per-file failures are recorded in the report and never stop the run; only an
/// output directory that cannot be created is returned as an error.
pub fn start_injects(
    files: &[PathBuf],
    translations: &GlobalTranslationMapping,
    output_dir: &Path,
    overwrite: bool,
    diag: &dyn Diagnostics,
) -> anyhow::Result<BatchReport> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir: {}", output_dir.display()))?;

    let options = InjectOptions {
        case_insensitive: translations.case_insensitive.unwrap_or(true),
        overwrite,
        save_result: false,
        return_stats: true,
        ..InjectOptions::default()
    };

    let mut report = BatchReport::default();
    for (idx, file) in files.iter().enumerate() {
        diag.progress("Inject files:", idx + 1, files.len());
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        if report.files.contains_key(&name) {
            // Same name from another directory: its output would clobber the earlier one.
            let key = unique_report_key(&report.files, file);
            diag.error(&format!(
                "Duplicate file name {name}: {} not written to {}",
                file.display(),
                output_dir.display()
            ));
            let mut stats = InjectStats::default();
            stats.fail(ErrorKind::DuplicateName);
            report.no_save += 1;
            report.files.insert(key, stats);
            continue;
        }

        let (doc, stats) = inject(file, translations, &options, diag);
        let mut stats = stats.unwrap_or_default();
        stats.file_path.clear();

        let Some(doc) = doc else {
            if stats.error == Some(ErrorKind::NestedTspans) {
                report.nested_files += 1;
            } else {
                report.no_save += 1;
            }
            report.files.insert(name, stats);
            continue;
        };

        let output_file = output_dir.join(&name);
        match save_svg(&doc, &output_file) {
            Ok(()) => {
                stats.saved(output_file.display().to_string());
                report.saved_done += 1;
            }
            Err(err) => {
                diag.error(&format!("Failed writing {}: {err:#}", output_file.display()));
                stats.fail(ErrorKind::WriteFailed);
                report.no_save += 1;
            }
        }
        report.files.insert(name, stats);
    }

    diag.debug(&format!(
        "all files: {} Saved {}, skipped {}, nested_files: {}",
        files.len(),
        report.saved_done,
        report.no_save,
        report.nested_files
    ));

    Ok(report)
}

/// Report key for an input whose file name is already taken: its full path, suffixed
/// with `#N` if even that repeats.
fn unique_report_key(files: &BTreeMap<String, InjectStats>, file: &Path) -> String {
    let base = file.display().to_string();
    let mut key = base.clone();
    let mut n = 1;
    while files.contains_key(&key) {
        key = format!("{base}#{n}");
        n += 1;
    }
    key
}
