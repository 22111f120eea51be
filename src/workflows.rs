//! Extract from one SVG and inject into others in a single call.

use std::path::{Path, PathBuf};

use crate::extraction::extract;
use crate::injection::{inject, start_injects, BatchReport, InjectOptions, InjectStats};
use crate::progress::Diagnostics;

/// Extracts translations from `source` and writes them into `target`, saving the
/// result to `output_file` (or `<target dir>/translated/<name>` when unset).
///
/// Returns `None` when the source yields no translations.
pub fn svg_extract_and_inject(
    source: &Path,
    target: &Path,
    output_file: Option<PathBuf>,
    overwrite: bool,
    diag: &dyn Diagnostics,
) -> Option<InjectStats> {
    let translations = extract(source, true, diag)?;
    if translations.is_empty() {
        diag.info(&format!("No translations found in {}", source.display()));
        return None;
    }
    let options = InjectOptions {
        overwrite,
        save_result: true,
        return_stats: true,
        output_file,
        ..InjectOptions::default()
    };
    let (_, stats) = inject(target, &translations, &options, diag);
    stats
}

/// Extracts translations from `source` once and injects them into every target.
pub fn svg_extract_and_injects(
    source: &Path,
    targets: &[PathBuf],
    output_dir: &Path,
    overwrite: bool,
    diag: &dyn Diagnostics,
) -> anyhow::Result<Option<BatchReport>> {
    let Some(translations) = extract(source, true, diag) else {
        return Ok(None);
    };
    if translations.is_empty() {
        diag.info(&format!("No translations found in {}", source.display()));
        return Ok(None);
    }
    start_injects(targets, &translations, output_dir, overwrite, diag).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injection::OutcomeStatus;
    use crate::progress::NullDiagnostics;

    const SOURCE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><switch>
<text systemLanguage="es"><tspan>Pandemia de COVID-19 2020</tspan></text>
<text><tspan>COVID-19 pandemic 2020</tspan></text>
</switch></svg>"#;

    const TARGET: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><switch>
<text id="title"><tspan>COVID-19 pandemic 1990</tspan></text>
</switch></svg>"#;

    #[test]
    fn title_from_one_year_is_applied_to_another() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source.svg");
        let target = dir.path().join("target.svg");
        let output = dir.path().join("out.svg");
        std::fs::write(&source, SOURCE).expect("write source");
        std::fs::write(&target, TARGET).expect("write target");

        let stats = svg_extract_and_inject(&source, &target, Some(output.clone()), false, &NullDiagnostics)
            .expect("stats");
        assert_eq!(stats.status, OutcomeStatus::Saved);
        assert_eq!(stats.inserted_translations, 1);
        let written = std::fs::read_to_string(&output).expect("read output");
        assert!(written.contains(
            r#"<text id="title-es" systemLanguage="es"><tspan>Pandemia de COVID-19 1990</tspan></text>"#
        ));
    }

    #[test]
    fn source_without_translations_gives_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("plain.svg");
        let target = dir.path().join("target.svg");
        std::fs::write(&source, "<svg><text>Alone</text></svg>").expect("write source");
        std::fs::write(&target, TARGET).expect("write target");

        assert!(svg_extract_and_inject(&source, &target, None, false, &NullDiagnostics).is_none());
        let report = svg_extract_and_injects(
            &source,
            &[target],
            &dir.path().join("out"),
            false,
            &NullDiagnostics,
        )
        .expect("batch");
        assert!(report.is_none());
    }

    #[test]
    fn batch_variant_reports_every_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source.svg");
        std::fs::write(&source, SOURCE).expect("write source");
        let targets: Vec<PathBuf> = ["a.svg", "b.svg"]
            .iter()
            .map(|n| {
                let p = dir.path().join(n);
                std::fs::write(&p, TARGET).expect("write target");
                p
            })
            .collect();

        let report = svg_extract_and_injects(&source, &targets, &dir.path().join("out"), false, &NullDiagnostics)
            .expect("batch")
            .expect("report");
        assert_eq!(report.saved_done, 2);
        assert_eq!(report.files.len(), 2);
    }
}
