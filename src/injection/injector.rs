use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::mapping::{GlobalTranslationMapping, LangMap, TranslationMap};
use crate::progress::Diagnostics;
use crate::svg::nodes::{extract_text_from_node, language_tag, ElementIndex, ElementSpan, SYSTEM_LANGUAGE};
use crate::svg::xml::{read_svg, save_svg, SvgDocument, XmlEvent};
use crate::textutil::normalize_text;
use crate::titles::reconstruct_titles;

use super::stats::{ErrorKind, InjectStats, OutcomeStatus};

#[derive(Clone, Debug)]
pub struct InjectOptions {
    /// Fold case when looking up default texts in the mapping.
    pub case_insensitive: bool,
    /// Replace language variants already present in the target.
    pub overwrite: bool,
    /// Write the result to disk; otherwise the caller serializes the returned document.
    pub save_result: bool,
    /// Return the per-file stats alongside the document.
    pub return_stats: bool,
    pub output_file: Option<PathBuf>,
    /// Used when `output_file` is unset; defaults to `<input dir>/translated`.
    pub output_dir: Option<PathBuf>,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            overwrite: false,
            save_result: false,
            return_stats: true,
            output_file: None,
            output_dir: None,
        }
    }
}

/// Injects `all_mappings` into the SVG at `file`.
///
/// Expected per-file problems (missing file, bad markup, nested tspans, write failure)
/// never error out: the document slot is `None` and the stats carry the error kind.
pub fn inject(
    file: &Path,
    all_mappings: &GlobalTranslationMapping,
    options: &InjectOptions,
    diag: &dyn Diagnostics,
) -> (Option<SvgDocument>, Option<InjectStats>) {
    let mut stats = InjectStats::default();

    if !file.exists() {
        diag.error(&format!("SVG file not found: {}", file.display()));
        stats.fail(ErrorKind::FileNotFound);
        return finish(options, None, stats);
    }

    let mut doc = match read_svg(file) {
        Ok(doc) => doc,
        Err(err) => {
            diag.error(&format!("Failed to parse SVG file {}: {err:#}", file.display()));
            stats.fail(ErrorKind::ParseFailed);
            return finish(options, None, stats);
        }
    };

    if let Err(kind) = inject_into_document(
        &mut doc,
        all_mappings,
        options.case_insensitive,
        options.overwrite,
        &mut stats,
        diag,
    ) {
        stats.fail(kind);
        return finish(options, None, stats);
    }

    if options.save_result {
        let output = resolve_output_path(file, options);
        if let Err(err) = write_output(&doc, &output) {
            diag.error(&format!("Failed writing {}: {err:#}", output.display()));
            stats.fail(ErrorKind::WriteFailed);
            return finish(options, None, stats);
        }
        diag.debug(&format!("Saved translated SVG to {}", output.display()));
        stats.saved(output.display().to_string());
    } else {
        stats.status = OutcomeStatus::Skipped;
    }

    finish(options, Some(doc), stats)
}

fn finish(
    options: &InjectOptions,
    doc: Option<SvgDocument>,
    stats: InjectStats,
) -> (Option<SvgDocument>, Option<InjectStats>) {
    (doc, options.return_stats.then_some(stats))
}

fn resolve_output_path(file: &Path, options: &InjectOptions) -> PathBuf {
    if let Some(path) = options.output_file.as_ref() {
        return path.clone();
    }
    let name = file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output.svg".into());
    let dir = options.output_dir.clone().unwrap_or_else(|| {
        file.parent()
            .unwrap_or_else(|| Path::new("."))
            .join("translated")
    });
    dir.join(name)
}

fn write_output(doc: &SvgDocument, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }
    save_svg(doc, path)
}

enum Edit {
    Insert { at: usize, events: Vec<XmlEvent> },
    Replace { span: ElementSpan, events: Vec<XmlEvent> },
}

impl Edit {
    fn position(&self) -> usize {
        match self {
            Edit::Insert { at, .. } => *at,
            Edit::Replace { span, .. } => span.start,
        }
    }
}

/// Adds one `<text systemLanguage=..>` variant per translatable language to every
/// switch block of `doc`, counting the work in `stats`.
pub fn inject_into_document(
    doc: &mut SvgDocument,
    mappings: &GlobalTranslationMapping,
    case_insensitive: bool,
    overwrite: bool,
    stats: &mut InjectStats,
    diag: &dyn Diagnostics,
) -> Result<(), ErrorKind> {
    let index = ElementIndex::build(doc);
    let switches = index.descendants(doc, "switch");
    let mut ids = collect_ids(doc);
    let mut languages_before: BTreeSet<String> = BTreeSet::new();
    let mut languages_inserted: BTreeSet<String> = BTreeSet::new();
    let mut edits: Vec<Edit> = Vec::new();

    for switch in switches {
        let text_elements = index.children(doc, switch, "text");
        if text_elements.is_empty() {
            continue;
        }

        let mut existing: BTreeMap<String, ElementSpan> = BTreeMap::new();
        for span in &text_elements {
            if let Some(lang) = language_tag(doc, *span) {
                languages_before.insert(lang.clone());
                existing.entry(lang).or_insert(*span);
            }
        }

        let Some(default_elem) = text_elements
            .iter()
            .copied()
            .find(|t| language_tag(doc, *t).is_none())
        else {
            continue;
        };
        let raw = extract_text_from_node(doc, &index, default_elem).map_err(|err| {
            diag.error(&format!("{}: {err}", doc.name));
            ErrorKind::NestedTspans
        })?;
        let keys: Vec<String> = raw
            .iter()
            .map(|t| normalize_text(t, case_insensitive))
            .collect();
        if keys.iter().all(|k| k.is_empty()) {
            continue;
        }

        let titles = reconstruct_titles(&mappings.title, keys.iter().filter(|k| !k.is_empty()));
        let mut candidates: BTreeSet<String> = BTreeSet::new();
        for key in keys.iter().filter(|k| !k.is_empty()) {
            if let Some(langs) = lookup_key(&mappings.direct, &titles, key) {
                candidates.extend(
                    langs
                        .iter()
                        .filter(|(_, v)| !v.is_empty())
                        .map(|(l, _)| l.clone()),
                );
            }
        }
        if candidates.is_empty() {
            continue;
        }
        stats.processed_switches += 1;

        let mut new_variants: Vec<XmlEvent> = Vec::new();
        for lang in candidates {
            let translations: Option<Vec<Option<String>>> = keys
                .iter()
                .map(|key| {
                    if key.is_empty() {
                        return Some(None);
                    }
                    lookup_key(&mappings.direct, &titles, key)
                        .and_then(|m| m.get(&lang))
                        .filter(|v| !v.is_empty())
                        .map(|v| Some(v.clone()))
                })
                .collect();
            let Some(translations) = translations else {
                diag.debug(&format!(
                    "Incomplete translation for language '{lang}' in {}",
                    doc.name
                ));
                stats.skipped_translations += 1;
                continue;
            };

            match existing.get(&lang).copied() {
                Some(_) if !overwrite => {
                    stats.skipped_translations += 1;
                }
                Some(span) => {
                    let current = extract_text_from_node(doc, &index, span).map_err(|err| {
                        diag.error(&format!("{}: {err}", doc.name));
                        ErrorKind::NestedTspans
                    })?;
                    if matches_current(&current, &translations) {
                        stats.skipped_translations += 1;
                        continue;
                    }
                    let keep_id = doc.events[span.start].attr("id");
                    let events = translated_copy(
                        doc,
                        &index,
                        default_elem,
                        &translations,
                        &lang,
                        keep_id,
                        &mut ids,
                    );
                    edits.push(Edit::Replace { span, events });
                    stats.updated_translations += 1;
                }
                None => {
                    new_variants.extend(translated_copy(
                        doc,
                        &index,
                        default_elem,
                        &translations,
                        &lang,
                        None,
                        &mut ids,
                    ));
                    languages_inserted.insert(lang);
                    stats.inserted_translations += 1;
                }
            }
        }
        if !new_variants.is_empty() {
            edits.push(Edit::Insert {
                at: default_elem.start,
                events: new_variants,
            });
        }
    }

    // Back to front so earlier positions stay valid.
    edits.sort_by_key(|e| std::cmp::Reverse(e.position()));
    for edit in edits {
        match edit {
            Edit::Insert { at, events } => {
                doc.events.splice(at..at, events);
            }
            Edit::Replace { span, events } => {
                doc.events.splice(span.start..=span.end, events);
            }
        }
    }

    stats.all_languages = languages_before.union(&languages_inserted).count();
    stats.new_languages = languages_inserted.difference(&languages_before).count();
    diag.debug(&format!(
        "{}: processed {} switches, inserted {}, updated {}, skipped {}",
        doc.name,
        stats.processed_switches,
        stats.inserted_translations,
        stats.updated_translations,
        stats.skipped_translations
    ));
    Ok(())
}

/// Direct entries win over titles rebuilt for this block.
fn lookup_key<'a>(
    direct: &'a TranslationMap,
    titles: &'a TranslationMap,
    key: &str,
) -> Option<&'a LangMap> {
    direct.get(key).or_else(|| titles.get(key))
}

fn matches_current(current: &[String], translations: &[Option<String>]) -> bool {
    current.len() == translations.len()
        && current
            .iter()
            .zip(translations)
            .all(|(cur, new)| match new {
                Some(value) => normalize_text(cur, false) == normalize_text(value, false),
                None => true,
            })
}

fn collect_ids(doc: &SvgDocument) -> HashSet<String> {
    doc.events.iter().filter_map(|ev| ev.attr("id")).collect()
}

/// `{base}-{lang}`, suffixed with `-1`, `-2`, ... until unused.
pub fn generate_unique_id(base: &str, lang: &str, existing: &mut HashSet<String>) -> String {
    let mut candidate = format!("{base}-{lang}");
    let mut n = 1;
    while existing.contains(&candidate) {
        candidate = format!("{base}-{lang}-{n}");
        n += 1;
    }
    existing.insert(candidate.clone());
    candidate
}

/// Copy of the default `<text>` element tagged with `lang`, each fragment replaced by
/// its translation (`None` keeps the fragment as is).
fn translated_copy(
    doc: &SvgDocument,
    index: &ElementIndex,
    text_elem: ElementSpan,
    translations: &[Option<String>],
    lang: &str,
    keep_id: Option<String>,
    ids: &mut HashSet<String>,
) -> Vec<XmlEvent> {
    let mut head = doc.events[text_elem.start].clone();
    head.set_attr(SYSTEM_LANGUAGE, lang);
    match keep_id {
        Some(id) => head.set_attr("id", &id),
        None => {
            if let Some(id) = head.attr("id") {
                head.set_attr("id", &generate_unique_id(&id, lang, ids));
            }
        }
    }

    let tspans = index.children(doc, text_elem, "tspan");
    if tspans.is_empty() {
        let value = translations.first().cloned().flatten();
        return copy_with_text(doc, index, text_elem, head, value.as_deref());
    }

    let slots: HashMap<usize, (ElementSpan, Option<&str>)> = tspans
        .iter()
        .enumerate()
        .map(|(k, span)| {
            let value = translations.get(k).and_then(|v| v.as_deref());
            (span.start, (*span, value))
        })
        .collect();

    let mut out = vec![head];
    let mut i = text_elem.start + 1;
    while i < text_elem.end {
        if let Some((span, value)) = slots.get(&i) {
            let mut tspan_head = doc.events[span.start].clone();
            if let Some(id) = tspan_head.attr("id") {
                tspan_head.set_attr("id", &generate_unique_id(&id, lang, ids));
            }
            out.extend(copy_with_text(doc, index, *span, tspan_head, *value));
            i = span.end + 1;
        } else {
            out.push(doc.events[i].clone());
            i += 1;
        }
    }
    out.push(doc.events[text_elem.end].clone());
    out
}

/// Copies the element at `span` with `head` as its opening event. With `text`, the
/// element's direct character data is replaced by it; child elements are kept.
fn copy_with_text(
    doc: &SvgDocument,
    index: &ElementIndex,
    span: ElementSpan,
    head: XmlEvent,
    text: Option<&str>,
) -> Vec<XmlEvent> {
    let Some(text) = text else {
        let mut out = vec![head];
        if !span.is_empty_element() {
            out.extend(doc.events[span.start + 1..=span.end].iter().cloned());
        }
        return out;
    };

    if span.is_empty_element() {
        if text.is_empty() {
            return vec![head];
        }
        return match head {
            XmlEvent::Empty { name, attrs } => vec![
                XmlEvent::Start {
                    name: name.clone(),
                    attrs,
                },
                XmlEvent::Text {
                    text: text.to_string(),
                },
                XmlEvent::End { name },
            ],
            other => vec![other],
        };
    }

    let mut out = vec![
        head,
        XmlEvent::Text {
            text: text.to_string(),
        },
    ];
    let mut i = span.start + 1;
    while i < span.end {
        match &doc.events[i] {
            XmlEvent::Text { .. } | XmlEvent::CData { .. } => i += 1,
            XmlEvent::Start { .. } => {
                let child = index.span(i);
                out.extend(doc.events[child.start..=child.end].iter().cloned());
                i = child.end + 1;
            }
            ev => {
                out.push(ev.clone());
                i += 1;
            }
        }
    }
    out.push(doc.events[span.end].clone());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::extract_from_document;
    use crate::progress::{MemoryDiagnostics, NullDiagnostics};
    use crate::svg::xml::{parse_svg, write_svg};

    fn mapping(direct: &[(&str, &[(&str, &str)])]) -> GlobalTranslationMapping {
        let mut m = GlobalTranslationMapping::default();
        for (key, langs) in direct {
            m.direct.insert(
                key.to_string(),
                langs
                    .iter()
                    .map(|(l, t)| (l.to_string(), t.to_string()))
                    .collect(),
            );
        }
        m
    }

    fn run(xml: &str, m: &GlobalTranslationMapping, overwrite: bool) -> (String, InjectStats) {
        let mut doc = parse_svg("t.svg", xml.as_bytes()).expect("parse svg");
        let mut stats = InjectStats::default();
        inject_into_document(&mut doc, m, true, overwrite, &mut stats, &NullDiagnostics)
            .expect("inject");
        let out = write_svg(&doc);
        (out, stats)
    }

    #[test]
    fn new_language_is_inserted_before_default() {
        let m = mapping(&[("hello", &[("es", "Hola")]), ("world", &[("es", "Mundo")])]);
        let (out, stats) = run(
            r#"<svg><switch><text id="t1" x="5"><tspan id="t1a">Hello</tspan><tspan>World</tspan></text></switch></svg>"#,
            &m,
            false,
        );
        assert_eq!(
            out,
            r#"<svg><switch><text id="t1-es" x="5" systemLanguage="es"><tspan id="t1a-es">Hola</tspan><tspan>Mundo</tspan></text><text id="t1" x="5"><tspan id="t1a">Hello</tspan><tspan>World</tspan></text></switch></svg>"#
        );
        assert_eq!(stats.processed_switches, 1);
        assert_eq!(stats.inserted_translations, 1);
        assert_eq!(stats.new_languages, 1);
        assert_eq!(stats.all_languages, 1);
    }

    #[test]
    fn plain_text_element_and_id_collisions() {
        let m = mapping(&[("yes", &[("fr", "Oui")])]);
        let (out, _) = run(
            r#"<svg><g id="a-fr"/><switch><text id="a">Yes</text></switch></svg>"#,
            &m,
            false,
        );
        assert!(out.contains(r#"<text id="a-fr-1" systemLanguage="fr">Oui</text><text id="a">Yes</text>"#));
    }

    #[test]
    fn existing_language_is_kept_without_overwrite() {
        let m = mapping(&[("hello", &[("es", "Hola"), ("de", "Hallo")])]);
        let xml = r#"<svg><switch><text id="e" systemLanguage="es">Buenas</text><text>Hello</text></switch></svg>"#;
        let (out, stats) = run(xml, &m, false);
        assert!(out.contains(r#"<text id="e" systemLanguage="es">Buenas</text>"#));
        assert!(out.contains(r#"<text systemLanguage="de">Hallo</text>"#));
        assert_eq!(stats.inserted_translations, 1);
        assert_eq!(stats.skipped_translations, 1);
        assert_eq!(stats.all_languages, 2);
        assert_eq!(stats.new_languages, 1);
    }

    #[test]
    fn overwrite_replaces_changed_variant_and_keeps_its_id() {
        let m = mapping(&[("hello", &[("es", "Hola")])]);
        let xml = r#"<svg><switch><text id="e" systemLanguage="es">Buenas</text><text id="d">Hello</text></switch></svg>"#;
        let (out, stats) = run(xml, &m, true);
        assert_eq!(
            out,
            r#"<svg><switch><text id="e" systemLanguage="es">Hola</text><text id="d">Hello</text></switch></svg>"#
        );
        assert_eq!(stats.updated_translations, 1);
        assert_eq!(stats.new_languages, 0);

        let (again, stats) = run(&out, &m, true);
        assert_eq!(again, out);
        assert_eq!(stats.updated_translations, 0);
        assert_eq!(stats.skipped_translations, 1);
    }

    #[test]
    fn incomplete_language_is_skipped() {
        let m = mapping(&[("one", &[("es", "Uno"), ("fr", "Un")]), ("two", &[("es", "Dos")])]);
        let (out, stats) = run(
            r#"<svg><switch><text><tspan>One</tspan><tspan> </tspan><tspan>Two</tspan></text></switch></svg>"#,
            &m,
            false,
        );
        assert!(out.contains(r#"<text systemLanguage="es"><tspan>Uno</tspan><tspan> </tspan><tspan>Dos</tspan></text>"#));
        assert!(!out.contains(r#"systemLanguage="fr""#));
        assert_eq!(stats.inserted_translations, 1);
        assert_eq!(stats.skipped_translations, 1);
    }

    #[test]
    fn year_titles_are_rebuilt_for_new_years() {
        let mut m = GlobalTranslationMapping::default();
        m.title.insert(
            "covid-19 pandemic".into(),
            [("es".to_string(), "Pandemia de COVID-19".to_string())]
                .into_iter()
                .collect(),
        );
        let (out, stats) = run(
            r#"<svg><switch><text>COVID-19 pandemic 1990</text></switch></svg>"#,
            &m,
            false,
        );
        assert!(out.contains(r#"<text systemLanguage="es">Pandemia de COVID-19 1990</text>"#));
        assert_eq!(stats.inserted_translations, 1);
    }

    #[test]
    fn direct_entry_wins_over_rebuilt_title() {
        let mut m = mapping(&[("report 2020", &[("es", "Informe anual 2020")])]);
        m.title.insert(
            "report".into(),
            [("es".to_string(), "Informe".to_string())].into_iter().collect(),
        );
        let (out, _) = run(r#"<svg><switch><text>Report 2020</text></switch></svg>"#, &m, false);
        assert!(out.contains(">Informe anual 2020<"));
    }

    #[test]
    fn nested_default_fails_the_document() {
        let m = mapping(&[("a", &[("es", "A")])]);
        let mut doc = parse_svg(
            "n.svg",
            br#"<svg><switch><text><tspan>a<tspan>b</tspan></tspan></text></switch></svg>"#,
        )
        .expect("parse");
        let mut stats = InjectStats::default();
        let diag = MemoryDiagnostics::new();
        let res = inject_into_document(&mut doc, &m, true, false, &mut stats, &diag);
        assert_eq!(res, Err(ErrorKind::NestedTspans));
        assert!(diag.contains("nested tspans"));
    }

    #[test]
    fn injected_output_extracts_back_to_mapping() {
        let m = mapping(&[("hello", &[("es", "Hola"), ("fr", "Bonjour")])]);
        let (out, _) = run(r#"<svg><switch><text>Hello</text></switch></svg>"#, &m, false);
        let doc = parse_svg("o.svg", out.as_bytes()).expect("parse");
        let extracted = extract_from_document(&doc, true, &NullDiagnostics);
        assert_eq!(extracted.direct, m.direct);
    }

    #[test]
    fn file_level_outcomes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let m = mapping(&[("hello", &[("es", "Hola")])]);
        let opts = InjectOptions::default();

        let (doc, stats) = inject(&dir.path().join("none.svg"), &m, &opts, &NullDiagnostics);
        assert!(doc.is_none());
        assert_eq!(stats.expect("stats").error, Some(ErrorKind::FileNotFound));

        let bad = dir.path().join("bad.svg");
        std::fs::write(&bad, "<svg><switch>").expect("write");
        let (doc, stats) = inject(&bad, &m, &opts, &NullDiagnostics);
        assert!(doc.is_none());
        assert_eq!(stats.expect("stats").error, Some(ErrorKind::ParseFailed));

        let good = dir.path().join("good.svg");
        std::fs::write(&good, r#"<svg><switch><text>Hello</text></switch></svg>"#).expect("write");
        let (doc, stats) = inject(&good, &m, &opts, &NullDiagnostics);
        assert!(doc.is_some());
        let stats = stats.expect("stats");
        assert_eq!(stats.status, OutcomeStatus::Skipped);
        assert_eq!(stats.error, None);
        assert!(stats.file_path.is_empty());

        let no_stats = InjectOptions {
            return_stats: false,
            ..InjectOptions::default()
        };
        let (_, stats) = inject(&good, &m, &no_stats, &NullDiagnostics);
        assert!(stats.is_none());
    }

    #[test]
    fn save_result_writes_under_translated_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let m = mapping(&[("hello", &[("es", "Hola")])]);
        let good = dir.path().join("good.svg");
        std::fs::write(&good, r#"<svg><switch><text>Hello</text></switch></svg>"#).expect("write");

        let opts = InjectOptions {
            save_result: true,
            ..InjectOptions::default()
        };
        let (doc, stats) = inject(&good, &m, &opts, &NullDiagnostics);
        assert!(doc.is_some());
        let stats = stats.expect("stats");
        let expected = dir.path().join("translated").join("good.svg");
        assert_eq!(stats.status, OutcomeStatus::Saved);
        assert_eq!(stats.file_path, expected.display().to_string());
        let written = std::fs::read_to_string(&expected).expect("read output");
        assert!(written.contains(r#"<text systemLanguage="es">Hola</text>"#));
    }
}
