use std::collections::BTreeMap;
use std::path::Path;

use crate::mapping::{merge, GlobalTranslationMapping, TranslationMap};
use crate::progress::Diagnostics;
use crate::svg::nodes::{extract_text_from_node, language_tag, ElementIndex};
use crate::svg::xml::{read_svg, SvgDocument};
use crate::textutil::normalize_text;
use crate::titles::derive_title_mapping;

/// Extracts the translation mapping stored in the `<switch>` blocks of an SVG file.
///
/// Returns `None` when the file is missing or cannot be parsed; callers must treat that
/// as "nothing extractable", not as an empty mapping.
pub fn extract(
    svg_file_path: &Path,
    case_insensitive: bool,
    diag: &dyn Diagnostics,
) -> Option<GlobalTranslationMapping> {
    if !svg_file_path.exists() {
        diag.error(&format!("SVG file not found: {}", svg_file_path.display()));
        return None;
    }
    diag.debug(&format!("Extracting translations from {}", svg_file_path.display()));

    let doc = match read_svg(svg_file_path) {
        Ok(doc) => doc,
        Err(err) => {
            diag.error(&format!(
                "Failed to parse SVG file {}: {err:#}",
                svg_file_path.display()
            ));
            return None;
        }
    };
    Some(extract_from_document(&doc, case_insensitive, diag))
}

/// Walks every switch block of `doc` and builds the direct and title mappings.
pub fn extract_from_document(
    doc: &SvgDocument,
    case_insensitive: bool,
    diag: &dyn Diagnostics,
) -> GlobalTranslationMapping {
    let index = ElementIndex::build(doc);
    let switches = index.descendants(doc, "switch");
    diag.debug(&format!("Found {} switch elements", switches.len()));

    let mut direct = TranslationMap::new();
    let mut processed_switches = 0usize;

    for switch in switches {
        let text_elements = index.children(doc, switch, "text");
        if text_elements.is_empty() {
            continue;
        }

        let Some(default_elem) = text_elements
            .iter()
            .copied()
            .find(|t| language_tag(doc, *t).is_none())
        else {
            continue;
        };
        let default_texts: Vec<String> = match extract_text_from_node(doc, &index, default_elem) {
            Ok(fragments) => fragments
                .iter()
                .map(|t| normalize_text(t, case_insensitive))
                .collect(),
            Err(err) => {
                diag.debug(&format!("Skipping switch in {}: {err}", doc.name));
                continue;
            }
        };
        if default_texts.is_empty() {
            continue;
        }

        let mut switch_translations: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for text_elem in &text_elements {
            let Some(lang) = language_tag(doc, *text_elem) else {
                continue;
            };
            match extract_text_from_node(doc, &index, *text_elem) {
                Ok(fragments) => {
                    switch_translations.insert(
                        lang,
                        fragments.iter().map(|t| normalize_text(t, false)).collect(),
                    );
                }
                Err(err) => {
                    diag.debug(&format!("Skipping language '{lang}' in {}: {err}", doc.name));
                }
            }
        }
        if switch_translations.is_empty() {
            continue;
        }

        processed_switches += 1;
        let mut block = TranslationMap::new();
        for (lang, translated_texts) in &switch_translations {
            for (i, default_text) in default_texts.iter().enumerate() {
                if default_text.is_empty() {
                    continue;
                }
                let Some(translated) = translated_texts.get(i) else {
                    diag.debug(&format!(
                        "Missing translation for '{default_text}' in language '{lang}'"
                    ));
                    continue;
                };
                // Already case-folded when `case_insensitive` is set.
                block
                    .entry(default_text.clone())
                    .or_default()
                    .insert(lang.clone(), translated.clone());
            }
        }
        merge(&mut direct, block);
    }

    let title = derive_title_mapping(&direct);
    let mapping = GlobalTranslationMapping {
        direct,
        title,
        case_insensitive: Some(case_insensitive),
    };

    diag.debug(&format!("Extracted translations for {processed_switches} switches"));
    let languages = mapping.languages();
    diag.debug(&format!(
        "Found translations in {} languages: {}",
        languages.len(),
        languages.join(", ")
    ));

    mapping
}
