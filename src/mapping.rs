use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::progress::Diagnostics;

/// Language code -> translated text.
pub type LangMap = BTreeMap<String, String>;

/// Normalized default text -> translations.
pub type TranslationMap = BTreeMap<String, LangMap>;

/// Everything harvested from one source file and handed to the injector.
///
/// `direct` holds exact default-text pairs, `title` the year-independent pairs derived
/// from them (see [`crate::titles`]). An empty `direct` is left out of the JSON form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalTranslationMapping {
    #[serde(default, alias = "new", skip_serializing_if = "BTreeMap::is_empty")]
    pub direct: TranslationMap,
    #[serde(default)]
    pub title: TranslationMap,
    /// Whether the keys were case-folded when extracted. `None` for hand-written or
    /// older mapping files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_insensitive: Option<bool>,
}

impl GlobalTranslationMapping {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.title.is_empty()
    }

    /// Languages with at least one non-empty direct translation, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self
            .direct
            .values()
            .flat_map(|m| m.iter())
            .filter(|(_, text)| !text.is_empty())
            .map(|(lang, _)| lang.clone())
            .collect();
        langs.sort();
        langs.dedup();
        langs
    }

    /// Case folding to inject with: the recorded extraction mode when there is one,
    /// else `requested`. A disagreement is reported, since folded keys never match a
    /// case-sensitive lookup of mixed-case text and vice versa.
    pub fn lookup_case_insensitive(&self, requested: bool, diag: &dyn Diagnostics) -> bool {
        match self.case_insensitive {
            Some(recorded) => {
                if recorded != requested {
                    diag.info(&format!(
                        "warning: mapping keys were extracted {}; ignoring the requested {} lookup",
                        case_mode(recorded),
                        case_mode(requested)
                    ));
                }
                recorded
            }
            None => requested,
        }
    }
}

fn case_mode(case_insensitive: bool) -> &'static str {
    if case_insensitive {
        "case-insensitively"
    } else {
        "case-sensitively"
    }
}

/// Folds `incoming` into `existing`, block by block.
///
/// An incoming key replaces the whole existing entry for that key; language maps of
/// different blocks are never unioned.
pub fn merge(existing: &mut TranslationMap, incoming: TranslationMap) {
    for (key, langs) in incoming {
        existing.insert(key, langs);
    }
}

pub fn load_mapping(path: &Path) -> anyhow::Result<GlobalTranslationMapping> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read mapping: {}", path.display()))?;
    let mapping: GlobalTranslationMapping =
        serde_json::from_str(&text).with_context(|| format!("parse mapping: {}", path.display()))?;
    Ok(mapping)
}

pub fn save_mapping(mapping: &GlobalTranslationMapping, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create mapping dir: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(mapping).context("serialize mapping")?;
    std::fs::write(path, json).with_context(|| format!("write mapping: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryDiagnostics;

    fn langs(pairs: &[(&str, &str)]) -> LangMap {
        pairs
            .iter()
            .map(|(l, t)| (l.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn merge_replaces_whole_entry() {
        let mut existing = TranslationMap::new();
        existing.insert("hello".into(), langs(&[("es", "Hola"), ("fr", "Bonjour")]));
        existing.insert("keep".into(), langs(&[("es", "Guardar")]));

        let mut incoming = TranslationMap::new();
        incoming.insert("hello".into(), langs(&[("de", "Hallo")]));
        merge(&mut existing, incoming);

        assert_eq!(existing["hello"], langs(&[("de", "Hallo")]));
        assert_eq!(existing["keep"], langs(&[("es", "Guardar")]));
    }

    #[test]
    fn empty_direct_is_omitted_from_json() {
        let mapping = GlobalTranslationMapping::default();
        let json = serde_json::to_value(&mapping).expect("to json");
        assert_eq!(json, serde_json::json!({ "title": {} }));
    }

    #[test]
    fn recorded_case_mode_overrides_requested_lookup() {
        let mut mapping: GlobalTranslationMapping =
            serde_json::from_str(r#"{"direct": {"Hello": {"es": "Hola"}}, "case_insensitive": false}"#)
                .expect("parse");
        assert_eq!(mapping.case_insensitive, Some(false));

        let diag = MemoryDiagnostics::new();
        assert!(!mapping.lookup_case_insensitive(true, &diag));
        assert!(diag.contains("mapping keys were extracted case-sensitively"));

        let quiet = MemoryDiagnostics::new();
        assert!(!mapping.lookup_case_insensitive(false, &quiet));
        assert!(quiet.lines().is_empty());

        mapping.case_insensitive = None;
        assert!(mapping.lookup_case_insensitive(true, &quiet));
        assert!(!mapping.lookup_case_insensitive(false, &quiet));
    }

    #[test]
    fn legacy_new_key_is_accepted() {
        let mapping: GlobalTranslationMapping =
            serde_json::from_str(r#"{"new": {"hello": {"es": "Hola"}}}"#).expect("parse");
        assert_eq!(mapping.direct["hello"]["es"], "Hola");
        assert!(mapping.title.is_empty());
        assert_eq!(mapping.languages(), vec!["es"]);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/mapping.json");
        let mut mapping = GlobalTranslationMapping::default();
        mapping.direct.insert("a".into(), langs(&[("ar", "أ")]));
        mapping.case_insensitive = Some(true);
        save_mapping(&mapping, &path).expect("save");
        assert_eq!(load_mapping(&path).expect("load"), mapping);
    }
}
