//! Year-parameterized titles.
//!
//! A default text such as `"COVID-19 pandemic 2020"` whose translations all end in the
//! same year generalizes to a year-free pair (`"COVID-19 pandemic"` ->
//! `"Pandemia de COVID-19"`). The year-free pair can then be reapplied to another
//! year, e.g. `"COVID-19 pandemic 1990"`.

use crate::mapping::{LangMap, TranslationMap};
use crate::textutil::{normalize_text, split_trailing_year};

/// Shortest key that can carry a non-empty prefix plus a 4-digit year.
const MIN_TITLE_KEY_LEN: usize = 5;

/// Derives the year-independent title mapping from the direct mapping.
///
/// A key qualifies when it ends in four ASCII digits after a non-empty prefix and
/// every present, non-empty translation ends with the same four digits. Empty
/// translations are ignored for the check and left out of the result; a translation
/// that is the bare year is kept with an empty title.
pub fn derive_title_mapping(direct: &TranslationMap) -> TranslationMap {
    let mut titles = TranslationMap::new();

    for (key, translations) in direct {
        if key.len() < MIN_TITLE_KEY_LEN {
            continue;
        }
        let Some((prefix, year)) = split_trailing_year(key) else {
            continue;
        };
        let base = prefix.trim();
        if base.is_empty() {
            continue;
        }

        let present: Vec<(&String, &String)> =
            translations.iter().filter(|(_, v)| !v.is_empty()).collect();
        if present.is_empty() || !present.iter().all(|(_, v)| v.ends_with(year)) {
            continue;
        }

        let stripped: LangMap = present
            .into_iter()
            .map(|(lang, value)| (lang.clone(), value[..value.len() - 4].trim().to_string()))
            .collect();
        titles.insert(base.to_string(), stripped);
    }

    titles
}

/// Rebuilds year-bearing translations for `default_texts` from a title mapping.
///
/// The base is looked up as written, then trimmed, then in its case-folded form so
/// display texts match keys extracted case-insensitively. Texts that do not end in a
/// 4-digit year, or whose year-free base is unknown, are skipped.
pub fn reconstruct_titles<I, S>(titles: &TranslationMap, default_texts: I) -> TranslationMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = TranslationMap::new();

    for text in default_texts {
        let text = text.as_ref();
        if text.len() <= 4 {
            continue;
        }
        let Some((prefix, year)) = split_trailing_year(text) else {
            continue;
        };
        let found = titles
            .get(prefix)
            .or_else(|| titles.get(prefix.trim()))
            .or_else(|| titles.get(&normalize_text(prefix, true)));
        let Some(translations) = found.filter(|m| !m.is_empty()) else {
            continue;
        };
        out.insert(
            text.to_string(),
            translations
                .iter()
                .map(|(lang, value)| (lang.clone(), format!("{value} {year}")))
                .collect(),
        );
    }

    out
}
