//! Index construction from raw document rows.
//!
//! Every row becomes at most one [`IndexEntry`]. Rows without a name or URL,
//! rows whose URL is not a well-formed absolute `http(s)` URL, and rows
//! repeating an earlier URL are dropped without error.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use crion_search_models::{DocumentRow, IndexEntry, StateCode};
use regex::Regex;

use crate::catalog::AliasCatalog;
use crate::normalize;

/// Leading insecure scheme, any case.
static HTTP_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^http://").expect("valid regex"));

/// Shape every accepted URL must have.
static ABSOLUTE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://\S+$").expect("valid regex"));

/// `-MM-YY` (or `_MM_YY`) not followed by another digit.
static MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-_](0[1-9]|1[0-2])[-_](\d{2})(?:$|[^0-9])").expect("valid regex")
});

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    MissingField,
    InvalidUrl,
    DuplicateUrl,
}

/// Builds the searchable index from a snapshot of rows.
///
/// The result preserves row order and is a pure function of `rows` and
/// `catalog`: calling it twice on the same input yields equal entries in
/// the same order.
#[must_use]
pub fn build_index(catalog: &AliasCatalog, rows: &[DocumentRow]) -> Vec<IndexEntry> {
    let mut seen: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut entries = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for (i, row) in rows.iter().enumerate() {
        match accept_row(row, &mut seen) {
            Ok((name, url)) => entries.push(build_entry(catalog, name, url)),
            Err(reason) => {
                dropped += 1;
                log::debug!("Dropping row {i} ({reason:?}): {row:?}");
            }
        }
    }

    log::info!(
        "Built search index: {} entries from {} rows ({dropped} dropped)",
        entries.len(),
        rows.len()
    );

    entries
}

/// Validates a row and returns its name and canonical URL.
fn accept_row<'a>(
    row: &'a DocumentRow,
    seen: &mut HashSet<String>,
) -> Result<(&'a str, String), Rejection> {
    let name = row
        .name
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(Rejection::MissingField)?;
    let raw_url = row
        .url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(Rejection::MissingField)?;

    let url = canonical_url(raw_url).ok_or(Rejection::InvalidUrl)?;

    if !seen.insert(url.clone()) {
        return Err(Rejection::DuplicateUrl);
    }

    Ok((name, url))
}

/// Upgrades `http://` to `https://` and checks the result is a well-formed
/// absolute URL with a host.
///
/// The returned string is the trimmed input with only the scheme changed;
/// it is not re-serialized.
#[must_use]
pub fn canonical_url(raw: &str) -> Option<String> {
    let url = HTTP_SCHEME_RE.replace(raw.trim(), "https://").into_owned();

    if !ABSOLUTE_URL_RE.is_match(&url) {
        return None;
    }

    let parsed = url::Url::parse(&url).ok()?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return None;
    }

    Some(url)
}

fn build_entry(catalog: &AliasCatalog, name: &str, url: String) -> IndexEntry {
    let combined = format!("{name} {url}");
    let slug = normalize::slug(&combined);

    let keywords: BTreeSet<String> = normalize::tokenize(name)
        .into_iter()
        .chain(normalize::tokenize(&url))
        .collect();

    let name_normalized = normalize::normalize(name);
    let url_normalized = normalize::normalize(&url);

    let states = detect_states(catalog, name, &url, &slug);
    let cities = detect_cities(catalog, &slug);
    let recency = recency_score(&name_normalized);

    IndexEntry {
        name: name.to_string(),
        url,
        name_normalized,
        url_normalized,
        slug,
        keywords,
        states,
        cities,
        recency,
    }
}

/// Tags every state any alias, anchored code, composite rule or special
/// token points at.
fn detect_states(
    catalog: &AliasCatalog,
    name: &str,
    url: &str,
    slug: &str,
) -> BTreeSet<StateCode> {
    let mut states = BTreeSet::new();

    for state in catalog.states() {
        let by_alias = state
            .phrases()
            .iter()
            .any(|phrase| normalize::contains_word(slug, phrase));

        if by_alias || state.has_strong_code(name) || state.has_strong_code(url) {
            states.insert(state.state);
        }
    }

    for rule in catalog.composite_rules() {
        if rule.is_match(name) || rule.is_match(url) {
            states.insert(rule.state());
        }
    }

    for rule in catalog.special_tokens() {
        if normalize::contains_word(slug, &rule.token) {
            states.insert(rule.state);
        }
    }

    states
}

/// Tags every city whose canonical name or alias is a whole phrase of the
/// slug, plus cities forced by special tokens.
fn detect_cities(catalog: &AliasCatalog, slug: &str) -> BTreeSet<String> {
    let mut cities: BTreeSet<String> = catalog
        .cities()
        .iter()
        .filter(|city| {
            city.phrases()
                .iter()
                .any(|phrase| normalize::contains_word(slug, phrase))
        })
        .map(|city| city.name.clone())
        .collect();

    for rule in catalog.special_tokens() {
        if normalize::contains_word(slug, &rule.token) {
            cities.insert(rule.city.clone());
        }
    }

    cities
}

/// `year * 12 + month` for the first `-MM-YY` pattern in a normalized
/// name, years taken as 20YY. Returns `0` when there is none.
#[must_use]
pub fn recency_score(name_normalized: &str) -> u32 {
    let Some(caps) = MONTH_YEAR_RE.captures(name_normalized) else {
        return 0;
    };

    let month: u32 = caps[1].parse().unwrap_or(0);
    let year: u32 = caps[2].parse().unwrap_or(0);

    (2000 + year) * 12 + month
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(rows: &[DocumentRow]) -> Vec<IndexEntry> {
        build_index(AliasCatalog::embedded(), rows)
    }

    #[test]
    fn upgrades_http_to_https() {
        let entries = build(&[DocumentRow::new("Tabela", "http://affix.com.br/t.pdf")]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://affix.com.br/t.pdf");
    }

    #[test]
    fn upgrades_uppercase_scheme() {
        assert_eq!(
            canonical_url("  HTTP://affix.com.br/t.pdf "),
            Some("https://affix.com.br/t.pdf".to_string())
        );
    }

    #[test]
    fn http_and_https_variants_collapse_to_one_entry() {
        let entries = build(&[
            DocumentRow::new("Tabela A", "http://affix.com.br/t.pdf"),
            DocumentRow::new("Tabela B", "https://affix.com.br/t.pdf"),
        ]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Tabela A");
        assert_eq!(entries[0].url, "https://affix.com.br/t.pdf");
    }

    #[test]
    fn first_duplicate_wins() {
        let entries = build(&[
            DocumentRow::new("Primeiro", "https://affix.com.br/x.pdf"),
            DocumentRow::new("Outro", "https://affix.com.br/y.pdf"),
            DocumentRow::new("Segundo", "https://affix.com.br/x.pdf"),
        ]);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Primeiro", "Outro"]);
    }

    #[test]
    fn drops_rows_with_missing_fields() {
        let entries = build(&[
            DocumentRow {
                name: None,
                url: Some("https://affix.com.br/a.pdf".to_string()),
            },
            DocumentRow {
                name: Some("Sem URL".to_string()),
                url: None,
            },
            DocumentRow::new("   ", "https://affix.com.br/b.pdf"),
            DocumentRow::new("Vazia", ""),
        ]);
        assert!(entries.is_empty());
    }

    #[test]
    fn drops_invalid_urls() {
        assert_eq!(canonical_url("ftp://affix.com.br/a.pdf"), None);
        assert_eq!(canonical_url("affix.com.br/a.pdf"), None);
        assert_eq!(canonical_url("https://affix.com.br/a b.pdf"), None);
        assert_eq!(canonical_url("https://"), None);
        assert!(build(&[DocumentRow::new("Tabela", "not a url")]).is_empty());
    }

    #[test]
    fn builds_slug_and_keywords_from_name_and_url() {
        let entries = build(&[DocumentRow::new(
            "Tabela Vitória",
            "https://affix.com.br/tabela_vitoria.pdf",
        )]);
        let entry = &entries[0];
        assert_eq!(
            entry.slug,
            " tabela vitoria https affix com br tabela vitoria pdf "
        );
        assert!(entry.keywords.contains("vitoria"));
        assert!(entry.keywords.contains("affix"));
        assert_eq!(entry.name_normalized, "tabela vitoria");
        assert_eq!(entry.url_normalized, "https://affix com br/tabela vitoria pdf");
    }

    #[test]
    fn detects_state_by_alias_phrase() {
        let entries = build(&[DocumentRow::new(
            "Tabela Espírito Santo",
            "https://affix.com.br/t1.pdf",
        )]);
        assert!(entries[0].states.contains(&StateCode::Es));
    }

    #[test]
    fn detects_multi_word_alias_with_stopwords() {
        let entries = build(&[DocumentRow::new(
            "Tabela Rio de Janeiro",
            "https://affix.com.br/t2.pdf",
        )]);
        assert!(entries[0].states.contains(&StateCode::Rj));
        assert!(entries[0].cities.contains("rio de janeiro"));
    }

    #[test]
    fn detects_state_by_strong_code_in_url() {
        let entries = build(&[DocumentRow::new(
            "Tabela vendas",
            "https://affix.com.br/2025/Tabela-RJ-03-25.pdf",
        )]);
        assert!(entries[0].states.contains(&StateCode::Rj));
    }

    #[test]
    fn detects_state_by_composite_rule() {
        let entries = build(&[DocumentRow::new(
            "Manual-ES",
            "https://affix.com.br/manual.pdf",
        )]);
        assert!(entries[0].states.contains(&StateCode::Es));
    }

    #[test]
    fn special_token_forces_city_and_state() {
        let entries = build(&[DocumentRow::new(
            "Tabela SAMP",
            "https://affix.com.br/tabela-samp.pdf",
        )]);
        assert!(entries[0].states.contains(&StateCode::Es));
        assert!(entries[0].cities.contains("sao bernardo"));
    }

    #[test]
    fn detects_city_by_alias() {
        let entries = build(&[DocumentRow::new(
            "Tabela SJC",
            "https://affix.com.br/sjc.pdf",
        )]);
        assert!(entries[0].cities.contains("sao jose dos campos"));
    }

    #[test]
    fn untagged_document_has_no_states() {
        let entries = build(&[DocumentRow::new(
            "Tabela Geral",
            "https://affix.com.br/geral.pdf",
        )]);
        assert!(entries[0].states.is_empty());
        assert!(entries[0].cities.is_empty());
    }

    #[test]
    fn recency_from_month_year() {
        assert_eq!(recency_score("tabela-es-03-25"), 2025 * 12 + 3);
        assert_eq!(recency_score("tabela-12-24 final"), 2024 * 12 + 12);
        assert_eq!(recency_score("tabela"), 0);
        assert_eq!(recency_score("tabela-13-25"), 0);
        assert_eq!(recency_score("tabela-03-2025"), 0);
    }

    #[test]
    fn entry_recency_uses_name_only() {
        let entries = build(&[DocumentRow::new(
            "Tabela-ES-03-25",
            "https://affix.com.br/x-04-25.pdf",
        )]);
        assert_eq!(entries[0].recency, 2025 * 12 + 3);
    }

    #[test]
    fn build_is_idempotent() {
        let rows = vec![
            DocumentRow::new("Tabela-ES-03-25", "http://affix.com.br/a.pdf"),
            DocumentRow::new("Tabela-RJ-02-25", "https://alter.com.br/b.pdf"),
            DocumentRow::new("Tabela SAMP", "https://affix.com.br/samp.pdf"),
            DocumentRow::new("Duplicada", "https://affix.com.br/a.pdf"),
        ];
        assert_eq!(build(&rows), build(&rows));
    }
}
