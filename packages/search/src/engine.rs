//! Tiered retrieval over a built index.
//!
//! Every entry must first pass the brand, state and city filters. Eligible
//! entries are then tried against progressively looser tiers; the first tier
//! that yields anything is the answer, and tiers are never merged:
//!
//! 0. **Direct**: the expansion named a document; return entries whose name
//!    contains it.
//! 1. **Exact phrase**: the whole normalized query occurs in the normalized
//!    name or URL.
//! 2. **Strict conjunctive**: every expanded term occurs as a whole word.
//! 3. **Soft fallback**: a lone term occurs as a raw substring (only without
//!    state/city locks, and only when enabled).
//!
//! When nothing qualifies the result is empty. A low-confidence guess is
//! never returned.

use std::cmp::Ordering;
use std::collections::HashSet;

use crion_search_models::{IndexEntry, QueryExpansion, SearchConfig, SearchHit, StateCode};

use crate::catalog::{AliasCatalog, Brand, CityAliases};
use crate::expand::expand_query;
use crate::normalize;

/// Which tier produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Direct alias override.
    Direct,
    /// Full query phrase in name or URL.
    Exact,
    /// All expanded terms as whole words.
    Strict,
    /// Single term as a substring.
    Soft,
}

/// Ranked hits plus the tier that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Hits in rank order.
    pub hits: Vec<SearchHit>,
    /// The winning tier, or `None` when nothing matched.
    pub tier: Option<Tier>,
}

/// Filters derived from the query that every result must satisfy.
struct Filters<'a> {
    catalog: &'a AliasCatalog,
    brands: Vec<&'a Brand>,
    state: Option<StateCode>,
    city: Option<&'a CityAliases>,
}

impl<'a> Filters<'a> {
    fn new(catalog: &'a AliasCatalog, normalized_query: &str, expansion: &QueryExpansion) -> Self {
        let brands = catalog
            .brands()
            .iter()
            .filter(|brand| brand.is_mentioned(normalized_query))
            .collect();
        Self {
            catalog,
            brands,
            state: expansion.state,
            city: expansion.city.as_deref().and_then(|name| catalog.city(name)),
        }
    }

    fn passes(&self, entry: &IndexEntry) -> bool {
        self.passes_brand(entry) && self.passes_state(entry) && self.passes_city(entry)
    }

    fn passes_brand(&self, entry: &IndexEntry) -> bool {
        self.brands.is_empty() || self.brands.iter().any(|brand| brand.owns(&entry.url))
    }

    fn passes_state(&self, entry: &IndexEntry) -> bool {
        let Some(state) = self.state else {
            return true;
        };

        if entry.states.contains(&state) {
            return true;
        }

        let strong = self.catalog.state(state).is_some_and(|aliases| {
            aliases.has_strong_code(&entry.name) || aliases.has_strong_code(&entry.url)
        });

        strong
            || self.catalog.composite_fires(state, &entry.name)
            || self.catalog.composite_fires(state, &entry.url)
    }

    /// A locked city admits only entries whose slug names it by its
    /// canonical phrase or a distinctive alias. The index's city tags are
    /// not used: `rio` tags "Rio Grande do Sul" with the city of Rio.
    fn passes_city(&self, entry: &IndexEntry) -> bool {
        self.city.is_none_or(|city| city.is_named_in(&entry.slug))
    }

    /// Returns `true` if `term` is satisfied for `entry`.
    ///
    /// The locked state's code and the locked city's canonical words are
    /// satisfied by the state and city filters themselves, so a document
    /// naming the place by code or distinctive alias is not rejected for
    /// spelling it differently.
    fn term_matches(&self, entry: &IndexEntry, term: &str) -> bool {
        normalize::contains_word(&entry.slug, term)
            || entry.keywords.contains(term)
            || self.state.is_some_and(|state| state.code() == term)
            || self
                .city
                .is_some_and(|city| city.canonical_tokens().iter().any(|t| t == term))
    }
}

/// Runs a query against a built index.
#[must_use]
pub fn search(
    catalog: &AliasCatalog,
    config: &SearchConfig,
    index: &[IndexEntry],
    query: &str,
) -> Vec<SearchHit> {
    search_with_tier(catalog, config, index, query).hits
}

/// Like [`search`], but also reports which tier answered.
#[must_use]
pub fn search_with_tier(
    catalog: &AliasCatalog,
    config: &SearchConfig,
    index: &[IndexEntry],
    query: &str,
) -> SearchOutcome {
    if index.is_empty() {
        return SearchOutcome::default();
    }

    let normalized_query = normalize::normalize(query);
    if normalized_query.is_empty() {
        return SearchOutcome::default();
    }

    let expansion = expand_query(catalog, query);
    let filters = Filters::new(catalog, &normalized_query, &expansion);
    let eligible: Vec<&IndexEntry> = index.iter().filter(|entry| filters.passes(entry)).collect();

    log::debug!(
        "Query {query:?}: {} of {} entries eligible, expansion {expansion:?}",
        eligible.len(),
        index.len()
    );

    if let Some(target) = &expansion.direct {
        let target = normalize::normalize(target);
        let mut hits: Vec<&IndexEntry> = eligible
            .iter()
            .copied()
            .filter(|entry| entry.name_normalized.contains(&target))
            .collect();
        if !hits.is_empty() {
            hits.sort_by(|a, b| a.name.cmp(&b.name));
            return outcome(Tier::Direct, hits.into_iter());
        }
    }

    let exact = score_tier(&eligible, |entry| {
        (entry.name_normalized.contains(&normalized_query)
            || entry.url_normalized.contains(&normalized_query))
        .then(|| config.exact_base + f64::from(entry.recency))
    });
    if !exact.is_empty() {
        return ranked(Tier::Exact, exact);
    }

    let terms = &expansion.terms;
    if !terms.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        let term_bonus = terms.len() as f64 * config.strict_term_weight;
        let strict = score_tier(&eligible, |entry| {
            terms
                .iter()
                .all(|term| filters.term_matches(entry, term))
                .then(|| config.strict_base + term_bonus + config.recency_bonus(entry.recency))
        });
        if !strict.is_empty() {
            return ranked(Tier::Strict, strict);
        }
    }

    let soft_term = terms.iter().next().filter(|term| {
        config.soft_fallback
            && terms.len() == 1
            && expansion.state.is_none()
            && expansion.city.is_none()
            && term.chars().count() >= config.soft_min_chars
    });
    if let Some(term) = soft_term {
        let soft = score_tier(&eligible, |entry| {
            (entry.name_normalized.contains(term.as_str())
                || entry.url_normalized.contains(term.as_str()))
            .then(|| config.soft_base + config.recency_bonus(entry.recency))
        });
        if !soft.is_empty() {
            return ranked(Tier::Soft, soft);
        }
    }

    log::debug!("Query {query:?}: no confident match");
    SearchOutcome::default()
}

fn score_tier<'a>(
    eligible: &[&'a IndexEntry],
    score: impl Fn(&IndexEntry) -> Option<f64>,
) -> Vec<(&'a IndexEntry, f64)> {
    eligible
        .iter()
        .filter_map(|entry| score(entry).map(|s| (*entry, s)))
        .collect()
}

/// Sorts by score descending, then name ascending.
fn ranked(tier: Tier, mut scored: Vec<(&IndexEntry, f64)>) -> SearchOutcome {
    scored.sort_by(|(a, sa), (b, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    outcome(tier, scored.into_iter().map(|(entry, _)| entry))
}

fn outcome<'a>(tier: Tier, entries: impl Iterator<Item = &'a IndexEntry>) -> SearchOutcome {
    let mut seen = HashSet::new();
    let hits = entries
        .filter(|entry| seen.insert(entry.url.as_str()))
        .map(SearchHit::from)
        .collect();
    SearchOutcome {
        hits,
        tier: Some(tier),
    }
}
