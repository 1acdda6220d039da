//! Query expansion.
//!
//! Turns a raw query into the terms the strict tier must match plus the
//! state/city locks the filters enforce. Rules are tried in a fixed order
//! and the first one that applies decides the shape of the result:
//!
//! 1. **Direct alias**: a curated trigger phrase selects one document.
//! 2. **State**: the query names a state. A query made only of that state's
//!    alias tokens reduces to the state code alone.
//! 3. **City phrase**: the query names a city; terms become the city's
//!    canonical tokens.
//! 4. **Special token**: a token such as `samp` locks its (city, state),
//!    unless the user already named a different state.
//! 5. **Generic**: query tokens, with the words naming a locked state
//!    replaced by its code.

use std::collections::BTreeSet;

use crion_search_models::QueryExpansion;

use crate::catalog::{AliasCatalog, StateAliases};
use crate::normalize;

/// Expands a raw query against the catalog.
#[must_use]
pub fn expand_query(catalog: &AliasCatalog, query: &str) -> QueryExpansion {
    let parts = normalize::tokenize(query);
    let query_slug = normalize::slug(query);

    if let Some(alias) = catalog
        .direct_aliases()
        .iter()
        .find(|alias| normalize::contains_word(&query_slug, alias.normalized_phrase()))
    {
        log::trace!("Query {query:?} hit direct alias {:?}", alias.phrase);
        return QueryExpansion {
            terms: BTreeSet::new(),
            state: alias.state,
            city: None,
            direct: Some(alias.target.clone()),
        };
    }

    let locked = detect_state(catalog, &parts, &query_slug);

    if let Some(aliases) = locked {
        if is_pure_state_query(aliases, &parts) {
            log::trace!("Query {query:?} is a pure state query for {}", aliases.state);
            return QueryExpansion {
                terms: BTreeSet::from([aliases.state.code().to_string()]),
                state: Some(aliases.state),
                city: None,
                direct: None,
            };
        }
    }
    let state = locked.map(|s| s.state);

    // The words that named the state are replaced by its code, which the
    // state filter already guarantees. A city phrase made only of those
    // words is not a city mention, so "rio grande do sul" does not lock Rio.
    let state_words: BTreeSet<&str> = locked
        .and_then(|s| longest_phrase(s, &query_slug))
        .map(|phrase| phrase.split(' ').collect())
        .unwrap_or_default();

    if let Some(city) = catalog.cities().iter().find(|city| {
        city.phrases().iter().any(|phrase| {
            normalize::contains_word(&query_slug, phrase)
                && !phrase.split(' ').all(|word| state_words.contains(word))
        })
    }) {
        log::trace!("Query {query:?} locked city {:?}", city.name);
        let mut terms: BTreeSet<String> = city.canonical_tokens().iter().cloned().collect();
        terms.extend(state.map(|s| s.code().to_string()));
        return QueryExpansion {
            terms,
            state,
            city: Some(city.name.clone()),
            direct: None,
        };
    }

    for rule in catalog.special_tokens() {
        if !parts.contains(&rule.token) {
            continue;
        }
        if state.is_some_and(|s| s != rule.state) {
            log::trace!(
                "Special token {:?} suppressed by explicit state {state:?}",
                rule.token
            );
            continue;
        }

        let mut terms = BTreeSet::from([rule.token.clone(), rule.state.code().to_string()]);
        terms.extend(normalize::tokenize(&rule.city));
        return QueryExpansion {
            terms,
            state: Some(rule.state),
            city: Some(rule.city.clone()),
            direct: None,
        };
    }

    let mut terms: BTreeSet<String> = parts
        .iter()
        .filter(|token| !state_words.contains(token.as_str()))
        .cloned()
        .collect();
    terms.extend(state.map(|s| s.code().to_string()));

    QueryExpansion {
        terms,
        state,
        city: None,
        direct: None,
    }
}

/// Finds the state the query talks about.
///
/// A state whose alias tokens cover every query token wins outright (first
/// in catalog order). Otherwise the longest alias phrase contained in the
/// query decides, so "mato grosso do sul" picks MS over MT.
fn detect_state<'a>(
    catalog: &'a AliasCatalog,
    parts: &[String],
    query_slug: &str,
) -> Option<&'a StateAliases> {
    if parts.is_empty() {
        return None;
    }

    if let Some(state) = catalog
        .states()
        .iter()
        .find(|state| is_pure_state_query(state, parts))
    {
        return Some(state);
    }

    let mut best: Option<(&StateAliases, usize)> = None;
    for state in catalog.states() {
        if let Some(len) = longest_phrase(state, query_slug).map(str::len) {
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((state, len));
            }
        }
    }

    best.map(|(state, _)| state)
}

/// Longest alias phrase of `state` contained in the query slug.
fn longest_phrase<'a>(state: &'a StateAliases, query_slug: &str) -> Option<&'a str> {
    state
        .phrases()
        .iter()
        .filter(|phrase| normalize::contains_word(query_slug, phrase))
        .max_by_key(|phrase| phrase.len())
        .map(String::as_str)
}

fn is_pure_state_query(state: &StateAliases, parts: &[String]) -> bool {
    !parts.is_empty() && parts.iter().all(|token| state.tokens().contains(token))
}
