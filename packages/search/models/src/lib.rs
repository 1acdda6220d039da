#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the CRION document search engine.
//!
//! This crate contains only data types and configuration structs. It has no
//! matching logic and no I/O; the alias catalog and the engine live in
//! `crion_search`.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Brazilian federative unit (UF), identified by its two-letter code.
///
/// Declaration order is the catalog order used whenever several states
/// compete for the same query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StateCode {
    /// Acre
    Ac,
    /// Alagoas
    Al,
    /// Amapá
    Ap,
    /// Amazonas
    Am,
    /// Bahia
    Ba,
    /// Ceará
    Ce,
    /// Distrito Federal
    Df,
    /// Espírito Santo
    Es,
    /// Goiás
    Go,
    /// Maranhão
    Ma,
    /// Mato Grosso
    Mt,
    /// Mato Grosso do Sul
    Ms,
    /// Minas Gerais
    Mg,
    /// Pará
    Pa,
    /// Paraíba
    Pb,
    /// Paraná
    Pr,
    /// Pernambuco
    Pe,
    /// Piauí
    Pi,
    /// Rio de Janeiro
    Rj,
    /// Rio Grande do Norte
    Rn,
    /// Rio Grande do Sul
    Rs,
    /// Rondônia
    Ro,
    /// Roraima
    Rr,
    /// Santa Catarina
    Sc,
    /// São Paulo
    Sp,
    /// Sergipe
    Se,
    /// Tocantins
    To,
}

impl StateCode {
    /// Number of federative units.
    pub const COUNT: usize = 27;

    /// Lowercase code as used in slugs and term sets (e.g. `"es"`).
    #[must_use]
    pub fn code(self) -> &'static str {
        self.into()
    }

    /// Uppercase code as it appears in document names and file paths
    /// (e.g. `"ES"`).
    #[must_use]
    pub fn upper(self) -> String {
        self.code().to_ascii_uppercase()
    }
}

/// A raw `{name, url}` row handed over by the ingestion side.
///
/// Nothing about it is validated; the indexer drops rows it cannot use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRow {
    /// Human-readable document name (e.g. `"Tabela-ES-03-25"`).
    #[serde(default)]
    pub name: Option<String>,
    /// Document location. `http://` is upgraded to `https://` at index time.
    #[serde(default)]
    pub url: Option<String>,
}

impl DocumentRow {
    /// Creates a row with both fields present.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: Some(url.into()),
        }
    }
}

/// A searchable document derived from a [`DocumentRow`].
///
/// Built once per index build and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Document name exactly as supplied.
    pub name: String,
    /// Canonical URL, always `https://`.
    pub url: String,
    /// Normalized name (accents and `.`/`_` stripped, lowercase).
    pub name_normalized: String,
    /// Normalized URL.
    pub url_normalized: String,
    /// Space-bounded token string of name and URL, e.g. `" tabela es 03 25 "`.
    pub slug: String,
    /// Tokens of name and URL.
    pub keywords: BTreeSet<String>,
    /// Detected states.
    pub states: BTreeSet<StateCode>,
    /// Detected cities, by canonical name.
    pub cities: BTreeSet<String>,
    /// `year * 12 + month` from an embedded `-MM-YY` pattern, or `0`.
    pub recency: u32,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document name.
    pub name: String,
    /// Canonical document URL.
    pub url: String,
}

impl From<&IndexEntry> for SearchHit {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            name: entry.name.clone(),
            url: entry.url.clone(),
        }
    }
}

/// What a raw query was expanded into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExpansion {
    /// Terms that must all match in the strict conjunctive tier.
    pub terms: BTreeSet<String>,
    /// State every result must belong to.
    pub state: Option<StateCode>,
    /// City (canonical name) every result must belong to.
    pub city: Option<String>,
    /// Document name selected by a direct alias, bypassing scoring.
    pub direct: Option<String>,
}

impl QueryExpansion {
    /// Returns `true` if the expansion selected a document directly.
    #[must_use]
    pub const fn is_direct(&self) -> bool {
        self.direct.is_some()
    }
}

/// Scoring weights and tier switches for the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base score of an exact phrase hit.
    #[serde(default = "default_exact_base")]
    pub exact_base: f64,

    /// Base score of a strict conjunctive hit.
    #[serde(default = "default_strict_base")]
    pub strict_base: f64,

    /// Added per expanded term in the strict conjunctive tier.
    #[serde(default = "default_strict_term_weight")]
    pub strict_term_weight: f64,

    /// The recency score is divided by this before being added in the strict
    /// and soft tiers. Must be positive; see [`SearchConfig::recency_bonus`].
    #[serde(
        default = "default_recency_divisor",
        deserialize_with = "deserialize_positive"
    )]
    pub recency_divisor: f64,

    /// Whether single-term queries may fall back to raw substring matching.
    #[serde(default = "default_soft_fallback")]
    pub soft_fallback: bool,

    /// Base score of a soft fallback hit.
    #[serde(default = "default_soft_base")]
    pub soft_base: f64,

    /// Shortest term (in characters) the soft fallback accepts.
    #[serde(default = "default_soft_min_chars")]
    pub soft_min_chars: usize,
}

const fn default_exact_base() -> f64 {
    1000.0
}

const fn default_strict_base() -> f64 {
    500.0
}

const fn default_strict_term_weight() -> f64 {
    10.0
}

const fn default_recency_divisor() -> f64 {
    100.0
}

const fn default_soft_fallback() -> bool {
    true
}

const fn default_soft_base() -> f64 {
    100.0
}

const fn default_soft_min_chars() -> usize {
    3
}

/// Rejects zero, negative and non-finite values at load time.
fn deserialize_positive<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected a positive number, got {value}"
        )))
    }
}

impl SearchConfig {
    /// Recency contribution to strict and soft scores.
    ///
    /// A divisor that is not a positive finite number (possible only when
    /// the struct is built in code) disables the bonus instead of producing
    /// `inf`/`NaN` scores.
    #[must_use]
    pub fn recency_bonus(&self, recency: u32) -> f64 {
        if self.recency_divisor.is_finite() && self.recency_divisor > 0.0 {
            f64::from(recency) / self.recency_divisor
        } else {
            0.0
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exact_base: default_exact_base(),
            strict_base: default_strict_base(),
            strict_term_weight: default_strict_term_weight(),
            recency_divisor: default_recency_divisor(),
            soft_fallback: default_soft_fallback(),
            soft_base: default_soft_base(),
            soft_min_chars: default_soft_min_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn there_are_27_states() {
        assert_eq!(StateCode::iter().count(), StateCode::COUNT);
    }

    #[test]
    fn state_codes_round_trip_through_strings() {
        for state in StateCode::iter() {
            assert_eq!(StateCode::from_str(state.code()), Ok(state));
            assert_eq!(StateCode::from_str(&state.upper()), Ok(state));
            assert_eq!(state.to_string(), state.code());
            assert_eq!(state.as_ref(), state.code());
        }
    }

    #[test]
    fn rejects_unknown_state_code() {
        assert!(StateCode::from_str("xx").is_err());
    }

    #[test]
    fn upper_code() {
        assert_eq!(StateCode::Es.upper(), "ES");
        assert_eq!(StateCode::Rj.upper(), "RJ");
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: SearchConfig = toml::from_str("soft_fallback = false").unwrap();
        assert!(!config.soft_fallback);
        assert!((config.exact_base - 1000.0).abs() < f64::EPSILON);
        assert_eq!(config.soft_min_chars, 3);
    }

    #[test]
    fn config_rejects_non_positive_recency_divisor() {
        assert!(toml::from_str::<SearchConfig>("recency_divisor = 0").is_err());
        assert!(toml::from_str::<SearchConfig>("recency_divisor = -5.0").is_err());

        let config: SearchConfig = toml::from_str("recency_divisor = 50").unwrap();
        assert!((config.recency_divisor - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_divisor_in_code_disables_recency_bonus() {
        let config = SearchConfig {
            recency_divisor: 0.0,
            ..SearchConfig::default()
        };
        assert!(config.recency_bonus(24_303).abs() < f64::EPSILON);
        assert!((SearchConfig::default().recency_bonus(24_300) - 243.0).abs() < 1e-9);
    }

    #[test]
    fn hit_from_entry() {
        let entry = IndexEntry {
            name: "Tabela".to_string(),
            url: "https://affix.com.br/t.pdf".to_string(),
            name_normalized: "tabela".to_string(),
            url_normalized: "https://affix com br/t pdf".to_string(),
            slug: " tabela ".to_string(),
            keywords: BTreeSet::new(),
            states: BTreeSet::new(),
            cities: BTreeSet::new(),
            recency: 0,
        };
        let hit = SearchHit::from(&entry);
        assert_eq!(hit.name, "Tabela");
        assert_eq!(hit.url, "https://affix.com.br/t.pdf");
    }
}
