//! Alias catalog: state and city spellings plus declarative heuristics.
//!
//! The catalog is data, not logic. The embedded copy is baked into the
//! binary from `packages/search/catalog/*.toml` via [`include_str!`] and
//! parsed once on first use. Alternative catalogs can be loaded with
//! [`AliasCatalog::from_toml_str`].
//!
//! On load every alias is reduced to its normalized phrase form and every
//! heuristic compiled, so matching never re-normalizes catalog data.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use crion_search_models::StateCode;
use regex::Regex;
use serde::Deserialize;

use crate::heuristics::{CompositeRule, StrongPattern};
use crate::normalize;

/// TOML configs embedded at compile time.
const CATALOG_TOMLS: &[(&str, &str)] = &[
    ("states", include_str!("../catalog/states.toml")),
    ("cities", include_str!("../catalog/cities.toml")),
    ("rules", include_str!("../catalog/rules.toml")),
];

static EMBEDDED: LazyLock<AliasCatalog> = LazyLock::new(|| {
    let definition = CATALOG_TOMLS
        .iter()
        .map(|(name, toml)| {
            CatalogDefinition::parse(toml)
                .unwrap_or_else(|e| panic!("Failed to parse catalog {name}.toml: {e}"))
        })
        .fold(CatalogDefinition::default(), CatalogDefinition::merge);

    AliasCatalog::from_definition(definition)
        .unwrap_or_else(|e| panic!("Invalid embedded catalog: {e}"))
});

/// Errors from loading or validating a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// TOML parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A heuristic pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The same state is listed twice.
    #[error("Duplicate state: {0}")]
    DuplicateState(StateCode),

    /// The same city is listed twice.
    #[error("Duplicate city: {0}")]
    DuplicateCity(String),

    /// A rule references a city that is not in the catalog.
    #[error("Unknown city '{city}' referenced by {rule}")]
    UnknownCity {
        /// The missing city name.
        city: String,
        /// Which rule referenced it.
        rule: String,
    },

    /// An alias, token, marker or phrase normalizes to nothing.
    #[error("Empty {0} after normalization")]
    Empty(String),
}

// ── Raw TOML shape ───────────────────────────────────────────────────────

/// Catalog as written in TOML. Every section is optional so the data can
/// be split across several files.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogDefinition {
    /// State alias lists.
    #[serde(default)]
    pub states: Vec<StateDefinition>,
    /// City alias lists.
    #[serde(default)]
    pub cities: Vec<CityDefinition>,
    /// Tokens forcing a (city, state) pair.
    #[serde(default)]
    pub special_tokens: Vec<SpecialToken>,
    /// Code + marker heuristics.
    #[serde(default)]
    pub composite_rules: Vec<CompositeRuleDefinition>,
    /// Brand → domain table.
    #[serde(default)]
    pub brands: Vec<BrandDefinition>,
    /// Curated query → document overrides.
    #[serde(default)]
    pub direct_aliases: Vec<DirectAliasDefinition>,
}

impl CatalogDefinition {
    /// Parses a single TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid catalog TOML.
    pub fn parse(toml_str: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Appends every section of `other` after this one's.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.states.extend(other.states);
        self.cities.extend(other.cities);
        self.special_tokens.extend(other.special_tokens);
        self.composite_rules.extend(other.composite_rules);
        self.brands.extend(other.brands);
        self.direct_aliases.extend(other.direct_aliases);
        self
    }
}

/// A state and its spellings.
#[derive(Debug, Clone, Deserialize)]
pub struct StateDefinition {
    /// Two-letter code.
    pub code: StateCode,
    /// Spellings, accented and unaccented.
    pub aliases: Vec<String>,
}

/// A city and its spellings.
#[derive(Debug, Clone, Deserialize)]
pub struct CityDefinition {
    /// Canonical, unaccented name.
    pub name: String,
    /// Misspellings and abbreviations.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A token that forces a (city, state) pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpecialToken {
    /// Single normalized token, e.g. `"samp"`.
    pub token: String,
    /// Canonical city name.
    pub city: String,
    /// State.
    pub state: StateCode,
}

/// A code + marker co-occurrence rule.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeRuleDefinition {
    /// State implied by the rule.
    pub state: StateCode,
    /// Generic marker word, e.g. `"manual"`.
    pub marker: String,
}

/// A brand and the domain its documents live under.
#[derive(Debug, Clone, Deserialize)]
pub struct BrandDefinition {
    /// Brand word as it appears in queries.
    pub name: String,
    /// Domain substring every result URL must contain.
    pub domain: String,
}

/// A curated trigger phrase selecting one document.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectAliasDefinition {
    /// Query phrase.
    pub phrase: String,
    /// Document name (or a literal part of it).
    pub target: String,
    /// State the document belongs to, if any.
    #[serde(default)]
    pub state: Option<StateCode>,
}

// ── Compiled catalog ─────────────────────────────────────────────────────

/// A state with its aliases in matchable form.
#[derive(Debug, Clone)]
pub struct StateAliases {
    /// The state.
    pub state: StateCode,
    /// Aliases as written in the catalog.
    pub aliases: Vec<String>,
    phrases: Vec<String>,
    tokens: BTreeSet<String>,
    strong: StrongPattern,
}

impl StateAliases {
    /// Normalized alias phrases, the code first.
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Every token of every alias plus the code itself.
    #[must_use]
    pub const fn tokens(&self) -> &BTreeSet<String> {
        &self.tokens
    }

    /// Returns `true` if the anchored upper-case code appears in `raw`.
    #[must_use]
    pub fn has_strong_code(&self, raw: &str) -> bool {
        self.strong.is_match(raw)
    }
}

/// A city with its aliases in matchable form.
#[derive(Debug, Clone)]
pub struct CityAliases {
    /// Canonical name.
    pub name: String,
    /// Aliases as written in the catalog.
    pub aliases: Vec<String>,
    canonical: String,
    canonical_tokens: Vec<String>,
    phrases: Vec<String>,
    distinctive: Vec<String>,
}

impl CityAliases {
    /// Normalized canonical phrase, e.g. `"sao jose campos"`.
    #[must_use]
    pub fn canonical_phrase(&self) -> &str {
        &self.canonical
    }

    /// Tokens of the canonical name.
    #[must_use]
    pub fn canonical_tokens(&self) -> &[String] {
        &self.canonical_tokens
    }

    /// Normalized phrases, canonical first, then aliases in catalog order.
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Phrases precise enough to prove a document is about this city: the
    /// canonical phrase plus every alias with at least one word that no
    /// state alias uses. `sjc` and `samp` qualify; `rio`, `se` and
    /// `rj capital` do not.
    #[must_use]
    pub fn distinctive_phrases(&self) -> &[String] {
        &self.distinctive
    }

    /// Returns `true` if `slug` names this city by a distinctive phrase.
    #[must_use]
    pub fn is_named_in(&self, slug: &str) -> bool {
        self.distinctive
            .iter()
            .any(|phrase| normalize::contains_word(slug, phrase))
    }
}

/// A brand with its compiled standalone-word matcher.
#[derive(Debug, Clone)]
pub struct Brand {
    /// Brand word.
    pub name: String,
    /// Domain substring.
    pub domain: String,
    word: Regex,
}

impl Brand {
    /// Returns `true` if the (normalized) query mentions the brand as a
    /// standalone word.
    #[must_use]
    pub fn is_mentioned(&self, normalized_query: &str) -> bool {
        self.word.is_match(normalized_query)
    }

    /// Returns `true` if `url` lives under this brand's domain.
    #[must_use]
    pub fn owns(&self, url: &str) -> bool {
        url.contains(&self.domain)
    }
}

/// A direct alias with its trigger phrase in matchable form.
#[derive(Debug, Clone)]
pub struct DirectAlias {
    /// Trigger phrase as written.
    pub phrase: String,
    /// Target document name.
    pub target: String,
    /// Associated state.
    pub state: Option<StateCode>,
    normalized_phrase: String,
}

impl DirectAlias {
    /// Normalized trigger phrase.
    #[must_use]
    pub fn normalized_phrase(&self) -> &str {
        &self.normalized_phrase
    }
}

/// The loaded, validated, immutable alias catalog.
#[derive(Debug, Clone)]
pub struct AliasCatalog {
    states: Vec<StateAliases>,
    cities: Vec<CityAliases>,
    special_tokens: Vec<SpecialToken>,
    composite_rules: Vec<CompositeRule>,
    brands: Vec<Brand>,
    direct_aliases: Vec<DirectAlias>,
}

impl AliasCatalog {
    /// Returns the catalog embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics on first use if the embedded TOML is malformed. The data is a
    /// compile-time constant, so this is a development error caught by
    /// tests.
    #[must_use]
    pub fn embedded() -> &'static Self {
        &EMBEDDED
    }

    /// Loads a catalog from a single TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the catalog fails
    /// validation.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CatalogError> {
        Self::from_definition(CatalogDefinition::parse(toml_str)?)
    }

    /// Validates a definition and compiles it.
    ///
    /// # Errors
    ///
    /// Returns an error if a state or city is duplicated, a rule references
    /// an unknown city, an entry normalizes to nothing, or a heuristic fails
    /// to compile.
    pub fn from_definition(definition: CatalogDefinition) -> Result<Self, CatalogError> {
        let states = compile_states(definition.states)?;
        let state_tokens: BTreeSet<&str> = states
            .iter()
            .flat_map(|state| state.tokens().iter().map(String::as_str))
            .collect();
        let cities = compile_cities(definition.cities, &state_tokens)?;

        let known_cities: BTreeSet<&str> = cities.iter().map(|c| c.name.as_str()).collect();

        let mut special_tokens = Vec::with_capacity(definition.special_tokens.len());
        for rule in definition.special_tokens {
            let token = normalize::phrase(&rule.token);
            if token.is_empty() || token.contains(' ') {
                return Err(CatalogError::Empty(format!("special token '{}'", rule.token)));
            }
            if !known_cities.contains(rule.city.as_str()) {
                return Err(CatalogError::UnknownCity {
                    city: rule.city,
                    rule: format!("special token '{token}'"),
                });
            }
            special_tokens.push(SpecialToken { token, ..rule });
        }

        let mut composite_rules = Vec::with_capacity(definition.composite_rules.len());
        for rule in definition.composite_rules {
            let marker = rule.marker.trim();
            if marker.is_empty() {
                return Err(CatalogError::Empty(format!(
                    "composite rule marker for {}",
                    rule.state
                )));
            }
            composite_rules.push(CompositeRule::new(rule.state, marker)?);
        }

        let mut brands = Vec::with_capacity(definition.brands.len());
        for brand in definition.brands {
            let name = normalize::normalize(&brand.name);
            if name.is_empty() || brand.domain.trim().is_empty() {
                return Err(CatalogError::Empty(format!("brand '{}'", brand.name)));
            }
            let word = Regex::new(&format!(r"\b{}\b", regex::escape(&name)))?;
            brands.push(Brand {
                name,
                domain: brand.domain.trim().to_string(),
                word,
            });
        }

        let mut direct_aliases = Vec::with_capacity(definition.direct_aliases.len());
        for alias in definition.direct_aliases {
            let normalized_phrase = normalize::phrase(&alias.phrase);
            if normalized_phrase.is_empty() || normalize::normalize(&alias.target).is_empty() {
                return Err(CatalogError::Empty(format!("direct alias '{}'", alias.phrase)));
            }
            direct_aliases.push(DirectAlias {
                phrase: alias.phrase,
                target: alias.target,
                state: alias.state,
                normalized_phrase,
            });
        }

        log::debug!(
            "Loaded alias catalog: {} states, {} cities, {} special tokens, \
             {} composite rules, {} brands, {} direct aliases",
            states.len(),
            cities.len(),
            special_tokens.len(),
            composite_rules.len(),
            brands.len(),
            direct_aliases.len()
        );

        Ok(Self {
            states,
            cities,
            special_tokens,
            composite_rules,
            brands,
            direct_aliases,
        })
    }

    /// States in catalog order.
    #[must_use]
    pub fn states(&self) -> &[StateAliases] {
        &self.states
    }

    /// Looks up one state.
    #[must_use]
    pub fn state(&self, state: StateCode) -> Option<&StateAliases> {
        self.states.iter().find(|s| s.state == state)
    }

    /// Cities in catalog order.
    #[must_use]
    pub fn cities(&self) -> &[CityAliases] {
        &self.cities
    }

    /// Looks up one city by canonical name.
    #[must_use]
    pub fn city(&self, name: &str) -> Option<&CityAliases> {
        self.cities.iter().find(|c| c.name == name)
    }

    /// Special tokens in rule order.
    #[must_use]
    pub fn special_tokens(&self) -> &[SpecialToken] {
        &self.special_tokens
    }

    /// Composite rules in rule order.
    #[must_use]
    pub fn composite_rules(&self) -> &[CompositeRule] {
        &self.composite_rules
    }

    /// Brands in rule order.
    #[must_use]
    pub fn brands(&self) -> &[Brand] {
        &self.brands
    }

    /// Direct aliases in rule order.
    #[must_use]
    pub fn direct_aliases(&self) -> &[DirectAlias] {
        &self.direct_aliases
    }

    /// Returns `true` if any composite rule for `state` fires on `raw`.
    #[must_use]
    pub fn composite_fires(&self, state: StateCode, raw: &str) -> bool {
        self.composite_rules
            .iter()
            .any(|rule| rule.state() == state && rule.is_match(raw))
    }
}

fn compile_states(definitions: Vec<StateDefinition>) -> Result<Vec<StateAliases>, CatalogError> {
    let mut seen = BTreeSet::new();
    let mut states = Vec::with_capacity(definitions.len());

    for definition in definitions {
        if !seen.insert(definition.code) {
            return Err(CatalogError::DuplicateState(definition.code));
        }

        let code = definition.code.code().to_string();
        let mut phrases = vec![code.clone()];
        let mut tokens = BTreeSet::from([code]);

        for alias in &definition.aliases {
            let phrase = normalize::phrase(alias);
            if phrase.is_empty() {
                return Err(CatalogError::Empty(format!(
                    "alias '{alias}' of state {}",
                    definition.code
                )));
            }
            tokens.extend(phrase.split(' ').map(str::to_string));
            if !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        }

        states.push(StateAliases {
            state: definition.code,
            aliases: definition.aliases,
            phrases,
            tokens,
            strong: StrongPattern::new(definition.code)?,
        });
    }

    Ok(states)
}

fn compile_cities(
    definitions: Vec<CityDefinition>,
    state_tokens: &BTreeSet<&str>,
) -> Result<Vec<CityAliases>, CatalogError> {
    let mut seen = BTreeSet::new();
    let mut cities = Vec::with_capacity(definitions.len());

    for definition in definitions {
        if !seen.insert(definition.name.clone()) {
            return Err(CatalogError::DuplicateCity(definition.name));
        }

        let canonical_tokens = normalize::tokenize(&definition.name);
        if canonical_tokens.is_empty() {
            return Err(CatalogError::Empty(format!("city '{}'", definition.name)));
        }
        let canonical = canonical_tokens.join(" ");

        let mut phrases = vec![canonical.clone()];
        for alias in &definition.aliases {
            let phrase = normalize::phrase(alias);
            if phrase.is_empty() {
                return Err(CatalogError::Empty(format!(
                    "alias '{alias}' of city '{}'",
                    definition.name
                )));
            }
            if !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        }

        let distinctive = phrases
            .iter()
            .enumerate()
            .filter(|(i, phrase)| {
                *i == 0 || phrase.split(' ').any(|word| !state_tokens.contains(word))
            })
            .map(|(_, phrase)| phrase.clone())
            .collect();

        cities.push(CityAliases {
            name: definition.name,
            aliases: definition.aliases,
            canonical,
            canonical_tokens,
            phrases,
            distinctive,
        });
    }

    Ok(cities)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn embedded_catalog_has_every_state() {
        let catalog = AliasCatalog::embedded();
        assert_eq!(catalog.states().len(), StateCode::COUNT);
        for state in StateCode::iter() {
            assert!(catalog.state(state).is_some(), "missing state {state}");
        }
    }

    #[test]
    fn embedded_states_follow_declaration_order() {
        let catalog = AliasCatalog::embedded();
        let order: Vec<StateCode> = catalog.states().iter().map(|s| s.state).collect();
        let declared: Vec<StateCode> = StateCode::iter().collect();
        assert_eq!(order, declared);
    }

    #[test]
    fn every_state_has_two_to_six_aliases() {
        for state in AliasCatalog::embedded().states() {
            assert!(
                (2..=6).contains(&state.aliases.len()),
                "{} has {} aliases",
                state.state,
                state.aliases.len()
            );
        }
    }

    #[test]
    fn state_phrases_are_normalized() {
        let es = AliasCatalog::embedded().state(StateCode::Es).unwrap();
        assert_eq!(es.phrases(), ["es", "espirito santo"]);
        assert!(es.tokens().contains("espirito"));
        assert!(es.tokens().contains("santo"));
        assert!(es.tokens().contains("es"));
    }

    #[test]
    fn state_phrases_drop_stopwords() {
        let ms = AliasCatalog::embedded().state(StateCode::Ms).unwrap();
        assert!(ms.phrases().contains(&"mato grosso sul".to_string()));
        assert!(!ms.tokens().contains("do"));
    }

    #[test]
    fn city_phrases_collapse_spelling_variants() {
        let city = AliasCatalog::embedded().city("sao cristovao").unwrap();
        assert_eq!(city.canonical_phrase(), "sao cristovao");
        assert_eq!(city.phrases(), ["sao cristovao", "s cristovao"]);
    }

    #[test]
    fn city_canonical_tokens_drop_stopwords() {
        let city = AliasCatalog::embedded().city("sao jose dos campos").unwrap();
        assert_eq!(city.canonical_tokens(), ["sao", "jose", "campos"]);
    }

    #[test]
    fn distinctive_city_phrases_skip_state_words() {
        let catalog = AliasCatalog::embedded();

        let rio = catalog.city("rio de janeiro").unwrap();
        assert_eq!(rio.distinctive_phrases(), ["rio janeiro"]);
        assert!(!rio.is_named_in(" tabela rio grande sul "));
        assert!(rio.is_named_in(" tabela rio janeiro "));

        let sjc = catalog.city("sao jose dos campos").unwrap();
        assert!(sjc.distinctive_phrases().contains(&"sjc".to_string()));
        assert!(sjc.is_named_in(" tabela sjc "));

        let sergipe = catalog.city("sergipe").unwrap();
        assert_eq!(sergipe.distinctive_phrases(), ["sergipe"]);
    }

    #[test]
    fn special_tokens_reference_known_cities() {
        let catalog = AliasCatalog::embedded();
        assert!(!catalog.special_tokens().is_empty());
        for rule in catalog.special_tokens() {
            assert!(catalog.city(&rule.city).is_some());
        }
    }

    #[test]
    fn brands_match_standalone_words() {
        let catalog = AliasCatalog::embedded();
        let affix = catalog.brands().iter().find(|b| b.name == "affix").unwrap();
        assert!(affix.is_mentioned("tabela affix es"));
        assert!(!affix.is_mentioned("tabela affixo"));
        assert!(affix.owns("https://www.affix.com.br/a.pdf"));
        assert!(!affix.owns("https://alter.com.br/a.pdf"));
    }

    #[test]
    fn composite_rule_is_scoped_to_its_state() {
        let catalog = AliasCatalog::embedded();
        assert!(catalog.composite_fires(StateCode::Es, "ES-Manual"));
        assert!(!catalog.composite_fires(StateCode::Rj, "ES-Manual"));
    }

    #[test]
    fn loads_custom_catalog() {
        let catalog = AliasCatalog::from_toml_str(
            r#"
            [[states]]
            code = "es"
            aliases = ["espirito santo"]

            [[cities]]
            name = "vitoria"
            aliases = ["vix"]

            [[direct_aliases]]
            phrase = "book vix"
            target = "Book Vitoria"
            "#,
        )
        .unwrap();

        assert_eq!(catalog.states().len(), 1);
        assert_eq!(catalog.city("vitoria").unwrap().phrases(), ["vitoria", "vix"]);
        assert_eq!(catalog.direct_aliases()[0].normalized_phrase(), "book vix");
        assert!(catalog.direct_aliases()[0].state.is_none());
    }

    #[test]
    fn rejects_duplicate_state() {
        let err = AliasCatalog::from_toml_str(
            r#"
            [[states]]
            code = "es"
            aliases = ["es"]

            [[states]]
            code = "es"
            aliases = ["espirito santo"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateState(StateCode::Es)));
    }

    #[test]
    fn rejects_unknown_state_code() {
        let err = AliasCatalog::from_toml_str(
            r#"
            [[states]]
            code = "xx"
            aliases = ["nowhere"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Toml(_)));
    }

    #[test]
    fn rejects_special_token_for_unknown_city() {
        let err = AliasCatalog::from_toml_str(
            r#"
            [[special_tokens]]
            token = "samp"
            city = "sao bernardo"
            state = "es"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownCity { .. }));
    }

    #[test]
    fn rejects_stopword_only_alias() {
        let err = AliasCatalog::from_toml_str(
            r#"
            [[cities]]
            name = "de"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Empty(_)));
    }
}
