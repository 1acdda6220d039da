#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fuzzy retrieval over a small catalog of Portuguese-language documents.
//!
//! Queries are imprecise: state and city names spelled a dozen ways, bare
//! two-letter state codes, brand mentions, dates embedded in file names. The
//! engine resolves them against an in-memory index and returns only the
//! documents it is confident about. An empty result is preferred over a
//! guess.
//!
//! # Architecture
//!
//! - **Catalog**: state, city, brand and heuristic tables embedded as TOML
//!   and compiled once ([`catalog`], [`heuristics`]).
//! - **Index time**: each `{name, url}` row is validated, deduplicated by
//!   URL and tagged with the states and cities it mentions ([`index`]).
//! - **Query time**: the query is normalized identically ([`normalize`]),
//!   expanded into terms plus state/city locks ([`expand`]) and matched
//!   through a fixed cascade of tiers ([`engine`]).
//!
//! # Usage
//!
//! ```rust
//! use crion_search::{DocumentRow, SearchIndex};
//!
//! let index = SearchIndex::build(&[
//!     DocumentRow::new("Tabela-RJ-03-25", "http://affix.com.br/Tabela-RJ-03-25.pdf"),
//!     DocumentRow::new("Tabela-SP-03-25", "https://affix.com.br/Tabela-SP-03-25.pdf"),
//! ]);
//!
//! let hits = index.search("rio de janeiro");
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].url, "https://affix.com.br/Tabela-RJ-03-25.pdf");
//! ```

pub mod catalog;
pub mod engine;
pub mod expand;
pub mod heuristics;
pub mod index;
pub mod normalize;

use std::borrow::Cow;

pub use catalog::{AliasCatalog, CatalogError};
pub use crion_search_models::{
    DocumentRow, IndexEntry, QueryExpansion, SearchConfig, SearchHit, StateCode,
};
pub use engine::{SearchOutcome, Tier, search, search_with_tier};
pub use expand::expand_query;
pub use index::build_index;

/// A built index together with the catalog and scoring configuration it is
/// queried with.
///
/// Entries are immutable once built. Rebuilding produces a new value, so a
/// caller can swap it in while searches on the old one finish.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    catalog: Cow<'static, AliasCatalog>,
    config: SearchConfig,
    entries: Vec<IndexEntry>,
}

impl SearchIndex {
    /// Builds an index over `rows` with the embedded catalog and default
    /// scoring.
    #[must_use]
    pub fn build(rows: &[DocumentRow]) -> Self {
        Self::builder().build(rows)
    }

    /// Starts a builder for overriding the catalog or configuration.
    #[must_use]
    pub fn builder() -> SearchIndexBuilder {
        SearchIndexBuilder::default()
    }

    /// Builds a fresh index over `rows`, keeping this index's catalog and
    /// configuration.
    #[must_use]
    pub fn rebuild(&self, rows: &[DocumentRow]) -> Self {
        Self {
            catalog: self.catalog.clone(),
            config: self.config.clone(),
            entries: build_index(&self.catalog, rows),
        }
    }

    /// Ranked hits for `query`.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search(&self.catalog, &self.config, &self.entries, query)
    }

    /// Ranked hits for `query`, with the tier that produced them.
    #[must_use]
    pub fn search_with_tier(&self, query: &str) -> SearchOutcome {
        search_with_tier(&self.catalog, &self.config, &self.entries, query)
    }

    /// How `query` is interpreted against this index's catalog.
    #[must_use]
    pub fn expand(&self, query: &str) -> QueryExpansion {
        expand_query(&self.catalog, query)
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn catalog(&self) -> &AliasCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for [`SearchIndex`].
#[derive(Debug, Clone, Default)]
pub struct SearchIndexBuilder {
    catalog: Option<AliasCatalog>,
    config: SearchConfig,
}

impl SearchIndexBuilder {
    /// Uses `catalog` instead of the embedded one.
    #[must_use]
    pub fn catalog(mut self, catalog: AliasCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Uses `config` instead of the default scoring.
    #[must_use]
    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Indexes `rows`.
    #[must_use]
    pub fn build(self, rows: &[DocumentRow]) -> SearchIndex {
        let catalog = self
            .catalog
            .map_or(Cow::Borrowed(AliasCatalog::embedded()), Cow::Owned);
        let entries = build_index(&catalog, rows);

        SearchIndex {
            catalog,
            config: self.config,
            entries,
        }
    }
}
