//! Anchored state-code patterns and composite state heuristics.
//!
//! Both operate on *raw* document names and URLs, because the upper-case
//! code (`-ES-`, `(RJ)`) is the signal and normalization would erase it.

use crion_search_models::StateCode;
use regex::{Regex, RegexBuilder};

/// Matches a bare upper-case state code bounded by non-letters, e.g. `-ES-`,
/// `(ES)` or `_ES.pdf`, but not `MES` or `ESTOQUE`.
#[derive(Debug, Clone)]
pub struct StrongPattern {
    state: StateCode,
    pattern: Regex,
}

impl StrongPattern {
    /// Compiles the anchored pattern for `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn new(state: StateCode) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!("(^|[^A-Za-z]){}([^A-Za-z]|$)", state.upper()))?;
        Ok(Self { state, pattern })
    }

    /// The state this pattern detects.
    #[must_use]
    pub const fn state(&self) -> StateCode {
        self.state
    }

    /// Returns `true` if `raw` carries the anchored code.
    #[must_use]
    pub fn is_match(&self, raw: &str) -> bool {
        self.pattern.is_match(raw)
    }
}

/// A state implied by its code co-occurring with a generic marker word,
/// e.g. `ES-Manual` or `Manual ... ES`.
///
/// The match is case-insensitive on both sides. The code must be bounded by
/// non-letters; the marker must be separated from the code by at least one
/// non-letter.
#[derive(Debug, Clone)]
pub struct CompositeRule {
    state: StateCode,
    marker: String,
    pattern: Regex,
}

impl CompositeRule {
    /// Compiles the rule for `state` and `marker`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn new(state: StateCode, marker: &str) -> Result<Self, regex::Error> {
        let code = state.code();
        let marker_re = regex::escape(marker);
        let pattern = RegexBuilder::new(&format!(
            "(^|[^a-z]){code}([^a-z].*{marker_re}|$)|{marker_re}[^a-z].*{code}([^a-z]|$)"
        ))
        .case_insensitive(true)
        .build()?;

        Ok(Self {
            state,
            marker: marker.to_string(),
            pattern,
        })
    }

    /// The state this rule implies.
    #[must_use]
    pub const fn state(&self) -> StateCode {
        self.state
    }

    /// The marker word that must accompany the code.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Returns `true` if the rule fires on `raw`.
    #[must_use]
    pub fn is_match(&self, raw: &str) -> bool {
        self.pattern.is_match(raw)
    }
}
