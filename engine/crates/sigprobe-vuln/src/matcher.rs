//! Match expression engine for vulnerability detection
//!
//! A probe's match expression is a list of substrings joined either by
//! [`ALL_OF_SEPARATOR`] (every token must appear) or by [`ANY_OF_SEPARATOR`]
//! (one token is enough). Tokens are checked in declaration order and the
//! evaluation stops as soon as the verdict is known.

use sigprobe_core::Verdict;

/// Separator for conjunctive expressions; takes precedence when both appear
pub const ALL_OF_SEPARATOR: &str = "&&&&";

/// Separator for disjunctive expressions; the default mode
pub const ANY_OF_SEPARATOR: &str = "||||";

/// How the tokens of an expression combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Every token must be present
    AllOf,
    /// At least one token must be present
    AnyOf,
}

impl MatchMode {
    pub fn separator(&self) -> &'static str {
        match self {
            MatchMode::AllOf => ALL_OF_SEPARATOR,
            MatchMode::AnyOf => ANY_OF_SEPARATOR,
        }
    }
}

/// A parsed match expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchExpression {
    mode: MatchMode,
    tokens: Vec<String>,
}

impl MatchExpression {
    /// Parse an expression. Never fails.
    ///
    /// Empty tokens (from an empty expression or a leading, trailing or
    /// doubled separator) are dropped: an empty needle would match any
    /// response.
    pub fn parse(expression: &str) -> Self {
        let mode = if expression.contains(ALL_OF_SEPARATOR) {
            MatchMode::AllOf
        } else {
            MatchMode::AnyOf
        };

        let tokens = expression
            .split(mode.separator())
            .filter(|token| !token.is_empty())
            .map(String::from)
            .collect();

        Self { mode, tokens }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Evaluate against a haystack using exact, case-sensitive containment
    pub fn evaluate(&self, haystack: &str) -> Verdict {
        self.evaluate_with(|token| haystack.contains(token))
    }

    /// Evaluate with a caller-supplied containment predicate.
    ///
    /// The predicate is called once per token inspected, in order, and not
    /// at all after the verdict is decided.
    pub fn evaluate_with<F>(&self, mut contains: F) -> Verdict
    where
        F: FnMut(&str) -> bool,
    {
        if self.tokens.is_empty() {
            return Verdict::NotVulnerable;
        }

        match self.mode {
            MatchMode::AnyOf => self
                .tokens
                .iter()
                .find(|token| contains(token.as_str()))
                .map(|token| Verdict::vulnerable_token(token.as_str()))
                .unwrap_or(Verdict::NotVulnerable),
            MatchMode::AllOf => {
                if self.tokens.iter().all(|token| contains(token.as_str())) {
                    Verdict::all_conditions()
                } else {
                    Verdict::NotVulnerable
                }
            }
        }
    }
}

impl From<&str> for MatchExpression {
    fn from(expression: &str) -> Self {
        Self::parse(expression)
    }
}

/// Parse `expression` and evaluate it against `haystack`
pub fn evaluate(haystack: &str, expression: &str) -> Verdict {
    MatchExpression::parse(expression).evaluate(haystack)
}
