//! Line predicates used by the conversation filter.
//!
//! Call-sign matching is substring containment; termination matching is
//! whole-token. The two are kept apart on purpose: `73` must end a QSO
//! when sent on its own, but not when it appears inside `W173ABC`.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// Shape of an amateur-radio call sign: one or two prefix characters, a
/// digit, a suffix of up to four characters and an optional `/` modifier.
#[allow(clippy::expect_used)]
static CALL_SIGN_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9]{1,2}[0-9][A-Z0-9]{1,4}(?:/[A-Z0-9]+)?$")
        .expect("call sign pattern is valid")
});

/// The station identifier being monitored for.
///
/// Stored trimmed and upper-cased. An empty call sign disables filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallSign(String);

impl CallSign {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive substring containment against the full line.
    ///
    /// An empty call sign matches nothing.
    pub fn is_in(&self, line: &str) -> bool {
        !self.0.is_empty() && line.to_uppercase().contains(&self.0)
    }
}

impl fmt::Display for CallSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true if `line` contains `call_sign` (case-insensitive substring).
pub fn contains_call_sign(line: &str, call_sign: &CallSign) -> bool {
    call_sign.is_in(line)
}

/// Returns true if `token` has the shape of a station call sign.
///
/// Pure numbers such as signal reports (`599`) are rejected.
pub fn looks_like_call_sign(token: &str) -> bool {
    let upper = token.to_uppercase();
    upper.chars().any(|c| c.is_ascii_alphabetic()) && CALL_SIGN_SHAPE.is_match(&upper)
}

/// Returns true if `line` names a station other than `call_sign`.
///
/// Surrounding punctuation is stripped from each token (`K2XYZ?` names
/// K2XYZ). Portable modifiers are ignored when comparing, so `K1ABC/P` is
/// the same station as `K1ABC`.
pub fn names_other_station(line: &str, call_sign: &CallSign) -> bool {
    line.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '/'))
        .filter(|token| looks_like_call_sign(token))
        .map(|token| {
            let upper = token.to_uppercase();
            match upper.split_once('/') {
                Some((base, _)) => base.to_string(),
                None => upper,
            }
        })
        .any(|base| base != call_sign.as_str())
}

/// Tokens that mark the end of a conversation.
///
/// Each entry is a sequence of upper-cased words; multi-word entries such
/// as `DIT DIT` match a contiguous run of whole tokens in the line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerminationSet {
    entries: BTreeSet<Vec<String>>,
}

impl TerminationSet {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = tokens
            .into_iter()
            .map(|token| {
                token
                    .as_ref()
                    .split_whitespace()
                    .map(str::to_uppercase)
                    .collect::<Vec<_>>()
            })
            .filter(|words| !words.is_empty())
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive whole-token match anywhere in `line`.
    pub fn matches(&self, line: &str) -> bool {
        let words: Vec<String> = line.split_whitespace().map(str::to_uppercase).collect();
        self.entries.iter().any(|entry| {
            entry.len() <= words.len()
                && words
                    .windows(entry.len())
                    .any(|run| run == entry.as_slice())
        })
    }

    /// The configured tokens, words re-joined with single spaces.
    pub fn tokens(&self) -> Vec<String> {
        self.entries.iter().map(|words| words.join(" ")).collect()
    }
}
