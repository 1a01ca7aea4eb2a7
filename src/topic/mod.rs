//! Topic grammar
//!
//! Topics are hierarchical, dot-separated names such as `orders.created`.
//! A valid topic:
//! - is 1 to 255 characters long
//! - has at most 5 segments
//! - has segments that start with an ASCII letter and contain only ASCII
//!   letters and digits
//!
//! Comparison and matching are case-insensitive: both sides are lower-cased
//! (canonicalized) first. Subscription patterns may use `*` for exactly one
//! segment and a trailing `>` for one or more remaining segments.

use std::fmt;
use std::str::FromStr;

use crate::utils::error::SessionError;

pub const MAX_TOPIC_LEN: usize = 255;
pub const MAX_SEGMENTS: usize = 5;

const SINGLE_WILDCARD: &str = "*";
const TAIL_WILDCARD: &str = ">";

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// Returns true iff `name` satisfies the topic grammar.
pub fn is_valid(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_TOPIC_LEN {
        return false;
    }
    let mut count = 0;
    for segment in name.split('.') {
        count += 1;
        if count > MAX_SEGMENTS || !is_valid_segment(segment) {
            return false;
        }
    }
    true
}

/// Lower-cases a valid topic. Returns `None` for invalid input.
pub fn canonicalize(name: &str) -> Option<String> {
    is_valid(name).then(|| name.to_ascii_lowercase())
}

/// The topic with its last segment removed, or `None` for top-level or
/// invalid names.
pub fn parent(name: &str) -> Option<String> {
    if !is_valid(name) {
        return None;
    }
    name.rsplit_once('.').map(|(head, _)| head.to_string())
}

pub fn is_direct_child(child: &str, parent_name: &str) -> bool {
    match (
        canonicalize(child).and_then(|c| parent(&c)),
        canonicalize(parent_name),
    ) {
        (Some(p), Some(expected)) => p == expected,
        _ => false,
    }
}

/// Walks the canonical parent chain of `descendant` looking for `ancestor`.
/// A topic is never its own descendant.
pub fn is_descendant(descendant: &str, ancestor: &str) -> bool {
    let Some(ancestor) = canonicalize(ancestor) else {
        return false;
    };
    let mut current = canonicalize(descendant).and_then(|d| parent(&d));
    while let Some(name) = current {
        if name == ancestor {
            return true;
        }
        current = parent(&name);
    }
    false
}

/// Matches `name` against a subscription `pattern`.
///
/// Pattern segments are literals, `*` (exactly one segment) or `>` (one or
/// more trailing segments; only valid as the final token).
pub fn matches(name: &str, pattern: &str) -> bool {
    let Some(name) = canonicalize(name) else {
        return false;
    };
    let pattern = pattern.to_ascii_lowercase();
    let names: Vec<&str> = name.split('.').collect();
    let tokens: Vec<&str> = pattern.split('.').collect();

    for (i, token) in tokens.iter().enumerate() {
        match *token {
            TAIL_WILDCARD => return i == tokens.len() - 1 && names.len() > i,
            SINGLE_WILDCARD => {
                if i >= names.len() {
                    return false;
                }
            }
            literal => {
                if !is_valid_segment(literal) || names.get(i) != Some(&literal) {
                    return false;
                }
            }
        }
    }
    names.len() == tokens.len()
}

/// A validated topic name.
///
/// Equality and hashing use the canonical (lower-case) form, so
/// `Orders.Created` and `orders.created` are the same topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: &str) -> Result<Self, SessionError> {
        canonicalize(name)
            .map(Topic)
            .ok_or_else(|| SessionError::invalid_topic(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parent(&self) -> Option<Topic> {
        parent(&self.0).map(Topic)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn is_direct_child_of(&self, other: &Topic) -> bool {
        is_direct_child(&self.0, &other.0)
    }

    pub fn is_descendant_of(&self, other: &Topic) -> bool {
        is_descendant(&self.0, &other.0)
    }

    pub fn matches(&self, pattern: &str) -> bool {
        matches(&self.0, pattern)
    }
}

impl FromStr for Topic {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::new(s)
    }
}

impl TryFrom<&str> for Topic {
    type Error = SessionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Topic::new(value)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests;
