//! Closed-open integer intervals used by selection and row bookkeeping.

use std::fmt;

use crate::error::{Error, Result};

/// A half-open interval `[from, to)`.
///
/// `Range::new(0, 0)` is the canonical empty range returned by operations that
/// produce nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    /// Inclusive start.
    pub from: i64,
    /// Exclusive end.
    pub to: i64,
}

impl Range {
    /// Construct a range.
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// The canonical empty range.
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    /// Number of values covered by the range.
    pub fn size(&self) -> i64 {
        self.to - self.from
    }

    /// Does the range contain `value`?
    pub fn contains(&self, value: i64) -> bool {
        self.from <= value && value < self.to
    }

    /// Do the ranges neither overlap nor touch?
    fn is_apart(&self, other: &Self) -> bool {
        self.to < other.from || other.to < self.from
    }

    /// Merge two ranges that overlap or border on each other.
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.is_apart(other) {
            return Err(Error::Range(format!(
                "Range to add has to border on the existing range. {self}, {other}"
            )));
        }
        Ok(Self::new(self.from.min(other.from), self.to.max(other.to)))
    }

    /// Merge the ranges if possible, otherwise return copies of both.
    pub fn union(&self, other: &Self) -> Vec<Self> {
        match self.add(other) {
            Ok(merged) => vec![merged],
            Err(_) => vec![*self, *other],
        }
    }

    /// The part covered by both ranges, or the empty range.
    pub fn intersect(&self, other: &Self) -> Self {
        if self.to <= other.from || other.to <= self.from {
            return Self::empty();
        }
        Self::new(self.from.max(other.from), self.to.min(other.to))
    }

    /// Remove `other` from this range. The result holds one or two ranges, or
    /// the empty range when `other` covers this one completely.
    pub fn subtract(&self, other: &Self) -> Vec<Self> {
        if other.size() == 0 {
            return vec![*self];
        }
        if other.from <= self.from && other.to >= self.to {
            return vec![Self::empty()];
        }
        if other.from >= self.from && other.to <= self.to {
            let mut parts = Vec::with_capacity(2);
            if self.from != other.from {
                parts.push(Self::new(self.from, other.from));
            }
            if self.to != other.to {
                parts.push(Self::new(other.to, self.to));
            }
            return parts;
        }
        if other.from > self.from && other.from < self.to {
            return vec![Self::new(self.from, other.from)];
        }
        if other.to > self.from && other.to < self.to {
            return vec![Self::new(other.to, self.to)];
        }
        vec![*self]
    }

    /// Subtract every range in `others`, in order.
    pub fn subtract_all<'a>(&self, others: impl IntoIterator<Item = &'a Self>) -> Vec<Self> {
        let mut result = vec![*self];
        for other in others {
            result = result.iter().flat_map(|r| r.subtract(other)).collect();
        }
        result
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range[from={} to={}]", self.from, self.to)
    }
}
