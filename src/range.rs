//! Half-open byte ranges and the set algebra the index engine is built on.
//!
//! A [`Range`] `(offset, length)` denotes the set of 64-bit integers `i` with
//! `offset <= i < offset + length`. A length of zero denotes the empty set;
//! the offset of an empty range is carried but irrelevant for set identity.
//!
//! All operations are pure value computations. The only representable ranges
//! are those with `offset + length <= u64::MAX + 1`; the engine itself never
//! constructs a range ending past `u64::MAX` (see [`Range::max_from`]).

use std::fmt;

/// A half-open interval of byte offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub offset: u64,
    pub length: u64,
}

impl Range {
    /// Creates a range covering `offset <= i < offset + length`.
    #[inline]
    pub fn new(offset: u64, length: u64) -> Self {
        debug_assert!(offset.checked_add(length).is_some(), "range end overflow");
        Range { offset, length }
    }

    /// The largest representable range starting at `offset`.
    #[inline]
    pub fn max_from(offset: u64) -> Self {
        Range { offset, length: u64::MAX - offset }
    }

    /// First offset past the end of the range.
    #[inline]
    pub fn end(self) -> u64 {
        self.offset + self.length
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.length == 0
    }

    /// Whether `offset` is an element of the range. Empty ranges contain
    /// nothing.
    #[inline]
    pub fn contains(self, offset: u64) -> bool {
        self.offset <= offset && offset - self.offset < self.length
    }

    /// Whether `sub` is entirely contained in `self`. The empty range is a
    /// subset of everything, regardless of its offset.
    pub fn is_superset(self, sub: Range) -> bool {
        sub.is_empty() || (self.contains(sub.offset) && self.contains(sub.end() - 1))
    }

    /// Whether the two ranges share at least one element. False when either
    /// range is empty.
    pub fn overlaps(self, other: Range) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.contains(other.offset)
                || self.contains(other.end() - 1)
                || other.contains(self.offset)
                || other.contains(self.end() - 1))
    }

    /// Set-theoretic union, defined only when the operands overlap or are
    /// adjacent (their closures touch). An empty operand yields the other
    /// operand. Returns `None` when the operands are separated by a gap.
    pub fn union(self, other: Range) -> Option<Range> {
        if self.is_empty() {
            return Some(other);
        }
        if other.is_empty() {
            return Some(self);
        }
        let (a, b) = if self.offset <= other.offset { (self, other) } else { (other, self) };
        if a.end() < b.offset {
            return None;
        }
        Some(Range::new(a.offset, a.end().max(b.end()) - a.offset))
    }

    /// Smallest range containing both operands. Total: an empty operand
    /// yields the other operand.
    pub fn outer(self, other: Range) -> Range {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let offset = self.offset.min(other.offset);
        Range::new(offset, self.end().max(other.end()) - offset)
    }

    /// Largest range contained in both operands, or `None` when the
    /// intersection is empty.
    pub fn intersect(self, other: Range) -> Option<Range> {
        let offset = self.offset.max(other.offset);
        let end = self.end().min(other.end());
        if offset < end {
            Some(Range::new(offset, end - offset))
        } else {
            None
        }
    }

    /// Set difference `self \ remove`. Removing the middle of a range
    /// produces two pieces; the second has length zero when there is no
    /// right remainder. Removal by an empty range is a no-op.
    pub fn remove(self, remove: Range) -> (Range, Range) {
        match remove.intersect(self) {
            Some(hit) => {
                let left = Range { offset: self.offset, length: hit.offset - self.offset };
                let right = Range::new(hit.end(), self.end() - hit.end());
                (left, right)
            }
            None => (self, Range { offset: self.end(), length: 0 }),
        }
    }

    /// Drops the first `n` elements. `n` must not exceed the length.
    #[inline]
    pub fn remove_left(self, n: u64) -> Range {
        debug_assert!(n <= self.length);
        Range { offset: self.offset + n, length: self.length - n }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.end())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
