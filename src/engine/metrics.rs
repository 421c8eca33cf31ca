//! Billable usage metrics
//!
//! R2 bills per operation class and per byte moved, D1 per row read and
//! written. Every request made by the engine reports its cost as a
//! [`Metrics`] value, and multi-request operations fold those values together
//! with [`Metrics::merge`].

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

/// Billable units consumed by one or more requests
///
/// Values are `Copy` and never mutated in place; accumulating produces a new
/// value. Merging is a field-wise sum, so it is associative and commutative
/// with [`Metrics::ZERO`] as the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metrics {
    /// Mutating / listing operations (PUT, LIST, DELETE on R2)
    pub class_a_operations: u64,
    /// Read operations (GET, HEAD on R2)
    pub class_b_operations: u64,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
    /// D1 rows scanned
    pub rows_read: u64,
    /// D1 rows modified
    pub rows_written: u64,
}

impl Metrics {
    /// No usage at all
    pub const ZERO: Metrics = Metrics {
        class_a_operations: 0,
        class_b_operations: 0,
        bytes_uploaded: 0,
        bytes_downloaded: 0,
        rows_read: 0,
        rows_written: 0,
    };

    /// `n` class A operations
    pub const fn class_a(n: u64) -> Self {
        Self {
            class_a_operations: n,
            ..Self::ZERO
        }
    }

    /// `n` class B operations
    pub const fn class_b(n: u64) -> Self {
        Self {
            class_b_operations: n,
            ..Self::ZERO
        }
    }

    pub const fn with_uploaded(self, bytes: u64) -> Self {
        Self {
            bytes_uploaded: bytes,
            ..self
        }
    }

    pub const fn with_downloaded(self, bytes: u64) -> Self {
        Self {
            bytes_downloaded: bytes,
            ..self
        }
    }

    /// D1 row usage of a query
    pub const fn rows(read: u64, written: u64) -> Self {
        Self {
            rows_read: read,
            rows_written: written,
            ..Self::ZERO
        }
    }

    /// Field-wise sum of two records
    ///
    /// Saturates at `u64::MAX` instead of wrapping.
    #[must_use]
    pub const fn merge(self, other: Metrics) -> Metrics {
        Metrics {
            class_a_operations: self.class_a_operations.saturating_add(other.class_a_operations),
            class_b_operations: self.class_b_operations.saturating_add(other.class_b_operations),
            bytes_uploaded: self.bytes_uploaded.saturating_add(other.bytes_uploaded),
            bytes_downloaded: self.bytes_downloaded.saturating_add(other.bytes_downloaded),
            rows_read: self.rows_read.saturating_add(other.rows_read),
            rows_written: self.rows_written.saturating_add(other.rows_written),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Total operations of either class
    pub fn operations(&self) -> u64 {
        self.class_a_operations.saturating_add(self.class_b_operations)
    }
}

impl Add for Metrics {
    type Output = Metrics;

    fn add(self, rhs: Metrics) -> Metrics {
        self.merge(rhs)
    }
}

impl Sum for Metrics {
    fn sum<I: Iterator<Item = Metrics>>(iter: I) -> Metrics {
        iter.fold(Metrics::ZERO, Metrics::merge)
    }
}

impl<'a> Sum<&'a Metrics> for Metrics {
    fn sum<I: Iterator<Item = &'a Metrics>>(iter: I) -> Metrics {
        iter.copied().sum()
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "class A: {}, class B: {}, uploaded: {} B, downloaded: {} B, rows read: {}, rows written: {}",
            self.class_a_operations,
            self.class_b_operations,
            self.bytes_uploaded,
            self.bytes_downloaded,
            self.rows_read,
            self.rows_written
        )
    }
}

/// A single call's result together with what it cost
#[derive(Debug, Clone, PartialEq)]
pub struct Metered<T> {
    pub value: T,
    pub metrics: Metrics,
}

impl<T> Metered<T> {
    pub fn new(value: T, metrics: Metrics) -> Self {
        Self { value, metrics }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metered<U> {
        Metered {
            value: f(self.value),
            metrics: self.metrics,
        }
    }
}
