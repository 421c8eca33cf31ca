//! Property-based tests using proptest
//!
//! These tests verify the algebra of metrics, the case handling of the
//! extensible string enums, and the stopping rules of pagination using
//! randomized inputs.

use cfapi::engine::{Page, PageInfo, PageRequest, Paginated, TotalPages};
use cfapi::types::{DnsRecordType, ZoneStatus};
use cfapi::{CancellationToken, Metrics};
use futures::FutureExt;
use proptest::prelude::*;
use std::collections::HashSet;

/// Generate metrics small enough that sums never saturate
fn arb_metrics() -> impl Strategy<Value = Metrics> {
    (
        0..1_000_000u64,
        0..1_000_000u64,
        0..1_000_000_000u64,
        0..1_000_000_000u64,
        0..1_000_000u64,
        0..1_000_000u64,
    )
        .prop_map(|(a, b, up, down, read, written)| Metrics {
            class_a_operations: a,
            class_b_operations: b,
            bytes_uploaded: up,
            bytes_downloaded: down,
            rows_read: read,
            rows_written: written,
        })
}

/// Serve `sizes` as consecutive pages of a page-based listing with zero totals
fn unreliable_listing(sizes: Vec<usize>, per_page: u32) -> Paginated<'static, usize> {
    Paginated::page_based(
        per_page,
        TotalPages::Unreliable,
        CancellationToken::new(),
        move |request| {
            let PageRequest::Page { page, .. } = request else {
                unreachable!("page-based listing sent a cursor request");
            };
            let index = page as usize - 1;
            let size = sizes.get(index).copied().unwrap_or(0);
            let start: usize = sizes.iter().take(index).sum();
            let info = PageInfo::Numbered {
                page,
                per_page,
                count: size as u32,
                total_count: 0,
                total_pages: 0,
            };
            let items = (start..start + size).collect();
            async move { Ok(Page::new(items, Some(info)).with_metrics(Metrics::class_a(1))) }.boxed()
        },
    )
}

proptest! {
    /// Merging is associative
    #[test]
    fn merge_is_associative(a in arb_metrics(), b in arb_metrics(), c in arb_metrics()) {
        prop_assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
    }

    /// Merging is commutative
    #[test]
    fn merge_is_commutative(a in arb_metrics(), b in arb_metrics()) {
        prop_assert_eq!(a.merge(b), b.merge(a));
    }

    /// ZERO is the identity
    #[test]
    fn zero_is_identity(a in arb_metrics()) {
        prop_assert_eq!(a.merge(Metrics::ZERO), a);
        prop_assert_eq!(Metrics::ZERO.merge(a), a);
    }

    /// Summing a list matches folding with merge, in any order
    #[test]
    fn sum_matches_fold(list in prop::collection::vec(arb_metrics(), 0..20)) {
        let folded = list.iter().fold(Metrics::ZERO, |acc, m| acc.merge(*m));
        let summed: Metrics = list.iter().rev().copied().sum();
        prop_assert_eq!(folded, summed);
    }

    /// Merging never wraps
    #[test]
    fn merge_saturates(a in any::<u64>(), b in any::<u64>()) {
        let merged = Metrics::class_a(a).merge(Metrics::class_a(b));
        prop_assert!(merged.class_a_operations >= a.max(b));
    }

    /// String enums compare case-insensitively and survive serde unchanged
    #[test]
    fn enum_equality_ignores_case(value in "[a-zA-Z]{1,12}") {
        let lower = ZoneStatus::from(value.to_lowercase());
        let upper = ZoneStatus::from(value.to_uppercase());
        prop_assert_eq!(&lower, &upper);

        let set: HashSet<ZoneStatus> = [lower, upper].into_iter().collect();
        prop_assert_eq!(set.len(), 1);

        let json = serde_json::to_string(&DnsRecordType::from(value.clone())).unwrap();
        let back: DnsRecordType = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.as_str(), value.as_str());
    }

    /// Unreliable totals: full pages continue, the first short page ends the listing
    #[test]
    fn unreliable_listing_stops_at_short_page(
        full_pages in 0..5usize,
        last in 0..10usize,
        trailing in prop::collection::vec(1..10usize, 0..3),
    ) {
        let per_page = 10u32;
        let mut sizes = vec![per_page as usize; full_pages];
        sizes.push(last);
        sizes.extend(trailing);

        let expected = full_pages * per_page as usize + last;
        let listing = tokio_test::block_on(unreliable_listing(sizes, per_page).collect()).unwrap();

        prop_assert_eq!(listing.items, (0..expected).collect::<Vec<_>>());
        // The short page itself is fetched; an empty one too
        prop_assert_eq!(listing.metrics, Metrics::class_a(full_pages as u64 + 1));
    }
}
