//! Property tests for period arithmetic, policy ordering and bloat math.

use keeper_core::models::{bloat_pct, MonthPeriod, RetentionPolicy};
use proptest::prelude::*;

proptest! {
    #[test]
    fn consecutive_months_tile_without_gaps(year in 1990i32..2200, month in 1u32..=12, n in 1i32..48) {
        let start = MonthPeriod::new(year, month).unwrap();
        let mut current = start;
        for _ in 0..n {
            let next = current.next();
            prop_assert_eq!(current.end(), next.start());
            current = next;
        }
        prop_assert_eq!(current, start.offset(n));
        prop_assert_eq!(current.offset(-n), start);
    }

    #[test]
    fn policy_valid_iff_drop_after_exceeds_archive_after(
        archive in 0u32..60,
        drop in 0u32..60,
        future in 0u32..6,
    ) {
        let policy = RetentionPolicy {
            entity_type: "events".into(),
            schema: "public".into(),
            future_periods: future,
            archive_after_months: archive,
            drop_after_months: drop,
        };
        let expected = drop > archive && archive > 0 && future > 0;
        prop_assert_eq!(policy.validate().is_ok(), expected);
    }

    #[test]
    fn bloat_is_zero_for_zero_ideal(current in any::<u64>()) {
        prop_assert_eq!(bloat_pct(current, 0), 0.0);
    }

    #[test]
    fn bloat_sign_follows_size_comparison(current in 0u64..1 << 40, ideal in 1u64..1 << 40) {
        let pct = bloat_pct(current, ideal);
        prop_assert_eq!(pct > 0.0, current > ideal);
    }
}
