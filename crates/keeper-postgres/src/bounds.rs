//! Parsing of partition bound expressions.

use chrono::NaiveDate;

use keeper_core::models::PeriodRange;

/// Parse the output of `pg_get_expr(relpartbound, oid)` for a range
/// partition, e.g. `FOR VALUES FROM ('2026-10-01') TO ('2026-11-01')`.
///
/// Timestamp bounds are accepted and truncated to their date. Returns `None`
/// for default partitions, `MINVALUE`/`MAXVALUE` bounds, multi-column bounds
/// and anything else that is not a plain date range.
pub fn parse_range_bound(expr: &str) -> Option<PeriodRange> {
    let rest = expr.trim().strip_prefix("FOR VALUES FROM (")?;
    let (from, rest) = rest.split_once(") TO (")?;
    let to = rest.strip_suffix(')')?;
    let start = parse_literal(from)?;
    let end = parse_literal(to)?;
    (start < end).then(|| PeriodRange::new(start, end))
}

fn parse_literal(value: &str) -> Option<NaiveDate> {
    let inner = value.trim().strip_prefix('\'')?.strip_suffix('\'')?;
    let date = inner.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_date_bounds() {
        let range = parse_range_bound("FOR VALUES FROM ('2026-10-01') TO ('2026-11-01')").unwrap();
        assert_eq!(range, PeriodRange::new(date(2026, 10, 1), date(2026, 11, 1)));
    }

    #[test]
    fn parses_timestamptz_bounds() {
        let range = parse_range_bound(
            "FOR VALUES FROM ('2026-12-01 00:00:00+00') TO ('2027-01-01 00:00:00+00')",
        )
        .unwrap();
        assert_eq!(range.start, date(2026, 12, 1));
        assert_eq!(range.end, date(2027, 1, 1));
    }

    #[test]
    fn rejects_default_and_open_bounds() {
        assert!(parse_range_bound("DEFAULT").is_none());
        assert!(parse_range_bound("FOR VALUES FROM (MINVALUE) TO ('2026-01-01')").is_none());
        assert!(parse_range_bound("FOR VALUES IN ('eu')").is_none());
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(parse_range_bound("FOR VALUES FROM ('2026-11-01') TO ('2026-10-01')").is_none());
    }
}
