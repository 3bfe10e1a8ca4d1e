//! Property tests: pixel ↔ percentage conversion.
//!
//! Conversions run on every pointer move, so they must round-trip and
//! stay finite for any input a gesture can produce.

use pf_core::dimension::{Dimension, format_percent, percent_to_px, px_to_percent};
use proptest::prelude::*;

proptest! {
    #[test]
    fn percent_round_trip(v in 0.0f64..10_000.0, r in 1.0f64..5_000.0) {
        let pct = px_to_percent(v, r);
        let back = percent_to_px(&format!("{pct}%"), r);
        prop_assert!((back - v).abs() <= 1e-9 * v.max(1.0), "v={v} r={r} back={back}");
    }

    #[test]
    fn formatted_round_trip_within_precision(v in 0.0f64..10_000.0, r in 1.0f64..5_000.0) {
        let raw = format_percent(px_to_percent(v, r), 4);
        let back = percent_to_px(&raw, r);
        // 4 decimals of a percentage is at most 0.00005% of the reference.
        prop_assert!((back - v).abs() <= r * 1e-6 + 1e-9, "raw={raw} back={back} v={v}");
    }

    #[test]
    fn zero_reference_is_zero(v in proptest::num::f64::ANY) {
        prop_assert_eq!(px_to_percent(v, 0.0), 0.0);
    }

    #[test]
    fn conversions_stay_finite(v in proptest::num::f64::ANY, r in proptest::num::f64::ANY) {
        prop_assert!(px_to_percent(v, r).is_finite());
        prop_assert!(percent_to_px("50%", r).is_finite());
    }

    #[test]
    fn parse_never_panics(s in "\\PC{0,12}") {
        let _ = Dimension::parse(&s);
        let _ = percent_to_px(&s, 100.0);
    }
}

#[test]
fn end_to_end_examples() {
    // 100px of a 500px parent is 20%; growing by 50px gives 30%.
    assert_eq!(px_to_percent(100.0, 500.0), 20.0);
    assert_eq!(format_percent(px_to_percent(150.0, 500.0), 4), "30%");
    assert_eq!(percent_to_px("20%", 500.0), 100.0);
}
