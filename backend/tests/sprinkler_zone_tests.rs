//! Tests for sprinkler zone chains
//! Verifies chaining, the envelope lock and validation order

use proptest::prelude::*;
use shared::sprinkler::{ChainKind, SprinklerZoneChain};
use shared::{BoundSide, GeoPoint, Shape, ZoneChainError};

fn circle(radius_m: f64) -> Shape {
    Shape::Circle {
        center: GeoPoint::new(39.5, -119.8),
        radius_m,
    }
}

fn three_zone_pivot() -> SprinklerZoneChain {
    let envelope = circle(100.0).outer_measurement().unwrap();
    SprinklerZoneChain::from_bounds(
        ChainKind::Radial,
        envelope,
        &[
            (Some(0.0), Some(40.0)),
            (Some(40.0), Some(70.0)),
            (Some(70.0), Some(100.0)),
        ],
    )
    .unwrap()
}

// =============================================================================
// Scenario: three chained zones on a 100 m pivot
// =============================================================================

mod pivot_scenario {
    use super::*;

    #[test]
    fn chained_zones_validate() {
        let resolved = three_zone_pivot().validate().unwrap();
        let bounds: Vec<_> = resolved.iter().map(|z| (z.inner, z.outer)).collect();
        assert_eq!(bounds, vec![(0.0, 40.0), (40.0, 70.0), (70.0, 100.0)]);
    }

    #[test]
    fn editing_middle_outer_without_next_inner_is_discontinuous() {
        let mut chain = three_zone_pivot();
        chain.set_zone_bound(2, BoundSide::Outer, Some(60.0)).unwrap();
        assert_eq!(
            chain.validate(),
            Err(ZoneChainError::Discontinuous {
                index: 3,
                inner: 70.0,
                previous_outer: 60.0,
            })
        );
    }

    #[test]
    fn chained_edit_keeps_chain_valid() {
        let mut chain = three_zone_pivot();
        chain.set_outer_bound_chained(2, Some(60.0)).unwrap();
        let resolved = chain.validate().unwrap();
        assert_eq!(resolved[1].outer, 60.0);
        assert_eq!(resolved[2].inner, 60.0);
    }

    #[test]
    fn pivot_request_form() {
        let zones = three_zone_pivot().pivot_zones().unwrap();
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[0].initial_radius, 0.0);
        assert_eq!(zones[2].final_radius, 100.0);
    }
}

// =============================================================================
// Editing rules
// =============================================================================

mod editing {
    use super::*;

    #[test]
    fn last_outer_bound_is_locked() {
        let mut chain = three_zone_pivot();
        assert_eq!(
            chain.set_zone_bound(3, BoundSide::Outer, Some(90.0)),
            Err(ZoneChainError::EnvelopeLocked)
        );
    }

    #[test]
    fn envelope_change_moves_last_outer_bound() {
        let mut chain = three_zone_pivot();
        chain.set_envelope(120.0);
        assert_eq!(chain.zones()[2].outer_bound, Some(120.0));
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn growing_chain_inherits_previous_outer() {
        let mut chain = SprinklerZoneChain::new(ChainKind::Banded, 50.0);
        chain.set_zone_count(2).unwrap();
        assert_eq!(chain.zones()[1].inner_bound, Some(50.0));
        assert_eq!(chain.zones()[1].outer_bound, Some(50.0));
        assert_eq!(chain.zones()[0].outer_bound, Some(50.0));
    }

    #[test]
    fn shrinking_to_zero_is_rejected() {
        let mut chain = three_zone_pivot();
        assert_eq!(chain.set_zone_count(0), Err(ZoneChainError::InvalidZoneCount));
        assert_eq!(chain.zone_count(), 3);
    }

    #[test]
    fn out_of_range_index() {
        let mut chain = three_zone_pivot();
        assert_eq!(
            chain.set_zone_bound(4, BoundSide::Inner, Some(1.0)),
            Err(ZoneChainError::ZoneIndexOutOfRange { index: 4, count: 3 })
        );
        assert!(chain.set_zone_bound(0, BoundSide::Inner, Some(1.0)).is_err());
    }
}

// =============================================================================
// Validation order
// =============================================================================

mod validation {
    use super::*;

    #[test]
    fn blank_middle_bound_is_missing() {
        let chain = SprinklerZoneChain::from_bounds(
            ChainKind::Radial,
            100.0,
            &[(None, Some(40.0)), (None, Some(100.0))],
        )
        .unwrap();
        assert_eq!(
            chain.validate(),
            Err(ZoneChainError::MissingBound {
                index: 2,
                side: BoundSide::Inner
            })
        );
    }

    #[test]
    fn zero_after_first_zone_is_non_positive() {
        let chain = SprinklerZoneChain::from_bounds(
            ChainKind::Radial,
            100.0,
            &[(Some(0.0), Some(40.0)), (Some(0.0), Some(100.0))],
        )
        .unwrap();
        assert_eq!(
            chain.validate(),
            Err(ZoneChainError::NonPositiveBound {
                index: 2,
                side: BoundSide::Inner
            })
        );
    }

    #[test]
    fn inverted_bounds() {
        let chain = SprinklerZoneChain::from_bounds(
            ChainKind::Banded,
            100.0,
            &[(Some(50.0), Some(40.0)), (Some(40.0), Some(100.0))],
        )
        .unwrap();
        assert!(matches!(
            chain.validate(),
            Err(ZoneChainError::InvertedBound { index: 1, .. })
        ));
    }

    #[test]
    fn bound_beyond_envelope() {
        let chain = SprinklerZoneChain::from_bounds(
            ChainKind::Banded,
            100.0,
            &[(Some(0.0), Some(140.0)), (Some(140.0), Some(100.0))],
        )
        .unwrap();
        assert!(matches!(
            chain.validate(),
            Err(ZoneChainError::BoundExceedsEnvelope { index: 1, .. })
        ));
    }

    #[test]
    fn empty_chain() {
        assert_eq!(
            SprinklerZoneChain::from_bounds(ChainKind::Radial, 10.0, &[]),
            Err(ZoneChainError::InvalidZoneCount)
        );
    }

    #[test]
    fn banded_request_keys_start_at_one() {
        let chain = SprinklerZoneChain::from_bounds(
            ChainKind::Banded,
            30.0,
            &[(Some(0.0), Some(10.0)), (Some(10.0), Some(30.0))],
        )
        .unwrap();
        let zones = chain.banded_zones().unwrap();
        assert_eq!(zones.get("1"), Some(&[0.0, 10.0]));
        assert_eq!(zones.get("2"), Some(&[10.0, 30.0]));
    }
}

// =============================================================================
// Property tests
// =============================================================================

mod properties {
    use super::*;

    fn cuts_strategy() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.01f64..0.99, 0..6).prop_map(|mut cuts| {
            cuts.sort_by(|a, b| a.total_cmp(b));
            cuts
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A chain built through the drawing edits is continuous and ends at
        /// the shape's outer measurement
        #[test]
        fn prop_chained_edits_are_continuous(
            envelope in 10.0f64..1000.0,
            cuts in cuts_strategy(),
            radial in any::<bool>(),
        ) {
            let kind = if radial { ChainKind::Radial } else { ChainKind::Banded };
            let mut chain = SprinklerZoneChain::new(kind, envelope);
            chain.set_zone_count(cuts.len() + 1).unwrap();
            for (i, cut) in cuts.iter().enumerate() {
                chain.set_outer_bound_chained(i + 1, Some(cut * envelope)).unwrap();
            }

            let resolved = chain.validate().unwrap();
            prop_assert_eq!(resolved.len(), cuts.len() + 1);
            for pair in resolved.windows(2) {
                prop_assert_eq!(pair[0].outer, pair[1].inner);
            }
            prop_assert_eq!(resolved[resolved.len() - 1].outer, envelope);
        }

        /// Resizing keeps the envelope on the last zone
        #[test]
        fn prop_resize_locks_envelope(
            envelope in 10.0f64..1000.0,
            first in 1usize..8,
            second in 1usize..8,
        ) {
            let mut chain = SprinklerZoneChain::new(ChainKind::Radial, envelope);
            chain.set_zone_count(first).unwrap();
            chain.set_zone_count(second).unwrap();
            prop_assert_eq!(chain.zone_count(), second);
            prop_assert_eq!(chain.zones()[second - 1].outer_bound, Some(envelope));
        }
    }
}
