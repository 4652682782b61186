//! Tests for prescription documents
//! Verifies legend colours, rate edits and the merge into cells

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use shared::prescription::{color_for_rate, convert_color, merge_rates, update_rate, RateDocument};
use shared::{
    CellCollection, Legend, LegendEntry, PrescriptionError, RateKey, NO_DATA_COLOR,
};

const PIVOT_XML: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<VSSI xmlns="http://tempuri.org/VSSI.xsd">
  <Zones>
    <MapZoneRate BearingSeqNum="1" DistanceSeqNum="1" WateringRatePercent="100" />
    <MapZoneRate BearingSeqNum="1" DistanceSeqNum="2" WateringRatePercent="80" />
    <MapZoneRate BearingSeqNum="2" DistanceSeqNum="1" WateringRatePercent="40" />
  </Zones>
  <Legend>
    <WateringColor WateringPercent="100" Color="#FF0000FF" />
    <WateringColor WateringPercent="50" Color="#FFFF0000" />
  </Legend>
</VSSI>"##;

fn two_band_legend() -> Legend {
    Legend::new(vec![
        LegendEntry::new(Decimal::from(50), "B"),
        LegendEntry::new(Decimal::from(25), "A"),
    ])
}

/// Cells keyed by flat sequence numbers; the last has no distance
fn cells() -> CellCollection {
    CellCollection::from_geojson(&json!({
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "id": "a", "geometry": null,
              "properties": { "BearingSeqNum": 1, "DistanceSeqNum": 1 } },
            { "type": "Feature", "id": "b", "geometry": null,
              "properties": { "BearingSeqNum": "1", "DistanceSeqNum": "2" } },
            { "type": "Feature", "id": "c", "geometry": null,
              "properties": { "BearingSeqNum": 7, "DistanceSeqNum": 7 } },
            { "type": "Feature", "id": "d", "geometry": null,
              "properties": { "BearingSeqNum": 2 } }
        ]
    }))
    .unwrap()
}

fn rate_of(cells: &CellCollection, id: &str) -> Option<Decimal> {
    cells
        .iter()
        .find(|c| c.feature_id.as_str() == id)
        .and_then(|c| c.rate_percent)
}

// =============================================================================
// Legend colours
// =============================================================================

mod legend {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_upper_bounds() {
        let legend = two_band_legend();
        assert_eq!(legend.entries()[0].color, "A");
        assert_eq!(color_for_rate(Some(Decimal::from(25)), &legend), "A");
        assert_eq!(color_for_rate(Some(Decimal::from(26)), &legend), "B");
        assert_eq!(color_for_rate(Some(Decimal::from(50)), &legend), "B");
    }

    #[test]
    fn rates_above_every_threshold_take_the_last_colour() {
        assert_eq!(color_for_rate(Some(Decimal::from(999)), &two_band_legend()), "B");
    }

    #[test]
    fn missing_rate_or_legend_is_no_data() {
        assert_eq!(color_for_rate(None, &two_band_legend()), NO_DATA_COLOR);
        assert_eq!(
            color_for_rate(Some(Decimal::from(10)), &Legend::default()),
            NO_DATA_COLOR
        );
    }

    #[test]
    fn argb_conversion() {
        assert_eq!(convert_color("#FF00FF00"), "#00FF00");
        assert_eq!(convert_color("#00000000"), "rgba(0,0,0,0)");
        assert_eq!(convert_color("red"), "red");
        assert_eq!(convert_color("#ZZ000000"), "#ZZ000000");
        assert_eq!(convert_color("#123456"), "#123456");
    }

    #[test]
    fn document_legend_is_sorted_and_converted() {
        let doc = RateDocument::parse(PIVOT_XML).unwrap();
        let entries = doc.legend().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].threshold, Decimal::from(50));
        assert_eq!(entries[0].color, "#FF0000");
        assert_eq!(entries[1].color, "#0000FF");
    }
}

// =============================================================================
// Rate edits
// =============================================================================

mod edits {
    use super::*;

    #[test]
    fn nested_elements_are_found() {
        let doc = RateDocument::parse(PIVOT_XML).unwrap();
        assert_eq!(doc.node_count(), 3);
        assert_eq!(doc.rate(&RateKey::new("2", "1")), Some(Decimal::from(40)));
        assert!(!doc.is_modified());
    }

    #[test]
    fn partial_update_applies_found_keys() {
        let mut doc = RateDocument::parse(PIVOT_XML).unwrap();
        let result = doc.update_rates(
            &[RateKey::new("1", "2"), RateKey::new("5", "5"), RateKey::new("5", "5")],
            Decimal::from(65),
        );
        assert_eq!(
            result,
            Err(PrescriptionError::RateKeyNotFound {
                missing: vec![RateKey::new("5", "5")],
                updated: 1,
            })
        );
        assert!(doc.is_modified());
        assert_eq!(doc.rate(&RateKey::new("1", "2")), Some(Decimal::from(65)));
    }

    #[test]
    fn negative_rate_changes_nothing() {
        let mut doc = RateDocument::parse(PIVOT_XML).unwrap();
        assert!(matches!(
            doc.update_rates(&[RateKey::new("1", "1")], Decimal::from(-5)),
            Err(PrescriptionError::InvalidRate(_))
        ));
        assert!(!doc.is_modified());
        assert_eq!(doc.serialize(), PIVOT_XML);
    }

    #[test]
    fn trailing_zeros_are_dropped_when_spliced() {
        let mut doc = RateDocument::parse(PIVOT_XML).unwrap();
        doc.update_rates(&[RateKey::new("1", "1")], Decimal::new(7500, 2))
            .unwrap();
        assert!(doc.serialize().contains("WateringRatePercent=\"75\""));
    }

    #[test]
    fn bad_base64_is_an_encoding_error() {
        assert!(matches!(
            RateDocument::from_base64("%%%"),
            Err(PrescriptionError::Encoding(_))
        ));
    }
}

// =============================================================================
// Merge into cells
// =============================================================================

mod merge {
    use super::*;

    #[test]
    fn cells_pick_up_rates_by_key() {
        let doc = RateDocument::parse(PIVOT_XML).unwrap();
        let mut cells = cells();
        assert_eq!(merge_rates(&mut cells, &doc), 2);
        assert_eq!(rate_of(&cells, "a"), Some(Decimal::from(100)));
        assert_eq!(rate_of(&cells, "b"), Some(Decimal::from(80)));
        assert_eq!(rate_of(&cells, "c"), None);
        assert_eq!(rate_of(&cells, "d"), None);
    }

    #[test]
    fn update_keeps_cells_and_document_in_step() {
        let mut doc = RateDocument::parse(PIVOT_XML).unwrap();
        let mut cells = cells();
        merge_rates(&mut cells, &doc);

        let result = update_rate(
            &mut cells,
            &mut doc,
            &[RateKey::new("1", "1"), RateKey::new("7", "7")],
            Decimal::from(20),
        );
        assert!(matches!(result, Err(PrescriptionError::RateKeyNotFound { updated: 1, .. })));
        assert_eq!(rate_of(&cells, "a"), Some(Decimal::from(20)));
        assert_eq!(rate_of(&cells, "c"), None);
        assert_eq!(doc.rate(&RateKey::new("1", "1")), Some(Decimal::from(20)));
    }
}

// =============================================================================
// Property tests
// =============================================================================

mod properties {
    use super::*;

    fn document(rates: &[u16]) -> String {
        let rows: String = rates
            .iter()
            .enumerate()
            .map(|(i, rate)| {
                format!(
                    "  <MapZoneRate BearingSeqNum=\"{}\" DistanceSeqNum=\"1\" WateringRatePercent=\"{}\" />\n",
                    i + 1,
                    rate
                )
            })
            .collect();
        format!(
            "<VSSILinearData xmlns=\"http://tempuri.org/VSSILinearData.xsd\">\n{}</VSSILinearData>",
            rows
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Serializing after one edit changes that rate and nothing else
        #[test]
        fn prop_single_edit_survives_reparse(
            rates in prop::collection::vec(0u16..200, 1..20),
            pick in any::<prop::sample::Index>(),
            new_rate in 0u32..100_000,
            scale in 0u32..3,
        ) {
            let xml = document(&rates);
            let untouched = RateDocument::parse(xml.clone()).unwrap();
            prop_assert_eq!(untouched.serialize(), xml.clone());

            let target = pick.index(rates.len());
            let key = RateKey::new((target + 1).to_string(), "1");
            let rate = Decimal::new(i64::from(new_rate), scale);

            let mut doc = untouched;
            prop_assert_eq!(doc.update_rates(&[key.clone()], rate), Ok(1));
            let reparsed = RateDocument::parse(doc.serialize()).unwrap();

            prop_assert_eq!(reparsed.rate(&key), Some(rate));
            for (i, original) in rates.iter().enumerate() {
                if i != target {
                    let other = RateKey::new((i + 1).to_string(), "1");
                    prop_assert_eq!(reparsed.rate(&other), Some(Decimal::from(*original)));
                }
            }
        }
    }
}
