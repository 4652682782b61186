//! Sprinkler zone chains for pivots (radii) and linear moves (widths)
//!
//! Zones are numbered from 1. Each zone's outer bound feeds the next zone's
//! inner bound and the last zone ends at the shape's outer measurement, the
//! envelope. Bounds are kept exactly as entered so that a manual edit which
//! breaks the chain is reported by [`SprinklerZoneChain::validate`] instead
//! of being silently repaired.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BoundSide, ZoneChainError};

/// Bounds closer than this are treated as equal
const BOUND_TOLERANCE: f64 = 1e-9;

/// What a chain's bounds measure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// Concentric rings of a centre pivot; bounds are radii
    Radial,
    /// Bands across a linear move; bounds are widths
    Banded,
}

/// One sub-range of the chain; a `None` bound has not been entered yet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SprinklerZone {
    pub index: usize,
    pub inner_bound: Option<f64>,
    pub outer_bound: Option<f64>,
}

/// A validated zone with both bounds resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResolvedZone {
    pub index: usize,
    pub inner: f64,
    pub outer: f64,
}

/// Pivot upstream form of a zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PivotSprinklerZone {
    pub initial_radius: f64,
    pub final_radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SprinklerZoneChain {
    kind: ChainKind,
    envelope: f64,
    zones: Vec<SprinklerZone>,
}

impl SprinklerZoneChain {
    /// A single zone spanning the whole envelope, inner bound blank
    pub fn new(kind: ChainKind, envelope: f64) -> Self {
        Self {
            kind,
            envelope,
            zones: vec![SprinklerZone {
                index: 1,
                inner_bound: None,
                outer_bound: Some(envelope),
            }],
        }
    }

    /// Build a chain from explicit `(inner, outer)` pairs
    ///
    /// The last outer bound is replaced by the envelope.
    pub fn from_bounds(
        kind: ChainKind,
        envelope: f64,
        bounds: &[(Option<f64>, Option<f64>)],
    ) -> Result<Self, ZoneChainError> {
        if bounds.is_empty() {
            return Err(ZoneChainError::InvalidZoneCount);
        }
        let mut zones: Vec<SprinklerZone> = bounds
            .iter()
            .enumerate()
            .map(|(i, &(inner_bound, outer_bound))| SprinklerZone {
                index: i + 1,
                inner_bound,
                outer_bound,
            })
            .collect();
        if let Some(last) = zones.last_mut() {
            last.outer_bound = Some(envelope);
        }
        Ok(Self {
            kind,
            envelope,
            zones,
        })
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn envelope(&self) -> f64 {
        self.envelope
    }

    pub fn zones(&self) -> &[SprinklerZone] {
        &self.zones
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Resize the chain, keeping bounds where indices overlap
    ///
    /// New zones take their inner bound from the previous zone's outer bound
    /// and the last zone's outer bound is reset to the envelope.
    pub fn set_zone_count(&mut self, count: usize) -> Result<(), ZoneChainError> {
        if count == 0 {
            return Err(ZoneChainError::InvalidZoneCount);
        }
        self.zones.truncate(count);
        while self.zones.len() < count {
            let inner_bound = self.zones.last().and_then(|z| z.outer_bound);
            self.zones.push(SprinklerZone {
                index: self.zones.len() + 1,
                inner_bound,
                outer_bound: None,
            });
        }
        self.lock_envelope();
        Ok(())
    }

    /// Store one bound as entered, without touching neighbouring zones
    pub fn set_zone_bound(
        &mut self,
        index: usize,
        side: BoundSide,
        bound: Option<f64>,
    ) -> Result<(), ZoneChainError> {
        let position = self.position(index)?;
        match side {
            BoundSide::Inner => self.zones[position].inner_bound = bound,
            BoundSide::Outer => {
                if position + 1 == self.zones.len() {
                    return Err(ZoneChainError::EnvelopeLocked);
                }
                self.zones[position].outer_bound = bound;
            }
        }
        Ok(())
    }

    /// Set a zone's outer bound and carry it into the next zone's inner bound
    pub fn set_outer_bound_chained(
        &mut self,
        index: usize,
        bound: Option<f64>,
    ) -> Result<(), ZoneChainError> {
        self.set_zone_bound(index, BoundSide::Outer, bound)?;
        // index is 1-based, so it is also the position of the next zone
        if let Some(next) = self.zones.get_mut(index) {
            next.inner_bound = bound;
        }
        Ok(())
    }

    /// Follow a change to the shape's radius or width
    pub fn set_envelope(&mut self, envelope: f64) {
        self.envelope = envelope;
        self.lock_envelope();
    }

    fn lock_envelope(&mut self) {
        let envelope = self.envelope;
        if let Some(last) = self.zones.last_mut() {
            last.outer_bound = Some(envelope);
        }
    }

    fn position(&self, index: usize) -> Result<usize, ZoneChainError> {
        if index == 0 || index > self.zones.len() {
            return Err(ZoneChainError::ZoneIndexOutOfRange {
                index,
                count: self.zones.len(),
            });
        }
        Ok(index - 1)
    }

    /// Check the chain and return every zone with its bounds resolved
    ///
    /// A blank inner bound on the first zone reads as 0. Zones are checked
    /// one at a time for blank, non-positive, inverted and oversized bounds
    /// before continuity across zones is checked.
    pub fn validate(&self) -> Result<Vec<ResolvedZone>, ZoneChainError> {
        if self.zones.is_empty() {
            return Err(ZoneChainError::InvalidZoneCount);
        }

        let mut resolved = Vec::with_capacity(self.zones.len());
        for (position, zone) in self.zones.iter().enumerate() {
            let index = position + 1;
            let inner = match zone.inner_bound {
                Some(v) => v,
                None if position == 0 => 0.0,
                None => {
                    return Err(ZoneChainError::MissingBound {
                        index,
                        side: BoundSide::Inner,
                    })
                }
            };
            let outer = zone.outer_bound.ok_or(ZoneChainError::MissingBound {
                index,
                side: BoundSide::Outer,
            })?;

            let inner_ok = if position == 0 {
                inner.is_finite() && inner >= 0.0
            } else {
                inner.is_finite() && inner > 0.0
            };
            if !inner_ok {
                return Err(ZoneChainError::NonPositiveBound {
                    index,
                    side: BoundSide::Inner,
                });
            }
            if !(outer.is_finite() && outer > 0.0) {
                return Err(ZoneChainError::NonPositiveBound {
                    index,
                    side: BoundSide::Outer,
                });
            }
            if inner > outer + BOUND_TOLERANCE {
                return Err(ZoneChainError::InvertedBound {
                    index,
                    inner,
                    outer,
                });
            }
            for bound in [inner, outer] {
                if bound > self.envelope + BOUND_TOLERANCE {
                    return Err(ZoneChainError::BoundExceedsEnvelope {
                        index,
                        bound,
                        envelope: self.envelope,
                    });
                }
            }
            resolved.push(ResolvedZone {
                index,
                inner,
                outer,
            });
        }

        for pair in resolved.windows(2) {
            let (previous, zone) = (pair[0], pair[1]);
            if (zone.inner - previous.outer).abs() > BOUND_TOLERANCE {
                return Err(ZoneChainError::Discontinuous {
                    index: zone.index,
                    inner: zone.inner,
                    previous_outer: previous.outer,
                });
            }
        }

        Ok(resolved)
    }

    /// Zones in the center pivot request form
    pub fn pivot_zones(&self) -> Result<Vec<PivotSprinklerZone>, ZoneChainError> {
        Ok(self
            .validate()?
            .into_iter()
            .map(|z| PivotSprinklerZone {
                initial_radius: z.inner,
                final_radius: z.outer,
            })
            .collect())
    }

    /// Zones in the linear move request form: `{"1": [inner, outer], ...}`
    pub fn banded_zones(&self) -> Result<BTreeMap<String, [f64; 2]>, ZoneChainError> {
        Ok(self
            .validate()?
            .into_iter()
            .map(|z| (z.index.to_string(), [z.inner, z.outer]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_zone_pivot() -> SprinklerZoneChain {
        let mut chain = SprinklerZoneChain::new(ChainKind::Radial, 100.0);
        chain.set_zone_count(3).unwrap();
        chain.set_outer_bound_chained(1, Some(40.0)).unwrap();
        chain.set_outer_bound_chained(2, Some(70.0)).unwrap();
        chain
    }

    #[test]
    fn test_chained_entry_validates() {
        let zones = three_zone_pivot().validate().unwrap();
        let bounds: Vec<_> = zones.iter().map(|z| (z.inner, z.outer)).collect();
        assert_eq!(bounds, vec![(0.0, 40.0), (40.0, 70.0), (70.0, 100.0)]);
    }

    #[test]
    fn test_manual_edit_is_discontinuous() {
        let mut chain = three_zone_pivot();
        chain
            .set_zone_bound(2, BoundSide::Outer, Some(60.0))
            .unwrap();
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
    fn test_last_outer_bound_is_locked() {
        let mut chain = three_zone_pivot();
        assert_eq!(
            chain.set_zone_bound(3, BoundSide::Outer, Some(90.0)),
            Err(ZoneChainError::EnvelopeLocked)
        );
        chain.set_envelope(120.0);
        assert_eq!(chain.zones()[2].outer_bound, Some(120.0));
    }

    #[test]
    fn test_zone_count_preserves_overlap() {
        let mut chain = three_zone_pivot();
        chain.set_zone_count(2).unwrap();
        assert_eq!(chain.zones()[0].outer_bound, Some(40.0));
        assert_eq!(chain.zones()[1].inner_bound, Some(40.0));
        assert_eq!(chain.zones()[1].outer_bound, Some(100.0));
        assert_eq!(chain.set_zone_count(0), Err(ZoneChainError::InvalidZoneCount));
    }

    #[test]
    fn test_new_zone_inherits_previous_outer() {
        let mut chain = SprinklerZoneChain::new(ChainKind::Banded, 50.0);
        chain.set_zone_count(2).unwrap();
        chain.set_outer_bound_chained(1, Some(20.0)).unwrap();
        chain.set_zone_count(3).unwrap();
        // zone 2 still ends at the old envelope, zone 3 starts there
        assert_eq!(chain.zones()[2].inner_bound, Some(50.0));
    }

    #[test]
    fn test_validation_errors() {
        let blank = SprinklerZoneChain::from_bounds(
            ChainKind::Radial,
            100.0,
            &[(None, Some(50.0)), (None, None)],
        )
        .unwrap();
        assert_eq!(
            blank.validate(),
            Err(ZoneChainError::MissingBound {
                index: 2,
                side: BoundSide::Inner,
            })
        );

        let negative = SprinklerZoneChain::from_bounds(
            ChainKind::Radial,
            100.0,
            &[(Some(0.0), Some(-5.0)), (Some(-5.0), None)],
        )
        .unwrap();
        assert_eq!(
            negative.validate(),
            Err(ZoneChainError::NonPositiveBound {
                index: 1,
                side: BoundSide::Outer,
            })
        );

        let inverted = SprinklerZoneChain::from_bounds(
            ChainKind::Radial,
            100.0,
            &[(Some(60.0), Some(30.0)), (Some(30.0), None)],
        )
        .unwrap();
        assert!(matches!(
            inverted.validate(),
            Err(ZoneChainError::InvertedBound { index: 1, .. })
        ));

        let oversized = SprinklerZoneChain::from_bounds(
            ChainKind::Radial,
            100.0,
            &[(Some(0.0), Some(150.0)), (Some(150.0), None)],
        )
        .unwrap();
        assert!(matches!(
            oversized.validate(),
            Err(ZoneChainError::BoundExceedsEnvelope { index: 1, .. })
        ));
    }

    #[test]
    fn test_request_forms() {
        let chain = three_zone_pivot();
        let pivot = chain.pivot_zones().unwrap();
        assert_eq!(pivot[1].initial_radius, 40.0);
        assert_eq!(pivot[1].final_radius, 70.0);
        let banded = chain.banded_zones().unwrap();
        assert_eq!(banded["1"], [0.0, 40.0]);
        assert_eq!(banded["3"], [70.0, 100.0]);
    }
}
