//! Fusion of the two forward range sensors

/// Which range sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSide {
    Left,
    Right,
}

/// Sensors used by a range-assisted move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSource {
    /// Both sensors, averaged, with cross-track correction
    Pair,
    /// One sensor only
    Single(RangeSide),
}

/// One reading of both range sensors
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangePair {
    pub left: Option<f64>,
    pub right: Option<f64>,
}

impl RangePair {
    pub fn new(left: Option<f64>, right: Option<f64>) -> Self {
        RangePair { left, right }
    }

    /// Reading of one side
    pub fn side(&self, side: RangeSide) -> Option<f64> {
        match side {
            RangeSide::Left => self.left,
            RangeSide::Right => self.right,
        }
    }

    /// Combined distance: the mean of both valid readings, else the valid one
    pub fn combined(&self) -> Option<f64> {
        match (self.left, self.right) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            (Some(d), None) | (None, Some(d)) => Some(d),
            (None, None) => None,
        }
    }

    /// Distance seen through `source`
    pub fn distance(&self, source: RangeSource) -> Option<f64> {
        match source {
            RangeSource::Pair => self.combined(),
            RangeSource::Single(side) => self.side(side),
        }
    }

    /// `left - right` while both readings are valid and within `max_diff`
    ///
    /// Positive means the left sensor is further from the surface.
    pub fn cross_track(&self, max_diff: f64) -> Option<f64> {
        match (self.left, self.right) {
            (Some(l), Some(r)) if (l - r).abs() < max_diff => Some(l - r),
            _ => None,
        }
    }
}

/// Stopping rule of a range-assisted move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeStop {
    pub target_mm: f64,
    /// Retreating: stop once the distance rises above the target
    pub reverse: bool,
}

impl RangeStop {
    /// Whether `distance` is past the target
    pub fn reached(&self, distance: f64) -> bool {
        if self.reverse {
            distance > self.target_mm
        } else {
            distance < self.target_mm
        }
    }

    /// Stop decision for an optional distance; unknown never stops
    pub fn reached_opt(&self, distance: Option<f64>) -> bool {
        distance.is_some_and(|d| self.reached(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn combined_averages_or_falls_back() {
        assert_eq!(RangePair::new(Some(400.0), Some(600.0)).combined(), Some(500.0));
        assert_eq!(RangePair::new(None, Some(600.0)).combined(), Some(600.0));
        assert_eq!(RangePair::new(Some(400.0), None).combined(), Some(400.0));
        assert_eq!(RangePair::new(None, None).combined(), None);
    }

    #[test]
    fn cross_track_needs_close_valid_pair() {
        let stop = 200.0;
        assert_eq!(RangePair::new(Some(510.0), Some(490.0)).cross_track(stop), Some(20.0));
        assert_eq!(RangePair::new(Some(900.0), Some(490.0)).cross_track(stop), None);
        assert_eq!(RangePair::new(Some(510.0), None).cross_track(stop), None);
    }

    #[test]
    fn direction_aware_stop() {
        let approach = RangeStop { target_mm: 300.0, reverse: false };
        assert!(approach.reached(299.0));
        assert!(!approach.reached(300.0));

        let retreat = RangeStop { target_mm: 300.0, reverse: true };
        assert!(retreat.reached(301.0));
        assert!(!retreat.reached(299.0));
        assert!(!retreat.reached_opt(None));
    }

    proptest! {
        #[test]
        fn pair_with_one_valid_sensor_matches_single(
            a in 0.0f64..2000.0,
            target in 0.0f64..2000.0,
            reverse in any::<bool>(),
            left_valid in any::<bool>(),
        ) {
            let (pair, side) = if left_valid {
                (RangePair::new(Some(a), None), RangeSide::Left)
            } else {
                (RangePair::new(None, Some(a)), RangeSide::Right)
            };
            let stop = RangeStop { target_mm: target, reverse };

            prop_assert_eq!(
                stop.reached_opt(pair.distance(RangeSource::Pair)),
                stop.reached_opt(pair.distance(RangeSource::Single(side)))
            );
            prop_assert_eq!(pair.cross_track(200.0), None);
        }
    }
}
