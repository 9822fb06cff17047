//! Significant-change filter.
//!
//! A new fix is worth acting upon when its latitude OR its longitude moved by strictly more
//! than `threshold` degrees from the last accepted one.  The last accepted coordinate starts
//! at (0, 0) and is only updated on acceptance.
//!
//! NOTE: the threshold is in degrees, not distance, so 0.01° of longitude gets shorter and
//! shorter the closer we get to the poles.
//!

use tracing::trace;

use wikiloc_common::Coordinate;

/// Default threshold, in degrees
pub const THRESHOLD: f64 = 0.01;

#[derive(Clone, Debug)]
pub struct SignificanceFilter {
    threshold: f64,
    last: Coordinate,
}

impl SignificanceFilter {
    pub fn new(threshold: f64) -> Self {
        SignificanceFilter {
            threshold,
            last: Coordinate::default(),
        }
    }

    /// Last accepted coordinate
    ///
    #[inline]
    pub fn last(&self) -> Coordinate {
        self.last
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns `true` and remember `at` if the move is significant, does nothing otherwise.
    ///
    pub fn accept(&mut self, at: Coordinate) -> bool {
        let (dlat, dlon) = at.delta(&self.last);
        trace!("dlat={dlat} dlon={dlon}");

        if dlat > self.threshold || dlon > self.threshold {
            self.last = at;
            true
        } else {
            false
        }
    }
}

impl Default for SignificanceFilter {
    fn default() -> Self {
        Self::new(THRESHOLD)
    }
}
