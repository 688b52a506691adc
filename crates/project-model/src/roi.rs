//! Region-of-interest boxes.
//!
//! Detectors emit ROI boxes on a `0..1000` integer-ish scale. Everything
//! downstream of ingestion works on the normalized `[0.0, 1.0]` form, where
//! `(0.0, 0.0)` is the top-left and `(1.0, 1.0)` the bottom-right of the
//! source image.

use serde::{Deserialize, Serialize};

/// Scale used by ROI boxes in the persisted timeline.
pub const WIRE_ROI_SCALE: f64 = 1000.0;

/// ROI box as it appears in `crop_data.roi` (0..1000 scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireRoi {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// A normalized region of interest.
///
/// Invariant: `0 <= xmin < xmax <= 1` and `0 <= ymin < ymax <= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiBox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

/// Rejected ROI coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed ROI box ({xmin}, {ymin}) - ({xmax}, {ymax})")]
pub struct RoiError {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl RoiBox {
    /// The whole frame.
    pub const FULL: RoiBox = RoiBox {
        xmin: 0.0,
        ymin: 0.0,
        xmax: 1.0,
        ymax: 1.0,
    };

    /// Create a normalized box, rejecting anything outside the invariant.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self, RoiError> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        let ordered = xmin < xmax && ymin < ymax;
        if ordered && [xmin, ymin, xmax, ymax].into_iter().all(in_unit) {
            Ok(Self {
                xmin,
                ymin,
                xmax,
                ymax,
            })
        } else {
            Err(RoiError {
                xmin,
                ymin,
                xmax,
                ymax,
            })
        }
    }

    /// Normalize a wire-scale box.
    pub fn from_wire(roi: &WireRoi) -> Result<Self, RoiError> {
        Self::new(
            roi.xmin / WIRE_ROI_SCALE,
            roi.ymin / WIRE_ROI_SCALE,
            roi.xmax / WIRE_ROI_SCALE,
            roi.ymax / WIRE_ROI_SCALE,
        )
    }

    /// Back to the wire scale.
    pub fn to_wire(&self) -> WireRoi {
        WireRoi {
            xmin: self.xmin * WIRE_ROI_SCALE,
            ymin: self.ymin * WIRE_ROI_SCALE,
            xmax: self.xmax * WIRE_ROI_SCALE,
            ymax: self.ymax * WIRE_ROI_SCALE,
        }
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// The center point of this box.
    pub fn center(&self) -> (f64, f64) {
        ((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Area of the box (0.0 to 1.0).
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Check if a normalized point is within this box.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.xmin && px <= self.xmax && py >= self.ymin && py <= self.ymax
    }
}

impl Default for RoiBox {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_roi_is_normalized() {
        let wire = WireRoi {
            xmin: 100.0,
            ymin: 50.0,
            xmax: 900.0,
            ymax: 950.0,
        };
        let roi = RoiBox::from_wire(&wire).unwrap();
        assert!((roi.xmin() - 0.1).abs() < 1e-9);
        assert!((roi.ymax() - 0.95).abs() < 1e-9);
        let (cx, cy) = roi.center();
        assert!((cx - 0.5).abs() < 1e-9);
        assert!((cy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_box_rejected() {
        assert!(RoiBox::new(0.6, 0.1, 0.4, 0.9).is_err());
        assert!(RoiBox::new(0.1, 0.5, 0.4, 0.5).is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(RoiBox::new(-0.1, 0.0, 0.5, 0.5).is_err());
        assert!(RoiBox::new(0.0, 0.0, 1.2, 0.5).is_err());
        assert!(RoiBox::new(0.0, f64::NAN, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_wire_roundtrip_preserves_scale() {
        let roi = RoiBox::new(0.25, 0.25, 0.75, 0.5).unwrap();
        let wire = roi.to_wire();
        assert!((wire.xmax - 750.0).abs() < 1e-9);
        assert_eq!(RoiBox::from_wire(&wire).unwrap(), roi);
    }

    #[test]
    fn test_full_box() {
        let roi = RoiBox::FULL;
        assert_eq!(roi.area(), 1.0);
        assert!(roi.contains(0.0, 0.0));
        assert!(roi.contains(1.0, 1.0));
        assert_eq!(roi.center(), (0.5, 0.5));
    }
}
