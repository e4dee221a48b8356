//! Numeric axis range rule
//!
//! Chart and gauge widgets derive their axis bounds from the entity's
//! declared value-attribute metadata and the observed history points. With
//! no data at all the range falls back to a hardcoded default.

use rt_board_types::ValueAttribute;

/// Fallback range when neither data nor metadata constrain the axis
pub const DEFAULT_AXIS_RANGE: (f64, f64) = (0.0, 100.0);

/// Number of tick intervals along the axis
const TICK_DIVISIONS: f64 = 5.0;

/// Derived axis bounds plus tick spacing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    /// Tick spacing, (max - min) / 5
    pub interval: f64,
}

impl AxisRange {
    fn from_bounds(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            interval: (max - min) / TICK_DIVISIONS,
        }
    }
}

/// Resolve the axis range for a set of observed data points and optional
/// declared metadata.
///
/// - No data points: the declared min/max when both are present, else the
///   default range.
/// - With data points: the bounding range of declared and observed bounds,
///   expanding outward only — the range never shrinks below declared bounds.
pub fn resolve_axis_range(points: &[f64], attribute: Option<&ValueAttribute>) -> AxisRange {
    let declared_min = attribute.and_then(|a| a.min);
    let declared_max = attribute.and_then(|a| a.max);

    if points.is_empty() {
        return match (declared_min, declared_max) {
            (Some(min), Some(max)) => AxisRange::from_bounds(min, max),
            _ => AxisRange::from_bounds(DEFAULT_AXIS_RANGE.0, DEFAULT_AXIS_RANGE.1),
        };
    }

    let observed_min = points.iter().copied().fold(f64::INFINITY, f64::min);
    let observed_max = points.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let min = match declared_min {
        Some(declared) => declared.min(observed_min),
        None => observed_min,
    };
    let max = match declared_max {
        Some(declared) => declared.max(observed_max),
        None => observed_max,
    };

    AxisRange::from_bounds(min, max)
}
