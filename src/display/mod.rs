//! Widget display derivation
//!
//! Pure functions turning fetched status plus static widget configuration
//! into the values the rendering layer consumes. No side effects, no
//! network access; safe to call on every render.

mod axis;
mod emphasis;
mod format;
mod grid;

pub use axis::{resolve_axis_range, AxisRange, DEFAULT_AXIS_RANGE};
pub use emphasis::{
    is_alarm_key, is_truthy, qualifies, resolve_emphasis, Emphasis, ALARM_EMPHASIS_CLASS,
};
pub use format::{format_value, VALUE_PLACEHOLDER};
pub use grid::GridClass;

use crate::core::FetchSnapshot;
use rt_board_types::{EntityId, EntityOption, WidgetConfig, WidgetRecord};

/// Effective display values for one widget render.
///
/// Recomputed on every input change, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedDisplay {
    pub emphasis: Emphasis,
    /// Present only for widgets with a numeric axis (gauge, chart)
    pub axis_range: Option<AxisRange>,
    /// Primary entity's value, placeholder when absent
    pub formatted_value: String,
    pub grid: GridClass,
}

/// Resolve the key and attribute metadata for a binding: the captured
/// `rawData` wins, the snapshot detail is the fallback.
fn binding_detail(
    record: &WidgetRecord,
    index: usize,
    detail_of: &impl Fn(&EntityId) -> Option<EntityOption>,
) -> Option<EntityOption> {
    let binding = record.config.entities().get(index)?;
    binding
        .raw_data
        .clone()
        .or_else(|| detail_of(&binding.value))
}

/// Derive the full display for one widget from its record, the adapter's
/// latest fetch snapshot, and a snapshot-detail lookup
/// (typically `|id| registry.latest_entity_detail(id)`).
pub fn resolve_display(
    record: &WidgetRecord,
    fetch: &FetchSnapshot,
    detail_of: impl Fn(&EntityId) -> Option<EntityOption>,
) -> DerivedDisplay {
    let bindings = record.config.entities();

    // Alarm emphasis over (key, value) pairs in configured order; a missing
    // status slot reads as null, which is non-alarm
    let mut pairs: Vec<(String, serde_json::Value)> = Vec::with_capacity(bindings.len());
    for (index, binding) in bindings.iter().enumerate() {
        let Some(detail) = binding_detail(record, index, &detail_of) else {
            continue;
        };
        let value = fetch
            .status(&binding.value)
            .map(|status| status.value.clone())
            .unwrap_or(serde_json::Value::Null);
        pairs.push((detail.key, value));
    }
    let emphasis = resolve_emphasis(pairs.iter().map(|(key, value)| (key.as_str(), value)));

    let primary = bindings.first();
    let primary_detail = binding_detail(record, 0, &detail_of);
    let primary_attribute = primary_detail
        .as_ref()
        .and_then(|detail| detail.value_attribute.as_ref());

    let axis_range = match record.config {
        WidgetConfig::Gauge(_) | WidgetConfig::Chart(_) => {
            let points: Vec<f64> = primary
                .and_then(|binding| fetch.series_for(&binding.value))
                .map(|series| series.iter().map(|point| point.value).collect())
                .unwrap_or_default();
            Some(resolve_axis_range(&points, primary_attribute))
        }
        _ => None,
    };

    let formatted_value = format_value(
        primary.and_then(|binding| fetch.status(&binding.value)),
        primary_attribute,
    );

    DerivedDisplay {
        emphasis,
        axis_range,
        formatted_value,
        grid: GridClass::classify(&record.geometry),
    }
}
