//! Grid-size classification
//!
//! Widgets pick a layout variant from their size in grid units. Named
//! presets get dedicated variants; anything else falls back to generic
//! styling.

use rt_board_types::{GridPreset, WidgetGeometry};

/// Per-preset layout flags for template selection.
///
/// At most one flag is set; an unnamed size sets none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridClass {
    pub one_by_one: bool,
    pub one_by_two: bool,
    pub two_by_one: bool,
    pub two_by_two: bool,
    pub three_by_three: bool,
}

impl GridClass {
    pub fn classify(geometry: &WidgetGeometry) -> Self {
        let mut class = Self::default();
        match GridPreset::classify(geometry.width, geometry.height) {
            Some(GridPreset::OneByOne) => class.one_by_one = true,
            Some(GridPreset::OneByTwo) => class.one_by_two = true,
            Some(GridPreset::TwoByOne) => class.two_by_one = true,
            Some(GridPreset::TwoByTwo) => class.two_by_two = true,
            Some(GridPreset::ThreeByThree) => class.three_by_three = true,
            None => {}
        }
        class
    }

    pub fn preset(&self) -> Option<GridPreset> {
        if self.one_by_one {
            Some(GridPreset::OneByOne)
        } else if self.one_by_two {
            Some(GridPreset::OneByTwo)
        } else if self.two_by_one {
            Some(GridPreset::TwoByOne)
        } else if self.two_by_two {
            Some(GridPreset::TwoByTwo)
        } else if self.three_by_three {
            Some(GridPreset::ThreeByThree)
        } else {
            None
        }
    }

    /// False means generic styling applies
    pub fn is_named(&self) -> bool {
        self.preset().is_some()
    }
}
