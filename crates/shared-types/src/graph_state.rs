//! Snapshot published to the presentation layer

use serde::{Deserialize, Serialize};

use crate::{AmountRange, TimeWindow};

/// A point in percentage space. Usually inside the unit square; values
/// outside the active viewport project outside it and are left for the
/// renderer to clip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn in_unit_square(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

/// One consistent view of a counter's graph.
///
/// `domain_bounds`/`range_bounds` describe the filtered data, while
/// `current_domain`/`current_range` are the viewport the points were
/// normalized against. Replaced wholesale on every change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphState {
    pub graph_points: Vec<NormalizedPoint>,
    pub domain_bounds: TimeWindow,
    pub current_domain: TimeWindow,
    pub range_bounds: AmountRange,
    pub current_range: AmountRange,
}

impl GraphState {
    pub fn is_empty(&self) -> bool {
        self.graph_points.is_empty()
    }

    /// Points that fall inside the viewport, for renderers that do not clip.
    pub fn visible_points(&self) -> impl Iterator<Item = &NormalizedPoint> {
        self.graph_points.iter().filter(|p| p.in_unit_square())
    }
}
