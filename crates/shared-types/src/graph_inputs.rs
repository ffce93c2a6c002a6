// Inputs that select what a graph shows: which counter, which time axis,
// and an optional viewport on each axis.

use serde::{Deserialize, Serialize};

use crate::{AmountRange, SortKey, Tick, TallyError, TallyResult, TimeWindow, NOID};

/// Everything the graph aggregator recombines on each change.
/// An unset override means "fit to data".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphInputs {
    pub counter_id: i64,
    pub sort_key: SortKey,
    pub domain_override: Option<TimeWindow>,
    pub range_override: Option<AmountRange>,
}

/// Input validation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Detailed change detection result
#[derive(Debug, Clone, PartialEq)]
pub struct GraphInputChange {
    pub has_changes: bool,
    pub counter_changed: bool,
    pub sort_changed: bool,
    pub domain_changed: bool,
    pub range_changed: bool,
    /// Counter or sort key moved, so the tick subscription must be replaced.
    pub requires_resubscribe: bool,
    pub change_summary: Vec<String>,
}

impl GraphInputs {
    pub fn for_counter(counter_id: i64, sort_key: SortKey) -> Self {
        Self {
            counter_id,
            sort_key,
            domain_override: None,
            range_override: None,
        }
    }

    pub fn with_domain(mut self, domain: TimeWindow) -> Self {
        self.domain_override = Some(domain);
        self
    }

    pub fn with_range(mut self, range: AmountRange) -> Self {
        self.range_override = Some(range);
        self
    }

    /// Whether a tick survives the viewport filter.
    ///
    /// Only the domain override drops ticks. The range override rescales
    /// the amount axis, and amounts outside it project outside `[0, 1]`.
    pub fn admits(&self, tick: &Tick) -> bool {
        self.domain_override
            .map_or(true, |domain| domain.contains(self.sort_key.time_of(tick)))
    }

    /// Validate the inputs before handing them to the aggregator
    pub fn validate(&self) -> InputValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if let Some(range) = self.range_override {
            if !range.is_finite() {
                errors.push(format!(
                    "Range override must be finite: [{}, {}]",
                    range.low(),
                    range.high()
                ));
            }
        }

        if self.counter_id == NOID {
            warnings.push("No counter selected; graph will stay empty".to_string());
        }

        if let Some(domain) = self.domain_override {
            if domain.is_degenerate() {
                warnings.push(format!(
                    "Domain override is a single instant ({}); it will be padded",
                    domain.start()
                ));
            }
        }

        InputValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// `validate` folded into a `Result`, warnings dropped.
    pub fn check(&self) -> TallyResult<()> {
        let result = self.validate();
        if result.is_valid {
            Ok(())
        } else {
            Err(TallyError::InvalidInputs {
                errors: result.errors,
            })
        }
    }

    /// Compare against the previously applied inputs
    pub fn detect_changes_from(&self, previous: &GraphInputs) -> GraphInputChange {
        let mut change_summary = Vec::new();

        let counter_changed = self.counter_id != previous.counter_id;
        if counter_changed {
            change_summary.push(format!(
                "Counter changed: {} → {}",
                previous.counter_id, self.counter_id
            ));
        }

        let sort_changed = self.sort_key != previous.sort_key;
        if sort_changed {
            change_summary.push(format!(
                "Sort key changed: {} → {}",
                previous.sort_key, self.sort_key
            ));
        }

        let domain_changed = self.domain_override != previous.domain_override;
        if domain_changed {
            change_summary.push(format!(
                "Domain override changed: {:?} → {:?}",
                previous.domain_override, self.domain_override
            ));
        }

        let range_changed = self.range_override != previous.range_override;
        if range_changed {
            change_summary.push(format!(
                "Range override changed: {:?} → {:?}",
                previous.range_override, self.range_override
            ));
        }

        GraphInputChange {
            has_changes: counter_changed || sort_changed || domain_changed || range_changed,
            counter_changed,
            sort_changed,
            domain_changed,
            range_changed,
            requires_resubscribe: counter_changed || sort_changed,
            change_summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn tick(amount: f64, secs: i64) -> Tick {
        Tick::new(1, amount, Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn window(a: i64, b: i64) -> TimeWindow {
        TimeWindow::new(
            Utc.timestamp_opt(a, 0).unwrap(),
            Utc.timestamp_opt(b, 0).unwrap(),
        )
    }

    #[test]
    fn test_admits_without_overrides() {
        let inputs = GraphInputs::for_counter(1, SortKey::TimeForData);
        assert!(inputs.admits(&tick(-1e9, 0)));
        assert!(inputs.admits(&tick(1e9, 1_000_000)));
    }

    #[test]
    fn test_admits_filters_on_domain_only() {
        let inputs = GraphInputs::for_counter(1, SortKey::TimeForData)
            .with_domain(window(100, 200))
            .with_range(AmountRange::new(0.0, 10.0));

        assert!(inputs.admits(&tick(5.0, 150)));
        assert!(inputs.admits(&tick(10.0, 200)));
        assert!(inputs.admits(&tick(11.0, 150)));
        assert!(!inputs.admits(&tick(5.0, 99)));
        assert!(!inputs.admits(&tick(5.0, 201)));
    }

    #[test]
    fn test_validate_rejects_non_finite_range() {
        let inputs =
            GraphInputs::for_counter(1, SortKey::TimeCreated).with_range(AmountRange::new(0.0, f64::INFINITY));
        let result = inputs.validate();
        assert!(!result.is_valid);
        assert!(matches!(inputs.check(), Err(TallyError::InvalidInputs { .. })));
    }

    #[test]
    fn test_validate_warns_on_noid() {
        let result = GraphInputs::default().validate();
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_sort_change_requires_resubscribe() {
        let before = GraphInputs::for_counter(3, SortKey::TimeForData);
        let after = GraphInputs::for_counter(3, SortKey::TimeModified);

        let change = after.detect_changes_from(&before);
        assert!(change.has_changes);
        assert!(change.sort_changed);
        assert!(change.requires_resubscribe);
        assert!(!change.counter_changed);
    }

    #[test]
    fn test_viewport_change_keeps_subscription() {
        let before = GraphInputs::for_counter(3, SortKey::TimeForData);
        let after = before.clone().with_range(AmountRange::new(1.0, 2.0));

        let change = after.detect_changes_from(&before);
        assert!(change.has_changes);
        assert!(change.range_changed);
        assert!(!change.requires_resubscribe);
        assert_eq!(change.change_summary.len(), 1);

        assert!(!before.detect_changes_from(&before).has_changes);
    }
}
