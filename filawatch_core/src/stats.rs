//! Motion statistics store.
//!
//! Three record groups, owned by the monitor and mutated only while handling
//! a poll tick or an encoder event. Readers get copies or formatted views.

use filawatch_traits::StatusValue;

/// Last anchor set by an encoder pulse (or the initial arm).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncoderEventRecord {
    pub extruder_position: f64,
    /// Signed distance since the previous anchor; may be <= 0 when the
    /// position source is non-monotonic.
    pub distance_between_events: f64,
    pub recorded: bool,
}

/// Details of the most recent runout episode's first tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunoutEventRecord {
    pub extruder_position: f64,
    pub max_permitted_extruder_position: f64,
    pub recorded: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverallStats {
    /// Largest distance_between_events ever observed; never decreases.
    pub max_distance: f64,
    /// Per-episode debounce flag: true once the current runout episode has
    /// been logged, cleared the next time presence is observed. Distinct
    /// from the cumulative `recorded` flags above.
    pub last_runout_logged: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionStats {
    pub last_encoder_event: EncoderEventRecord,
    pub last_runout_event: RunoutEventRecord,
    pub overall: OverallStats,
}

impl MotionStats {
    /// Back to the empty lifecycle start state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One report line per populated record group field, in operator-facing
    /// form. Empty when nothing has ever been recorded.
    pub fn report_lines(&self) -> Vec<String> {
        let mut msgs = Vec::new();
        if self.last_encoder_event.recorded {
            msgs.push(format!(
                "LAST_ENCODER_EVENT_DISTANCE: {:.2}",
                self.last_encoder_event.distance_between_events
            ));
            msgs.push(format!("MAX_DISTANCE: {:.2}", self.overall.max_distance));
        }
        if self.last_runout_event.recorded {
            msgs.push(format!(
                "LAST_RUNOUT_ACTUAL_POSITION: {:.2}",
                self.last_runout_event.extruder_position
            ));
            msgs.push(format!(
                "LAST_RUNOUT_MAX_PERMITTED_POSITION: {:.2}",
                self.last_runout_event.max_permitted_extruder_position
            ));
        }
        msgs
    }

    /// Full operator report, or the explicit no-data marker.
    pub fn report(&self) -> String {
        let lines = self.report_lines();
        if lines.is_empty() {
            "No Data".to_string()
        } else {
            lines.join("\n")
        }
    }

    /// Every field flattened under a `<group>_<field>` key, for merging into
    /// a status snapshot alongside the presence layer's own entries.
    pub fn snapshot(&self) -> Vec<(String, StatusValue)> {
        vec![
            (
                "last_encoder_event_extruder_position".into(),
                StatusValue::Float(self.last_encoder_event.extruder_position),
            ),
            (
                "last_encoder_event_distance_between_events".into(),
                StatusValue::Float(self.last_encoder_event.distance_between_events),
            ),
            (
                "last_encoder_event_recorded".into(),
                StatusValue::Bool(self.last_encoder_event.recorded),
            ),
            (
                "last_runout_event_extruder_position".into(),
                StatusValue::Float(self.last_runout_event.extruder_position),
            ),
            (
                "last_runout_event_max_permitted_extruder_position".into(),
                StatusValue::Float(self.last_runout_event.max_permitted_extruder_position),
            ),
            (
                "last_runout_event_recorded".into(),
                StatusValue::Bool(self.last_runout_event.recorded),
            ),
            (
                "overall_max_distance".into(),
                StatusValue::Float(self.overall.max_distance),
            ),
            (
                "overall_last_runout_logged".into(),
                StatusValue::Bool(self.overall.last_runout_logged),
            ),
        ]
    }
}
