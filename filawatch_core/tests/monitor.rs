use filawatch_core::error::ConfigError;
use filawatch_core::mocks::{RecordingSink, SharedPositionSource};
use filawatch_core::{DEFAULT_DETECTION_LENGTH, Monitor};
use filawatch_traits::{PresenceSink, StatusValue};
use rstest::rstest;
use std::time::Instant;

fn armed_monitor(start_pos: f64, detection_length: f64) -> (Monitor, SharedPositionSource, RecordingSink) {
    let position = SharedPositionSource::new(start_pos);
    let sink = RecordingSink::new();
    let mut monitor = Monitor::builder()
        .with_position_source(position.clone())
        .with_presence_sink(sink.clone())
        .with_detection_length(detection_length)
        .build()
        .expect("build monitor");
    monitor.arm().expect("arm monitor");
    (monitor, position, sink)
}

#[rstest]
fn first_anchor_reports_zero_distance_at_any_position() {
    let (monitor, _pos, _sink) = armed_monitor(42.0, 7.0);
    let rec = monitor.stats().last_encoder_event;
    assert!(rec.recorded);
    assert_eq!(rec.extruder_position, 42.0);
    assert_eq!(rec.distance_between_events, 0.0);
    assert_eq!(monitor.stats().overall.max_distance, 0.0);
    assert_eq!(monitor.runout_position(), Some(49.0));
}

#[rstest]
fn pulses_track_distances_and_running_max() {
    let (mut monitor, position, _sink) = armed_monitor(10.0, 7.0);
    let t = Instant::now();

    position.set(12.0);
    monitor.note_encoder_event(t, true);
    assert_eq!(monitor.stats().last_encoder_event.distance_between_events, 2.0);
    assert_eq!(monitor.stats().overall.max_distance, 2.0);
    assert_eq!(monitor.runout_position(), Some(19.0));

    // Non-monotonic source: negative distance is a valid statistic and the
    // running max is unaffected.
    position.set(11.0);
    monitor.note_encoder_event(t, false);
    assert_eq!(monitor.stats().last_encoder_event.distance_between_events, -1.0);
    assert_eq!(monitor.stats().overall.max_distance, 2.0);
    assert_eq!(monitor.runout_position(), Some(18.0));

    position.set(20.0);
    monitor.note_encoder_event(t, true);
    assert_eq!(monitor.stats().last_encoder_event.distance_between_events, 9.0);
    assert_eq!(monitor.stats().overall.max_distance, 9.0);
}

#[rstest]
fn detection_length_override_applies_from_next_anchor() {
    let (mut monitor, position, _sink) = armed_monitor(10.0, 7.0);
    assert_eq!(monitor.runout_position(), Some(17.0));

    monitor.set_detection_length(3.0).expect("positive override");
    // Already-computed threshold is untouched until the next anchor.
    assert_eq!(monitor.runout_position(), Some(17.0));
    assert_eq!(monitor.detection_length(), 3.0);

    position.set(20.0);
    monitor.note_encoder_event(Instant::now(), true);
    assert_eq!(monitor.runout_position(), Some(23.0));
}

#[rstest]
#[case(0.0)]
#[case(-4.2)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn non_positive_override_is_a_config_error(#[case] bad: f64) {
    let (mut monitor, _pos, _sink) = armed_monitor(10.0, 7.0);
    let err = monitor
        .set_detection_length(bad)
        .expect_err("override must be rejected");
    assert!(matches!(err, ConfigError::DetectionLength(_)));
    assert_eq!(monitor.detection_length(), 7.0);
}

#[rstest]
fn reset_clears_history_but_not_live_tracking() {
    let (mut monitor, position, _sink) = armed_monitor(10.0, 7.0);
    position.set(14.0);
    monitor.note_encoder_event(Instant::now(), true);
    position.set(30.0);
    monitor.on_poll_tick(Instant::now());
    assert!(monitor.stats().last_runout_event.recorded);

    let threshold_before = monitor.runout_position();
    monitor.reset_stats();

    assert!(!monitor.stats().last_encoder_event.recorded);
    assert!(!monitor.stats().last_runout_event.recorded);
    assert_eq!(monitor.stats().overall.max_distance, 0.0);
    assert!(!monitor.stats().overall.last_runout_logged);
    assert_eq!(monitor.report(), "No Data");
    // Live tracking survives the reset.
    assert_eq!(monitor.detection_length(), 7.0);
    assert_eq!(monitor.runout_position(), threshold_before);
}

#[rstest]
fn pre_arm_pulse_is_a_noop_except_pin_state() {
    let position = SharedPositionSource::new(5.0);
    let sink = RecordingSink::new();
    let mut monitor = Monitor::builder()
        .with_position_source(position)
        .with_presence_sink(sink.clone())
        .build()
        .expect("build monitor");

    monitor.note_encoder_event(Instant::now(), true);

    assert!(!monitor.is_armed());
    assert_eq!(monitor.last_pin_state(), Some(true));
    assert!(sink.notes().is_empty());
    assert!(!monitor.stats().last_encoder_event.recorded);
    assert_eq!(monitor.runout_position(), None);
}

#[rstest]
fn builder_defaults_detection_length() {
    let (monitor, _pos, _sink) = armed_monitor(0.0, DEFAULT_DETECTION_LENGTH);
    assert_eq!(monitor.detection_length(), 7.0);

    let err = Monitor::builder()
        .with_position_source(SharedPositionSource::new(0.0))
        .with_presence_sink(RecordingSink::new())
        .with_detection_length(-1.0)
        .build()
        .expect_err("negative detection length must not build");
    assert!(format!("{err}").contains("detection_length"));
}

/// Sink contributing its own snapshot entries, to check merge order.
#[derive(Clone, Default)]
struct LabelledSink;

impl PresenceSink for LabelledSink {
    fn note_filament_present(&mut self, _at: Instant, _present: bool) {}

    fn status(&self) -> Vec<(String, StatusValue)> {
        vec![("filament_detected".to_string(), StatusValue::Bool(true))]
    }
}

#[rstest]
fn status_snapshot_merges_sink_entries_before_stats() {
    let mut monitor = Monitor::builder()
        .with_position_source(SharedPositionSource::new(1.0))
        .with_presence_sink(LabelledSink)
        .build()
        .expect("build monitor");
    monitor.arm().expect("arm");

    let snapshot = monitor.status();
    assert_eq!(snapshot[0].0, "filament_detected");
    assert_eq!(snapshot.len(), 1 + 8);
    assert!(snapshot.iter().any(|(k, _)| k == "overall_max_distance"));
}
