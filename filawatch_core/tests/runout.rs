//! Presence/runout semantics: strict threshold, per-episode debounce, and
//! the pulse path's unconditional presence notification.

use filawatch_core::Monitor;
use filawatch_core::mocks::{RecordingSink, SharedPositionSource};
use rstest::rstest;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
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
fn one_runout_event_per_unbroken_absent_stretch() {
    // Anchor at 93 with detection length 7 -> threshold 100. Three ticks past
    // the threshold log exactly one event, at the first tick's position.
    let (mut monitor, position, sink) = armed_monitor(93.0, 7.0);
    let t = Instant::now();

    for pos in [105.0, 110.0, 115.0] {
        position.set(pos);
        monitor.on_poll_tick(t);
    }

    let event = monitor.stats().last_runout_event;
    assert!(event.recorded);
    assert_eq!(event.extruder_position, 105.0);
    assert_eq!(event.max_permitted_extruder_position, 100.0);
    assert!(monitor.stats().overall.last_runout_logged);
    // The sink still hears about every tick.
    assert_eq!(sink.presence_values(), vec![false, false, false]);
}

#[rstest]
fn episode_flag_clears_on_presence_and_rearms_logging() {
    let (mut monitor, position, sink) = armed_monitor(93.0, 7.0);
    let t = Instant::now();

    position.set(105.0);
    monitor.on_poll_tick(t);
    assert!(monitor.stats().overall.last_runout_logged);

    // Position source rewinds below the threshold: presence observed, episode
    // over.
    position.set(99.0);
    monitor.on_poll_tick(t);
    assert!(!monitor.stats().overall.last_runout_logged);
    // Cumulative record survives the episode end.
    assert!(monitor.stats().last_runout_event.recorded);
    assert_eq!(monitor.stats().last_runout_event.extruder_position, 105.0);

    // A fresh absent stretch logs a fresh event.
    position.set(106.0);
    monitor.on_poll_tick(t);
    assert_eq!(monitor.stats().last_runout_event.extruder_position, 106.0);
    assert_eq!(sink.presence_values(), vec![false, true, false]);
}

#[rstest]
fn position_equal_to_threshold_counts_as_runout() {
    let (mut monitor, position, sink) = armed_monitor(93.0, 7.0);

    position.set(100.0);
    monitor.on_poll_tick(Instant::now());

    assert!(monitor.stats().last_runout_event.recorded);
    assert_eq!(sink.presence_values(), vec![false]);
}

#[rstest]
fn position_just_below_threshold_is_present() {
    let (mut monitor, position, sink) = armed_monitor(93.0, 7.0);

    position.set(99.999);
    monitor.on_poll_tick(Instant::now());

    assert!(!monitor.stats().last_runout_event.recorded);
    assert_eq!(sink.presence_values(), vec![true]);
}

#[rstest]
fn pulse_notifies_present_even_mid_runout() {
    let (mut monitor, position, sink) = armed_monitor(93.0, 7.0);
    let t = Instant::now();

    position.set(105.0);
    monitor.on_poll_tick(t);
    assert_eq!(sink.last_presence(), Some(false));

    // Pulse arrives: presence is unconditional and the threshold re-anchors
    // ahead of the current position.
    monitor.note_encoder_event(t, false);
    assert_eq!(sink.last_presence(), Some(true));
    assert_eq!(monitor.runout_position(), Some(112.0));

    // The debounce flag is untouched by the pulse path; the next poll tick
    // observes presence and clears it.
    assert!(monitor.stats().overall.last_runout_logged);
    monitor.on_poll_tick(t);
    assert!(!monitor.stats().overall.last_runout_logged);
    assert_eq!(sink.last_presence(), Some(true));
}

/// Position source that can be switched into a failing mode.
#[derive(Clone)]
struct FlakySource {
    inner: SharedPositionSource,
    failing: Arc<AtomicBool>,
}

impl filawatch_traits::PositionSource for FlakySource {
    fn position_at(&mut self, at: Instant) -> Result<f64, Box<dyn Error + Send + Sync>> {
        if self.failing.load(Ordering::Relaxed) {
            return Err("position clock offline".into());
        }
        self.inner.position_at(at)
    }
}

#[rstest]
fn failed_position_read_is_absorbed_not_raised() {
    let failing = Arc::new(AtomicBool::new(false));
    let source = FlakySource {
        inner: SharedPositionSource::new(10.0),
        failing: failing.clone(),
    };
    let sink = RecordingSink::new();
    let mut monitor = Monitor::builder()
        .with_position_source(source)
        .with_presence_sink(sink.clone())
        .with_detection_length(7.0)
        .build()
        .expect("build monitor");
    monitor.arm().expect("arm");

    failing.store(true, Ordering::Relaxed);
    let t = Instant::now();
    let next = monitor.on_poll_tick(t);

    // Tick skipped: no notification, no statistics change, but the schedule
    // keeps going.
    assert!(sink.notes().is_empty());
    assert_eq!(monitor.stats().last_encoder_event.extruder_position, 10.0);
    assert_eq!(next, t + monitor.poll_interval());

    // A pulse during the outage still reports presence; the anchor is kept.
    monitor.note_encoder_event(t, true);
    assert_eq!(sink.presence_values(), vec![true]);
    assert_eq!(monitor.runout_position(), Some(17.0));
}

#[rstest]
fn arm_failure_is_fatal() {
    let source = FlakySource {
        inner: SharedPositionSource::new(0.0),
        failing: Arc::new(AtomicBool::new(true)),
    };
    let mut monitor = Monitor::builder()
        .with_position_source(source)
        .with_presence_sink(RecordingSink::new())
        .build()
        .expect("build monitor");
    let err = monitor.arm().expect_err("arm must fail");
    assert!(format!("{err}").contains("resolving extruder position"));
    assert!(!monitor.is_armed());
}
