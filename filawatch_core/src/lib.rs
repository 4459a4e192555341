#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core filament-motion monitoring logic (hardware-agnostic).
//!
//! This crate fuses two signals into a debounced "filament present" boolean:
//! asynchronous pulses from a motion-encoder switch, and a time-indexed
//! estimate of extruder position. All I/O goes through the
//! `filawatch_traits::PositionSource` and `filawatch_traits::PresenceSink`
//! seams.
//!
//! ## Architecture
//!
//! - **Statistics**: last-encoder-event / last-runout-event / overall record
//!   groups (`stats` module)
//! - **Prediction**: runout threshold = anchor position + detection length,
//!   re-anchored on every encoder pulse (`MotionMonitor`)
//! - **Debounce**: one statistics record per runout episode, continuous
//!   presence notifications every tick (`MotionMonitor`)
//! - **Scheduling**: parked/resumed poll deadline, next fire returned by each
//!   tick (`timer` module)
//! - **Serialization**: one event loop owns all mutation (`reactor` module)

pub mod command;
pub mod error;
pub mod mocks;
pub mod reactor;
pub mod stats;
pub mod timer;

use crate::error::{BuildError, ConfigError, Result};
use crate::stats::{EncoderEventRecord, MotionStats, RunoutEventRecord};
use filawatch_traits::clock::{Clock, MonotonicClock};
use filawatch_traits::{PositionSource, PresenceSink, StatusValue};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll cadence for runout evaluation while printing.
pub const CHECK_RUNOUT_INTERVAL: Duration = Duration::from_millis(250);

/// Default runout detection length in millimeters of commanded extrusion.
pub const DEFAULT_DETECTION_LENGTH: f64 = 7.0;

/// The detection/prediction state machine.
///
/// Owns the statistics store and the current runout threshold exclusively;
/// collaborators only read them through the query methods. All methods are
/// meant to be called from a single logical timeline (see `reactor`).
pub struct MotionMonitor<P: PositionSource, N: PresenceSink> {
    position: P,
    sink: N,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    poll_interval: Duration,
    detection_length: f64,
    /// Extruder position at which runout is declared; None until armed.
    runout_position: Option<f64>,
    /// Raw switch level from the most recent edge, kept even before arming.
    last_pin_state: Option<bool>,
    armed: bool,
    stats: MotionStats,
}

impl<P: PositionSource, N: PresenceSink> core::fmt::Debug for MotionMonitor<P, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotionMonitor")
            .field("armed", &self.armed)
            .field("detection_length", &self.detection_length)
            .field("runout_position", &self.runout_position)
            .finish()
    }
}

impl<P: PositionSource, N: PresenceSink> MotionMonitor<P, N> {
    /// Resolve the extruder and set the initial anchor. Must succeed before
    /// polling starts; a position read failure here is fatal (the monitor
    /// never activates partially). Arming twice is a no-op.
    pub fn arm(&mut self) -> Result<()> {
        if self.armed {
            return Ok(());
        }
        let at = self.clock.now();
        let pos = self
            .position
            .position_at(at)
            .map_err(|e| eyre::eyre!("resolving extruder position: {e}"))?;
        self.apply_anchor(pos);
        self.armed = true;
        tracing::info!(
            position_mm = pos,
            detection_length_mm = self.detection_length,
            "motion monitor armed"
        );
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Handle one raw switch edge at time `at`.
    ///
    /// Motion was observed, so filament is assumed present no matter which
    /// way the pin went. Before arming, only the raw level is kept.
    pub fn note_encoder_event(&mut self, at: Instant, level: bool) {
        self.last_pin_state = Some(level);
        if !self.armed {
            tracing::trace!(level, "encoder edge before arm; recorded only");
            return;
        }
        match self.position.position_at(at) {
            Ok(pos) => self.apply_anchor(pos),
            Err(e) => {
                tracing::warn!(error = %e, "position read failed on encoder edge; anchor kept");
            }
        }
        self.sink.note_filament_present(at, true);
    }

    /// Evaluate presence at time `now` and return the next poll deadline.
    ///
    /// Presence uses a strict comparison: a position equal to the threshold
    /// already counts as runout. The debounce flag limits statistics to one
    /// record per episode while the sink still hears about every tick.
    pub fn on_poll_tick(&mut self, now: Instant) -> Instant {
        let next = now + self.poll_interval;
        let Some(runout_at) = self.runout_position else {
            return next;
        };
        let pos = match self.position.position_at(now) {
            Ok(pos) => pos,
            Err(e) => {
                tracing::warn!(error = %e, "position read failed on poll tick; tick skipped");
                return next;
            }
        };
        let present = pos < runout_at;
        if present {
            self.stats.overall.last_runout_logged = false;
        } else if !self.stats.overall.last_runout_logged {
            self.stats.overall.last_runout_logged = true;
            self.stats.last_runout_event = RunoutEventRecord {
                extruder_position: pos,
                max_permitted_extruder_position: runout_at,
                recorded: true,
            };
            tracing::warn!(
                position_mm = pos,
                max_permitted_mm = runout_at,
                "filament runout detected"
            );
        }
        self.sink.note_filament_present(now, present);
        next
    }

    /// Move the anchor to `position` and recompute the runout threshold.
    /// The first anchor ever reports zero distance rather than a jump from
    /// the zero origin.
    fn apply_anchor(&mut self, position: f64) {
        let prev = if self.stats.last_encoder_event.recorded {
            self.stats.last_encoder_event.extruder_position
        } else {
            position
        };
        let distance = position - prev;
        self.stats.last_encoder_event = EncoderEventRecord {
            extruder_position: position,
            distance_between_events: distance,
            recorded: true,
        };
        self.stats.overall.max_distance = self.stats.overall.max_distance.max(distance);
        let runout_at = position + self.detection_length;
        self.runout_position = Some(runout_at);
        tracing::debug!(
            position_mm = position,
            distance_mm = distance,
            runout_at_mm = runout_at,
            "anchor updated"
        );
    }

    /// Override the detection length, effective from the next anchor update.
    /// Non-positive or non-finite values are configuration errors.
    pub fn set_detection_length(
        &mut self,
        length: f64,
    ) -> std::result::Result<(), ConfigError> {
        if !length.is_finite() || length <= 0.0 {
            return Err(ConfigError::DetectionLength(length));
        }
        self.detection_length = length;
        tracing::info!(detection_length_mm = length, "detection length overridden");
        Ok(())
    }

    pub fn detection_length(&self) -> f64 {
        self.detection_length
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Current runout threshold, if armed.
    pub fn runout_position(&self) -> Option<f64> {
        self.runout_position
    }

    pub fn last_pin_state(&self) -> Option<bool> {
        self.last_pin_state
    }

    pub fn stats(&self) -> &MotionStats {
        &self.stats
    }

    /// Clear recorded history. The detection length and the live
    /// anchor/threshold are deliberately untouched: a reset clears history,
    /// not live tracking.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
        tracing::info!("motion statistics reset");
    }

    /// Operator report lines, or the no-data marker.
    pub fn report(&self) -> String {
        self.stats.report()
    }

    /// Merged status snapshot: the sink's own entries followed by every
    /// statistics field under a `<group>_<field>` key.
    pub fn status(&self) -> Vec<(String, StatusValue)> {
        let mut out = self.sink.status();
        out.extend(self.stats.snapshot());
        out
    }
}

/// Boxed, dynamically-dispatched monitor produced by [`MonitorBuilder`].
/// Send so a host can run the reactor on a dedicated thread.
pub type Monitor = MotionMonitor<Box<dyn PositionSource + Send>, Box<dyn PresenceSink + Send>>;

impl Monitor {
    /// Start building a monitor.
    pub fn builder() -> MonitorBuilder<Missing, Missing> {
        MonitorBuilder::default()
    }
}

/// Build a statically-dispatched monitor from concrete collaborators.
pub fn build_monitor<P, N>(
    position: P,
    sink: N,
    detection_length: f64,
    poll_interval: Duration,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<MotionMonitor<P, N>>
where
    P: PositionSource + 'static,
    N: PresenceSink + 'static,
{
    if !detection_length.is_finite() || detection_length <= 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "detection_length must be > 0",
        )));
    }
    if poll_interval.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "poll_interval must be > 0",
        )));
    }
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    Ok(MotionMonitor {
        position,
        sink,
        clock,
        poll_interval,
        detection_length,
        runout_position: None,
        last_pin_state: None,
        armed: false,
        stats: MotionStats::default(),
    })
}

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

/// Builder for [`Monitor`]. Position source and presence sink are mandatory
/// and tracked in the type; everything else is validated on `build()`.
pub struct MonitorBuilder<P, N> {
    position: Option<Box<dyn PositionSource + Send>>,
    sink: Option<Box<dyn PresenceSink + Send>>,
    detection_length: Option<f64>,
    poll_interval: Option<Duration>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _p: PhantomData<P>,
    _n: PhantomData<N>,
}

impl Default for MonitorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            position: None,
            sink: None,
            detection_length: None,
            poll_interval: None,
            clock: None,
            _p: PhantomData,
            _n: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state
impl<P, N> MonitorBuilder<P, N> {
    pub fn with_detection_length(mut self, mm: f64) -> Self {
        self.detection_length = Some(mm);
        self
    }

    /// Override the poll cadence; defaults to [`CHECK_RUNOUT_INTERVAL`].
    pub fn with_poll_interval(mut self, period: Duration) -> Self {
        self.poll_interval = Some(period);
        self
    }

    /// Provide a custom clock; defaults to MonotonicClock when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Fallible build available in any type-state; returns a detailed
    /// BuildError for missing pieces.
    pub fn try_build(self) -> Result<Monitor> {
        let MonitorBuilder {
            position,
            sink,
            detection_length,
            poll_interval,
            clock,
            _p: _,
            _n: _,
        } = self;
        let position =
            position.ok_or_else(|| eyre::Report::new(BuildError::MissingPositionSource))?;
        let sink = sink.ok_or_else(|| eyre::Report::new(BuildError::MissingPresenceSink))?;
        build_monitor(
            position,
            sink,
            detection_length.unwrap_or(DEFAULT_DETECTION_LENGTH),
            poll_interval.unwrap_or(CHECK_RUNOUT_INTERVAL),
            clock,
        )
    }
}

// Setters that advance type-state when providing mandatory components
impl<N> MonitorBuilder<Missing, N> {
    pub fn with_position_source(
        self,
        source: impl PositionSource + Send + 'static,
    ) -> MonitorBuilder<Set, N> {
        let MonitorBuilder {
            position: _,
            sink,
            detection_length,
            poll_interval,
            clock,
            _p: _,
            _n: _,
        } = self;
        MonitorBuilder {
            position: Some(Box::new(source)),
            sink,
            detection_length,
            poll_interval,
            clock,
            _p: PhantomData,
            _n: PhantomData,
        }
    }
}

impl<P> MonitorBuilder<P, Missing> {
    pub fn with_presence_sink(
        self,
        sink: impl PresenceSink + Send + 'static,
    ) -> MonitorBuilder<P, Set> {
        let MonitorBuilder {
            position,
            sink: _,
            detection_length,
            poll_interval,
            clock,
            _p: _,
            _n: _,
        } = self;
        MonitorBuilder {
            position,
            sink: Some(Box::new(sink)),
            detection_length,
            poll_interval,
            clock,
            _p: PhantomData,
            _n: PhantomData,
        }
    }
}

impl MonitorBuilder<Set, Set> {
    /// Validate and build the monitor. Only available once both mandatory
    /// collaborators are set.
    pub fn build(self) -> Result<Monitor> {
        self.try_build()
    }
}
