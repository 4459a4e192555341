//! Simulated extruder and encoder for bench runs and integration tests.
//!
//! The encoder spawns exactly one thread that is shut down when the handle is
//! dropped, preventing thread leaks. Edges are delivered through a caller
//! supplied callback so this crate stays independent of any event plumbing.

use filawatch_traits::PositionSource;
use filawatch_traits::clock::Clock;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How often the encoder thread samples the extruder position.
const ENCODER_SCAN_INTERVAL: Duration = Duration::from_millis(5);

struct FeedState {
    position_mm: f64,
    feed_rate_mm_per_s: f64,
    printing: bool,
    updated_at: Instant,
}

/// Shared handle to a simulated extruder whose commanded position advances at
/// a fixed feed rate while "printing". Clones share the same state, so one
/// clone can serve as the monitor's position source while another drives the
/// encoder thread.
#[derive(Clone)]
pub struct SimulatedExtruder {
    state: Arc<Mutex<FeedState>>,
}

impl SimulatedExtruder {
    pub fn new(feed_rate_mm_per_s: f64, now: Instant) -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState {
                position_mm: 0.0,
                feed_rate_mm_per_s,
                printing: false,
                updated_at: now,
            })),
        }
    }

    /// Start or stop the simulated extrusion, integrating up to `now` first.
    pub fn set_printing(&self, printing: bool, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Self::advance(&mut state, now);
        state.printing = printing;
    }

    /// Commanded position at `now`, in mm.
    pub fn position(&self, now: Instant) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Self::advance(&mut state, now);
        state.position_mm
    }

    fn advance(state: &mut FeedState, now: Instant) {
        let dt = now.saturating_duration_since(state.updated_at);
        if state.printing {
            state.position_mm += state.feed_rate_mm_per_s * dt.as_secs_f64();
        }
        if now > state.updated_at {
            state.updated_at = now;
        }
    }
}

impl PositionSource for SimulatedExtruder {
    fn position_at(&mut self, at: Instant) -> Result<f64, Box<dyn Error + Send + Sync>> {
        Ok(self.position(at))
    }
}

/// Background thread emitting one switch flank per `pulse_length_mm` of
/// extruder advance. With `jam_after_mm` set, flanks past that position are
/// swallowed, simulating a jam or an empty spool.
pub struct SimulatedEncoder {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl SimulatedEncoder {
    pub fn spawn<C, F>(
        extruder: SimulatedExtruder,
        pulse_length_mm: f64,
        jam_after_mm: Option<f64>,
        clock: C,
        mut on_edge: F,
    ) -> Self
    where
        C: Clock + Send + Sync + 'static,
        F: FnMut(Instant, bool) + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_worker = shutdown.clone();
        let pulse_length = pulse_length_mm.max(f64::MIN_POSITIVE);

        let join_handle = std::thread::spawn(move || {
            let mut next_flank_at_mm = pulse_length;
            let mut level = false;
            loop {
                if shutdown_worker.load(Ordering::Relaxed) {
                    break;
                }
                let now = clock.now();
                let pos = extruder.position(now);
                while pos >= next_flank_at_mm {
                    let jammed = jam_after_mm.is_some_and(|jam| next_flank_at_mm > jam);
                    if !jammed {
                        level = !level;
                        tracing::trace!(position_mm = next_flank_at_mm, level, "encoder flank");
                        on_edge(now, level);
                    }
                    next_flank_at_mm += pulse_length;
                }
                clock.sleep(ENCODER_SCAN_INTERVAL);
            }
            tracing::trace!("simulated encoder thread exiting cleanly");
        });

        Self {
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl Drop for SimulatedEncoder {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("simulated encoder thread panicked during shutdown");
        }
    }
}
