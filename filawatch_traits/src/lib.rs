pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::fmt;
use std::time::Instant;

/// Cumulative commanded filament position, in millimeters, as a function of
/// time. Values are monotonic non-decreasing in normal operation but callers
/// must tolerate the occasional rewind (e.g. a position clock reset).
pub trait PositionSource {
    fn position_at(
        &mut self,
        at: Instant,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Downstream consumer of filament-presence observations, e.g. the logic that
/// pauses a print on runout. Notified on every poll tick and every encoder
/// pulse with the time of observation.
pub trait PresenceSink {
    fn note_filament_present(&mut self, at: Instant, present: bool);

    /// Key/value pairs this sink contributes to a merged status snapshot.
    fn status(&self) -> Vec<(String, StatusValue)> {
        Vec::new()
    }
}

/// Value type for status snapshot entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusValue {
    Bool(bool),
    Float(f64),
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusValue::Bool(b) => write!(f, "{b}"),
            StatusValue::Float(v) => write!(f, "{v:.2}"),
        }
    }
}

impl<T: PositionSource + ?Sized> PositionSource for Box<T> {
    fn position_at(
        &mut self,
        at: Instant,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        (**self).position_at(at)
    }
}

impl<T: PresenceSink + ?Sized> PresenceSink for Box<T> {
    fn note_filament_present(&mut self, at: Instant, present: bool) {
        (**self).note_filament_present(at, present);
    }

    fn status(&self) -> Vec<(String, StatusValue)> {
        (**self).status()
    }
}
