//! Test and helper doubles for filawatch_core.

use filawatch_traits::{PositionSource, PresenceSink};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Position source pinned to a single fixed value.
pub struct StaticPositionSource(pub f64);

impl PositionSource for StaticPositionSource {
    fn position_at(
        &mut self,
        _at: Instant,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.0)
    }
}

/// Position source whose value can be moved from outside while the monitor
/// owns a clone; clones share the same cell.
#[derive(Clone, Default)]
pub struct SharedPositionSource {
    value: Arc<Mutex<f64>>,
}

impl SharedPositionSource {
    pub fn new(value: f64) -> Self {
        Self {
            value: Arc::new(Mutex::new(value)),
        }
    }

    pub fn set(&self, value: f64) {
        let mut cell = self.value.lock().unwrap_or_else(|p| p.into_inner());
        *cell = value;
    }
}

impl PositionSource for SharedPositionSource {
    fn position_at(
        &mut self,
        _at: Instant,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let cell = self.value.lock().unwrap_or_else(|p| p.into_inner());
        Ok(*cell)
    }
}

/// Presence sink that records every notification; clones share the log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    notes: Arc<Mutex<Vec<(Instant, bool)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<(Instant, bool)> {
        self.notes
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn presence_values(&self) -> Vec<bool> {
        self.notes().into_iter().map(|(_, p)| p).collect()
    }

    pub fn last_presence(&self) -> Option<bool> {
        self.presence_values().last().copied()
    }
}

impl PresenceSink for RecordingSink {
    fn note_filament_present(&mut self, at: Instant, present: bool) {
        if let Ok(mut notes) = self.notes.lock() {
            notes.push((at, present));
        }
    }
}

/// Sink that ignores every notification.
pub struct DiscardSink;

impl PresenceSink for DiscardSink {
    fn note_filament_present(&mut self, _at: Instant, _present: bool) {}
}
