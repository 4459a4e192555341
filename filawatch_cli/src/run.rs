//! Rig assembly and the interactive run loop.
//!
//! The reactor runs on the calling thread; the simulated encoder, the stdin
//! console, the Ctrl-C handler and the optional duration timer only enqueue
//! events.

use crate::console;
use crossbeam_channel::unbounded;
use eyre::{Result, WrapErr};
use filawatch_config::Config;
use filawatch_core::Monitor;
use filawatch_core::reactor::{Event, Reactor};
use filawatch_hardware::sim::{SimulatedEncoder, SimulatedExtruder};
use filawatch_traits::clock::{Clock, MonotonicClock};
use filawatch_traits::{PresenceSink, StatusValue};
use std::time::{Duration, Instant};

/// Downstream pause-on-runout stand-in: logs presence transitions and exposes
/// the current detected state in status snapshots. A real machine port would
/// pause the print here instead.
struct RunoutResponder {
    sensor: String,
    filament_detected: bool,
    runouts_seen: u64,
}

impl RunoutResponder {
    fn new(sensor: String) -> Self {
        Self {
            sensor,
            filament_detected: true,
            runouts_seen: 0,
        }
    }
}

impl PresenceSink for RunoutResponder {
    fn note_filament_present(&mut self, _at: Instant, present: bool) {
        if present == self.filament_detected {
            return;
        }
        self.filament_detected = present;
        if present {
            tracing::info!(sensor = %self.sensor, "filament motion restored");
        } else {
            self.runouts_seen += 1;
            tracing::warn!(
                sensor = %self.sensor,
                runouts = self.runouts_seen,
                "filament runout reported; a printer would pause here"
            );
        }
    }

    fn status(&self) -> Vec<(String, StatusValue)> {
        vec![
            (
                "filament_detected".to_string(),
                StatusValue::Bool(self.filament_detected),
            ),
            (
                "runouts_seen".to_string(),
                StatusValue::Float(self.runouts_seen as f64),
            ),
        ]
    }
}

pub fn run(cfg: &Config, duration_s: Option<u64>, json: bool) -> Result<()> {
    let clock = MonotonicClock::new();
    let (tx, rx) = unbounded::<Event>();

    let extruder = SimulatedExtruder::new(cfg.sim.feed_rate_mm_per_s, clock.now());
    let edge_tx = tx.clone();
    let _encoder = SimulatedEncoder::spawn(
        extruder.clone(),
        cfg.sim.pulse_length_mm,
        cfg.sim.runout_after_mm,
        MonotonicClock::new(),
        move |at, level| {
            let _ = edge_tx.send(Event::EncoderEdge { at, level });
        },
    );

    let monitor = Monitor::builder()
        .with_position_source(extruder.clone())
        .with_presence_sink(RunoutResponder::new(cfg.sensor.name.clone()))
        .with_detection_length(cfg.sensor.detection_length)
        .build()?;

    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Event::Shutdown);
    })
    .wrap_err("installing ctrl-c handler")?;

    // Queue arming and the printing gate before the console starts so early
    // piped commands observe an armed monitor.
    tx.send(Event::Ready).wrap_err("queueing ready event")?;
    extruder.set_printing(true, clock.now());
    tx.send(Event::PrintingStarted)
        .wrap_err("queueing printing-start event")?;

    console::spawn(tx.clone());

    if let Some(secs) = duration_s {
        let deadline_tx = tx.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            let _ = deadline_tx.send(Event::Shutdown);
        });
    }
    tracing::info!(
        sensor = %cfg.sensor.name,
        extruder = %cfg.sensor.extruder,
        feed_rate_mm_per_s = cfg.sim.feed_rate_mm_per_s,
        detection_length_mm = cfg.sensor.detection_length,
        "monitor running; console commands: QUERY_FILAMENT_MOTION, RESET_FILAMENT_MOTION_STATS, SET_FILAMENT_MOTION_DETECT_LENGTH VALUE=<mm>, STATUS, QUIT"
    );

    let monitor = Reactor::new(monitor, rx).run()?;

    if json {
        println!("{}", status_json(&monitor));
    } else {
        println!("{}", monitor.report());
    }
    Ok(())
}

fn status_json(monitor: &Monitor) -> String {
    let mut map = serde_json::Map::new();
    for (key, value) in monitor.status() {
        let json_value = match value {
            StatusValue::Bool(b) => serde_json::Value::Bool(b),
            StatusValue::Float(v) => serde_json::json!(v),
        };
        map.insert(key, json_value);
    }
    serde_json::Value::Object(map).to_string()
}
