#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and validation for the filament motion monitor.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Validation is fatal before the monitor activates; the core never runs
//!   with a partially valid configuration.
use serde::Deserialize;

/// Sensor identity and detection tuning.
#[derive(Debug, Deserialize)]
pub struct SensorCfg {
    /// Sensor instance name, used in log lines and operator output.
    pub name: String,
    /// BCM pin the encoder switch is wired to (hardware builds).
    pub switch_pin: u8,
    /// Name of the extruder whose commanded position this sensor watches.
    pub extruder: String,
    /// Commanded millimeters allowed without an encoder pulse before a
    /// runout is declared.
    #[serde(default = "default_detection_length")]
    pub detection_length: f64,
}

fn default_detection_length() -> f64 {
    7.0
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters for the simulated feed rig used by `filawatch run` when no real
/// encoder is attached.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Commanded feed rate while "printing", in mm/s.
    pub feed_rate_mm_per_s: f64,
    /// Filament length represented by one encoder flank, in mm.
    pub pulse_length_mm: f64,
    /// Swallow encoder pulses past this many mm to provoke a runout.
    pub runout_after_mm: Option<f64>,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            feed_rate_mm_per_s: 5.0,
            pulse_length_mm: 2.0,
            runout_after_mm: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub sensor: SensorCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Read, parse and validate a config file in one step.
    pub fn load(path: &std::path::Path) -> eyre::Result<Self> {
        use eyre::WrapErr;
        let text = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
        let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
        cfg.validate()
            .wrap_err_with(|| format!("invalid config {path:?}"))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.name.trim().is_empty() {
            eyre::bail!("sensor.name must not be empty");
        }
        if self.sensor.extruder.trim().is_empty() {
            eyre::bail!("sensor.extruder must not be empty");
        }
        if !self.sensor.detection_length.is_finite() || self.sensor.detection_length <= 0.0 {
            eyre::bail!("sensor.detection_length must be a positive number of millimeters");
        }

        // Sim rig
        if !self.sim.feed_rate_mm_per_s.is_finite() || self.sim.feed_rate_mm_per_s <= 0.0 {
            eyre::bail!("sim.feed_rate_mm_per_s must be > 0");
        }
        if !self.sim.pulse_length_mm.is_finite() || self.sim.pulse_length_mm <= 0.0 {
            eyre::bail!("sim.pulse_length_mm must be > 0");
        }
        if let Some(runout_after) = self.sim.runout_after_mm
            && (!runout_after.is_finite() || runout_after < 0.0)
        {
            eyre::bail!("sim.runout_after_mm must be >= 0 when set");
        }

        // Logging: rotation policy is restricted to the supported set
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
