//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use filawatch_core::error::{BuildError, ConfigError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingPositionSource => {
                "What happened: No extruder position source was provided to the monitor.\nLikely causes: The extruder named in the config failed to resolve or was not wired into the builder.\nHow to fix: Check sensor.extruder in the config and pass a source via with_position_source(...).".to_string()
            }
            BuildError::MissingPresenceSink => {
                "What happened: No presence consumer was provided to the monitor.\nLikely causes: The runout responder was not wired into the builder.\nHow to fix: Pass a sink via with_presence_sink(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ConfigError>() {
        return format!(
            "What happened: {ce}.\nHow to fix: Pass a positive VALUE in millimeters, e.g. SET_FILAMENT_MOTION_DETECT_LENGTH VALUE=7.0."
        );
    }

    // String-based heuristics for errors coming from config loading; the
    // alternate format includes the whole cause chain.
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing file.\nHow to fix: Point --config at an existing TOML file.".to_string();
    }
    if lower.contains("parse config") {
        return "What happened: The config file is not valid TOML for this schema.\nLikely causes: Typos, a missing [sensor] section, or wrong value types.\nHow to fix: Compare against etc/filawatch.toml and fix the reported line.".to_string();
    }
    if lower.contains("detection_length") {
        return "What happened: sensor.detection_length is not a positive number.\nHow to fix: Set it to the millimeters of commanded extrusion allowed between encoder pulses (default 7.0).".to_string();
    }
    if lower.contains("resolving extruder position") {
        return "What happened: The extruder position could not be read while arming the monitor.\nLikely causes: The position source is offline or the extruder name is wrong.\nHow to fix: Verify the machine is connected and sensor.extruder matches an existing extruder.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Configuration/build failures map to exit code 2; everything else is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use filawatch_core::error::{BuildError, ConfigError};
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<ConfigError>().is_some() {
        return 2;
    }
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("config") {
        return 2;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = if exit_code_for_error(err) == 2 {
        "ConfigError"
    } else {
        "Error"
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
