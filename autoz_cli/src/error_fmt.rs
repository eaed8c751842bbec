//! Human-readable error descriptions and structured JSON error formatting.

use autoz_core::error::{AutoZError, BuildError, RejectReason};

pub fn reject_reason_name(r: &RejectReason) -> &'static str {
    match r {
        RejectReason::NoValidPoints => "NoValidPoints",
        RejectReason::MedianOutOfRange => "MedianOutOfRange",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMachine => {
                "What happened: No printer was provided to the offset engine.\nLikely causes: The motion backend failed to initialize.\nHow to fix: Check the backend setup and rerun with --log-level=debug.".to_string()
            }
            BuildError::MissingSource => {
                "What happened: No load-cell source was provided to the offset engine.\nLikely causes: The HX711 failed to open or was not wired into the builder.\nHow to fix: Verify [pins] and that the amplifier is powered.".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No offset store was provided.\nLikely causes: The state file could not be prepared.\nHow to fix: Check --state points at a writable location.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<AutoZError>() {
        return match ae {
            AutoZError::Rejected(RejectReason::NoValidPoints) => {
                "What happened: No plan point produced a usable offset.\nLikely causes: The nozzle never touched the bed within travel, the touch probe failed, or every result fell outside [offset] bounds.\nHow to fix: Check the load cell with `self-check`, verify the touch probe, and review [offset] min_mm/max_mm.".to_string()
            }
            AutoZError::Rejected(RejectReason::MedianOutOfRange) => {
                "What happened: The median offset fell outside the configured bounds.\nLikely causes: Bed far from nominal height or bounds too tight.\nHow to fix: Check the bed mechanically, or widen [offset] min_mm/max_mm.".to_string()
            }
            AutoZError::Cancelled => {
                "What happened: The run was cancelled.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Start a new run; no offset was written.".to_string()
            }
            AutoZError::Timeout => {
                "What happened: Load-cell read timed out.\nLikely causes: HX711 not wired correctly, no power, or timeout too low.\nHow to fix: Verify DT/SCK pins and power, and consider increasing hardware.sensor_read_timeout_ms.".to_string()
            }
            AutoZError::Prerequisite(what) => format!(
                "What happened: A preparation step failed ({what}).\nLikely causes: Homing or cleaning could not complete.\nHow to fix: Home the printer manually to confirm it works, then rerun."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("plan csv must have headers") {
        return "Invalid headers in plan CSV. Expected 'x,y'.".to_string();
    }

    if lower.contains("open hx711") {
        return "What happened: Failed to initialize the HX711 pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("self-check") {
        return format!(
            "What happened: {msg}.\nLikely causes: Disconnected load cell (flat signal) or a loose connection (excessive noise).\nHow to fix: Check the load-cell cable and amplifier, then rerun `self-check`."
        );
    }

    if lower.contains("config") {
        return format!(
            "What happened: Configuration is invalid or unreadable ({msg}).\nLikely causes: Missing [pins], a typo, or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes for the failures a caller may script against.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<AutoZError>() {
        Some(AutoZError::Cancelled) => 2,
        Some(AutoZError::Rejected(RejectReason::NoValidPoints)) => 3,
        Some(AutoZError::Rejected(RejectReason::MedianOutOfRange)) => 4,
        Some(AutoZError::Prerequisite(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = match err.downcast_ref::<AutoZError>() {
        Some(AutoZError::Rejected(r)) => reject_reason_name(r),
        Some(AutoZError::Cancelled) => "Cancelled",
        Some(AutoZError::Prerequisite(_)) => "Prerequisite",
        _ => "Error",
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
