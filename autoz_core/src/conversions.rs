//! `From` implementations bridging `autoz_config` types to `autoz_core` types.

use std::time::Duration;

use autoz_traits::Position;

use crate::config::{
    CalibrationConfig, CleanCfg, FilterCfg, OffsetBounds, ProbeCfg, ReconcileCfg, RepeatCfg,
    ScanCfg, ThermalCfg, TriggerCfg,
};

// ── FilterCfg ────────────────────────────────────────────────────────────────

impl From<&autoz_config::Config> for FilterCfg {
    fn from(c: &autoz_config::Config) -> Self {
        Self {
            cutoff_hz: c.filter.cutoff_hz,
            sample_rate_hz: c.hardware.sample_rate_hz as f32,
            lowpass_k: c.filter.lowpass_k,
        }
    }
}

// ── TriggerCfg ───────────────────────────────────────────────────────────────

impl From<&autoz_config::TriggerCfg> for TriggerCfg {
    fn from(c: &autoz_config::TriggerCfg) -> Self {
        Self {
            min_hold: c.min_hold,
            max_hold: c.max_hold,
        }
    }
}

// ── ScanCfg ──────────────────────────────────────────────────────────────────

impl From<&autoz_config::Config> for ScanCfg {
    fn from(c: &autoz_config::Config) -> Self {
        Self {
            step_mm: c.scan.step_mm,
            max_depth_mm: c.scan.max_depth_mm,
            xy_speed_mm_s: c.scan.xy_speed_mm_s,
            z_speed_mm_s: c.scan.z_speed_mm_s,
            baseline_samples: c.scan.baseline_samples,
            read_timeout: Duration::from_millis(c.hardware.sensor_read_timeout_ms),
        }
    }
}

// ── RepeatCfg / ReconcileCfg ─────────────────────────────────────────────────

impl From<&autoz_config::RepeatCfg> for RepeatCfg {
    fn from(c: &autoz_config::RepeatCfg) -> Self {
        Self {
            attempts: c.attempts,
            tolerance_mm: c.tolerance_mm,
            press_samples: c.press_samples,
        }
    }
}

impl From<&autoz_config::ReconcileCfg> for ReconcileCfg {
    fn from(c: &autoz_config::ReconcileCfg) -> Self {
        Self {
            initial_samples: c.initial_samples,
            max_samples: c.max_samples,
            tolerance_mm: c.tolerance_mm,
            y_spacing_mm: c.y_spacing_mm,
        }
    }
}

// ── OffsetBounds / ProbeCfg ──────────────────────────────────────────────────

impl From<&autoz_config::OffsetCfg> for OffsetBounds {
    fn from(c: &autoz_config::OffsetCfg) -> Self {
        Self {
            min_mm: c.min_mm,
            max_mm: c.max_mm,
            nozzle_expansion_mm: c.nozzle_expansion_mm,
            ghost_epsilon_mm: c.ghost_epsilon_mm,
        }
    }
}

impl From<&autoz_config::ProbeCfg> for ProbeCfg {
    fn from(c: &autoz_config::ProbeCfg) -> Self {
        Self {
            nozzle_to_probe: (c.nozzle_to_probe[0], c.nozzle_to_probe[1]),
            press_position: (c.press_position[0], c.press_position[1]),
            travel_z_mm: c.travel_z_mm,
            shake_times: c.shake_times,
        }
    }
}

// ── CleanCfg / ThermalCfg ────────────────────────────────────────────────────

impl From<&autoz_config::CleanCfg> for CleanCfg {
    fn from(c: &autoz_config::CleanCfg) -> Self {
        let [sx, sy, sz] = c.start;
        let [ex, ey, ez] = c.end;
        Self {
            enabled: c.enabled,
            start: Position::new(sx, sy, sz),
            end: Position::new(ex, ey, ez),
            hotend_c: c.hotend_c,
            bed_c: c.bed_c,
        }
    }
}

impl From<&autoz_config::ThermalCfg> for ThermalCfg {
    fn from(c: &autoz_config::ThermalCfg) -> Self {
        Self {
            wait_timeout: Duration::from_millis(c.wait_timeout_ms),
            hotend_tolerance_c: c.hotend_tolerance_c,
            bed_tolerance_c: c.bed_tolerance_c,
            ..ThermalCfg::default()
        }
    }
}

// ── CalibrationConfig ────────────────────────────────────────────────────────

impl From<&autoz_config::Config> for CalibrationConfig {
    fn from(c: &autoz_config::Config) -> Self {
        Self {
            filter: FilterCfg::from(c),
            trigger: TriggerCfg::from(&c.trigger),
            scan: ScanCfg::from(c),
            repeat: RepeatCfg::from(&c.repeat),
            reconcile: ReconcileCfg::from(&c.reconcile),
            offset: OffsetBounds::from(&c.offset),
            probe: ProbeCfg::from(&c.probe),
            clean: CleanCfg::from(&c.clean),
            thermal: ThermalCfg::from(&c.thermal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_the_bridge() {
        let cfg = autoz_config::load_toml("[pins]\nhx711_sck = 6\nhx711_dt = 5\n").unwrap();
        let rt = CalibrationConfig::from(&cfg);
        rt.validate().unwrap();
        assert!((rt.filter.sample_rate_hz - 80.0).abs() < f32::EPSILON);
        assert_eq!(rt.scan.read_timeout, Duration::from_millis(20));
        assert_eq!(rt.thermal.wait_timeout, Duration::from_secs(300));
        assert!((rt.clean.end.y - 60.0).abs() < f32::EPSILON);
        assert!((rt.probe.nozzle_to_probe.0 + 24.25).abs() < f32::EPSILON);
    }
}
