//! Whole-stack runs against the simulated printer and load cell.

use autoz_core::calibrator::{DualModeCalibrator, MeasureModes, PointMeasurer};
use autoz_core::command::{
    self, BOOT_STEP_LEVELING, BootWizard, DiagnosticOptions, DiagnosticReport,
};
use autoz_core::config::CalibrationConfig;
use autoz_core::mocks::{MemoryOffsetStore, RecordingNotifier};
use autoz_core::{OffsetOrchestrator, RunOptions, RunStage};
use autoz_hardware::sim::{SimParams, simulated};
use autoz_traits::{Position, Thermal, UiStage};

// touch reads 1.6 above a flat bed, the nozzle meets it at 0; with the
// 0.05 expansion term the difference lands near -3.15
const EXPECTED_MM: f32 = -3.15;
const TOL_MM: f32 = 0.1;

fn cfg_with_clean_z(z: f32) -> CalibrationConfig {
    let mut cfg = CalibrationConfig::default();
    cfg.clean.start.z = z;
    cfg.clean.end.z = z;
    cfg
}

#[test]
fn point_difference_matches_the_simulated_geometry() {
    let (mut printer, mut cell, h) = simulated(SimParams::default());
    let cfg = CalibrationConfig::default();
    let mut cal = DualModeCalibrator::new(&cfg);

    let s = cal
        .point_difference(
            &mut printer,
            &mut cell,
            Position::new(110.0, 110.0, 4.0),
            MeasureModes::BOTH,
        )
        .unwrap();

    assert!((s.touch_mm - 1.6).abs() < 1e-4);
    assert!((s.difference_mm - EXPECTED_MM).abs() < TOL_MM, "got {s:?}");
    let st = h.state();
    assert_eq!(st.touch_probes, 1);
    assert_eq!(st.stows, 1);
    assert!(!st.leveling);
    assert!(st.soft_endstops);
    assert!((st.pos.z - 5.0).abs() < 1e-6);
}

#[test]
fn touch_probe_is_moved_over_the_point() {
    let mut params = SimParams::default();
    // the bed rises along X, so the probed height depends on where the probe sits
    params.tilt_x = 0.01;
    let (mut printer, mut cell, _h) = simulated(params);
    let mut cal = DualModeCalibrator::new(&CalibrationConfig::default());

    let s = cal
        .point_difference(
            &mut printer,
            &mut cell,
            Position::new(100.0, 50.0, 4.0),
            MeasureModes {
                press: false,
                touch: true,
            },
        )
        .unwrap();
    // probe x = 100 - (-24.25)
    let expected = 0.01 * 124.25 + 1.6;
    assert!((s.touch_mm - expected).abs() < 1e-4, "got {}", s.touch_mm);
    assert_eq!(s.press_mm, 0.0);
}

#[test]
fn touch_failure_still_stows_and_raises() {
    let (mut printer, mut cell, h) = simulated(SimParams::default());
    h.update(|p| p.fail_touch = true);
    let mut cal = DualModeCalibrator::new(&CalibrationConfig::default());
    let res = cal.point_difference(
        &mut printer,
        &mut cell,
        Position::new(28.0, 28.0, 4.0),
        MeasureModes::BOTH,
    );
    assert!(res.is_err());
    assert_eq!(h.state().stows, 1);
    assert!((h.state().pos.z - 5.0).abs() < 1e-6);
}

#[test]
fn stalled_approach_still_stows_and_restores_targets() {
    let (mut printer, mut cell, h) = simulated(SimParams::default());
    printer.set_hotend_target(140.0);
    printer.set_bed_target(60.0);
    h.update(|p| p.fail_xy_moves = true);
    let mut cal = DualModeCalibrator::new(&CalibrationConfig::default());
    let touch_only = MeasureModes {
        press: false,
        touch: true,
    };

    let err = cal
        .point_difference(&mut printer, &mut cell, Position::new(28.0, 28.0, 4.0), touch_only)
        .unwrap_err();
    assert!(err.to_string().contains("stalled"), "{err}");
    let st = h.state();
    assert_eq!(st.touch_probes, 0);
    assert_eq!(st.stows, 1);
    assert_eq!(st.hotend_target, 140.0);
    assert_eq!(st.bed_target, 60.0);
    assert!((st.pos.z - 5.0).abs() < 1e-6);
}

#[test]
fn full_run_commits_a_plausible_offset() {
    let (printer, cell, h) = simulated(SimParams::default());
    let store = MemoryOffsetStore::new();
    let notes = RecordingNotifier::new();
    let mut o = OffsetOrchestrator::new(
        printer,
        cell,
        store.clone(),
        notes.clone(),
        CalibrationConfig::default(),
    )
    .unwrap();

    let est = o
        .run(RunOptions {
            clean: false,
            modes: MeasureModes::BOTH,
        })
        .unwrap();

    assert!((est.value_mm - EXPECTED_MM).abs() < TOL_MM, "got {est:?}");
    assert_eq!(est.kept.len(), 4);
    assert_eq!(o.stage(), RunStage::Committed);
    assert_eq!(store.persisted().len(), 1);
    assert_eq!(store.last_applied(), Some(est.value_mm));
    assert!(h.state().homed >= 1);
    assert_eq!(h.state().touch_probes, 4);
}

#[test]
fn cleaning_heats_wipes_and_rehomes_z() {
    let (printer, cell, h) = simulated(SimParams::default());
    let notes = RecordingNotifier::new();
    let mut o = OffsetOrchestrator::new(
        printer,
        cell,
        MemoryOffsetStore::new(),
        notes.clone(),
        cfg_with_clean_z(2.0),
    )
    .unwrap();

    let est = o.run(RunOptions::default()).unwrap();
    let clean = est.clean.unwrap();
    assert!(clean.wiped);
    assert!(clean.start_mm.abs() < TOL_MM, "strip found at {}", clean.start_mm);
    assert!(clean.end_mm.abs() < TOL_MM);

    let stages = notes.stages();
    assert_eq!(&stages[..2], &[UiStage::Heating, UiStage::Cleaning]);
    assert_eq!(stages.last(), Some(&UiStage::Finished));
    // targets restored after each touch, so the cleaning temperatures stick
    assert_eq!(h.state().hotend_target, 175.0);
    assert_eq!(h.state().bed_target, 60.0);
}

#[test]
fn single_scan_finds_the_bed_below_the_press_position() {
    let (printer, cell, h) = simulated(SimParams::default());
    let mut o = OffsetOrchestrator::new(
        printer,
        cell,
        MemoryOffsetStore::new(),
        RecordingNotifier::new(),
        CalibrationConfig::default(),
    )
    .unwrap();

    let r = o.single_scan().unwrap();
    assert!(r.is_contact());
    // base Z 3 over a bed at 0
    assert!((r.height_mm + 3.0).abs() < TOL_MM, "got {r:?}");
    let st = h.state();
    assert_eq!((st.pos.x, st.pos.y), (25.0, 28.0));
}

#[test]
fn raw_diagnostic_reads_the_requested_count() {
    let (printer, cell, h) = simulated(SimParams::default());
    let mut o = OffsetOrchestrator::new(
        printer,
        cell,
        MemoryOffsetStore::new(),
        RecordingNotifier::new(),
        CalibrationConfig::default(),
    )
    .unwrap();

    let opts = DiagnosticOptions {
        raw: Some(10),
        ..DiagnosticOptions::default()
    };
    let DiagnosticReport::Raw(samples) = command::diagnostic(&mut o, &opts).unwrap() else {
        panic!("expected a raw dump");
    };
    assert_eq!(samples.len(), 10);
    assert!(samples.iter().all(|s| (s.value - 84_000).abs() <= 40));
    assert!(samples.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
    assert_eq!(h.state().reads, 10);
}

#[test]
fn diagnostic_without_flags_does_nothing() {
    let (printer, cell, h) = simulated(SimParams::default());
    let mut o = OffsetOrchestrator::new(
        printer,
        cell,
        MemoryOffsetStore::new(),
        RecordingNotifier::new(),
        CalibrationConfig::default(),
    )
    .unwrap();
    let report = command::diagnostic(&mut o, &DiagnosticOptions::default()).unwrap();
    assert_eq!(report, DiagnosticReport::Nothing);
    assert_eq!(h.state().homed, 0);
}

#[test]
fn press_only_diagnostic_runs_repeat_without_committing() {
    // press-only scans start at travel Z 4; a raised bed keeps contact inside the depth clamp
    let (printer, cell, _h) = simulated(SimParams {
        bed_z_mm: 1.5,
        ..SimParams::default()
    });
    let store = MemoryOffsetStore::new();
    let mut o = OffsetOrchestrator::new(
        printer,
        cell,
        store.clone(),
        RecordingNotifier::new(),
        CalibrationConfig::default(),
    )
    .unwrap();
    let opts = DiagnosticOptions {
        count: 2,
        press: true,
        ..DiagnosticOptions::default()
    };
    let DiagnosticReport::Runs(runs) = command::diagnostic(&mut o, &opts).unwrap() else {
        panic!("expected runs");
    };
    assert_eq!(runs.len(), 2);
    for r in &runs {
        let est = r.as_ref().unwrap();
        assert!(!est.committed);
        // 2.5 below the scan base, plus expansion
        assert!((est.value_mm + 2.45).abs() < TOL_MM, "got {est:?}");
    }
    assert!(store.persisted().is_empty());
}

#[test]
fn one_shot_advances_the_wizard_and_returns_to_menu() {
    let (printer, cell, h) = simulated(SimParams::default());
    let notes = RecordingNotifier::new();
    let store = MemoryOffsetStore::new();
    let mut o = OffsetOrchestrator::new(
        printer,
        cell,
        store.clone(),
        notes.clone(),
        cfg_with_clean_z(2.0),
    )
    .unwrap();
    let mut wizard = BootWizard {
        pending: true,
        step: 0,
    };

    let out = command::one_shot(&mut o, false, &mut wizard).unwrap();
    assert_eq!(out.exit, UiStage::ReturnToMenu);
    assert_eq!(wizard.step, BOOT_STEP_LEVELING);
    assert_eq!(notes.stages().last(), Some(&UiStage::ReturnToMenu));
    assert_eq!(store.persisted().len(), 1);
    assert!((h.state().pos.z - 5.0).abs() < 1e-6);
}

#[test]
fn one_shot_failure_notifies_once() {
    let (printer, cell, h) = simulated(SimParams::default());
    // every touch fails, so every point is discarded
    h.update(|p| p.fail_touch = true);
    let mut cfg = CalibrationConfig::default();
    cfg.clean.enabled = false;
    let notes = RecordingNotifier::new();
    let mut o =
        OffsetOrchestrator::new(printer, cell, MemoryOffsetStore::new(), notes.clone(), cfg)
            .unwrap();
    let mut wizard = BootWizard::default();

    assert!(command::one_shot(&mut o, true, &mut wizard).is_err());
    let failed = notes.stages().iter().filter(|s| **s == UiStage::Failed).count();
    assert_eq!(failed, 1);
    assert_eq!(wizard.step, 0);
}
