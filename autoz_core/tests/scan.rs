use autoz_core::config::CalibrationConfig;
use autoz_core::detector::Trigger;
use autoz_core::error::AutoZError;
use autoz_core::repeat::RepeatedMeasurement;
use autoz_core::scan::{ScanConfig, ScanState, StepScanProbe};
use autoz_core::{CancelToken, FilterChain};
use autoz_hardware::sim::{SimHandle, SimParams, SimulatedPrinter, simulated};
use autoz_traits::{BoxError, Cooperative, Motion, Position};
use rstest::rstest;

fn scan_at(z: f32) -> ScanConfig {
    ScanConfig::from_calibration(&CalibrationConfig::default(), Position::new(50.0, 50.0, z))
}

#[rstest]
#[case(1.6)]
#[case(2.0)]
#[case(3.0)]
fn contact_height_is_the_distance_to_the_bed(#[case] base_z: f32) {
    let (mut printer, mut cell, _h) = simulated(SimParams::default());
    let mut probe = StepScanProbe::new(&mut printer, &mut cell, FilterChain::default());

    let r = probe.scan(&scan_at(base_z)).unwrap();
    assert_eq!(r.trigger, Some(Trigger::Contact));
    assert!((r.height_mm + base_z).abs() < 0.06, "base {base_z}: got {r:?}");
    assert_eq!(probe.state(), ScanState::Triggered);
    assert!((probe.baseline() - 84_000).abs() <= 40);
}

#[test]
fn soft_endstops_are_restored_after_scanning_below_them() {
    let (mut printer, mut cell, h) = simulated(SimParams::default());
    {
        let mut probe = StepScanProbe::new(&mut printer, &mut cell, FilterChain::default());
        probe.scan(&scan_at(1.6)).unwrap();
    }
    let st = h.state();
    assert!(st.soft_endstops);
    // the nozzle went past the soft limit while stepping
    assert!(st.min_z_seen < 0.0);
}

#[test]
fn travel_limit_without_contact_reports_no_contact() {
    let (mut printer, mut cell, h) = simulated(SimParams {
        bed_z_mm: -20.0,
        ..SimParams::default()
    });
    let mut probe = StepScanProbe::new(&mut printer, &mut cell, FilterChain::default());
    let cfg = scan_at(1.0).with_depth_limit(-2.0);

    let r = probe.scan(&cfg).unwrap();
    assert!(!r.is_contact());
    assert_eq!(r.height_mm, 0.0);
    assert_eq!(probe.state(), ScanState::TravelLimitReached);
    drop(probe);
    assert!(h.state().soft_endstops);
    assert!(h.state().min_z_seen <= -1.0 + 1e-3);
}

#[test]
fn overpressure_fires_when_starting_in_contact() {
    let (mut printer, mut cell, _h) = simulated(SimParams {
        bed_z_mm: 1.0,
        ..SimParams::default()
    });
    let mut probe = StepScanProbe::new(&mut printer, &mut cell, FilterChain::default());
    // baseline is taken below the surface, so the load is already high at the start
    let r = probe.scan(&scan_at(0.9).with_step(0.05)).unwrap();
    assert!(r.is_contact());
}

#[test]
fn cancel_stops_the_descent_and_restores_endstops() {
    let (mut printer, mut cell, h) = simulated(SimParams::default());
    let token = CancelToken::new();
    token.cancel();
    let mut probe = StepScanProbe::new(&mut printer, &mut cell, FilterChain::default())
        .with_cancel(Some(&token));
    assert_eq!(probe.scan(&scan_at(1.6)), Err(AutoZError::Cancelled));
    drop(probe);
    assert!(h.state().soft_endstops);
}

#[test]
fn every_step_yields_to_the_firmware() {
    let (mut printer, mut cell, h) = simulated(SimParams::default());
    let mut probe = StepScanProbe::new(&mut printer, &mut cell, FilterChain::default());
    probe.scan(&scan_at(1.6)).unwrap();
    drop(probe);
    let st = h.state();
    // 8 baseline idles plus one per non-final step
    assert!(st.idles >= 8 + 70, "idles = {}", st.idles);
}

#[test]
fn repeated_measurement_without_contact_is_a_sensor_fault() {
    let (mut printer, mut cell, h) = simulated(SimParams {
        bed_z_mm: -20.0,
        ..SimParams::default()
    });
    let mut probe = StepScanProbe::new(&mut printer, &mut cell, FilterChain::default());
    let res = RepeatedMeasurement::single().measure(&mut probe, &scan_at(1.0));
    assert_eq!(res, Err(AutoZError::SensorFault));
    drop(probe);
    // depth clamped to 3 mm below the base
    assert!(h.state().min_z_seen > -2.1);
}

#[test]
fn repeated_measurement_averages_agreeing_scans() {
    let (mut printer, mut cell, h) = simulated(SimParams::default());
    let mut probe = StepScanProbe::new(&mut printer, &mut cell, FilterChain::default());
    let v = RepeatedMeasurement::new(3, 0.2)
        .measure(&mut probe, &scan_at(1.6))
        .unwrap();
    assert!((v + 1.6).abs() < 0.06, "got {v}");
    drop(probe);
    // the first pair already agrees: two baselines of 8 reads plus the steps
    let reads = h.state().reads;
    assert!(reads < 2 * (8 + 100), "reads = {reads}");
}

/// Moves the simulated bed between two heights at the start of every scan.
struct ShiftingBed {
    printer: SimulatedPrinter,
    handle: SimHandle,
    scans: u32,
}

impl Motion for ShiftingBed {
    fn move_to_xy(&mut self, x: f32, y: f32, feed_mm_s: f32) -> Result<(), BoxError> {
        let bed_z = if self.scans % 2 == 0 { 0.0 } else { -0.5 };
        self.handle.update(|p| p.bed_z_mm = bed_z);
        self.scans += 1;
        self.printer.move_to_xy(x, y, feed_mm_s)
    }

    fn move_to_z(&mut self, z: f32, feed_mm_s: f32) -> Result<(), BoxError> {
        self.printer.move_to_z(z, feed_mm_s)
    }

    fn move_to_xyz(&mut self, pos: Position, feed_mm_s: f32) -> Result<(), BoxError> {
        self.printer.move_to_xyz(pos, feed_mm_s)
    }

    fn position(&self) -> Position {
        self.printer.position()
    }

    fn home_all(&mut self) -> Result<(), BoxError> {
        self.printer.home_all()
    }

    fn home_z(&mut self) -> Result<(), BoxError> {
        self.printer.home_z()
    }

    fn set_soft_endstops(&mut self, enabled: bool) -> bool {
        self.printer.set_soft_endstops(enabled)
    }

    fn set_leveling(&mut self, enabled: bool) {
        self.printer.set_leveling(enabled);
    }
}

impl Cooperative for ShiftingBed {
    fn idle(&mut self) {
        self.printer.idle();
    }
}

#[test]
fn repeated_measurement_falls_back_to_the_last_pair() {
    let (printer, mut cell, handle) = simulated(SimParams::default());
    let mut machine = ShiftingBed {
        printer,
        handle,
        scans: 0,
    };
    let mut probe = StepScanProbe::new(&mut machine, &mut cell, FilterChain::default());

    // heights alternate near -1.6 and -2.1, so no pair ever agrees
    let v = RepeatedMeasurement::new(2, 0.1)
        .measure(&mut probe, &scan_at(1.6))
        .unwrap();
    drop(probe);
    assert_eq!(machine.scans, 4);
    assert!((v + 1.85).abs() < 0.06, "got {v}");
}
