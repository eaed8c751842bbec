use autoz_core::calibrator::{MeasureModes, Reconciler};
use autoz_core::config::ReconcileCfg;
use autoz_core::error::AutoZError;
use autoz_core::mocks::ScriptedMeasurer;
use autoz_traits::Position;
use rstest::rstest;

fn reconciler(initial: u8, max: u8) -> Reconciler {
    Reconciler::new(&ReconcileCfg {
        initial_samples: initial,
        max_samples: max,
        tolerance_mm: 0.05,
        y_spacing_mm: 5.0,
    })
}

fn run(r: &Reconciler, m: &mut ScriptedMeasurer) -> Result<f32, AutoZError> {
    r.reconcile(m, &mut (), &mut (), Position::new(28.0, 28.0, 4.0), MeasureModes::BOTH)
}

#[test]
fn agreeing_pair_is_averaged() {
    let mut m = ScriptedMeasurer::from_values([-1.10, -1.12]);
    let v = run(&reconciler(2, 2), &mut m).unwrap();
    assert!((v + 1.11).abs() < 1e-5, "got {v}");
}

#[test]
fn third_sample_replaces_the_disagreeing_first() {
    let mut m = ScriptedMeasurer::from_values([-1.50, -1.10, -1.12]);
    let v = run(&reconciler(2, 3), &mut m).unwrap();
    assert!((v - (-1.12 + -1.10) / 2.0).abs() < 1e-5, "got {v}");
}

#[test]
fn third_sample_is_taken_at_the_base_point() {
    let mut m = ScriptedMeasurer::from_values([-1.50, -1.10, -1.12]);
    let visited = m.visited();
    run(&reconciler(2, 3), &mut m).unwrap();
    let ys: Vec<f32> = visited.borrow().iter().map(|p| p.y).collect();
    assert_eq!(ys, vec![28.0, 23.0, 28.0]);
}

#[test]
fn without_third_sample_smaller_magnitude_wins() {
    let mut m = ScriptedMeasurer::from_values([-1.50, -1.10]);
    assert_eq!(run(&reconciler(2, 2), &mut m).unwrap(), -1.10);
}

#[rstest]
#[case(0, 1)]
#[case(1, 1)]
fn single_sample_counts_are_clamped(#[case] initial: u8, #[case] expected_calls: usize) {
    let mut m = ScriptedMeasurer::from_values([-1.3, -9.0]);
    let visited = m.visited();
    assert_eq!(run(&reconciler(initial, 3), &mut m).unwrap(), -1.3);
    assert_eq!(visited.borrow().len(), expected_calls);
}

#[test]
fn three_initial_samples_use_the_first_two() {
    // the third initial sample is taken but does not take part
    let mut m = ScriptedMeasurer::from_values([-1.10, -1.11, -4.0]);
    let v = run(&reconciler(3, 3), &mut m).unwrap();
    assert!((v + 1.105).abs() < 1e-5, "got {v}");
}

#[test]
fn measurer_errors_propagate() {
    let mut m = ScriptedMeasurer::new([Ok(-1.1), Err(AutoZError::SensorFault)]);
    assert_eq!(run(&reconciler(2, 3), &mut m), Err(AutoZError::SensorFault));
}
