use std::cell::Cell;
use std::time::Duration;

use autoz_hardware::error::HwError;
use autoz_hardware::util::wait_until_low_with_timeout;
use rstest::rstest;

#[rstest]
#[case(0)]
#[case(1)]
#[case(10)]
fn wait_until_low_success_path(#[case] high_polls: usize) {
    let remaining = Cell::new(high_polls);
    let pauses = Cell::new(0usize);
    let res = wait_until_low_with_timeout(
        || {
            let r = remaining.get();
            if r == 0 {
                return Ok(false);
            }
            remaining.set(r - 1);
            Ok(true)
        },
        Duration::from_millis(200),
        || pauses.set(pauses.get() + 1),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
    assert_eq!(pauses.get(), high_polls);
}

#[test]
fn wait_until_low_timeout_path() {
    let err = wait_until_low_with_timeout(
        || Ok(true),
        Duration::from_millis(5),
        || std::thread::sleep(Duration::from_micros(200)),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::DataReadyTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn predicate_error_propagates() {
    let err = wait_until_low_with_timeout(
        || Err(HwError::Gpio("line fault".into())),
        Duration::from_millis(5),
        || {},
    )
    .expect_err("expected gpio error");
    assert!(matches!(err, HwError::Gpio(_)));
}
