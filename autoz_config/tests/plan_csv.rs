use std::fs::File;
use std::io::Write;

use autoz_config::{PersistedState, load_points_csv, load_toml};
use tempfile::tempdir;

#[test]
fn loads_points_with_exact_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "x,y").unwrap();
    writeln!(f, "28,28").unwrap();
    writeln!(f, " 110.5 , 110 ").unwrap();
    drop(f);

    let pts = load_points_csv(&path).unwrap();
    assert_eq!(pts.len(), 2);
    assert!((pts[1].x - 110.5).abs() < 1e-6);
}

#[test]
fn rejects_wrong_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.csv");
    std::fs::write(&path, "y,x\n1,2\n").unwrap();
    let err = load_points_csv(&path).expect_err("headers must be x,y");
    assert!(format!("{err}").contains("headers 'x,y'"));
}

#[test]
fn reports_bad_row_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.csv");
    std::fs::write(&path, "x,y\n1,2\nabc,3\n").unwrap();
    let err = load_points_csv(&path).expect_err("bad row");
    assert!(format!("{err}").contains("row 3"), "{err}");
}

#[test]
fn rejects_empty_plan() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.csv");
    std::fs::write(&path, "x,y\n").unwrap();
    assert!(load_points_csv(&path).is_err());
}

#[test]
fn csv_takes_precedence_over_inline_points() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.csv");
    std::fs::write(&path, "x,y\n50,60\n").unwrap();
    let toml = format!(
        "[pins]\nhx711_sck = 6\nhx711_dt = 5\n[plan]\nkind = \"custom\"\npoints = [[1.0, 2.0], [3.0, 4.0]]\npoints_csv = {:?}\n",
        path.display().to_string()
    );
    let cfg = load_toml(&toml).unwrap();
    let pts = cfg.custom_points().unwrap();
    assert_eq!(pts.len(), 1);
    assert!((pts[0].y - 60.0).abs() < 1e-6);
}

#[test]
fn persisted_state_missing_file_is_default() {
    let dir = tempdir().unwrap();
    let st = PersistedState::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(st, PersistedState::default());
}

#[test]
fn persisted_state_survives_toml() {
    let st = PersistedState {
        z_offset_mm: -3.15,
        boot_wizard_pending: true,
        boot_step: 2,
    };
    let text = st.to_toml().unwrap();
    assert_eq!(PersistedState::from_toml(&text).unwrap(), st);
}

#[test]
fn persisted_state_range_check() {
    let st = PersistedState {
        z_offset_mm: 0.5,
        ..PersistedState::default()
    };
    assert!(st.check_range(-5.0, 0.0).is_err());
    let ok = PersistedState {
        z_offset_mm: -1.0,
        ..PersistedState::default()
    };
    assert!(ok.check_range(-5.0, 0.0).is_ok());
}
