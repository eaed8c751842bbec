//! Result printing on stdout (text or JSON) and raw CSV export.

use std::path::Path;

use autoz_core::error::AutoZResult;
use autoz_core::scan::MeasurementResult;
use autoz_core::self_check::SelfCheckReport;
use autoz_core::types::RawSample;
use autoz_core::ZOffsetEstimate;
use eyre::WrapErr;
use serde_json::json;

fn estimate_json(est: &ZOffsetEstimate) -> serde_json::Value {
    json!({
        "z_offset_mm": est.value_mm,
        "points_sampled": est.points_sampled,
        "points_discarded": est.points_discarded,
        "kept": est.kept,
        "committed": est.committed,
        "cleaned": est.clean.as_ref().map(|c| c.wiped),
    })
}

pub fn print_estimate(est: &ZOffsetEstimate, json: bool) {
    if json {
        println!("{}", estimate_json(est));
        return;
    }
    println!(
        "z-offset {:.3} mm ({} of {} points kept){}",
        est.value_mm,
        est.points_sampled - est.points_discarded,
        est.points_sampled,
        if est.committed { ", saved" } else { ", not saved" }
    );
}

pub fn print_runs(runs: &[AutoZResult<ZOffsetEstimate>], json: bool) {
    for (i, run) in runs.iter().enumerate() {
        match (run, json) {
            (Ok(est), true) => {
                let mut v = estimate_json(est);
                v["run"] = json!(i + 1);
                println!("{v}");
            }
            (Ok(est), false) => {
                print!("run {}: ", i + 1);
                print_estimate(est, false);
            }
            (Err(e), true) => println!("{}", json!({ "run": i + 1, "error": e.to_string() })),
            (Err(e), false) => println!("run {}: failed: {e}", i + 1),
        }
    }
}

pub fn print_raw(samples: &[RawSample], json: bool) {
    for s in samples {
        if json {
            println!("{}", json!({ "at_ms": s.at_ms, "value": s.value }));
        } else {
            println!("{:>8} ms  {}", s.at_ms, s.value);
        }
    }
}

pub fn write_raw_csv(path: &Path, samples: &[RawSample]) -> eyre::Result<()> {
    let mut w = csv::Writer::from_path(path)
        .wrap_err_with(|| format!("create raw CSV {}", path.display()))?;
    w.write_record(["at_ms", "value"])?;
    for s in samples {
        w.write_record([s.at_ms.to_string(), s.value.to_string()])?;
    }
    w.flush()?;
    Ok(())
}

pub fn print_scan(res: &MeasurementResult, json: bool) {
    let trigger = res.trigger.map(|t| format!("{t:?}"));
    if json {
        println!(
            "{}",
            json!({ "height_mm": res.height_mm, "index": res.index, "trigger": trigger })
        );
    } else if let Some(t) = trigger {
        println!(
            "scan height {:.3} mm (zone index {}, {t})",
            res.height_mm, res.index
        );
    } else {
        println!("scan: no contact");
    }
}

pub fn print_self_check(r: &SelfCheckReport, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "min": r.min,
                "avg": r.avg,
                "max": r.max,
                "spread": r.spread(),
                "healthy": r.healthy,
            })
        );
    } else {
        println!(
            "idle min/avg/max {:.0} / {:.1} / {:.0} (spread {:.0}): {}",
            r.min,
            r.avg,
            r.max,
            r.spread(),
            if r.healthy { "healthy" } else { "FAULT" }
        );
    }
}
