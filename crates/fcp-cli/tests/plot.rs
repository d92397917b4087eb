use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::{error::Error, fs, path::PathBuf};

#[derive(Deserialize)]
struct Trace {
    number: usize,
    kind: String,
    points: Vec<[f64; 2]>,
}

#[derive(Deserialize)]
struct SeriesOutput {
    file: String,
    x_label: String,
    traces: Vec<Trace>,
}

#[test]
fn series_selects_discharge_cycle() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("fcp");
    cmd.args([
        "series",
        &sample_path("test_data/formation_cell_a.txt"),
        "--x",
        "capacity",
        "--y",
        "potential",
        "--cycles",
        "discharge 1",
        "--mass",
        "0.01",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let actual: SeriesOutput = serde_json::from_slice(&output)?;
    assert_eq!(actual.file, "formation_cell_a.txt");
    assert_eq!(actual.x_label, "Capacity (mAh/g)");
    assert_eq!(actual.traces.len(), 1);
    let trace = &actual.traces[0];
    assert_eq!(trace.number, 2);
    assert_eq!(trace.kind, "discharge");
    assert_eq!(trace.points.len(), 3);
    assert_close(trace.points[0][0], 0.11, 1e-9);
    assert_close(trace.points[0][1], 4.05, 1e-9);
    Ok(())
}

#[test]
fn series_time_axis_is_hours_from_first_active_row() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("fcp");
    cmd.args([
        "series",
        &sample_path("test_data/formation_cell_a.txt"),
        "--cycles",
        "1",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let actual: SeriesOutput = serde_json::from_slice(&output)?;
    let points = &actual.traces[0].points;
    assert_eq!(points[0][0], 0.0);
    assert_close(points[1][0], 10.0 / 3600.0, 1e-12);
    Ok(())
}

#[test]
fn out_of_range_cycle_is_reported() {
    let mut cmd = cargo_bin_cmd!("fcp");
    cmd.args([
        "series",
        &sample_path("test_data/formation_cell_a.txt"),
        "--cycles",
        "discharge 2",
    ]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&output);
    assert!(stderr.contains("Available: 1-1"), "{stderr}");
}

#[test]
fn malformed_cycle_spec_is_reported() {
    let mut cmd = cargo_bin_cmd!("fcp");
    cmd.args([
        "series",
        &sample_path("test_data/formation_cell_a.txt"),
        "--cycles",
        "third",
    ]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&output);
    assert!(stderr.contains("invalid cycle format"), "{stderr}");
}

#[test]
fn plot_writes_png_for_each_mode() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    for mode in ["single", "multi", "cycles"] {
        let out = dir.path().join(format!("{mode}.png"));
        let mut cmd = cargo_bin_cmd!("fcp");
        cmd.args([
            "plot",
            &sample_path("test_data/formation_cell_a.txt"),
            &sample_path("test_data/formation_cell_b.txt"),
            "--mode",
            mode,
            "--colormap",
            "plasma",
            "--out",
            out.to_str().expect("utf8 path"),
        ]);
        cmd.assert().success();
        assert!(fs::metadata(&out)?.len() > 0, "{mode} produced empty file");
    }
    Ok(())
}

#[test]
fn plot_reads_toml_config() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("plot.toml");
    fs::write(
        &config,
        "mode = \"multi\"\nx = \"capacity\"\ny = \"potential\"\ncycles = \"charge 1\"\nactive_mass = 0.02\ncolormap = \"tab10\"\nwidth = 640\nheight = 400\n\n[load]\nauto_detect = true\n",
    )?;
    let out = dir.path().join("config.png");
    let mut cmd = cargo_bin_cmd!("fcp");
    cmd.args([
        "plot",
        &sample_path("test_data/biologic_export.csv"),
        "--config",
        config.to_str().expect("utf8 path"),
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    cmd.assert().success();
    assert!(fs::metadata(&out)?.len() > 0);
    Ok(())
}

#[test]
fn plot_rejects_unknown_colormap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("bad.png");
    let mut cmd = cargo_bin_cmd!("fcp");
    cmd.args([
        "plot",
        &sample_path("test_data/formation_cell_a.txt"),
        "--colormap",
        "jet",
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    cmd.assert().failure();
}

fn assert_close(a: f64, b: f64, tol: f64) {
    let diff = (a - b).abs();
    assert!(
        diff <= tol,
        "diff {} exceeded tol {} ({} vs {})",
        diff,
        tol,
        a,
        b
    );
}

fn sample_path(relative: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join(relative)
        .to_string_lossy()
        .to_string()
}
