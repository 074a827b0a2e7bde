use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

/// `envdash` pointed at local fixtures; the spreadsheet sources do not exist.
fn offline_cmd(dir: &TempDir) -> Command {
    offline_cmd_with_co2(dir, "country,1990,1991\nChina,2.1,2.3\nIndia,0.8,0.9\n")
}

fn offline_cmd_with_co2(dir: &TempDir, co2_body: &str) -> Command {
    let co2 = write(dir.path(), "co2.csv", co2_body);
    let wb = write(
        dir.path(),
        "wb.csv",
        "a\nb\nc\nd\nCountry Name,Country Code,1990,1991\nChina,CHN,3.9,9.3\n",
    );
    let missing = dir.path().join("nope.xlsx").to_string_lossy().into_owned();
    // an explicit, empty secrets file keeps the user's own config out of the run
    let secrets = write(dir.path(), "secrets.toml", "");

    let mut cmd = Command::cargo_bin("envdash").unwrap();
    for key in ["URL_CO2", "URL_ENERGY", "URL_GDP", "URL_DISASTER", "URL_TEMP"] {
        cmd.env_remove(key);
    }
    cmd.args([
        "--secrets",
        secrets.as_str(),
        "--url-co2",
        co2.as_str(),
        "--url-energy",
        wb.as_str(),
        "--url-gdp",
        wb.as_str(),
        "--url-disaster",
        missing.as_str(),
        "--url-temp",
        missing.as_str(),
    ]);
    cmd
}

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("envdash").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("envdash"))
        .stdout(predicate::str::contains("summary"));
}

#[test]
fn summary_reports_selection_and_errors() {
    let dir = TempDir::new().unwrap();
    let mut cmd = offline_cmd(&dir);
    cmd.args(["summary", "--from", "1990", "--until", "1990"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Country: China | Years: 1990–1990"))
        .stdout(predicate::str::contains("CO₂ per capita (China)"))
        .stdout(predicate::str::contains("2.1"))
        .stdout(predicate::str::contains("Data sources: Gapminder / World Bank / EM-DAT"))
        .stdout(predicate::str::contains("co2.csv"))
        .stderr(predicate::str::contains("Disaster"))
        .stderr(predicate::str::contains("Temperature"));
}

#[test]
fn unknown_country_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let mut cmd = offline_cmd(&dir);
    cmd.args(["summary", "--country", "Atlantis"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Country: China"));
}

#[test]
fn export_writes_filtered_rows() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("rows.csv");
    let mut cmd = offline_cmd(&dir);
    cmd.args(["export", "--country", "India", "--out", out.to_str().unwrap()]);
    cmd.assert().success();

    let txt = fs::read_to_string(&out).unwrap();
    assert_eq!(
        txt,
        "source,country,year,value\nCO2,India,1990,0.8\nCO2,India,1991,0.9\n"
    );
}

#[test]
fn export_json_by_extension() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("rows.json");
    let mut cmd = offline_cmd(&dir);
    cmd.args(["export", "--out", out.to_str().unwrap()]);
    cmd.assert().success();

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    // China: 2 CO2 + 2 energy + 2 GDP
    assert_eq!(v.as_array().unwrap().len(), 6);
}

#[test]
fn preview_of_failed_source_says_not_loaded() {
    let dir = TempDir::new().unwrap();
    let mut cmd = offline_cmd(&dir);
    cmd.args(["preview", "--source", "temperature"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Temperature data"))
        .stdout(predicate::str::contains("Not loaded."));
}

// Live test (opt-in): cargo test --features online
#[cfg(feature = "online")]
#[test]
fn summary_against_published_data() {
    let mut cmd = Command::cargo_bin("envdash").unwrap();
    cmd.args(["summary", "--country", "China"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Country: China"));
}

#[test]
fn plot_with_infinite_cell_finishes() {
    if envdash::viz::locate_font(None).is_none() {
        eprintln!("no system font found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("charts");
    let mut cmd = assert_cmd::Command::from_std(offline_cmd_with_co2(
        &dir,
        "country,1990,1991\nChina,inf,2.0\n",
    ));
    cmd.args(["plot", "--out-dir", out.to_str().unwrap()]);
    cmd.timeout(std::time::Duration::from_secs(60));
    cmd.assert().success();
    assert!(out.join("co2.svg").exists());
}
