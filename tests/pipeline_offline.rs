//! End-to-end runs of loader + view model against local files.

use envdash::dashboard::Panel;
use envdash::fetch::SheetSelector;
use envdash::{Loader, LongRow, Selection, SourceId, SourceUrls, YearRange, build_view};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CO2: &str = "country,1990,1991\nChina,2.1,2.3\nIndia,0.8,0.9\n";
const ENERGY: &str = "\"Data Source\",\"World Development Indicators\"\n\
\n\
\"Last Updated Date\",\"2021-06-30\"\n\
\n\
Country Name,Country Code,1990,1991,\n\
China,CHN,767.1,772.9,\n\
Brazil,BRA,900.0,,\n";
const GDP: &str = "meta\nmeta\nmeta\nmeta\n\
Country Name,Country Code,1990,1991\n\
China,CHN,3.9,9.3\n";

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

fn local_urls(dir: &TempDir) -> SourceUrls {
    let mut urls = SourceUrls::default();
    urls.set(SourceId::Co2, write(dir.path(), "co2.csv", CO2));
    urls.set(SourceId::Energy, write(dir.path(), "energy.csv", ENERGY));
    urls.set(SourceId::Gdp, write(dir.path(), "gdp.csv", GDP));
    urls.set(
        SourceId::Disaster,
        dir.path().join("missing-disaster.xlsx").to_string_lossy().into_owned(),
    );
    urls.set(
        SourceId::Temperature,
        write(dir.path(), "temperature.xlsx", "not a workbook"),
    );
    urls
}

#[test]
fn reshape_and_filter_china_1990() {
    let dir = TempDir::new().unwrap();
    let loader = Loader::http().unwrap();
    let sources = loader.load_all(&local_urls(&dir));

    let co2 = sources.co2.as_ref().unwrap();
    assert_eq!(co2.value_name, "CO2_pc");
    let rows: Vec<(&str, i32, Option<f64>)> = co2
        .iter()
        .map(|r| (r.country.as_str(), r.year, r.value))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("China", 1990, Some(2.1)),
            ("China", 1991, Some(2.3)),
            ("India", 1990, Some(0.8)),
            ("India", 1991, Some(0.9)),
        ]
    );

    let selection = Selection {
        country: "China".into(),
        years: YearRange::new(1990, 1990),
    };
    let view = build_view(&sources, Some(&selection));
    assert_eq!(view.selection, selection);
    match &view.charts[0].body {
        Panel::Ready(series) => assert_eq!(
            series.rows.rows,
            vec![LongRow {
                country: "China".into(),
                year: 1990,
                value: Some(2.1),
            }]
        ),
        Panel::Missing(msg) => panic!("CO2 chart missing: {msg}"),
    }
}

#[test]
fn world_bank_files_skip_metadata() {
    let dir = TempDir::new().unwrap();
    let loader = Loader::http().unwrap();
    let sources = loader.load_all(&local_urls(&dir));

    let energy = sources.energy.as_ref().unwrap();
    assert_eq!(energy.value_name, "Value");
    // trailing empty header becomes an unnamed, non-year column
    assert_eq!(energy.len(), 4);
    assert!(energy
        .iter()
        .any(|r| r.country == "Brazil" && r.year == 1991 && r.value.is_none()));

    let gdp = sources.gdp.as_ref().unwrap();
    assert_eq!(gdp.len(), 2);
}

#[test]
fn broken_spreadsheets_are_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let loader = Loader::http().unwrap();
    let sources = loader.load_all(&local_urls(&dir));
    let view = build_view(&sources, None);

    let ids: Vec<SourceId> = view.errors.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![SourceId::Disaster, SourceId::Temperature]);
    assert!(view.previews.iter().all(|p| matches!(p.body, Panel::Missing(_))));
    assert!(view.charts.iter().all(|c| matches!(c.body, Panel::Ready(_))));

    assert_eq!(view.controls.countries, vec!["Brazil", "China", "India"]);
    assert_eq!(view.controls.default_country, "China");
    assert_eq!(view.controls.bounds, YearRange::new(1990, 1991));
    assert_eq!(view.selection.years, YearRange::new(1990, 1991));
}

#[test]
fn all_sources_failing_still_renders() {
    let dir = TempDir::new().unwrap();
    let mut urls = SourceUrls::default();
    for id in SourceId::ALL {
        let path = dir.path().join(format!("{}.none", id.name()));
        urls.set(id, path.to_string_lossy().into_owned());
    }
    let loader = Loader::http().unwrap();
    let view = build_view(&loader.load_all(&urls), None);

    assert_eq!(view.errors.len(), 5);
    assert_eq!(view.controls.countries, vec!["China"]);
    assert_eq!(view.controls.bounds, YearRange::new(1960, 2020));
    assert_eq!(view.selection.country, "China");
    let placeholders = view
        .charts
        .iter()
        .filter(|c| matches!(c.body, Panel::Missing(_)))
        .count()
        + view
            .previews
            .iter()
            .filter(|p| matches!(p.body, Panel::Missing(_)))
            .count();
    assert_eq!(placeholders, 5);
    assert_eq!(loader.cached_len(), 0);
}

#[test]
fn cache_serves_until_reset() {
    let dir = TempDir::new().unwrap();
    let urls = local_urls(&dir);
    let loader = Loader::http().unwrap();
    let first = loader.load_all(&urls);
    assert_eq!(loader.cached_len(), 3);

    // a changed file is not re-read while cached
    fs::write(urls.get(SourceId::Co2), "country,1990\nJapan,9.9\n").unwrap();
    let second = loader.load_all(&urls);
    assert_eq!(second.co2.as_ref().unwrap().len(), first.co2.as_ref().unwrap().len());

    loader.reset();
    assert_eq!(loader.cached_len(), 0);
    let third = loader.load_all(&urls);
    let co2 = third.co2.as_ref().unwrap();
    assert_eq!(co2.len(), 1);
    assert_eq!(co2.rows[0].country, "Japan");
}

#[test]
fn malformed_csv_only_fails_its_source() {
    let dir = TempDir::new().unwrap();
    let mut urls = local_urls(&dir);
    urls.set(
        SourceId::Co2,
        write(dir.path(), "bad.csv", "country,1990\nChina,1.0,2.0,3.0\n"),
    );
    let loader = Loader::http().unwrap();
    let sources = loader.load_all(&urls);

    let err = sources.co2.as_ref().unwrap_err();
    assert_eq!(err.id, SourceId::Co2);
    assert!(err.to_string().starts_with("CO2: "));
    assert!(sources.energy.is_ok());
    assert!(sources.gdp.is_ok());

    // year bounds fall back when CO2 is gone; countries still come from the others
    let view = build_view(&sources, None);
    assert_eq!(view.controls.bounds, YearRange::new(1960, 2020));
    assert_eq!(view.controls.countries, vec!["Brazil", "China"]);
    assert_eq!(view.selection.years, YearRange::new(1980, 2020));
}

/// A one-sheet workbook with `rows` data rows under a `Year, Anomaly` header.
fn write_workbook(dir: &Path, name: &str, sheet: &str, rows: u32) -> String {
    let mut wb = rust_xlsxwriter::Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name(sheet).unwrap();
    ws.write_string(0, 0, "Year").unwrap();
    ws.write_string(0, 1, "Anomaly").unwrap();
    for r in 1..=rows {
        ws.write_number(r, 0, 1870 + r).unwrap();
        ws.write_number(r, 1, f64::from(r) / 100.0).unwrap();
    }
    let path = dir.join(name);
    wb.save(&path).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn spreadsheet_previews_are_cut_at_100_rows() {
    let dir = TempDir::new().unwrap();
    let mut urls = local_urls(&dir);
    urls.set(
        SourceId::Temperature,
        write_workbook(dir.path(), "temp.xlsx", "GlobalTemp", 150),
    );
    urls.set(
        SourceId::Disaster,
        write_workbook(dir.path(), "disaster.xlsx", "Events", 12),
    );
    let loader = Loader::http().unwrap();
    let view = build_view(&loader.load_all(&urls), None);
    assert!(view.errors.is_empty(), "{:?}", view.errors);

    let temp = &view.previews[0];
    assert_eq!(temp.id, SourceId::Temperature);
    match &temp.body {
        Panel::Ready(p) => {
            assert_eq!(p.table.headers, vec!["Year", "Anomaly"]);
            assert_eq!(p.table.height(), 100);
            assert_eq!(p.total_rows, 150);
        }
        Panel::Missing(msg) => panic!("temperature preview missing: {msg}"),
    }
    match &view.previews[1].body {
        Panel::Ready(p) => assert_eq!((p.table.height(), p.total_rows), (12, 12)),
        Panel::Missing(msg) => panic!("disaster preview missing: {msg}"),
    }
}

#[test]
fn raw_read_by_sheet_name_is_cached_separately() {
    let dir = TempDir::new().unwrap();
    let path = write_workbook(dir.path(), "temp.xlsx", "GlobalTemp", 3);
    let loader = Loader::http().unwrap();

    let named = loader
        .read_raw(&SheetSelector::Name("GlobalTemp".into()), &path)
        .unwrap();
    assert_eq!(named.height(), 3);
    let first = loader.read_raw(&SheetSelector::default(), &path).unwrap();
    assert_eq!(*first, *named);
    assert_eq!(loader.cached_len(), 2);
    assert!(loader
        .read_raw(&SheetSelector::Name("Missing".into()), &path)
        .is_err());
}
