use envdash::dashboard::Panel;
use envdash::storage::{ExportRow, export_rows, save_csv, save_json};
use envdash::{Loader, Selection, SourceId, SourceUrls, YearRange, build_view};
use std::fs;
use tempfile::tempdir;

#[test]
fn export_follows_view_and_skips_missing_panels() {
    let dir = tempdir().unwrap();
    let co2 = dir.path().join("co2.csv");
    fs::write(&co2, "country,2000,2001,2002\nChina,1.5,,2.5\n").unwrap();

    let mut urls = SourceUrls::default();
    for id in SourceId::ALL {
        urls.set(id, dir.path().join("absent").to_string_lossy().into_owned());
    }
    urls.set(SourceId::Co2, co2.to_string_lossy().into_owned());

    let loader = Loader::http().unwrap();
    let selection = Selection {
        country: "China".into(),
        years: YearRange::new(2001, 2002),
    };
    let view = build_view(&loader.load_all(&urls), Some(&selection));
    assert!(matches!(view.charts[1].body, Panel::Missing(_)));

    let rows = export_rows(&view);
    assert_eq!(
        rows,
        vec![
            ExportRow {
                source: SourceId::Co2,
                country: "China".into(),
                year: 2001,
                value: None,
            },
            ExportRow {
                source: SourceId::Co2,
                country: "China".into(),
                year: 2002,
                value: Some(2.5),
            },
        ]
    );

    let csvp = dir.path().join("out.csv");
    save_csv(&rows, &csvp).unwrap();
    assert_eq!(
        fs::read_to_string(&csvp).unwrap(),
        "source,country,year,value\nCO2,China,2001,\nCO2,China,2002,2.5\n"
    );

    let jsonp = dir.path().join("out.json");
    save_json(&rows, &jsonp).unwrap();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&jsonp).unwrap()).unwrap();
    assert!(v[0]["value"].is_null());
    assert_eq!(v[1]["year"], 2002);
}
