use std::fs;
use std::path::PathBuf;

use trajcat::settings::Settings;
use trajcat::{Catalog, CatalogError};

const LINES: &str = "; res\nt1 := [2021-01-01] ; P1D ; 24.0 ; 1 ; 1X1 ; day_${DOM}.dat\nT : air_temperature : 3 : t1\n";

fn setup() -> (tempfile::TempDir, Settings) {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("found.cat"), LINES).expect("write catalog");
    let settings = Settings {
        catalogs: Some(dir.path().to_path_buf()),
        install_dir: PathBuf::from("/nonexistent/trajcat"),
        ..Settings::default()
    };
    (dir, settings)
}

#[test]
fn catalogs_directory() {
    let (dir, settings) = setup();
    let mut catalog = Catalog::with_settings("found", settings);
    assert_eq!(catalog.find_config().expect("found"), dir.path().join("found.cat"));
    // the first query loads the catalog
    let found = catalog.query("T", "2021-07-15T10:34", "").expect("query ok");
    assert_eq!(found[0].pre, "day_15.dat");
    assert!(catalog.rules() > 0);
}

#[test]
fn install_directory() {
    let (dir, _) = setup();
    let settings = Settings { install_dir: dir.path().to_path_buf(), ..Settings::default() };
    let catalog = Catalog::with_settings("found", settings);
    assert_eq!(catalog.find_config().expect("found"), dir.path().join("found.cat"));
}

#[test]
fn locator_names_an_environment_variable() {
    let (dir, settings) = setup();
    let path = dir.path().join("elsewhere.txt");
    fs::write(&path, LINES).expect("write catalog");
    // SAFETY: no other test reads or writes this variable
    unsafe { std::env::set_var("TRAJCAT_TEST_CATALOG_PATH", &path) };
    let mut catalog = Catalog::with_settings("TRAJCAT_TEST_CATALOG_PATH", settings);
    assert_eq!(catalog.find_config().expect("found"), path);
    assert_eq!(catalog.variable_value("nothing").unwrap_err(), CatalogError::UnknownReference("nothing".to_owned()));
    assert_eq!(catalog.rules(), 3);
}

#[test]
fn missing_catalog() {
    let (_dir, settings) = setup();
    let mut catalog = Catalog::with_settings("nowhere", settings);
    let err = catalog.find_config().unwrap_err();
    assert_eq!(err, CatalogError::ConfigNotFound("nowhere".to_owned()));
    let err = catalog.query("T", "2021-07-15T10:34", "").unwrap_err();
    assert!(matches!(err, CatalogError::ConfigNotFound(_)), "got {err:?}");
}

#[test]
fn changing_the_locator() {
    let (_dir, settings) = setup();
    let mut catalog = Catalog::with_settings("nowhere", settings);
    catalog.set_locator("found");
    assert_eq!(catalog.locator(), "found");
    catalog.load(None).expect("load ok");
    assert_eq!(catalog.std_lookup("air_temperature"), Some("T"));
}

#[test]
fn settings_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = dir.path().join("trajcat.toml");
    fs::write(&file, "catalogs = \"/srv/catalogs\"\nlog = \"debug\"\n").expect("write settings");
    let settings = Settings::load(Some(&file)).expect("settings ok");
    assert_eq!(settings.catalogs, Some(PathBuf::from("/srv/catalogs")));
    assert_eq!(settings.log, "debug");
    assert_eq!(settings.install_dir, PathBuf::from(trajcat::settings::DEFAULT_INSTALL_DIR));

    let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, CatalogError::Settings(_)), "got {err:?}");
}
