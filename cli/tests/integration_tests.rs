use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../discovery/tests/fixtures")
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kicad-libdb"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run kicad-libdb")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn load_then_query_led_rgb() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");
    let libraries = fixtures().join("libraries");

    let out = run(&["load", path_str(&db), path_str(&libraries)]);
    assert!(out.status.success(), "load failed: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("Symbols inserted: 2"), "{text}");
    assert!(text.contains("Pins inserted: 7"), "{text}");
    assert!(text.contains("Footprints inserted: 3"), "{text}");
    assert!(text.contains("Skipped: 0"), "{text}");

    let out = run(&["query", "--db", path_str(&db), "LED_RGB"]);
    assert!(out.status.success(), "query failed: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("LED:LED_RGB (5 pins)"), "{text}");
    assert!(text.contains("GND"), "{text}");
    assert_eq!(text.matches("(alternate)").count(), 1, "{text}");
}

#[test]
fn load_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");
    let libraries = fixtures().join("libraries");

    let out = run(&[
        "load",
        path_str(&db),
        path_str(&libraries),
        "--schema",
        "normalized",
        "--json",
    ]);
    assert!(out.status.success(), "load failed: {}", stderr(&out));

    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("stdout should be JSON");
    assert_eq!(report["variant"], "normalized");
    assert_eq!(report["symbols_inserted"], 2);
    assert_eq!(report["properties_inserted"], 15);
    assert!(report["created_at"].is_string());
}

#[test]
fn load_skips_broken_files() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");

    let out = run(&[
        "load",
        path_str(&db),
        path_str(&fixtures().join("libraries")),
        path_str(&fixtures().join("broken")),
    ]);
    assert!(out.status.success(), "load failed: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("Skipped: 2"), "{text}");
    assert!(text.contains("Truncated.kicad_sym"), "{text}");
    assert!(stderr(&out).contains("Skipping"));
}

#[test]
fn load_aborts_on_consecutive_failures() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");

    let out = run(&[
        "load",
        path_str(&db),
        path_str(&fixtures().join("broken")),
        "--max-consecutive-failures",
        "1",
    ]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("error: Load failed"), "{}", stderr(&out));
    assert!(stderr(&out).contains("consecutive"));
}

#[test]
fn load_rejects_zero_failure_limit() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");

    let out = run(&[
        "load",
        path_str(&db),
        path_str(&fixtures().join("libraries")),
        "--max-consecutive-failures",
        "0",
    ]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("max-consecutive-failures"), "{}", stderr(&out));
    assert!(!db.exists());
}

#[test]
fn load_missing_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");
    let missing = dir.path().join("nowhere");

    let out = run(&["load", path_str(&db), path_str(&missing)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("is not a directory"), "{}", stderr(&out));
}

#[test]
fn load_requires_a_root() {
    let out = run(&["load", "libraries.db"]);
    assert!(!out.status.success());
}

#[test]
fn fresh_load_replaces_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");
    let libraries = fixtures().join("libraries");

    for _ in 0..2 {
        let out = run(&["load", path_str(&db), path_str(&libraries)]);
        assert!(out.status.success());
    }
    let out = run(&["migrate", "status", "--db", path_str(&db)]);
    assert!(stdout(&out).contains("Symbol count: 4"), "{}", stdout(&out));

    let out = run(&["load", path_str(&db), path_str(&libraries), "--fresh"]);
    assert!(out.status.success());
    let out = run(&["migrate", "status", "--db", path_str(&db)]);
    assert!(stdout(&out).contains("Symbol count: 2"), "{}", stdout(&out));
}

#[test]
fn config_file_selects_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");
    let config = dir.path().join("kicad-libdb.yml");
    fs::write(
        &config,
        "schema:\n  variant: normalized\n  prefix: kl_\nproperty_allowlist:\n  - Reference\n",
    )
    .unwrap();

    let out = run(&[
        "load",
        path_str(&db),
        path_str(&fixtures().join("libraries")),
        "--config",
        path_str(&config),
    ]);
    assert!(out.status.success(), "load failed: {}", stderr(&out));
    assert!(stdout(&out).contains("Properties inserted: 5"), "{}", stdout(&out));

    let out = run(&["migrate", "status", "--db", path_str(&db), "--prefix", "kl_"]);
    let text = stdout(&out);
    assert!(text.contains("Schema variant: normalized"), "{text}");
    assert!(text.contains("Property count: 2"), "{text}");
    assert!(!text.contains("Last load: never"), "{text}");

    let out = run(&["query", "--db", path_str(&db), "--prefix", "kl_", "LED%"]);
    assert!(stdout(&out).contains("LED:LED_Small (2 pins)"), "{}", stdout(&out));
}

#[test]
fn invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.yml");
    fs::write(&config, "schema: { variant: wide }\n").unwrap();

    let out = run(&[
        "migrate",
        "up",
        "--db",
        path_str(&dir.path().join("libraries.db")),
        "--config",
        path_str(&config),
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Failed to load config"));
}

#[test]
fn migrate_up_status_down() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");
    let db = path_str(&db);

    let out = run(&["migrate", "status", "--db", db]);
    assert!(stdout(&out).contains("Tables exist: no"));

    let out = run(&["migrate", "up", "--db", db, "--schema", "normalized"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let out = run(&["migrate", "status", "--db", db]);
    let text = stdout(&out);
    assert!(text.contains("Tables exist: yes"), "{text}");
    assert!(text.contains("Schema variant: normalized"), "{text}");
    assert!(text.contains("Last load: never"), "{text}");

    let out = run(&["migrate", "down", "--db", db]);
    assert!(out.status.success());
    let out = run(&["migrate", "status", "--db", db]);
    assert!(stdout(&out).contains("Tables exist: no"));
}

#[test]
fn migrate_up_rejects_variant_change() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");
    let db = path_str(&db);

    assert!(run(&["migrate", "up", "--db", db]).status.success());
    let out = run(&["migrate", "up", "--db", db, "--schema", "normalized"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("schema mismatch"), "{}", stderr(&out));
}

#[test]
fn invalid_prefix_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");

    let out = run(&["migrate", "up", "--db", path_str(&db), "--prefix", "x;drop"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("invalid prefix"));
}

#[test]
fn query_without_matches() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("libraries.db");
    let out = run(&["load", path_str(&db), path_str(&fixtures().join("libraries"))]);
    assert!(out.status.success());

    let out = run(&["query", "--db", path_str(&db), "Q_NPN%"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("No symbols match 'Q_NPN%'."));
}

#[test]
fn query_missing_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&["query", "--db", path_str(&dir.path().join("absent.db")), "R"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Failed to open database"));
}
