//! Integration tests for CLI command parsing and end-to-end runs
//!
//! Parsing tests need no database. The end-to-end tests index into a
//! temporary SQLite file and query it back through the binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command instance for the pipdb binary
fn pipdb() -> Command {
    let mut cmd = Command::cargo_bin("pipdb").unwrap();
    cmd.env_remove("PIPDB_DATABASE_URI").env_remove("PIPDB_CONFIG");
    cmd
}

fn database_uri(dir: &Path) -> String {
    format!("sqlite://?dsn={}", dir.join("places.db").display())
}

fn write_triangle(dir: &Path, id: i64) {
    let body = serde_json::json!({
        "type": "Feature",
        "properties": {
            "wof:id": id,
            "wof:name": "San Francisco",
            "wof:placetype": "locality",
            "wof:country": "US",
            "wof:lastmodified": 1750000000,
            "mz:is_current": 1
        },
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[-122.5, 37.7], [-122.3, 37.7], [-122.4, 37.9], [-122.5, 37.7]]]
        }
    });
    std::fs::write(dir.join(format!("{}.geojson", id)), body.to_string()).unwrap();
}

// ============================================================================
// Global Options Tests
// ============================================================================

mod global_options {
    use super::*;

    #[test]
    fn test_version_flag() {
        pipdb()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pipdb"));
    }

    #[test]
    fn test_help_flag() {
        pipdb()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"))
            .stdout(predicate::str::contains("index"))
            .stdout(predicate::str::contains("pip"))
            .stdout(predicate::str::contains("prune"));
    }

    #[test]
    fn test_no_arguments_shows_help() {
        pipdb().assert().failure().stderr(predicate::str::contains("Usage:"));
    }

    #[test]
    fn test_unknown_format_fails() {
        pipdb()
            .args(["--format", "yaml", "tables"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown output format"));
    }
}

// ============================================================================
// Command Parsing Tests
// ============================================================================

mod parsing {
    use super::*;

    #[test]
    fn test_pip_requires_coordinates() {
        pipdb().args(["pip", "--latitude", "37.7"]).assert().failure();
    }

    #[test]
    fn test_index_requires_paths() {
        pipdb().arg("index").assert().failure();
    }

    #[test]
    fn test_index_alternate_flags_conflict() {
        pipdb()
            .args(["index", "--alternates-only", "--exclude-alternates", "."])
            .assert()
            .failure();
    }

    #[test]
    fn test_purge_requires_confirmation() {
        pipdb()
            .args(["purge"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--yes"));
    }

    #[test]
    fn test_prune_requires_targets() {
        pipdb()
            .args(["prune"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nothing to prune"));
    }

    #[test]
    fn test_unknown_database_scheme() {
        pipdb()
            .args(["--database-uri", "postgis://?dsn=x", "pip", "--longitude=0", "--latitude=0"])
            .assert()
            .failure();
    }
}

// ============================================================================
// End-to-end Tests
// ============================================================================

mod end_to_end {
    use super::*;

    #[test]
    fn test_tables_lists_defaults() {
        pipdb()
            .arg("tables")
            .assert()
            .success()
            .stdout(predicate::str::contains("whosonfirst://"))
            .stdout(predicate::str::contains("geojson://"))
            .stdout(predicate::str::contains("rtree://"))
            .stdout(predicate::str::contains("spelunker://"));
    }

    #[test]
    fn test_index_then_query() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        write_triangle(&data, 100);
        let uri = database_uri(dir.path());

        pipdb()
            .args(["--database-uri", &uri, "index"])
            .arg(&data)
            .assert()
            .success()
            .stdout(predicate::str::contains("Indexed 1 documents"));

        pipdb()
            .args(["--database-uri", &uri, "--format", "json", "pip"])
            .args(["--longitude=-122.419", "--latitude=37.774"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"wof:id\": 100"));

        pipdb()
            .args(["--database-uri", &uri, "--format", "json", "pip"])
            .args(["--longitude=0", "--latitude=0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));

        pipdb()
            .args(["--database-uri", &uri, "read", "100.geojson"])
            .assert()
            .success()
            .stdout(predicate::str::contains("San Francisco"));
    }

    #[test]
    fn test_placetype_filter() {
        let dir = TempDir::new().unwrap();
        write_triangle(dir.path(), 100);
        let uri = database_uri(dir.path());

        pipdb()
            .args(["--database-uri", &uri, "index"])
            .arg(dir.path().join("100.geojson"))
            .assert()
            .success();

        pipdb()
            .args(["--database-uri", &uri, "--format", "json", "pip"])
            .args(["--longitude=-122.419", "--latitude=37.774", "--placetype", "county"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn test_modified_since_filter() {
        let dir = TempDir::new().unwrap();
        write_triangle(dir.path(), 100);
        let uri = database_uri(dir.path());

        pipdb()
            .args(["--database-uri", &uri, "index"])
            .arg(dir.path().join("100.geojson"))
            .assert()
            .success();

        pipdb()
            .args(["--database-uri", &uri, "--format", "json", "pip"])
            .args(["--longitude=-122.419", "--latitude=37.774", "--modified-since", "1700000000"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"wof:id\": 100"));

        pipdb()
            .args(["--database-uri", &uri, "--format", "json", "pip"])
            .args(["--longitude=-122.419", "--latitude=37.774", "--modified-since", "1800000000"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn test_index_reports_failed_documents() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("1.geojson"), "{not json").unwrap();
        let uri = database_uri(dir.path());

        pipdb()
            .args(["--database-uri", &uri, "index"])
            .arg(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("could not be indexed"));
    }

    #[test]
    fn test_remove_then_query() {
        let dir = TempDir::new().unwrap();
        write_triangle(dir.path(), 100);
        let uri = database_uri(dir.path());

        pipdb()
            .args(["--database-uri", &uri, "index"])
            .arg(dir.path())
            .assert()
            .success();

        pipdb()
            .args(["--database-uri", &uri, "remove", "100"])
            .assert()
            .success();

        pipdb()
            .args(["--database-uri", &uri, "read", "100"])
            .assert()
            .failure();
    }
}
