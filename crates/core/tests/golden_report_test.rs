// Golden end-to-end tests: access log in, JSON report out.
// Reports are compared byte for byte since the layout is part of the contract.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use visit_report_core::record::{format_record, URI_PREFIX};
use visit_report_core::{
    run, JsonVisitFile, NoVisits, RunConfig, RunError, ScanError, SourceVisit, StaticVisits,
};

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new(records: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("access.log");
        let output = dir.path().join("report.json");
        let log: String = records
            .iter()
            .map(|(slug, ts)| format_record(slug, ts))
            .collect();
        fs::write(&input, log).unwrap();
        fs::create_dir(dir.path().join("scratch")).unwrap();
        Self { dir, input, output }
    }

    fn config(&self, workers: usize) -> RunConfig {
        RunConfig {
            workers,
            read_chunk: 512,
            temp_dir: self.scratch(),
            ..RunConfig::default()
        }
    }

    fn scratch(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    fn report(&self) -> String {
        fs::read_to_string(&self.output).unwrap()
    }
}

fn scratch_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn golden_two_paths() {
    let fx = Fixture::new(&[
        ("p/alpha", "2020-01-05T10:00:00+00:00"),
        ("p/beta", "2020-01-06T11:30:00+00:00"),
        ("p/alpha", "2020-01-05T23:59:59+00:00"),
    ]);

    let summary = run(&fx.input, &fx.output, &mut NoVisits, &fx.config(2)).unwrap();
    assert_eq!(summary.records, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.paths, 2);

    let expected = concat!(
        "{\n",
        "    \"\\/blog\\/p\\/alpha\": {\n",
        "        \"2020-01-05\": 2\n",
        "    },\n",
        "    \"\\/blog\\/p\\/beta\": {\n",
        "        \"2020-01-06\": 1\n",
        "    }\n",
        "}"
    );
    assert_eq!(fx.report(), expected);
    assert!(scratch_is_empty(&fx.scratch()));
}

#[test]
fn golden_report_parses_as_nested_object() {
    let fx = Fixture::new(&[
        ("p/alpha", "2020-01-05T10:00:00+00:00"),
        ("p/alpha", "2020-01-05T10:00:00+00:00"),
        ("p/beta", "2020-01-06T10:00:00+00:00"),
    ]);
    run(&fx.input, &fx.output, &mut NoVisits, &fx.config(1)).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fx.report()).unwrap();
    let expected = serde_json::json!({
        "/blog/p/alpha": { "2020-01-05": 2 },
        "/blog/p/beta": { "2020-01-06": 1 },
    });
    assert_eq!(value, expected);
}

#[test]
fn golden_nested_slug_is_escaped() {
    let fx = Fixture::new(&[("p/sub/page", "2021-07-14T09:00:00+00:00")]);
    run(&fx.input, &fx.output, &mut NoVisits, &fx.config(1)).unwrap();
    assert!(fx.report().contains(r#""\/blog\/p\/sub\/page": {"#));
}

#[test]
fn golden_dates_follow_calendar_order() {
    let fx = Fixture::new(&[
        ("post", "2024-03-01T00:00:00+00:00"),
        ("post", "2020-12-31T00:00:00+00:00"),
        ("post", "2024-02-29T00:00:00+00:00"),
    ]);
    run(&fx.input, &fx.output, &mut NoVisits, &fx.config(3)).unwrap();

    let report = fx.report();
    let a = report.find("2020-12-31").unwrap();
    let b = report.find("2024-02-29").unwrap();
    let c = report.find("2024-03-01").unwrap();
    assert!(a < b && b < c);
}

#[test]
fn golden_ten_records_over_four_workers() {
    let slugs = ["a", "b", "c"];
    let records: Vec<(String, String)> = (0..10)
        .map(|i| {
            (
                slugs[i % 3].to_string(),
                format!("2022-05-{:02}T08:00:00+00:00", 1 + i % 4),
            )
        })
        .collect();
    let borrowed: Vec<(&str, &str)> = records
        .iter()
        .map(|(s, t)| (s.as_str(), t.as_str()))
        .collect();
    let fx = Fixture::new(&borrowed);

    run(&fx.input, &fx.output, &mut NoVisits, &fx.config(1)).unwrap();
    let single = fx.report();

    let summary = run(&fx.input, &fx.output, &mut NoVisits, &fx.config(4)).unwrap();
    assert_eq!(summary.ranges, 4);
    assert_eq!(summary.records, 10);
    assert_eq!(fx.report(), single);
}

#[test]
fn golden_rerun_is_byte_identical() {
    let fx = Fixture::new(&[
        ("zeta", "2023-01-01T00:00:00+00:00"),
        ("alpha", "2023-01-02T00:00:00+00:00"),
        ("zeta", "2023-01-03T00:00:00+00:00"),
        ("mid", "2023-01-01T00:00:00+00:00"),
    ]);
    let visits = || {
        StaticVisits::new(vec![
            SourceVisit::new("https://stitcher.io/blog/from-db").at("2023-01-04T00:00:00+00:00"),
        ])
    };

    run(&fx.input, &fx.output, &mut visits(), &fx.config(3)).unwrap();
    let first = fs::read(&fx.output).unwrap();
    run(&fx.input, &fx.output, &mut visits(), &fx.config(3)).unwrap();
    let second = fs::read(&fx.output).unwrap();

    assert_eq!(first, second);
    // First-seen order, not alphabetical.
    let text = String::from_utf8(first).unwrap();
    assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
    assert!(text.find("mid").unwrap() < text.find("from-db").unwrap());
}

#[test]
fn golden_malformed_lines_are_skipped() {
    let fx = Fixture::new(&[("good", "2020-02-02T00:00:00+00:00")]);
    let mut log = fs::read_to_string(&fx.input).unwrap();
    log.push_str("garbage line\n");
    log.push_str(&format_record("good", "1999-02-02T00:00:00+00:00"));
    log.push_str(&format_record("good", "2020-02-03T00:00:00+00:00"));
    fs::write(&fx.input, log).unwrap();

    let summary = run(&fx.input, &fx.output, &mut NoVisits, &fx.config(2)).unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.skipped, 2);
}

#[test]
fn golden_non_utf8_slugs_never_share_a_key() {
    let fx = Fixture::new(&[]);
    let mut log = Vec::new();
    for slug in [&b"a\xff"[..], &b"a\xfe"[..], &b"a"[..]] {
        log.extend_from_slice(URI_PREFIX.as_bytes());
        log.extend_from_slice(slug);
        log.extend_from_slice(b",2020-01-05T00:00:00+00:00\n");
    }
    fs::write(&fx.input, log).unwrap();

    let summary = run(&fx.input, &fx.output, &mut NoVisits, &fx.config(1)).unwrap();
    assert_eq!(summary.records, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.report.paths, 1);

    // Every counted visit survives a round trip through a JSON parser.
    let value: serde_json::Value = serde_json::from_str(&fx.report()).unwrap();
    let total: u64 = value
        .as_object()
        .unwrap()
        .values()
        .flat_map(|dates| dates.as_object().unwrap().values())
        .map(|count| count.as_u64().unwrap())
        .sum();
    assert_eq!(total, summary.records);
}

#[test]
fn golden_empty_log() {
    let fx = Fixture::new(&[]);
    let summary = run(&fx.input, &fx.output, &mut NoVisits, &fx.config(4)).unwrap();
    assert_eq!(summary.records, 0);
    assert_eq!(fx.report(), "{}");
}

#[test]
fn golden_supplementary_visits_from_json_file() {
    let fx = Fixture::new(&[("logged", "2020-01-01T00:00:00+00:00")]);
    let visits = fx.dir.path().join("visits.json");
    fs::write(
        &visits,
        r#"[
            {"uri": "https://stitcher.io/blog/logged", "visitedAt": "2020-01-01T06:00:00+00:00"},
            {"uri": "https://stitcher.io/blog/only-in-db"},
            {"uri": "https://stitcher.io/blog/dated", "visitedAt": "2026-12-31T06:00:00+00:00"}
        ]"#,
    )
    .unwrap();

    let summary = run(
        &fx.input,
        &fx.output,
        &mut JsonVisitFile::new(&visits),
        &fx.config(1),
    )
    .unwrap();
    assert_eq!(summary.paths, 3);
    assert_eq!(summary.supplementary_folded, 2);

    let value: serde_json::Value = serde_json::from_str(&fx.report()).unwrap();
    assert_eq!(value["/blog/logged"]["2020-01-01"], 2);
    assert_eq!(value["/blog/dated"]["2026-12-31"], 1);
    // Interned but never visited on a known date.
    assert!(value.get("/blog/only-in-db").is_none());
}

#[test]
fn golden_unknown_path_fails_without_report() {
    let mut records = vec![("early", "2020-01-01T00:00:00+00:00"); 20];
    records.push(("late", "2020-01-02T00:00:00+00:00"));
    let fx = Fixture::new(&records);
    let config = RunConfig {
        discover_bytes: 200,
        ..fx.config(1)
    };

    let err = run(&fx.input, &fx.output, &mut NoVisits, &config).unwrap_err();
    match err {
        RunError::Scan(ScanError::UnknownPath { slug, offset, .. }) => {
            assert_eq!(slug, "late");
            assert_eq!(offset, fs::metadata(&fx.input).unwrap().len() - 52 - 4);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!fx.output.exists());
}

#[test]
fn golden_failed_worker_fails_without_report() {
    let fx = Fixture::new(&[
        ("a", "2020-01-01T00:00:00+00:00"),
        ("b", "2020-01-01T00:00:00+00:00"),
        ("c", "2020-01-01T00:00:00+00:00"),
    ]);
    let config = RunConfig {
        temp_dir: fx.dir.path().join("missing"),
        ..fx.config(3)
    };

    let err = run(&fx.input, &fx.output, &mut NoVisits, &config).unwrap_err();
    assert!(matches!(err, RunError::WorkerFailed { .. }), "got {err}");
    assert!(!fx.output.exists());
}

#[test]
fn golden_invalid_config_is_rejected() {
    let fx = Fixture::new(&[("a", "2020-01-01T00:00:00+00:00")]);
    let config = RunConfig {
        read_chunk: 8,
        ..fx.config(1)
    };
    let err = run(&fx.input, &fx.output, &mut NoVisits, &config).unwrap_err();
    assert!(matches!(err, RunError::InvalidConfig(_)));
    assert!(!fx.output.exists());
}
