//! End-to-end runs over real files: fixtures in `specs/`, destinations in a
//! temporary directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tsv_pipelines::{
    ColumnReport, CompositeObserver, LogObserver, MalformedRecord, PipelineConfig, PipelineError,
    PipelineObserver, Record, RunSummary, Terminal, TsvPipeline, configure, copy,
};

fn spec_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("specs").join(name)
}

fn report_lines(summary: &RunSummary) -> Vec<String> {
    summary.reports.iter().map(ColumnReport::to_string).collect()
}

/// Run `pipe` over the fixture `origin`, returning the summary and the
/// destination's contents.
fn run_spec(origin: &str, pipe: &str) -> (RunSummary, String) {
    let text = fs::read_to_string(spec_path(pipe)).unwrap();
    let builder = PipelineConfig::builder(spec_path(origin)).unwrap();
    let config = configure(builder, &text).unwrap().done();

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("out.tsv");
    let summary = TsvPipeline::new(config).copy_to(&dest).unwrap();
    (summary, fs::read_to_string(&dest).unwrap())
}

fn write_origin(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("origin.tsv");
    fs::write(&path, contents).unwrap();
    path
}

#[derive(Default)]
struct Recording {
    malformed: Mutex<Vec<(usize, String)>>,
    reports: Mutex<Vec<String>>,
}

impl PipelineObserver for Recording {
    fn on_malformed(&self, line: usize, record: &Record, _reason: &MalformedRecord) {
        self.malformed.lock().unwrap().push((line, record.to_line()));
    }

    fn on_report(&self, report: &ColumnReport) {
        self.reports.lock().unwrap().push(report.to_string());
    }
}

macro_rules! spec_test {
    ($name:ident, $origin:literal, $pipe:literal, written: $written:expr, reports: [$($report:expr),* $(,)?]) => {
        #[test]
        fn $name() {
            let (summary, output) = run_spec($origin, $pipe);
            let expected: Vec<&str> = vec![$($report),*];
            assert_eq!(report_lines(&summary), expected);
            assert_eq!(summary.written, $written);
            assert_eq!(output.lines().count(), $written + 2);
        }
    };
}

spec_test!(spec_teens, "people.tsv", "teens.pipe", written: 3, reports: [
    "Name has a count of 3",
    "Age has a count of 3, an average of 18.666667, and a standard deviation of 0.942809",
]);

spec_test!(spec_zip, "people.tsv", "zip.pipe", written: 2, reports: [
    "Name has a max of Frank",
    "Age has a sum of 40",
]);

spec_test!(spec_firstdiff, "people.tsv", "firstdiff.pipe", written: 4, reports: [
    "Name has a min of Bob",
    "Age is not all the same",
    "Zip has a rogue item of 10025 that appears 1 times after first appearing in this record: Molly\t20\t10025",
]);

spec_test!(spec_nobody, "people.tsv", "nobody.pipe", written: 0, reports: [
    "Name has a min of undefined",
    "Age has a count of 0, an average of undefined, and a standard deviation of undefined",
    "Zip has a count of 0",
]);

spec_test!(spec_stats, "stats.tsv", "stats.pipe", written: 8, reports: [
    "Value has a count of 8, an average of 5.000000, and a standard deviation of 2.000000",
]);

#[test]
fn test_select_age_18_counts_frank() {
    let dir = TempDir::new().unwrap();
    let origin = write_origin(&dir, "Name\tAge\nstring\tlong\nFrank\t18\nMolly\t20\n");
    let dest = dir.path().join("out.tsv");

    let config = PipelineConfig::builder(&origin)
        .unwrap()
        .select_any("Age", [18])
        .unwrap()
        .compute("Name", Terminal::Count)
        .done();
    let summary = TsvPipeline::new(config).copy_to(&dest).unwrap();

    assert_eq!(
        fs::read_to_string(&dest).unwrap(),
        "Name\tAge\nstring\tlong\nFrank\t18\n"
    );
    assert_eq!(report_lines(&summary), vec!["Name has a count of 1"]);
}

#[test]
fn test_malformed_long_is_skipped_and_reported() {
    let dir = TempDir::new().unwrap();
    let origin = write_origin(
        &dir,
        "Name\tAge\nstring\tlong\nFrank\tabc\nMolly\t20\n",
    );
    let dest = dir.path().join("out.tsv");
    let observer = Arc::new(Recording::default());

    let config = PipelineConfig::builder(&origin)
        .unwrap()
        .compute("Age", Terminal::Sum)
        .done();
    let summary = TsvPipeline::new(config)
        .with_observer(observer.clone())
        .copy_to(&dest)
        .unwrap();

    assert_eq!(summary.malformed, 1);
    assert_eq!(
        *observer.malformed.lock().unwrap(),
        vec![(3, "Frank\tabc".to_string())]
    );
    assert_eq!(*observer.reports.lock().unwrap(), vec!["Age has a sum of 20"]);
    assert!(!fs::read_to_string(&dest).unwrap().contains("Frank"));
}

#[test]
fn test_composite_observer_reaches_every_sink() {
    let dir = TempDir::new().unwrap();
    let origin = write_origin(&dir, "Name\tAge\nstring\tlong\nFrank\tabc\nMolly\t20\n");
    let dest = dir.path().join("out.tsv");
    let first = Arc::new(Recording::default());
    let second = Arc::new(Recording::default());
    let observers: Vec<Arc<dyn PipelineObserver>> =
        vec![first.clone(), second.clone(), Arc::new(LogObserver)];

    let config = PipelineConfig::builder(&origin)
        .unwrap()
        .compute("Name", Terminal::Count)
        .done();
    TsvPipeline::new(config)
        .with_observer(Arc::new(CompositeObserver::new(observers)))
        .copy_to(&dest)
        .unwrap();

    for sink in [&first, &second] {
        assert_eq!(
            *sink.malformed.lock().unwrap(),
            vec![(3, "Frank\tabc".to_string())]
        );
        assert_eq!(*sink.reports.lock().unwrap(), vec!["Name has a count of 1"]);
    }
}

#[test]
fn test_copy_normalizes_crlf() {
    let dir = TempDir::new().unwrap();
    let origin = write_origin(&dir, "Name\tAge\r\nstring\tlong\r\nFrank\t18\r\n\r\nMolly\t20");
    let dest = dir.path().join("out.tsv");

    let summary = copy(&origin, &dest).unwrap();

    assert_eq!(
        fs::read_to_string(&dest).unwrap(),
        "Name\tAge\nstring\tlong\nFrank\t18\nMolly\t20\n"
    );
    assert_eq!(summary.records_read, 2);
    assert!(summary.reports.is_empty());
}

#[test]
fn test_tab_only_row_is_data() {
    let source = "A\tB\nstring\tstring\n\t\nx\ty\n";
    let dir = TempDir::new().unwrap();
    let origin = write_origin(&dir, source);
    let dest = dir.path().join("out.tsv");

    let config = PipelineConfig::builder(&origin)
        .unwrap()
        .compute("A", Terminal::Count)
        .done();
    let summary = TsvPipeline::new(config).copy_to(&dest).unwrap();

    assert_eq!(fs::read_to_string(&dest).unwrap(), source);
    assert_eq!(summary.records_read, 2);
    assert_eq!(report_lines(&summary), vec!["A has a count of 2"]);
}

#[test]
fn test_repeated_runs_start_fresh() {
    let pipe = fs::read_to_string(spec_path("teens.pipe")).unwrap();
    let builder = PipelineConfig::builder(spec_path("people.tsv")).unwrap();
    let pipeline = TsvPipeline::new(configure(builder, &pipe).unwrap().done());
    let dir = TempDir::new().unwrap();

    let first = pipeline.copy_to(dir.path().join("a.tsv")).unwrap();
    let second = pipeline.copy_to(dir.path().join("b.tsv")).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        fs::read(dir.path().join("a.tsv")).unwrap(),
        fs::read(dir.path().join("b.tsv")).unwrap()
    );
}

#[test]
fn test_headers_only_source() {
    let dir = TempDir::new().unwrap();
    let origin = write_origin(&dir, "Name\tAge\nstring\tlong\n");
    let dest = dir.path().join("out.tsv");

    let config = PipelineConfig::builder(&origin)
        .unwrap()
        .compute("Name", Terminal::Count)
        .compute("Age", Terminal::Max)
        .done();
    let summary = TsvPipeline::new(config).copy_to(&dest).unwrap();

    assert_eq!(fs::read_to_string(&dest).unwrap(), "Name\tAge\nstring\tlong\n");
    assert_eq!(
        report_lines(&summary),
        vec!["Name has a count of 0", "Age has a max of undefined"]
    );
}

#[test]
fn test_bad_schema_leaves_no_destination() {
    let cases = [
        "",
        "Name\tAge\nstring\n",
        "Name\tAge\nstring\tdouble\nFrank\t1.5\n",
    ];
    for contents in cases {
        let dir = TempDir::new().unwrap();
        let origin = write_origin(&dir, contents);
        let dest = dir.path().join("out.tsv");

        let err = copy(&origin, &dest).unwrap_err();
        assert!(
            matches!(err, PipelineError::Format { .. }),
            "{contents:?}: {err}"
        );
        assert!(!dest.exists(), "{contents:?} left a destination");
    }
}

#[test]
fn test_sum_over_string_column_fails_run() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("out.tsv");
    let config = PipelineConfig::builder(spec_path("people.tsv"))
        .unwrap()
        .compute("Name", Terminal::Sum)
        .done();

    let err = TsvPipeline::new(config).copy_to(&dest).unwrap_err();
    assert!(matches!(err, PipelineError::NumericType { .. }));
    assert!(err.to_string().contains("Frank"));
    assert!(!dest.exists());
}

#[test]
fn test_stats_over_extreme_longs_completes() {
    let dir = TempDir::new().unwrap();
    let max = i64::MAX;
    let origin = write_origin(&dir, &format!("V\nlong\n{max}\n{max}\n{max}\n"));
    let dest = dir.path().join("out.tsv");

    let config = PipelineConfig::builder(&origin)
        .unwrap()
        .compute("V", Terminal::Stats)
        .done();
    let summary = TsvPipeline::new(config).copy_to(&dest).unwrap();

    assert_eq!(summary.written, 3);
    assert!(
        summary.reports[0]
            .to_string()
            .starts_with("V has a count of 3, an average of 9223372036854775808.000000,")
    );
    assert_eq!(fs::read_to_string(&dest).unwrap().lines().count(), 5);
}

#[test]
fn test_missing_origin_fails_at_configuration() {
    let dir = TempDir::new().unwrap();
    let err = PipelineConfig::builder(dir.path().join("absent.tsv")).unwrap_err();
    assert!(matches!(err, PipelineError::SourceNotFound { .. }));
}
