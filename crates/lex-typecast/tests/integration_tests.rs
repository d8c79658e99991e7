//! Integration tests for the type inference and override pipelines.
//!
//! These tests run the public pipelines end to end over the files in
//! `tests/fixtures`.

use lex_typecast::{
    ComplexPolicy, ConversionOutput, FallbackPolicy, InferenceConfig, InferencePipeline,
    OverrideOutcome, OverridePipeline, SemanticType, TabularSource, TypecastError,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(filename: &str) -> TabularSource {
    TabularSource::from_path(fixtures_path().join(filename)).expect("Failed to read fixture")
}

fn infer(source: &TabularSource) -> ConversionOutput {
    InferencePipeline::builder()
        .build()
        .unwrap()
        .run(source)
        .expect("Inference failed")
}

fn infer_with(config: InferenceConfig, source: &TabularSource) -> ConversionOutput {
    InferencePipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(source)
        .expect("Inference failed")
}

fn override_with(source: &TabularSource, types: &str) -> ConversionOutput {
    OverridePipeline::builder()
        .build()
        .unwrap()
        .run(source, types)
        .expect("Override run failed")
}

fn csv_text(output: &ConversionOutput) -> String {
    String::from_utf8(output.csv().to_vec()).expect("Output is not UTF-8")
}

fn header(output: &ConversionOutput) -> Vec<String> {
    output.columns().iter().map(|c| c.name.clone()).collect()
}

// ============================================================================
// Inference Tests
// ============================================================================

#[test]
fn test_infer_mixed_csv() {
    let output = infer(&load_fixture("sales.csv"));

    let expected = "\
id(int8),active(boolean),verified(boolean),region(category),Revenue(float32),signup(datetime64),impedance(complex128),notes(object),score(float64)
1,True,True,North,100.5,2021-01-05,(1+2j),first order,10.0
2,False,False,South,200.25,2021-02-11,(3-1j),late delivery,20.0
3,True,True,East,50.0,2021-03-02,2j,,30.0
4,True,,North,75.75,2021-04-18,(1.5+0.5j),gift,
5,False,False,South,120.0,2021-05-23,(4+0j),repeat customer,50.0
6,True,True,East,99.99,2021-06-30,(-2-2j),bulk,60.0
7,False,True,North,310.4,2021-07-07,(5+0j),discount,70.0
8,True,False,South,15.5,2021-08-14,0.5j,returned,80.0
9,False,True,East,42.0,2021-09-09,(7-3j),vip,90.0
10,True,False,North,88.8,2021-10-31,(100+1j),referral,100.0
";
    assert_eq!(csv_text(&output), expected);
}

#[test]
fn test_infer_reports_claiming_detector() {
    let output = infer(&load_fixture("sales.csv"));

    let claims: Vec<(&str, Option<&str>)> = output
        .columns()
        .iter()
        .map(|c| (c.source_name.as_str(), c.claimed_by.as_deref()))
        .collect();
    assert_eq!(
        claims,
        vec![
            ("id", Some("numeric")),
            ("active", Some("numeric")),
            ("verified", Some("boolean")),
            ("region", Some("categorical")),
            ("Revenue(usd)", Some("numeric")),
            ("signup", Some("datetime")),
            ("impedance", Some("complex")),
            ("notes", None),
            ("score", Some("numeric")),
        ]
    );

    let verified = &output.columns()[2];
    assert_eq!(verified.semantic_type, SemanticType::Boolean);
    assert_eq!(verified.missing, 1);
    assert!(output.columns().iter().all(|c| c.length == 10));
}

#[test]
fn test_infer_smallest_integer_width() {
    let source = TabularSource::new("widths.csv", "a,b,c\n1,1,1\n2,300,70000\n3,2,3\n");
    let output = infer(&source);
    assert_eq!(header(&output), vec!["a(int8)", "b(int16)", "c(int32)"]);
}

#[test]
fn test_infer_header_only_csv() {
    let output = infer(&TabularSource::new("empty.csv", "a,b\n"));
    assert_eq!(csv_text(&output), "a(object),b(object)\n");
}

#[test]
fn test_blank_lines_are_not_rows() {
    let output = infer(&TabularSource::new("trailing.csv", "x\n1.5\n2.5\n\n"));
    assert_eq!(csv_text(&output), "x(float32)\n1.5\n2.5\n");

    let output = infer(&TabularSource::new("middle.csv", "x,y\n1.5,a\n\n2.5,b\n"));
    assert_eq!(csv_text(&output), "x(float32),y(object)\n1.5,a\n2.5,b\n");

    let output = infer(&TabularSource::new("windows.csv", "x,y\r\n1.5,a\r\n\r\n2.5,b\r\n\r\n"));
    assert_eq!(csv_text(&output), "x(float32),y(object)\n1.5,a\n2.5,b\n");
}

#[test]
fn test_separator_only_row_is_missing_values() {
    let output = infer(&TabularSource::new("gaps.csv", "x,y\n1.5,a\n2.5,b\n,\n3.5,c\n"));
    assert_eq!(
        csv_text(&output),
        "x(float64),y(object)\n1.5,a\n2.5,b\n,\n3.5,c\n"
    );
}

#[test]
fn test_blank_and_repeated_headers() {
    let output = infer(&TabularSource::new("headers.csv", "a,,a\n1,2,3\n"));
    assert_eq!(
        csv_text(&output),
        "a(int8),Unnamed: 1(int8),a.1(int8)\n1,2,3\n"
    );
}

#[test]
fn test_unsupported_format_rejected() {
    let pipeline = InferencePipeline::builder().build().unwrap();
    let err = pipeline
        .run(&TabularSource::new("sales.json", "[]"))
        .unwrap_err();
    assert!(matches!(err, TypecastError::UnsupportedFormat(_)));
    assert!(err.is_rejected_input());

    // Suffix matching is case-sensitive
    let err = pipeline
        .run(&TabularSource::new("SALES.CSV", "a\n1\n"))
        .unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
}

// ============================================================================
// Complex Columns
// ============================================================================

#[test]
fn test_complex_masks_unparseable_values() {
    let output = infer(&load_fixture("complex_mixed.csv"));
    assert_eq!(
        csv_text(&output),
        "label(object),z(complex128)\na,(1+2j)\nb,3j\nc,(4+0j)\nd,\ne,(5-1j)\n"
    );
    assert_eq!(output.columns()[1].missing, 1);
}

#[test]
fn test_complex_drop_policy_pads_short_column() {
    let config = InferenceConfig::builder()
        .complex_policy(ComplexPolicy::DropUnparseable)
        .build()
        .unwrap();
    let output = infer_with(config, &load_fixture("complex_mixed.csv"));

    // The dropped value shifts the rest of the column up; the last row is padded.
    assert_eq!(
        csv_text(&output),
        "label(object),z(complex128)\na,(1+2j)\nb,3j\nc,(4+0j)\nd,(5-1j)\ne,\n"
    );
    assert_eq!(output.columns()[1].length, 4);
    assert_eq!(output.columns()[0].length, 5);
}

#[test]
fn test_complex_below_threshold_stays_text() {
    let source = TabularSource::new("z.csv", "z\n1+2j\nabc\nxyz\n3j\n");
    let output = infer(&source);
    assert_eq!(csv_text(&output), "z(object)\n1+2j\nabc\nxyz\n3j\n");
}

// ============================================================================
// Spreadsheet Input
// ============================================================================

#[test]
fn test_infer_xlsx_first_sheet() {
    let output = infer(&load_fixture("orders.xlsx"));

    let expected = "\
name(object),qty(int8),price(float32),joined(datetime64),active(boolean)
alice,1,9.5,2021-01-01,True
bob,2,10.0,2021-01-02,False
carol,3,12.25,2021-01-03,True
dave,4,8.0,2021-01-04,True
";
    assert_eq!(csv_text(&output), expected);
    // Date cells are typed at load time, so no detector claims them
    assert_eq!(output.columns()[3].claimed_by, None);
}

#[test]
fn test_corrupt_xlsx_fails_to_load() {
    let pipeline = InferencePipeline::builder().build().unwrap();
    let err = pipeline
        .run(&TabularSource::new("broken.xlsx", b"not a zip".to_vec()))
        .unwrap_err();
    assert_eq!(err.error_code(), "XLSX_ERROR");
    assert!(!err.is_rejected_input());
}

// ============================================================================
// Override Tests
// ============================================================================

#[test]
fn test_override_renames_with_requested_type() {
    let output = override_with(
        &load_fixture("sales.csv"),
        r#"{"Revenue(usd)": "float64", "id": "object", "region": "object"}"#,
    );

    let names = header(&output);
    assert_eq!(names[0], "id(object)");
    assert_eq!(names[3], "region(object)");
    assert_eq!(names[4], "Revenue(float64)");
    // Untouched columns keep their inferred type
    assert_eq!(names[5], "signup(datetime64)");

    let report = output.overrides().unwrap();
    assert_eq!(report.applied_count(), 3);
}

#[test]
fn test_override_failed_integer_cast_zero_fills() {
    let output = override_with(&load_fixture("sales.csv"), r#"{"Revenue(usd)": "int16"}"#);

    let report = output.overrides().unwrap();
    assert!(matches!(
        report.entries[0].outcome,
        OverrideOutcome::FellBack { .. }
    ));

    let revenue: Vec<String> = csv_text(&output)
        .lines()
        .map(|line| line.split(',').nth(4).unwrap().to_string())
        .collect();
    assert_eq!(
        revenue,
        vec![
            "Revenue(int16)",
            "100",
            "200",
            "50",
            "75",
            "120",
            "99",
            "310",
            "15",
            "42",
            "88"
        ]
    );
}

#[test]
fn test_override_unknown_column_is_skipped() {
    let output = override_with(
        &load_fixture("complex_mixed.csv"),
        r#"{"missing": "int8", "label": "category"}"#,
    );
    let report = output.overrides().unwrap();
    assert_eq!(report.entries[0].outcome, OverrideOutcome::ColumnNotFound);
    assert_eq!(report.entries[1].outcome, OverrideOutcome::Applied);
    assert_eq!(header(&output), vec!["label(category)", "z(complex128)"]);
}

#[test]
fn test_override_unsupported_label_rejected() {
    let pipeline = OverridePipeline::builder().build().unwrap();
    let err = pipeline
        .run(&load_fixture("sales.csv"), r#"{"id": "uint128"}"#)
        .unwrap_err();
    match err {
        TypecastError::UnsupportedTypeLabel { column, label } => {
            assert_eq!(column, "id");
            assert_eq!(label, "uint128");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_override_malformed_json_rejected() {
    let pipeline = OverridePipeline::builder().build().unwrap();
    let source = load_fixture("sales.csv");
    assert!(pipeline.run(&source, "{not json").is_err());
    let err = pipeline.run(&source, r#"["id", "int8"]"#).unwrap_err();
    assert!(matches!(err, TypecastError::InvalidOverrideMap(_)));
}

#[test]
fn test_sticky_fallback_policy() {
    let pipeline = OverridePipeline::builder()
        .config(
            InferenceConfig::builder()
                .fallback_policy(FallbackPolicy::Sticky)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    // No numeric override has succeeded yet, so the failed cast is left alone.
    let output = pipeline
        .run(&load_fixture("sales.csv"), r#"{"Revenue(usd)": "int16"}"#)
        .unwrap();
    let report = output.overrides().unwrap();
    assert!(matches!(
        report.entries[0].outcome,
        OverrideOutcome::Unchanged { .. }
    ));
    assert_eq!(header(&output)[4], "Revenue(float32)");

    // After a successful numeric override the same failure falls back.
    let output = pipeline
        .run(
            &load_fixture("sales.csv"),
            r#"{"id": "int64", "Revenue(usd)": "int16"}"#,
        )
        .unwrap();
    let report = output.overrides().unwrap();
    assert_eq!(report.entries[0].outcome, OverrideOutcome::Applied);
    assert!(matches!(
        report.entries[1].outcome,
        OverrideOutcome::FellBack { .. }
    ));
    assert_eq!(header(&output)[4], "Revenue(int16)");
}

// ============================================================================
// Re-inference
// ============================================================================

#[test]
fn test_override_durations_and_narrow_floats() {
    let output = override_with(
        &load_fixture("durations.csv"),
        r#"{"elapsed": "timedelta", "ratio": "float16"}"#,
    );
    let expected = "\
task(object),elapsed(timedelta64),ratio(float16)
build,1 days 00:00:00,0.1
test,0 days 02:00:00,0.25
deploy,0 days 00:30:00,0.5
review,0 days 00:45:00,0.75
";
    assert_eq!(csv_text(&output), expected);
}

#[test]
fn test_reinference_is_not_idempotent() {
    let first = override_with(
        &load_fixture("durations.csv"),
        r#"{"elapsed": "timedelta", "ratio": "float16"}"#,
    );
    let second = infer(&TabularSource::new("typed.csv", first.into_bytes()));

    // Durations come back as text and float16 widens to float32.
    assert_eq!(
        header(&second),
        vec!["task(object)", "elapsed(object)", "ratio(float32)"]
    );
    assert_eq!(second.columns()[1].source_name, "elapsed(timedelta64)");
}

#[test]
fn test_summary_serializes_to_json() {
    let output = override_with(&load_fixture("complex_mixed.csv"), r#"{"label": "object"}"#);
    let json = serde_json::to_value(&output).unwrap();

    assert_eq!(json["columns"][1]["name"], "z(complex128)");
    assert_eq!(json["columns"][1]["source_name"], "z");
    assert_eq!(json["overrides"]["entries"][0]["outcome"], "applied");
    assert_eq!(json["overrides"]["entries"][0]["requested"], "object");
    assert!(json.get("csv").is_none());
}
