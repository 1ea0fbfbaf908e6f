use assert_matches::assert_matches;
use sheet_merge::config::{MergeConfig, MergeMode, SheetNameMode};
use sheet_merge::merge::MERGED_SHEET_NAME;
use sheet_merge::{
    HeaderMismatchPolicy, MergeEngine, MergeError, PROVENANCE_COLUMN, SourceDescriptor, preview_merge,
    run_merge,
};
use std::path::PathBuf;

mod support;
use support::builders::fill_table;
use support::{TestWorkspace, cell_text, open, sheet_names};

fn plain_config() -> MergeConfig {
    MergeConfig {
        keep_styles: false,
        keep_colors: false,
        keep_cell_format: false,
        keep_column_width: false,
        ..MergeConfig::default()
    }
}

fn sales_book(ws: &TestWorkspace, name: &str, sheet: &str, rows: usize) -> PathBuf {
    let data: Vec<Vec<String>> = (0..rows)
        .map(|i| vec![format!("{name}-{i}"), format!("{}", (i + 1) * 10)])
        .collect();
    ws.create_sheet(name, sheet, |s| fill_table(s, "A1", &["Name", "Amount"], &data))
}

#[test]
fn single_mode_concatenates_with_provenance() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 5);
    let b = sales_book(&ws, "b.xlsx", "Sheet1", 5);
    let dest = ws.path("merged.xlsx");

    let result = run_merge(
        &[
            SourceDescriptor::new(&a, "Sheet1"),
            SourceDescriptor::new(&b, "Sheet1"),
        ],
        &plain_config(),
        &dest,
        HeaderMismatchPolicy::Abort,
    );
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.sheets.len(), 1);
    assert_eq!(result.sheets[0].rows, 10);
    assert_eq!(result.sheets[0].columns, 3);

    let book = open(&dest);
    assert_eq!(sheet_names(&book), vec![MERGED_SHEET_NAME]);
    let sheet = book.get_sheet_by_name(MERGED_SHEET_NAME).unwrap();
    assert_eq!(cell_text(sheet, "A1"), "Name");
    assert_eq!(cell_text(sheet, "B1"), "Amount");
    assert_eq!(cell_text(sheet, "C1"), PROVENANCE_COLUMN);
    for row in 2..=6 {
        assert_eq!(cell_text(sheet, &format!("C{row}")), "a.xlsx");
    }
    for row in 7..=11 {
        assert_eq!(cell_text(sheet, &format!("C{row}")), "b.xlsx");
    }
    assert_eq!(cell_text(sheet, "A7"), "b.xlsx-0");
    assert_eq!(cell_text(sheet, "A12"), "");
}

#[test]
fn keep_header_only_controls_the_output_header_row() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 2);
    let b = sales_book(&ws, "b.xlsx", "Sheet1", 2);
    let sources = [
        SourceDescriptor::new(&a, "Sheet1"),
        SourceDescriptor::new(&b, "Sheet1"),
    ];

    let with_header = ws.path("with.xlsx");
    let result = run_merge(&sources, &plain_config(), &with_header, HeaderMismatchPolicy::Abort);
    assert_eq!(result.sheets[0].rows, 4);

    let without_header = ws.path("without.xlsx");
    let config = MergeConfig {
        keep_header: false,
        ..plain_config()
    };
    let result = run_merge(&sources, &config, &without_header, HeaderMismatchPolicy::Abort);
    assert_eq!(result.sheets[0].rows, 4);

    let book = open(&with_header);
    let sheet = book.get_sheet_by_name(MERGED_SHEET_NAME).unwrap();
    assert_eq!(cell_text(sheet, "A1"), "Name");
    assert_eq!(cell_text(sheet, "A5"), "b.xlsx-1");

    let book = open(&without_header);
    let sheet = book.get_sheet_by_name(MERGED_SHEET_NAME).unwrap();
    assert_eq!(cell_text(sheet, "A1"), "a.xlsx-0");
    assert_eq!(cell_text(sheet, "A4"), "b.xlsx-1");
    assert_eq!(cell_text(sheet, "A5"), "");
}

#[test]
fn custom_name_applies_to_single_sheet() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 1);
    let dest = ws.path("out.xlsx");
    let config = MergeConfig {
        sheet_name_mode: SheetNameMode::Custom,
        custom_sheet_name: "Q1/Q2 [all]".to_string(),
        ..plain_config()
    };

    let result = run_merge(&[SourceDescriptor::new(&a, "Sheet1")], &config, &dest, HeaderMismatchPolicy::Abort);
    assert!(result.success);
    assert_eq!(sheet_names(&open(&dest)), vec!["Q1_Q2 _all_"]);
}

#[test]
fn multiple_mode_names_sheets_after_files() {
    let ws = TestWorkspace::new();
    let jan = sales_book(&ws, "Jan.xlsx", "Sheet1", 3);
    let feb = sales_book(&ws, "Feb.xlsx", "Sheet1", 2);
    let dest = ws.path("months.xlsx");
    let config = MergeConfig {
        merge_mode: MergeMode::Multiple,
        ..plain_config()
    };

    let result = run_merge(
        &[
            SourceDescriptor::new(&jan, "Sheet1"),
            SourceDescriptor::new(&feb, "Sheet1"),
        ],
        &config,
        &dest,
        HeaderMismatchPolicy::Abort,
    );
    assert!(result.success, "{:?}", result.error);

    let book = open(&dest);
    assert_eq!(sheet_names(&book), vec!["Jan", "Feb"]);
    let feb_sheet = book.get_sheet_by_name("Feb").unwrap();
    assert_eq!(cell_text(feb_sheet, "A2"), "Feb.xlsx-0");
    assert_eq!(cell_text(feb_sheet, "C1"), "", "no provenance in multiple mode");
}

#[test]
fn original_names_are_deduplicated() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Report", 1);
    let b = sales_book(&ws, "b.xlsx", "Report", 1);
    let c = sales_book(&ws, "c.xlsx", "Report", 1);
    let dest = ws.path("reports.xlsx");
    let config = MergeConfig {
        merge_mode: MergeMode::Multiple,
        sheet_name_mode: SheetNameMode::Original,
        ..plain_config()
    };

    let result = run_merge(
        &[
            SourceDescriptor::new(&a, "Report"),
            SourceDescriptor::new(&b, "Report"),
            SourceDescriptor::new(&c, "Report"),
        ],
        &config,
        &dest,
        HeaderMismatchPolicy::Abort,
    );
    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        sheet_names(&open(&dest)),
        vec!["Report", "Report_1", "Report_2"]
    );
}

#[test]
fn custom_names_fall_back_to_file_stem() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "north.xlsx", "Sheet1", 1);
    let b = sales_book(&ws, "south.xlsx", "Sheet1", 1);
    let dest = ws.path("regions.xlsx");
    let config = MergeConfig {
        merge_mode: MergeMode::Multiple,
        sheet_name_mode: SheetNameMode::Custom,
        ..plain_config()
    };

    let result = run_merge(
        &[
            SourceDescriptor::new(&a, "Sheet1").with_custom_name("North*Region"),
            SourceDescriptor::new(&b, "Sheet1"),
        ],
        &config,
        &dest,
        HeaderMismatchPolicy::Abort,
    );
    assert!(result.success, "{:?}", result.error);
    assert_eq!(sheet_names(&open(&dest)), vec!["North_Region", "south"]);
}

#[test]
fn inconsistent_headers_abort_unless_caller_proceeds() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 2);
    let b = ws.create_sheet("b.xlsx", "Sheet1", |s| {
        fill_table(s, "A1", &["Name", "Total"], &[vec!["x", "5"]]);
    });
    let sources = [
        SourceDescriptor::new(&a, "Sheet1"),
        SourceDescriptor::new(&b, "Sheet1"),
    ];
    let engine = MergeEngine::new(plain_config()).unwrap();

    let dest = ws.path("abort.xlsx");
    let err = engine
        .run(&sources, &dest, HeaderMismatchPolicy::Abort)
        .unwrap_err();
    assert_matches!(&err, MergeError::HeaderInconsistency(report) if report.differences.len() == 1);
    assert!(err.to_string().contains("b.xlsx differs: Amount, Total"));
    assert!(!dest.exists());

    let prepared = engine.prepare(&sources).unwrap();
    assert!(!prepared.consistency().unwrap().is_consistent());
    let merged = prepared.merged_table().unwrap();
    assert_eq!(
        merged.columns(),
        ["Name", "Amount", "Total", PROVENANCE_COLUMN]
    );
    assert_eq!(merged.row_count(), 3);

    let dest = ws.path("proceed.xlsx");
    let result = engine
        .run(&sources, &dest, HeaderMismatchPolicy::Proceed)
        .unwrap();
    assert!(result.success);
    let book = open(&dest);
    let sheet = book.get_sheet_by_name(MERGED_SHEET_NAME).unwrap();
    assert_eq!(cell_text(sheet, "C4"), "5");
    assert_eq!(cell_text(sheet, "B4"), "");
}

#[test]
fn empty_sources_are_skipped_and_all_empty_is_no_data() {
    let ws = TestWorkspace::new();
    let empty = ws.create_sheet("empty.xlsx", "Sheet1", |s| {
        fill_table::<&str, Vec<&str>, &str>(s, "A1", &["Name", "Amount"], &[]);
    });
    let full = sales_book(&ws, "full.xlsx", "Sheet1", 2);

    let dest = ws.path("out.xlsx");
    let result = run_merge(
        &[
            SourceDescriptor::new(&empty, "Sheet1"),
            SourceDescriptor::new(&full, "Sheet1"),
        ],
        &plain_config(),
        &dest,
        HeaderMismatchPolicy::Abort,
    );
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.sheets[0].rows, 2);

    let dest = ws.path("nothing.xlsx");
    let result = run_merge(
        &[SourceDescriptor::new(&empty, "Sheet1")],
        &plain_config(),
        &dest,
        HeaderMismatchPolicy::Abort,
    );
    assert!(!result.success);
    assert_eq!(result.error_code.as_deref(), Some("NO_DATA"));
    assert!(!dest.exists());
}

#[test]
fn read_failure_aborts_before_writing() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 2);
    let dest = ws.path("out.xlsx");

    let result = run_merge(
        &[
            SourceDescriptor::new(&a, "Sheet1"),
            SourceDescriptor::new(&a, "Missing"),
        ],
        &plain_config(),
        &dest,
        HeaderMismatchPolicy::Abort,
    );
    assert!(!result.success);
    assert_eq!(result.error_code.as_deref(), Some("RANGE_READ"));
    let message = result.error.unwrap();
    assert!(message.contains("a.xlsx") && message.contains("Missing"), "{message}");
    assert!(!dest.exists());
}

#[test]
fn invalid_range_and_destination_fail_fast() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 1);
    let sources = [SourceDescriptor::new(&a, "Sheet1")];

    let config = MergeConfig {
        start_row: "9".into(),
        end_row: "3".into(),
        ..plain_config()
    };
    let result = run_merge(&sources, &config, &ws.path("out.xlsx"), HeaderMismatchPolicy::Abort);
    assert_eq!(result.error_code.as_deref(), Some("INVALID_RANGE"));

    let result = run_merge(&sources, &plain_config(), &ws.path("out.csv"), HeaderMismatchPolicy::Abort);
    assert_eq!(result.error_code.as_deref(), Some("WRITE_FAILED"));

    let nested = ws.root().join("missing").join("out.xlsx");
    let result = run_merge(&sources, &plain_config(), &nested, HeaderMismatchPolicy::Abort);
    assert_eq!(result.error_code.as_deref(), Some("WRITE_FAILED"));
}

#[test]
fn source_without_sheet_uses_first_sheet() {
    let ws = TestWorkspace::new();
    let path = ws.create_workbook("book.xlsx", &["First", "Second"], |book| {
        let sheet = book.get_sheet_by_name_mut("First").unwrap();
        fill_table(sheet, "A1", &["Name"], &[vec!["from-first"]]);
    });
    let engine = MergeEngine::new(plain_config()).unwrap();

    let table = engine
        .preview_merged(
            &[SourceDescriptor {
                path,
                sheet: None,
                custom_name: None,
            }],
            None,
        )
        .unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.columns(), ["Name", PROVENANCE_COLUMN]);
}

#[test]
fn preview_merged_ignores_mode_and_limits_rows() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 4);
    let b = sales_book(&ws, "b.xlsx", "Sheet1", 4);
    let engine = MergeEngine::new(MergeConfig {
        merge_mode: MergeMode::Multiple,
        ..plain_config()
    })
    .unwrap();

    let table = engine
        .preview_merged(
            &[
                SourceDescriptor::new(&a, "Sheet1"),
                SourceDescriptor::new(&b, "Sheet1"),
            ],
            Some(6),
        )
        .unwrap();
    assert_eq!(table.row_count(), 6);
    assert_eq!(table.columns().last().map(String::as_str), Some(PROVENANCE_COLUMN));
}

#[test]
fn auto_names_differing_only_in_case_are_deduplicated() {
    let ws = TestWorkspace::new();
    std::fs::create_dir(ws.path("sub")).expect("sub dir");
    let lower = sales_book(&ws, "report.xlsx", "Sheet1", 1);
    let upper = sales_book(&ws, "sub/Report.xlsx", "Sheet1", 1);
    let dest = ws.path("out.xlsx");
    let config = MergeConfig {
        merge_mode: MergeMode::Multiple,
        ..plain_config()
    };

    let result = run_merge(
        &[
            SourceDescriptor::new(&lower, "Sheet1"),
            SourceDescriptor::new(&upper, "Sheet1"),
        ],
        &config,
        &dest,
        HeaderMismatchPolicy::Abort,
    );
    assert!(result.success, "{:?}", result.error);
    assert_eq!(sheet_names(&open(&dest)), vec!["report", "Report_1"]);
}

#[test]
fn style_capture_failure_still_writes_unstyled_output() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 2);
    let dest = ws.path("out.xlsx");
    let engine = MergeEngine::new(MergeConfig::default()).unwrap();

    let prepared = engine
        .prepare(&[SourceDescriptor::new(&a, "Sheet1")])
        .unwrap();
    std::fs::remove_file(&a).expect("remove style source");

    let result = prepared.write(&dest).expect("write without styles");
    assert!(result.success);
    assert!(result.style_issues.is_empty());
    assert_eq!(result.sheets[0].rows, 2);

    let book = open(&dest);
    let sheet = book.get_sheet_by_name(MERGED_SHEET_NAME).unwrap();
    assert_eq!(cell_text(sheet, "A1"), "Name");
    assert_eq!(cell_text(sheet, "A2"), "a.xlsx-0");
    let header_bold = sheet
        .get_cell("A1")
        .and_then(|cell| cell.get_style().get_font().map(|font| *font.get_bold()))
        .unwrap_or(false);
    assert!(!header_bold, "template styles must not be applied");
}

#[test]
fn preview_merge_carries_the_table_in_the_result() {
    let ws = TestWorkspace::new();
    let a = sales_book(&ws, "a.xlsx", "Sheet1", 3);
    let b = sales_book(&ws, "b.xlsx", "Sheet1", 3);
    let sources = [
        SourceDescriptor::new(&a, "Sheet1"),
        SourceDescriptor::new(&b, "Sheet1"),
    ];

    let result = preview_merge(&sources, &plain_config(), Some(4));
    assert!(result.success, "{:?}", result.error);
    assert!(result.output.is_none());
    let table = result.preview.expect("preview table");
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.columns(), ["Name", "Amount", PROVENANCE_COLUMN]);

    let failed = preview_merge(&[SourceDescriptor::new(ws.path("ghost.xlsx"), "Sheet1")], &plain_config(), None);
    assert!(!failed.success);
    assert!(failed.preview.is_none());
    assert_eq!(failed.error_code.as_deref(), Some("RANGE_READ"));
}
