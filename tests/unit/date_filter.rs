//! Unit tests for the public date-range filter

use vantage_dataflow::filter_csv_by_date_range;
use vantage_dataflow::output::{filter_by_range, FilterError, FilterPolicy};
use vantage_dataflow::DateRange;

use crate::support::stub_server::daily_csv;

fn dates(csv: &str) -> Vec<String> {
    csv.lines()
        .skip(1)
        .filter_map(|line| line.split(',').next())
        .map(str::to_string)
        .collect()
}

#[test]
fn test_ten_days_filtered_to_five() {
    let filtered = filter_csv_by_date_range(&daily_csv(1, 10), "2024-01-03", "2024-01-07");
    assert_eq!(
        dates(&filtered),
        ["2024-01-03", "2024-01-04", "2024-01-05", "2024-01-06", "2024-01-07"]
    );
}

#[test]
fn test_single_day_range() {
    let filtered = filter_csv_by_date_range(&daily_csv(1, 10), "2024-01-10", "2024-01-10");
    assert_eq!(dates(&filtered), ["2024-01-10"]);
}

#[test]
fn test_filtering_is_idempotent() {
    let once = filter_csv_by_date_range(&daily_csv(1, 10), "2024-01-02", "2024-01-08");
    let twice = filter_csv_by_date_range(&once, "2024-01-02", "2024-01-08");
    assert_eq!(once, twice);
}

#[test]
fn test_column_order_and_values_preserved() {
    let csv = "timestamp,volume,close\n2024-01-02,000120,1.50\n2024-01-09,7,2.0\n";
    let filtered = filter_csv_by_date_range(csv, "2024-01-01", "2024-01-05");
    assert_eq!(filtered, "timestamp,volume,close\n2024-01-02,000120,1.50\n");
}

#[test]
fn test_header_only_input() {
    let csv = "timestamp,open,close\n";
    assert_eq!(filter_csv_by_date_range(csv, "2024-01-01", "2024-01-05"), csv);
}

#[test]
fn test_json_error_body_fails_open() {
    let body = "{\n    \"Error Message\": \"Invalid API call.\"\n}";
    assert_eq!(filter_csv_by_date_range(body, "2024-01-01", "2024-01-05"), body);
}

#[test]
fn test_ragged_rows_fail_open() {
    let csv = "timestamp,close\n2024-01-02,1,extra\n";
    assert_eq!(filter_csv_by_date_range(csv, "2024-01-01", "2024-01-05"), csv);
}

#[test]
fn test_strict_ragged_rows_report_csv_error() {
    let range = DateRange::parse("2024-01-01", "2024-01-05").unwrap();
    let err = filter_by_range("timestamp,close\n2024-01-02,1,extra\n", &range, FilterPolicy::Strict)
        .unwrap_err();
    assert!(matches!(err, FilterError::Csv(_)), "got {err:?}");
}

#[test]
fn test_crlf_input_normalized_to_lf() {
    let csv = "timestamp,close\r\n2024-01-02,1\r\n2024-01-09,2\r\n";
    let filtered = filter_csv_by_date_range(csv, "2024-01-01", "2024-01-05");
    assert_eq!(filtered, "timestamp,close\n2024-01-02,1\n");
}
