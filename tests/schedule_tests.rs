use chrono::{NaiveDate, NaiveDateTime};
use parkeasy::schedule::{ScheduleError, Span, parse_timestamp};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn span(start: NaiveDateTime, end: NaiveDateTime) -> Span {
    Span::new(start, end).unwrap()
}

// --- Parsing ---

#[test]
fn test_parse_datetime_local_forms() {
    let expected = at(1, 9, 30);
    assert_eq!(parse_timestamp("2025-03-01T09:30").unwrap(), expected);
    assert_eq!(parse_timestamp("2025-03-01T09:30:00").unwrap(), expected);
    assert_eq!(parse_timestamp("2025-03-01 09:30").unwrap(), expected);
    assert_eq!(parse_timestamp(" 2025-03-01 09:30:00 ").unwrap(), expected);
}

#[test]
fn test_parse_rfc3339_folds_offset_into_utc() {
    assert_eq!(
        parse_timestamp("2025-03-01T11:30:00+02:00").unwrap(),
        at(1, 9, 30)
    );
    assert_eq!(parse_timestamp("2025-03-01T09:30:00Z").unwrap(), at(1, 9, 30));
}

#[test]
fn test_parse_rejects_garbage() {
    assert_eq!(
        parse_timestamp("tomorrow"),
        Err(ScheduleError::InvalidTimestamp("tomorrow".to_string()))
    );
    assert!(parse_timestamp("").is_err());
}

#[test]
fn test_span_requires_end_after_start() {
    assert_eq!(
        Span::new(at(1, 10, 0), at(1, 10, 0)),
        Err(ScheduleError::EmptySpan)
    );
    assert_eq!(
        Span::parse("2025-03-01T12:00", "2025-03-01T11:00"),
        Err(ScheduleError::EmptySpan)
    );
    assert!(Span::parse("2025-03-01T10:00", "2025-03-01T11:00").is_ok());
}

// --- Conflicts ---

#[test]
fn test_overlapping_spans_conflict() {
    let existing = span(at(1, 10, 0), at(1, 12, 0));

    // starts inside
    assert!(span(at(1, 11, 0), at(1, 13, 0)).conflicts_with(&existing));
    // ends inside
    assert!(span(at(1, 9, 0), at(1, 11, 0)).conflicts_with(&existing));
    // swallows the existing booking
    assert!(span(at(1, 8, 0), at(1, 14, 0)).conflicts_with(&existing));
    // sits within it
    assert!(span(at(1, 10, 30), at(1, 11, 30)).conflicts_with(&existing));
}

#[test]
fn test_touching_endpoints_conflict() {
    let existing = span(at(1, 10, 0), at(1, 12, 0));
    assert!(span(at(1, 12, 0), at(1, 13, 0)).conflicts_with(&existing));
    assert!(span(at(1, 9, 0), at(1, 10, 0)).conflicts_with(&existing));
}

#[test]
fn test_disjoint_spans_do_not_conflict() {
    let existing = span(at(1, 10, 0), at(1, 12, 0));
    assert!(!span(at(1, 12, 1), at(1, 13, 0)).conflicts_with(&existing));
    assert!(!span(at(2, 10, 0), at(2, 12, 0)).conflicts_with(&existing));
}
