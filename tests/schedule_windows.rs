// tests/schedule_windows.rs
use chrono::{DateTime, TimeZone, Utc};
use feed_digest_curator::schedule::{due_windows, parse_boundaries};

fn ts(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, h, m, 0).unwrap()
}

#[test]
fn two_windows_after_an_overnight_gap() {
    // boundaries 08:00/17:00, pointer at day D 17:00, now = D+1 09:00
    let b = parse_boundaries(&["08:00".to_string(), "17:00".to_string()]).unwrap();
    let due = due_windows(ts(2, 9, 0), Some(ts(1, 17, 0)), &b, 10);

    assert_eq!(due.len(), 2);
    assert_eq!(due[0].start, ts(1, 17, 0));
    assert_eq!(due[0].end, ts(2, 8, 0));
    assert_eq!(due[1].start, ts(2, 8, 0));
    assert_eq!(due[1].end, ts(2, 9, 0));
}

#[test]
fn windows_are_increasing_and_non_overlapping() {
    let b = parse_boundaries(&["06:00".to_string(), "12:00".to_string(), "20:00".to_string()])
        .unwrap();
    let due = due_windows(ts(5, 13, 30), Some(ts(2, 20, 0)), &b, 20);
    assert!(!due.is_empty());
    for pair in due.windows(2) {
        assert_eq!(pair[0].end, pair[1].start, "windows must chain");
        assert!(pair[0].end > pair[0].start);
    }
    assert_eq!(due.last().unwrap().end, ts(5, 13, 30));
}

#[test]
fn no_pointer_anchors_at_start_of_day() {
    let b = parse_boundaries(&["08:00".to_string(), "17:00".to_string()]).unwrap();
    let due = due_windows(ts(2, 9, 0), None, &b, 10);
    assert_eq!(due[0].start, ts(2, 0, 0));
    assert_eq!(due[0].end, ts(2, 8, 0));
    assert_eq!(due.last().unwrap().end, ts(2, 9, 0));
}

#[test]
fn nothing_due_before_the_first_boundary() {
    let b = parse_boundaries(&["08:00".to_string(), "17:00".to_string()]).unwrap();
    // pointer at 08:00, now 08:30 → the 17:00 boundary has not elapsed
    let due = due_windows(ts(2, 8, 30), Some(ts(2, 8, 0)), &b, 10);
    assert!(due.is_empty());
}

#[test]
fn catchup_is_capped() {
    let b = parse_boundaries(&["08:00".to_string()]).unwrap();
    let due = due_windows(ts(20, 9, 0), Some(ts(1, 8, 0)), &b, 4);
    assert_eq!(due.len(), 4);
    assert_eq!(due[0].end, ts(2, 8, 0));
}
