// src/schedule.rs
//! Window scheduling: daily HH:MM boundaries, catch-up over missed
//! windows, and the dual bounded boundary searches.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// Boundary search scans at most this many calendar days in either
/// direction; exhaustion is a config problem, not a reason to fabricate
/// a boundary.
const MAX_SCAN_DAYS: i64 = 7;

/// A half-open capture interval `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Parse `"HH:MM"` boundary specs into a sorted, deduplicated list.
/// An empty list parses fine; the scheduler treats it as an invalid
/// schedule and yields no windows.
pub fn parse_boundaries(specs: &[String]) -> Result<Vec<NaiveTime>> {
    let mut out = Vec::with_capacity(specs.len());
    for s in specs {
        let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .with_context(|| format!("invalid schedule boundary `{}`", s))?;
        out.push(t);
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn at(date: chrono::NaiveDate, t: NaiveTime) -> Option<DateTime<Utc>> {
    Utc.from_local_datetime(&date.and_time(t)).single()
}

/// Next configured boundary strictly after `cursor`, scanning up to 7
/// following calendar days. `None` when no boundary exists in range.
pub fn next_boundary_after(cursor: DateTime<Utc>, boundaries: &[NaiveTime]) -> Option<DateTime<Utc>> {
    if boundaries.is_empty() {
        return None;
    }
    for day in 0..=MAX_SCAN_DAYS {
        let date = (cursor + Duration::days(day)).date_naive();
        for &t in boundaries {
            if let Some(candidate) = at(date, t) {
                if candidate > cursor {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// Dual of `next_boundary_after`: last boundary strictly before `cursor`.
pub fn prev_boundary_before(cursor: DateTime<Utc>, boundaries: &[NaiveTime]) -> Option<DateTime<Utc>> {
    if boundaries.is_empty() {
        return None;
    }
    for day in 0..=MAX_SCAN_DAYS {
        let date = (cursor - Duration::days(day)).date_naive();
        for &t in boundaries.iter().rev() {
            if let Some(candidate) = at(date, t) {
                if candidate < cursor {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    at(ts.date_naive(), NaiveTime::MIN).unwrap_or(ts)
}

/// Compute the ordered list of due windows.
///
/// The cursor anchors at the persisted pointer, or at the start of the
/// current day when there is no pointer or the pointer sits in the future
/// (clock skew). Each elapsed boundary closes one window; when any
/// boundary was due, a final partial window carries coverage up to `now`.
pub fn due_windows(
    now: DateTime<Utc>,
    last_end: Option<DateTime<Utc>>,
    boundaries: &[NaiveTime],
    max_catchup: usize,
) -> Vec<Window> {
    if boundaries.is_empty() || max_catchup == 0 {
        return Vec::new();
    }

    let mut cursor = match last_end {
        Some(ts) if ts <= now => ts,
        Some(_) | None => start_of_day(now),
    };

    let mut due = Vec::new();
    while due.len() < max_catchup {
        match next_boundary_after(cursor, boundaries) {
            Some(end) if end <= now => {
                due.push(Window { start: cursor, end });
                cursor = end;
            }
            _ => break,
        }
    }

    if !due.is_empty() && cursor < now && due.len() < max_catchup {
        due.push(Window { start: cursor, end: now });
    }

    due
}

/// Last boundary at or before `cursor`. A boundary hit exactly at
/// `cursor` counts as just closed, matching `due_windows`.
fn latest_boundary_at_or_before(
    cursor: DateTime<Utc>,
    boundaries: &[NaiveTime],
) -> Option<DateTime<Utc>> {
    if boundaries.is_empty() {
        return None;
    }
    for day in 0..=MAX_SCAN_DAYS {
        let date = (cursor - Duration::days(day)).date_naive();
        for &t in boundaries.iter().rev() {
            if let Some(candidate) = at(date, t) {
                if candidate <= cursor {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// The most recent fully elapsed window, independent of the catch-up
/// pointer. Used by the manual "capture latest window" operation.
pub fn latest_completed_window(
    now: DateTime<Utc>,
    boundaries: &[NaiveTime],
) -> Result<Window> {
    let end = latest_boundary_at_or_before(now, boundaries)
        .ok_or_else(|| anyhow!("no schedule boundary within {} days", MAX_SCAN_DAYS))?;
    let start = prev_boundary_before(end, boundaries)
        .ok_or_else(|| anyhow!("no schedule boundary within {} days", MAX_SCAN_DAYS))?;
    Ok(Window { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(specs: &[&str]) -> Vec<NaiveTime> {
        parse_boundaries(&specs.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    fn ts(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
    }

    #[test]
    fn parse_sorts_and_dedups() {
        let b = bounds(&["17:00", "08:00", "08:00"]);
        assert_eq!(b.len(), 2);
        assert_eq!(b[0], NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_boundaries(&["8am".to_string()]).is_err());
        assert!(parse_boundaries(&["25:00".to_string()]).is_err());
    }

    #[test]
    fn boundary_search_is_dual() {
        let b = bounds(&["08:00", "17:00"]);
        let next = next_boundary_after(ts(1, 17, 0), &b).unwrap();
        assert_eq!(next, ts(2, 8, 0));
        let prev = prev_boundary_before(next, &b).unwrap();
        assert_eq!(prev, ts(1, 17, 0));
    }

    #[test]
    fn boundary_search_crosses_sparse_days() {
        // one boundary per day still resolves across midnight
        let b = bounds(&["06:30"]);
        assert_eq!(next_boundary_after(ts(1, 7, 0), &b).unwrap(), ts(2, 6, 30));
        let prev = prev_boundary_before(ts(1, 6, 0), &b).unwrap();
        assert_eq!(prev, Utc.with_ymd_and_hms(2026, 2, 28, 6, 30, 0).unwrap());
    }

    #[test]
    fn empty_boundaries_never_fabricate() {
        assert!(next_boundary_after(ts(1, 7, 0), &[]).is_none());
        assert!(prev_boundary_before(ts(1, 7, 0), &[]).is_none());
        assert!(due_windows(ts(1, 9, 0), None, &[], 5).is_empty());
    }

    #[test]
    fn future_pointer_resets_to_start_of_day() {
        let b = bounds(&["08:00"]);
        let due = due_windows(ts(1, 9, 0), Some(ts(2, 8, 0)), &b, 5);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].start, ts(1, 0, 0));
        assert_eq!(due[0].end, ts(1, 8, 0));
        assert_eq!(due[1].end, ts(1, 9, 0));
    }

    #[test]
    fn catchup_cap_limits_windows() {
        let b = bounds(&["08:00", "17:00"]);
        // pointer five days back; cap at 3
        let due = due_windows(ts(6, 9, 0), Some(ts(1, 17, 0)), &b, 3);
        assert_eq!(due.len(), 3);
        assert_eq!(due[0].end, ts(2, 8, 0));
        assert_eq!(due[2].end, ts(3, 8, 0));
    }

    #[test]
    fn latest_completed_is_pointer_independent() {
        let b = bounds(&["08:00", "17:00"]);
        let w = latest_completed_window(ts(2, 9, 30), &b).unwrap();
        assert_eq!(w.start, ts(1, 17, 0));
        assert_eq!(w.end, ts(2, 8, 0));
    }

    #[test]
    fn boundary_instant_closes_its_own_window() {
        // a trigger exactly at 08:00 recaptures the window that just
        // closed, the same boundary due_windows would treat as elapsed
        let b = bounds(&["08:00", "17:00"]);
        let w = latest_completed_window(ts(2, 8, 0), &b).unwrap();
        assert_eq!(w.start, ts(1, 17, 0));
        assert_eq!(w.end, ts(2, 8, 0));
    }
}
