use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::core::dispatch::DigestDispatcher;

/// Daily wall-clock time in a fixed UTC offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

impl Schedule {
    pub fn new(time: NaiveTime, offset: FixedOffset) -> Self {
        Schedule { time, offset }
    }

    /// Next instant strictly after `now` at which the digest is due.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_today = now.with_timezone(&self.offset).date_naive();
        let today = self.fire_on(local_today);
        if today > now {
            today
        } else {
            self.fire_on(local_today + Duration::days(1))
        }
    }

    /// Like [`Schedule::next_fire_after`], but never returns a slot at or
    /// before `last_fire`, even if the wall clock has stepped back since.
    pub fn next_fire_following(
        &self,
        now: DateTime<Utc>,
        last_fire: Option<DateTime<Utc>>,
    ) -> DateTime<Utc> {
        let reference = last_fire.map_or(now, |last| now.max(last));
        self.next_fire_after(reference)
    }

    fn fire_on(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(self.time);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }

    /// The calendar day before `now`'s local date.
    pub fn yesterday(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive() - Duration::days(1)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (UTC{})", self.time.format("%H:%M"), self.offset)
    }
}

/// Fires the digest once per day. A fire missed while the process was down is skipped.
pub struct Scheduler {
    schedule: Schedule,
    dispatcher: Arc<DigestDispatcher>,
}

impl Scheduler {
    pub fn new(schedule: Schedule, dispatcher: Arc<DigestDispatcher>) -> Self {
        Scheduler {
            schedule,
            dispatcher,
        }
    }

    pub async fn run(self) {
        let mut last_fire = None;
        loop {
            let now = Utc::now();
            let next = self.schedule.next_fire_following(now, last_fire);
            info!(next_run = %next.with_timezone(&self.schedule.offset), "Daily digest scheduled");

            match (next - now).to_std() {
                Ok(wait) => sleep(wait).await,
                Err(e) => warn!(error = %e, "Negative wait until next digest, running now"),
            }

            last_fire = Some(next);
            let report = self.dispatcher.run_daily_digest().await;
            info!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed.len(),
                pruned = report.pruned,
                "Daily digest finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moscow_nine() -> Schedule {
        Schedule::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            FixedOffset::east_opt(3 * 3600).unwrap(),
        )
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_next_fire_later_today() {
        let next = moscow_nine().next_fire_after(utc("2024-01-15T04:30:00Z"));
        assert_eq!(next, utc("2024-01-15T06:00:00Z"));
    }

    #[test]
    fn test_next_fire_rolls_to_tomorrow() {
        let schedule = moscow_nine();
        assert_eq!(
            schedule.next_fire_after(utc("2024-01-15T06:00:00Z")),
            utc("2024-01-16T06:00:00Z"),
            "Exactly at fire time should schedule the next day"
        );
        assert_eq!(
            schedule.next_fire_after(utc("2024-01-15T20:00:00Z")),
            utc("2024-01-16T06:00:00Z")
        );
    }

    #[test]
    fn test_next_fire_uses_local_date() {
        // 22:30 UTC on the 15th is already the 16th in UTC+3
        let next = moscow_nine().next_fire_after(utc("2024-01-15T22:30:00Z"));
        assert_eq!(next, utc("2024-01-16T06:00:00Z"));
    }

    #[test]
    fn test_next_fire_negative_offset() {
        let schedule = Schedule::new(
            NaiveTime::from_hms_opt(7, 15, 0).unwrap(),
            FixedOffset::west_opt(5 * 3600).unwrap(),
        );
        let next = schedule.next_fire_after(utc("2024-03-01T03:00:00Z"));
        assert_eq!(next, utc("2024-03-01T12:15:00Z"));
    }

    #[test]
    fn test_early_wake_does_not_fire_twice() {
        let schedule = moscow_nine();
        let fired = utc("2024-01-15T06:00:00Z");
        // Clock reads slightly before the slot that just ran
        let now = utc("2024-01-15T05:59:59.700Z");

        assert_eq!(schedule.next_fire_after(now), fired);
        assert_eq!(
            schedule.next_fire_following(now, Some(fired)),
            utc("2024-01-16T06:00:00Z")
        );
        assert_eq!(schedule.next_fire_following(now, None), fired);
    }

    #[test]
    fn test_yesterday_follows_local_date() {
        let schedule = moscow_nine();
        assert_eq!(
            schedule.yesterday(utc("2024-01-15T06:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
        );
        assert_eq!(
            schedule.yesterday(utc("2024-01-14T22:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
        );
        assert_eq!(
            schedule.yesterday(utc("2024-03-01T06:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(moscow_nine().to_string(), "09:00 (UTC+03:00)");
    }
}
