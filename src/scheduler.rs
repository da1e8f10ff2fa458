// src/scheduler.rs
//! Time-of-day trigger for delivery runs: a coarse 60 s poll over the
//! configured "HH:MM" entries, with a per-entry guard so one entry cannot
//! double-fire inside its minute.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use tokio::task::JoinHandle;
use tracing::info;

use crate::delivery::Courier;

/// Due-detection state. Pure — the tick loop feeds it wall-clock readings,
/// tests feed it whatever they like.
pub struct NotificationSchedule {
    times: Vec<NaiveTime>,
    last_fired: Vec<Option<NaiveDateTime>>,
}

impl NotificationSchedule {
    pub fn new(times: Vec<NaiveTime>) -> Self {
        let last_fired = vec![None; times.len()];
        Self { times, last_fired }
    }

    /// How many entries become due at `now`. An entry is due when the
    /// current hour:minute matches and it has not already fired within
    /// this same calendar minute.
    pub fn due(&mut self, now: NaiveDateTime) -> usize {
        let mut due = 0;
        for (i, t) in self.times.iter().enumerate() {
            if now.hour() != t.hour() || now.minute() != t.minute() {
                continue;
            }
            let already = self.last_fired[i].is_some_and(|prev| {
                prev.date() == now.date()
                    && prev.hour() == now.hour()
                    && prev.minute() == now.minute()
            });
            if already {
                continue;
            }
            self.last_fired[i] = Some(now);
            due += 1;
        }
        due
    }
}

/// Spawn the trigger task: tick every 60 s, run the courier once per due
/// entry. Runs are sequential within the task; no guard exists against a
/// run still being in flight when the next entry comes due.
pub fn spawn_notification_scheduler(
    courier: Arc<Courier>,
    times: Vec<NaiveTime>,
) -> JoinHandle<()> {
    info!(entries = times.len(), "notification scheduler starting");
    tokio::spawn(async move {
        let mut schedule = NotificationSchedule::new(times);
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let now = chrono::Local::now().naive_local();
            for _ in 0..schedule.due(now) {
                let report = courier.run_once().await;
                info!(
                    delivered = report.delivered,
                    skipped = report.skipped,
                    "scheduled run finished"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn fires_once_per_minute_despite_repeated_polls() {
        let t = NaiveTime::from_hms_opt(8, 30, 0).unwrap();
        let mut s = NotificationSchedule::new(vec![t]);
        assert_eq!(s.due(at(8, 30, 2)), 1);
        assert_eq!(s.due(at(8, 30, 40)), 0); // same minute, already fired
        assert_eq!(s.due(at(8, 31, 5)), 0); // minute passed
    }

    #[test]
    fn fires_again_next_day() {
        let t = NaiveTime::from_hms_opt(8, 30, 0).unwrap();
        let mut s = NotificationSchedule::new(vec![t]);
        assert_eq!(s.due(at(8, 30, 2)), 1);
        let next_day = NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(8, 30, 1)
            .unwrap();
        assert_eq!(s.due(next_day), 1);
    }

    #[test]
    fn distinct_entries_in_one_minute_both_fire() {
        let t = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        let mut s = NotificationSchedule::new(vec![t, t]);
        assert_eq!(s.due(at(19, 0, 30)), 2);
    }

    #[test]
    fn off_minute_is_never_due() {
        let t = NaiveTime::from_hms_opt(7, 15, 0).unwrap();
        let mut s = NotificationSchedule::new(vec![t]);
        assert_eq!(s.due(at(7, 14, 59)), 0);
        assert_eq!(s.due(at(7, 16, 0)), 0);
    }
}
