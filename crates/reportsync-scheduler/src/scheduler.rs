//! Daily job registry driven by an injected clock.
//!
//! Each job fires once when the wall clock reaches its next run time and is
//! then pushed to the same time on the following day. Runs missed while the
//! scheduler was down are not caught up.
//!
//! A plain minute poll over `tick(now)` stands in for a cron scheduler such as
//! `tokio-cron-scheduler` so the clock can be supplied by tests.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use reportsync_core::{ReportKind, ScheduleConfig};

use crate::dispatch::Dispatcher;

/// How often the run loop checks for due jobs.
pub(crate) const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DailyJob {
    pub at: NaiveTime,
    pub report: ReportKind,
    next_run: NaiveDateTime,
}

impl DailyJob {
    /// First occurrence of `at` that is not earlier than `now`.
    fn new(at: NaiveTime, report: ReportKind, now: NaiveDateTime) -> Self {
        let today = now.date().and_time(at);
        let next_run = if today < now {
            today + TimeDelta::days(1)
        } else {
            today
        };
        Self {
            at,
            report,
            next_run,
        }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_run
    }

    /// Move to the first occurrence of `at` strictly after `now`.
    fn advance(&mut self, now: NaiveDateTime) {
        let mut next = now.date().and_time(self.at);
        while next <= now {
            next += TimeDelta::days(1);
        }
        self.next_run = next;
    }
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    jobs: Vec<DailyJob>,
}

impl Scheduler {
    pub fn new(schedule: &ScheduleConfig, now: NaiveDateTime) -> Self {
        let jobs = vec![
            DailyJob::new(schedule.analytics_at, ReportKind::Analytics, now),
            DailyJob::new(schedule.best_selling_at, ReportKind::BestSelling, now),
        ];
        Self { jobs }
    }

    pub fn jobs(&self) -> &[DailyJob] {
        &self.jobs
    }

    /// Dispatch every job due at `now` and reschedule it. Returns how many
    /// jobs were due. A failed dispatch is logged and still rescheduled.
    pub fn tick<D: Dispatcher>(&mut self, now: NaiveDateTime, dispatcher: &D) -> usize {
        let mut due = 0;
        for job in self.jobs.iter_mut().filter(|job| job.is_due(now)) {
            due += 1;
            if let Err(e) = dispatcher.dispatch(job.report) {
                tracing::error!(report = %job.report, error = %e, "failed to dispatch pipeline");
            }
            job.advance(now);
            tracing::debug!(report = %job.report, next_run = %job.next_run, "rescheduled job");
        }
        due
    }

    /// Tick against the local wall clock every [`TICK_INTERVAL`], forever.
    pub async fn run<D: Dispatcher>(&mut self, dispatcher: &D) {
        loop {
            self.tick(Local::now().naive_local(), dispatcher);
            tokio::time::sleep(TICK_INTERVAL).await;
        }
    }
}
