//! Daily triggers for crawls and dumps
//!
//! Trigger times are wall-clock UTC.

use crate::config::ScheduleConfig;
use crate::jobs::JobRunner;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fires once a day at a fixed hour and minute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    time: NaiveTime,
}

impl DailyTrigger {
    /// `None` for an hour above 23 or a minute above 59
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { time })
    }

    /// First firing strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(self.time));
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Crawl,
    Dump,
}

/// Runs the crawl and dump triggers until shut down
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts both triggers
    ///
    /// Returns `None` when scheduling is disabled.
    pub fn start(runner: JobRunner, config: &ScheduleConfig) -> Option<Self> {
        if !config.enabled {
            tracing::info!("[Scheduler] Scheduling disabled");
            return None;
        }

        let (shutdown, _) = watch::channel(false);
        let mut handles = Vec::new();

        for (job, hour, minute) in [
            (Job::Crawl, config.crawl_hour, config.crawl_minute),
            (Job::Dump, config.dump_hour, config.dump_minute),
        ] {
            let Some(trigger) = DailyTrigger::new(hour, minute) else {
                tracing::error!("[Scheduler] Invalid {:?} time {:02}:{:02}", job, hour, minute);
                continue;
            };
            tracing::info!("[Scheduler] {:?} scheduled daily at {:02}:{:02} UTC", job, hour, minute);
            handles.push(tokio::spawn(run_trigger(
                job,
                trigger,
                runner.clone(),
                shutdown.subscribe(),
            )));
        }

        Some(Self { shutdown, handles })
    }

    /// Stops the triggers; jobs already started keep running
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!("[Scheduler] Trigger task ended abnormally: {}", e);
            }
        }
        tracing::info!("[Scheduler] Stopped");
    }
}

async fn run_trigger(
    job: Job,
    trigger: DailyTrigger,
    runner: JobRunner,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let now = Utc::now();
        let next = trigger.next_after(now);
        let delay = (next - now).to_std().unwrap_or_default();
        tracing::debug!("[Scheduler] Next {:?} at {}", job, next);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                tracing::info!("[Scheduler] Running scheduled {:?}", job);
                match job {
                    Job::Crawl => drop(runner.spawn_crawl()),
                    Job::Dump => drop(runner.spawn_dump()),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
