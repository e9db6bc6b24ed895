//! Cooperative fixed-interval scheduler.
//!
//! A [`Scheduler`] holds an explicit list of `(interval, job)` pairs registered
//! once at startup. A single loop asks it for the next due job, runs that job
//! to completion, and asks again, so jobs never overlap.
//!
//! # Timing
//!
//! A job first fires one full interval after the scheduler is created, then
//! one interval after each time it was last picked up. Over a window
//! `(start, start + T]` a job with interval `I` whose runs start on time fires
//! `floor(T / I)` times, the end boundary included. A job picked up late moves
//! its own following runs back by the same amount; missed runs are never
//! replayed.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Something that runs the jobs a [`Scheduler`] hands out.
pub trait JobHandler<J> {
    fn run_job(&mut self, job: J) -> impl Future<Output = ()>;
}

/// A registered job and its timing state.
#[derive(Debug, Clone)]
pub struct ScheduledJob<J> {
    pub job: J,
    pub interval: Duration,
    last_run: Option<Instant>,
    next_run: Instant,
    runs: u64,
}

impl<J> ScheduledJob<J> {
    /// When this job is next due.
    pub fn next_run(&self) -> Instant {
        self.next_run
    }

    /// When this job was last handed out.
    pub fn last_run(&self) -> Option<Instant> {
        self.last_run
    }

    /// How many times this job has been handed out.
    pub fn runs(&self) -> u64 {
        self.runs
    }
}

/// Fixed set of interval jobs polled by one cooperative loop.
#[derive(Debug)]
pub struct Scheduler<J> {
    start: Instant,
    jobs: Vec<ScheduledJob<J>>,
}

impl<J: Copy + Debug> Scheduler<J> {
    /// Create an empty scheduler whose clock starts now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create an empty scheduler with an explicit start instant.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            jobs: Vec::new(),
        }
    }

    /// Register a job. Zero intervals are clamped to one millisecond.
    pub fn every(mut self, interval: Duration, job: J) -> Self {
        self.add(interval, job);
        self
    }

    /// Register a job in place.
    pub fn add(&mut self, interval: Duration, job: J) {
        let interval = interval.max(Duration::from_millis(1));
        self.jobs.push(ScheduledJob {
            job,
            interval,
            last_run: None,
            next_run: self.start + interval,
            runs: 0,
        });
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn jobs(&self) -> &[ScheduledJob<J>] {
        &self.jobs
    }

    /// Earliest instant at which any job is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.jobs.iter().map(|j| j.next_run).min()
    }

    /// Return the first job (in registration order) due at `now`, marking it run.
    pub fn poll_due(&mut self, now: Instant) -> Option<J> {
        let entry = self.jobs.iter_mut().find(|j| j.next_run <= now)?;

        entry.runs += 1;
        entry.last_run = Some(now);
        entry.next_run = now + entry.interval;

        tracing::trace!(job = ?entry.job, runs = entry.runs, "Job due");
        Some(entry.job)
    }

    /// Wait until a job is due and return it.
    ///
    /// Pending forever when no jobs are registered. Cancel-safe: a job is only
    /// marked run when it is returned.
    pub async fn next_due(&mut self) -> J {
        loop {
            if let Some(job) = self.poll_due(Instant::now()) {
                return job;
            }

            match self.next_deadline() {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Run due jobs through `handler` until `deadline` (inclusive).
    pub async fn run_until<H: JobHandler<J>>(&mut self, deadline: Instant, handler: &mut H) {
        loop {
            if let Some(job) = self.poll_due(Instant::now()) {
                handler.run_job(job).await;
                continue;
            }

            match self.next_deadline() {
                Some(next) if next <= deadline => tokio::time::sleep_until(next).await,
                _ => {
                    tokio::time::sleep_until(deadline).await;
                    // Catch jobs landing exactly on the deadline.
                    while let Some(job) = self.poll_due(Instant::now().min(deadline)) {
                        handler.run_job(job).await;
                    }
                    return;
                }
            }
        }
    }
}

impl<J: Copy + Debug> Default for Scheduler<J> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Job {
        Heartbeat,
        Telemetry,
    }

    #[derive(Default)]
    struct Counter {
        heartbeats: usize,
        telemetry: usize,
        order: Vec<(Job, Duration)>,
        start: Option<Instant>,
        job_cost: Duration,
    }

    impl JobHandler<Job> for Counter {
        async fn run_job(&mut self, job: Job) {
            if let Some(start) = self.start {
                self.order.push((job, Instant::now().duration_since(start)));
            }
            match job {
                Job::Heartbeat => self.heartbeats += 1,
                Job::Telemetry => self.telemetry += 1,
            }
            if !self.job_cost.is_zero() {
                tokio::time::sleep(self.job_cost).await;
            }
        }
    }

    #[test]
    fn test_first_run_after_one_interval() {
        let start = Instant::now();
        let mut scheduler = Scheduler::starting_at(start).every(Duration::from_secs(10), Job::Heartbeat);

        assert_eq!(scheduler.poll_due(start), None);
        assert_eq!(scheduler.poll_due(start + Duration::from_secs(9)), None);
        assert_eq!(
            scheduler.poll_due(start + Duration::from_secs(10)),
            Some(Job::Heartbeat)
        );
        assert_eq!(scheduler.poll_due(start + Duration::from_secs(10)), None);
        assert_eq!(scheduler.jobs()[0].runs(), 1);
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let start = Instant::now();
        let mut scheduler = Scheduler::starting_at(start)
            .every(Duration::from_secs(10), Job::Heartbeat)
            .every(Duration::from_secs(20), Job::Telemetry);

        let at = start + Duration::from_secs(20);
        assert_eq!(scheduler.poll_due(at), Some(Job::Heartbeat));
        assert_eq!(scheduler.poll_due(at), Some(Job::Telemetry));
        // Heartbeat at 10s was missed, not replayed.
        assert_eq!(scheduler.poll_due(at), None);
    }

    #[test]
    fn test_late_pickup_delays_next_run() {
        let start = Instant::now();
        let mut scheduler = Scheduler::starting_at(start).every(Duration::from_secs(10), Job::Heartbeat);

        let late = start + Duration::from_secs(35);
        assert_eq!(scheduler.poll_due(late), Some(Job::Heartbeat));
        assert_eq!(scheduler.jobs()[0].last_run(), Some(late));
        assert_eq!(
            scheduler.jobs()[0].next_run(),
            start + Duration::from_secs(45)
        );
        assert_eq!(scheduler.poll_due(start + Duration::from_secs(44)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixty_second_window() {
        let mut scheduler = Scheduler::new()
            .every(Duration::from_secs(10), Job::Heartbeat)
            .every(Duration::from_secs(20), Job::Telemetry);
        let deadline = scheduler.start() + Duration::from_secs(60);

        let mut counter = Counter::default();
        scheduler.run_until(deadline, &mut counter).await;

        assert_eq!(counter.heartbeats, 6);
        assert_eq!(counter.telemetry, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_never_overlap() {
        let mut scheduler = Scheduler::new()
            .every(Duration::from_secs(10), Job::Heartbeat)
            .every(Duration::from_secs(20), Job::Telemetry);
        let start = scheduler.start();

        let mut counter = Counter {
            start: Some(start),
            job_cost: Duration::from_secs(1),
            ..Counter::default()
        };
        scheduler
            .run_until(start + Duration::from_secs(20), &mut counter)
            .await;

        // The telemetry job waits for the heartbeat that is due at the same time.
        assert_eq!(
            counter.order,
            vec![
                (Job::Heartbeat, Duration::from_secs(10)),
                (Job::Heartbeat, Duration::from_secs(20)),
                (Job::Telemetry, Duration::from_secs(21)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_due_waits() {
        let mut scheduler = Scheduler::new().every(Duration::from_secs(10), Job::Telemetry);
        let start = scheduler.start();

        let job = scheduler.next_due().await;
        assert_eq!(job, Job::Telemetry);
        assert!(Instant::now() >= start + Duration::from_secs(10));
    }
}
