//! Service runner for lifecycle management.
//!
//! A service goes through two states only: [`RunState::Disconnected`] until
//! its transport connects, then [`RunState::Running`] for the rest of the
//! process lifetime. While running, one loop drives the [`Scheduler`] and
//! reacts to interrupts according to an [`InterruptPolicy`].

use std::fmt::Debug;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio::sync::mpsc;

use crate::scheduler::{JobHandler, Scheduler};

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Before the transport connection succeeded.
    Disconnected,
    /// Scheduler active, ticks firing.
    Running,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Disconnected => write!(f, "disconnected"),
            RunState::Running => write!(f, "running"),
        }
    }
}

/// What to do when an interrupt (Ctrl+C) arrives while running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptPolicy {
    /// Log the interrupt and keep the loop running.
    #[default]
    Continue,
    /// Log the interrupt and return from the loop.
    Shutdown,
}

impl std::str::FromStr for InterruptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "shutdown" => Ok(Self::Shutdown),
            other => Err(format!(
                "unknown interrupt policy '{}', expected 'continue' or 'shutdown'",
                other
            )),
        }
    }
}

/// Forward every Ctrl+C to a channel for the lifetime of the process.
pub fn listen_for_interrupts() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(8);

    tokio::spawn(async move {
        loop {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            if tx.send(()).await.is_err() {
                return;
            }
        }
    });

    rx
}

/// Drive `scheduler` through `handler` until an interrupt stops it.
///
/// With [`InterruptPolicy::Continue`] this never returns. Jobs run to
/// completion; an interrupt arriving mid-job is seen once the job is done.
pub async fn drive<J, H>(
    name: &str,
    scheduler: &mut Scheduler<J>,
    handler: &mut H,
    policy: InterruptPolicy,
    interrupts: &mut mpsc::Receiver<()>,
) where
    J: Copy + Debug,
    H: JobHandler<J>,
{
    let mut listening = true;

    tracing::info!(
        service = %name,
        jobs = scheduler.jobs().len(),
        policy = ?policy,
        "Service running"
    );

    loop {
        tokio::select! {
            job = scheduler.next_due() => handler.run_job(job).await,
            signal = interrupts.recv(), if listening => match signal {
                Some(()) => match policy {
                    InterruptPolicy::Continue => {
                        tracing::info!(service = %name, "Interrupt received, continuing");
                    }
                    InterruptPolicy::Shutdown => {
                        tracing::info!(service = %name, "Interrupt received, shutting down");
                        return;
                    }
                },
                None => listening = false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Tick;

    #[derive(Default)]
    struct Count(usize);

    impl JobHandler<Tick> for Count {
        async fn run_job(&mut self, _job: Tick) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("continue".parse(), Ok(InterruptPolicy::Continue));
        assert_eq!("Shutdown".parse(), Ok(InterruptPolicy::Shutdown));
        assert!("stop".parse::<InterruptPolicy>().is_err());
        assert_eq!(InterruptPolicy::default(), InterruptPolicy::Continue);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_policy_returns() {
        let mut scheduler = Scheduler::new().every(Duration::from_secs(10), Tick);
        let mut count = Count::default();
        let (tx, mut rx) = mpsc::channel(1);

        let interrupter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(35)).await;
            tx.send(()).await.unwrap();
        });

        drive(
            "test",
            &mut scheduler,
            &mut count,
            InterruptPolicy::Shutdown,
            &mut rx,
        )
        .await;

        interrupter.await.unwrap();
        assert_eq!(count.0, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_policy_keeps_running() {
        let mut scheduler = Scheduler::new().every(Duration::from_secs(10), Tick);
        let mut count = Count::default();
        let (tx, mut rx) = mpsc::channel(1);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            let _ = tx.send(()).await;
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(60),
            drive(
                "test",
                &mut scheduler,
                &mut count,
                InterruptPolicy::Continue,
                &mut rx,
            ),
        )
        .await;

        // The loop only ends because the timeout cut it off.
        assert!(outcome.is_err());
        assert!(count.0 >= 5);
    }
}
