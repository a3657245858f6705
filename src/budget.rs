//! Shared wall-clock budget for one source's run.
//!
//! A run that discovers more work mid-flight (more oracle batches than
//! anticipated) extends its own ceiling with [`DeadlineBudget::shift`]
//! instead of being killed prematurely; the orchestrator enforces the
//! ceiling through [`DeadlineBudget::wait_expired`]. The budget is owned by
//! exactly one run and shared by reference between the orchestrator and the
//! pipeline.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct DeadlineBudget {
    deadline: Mutex<Instant>,
}

impl DeadlineBudget {
    pub fn new(ceiling: Duration) -> Self {
        Self {
            deadline: Mutex::new(Instant::now() + ceiling),
        }
    }

    /// Extends the deadline forward by `extra`. Never moves it backward.
    pub fn shift(&self, extra: Duration) {
        let mut deadline = self.deadline.lock().expect("budget lock");
        *deadline += extra;
    }

    pub fn deadline(&self) -> Instant {
        *self.deadline.lock().expect("budget lock")
    }

    pub fn remaining(&self) -> Duration {
        self.deadline().saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Resolves once the deadline passes. Re-arms after every shift, so a
    /// budget extended mid-wait never fires early.
    pub async fn wait_expired(&self) {
        loop {
            let target = self.deadline();
            sleep_until(target).await;
            if self.deadline() <= Instant::now() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn shift_extends_forward_only() {
        let budget = DeadlineBudget::new(Duration::from_secs(10));
        let before = budget.deadline();
        budget.shift(Duration::from_secs(5));
        assert_eq!(budget.deadline(), before + Duration::from_secs(5));
        assert!(!budget.expired());
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_ceiling() {
        let budget = DeadlineBudget::new(Duration::from_millis(50));
        assert!(!budget.expired());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(budget.expired());
        assert_eq!(budget.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_expired_rearms_after_shift() {
        let budget = Arc::new(DeadlineBudget::new(Duration::from_millis(100)));

        let shifter = {
            let budget = budget.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                budget.shift(Duration::from_millis(100));
            })
        };

        let start = Instant::now();
        budget.wait_expired().await;
        let waited = start.elapsed();
        shifter.await.expect("shifter task");

        assert!(waited >= Duration::from_millis(200), "waited {waited:?}");
    }
}
