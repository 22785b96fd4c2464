use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use teloxide::types::UserId;
use tokio_util::sync::CancellationToken;

/// Per-user count of delivered quiz batches. Lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct UsageCounters {
    inner: Arc<Mutex<HashMap<UserId, u64>>>,
}

impl UsageCounters {
    pub fn increment(&self, user: UserId) -> u64 {
        let mut counts = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let count = counts.entry(user).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, user: UserId) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .copied()
            .unwrap_or(0)
    }
}

/// Shared state handed to every handler and generation task.
#[derive(Debug, Clone)]
pub struct QuizContext {
    pub admin: UserId,
    pub support_contact: Option<String>,
    pub generation_timeout: Duration,
    pub usage: UsageCounters,
    pub shutdown: CancellationToken,
}

impl QuizContext {
    pub fn new(admin: UserId, support_contact: Option<String>, generation_timeout: Duration) -> Self {
        Self {
            admin,
            support_contact,
            generation_timeout,
            usage: UsageCounters::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        user == self.admin
    }
}
