//! Login-attempt bookkeeping for the login route.

use std::collections::HashMap;
use std::sync::RwLock;

/// Observes login attempts and answers whether a username has burned through
/// its allowance. Consulted before any hashing or code checking happens, so
/// an exhausted caller costs the server nothing.
pub trait LoginAttemptMonitor: Send + Sync {
    fn log_successful_attempt(&self, username: &str);
    fn log_unsuccessful_attempt(&self, username: &str);
    fn attempts_exhausted(&self, username: &str) -> bool;
}

/// Records nothing and never exhausts. A valid production configuration for
/// deployments that handle throttling upstream.
#[derive(Clone, Debug, Default)]
pub struct NoopLoginMonitor;

impl LoginAttemptMonitor for NoopLoginMonitor {
    fn log_successful_attempt(&self, _username: &str) {}

    fn log_unsuccessful_attempt(&self, _username: &str) {}

    fn attempts_exhausted(&self, _username: &str) -> bool {
        false
    }
}

/// Counts consecutive failures per username in process memory. A successful
/// attempt clears the counter. State does not survive a restart, which is
/// acceptable for what this is: a brake, not a ledger.
#[derive(Debug)]
pub struct MemoryLoginMonitor {
    max_attempts: u32,
    failures: RwLock<HashMap<String, u32>>,
}

impl MemoryLoginMonitor {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            failures: RwLock::new(HashMap::new()),
        }
    }
}

impl LoginAttemptMonitor for MemoryLoginMonitor {
    fn log_successful_attempt(&self, username: &str) {
        if let Ok(mut failures) = self.failures.write() {
            failures.remove(username);
        }
    }

    fn log_unsuccessful_attempt(&self, username: &str) {
        if let Ok(mut failures) = self.failures.write() {
            let count = failures.entry(username.to_string()).or_insert(0);
            *count += 1;
            log::debug!("{} failed login attempts for {}", count, username);
        }
    }

    fn attempts_exhausted(&self, username: &str) -> bool {
        match self.failures.read() {
            Ok(failures) => failures
                .get(username)
                .is_some_and(|count| *count >= self.max_attempts),
            // A poisoned lock fails open; losing the brake beats locking
            // everyone out.
            Err(_) => false,
        }
    }
}
