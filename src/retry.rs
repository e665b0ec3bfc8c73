//! Deciding whether a failed attempt is worth another one.
//!
//! The transport retries immediately, on the next pool entry, without backoff.
//! How many attempts are made is bounded by `max_retries`; whether a given
//! failure is retried is up to a [`RetryPredicate`], [`RetryPolicy`] by
//! default.

use crate::{Error, ErrorKind};
use std::collections::HashSet;

/// Statuses retried unless configured otherwise.
pub const DEFAULT_RETRY_STATUSES: [u16; 3] = [502, 503, 504];

/// Decides whether a failed attempt should be retried.
///
/// The attempt ceiling is enforced by the transport whatever the predicate
/// answers.
///
/// # Examples
///
/// ```
/// use estransport::{Error, RetryPredicate};
///
/// struct RetryOnTooManyRequests;
///
/// impl RetryPredicate for RetryOnTooManyRequests {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         error.status().is_some_and(|status| status.as_u16() == 429)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// `attempt` is the 1-indexed attempt that just failed.
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

/// The default retry rule.
///
/// Connection failures are always retried, timeouts only when
/// `retry_on_timeout` is set, HTTP failures when their status is in
/// `retry_on_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub retry_on_timeout: bool,
    pub retry_on_status: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_on_timeout: false,
            retry_on_status: DEFAULT_RETRY_STATUSES.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Returns `true` when `attempt` failures still leave room for another
    /// attempt. At most `max_retries + 1` attempts are made.
    pub fn allows_another(&self, attempt: usize) -> bool {
        attempt <= self.max_retries
    }
}

impl RetryPredicate for RetryPolicy {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        match error.kind() {
            ErrorKind::Connection => true,
            ErrorKind::ConnectionTimeout => self.retry_on_timeout,
            _ => error
                .status()
                .is_some_and(|status| self.retry_on_status.contains(&status.as_u16())),
        }
    }
}

/// Retries when any of its predicates would.
///
/// ```
/// use estransport::retry::{OrPredicate, RetryPolicy};
/// use estransport::{Error, RetryPredicate};
///
/// struct RetryOnTooManyRequests;
///
/// impl RetryPredicate for RetryOnTooManyRequests {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         error.status().is_some_and(|status| status.as_u16() == 429)
///     }
/// }
///
/// let predicate = OrPredicate::new(vec![
///     Box::new(RetryPolicy::default()),
///     Box::new(RetryOnTooManyRequests),
/// ]);
/// ```
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_retry(error, attempt))
    }
}
