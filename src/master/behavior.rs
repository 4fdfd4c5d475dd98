// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{TaskCompletion, Timestamp};
use core::time::Duration;

/// How often and for how long a transaction may be attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// One attempt. The transaction times out if it is not started
    /// before `start_expiration`.
    SingleExecutionNoRetry { start_expiration: Timestamp },
    /// Recoverable failures are retried after `retry_delay` as long as
    /// the next attempt starts no later than `expiration`.
    RetryUntilDeadline {
        expiration: Timestamp,
        retry_delay: Duration,
    },
    /// Re-armed `period` after a successful run and `retry_delay` after
    /// a failed one. Never completes on its own.
    Periodic {
        period: Duration,
        retry_delay: Duration,
    },
}

/// What happens after an attempt ended.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Attempt again at the given time, within the same run.
    Retry(Timestamp),
    /// The run is over. Report it and start the next run at the given time.
    Rearm(Timestamp),
    /// The transaction is over.
    Finalize(TaskCompletion),
}

/// Timing contract of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskBehavior {
    policy: Policy,
    response_timeout: Duration,
}

impl TaskBehavior {
    #[must_use]
    pub const fn single_execution_no_retry(
        response_timeout: Duration,
        start_expiration: Timestamp,
    ) -> Self {
        Self {
            policy: Policy::SingleExecutionNoRetry { start_expiration },
            response_timeout,
        }
    }

    #[must_use]
    pub const fn retry_until_deadline(
        response_timeout: Duration,
        expiration: Timestamp,
        retry_delay: Duration,
    ) -> Self {
        Self {
            policy: Policy::RetryUntilDeadline {
                expiration,
                retry_delay,
            },
            response_timeout,
        }
    }

    #[must_use]
    pub const fn periodic(
        response_timeout: Duration,
        period: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            policy: Policy::Periodic {
                period,
                retry_delay,
            },
            response_timeout,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> Policy {
        self.policy
    }

    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Latest time a response to a request sent at `now` is accepted.
    #[must_use]
    pub fn response_deadline(&self, now: Timestamp) -> Timestamp {
        now + self.response_timeout
    }

    /// Checked before every attempt.
    ///
    /// Returns the terminal result if the transaction may no longer start.
    #[must_use]
    pub fn check_start(&self, now: Timestamp) -> Option<TaskCompletion> {
        match self.policy {
            Policy::SingleExecutionNoRetry { start_expiration } if now > start_expiration => {
                Some(TaskCompletion::Timeout)
            }
            Policy::RetryUntilDeadline { expiration, .. } if now > expiration => {
                Some(TaskCompletion::Timeout)
            }
            _ => None,
        }
    }

    /// Decide how to continue after an attempt failed with `failure`.
    ///
    /// Only [`TaskCompletion::BadResponse`] and
    /// [`TaskCompletion::ResponseTimeout`] are recoverable.
    #[must_use]
    pub fn on_failure(&self, now: Timestamp, failure: TaskCompletion) -> Decision {
        if !matches!(
            failure,
            TaskCompletion::BadResponse | TaskCompletion::ResponseTimeout
        ) {
            return Decision::Finalize(failure);
        }
        match self.policy {
            Policy::SingleExecutionNoRetry { .. } => Decision::Finalize(failure),
            Policy::RetryUntilDeadline {
                expiration,
                retry_delay,
            } => {
                let next = now + retry_delay;
                if next <= expiration {
                    Decision::Retry(next)
                } else {
                    Decision::Finalize(TaskCompletion::Timeout)
                }
            }
            Policy::Periodic { retry_delay, .. } => Decision::Rearm(now + retry_delay),
        }
    }

    /// Decide how to continue after a successful attempt.
    #[must_use]
    pub fn on_success(&self, now: Timestamp) -> Decision {
        match self.policy {
            Policy::Periodic { period, .. } => Decision::Rearm(now + period),
            _ => Decision::Finalize(TaskCompletion::Success),
        }
    }
}
