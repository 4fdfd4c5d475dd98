// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master side transaction engine.
//!
//! Every operation (restart, unsolicited control, ...) is described by an
//! [`Operation`] and driven by one shared [`Transaction`] state machine:
//! build, send, await, validate, dispatch and complete.
use crate::frame::{GroupVariation, QualifierCode, RequestApdu, Sequence};
use core::fmt;

mod behavior;
mod dispatch;
mod task;
pub mod tasks;
mod time;
mod validate;

pub use self::{
    behavior::{Decision, Policy, TaskBehavior},
    dispatch::{Handler, Handlers},
    task::{Association, Progress, Task, TaskState, Transaction},
    time::Timestamp,
    validate::{Expectation, Rejection, validate},
};

/// Verdict on a single response fragment.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseResult {
    /// The response was accepted and completes the transaction.
    OkFinal,
    /// The fragment was accepted and more fragments are expected.
    OkContinue,
    /// Malformed, disallowed or rejected response.
    BadResponse,
}

/// Terminal result of a transaction.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCompletion {
    Success,
    BadResponse,
    /// No response arrived within the response timeout.
    ResponseTimeout,
    /// The behavior's start or retry deadline has passed.
    Timeout,
    /// The operation could not build a request.
    Abandoned,
    Cancelled,
}

impl TaskCompletion {
    const fn get_name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BadResponse => "bad response",
            Self::ResponseTimeout => "response timeout",
            Self::Timeout => "timeout",
            Self::Abandoned => "abandoned",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for TaskCompletion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.get_name())
    }
}

/// Scheduling class of a transaction.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    ClearRestart,
    DisableUnsolicited,
    AssignClass,
    StartupIntegrityPoll,
    TimeSync,
    EnableUnsolicited,
    IntegrityPoll,
    UserPoll,
    UserTask,
}

impl TaskType {
    /// Scheduling priority, higher runs first.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::ClearRestart => 100,
            Self::DisableUnsolicited => 90,
            Self::AssignClass => 80,
            Self::StartupIntegrityPoll => 70,
            Self::TimeSync => 60,
            Self::EnableUnsolicited => 50,
            Self::UserTask => 40,
            Self::IntegrityPoll => 30,
            Self::UserPoll => 20,
        }
    }

    /// `true` for transactions requested by the application.
    #[must_use]
    pub const fn is_user_task(self) -> bool {
        matches!(self, Self::UserTask | Self::UserPoll)
    }
}

/// Number of response fragments an operation expects.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    #[default]
    Single,
    Multi,
}

/// Per-operation behavior plugged into a [`Transaction`].
pub trait Operation: Sized {
    /// Value handed to the completion callback.
    type Output;

    /// Object types a response may carry.
    ///
    /// Each of them needs a handler in [`Operation::handlers`].
    const ALLOWED: &'static [GroupVariation];

    fn name(&self) -> &'static str;

    fn task_type(&self) -> TaskType {
        TaskType::UserTask
    }

    fn response_mode(&self) -> ResponseMode {
        ResponseMode::Single
    }

    /// `true` if a response without objects is a bad response.
    fn payload_required(&self) -> bool;

    /// Populate the outgoing request.
    ///
    /// Returning `false` abandons the transaction without sending anything.
    fn build_request(&mut self, request: &mut RequestApdu, seq: Sequence) -> bool;

    /// Gatekeeper for every incoming object header, called before decoding.
    ///
    /// `header_count` is the number of headers accepted so far.
    fn is_allowed(
        &self,
        header_count: usize,
        variation: GroupVariation,
        qualifier: QualifierCode,
    ) -> bool;

    fn handlers() -> Handlers<Self>;

    /// Produce the callback value for the terminal `result`.
    fn complete(&mut self, result: TaskCompletion, now: Timestamp) -> Self::Output;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_tasks_run_before_user_tasks() {
        assert!(TaskType::ClearRestart.priority() > TaskType::UserTask.priority());
        assert!(TaskType::DisableUnsolicited.priority() > TaskType::EnableUnsolicited.priority());
        assert!(TaskType::UserTask.priority() > TaskType::IntegrityPoll.priority());
    }

    #[test]
    fn user_tasks() {
        assert!(TaskType::UserTask.is_user_task());
        assert!(TaskType::UserPoll.is_user_task());
        assert!(!TaskType::ClearRestart.is_user_task());
    }
}
