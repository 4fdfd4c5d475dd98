// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    Decision, Expectation, Handlers, Operation, ResponseResult, TaskBehavior, TaskCompletion,
    TaskType, Timestamp, dispatch::dispatch, validate,
};
use crate::{
    error::Error,
    frame::{FunctionCode, Iin, RequestApdu, ResponseApdu, Sequence},
};
use alloc::boxed::Box;

/// Services a transaction consumes from the hosting association.
pub trait Association {
    /// Sequence number for the next solicited request.
    fn next_sequence(&mut self) -> Sequence;

    fn send_request(&mut self, request: &RequestApdu);

    /// Ask to be woken up via [`Task::on_timer`] at `deadline`.
    fn schedule_timeout(&mut self, deadline: Timestamp);
}

/// Lifecycle of a transaction.
///
/// `Validating` and `Dispatching` are only held while a response is being
/// processed.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Building,
    AwaitingResponse { seq: Sequence, deadline: Timestamp },
    Validating,
    Dispatching,
    /// Waiting for the next attempt (retry or periodic run).
    RetryPending { at: Timestamp },
    Complete(TaskCompletion),
}

/// Outcome of driving a transaction, reported to the scheduler.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// A request is outstanding until the deadline.
    Awaiting(Timestamp),
    /// The next attempt is due at the given time.
    RetryAt(Timestamp),
    Complete(TaskCompletion),
    /// The input did not apply to the current state and was dropped.
    Discarded,
}

/// Object safe view on a [`Transaction`], used by schedulers.
pub trait Task {
    fn name(&self) -> &'static str;

    fn task_type(&self) -> TaskType;

    fn state(&self) -> TaskState;

    /// Build and send a request.
    ///
    /// Only applies to a fresh transaction or a pending retry that is due.
    fn start(&mut self, now: Timestamp, association: &mut dyn Association) -> Progress;

    /// Process a response whose sequence number the session has matched.
    fn on_response(
        &mut self,
        now: Timestamp,
        response: &ResponseApdu<'_>,
        association: &mut dyn Association,
    ) -> Progress;

    /// Wake-up for a response deadline or a pending retry.
    fn on_timer(&mut self, now: Timestamp, association: &mut dyn Association) -> Progress;

    /// Complete the transaction with [`TaskCompletion::Cancelled`].
    fn cancel(&mut self, now: Timestamp) -> Progress;
}

/// The request/response state machine shared by all operations.
pub struct Transaction<O: Operation> {
    operation: O,
    behavior: TaskBehavior,
    handlers: Handlers<O>,
    callback: Box<dyn FnMut(O::Output)>,
    state: TaskState,
    request_function: FunctionCode,
    fragments: usize,
    errors: Iin,
}

impl<O: Operation> Transaction<O> {
    /// Create a transaction in state [`TaskState::Building`].
    ///
    /// `callback` receives the operation's output exactly once, or once per
    /// run for [`super::Policy::Periodic`].
    pub fn new(
        operation: O,
        behavior: TaskBehavior,
        callback: impl FnMut(O::Output) + 'static,
    ) -> Result<Self, Error> {
        let handlers = O::handlers();
        handlers.check(O::ALLOWED)?;
        Ok(Self {
            operation,
            behavior,
            handlers,
            callback: Box::new(callback),
            state: TaskState::Building,
            request_function: FunctionCode::Confirm,
            fragments: 0,
            errors: Iin::empty(),
        })
    }

    #[must_use]
    pub const fn operation(&self) -> &O {
        &self.operation
    }

    #[must_use]
    pub const fn behavior(&self) -> &TaskBehavior {
        &self.behavior
    }

    /// Handler errors recorded during the outstanding attempt.
    ///
    /// Cleared once the attempt has ended.
    #[must_use]
    pub const fn errors(&self) -> Iin {
        self.errors
    }

    fn process_response(&mut self, response: &ResponseApdu<'_>) -> ResponseResult {
        self.state = TaskState::Validating;
        let expect = Expectation {
            request: self.request_function,
            mode: self.operation.response_mode(),
            payload_required: self.operation.payload_required(),
            first_fragment: self.fragments == 0,
        };
        let verdict = match validate(&expect, response) {
            Ok(verdict) => verdict,
            Err(_rejection) => {
                #[cfg(feature = "log")]
                log::warn!("{}: {_rejection}", self.operation.name());
                return ResponseResult::BadResponse;
            }
        };

        self.state = TaskState::Dispatching;
        match dispatch(
            &mut self.operation,
            &self.handlers,
            response.objects,
            &mut self.errors,
        ) {
            Ok(_) => verdict,
            Err(_err) => {
                #[cfg(feature = "log")]
                log::warn!("{}: malformed response: {_err}", self.operation.name());
                ResponseResult::BadResponse
            }
        }
    }

    fn on_success(&mut self, now: Timestamp) -> Progress {
        match self.behavior.on_success(now) {
            Decision::Finalize(result) => self.finalize(result, now),
            decision => self.reschedule(decision, TaskCompletion::Success, now),
        }
    }

    fn on_failure(&mut self, now: Timestamp, failure: TaskCompletion) -> Progress {
        match self.behavior.on_failure(now, failure) {
            Decision::Finalize(result) => self.finalize(result, now),
            decision => self.reschedule(decision, failure, now),
        }
    }

    fn reschedule(
        &mut self,
        decision: Decision,
        result: TaskCompletion,
        now: Timestamp,
    ) -> Progress {
        let at = match decision {
            Decision::Retry(at) => at,
            Decision::Rearm(at) => {
                self.report(result, now);
                at
            }
            Decision::Finalize(result) => return self.finalize(result, now),
        };
        // handler errors belong to the attempt that just ended
        self.errors = Iin::empty();
        #[cfg(feature = "log")]
        log::debug!(
            "{}: next attempt at {at} (in {:?})",
            self.operation.name(),
            at.saturating_duration_since(now)
        );
        self.state = TaskState::RetryPending { at };
        Progress::RetryAt(at)
    }

    fn finalize(&mut self, result: TaskCompletion, now: Timestamp) -> Progress {
        let result = self.report(result, now);
        self.state = TaskState::Complete(result);
        Progress::Complete(result)
    }

    /// Hand the run's result to the operation and the callback.
    ///
    /// Recorded handler errors turn every result into a bad response.
    /// They are consumed here, so a later run starts without them.
    fn report(&mut self, result: TaskCompletion, now: Timestamp) -> TaskCompletion {
        let errors = core::mem::take(&mut self.errors);
        let result = if errors.is_empty() {
            result
        } else {
            TaskCompletion::BadResponse
        };
        #[cfg(feature = "log")]
        log::debug!("{}: completed with {result}", self.operation.name());
        let output = self.operation.complete(result, now);
        (self.callback)(output);
        result
    }
}

impl<O: Operation> Task for Transaction<O> {
    fn name(&self) -> &'static str {
        self.operation.name()
    }

    fn task_type(&self) -> TaskType {
        self.operation.task_type()
    }

    fn state(&self) -> TaskState {
        self.state
    }

    fn start(&mut self, now: Timestamp, association: &mut dyn Association) -> Progress {
        match self.state {
            TaskState::Building => {}
            TaskState::RetryPending { at } if now >= at => {}
            _ => return Progress::Discarded,
        }
        if let Some(result) = self.behavior.check_start(now) {
            return self.finalize(result, now);
        }

        self.state = TaskState::Building;
        self.errors = Iin::empty();
        self.fragments = 0;

        let seq = association.next_sequence();
        let mut request = RequestApdu::new(seq);
        if !self.operation.build_request(&mut request, seq) {
            #[cfg(feature = "log")]
            log::warn!("{}: unable to build request", self.operation.name());
            return self.finalize(TaskCompletion::Abandoned, now);
        }
        self.request_function = request.function;
        association.send_request(&request);

        let deadline = self.behavior.response_deadline(now);
        association.schedule_timeout(deadline);
        #[cfg(feature = "log")]
        log::debug!(
            "{}: sent {} with seq {seq}, response due at {deadline}",
            self.operation.name(),
            request.function
        );
        self.state = TaskState::AwaitingResponse { seq, deadline };
        Progress::Awaiting(deadline)
    }

    fn on_response(
        &mut self,
        now: Timestamp,
        response: &ResponseApdu<'_>,
        association: &mut dyn Association,
    ) -> Progress {
        let TaskState::AwaitingResponse { seq, .. } = self.state else {
            #[cfg(feature = "log")]
            log::warn!(
                "{}: discarding response in state {:?}",
                self.operation.name(),
                self.state
            );
            return Progress::Discarded;
        };
        if response.header.control.seq != seq {
            #[cfg(feature = "log")]
            log::warn!(
                "{}: discarding response with seq {} (expected {seq})",
                self.operation.name(),
                response.header.control.seq
            );
            return Progress::Discarded;
        }

        let result = self.process_response(response);
        self.fragments += 1;
        match result {
            ResponseResult::OkContinue => {
                let deadline = self.behavior.response_deadline(now);
                association.schedule_timeout(deadline);
                self.state = TaskState::AwaitingResponse {
                    seq: seq.next(),
                    deadline,
                };
                Progress::Awaiting(deadline)
            }
            ResponseResult::OkFinal => self.on_success(now),
            ResponseResult::BadResponse => self.on_failure(now, TaskCompletion::BadResponse),
        }
    }

    fn on_timer(&mut self, now: Timestamp, association: &mut dyn Association) -> Progress {
        match self.state {
            TaskState::AwaitingResponse { deadline, .. } if now >= deadline => {
                #[cfg(feature = "log")]
                log::warn!("{}: response timeout", self.operation.name());
                self.on_failure(now, TaskCompletion::ResponseTimeout)
            }
            TaskState::RetryPending { at } if now >= at => self.start(now, association),
            _ => Progress::Discarded,
        }
    }

    fn cancel(&mut self, now: Timestamp) -> Progress {
        if let TaskState::Complete(_) = self.state {
            return Progress::Discarded;
        }
        self.finalize(TaskCompletion::Cancelled, now)
    }
}
