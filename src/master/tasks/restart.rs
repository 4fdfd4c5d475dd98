// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    codec::Objects,
    frame::{
        ControlField, FunctionCode, Group52Var1, Group52Var2, GroupVariation, Iin, ObjectHeader,
        QualifierCode, RequestApdu, Sequence,
    },
    master::{Handlers, Operation, TaskCompletion, Timestamp},
};
use core::time::Duration;

#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartType {
    Cold,
    Warm,
}

impl RestartType {
    #[must_use]
    pub const fn function(self) -> FunctionCode {
        match self {
            Self::Cold => FunctionCode::ColdRestart,
            Self::Warm => FunctionCode::WarmRestart,
        }
    }
}

/// Passed to the callback of a [`RestartTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartResult {
    pub completion: TaskCompletion,
    /// Time until the outstation is available again.
    ///
    /// Keeps its last valid value if the restart failed.
    pub delay: Duration,
}

/// Requests a cold or warm restart of the outstation.
///
/// The response carries exactly one time delay object, either in seconds
/// (`g52v1`) or in milliseconds (`g52v2`).
#[derive(Debug, Clone)]
pub struct RestartTask {
    function: FunctionCode,
    delay: Duration,
}

impl RestartTask {
    #[must_use]
    pub const fn new(restart: RestartType) -> Self {
        Self {
            function: restart.function(),
            delay: Duration::ZERO,
        }
    }

    fn on_coarse_delay(&mut self, _header: &ObjectHeader, objects: &Objects<'_>) -> Iin {
        match objects.single::<Group52Var1>() {
            Some(value) => {
                self.delay = Duration::from_secs(value.time.into());
                Iin::empty()
            }
            None => Iin::PARAM_ERROR,
        }
    }

    fn on_fine_delay(&mut self, _header: &ObjectHeader, objects: &Objects<'_>) -> Iin {
        match objects.single::<Group52Var2>() {
            Some(value) => {
                self.delay = Duration::from_millis(value.time.into());
                Iin::empty()
            }
            None => Iin::PARAM_ERROR,
        }
    }
}

impl Operation for RestartTask {
    type Output = RestartResult;
    const ALLOWED: &'static [GroupVariation] =
        &[GroupVariation::Group52Var1, GroupVariation::Group52Var2];

    fn name(&self) -> &'static str {
        self.function.name()
    }

    fn payload_required(&self) -> bool {
        true
    }

    fn build_request(&mut self, request: &mut RequestApdu, seq: Sequence) -> bool {
        request.set_control(ControlField::request(seq));
        request.set_function(self.function);
        true
    }

    fn is_allowed(&self, header_count: usize, variation: GroupVariation, _: QualifierCode) -> bool {
        if header_count != 0 {
            return false;
        }
        matches!(
            variation,
            GroupVariation::Group52Var1 | GroupVariation::Group52Var2
        )
    }

    fn handlers() -> Handlers<Self> {
        Handlers::new()
            .with(GroupVariation::Group52Var1, Self::on_coarse_delay)
            .with(GroupVariation::Group52Var2, Self::on_fine_delay)
    }

    fn complete(&mut self, completion: TaskCompletion, _now: Timestamp) -> RestartResult {
        RestartResult {
            completion,
            delay: self.delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::{
        Progress, Task, TaskBehavior, Transaction,
        task::tests::{MockAssociation, collector, response, ts},
    };

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn restart(
        restart: RestartType,
        behavior: TaskBehavior,
    ) -> (
        Transaction<RestartTask>,
        alloc::rc::Rc<core::cell::RefCell<alloc::vec::Vec<RestartResult>>>,
    ) {
        let (results, callback) = collector::<RestartResult>();
        let task = Transaction::new(RestartTask::new(restart), behavior, callback).unwrap();
        (task, results)
    }

    fn single() -> TaskBehavior {
        TaskBehavior::single_execution_no_retry(TIMEOUT, Timestamp::MAX)
    }

    #[test]
    fn task_names() {
        assert_eq!(RestartTask::new(RestartType::Cold).name(), "COLD_RESTART");
        assert_eq!(RestartTask::new(RestartType::Warm).name(), "WARM_RESTART");
    }

    #[test]
    fn build_request() {
        let mut assoc = MockAssociation {
            seq: Sequence::new(6),
            ..Default::default()
        };
        let (mut task, _) = restart(RestartType::Warm, single());
        task.start(ts(0), &mut assoc);

        let buf = &mut [0; 4];
        let len = assoc.sent[0].encode(buf).unwrap();
        assert_eq!(&buf[..len], &[0xC6, 0x0E]);
    }

    #[test]
    fn cold_restart_with_delay_in_seconds() {
        let mut assoc = MockAssociation::default();
        let (mut task, results) = restart(RestartType::Cold, single());
        task.start(ts(0), &mut assoc);
        assert_eq!(assoc.sent[0].function, FunctionCode::ColdRestart);
        assert!(assoc.sent[0].headers.is_empty());

        let rsp = response(0, Iin::DEVICE_RESTART, &[52, 1, 0x07, 0x01, 0x1E, 0x00]);
        assert_eq!(
            task.on_response(ts(50), &rsp, &mut assoc),
            Progress::Complete(TaskCompletion::Success)
        );
        assert_eq!(
            *results.borrow(),
            [RestartResult {
                completion: TaskCompletion::Success,
                delay: Duration::from_secs(30),
            }]
        );
    }

    #[test]
    fn warm_restart_with_delay_in_milliseconds() {
        let mut assoc = MockAssociation::default();
        let (mut task, results) = restart(RestartType::Warm, single());
        task.start(ts(0), &mut assoc);
        assert_eq!(assoc.sent[0].function, FunctionCode::WarmRestart);

        let rsp = response(0, Iin::empty(), &[52, 2, 0x07, 0x01, 0xF4, 0x01]);
        assert_eq!(
            task.on_response(ts(50), &rsp, &mut assoc),
            Progress::Complete(TaskCompletion::Success)
        );
        assert_eq!(
            *results.borrow(),
            [RestartResult {
                completion: TaskCompletion::Success,
                delay: Duration::from_millis(500),
            }]
        );
    }

    #[test]
    fn empty_response_is_bad() {
        for kind in [RestartType::Cold, RestartType::Warm] {
            let mut assoc = MockAssociation::default();
            let (mut task, results) = restart(kind, single());
            task.start(ts(0), &mut assoc);

            let rsp = response(0, Iin::empty(), &[]);
            assert_eq!(
                task.on_response(ts(50), &rsp, &mut assoc),
                Progress::Complete(TaskCompletion::BadResponse)
            );
            assert_eq!(
                *results.borrow(),
                [RestartResult {
                    completion: TaskCompletion::BadResponse,
                    delay: Duration::ZERO,
                }]
            );
        }
    }

    #[test]
    fn second_header_is_rejected() {
        let mut assoc = MockAssociation::default();
        let (mut task, results) = restart(RestartType::Cold, single());
        task.start(ts(0), &mut assoc);

        let rsp = response(
            0,
            Iin::empty(),
            &[
                52, 1, 0x07, 0x01, 0x1E, 0x00, // g52v1, 30 s
                52, 2, 0x07, 0x01, 0xF4, 0x01, // g52v2, 500 ms
            ],
        );
        assert_eq!(
            task.on_response(ts(50), &rsp, &mut assoc),
            Progress::Complete(TaskCompletion::BadResponse)
        );
        assert_eq!(results.borrow()[0].delay, Duration::ZERO);
    }

    #[test]
    fn undecodable_objects_are_bad() {
        let mut assoc = MockAssociation::default();
        let (mut task, results) = restart(RestartType::Cold, single());
        task.start(ts(0), &mut assoc);

        // header is allowed, object data is truncated
        let rsp = response(0, Iin::empty(), &[52, 1, 0x07, 0x01, 0x1E]);
        assert_eq!(
            task.on_response(ts(50), &rsp, &mut assoc),
            Progress::Complete(TaskCompletion::BadResponse)
        );
        assert_eq!(results.borrow()[0].completion, TaskCompletion::BadResponse);
    }

    #[test]
    fn delay_without_value_is_bad() {
        let mut assoc = MockAssociation::default();
        let (mut task, results) = restart(RestartType::Warm, single());
        task.start(ts(0), &mut assoc);

        let rsp = response(0, Iin::empty(), &[52, 2, 0x07, 0x00]);
        assert_eq!(
            task.on_response(ts(50), &rsp, &mut assoc),
            Progress::Complete(TaskCompletion::BadResponse)
        );
        assert_eq!(results.borrow()[0].delay, Duration::ZERO);
    }

    #[test]
    fn fatal_indication_ignores_objects() {
        let mut assoc = MockAssociation::default();
        let (mut task, results) = restart(RestartType::Cold, single());
        task.start(ts(0), &mut assoc);

        let rsp = response(
            0,
            Iin::NO_FUNC_CODE_SUPPORT,
            &[52, 1, 0x07, 0x01, 0x1E, 0x00],
        );
        assert_eq!(
            task.on_response(ts(50), &rsp, &mut assoc),
            Progress::Complete(TaskCompletion::BadResponse)
        );
        assert_eq!(results.borrow()[0].delay, Duration::ZERO);
    }

    #[test]
    fn retry_once_before_deadline() {
        let mut assoc = MockAssociation::default();
        let behavior = TaskBehavior::retry_until_deadline(TIMEOUT, ts(5_050), Duration::ZERO);
        let (mut task, results) = restart(RestartType::Cold, behavior);

        assert_eq!(task.start(ts(0), &mut assoc), Progress::Awaiting(ts(5_000)));
        // 50 ms left before the deadline
        assert_eq!(task.on_timer(ts(5_000), &mut assoc), Progress::RetryAt(ts(5_000)));
        assert!(results.borrow().is_empty());

        assert_eq!(
            task.on_timer(ts(5_000), &mut assoc),
            Progress::Awaiting(ts(10_000))
        );
        assert_eq!(assoc.sent.len(), 2);
        assert_ne!(assoc.sent[0].control.seq, assoc.sent[1].control.seq);

        assert_eq!(
            task.on_timer(ts(10_000), &mut assoc),
            Progress::Complete(TaskCompletion::Timeout)
        );
        assert_eq!(assoc.sent.len(), 2);
        assert_eq!(
            *results.borrow(),
            [RestartResult {
                completion: TaskCompletion::Timeout,
                delay: Duration::ZERO,
            }]
        );
    }
}
