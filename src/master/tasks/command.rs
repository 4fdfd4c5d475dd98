// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    frame::{
        ControlField, FunctionCode, GroupVariation, ObjectHeader, QualifierCode, RequestApdu,
        Sequence,
    },
    master::{Handlers, Operation, TaskCompletion, TaskType, Timestamp},
};
use alloc::vec;
use bitflags::bitflags;

bitflags! {
    /// Event classes addressed by unsolicited reporting commands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventClasses: u8 {
        const CLASS1 = 0b0000_0001;
        const CLASS2 = 0b0000_0010;
        const CLASS3 = 0b0000_0100;
    }
}

impl EventClasses {
    const HEADERS: [(Self, GroupVariation); 3] = [
        (Self::CLASS1, GroupVariation::Group60Var2),
        (Self::CLASS2, GroupVariation::Group60Var3),
        (Self::CLASS3, GroupVariation::Group60Var4),
    ];

    fn headers(self) -> impl Iterator<Item = ObjectHeader> {
        Self::HEADERS
            .into_iter()
            .filter(move |(class, _)| self.contains(*class))
            .map(|(_, gv)| ObjectHeader::all_objects(gv))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clear the `DEVICE_RESTART` indication of the outstation.
    ClearRestart,
    EnableUnsolicited(EventClasses),
    DisableUnsolicited(EventClasses),
}

impl Command {
    #[must_use]
    pub const fn function(self) -> FunctionCode {
        match self {
            Self::ClearRestart => FunctionCode::Write,
            Self::EnableUnsolicited(_) => FunctionCode::EnableUnsolicited,
            Self::DisableUnsolicited(_) => FunctionCode::DisableUnsolicited,
        }
    }
}

/// Index of the restart indication within `g80v1`.
const RESTART_INDEX: u16 = 7;

/// An operation that expects a response without any objects.
#[derive(Debug, Clone)]
pub struct CommandTask {
    command: Command,
}

impl CommandTask {
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self { command }
    }

    #[must_use]
    pub const fn command(&self) -> Command {
        self.command
    }
}

impl Operation for CommandTask {
    type Output = TaskCompletion;
    const ALLOWED: &'static [GroupVariation] = &[];

    fn name(&self) -> &'static str {
        match self.command {
            Command::ClearRestart => "CLEAR_RESTART",
            Command::EnableUnsolicited(_) => "ENABLE_UNSOLICITED",
            Command::DisableUnsolicited(_) => "DISABLE_UNSOLICITED",
        }
    }

    fn task_type(&self) -> TaskType {
        match self.command {
            Command::ClearRestart => TaskType::ClearRestart,
            Command::EnableUnsolicited(_) => TaskType::EnableUnsolicited,
            Command::DisableUnsolicited(_) => TaskType::DisableUnsolicited,
        }
    }

    fn payload_required(&self) -> bool {
        false
    }

    fn build_request(&mut self, request: &mut RequestApdu, seq: Sequence) -> bool {
        request.set_control(ControlField::request(seq));
        request.set_function(self.command.function());
        match self.command {
            Command::ClearRestart => {
                let header = ObjectHeader::start_stop(
                    GroupVariation::Group80Var1,
                    RESTART_INDEX,
                    RESTART_INDEX,
                );
                request.push_header_with_data(header, vec![0x00]);
            }
            Command::EnableUnsolicited(classes) | Command::DisableUnsolicited(classes) => {
                if classes.is_empty() {
                    return false;
                }
                for header in classes.headers() {
                    request.push_header(header);
                }
            }
        }
        true
    }

    fn is_allowed(&self, _: usize, _: GroupVariation, _: QualifierCode) -> bool {
        false
    }

    fn handlers() -> Handlers<Self> {
        Handlers::new()
    }

    fn complete(&mut self, completion: TaskCompletion, _: Timestamp) -> TaskCompletion {
        completion
    }
}
