// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concrete operations.

mod command;
mod restart;

pub use self::{command::*, restart::*};
