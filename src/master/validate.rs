// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ResponseMode, ResponseResult};
use crate::frame::{ControlField, FunctionCode, Iin, ResponseApdu};
use core::fmt;

/// What the outstanding request expects from its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    /// Function code of the request that was sent.
    pub request: FunctionCode,
    pub mode: ResponseMode,
    pub payload_required: bool,
    /// `true` until the first fragment of the response was accepted.
    pub first_fragment: bool,
}

/// Reason for rejecting a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The response function code does not answer the request.
    UnexpectedFunction(FunctionCode),
    /// FIR/FIN do not fit the expected fragmentation.
    Fragmentation(ControlField),
    /// The outstation reported a request error.
    RequestError(Iin),
    /// Objects were mandatory but the response carried none.
    EmptyPayload,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedFunction(function) => {
                write!(f, "Unexpected response function: {function}")
            }
            Self::Fragmentation(control) => write!(
                f,
                "Unexpected fragmentation: FIR = {}, FIN = {}",
                control.fir, control.fin
            ),
            Self::RequestError(iin) => write!(
                f,
                "Request error indicated: IIN1 = 0x{:0>2X}, IIN2 = 0x{:0>2X}",
                iin.iin1(),
                iin.iin2()
            ),
            Self::EmptyPayload => write!(f, "Response without mandatory objects"),
        }
    }
}

/// Check the envelope of a response matched to the outstanding request.
///
/// The checks run in order: function code, fragmentation, internal
/// indications and payload presence. On success the result tells whether
/// the response is complete.
pub fn validate(
    expect: &Expectation,
    response: &ResponseApdu<'_>,
) -> Result<ResponseResult, Rejection> {
    let header = &response.header;

    if expect.request.expected_response() != Some(header.function) {
        return Err(Rejection::UnexpectedFunction(header.function));
    }

    let control = header.control;
    let result = match expect.mode {
        ResponseMode::Single if control.is_fir_and_fin() => ResponseResult::OkFinal,
        ResponseMode::Multi if control.fir == expect.first_fragment => {
            if control.fin {
                ResponseResult::OkFinal
            } else {
                ResponseResult::OkContinue
            }
        }
        _ => return Err(Rejection::Fragmentation(control)),
    };

    if header.iin.has_request_error() {
        return Err(Rejection::RequestError(header.iin & Iin::REQUEST_ERRORS));
    }

    if expect.payload_required && response.objects.is_empty() {
        return Err(Rejection::EmptyPayload);
    }

    Ok(result)
}
