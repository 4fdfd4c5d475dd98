// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Operation;
use crate::{
    codec::{HeaderIter, Objects},
    error::Error,
    frame::{GroupVariation, Iin, ObjectHeader},
};
use alloc::collections::BTreeMap;

/// Receives the objects of one header.
///
/// Returns the empty set on success, otherwise the indications describing
/// what went wrong (usually [`Iin::PARAM_ERROR`]).
pub type Handler<O> = fn(&mut O, &ObjectHeader, &Objects<'_>) -> Iin;

/// Maps every object type an operation accepts to its handler.
pub struct Handlers<O> {
    entries: BTreeMap<GroupVariation, Handler<O>>,
}

impl<O> Default for Handlers<O> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<O> Handlers<O> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `variation`, replacing a previous one.
    #[must_use]
    pub fn with(mut self, variation: GroupVariation, handler: Handler<O>) -> Self {
        self.insert(variation, handler);
        self
    }

    pub fn insert(&mut self, variation: GroupVariation, handler: Handler<O>) {
        self.entries.insert(variation, handler);
    }

    #[must_use]
    pub fn get(&self, variation: GroupVariation) -> Option<Handler<O>> {
        self.entries.get(&variation).copied()
    }

    /// Ensure that every type in `allowed` has a handler.
    pub fn check(&self, allowed: &[GroupVariation]) -> Result<(), Error> {
        allowed
            .iter()
            .find(|gv| !self.entries.contains_key(gv))
            .map_or(Ok(()), |gv| Err(Error::MissingHandler(*gv)))
    }
}

/// Route the objects of a response payload to the handlers of `operation`.
///
/// The payload is walked twice. The first pass checks every header against
/// the allow-list, requires a registered handler and the whole payload to be
/// consumed. Only if that succeeds the second pass calls the handlers, so a
/// rejected response never reaches them.
///
/// Handler failures do not stop the walk. They are merged into `errors`.
/// Returns the number of headers.
pub(crate) fn dispatch<O: Operation>(
    operation: &mut O,
    handlers: &Handlers<O>,
    payload: &[u8],
    errors: &mut Iin,
) -> Result<usize, Error> {
    let mut count = 0;
    for objects in HeaderIter::new(payload) {
        let header = *objects?.header();
        let allowed = O::ALLOWED.contains(&header.variation)
            && operation.is_allowed(count, header.variation, header.qualifier);
        if !allowed {
            return Err(Error::HeaderRejected(header.variation, header.qualifier));
        }
        if handlers.get(header.variation).is_none() {
            #[cfg(feature = "log")]
            log::error!(
                "{}: no handler registered for {}",
                operation.name(),
                header.variation
            );
            return Err(Error::MissingHandler(header.variation));
        }
        count += 1;
    }

    for objects in HeaderIter::new(payload).flatten() {
        let header = objects.header();
        let Some(handler) = handlers.get(header.variation) else {
            continue;
        };
        let status = handler(operation, header, &objects);
        if !status.is_empty() {
            #[cfg(feature = "log")]
            log::warn!(
                "{}: handler for {} failed: IIN1 = 0x{:0>2X}, IIN2 = 0x{:0>2X}",
                operation.name(),
                header.variation,
                status.iin1(),
                status.iin2()
            );
            errors.insert(status);
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frame::{Group52Var1, Group52Var2, QualifierCode, RequestApdu, Sequence},
        master::{TaskCompletion, Timestamp},
    };
    use alloc::vec::Vec;

    /// Collects every delay it is handed, in payload order.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<(GroupVariation, u16)>,
        max_headers: usize,
    }

    impl Recorder {
        fn on_coarse(&mut self, _: &ObjectHeader, objects: &Objects<'_>) -> Iin {
            match objects.single::<Group52Var1>() {
                Some(v) => {
                    self.seen.push((GroupVariation::Group52Var1, v.time));
                    Iin::empty()
                }
                None => Iin::PARAM_ERROR,
            }
        }

        fn on_fine(&mut self, _: &ObjectHeader, objects: &Objects<'_>) -> Iin {
            for (_, v) in objects.iter::<Group52Var2>() {
                self.seen.push((GroupVariation::Group52Var2, v.time));
            }
            Iin::empty()
        }
    }

    impl Operation for Recorder {
        type Output = ();
        const ALLOWED: &'static [GroupVariation] =
            &[GroupVariation::Group52Var1, GroupVariation::Group52Var2];

        fn name(&self) -> &'static str {
            "RECORDER"
        }

        fn payload_required(&self) -> bool {
            true
        }

        fn build_request(&mut self, _: &mut RequestApdu, _: Sequence) -> bool {
            true
        }

        fn is_allowed(&self, header_count: usize, _: GroupVariation, q: QualifierCode) -> bool {
            header_count < self.max_headers && q != QualifierCode::AllObjects
        }

        fn handlers() -> Handlers<Self> {
            Handlers::new()
                .with(GroupVariation::Group52Var1, Self::on_coarse)
                .with(GroupVariation::Group52Var2, Self::on_fine)
        }

        fn complete(&mut self, _: TaskCompletion, _: Timestamp) {}
    }

    fn recorder(max_headers: usize) -> Recorder {
        Recorder {
            max_headers,
            ..Default::default()
        }
    }

    #[test]
    fn completeness_check() {
        let handlers = Recorder::handlers();
        assert!(handlers.check(Recorder::ALLOWED).is_ok());
        let partial: Handlers<Recorder> =
            Handlers::new().with(GroupVariation::Group52Var1, Recorder::on_coarse);
        assert_eq!(
            partial.check(Recorder::ALLOWED),
            Err(Error::MissingHandler(GroupVariation::Group52Var2))
        );
        assert!(Handlers::<Recorder>::new().check(&[]).is_ok());
    }

    #[test]
    fn dispatch_in_payload_order() {
        let mut op = recorder(4);
        let mut errors = Iin::empty();
        let payload: &[u8] = &[
            52, 2, 0x07, 0x02, 0xF4, 0x01, 0x0A, 0x00, // g52v2, count 2
            52, 1, 0x07, 0x01, 0x1E, 0x00, // g52v1, count 1
        ];
        let count = dispatch(&mut op, &Recorder::handlers(), payload, &mut errors);
        assert_eq!(count, Ok(2));
        assert!(errors.is_empty());
        assert_eq!(
            op.seen,
            [
                (GroupVariation::Group52Var2, 500),
                (GroupVariation::Group52Var2, 10),
                (GroupVariation::Group52Var1, 30),
            ]
        );
    }

    #[test]
    fn empty_payload_dispatches_nothing() {
        let mut op = recorder(1);
        let mut errors = Iin::empty();
        assert_eq!(dispatch(&mut op, &Recorder::handlers(), &[], &mut errors), Ok(0));
        assert!(op.seen.is_empty());
    }

    #[test]
    fn rejected_header_aborts_before_any_handler() {
        let mut op = recorder(1);
        let mut errors = Iin::empty();
        let payload: &[u8] = &[
            52, 1, 0x07, 0x01, 0x1E, 0x00, // allowed
            52, 2, 0x07, 0x01, 0xF4, 0x01, // second header is not
        ];
        assert_eq!(
            dispatch(&mut op, &Recorder::handlers(), payload, &mut errors),
            Err(Error::HeaderRejected(
                GroupVariation::Group52Var2,
                QualifierCode::Uint8Count
            ))
        );
        assert!(op.seen.is_empty());
    }

    #[test]
    fn undeclared_type_is_rejected() {
        let mut op = recorder(4);
        let mut errors = Iin::empty();
        let payload: &[u8] = &[50, 1, 0x07, 0x01, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            dispatch(&mut op, &Recorder::handlers(), payload, &mut errors),
            Err(Error::HeaderRejected(
                GroupVariation::Group50Var1,
                QualifierCode::Uint8Count
            ))
        );
    }

    #[test]
    fn trailing_bytes_reject_the_response() {
        let mut op = recorder(4);
        let mut errors = Iin::empty();
        let payload: &[u8] = &[52, 1, 0x07, 0x01, 0x1E, 0x00, 0x34];
        assert_eq!(
            dispatch(&mut op, &Recorder::handlers(), payload, &mut errors),
            Err(Error::InsufficientData(3, 1))
        );
        assert!(op.seen.is_empty());
    }

    #[test]
    fn missing_handler_is_caught() {
        let mut op = recorder(4);
        let mut errors = Iin::empty();
        let handlers = Handlers::new().with(GroupVariation::Group52Var1, Recorder::on_coarse);
        let payload: &[u8] = &[52, 2, 0x07, 0x01, 0xF4, 0x01];
        assert_eq!(
            dispatch(&mut op, &handlers, payload, &mut errors),
            Err(Error::MissingHandler(GroupVariation::Group52Var2))
        );
    }

    #[test]
    fn handler_errors_do_not_stop_siblings() {
        let mut op = recorder(4);
        let mut errors = Iin::empty();
        let payload: &[u8] = &[
            52, 1, 0x07, 0x00, // g52v1 without objects
            52, 2, 0x07, 0x01, 0xF4, 0x01, // g52v2, 500
        ];
        assert_eq!(
            dispatch(&mut op, &Recorder::handlers(), payload, &mut errors),
            Ok(2)
        );
        assert_eq!(errors, Iin::PARAM_ERROR);
        assert_eq!(op.seen, [(GroupVariation::Group52Var2, 500)]);
    }
}
