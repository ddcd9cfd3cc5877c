/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Destination for messages that cannot be delivered.

use crate::envelope::RemoteEnvelope;
use crate::observability::events;
use std::fmt::{Display, Formatter};
use tracing::warn;

const COMPONENT: &str = "dead_letters";

/// Why a message ended up in the dead letter sink.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeadLetterReason {
    /// The recipient address is gated after a recent failure.
    Gated,
    /// No protocol transport is bound to the recipient's local address.
    NoTransportForLocalAddress,
    /// The endpoint worker's outbound queue is full.
    QueueOverflow,
    /// The endpoint worker closed before the message could be written.
    EndpointClosed,
    /// The endpoint manager is no longer running.
    ManagerStopped,
    /// The encoded message exceeds the transport's maximum frame size.
    FrameTooLarge,
    /// The message could not be encoded into a wire frame.
    Unencodable,
}

impl Display for DeadLetterReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DeadLetterReason::Gated => "gated",
            DeadLetterReason::NoTransportForLocalAddress => "no_transport_for_local_address",
            DeadLetterReason::QueueOverflow => "queue_overflow",
            DeadLetterReason::EndpointClosed => "endpoint_closed",
            DeadLetterReason::ManagerStopped => "manager_stopped",
            DeadLetterReason::FrameTooLarge => "frame_too_large",
            DeadLetterReason::Unencodable => "unencodable",
        };
        f.write_str(text)
    }
}

/// An undeliverable message together with its intended recipient.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeadLetter {
    pub envelope: RemoteEnvelope,
    pub reason: DeadLetterReason,
}

/// Fire-and-forget sink for undeliverable messages.
///
/// Implementations must not block; they are called from the manager mailbox loop and
/// from endpoint workers.
pub trait DeadLetterSink: Send + Sync {
    fn publish(&self, dead_letter: DeadLetter);
}

/// Default sink that only records dead letters in the log.
#[derive(Debug, Default)]
pub struct LoggingDeadLetters;

impl DeadLetterSink for LoggingDeadLetters {
    fn publish(&self, dead_letter: DeadLetter) {
        warn!(
            event = events::DEAD_LETTER,
            component = COMPONENT,
            recipient = %dead_letter.envelope.recipient().address(),
            path = dead_letter.envelope.recipient().path(),
            reason = %dead_letter.reason,
            payload_len = dead_letter.envelope.payload().len(),
            "message diverted to dead letters"
        );
    }
}
