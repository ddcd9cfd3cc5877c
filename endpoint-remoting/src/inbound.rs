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

//! Hand-off point between inbound remoting traffic and the local runtime.

use crate::envelope::InboundEnvelope;
use crate::observability::events;
use tracing::debug;

const COMPONENT: &str = "inbound_dispatcher";

/// Receives payloads decoded from associated peers.
///
/// The local actor runtime implements this to route payloads to local mailboxes.
pub trait InboundDispatcher: Send + Sync {
    fn dispatch(&self, envelope: InboundEnvelope);
}

/// Dispatcher used when no runtime is attached; inbound payloads are only logged.
#[derive(Debug, Default)]
pub struct LoggingInboundDispatcher;

impl InboundDispatcher for LoggingInboundDispatcher {
    fn dispatch(&self, envelope: InboundEnvelope) {
        debug!(
            event = events::INBOUND_DISPATCH,
            component = COMPONENT,
            origin = %envelope.origin,
            origin_uid = envelope.origin_uid,
            path = envelope.recipient_path.as_str(),
            payload_len = envelope.payload.len(),
            "inbound payload without runtime dispatcher"
        );
    }
}
