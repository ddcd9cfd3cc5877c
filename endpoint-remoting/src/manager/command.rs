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

//! Messages accepted by the endpoint manager mailbox.

use crate::address::Address;
use crate::envelope::RemoteEnvelope;
use crate::manager::listen_error::ListenError;
use crate::manager::snapshot::{PolicySnapshot, RegistrySnapshot};
use crate::protocol::protocol_transport::ProtocolTransportAddressPair;
use tokio::sync::oneshot;

pub(crate) type ListenReply = Result<Vec<ProtocolTransportAddressPair>, ListenError>;

pub(crate) enum ManagerCommand {
    Listen {
        reply: oneshot::Sender<ListenReply>,
    },
    Send {
        envelope: RemoteEnvelope,
    },
    /// Reported by a worker exactly once when it closes for a non-quarantine reason.
    EndpointFailed {
        remote: Address,
        worker_id: String,
        cause: String,
    },
    /// Reported by a worker once its handshake completed.
    EndpointAssociated {
        remote: Address,
        worker_id: String,
        uid: u64,
    },
    /// Administrative quarantine (`reporter: None`) or an incarnation conflict
    /// detected by the worker named in `reporter`.
    Quarantine {
        remote: Address,
        uid: u64,
        reporter: Option<String>,
    },
    /// Lifts the quarantine of `remote` and forgets its refused incarnation.
    ClearQuarantine {
        remote: Address,
    },
    Policy {
        remote: Address,
        reply: oneshot::Sender<Option<PolicySnapshot>>,
    },
    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
