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

//! Outbound and inbound message envelopes.

use crate::address::Address;

/// Reference to an actor living in a remote actor system.
///
/// `local_address` is the local address whose transport must be used to reach the
/// recipient; it is resolved against the transport mapping installed by `Listen`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RemoteActorRef {
    pub(crate) address: Address,
    pub(crate) path: String,
    pub(crate) local_address: Address,
}

impl RemoteActorRef {
    pub fn new(address: Address, path: &str, local_address: Address) -> Self {
        Self {
            address,
            path: path.to_string(),
            local_address,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn local_address(&self) -> &Address {
        &self.local_address
    }
}

/// An already-serialized application message addressed to a remote actor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteEnvelope {
    pub(crate) recipient: RemoteActorRef,
    pub(crate) payload: Vec<u8>,
}

impl RemoteEnvelope {
    pub fn new(recipient: RemoteActorRef, payload: Vec<u8>) -> Self {
        Self { recipient, payload }
    }

    pub fn recipient(&self) -> &RemoteActorRef {
        &self.recipient
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// A payload received from an associated peer, handed to the local runtime.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InboundEnvelope {
    pub origin: Address,
    pub origin_uid: u64,
    pub recipient_path: String,
    pub payload: Vec<u8>,
}
