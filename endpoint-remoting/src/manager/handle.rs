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

//! Cloneable front door to a running endpoint manager.

use crate::address::Address;
use crate::dead_letters::{DeadLetter, DeadLetterReason, DeadLetterSink};
use crate::envelope::{RemoteActorRef, RemoteEnvelope};
use crate::manager::command::ManagerCommand;
use crate::manager::listen_error::ListenError;
use crate::manager::snapshot::{PolicySnapshot, RegistrySnapshot};
use crate::observability::events;
use crate::protocol::protocol_transport::ProtocolTransportAddressPair;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

const COMPONENT: &str = "endpoint_manager_handle";

///
/// [`EndpointManagerHandle`] enqueues messages on the manager mailbox. Sends never
/// block and never fail: when the manager has stopped, the envelope goes straight to
/// the dead letter sink.
#[derive(Clone)]
pub struct EndpointManagerHandle {
    pub(crate) commands: mpsc::UnboundedSender<ManagerCommand>,
    dead_letters: Arc<dyn DeadLetterSink>,
    system_name: String,
    uid: u64,
}

impl EndpointManagerHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<ManagerCommand>,
        dead_letters: Arc<dyn DeadLetterSink>,
        system_name: &str,
        uid: u64,
    ) -> Self {
        Self {
            commands,
            dead_letters,
            system_name: system_name.to_string(),
            uid,
        }
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    /// Incarnation uid this manager presents in handshakes.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Binds every configured transport and installs them as the transport mapping.
    ///
    /// Returns one `(local address, protocol transport)` pair per configured transport,
    /// in configuration order. On error nothing stays bound.
    ///
    /// Listening again first shuts down the transports installed by the previous
    /// call, so a failed re-listen leaves the manager with no transport at all.
    pub async fn listen(&self) -> Result<Vec<ProtocolTransportAddressPair>, ListenError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(ManagerCommand::Listen { reply })
            .map_err(|_| ListenError::ManagerUnavailable)?;
        response.await.map_err(|_| ListenError::ManagerUnavailable)?
    }

    /// Fire-and-forget delivery of `envelope` to its recipient.
    pub fn send(&self, envelope: RemoteEnvelope) {
        if let Err(SendError(ManagerCommand::Send { envelope })) =
            self.commands.send(ManagerCommand::Send { envelope })
        {
            debug!(
                event = events::SEND_MANAGER_STOPPED,
                component = COMPONENT,
                remote = %envelope.recipient().address(),
                "manager stopped; diverting send"
            );
            self.dead_letters.publish(DeadLetter {
                envelope,
                reason: DeadLetterReason::ManagerStopped,
            });
        }
    }

    pub fn tell(&self, recipient: RemoteActorRef, payload: Vec<u8>) {
        self.send(RemoteEnvelope::new(recipient, payload));
    }

    /// Quarantines incarnation `uid` of `address`, terminating its live worker.
    pub fn quarantine(&self, address: Address, uid: u64) {
        let _ = self.commands.send(ManagerCommand::Quarantine {
            remote: address,
            uid,
            reporter: None,
        });
    }

    /// Lifts a quarantine of `address`, including one restored through
    /// [`EndpointManager::with_quarantined`](crate::EndpointManager::with_quarantined).
    /// The next send creates a fresh worker.
    pub fn clear_quarantine(&self, address: Address) {
        let _ = self
            .commands
            .send(ManagerCommand::ClearQuarantine { remote: address });
    }

    pub async fn policy(&self, address: &Address) -> Option<PolicySnapshot> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(ManagerCommand::Policy {
                remote: address.clone(),
                reply,
            })
            .ok()?;
        response.await.ok().flatten()
    }

    /// `None` once the manager has stopped.
    pub async fn snapshot(&self) -> Option<RegistrySnapshot> {
        let (reply, response) = oneshot::channel();
        self.commands.send(ManagerCommand::Snapshot { reply }).ok()?;
        response.await.ok()
    }

    /// Terminates every worker, shuts down every bound transport and stops the mailbox loop.
    pub async fn shutdown(&self) {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(ManagerCommand::Shutdown { reply })
            .is_ok()
        {
            let _ = response.await;
        }
    }
}

impl Debug for EndpointManagerHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointManagerHandle")
            .field("system_name", &self.system_name)
            .field("uid", &self.uid)
            .field("running", &self.is_running())
            .finish()
    }
}
