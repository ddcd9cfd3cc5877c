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

//! Per-peer endpoint worker: `Associating -> Open -> Closed`.

use crate::address::Address;
use crate::dead_letters::{DeadLetter, DeadLetterReason, DeadLetterSink};
use crate::envelope::RemoteEnvelope;
use crate::manager::command::ManagerCommand;
use crate::observability::{events, fields};
use crate::protocol::error::AssociationError;
use crate::protocol::protocol_transport::{Association, ProtocolTransport};
use crate::protocol::wire::WireFrame;
use crate::runtime::task_runtime::spawn_instrumented;
use crate::transport::error::TransportError;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

const COMPONENT: &str = "endpoint_worker";

/// Why a message could not be queued on a worker.
#[derive(Debug)]
pub(crate) enum ForwardError {
    QueueFull(RemoteEnvelope),
    Closed(RemoteEnvelope),
}

/// Manager-side reference to a live worker.
///
/// Dropping the handle terminates the worker, so a registry entry holding the
/// handle is what keeps the worker alive.
#[derive(Debug)]
pub(crate) struct EndpointWorkerHandle {
    worker_id: String,
    outbound: mpsc::Sender<RemoteEnvelope>,
    terminate: Option<oneshot::Sender<()>>,
}

impl EndpointWorkerHandle {
    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// `false` once the worker has closed its queue.
    pub(crate) fn is_alive(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queues `envelope` without waiting; the worker writes queued envelopes in order.
    pub(crate) fn forward(&self, envelope: RemoteEnvelope) -> Result<(), ForwardError> {
        self.outbound.try_send(envelope).map_err(|err| match err {
            TrySendError::Full(envelope) => ForwardError::QueueFull(envelope),
            TrySendError::Closed(envelope) => ForwardError::Closed(envelope),
        })
    }

    pub(crate) fn terminate(mut self) {
        if let Some(terminate) = self.terminate.take() {
            let _ = terminate.send(());
        }
    }

    /// A handle backed by no task; the returned receivers keep it alive.
    #[cfg(test)]
    pub(crate) fn detached(
        worker_id: &str,
    ) -> (
        Self,
        (mpsc::Receiver<RemoteEnvelope>, oneshot::Receiver<()>),
    ) {
        let (outbound, queue) = mpsc::channel(8);
        let (terminate, terminated) = oneshot::channel();
        (
            Self {
                worker_id: worker_id.to_string(),
                outbound,
                terminate: Some(terminate),
            },
            (queue, terminated),
        )
    }
}

/// Where and how a new worker connects.
pub(crate) struct EndpointWorkerConfig {
    pub(crate) local: Address,
    pub(crate) remote: Address,
    pub(crate) transport: Arc<ProtocolTransport>,
    pub(crate) refuse_uid: Option<u64>,
    pub(crate) queue_capacity: usize,
}

enum WorkerExit {
    Terminated,
    Failed(String),
    Refused { uid: u64 },
}

/// Spawns a worker in the `Associating` state and returns its handle.
pub(crate) fn spawn_endpoint_worker(
    config: EndpointWorkerConfig,
    manager: mpsc::WeakUnboundedSender<ManagerCommand>,
    dead_letters: Arc<dyn DeadLetterSink>,
) -> EndpointWorkerHandle {
    let worker_id = Uuid::new_v4().to_string();
    let (outbound, queue) = mpsc::channel(config.queue_capacity.max(1));
    let (terminate, terminated) = oneshot::channel();

    info!(
        event = events::WORKER_CREATE,
        component = COMPONENT,
        worker_id = worker_id.as_str(),
        local = %config.local,
        remote = %config.remote,
        refuse_uid = %fields::format_optional_uid(config.refuse_uid),
        "creating endpoint worker"
    );

    let span = info_span!(
        "endpoint_worker",
        worker_id = fields::short_worker_id(&worker_id),
        remote = %config.remote
    );
    let worker = EndpointWorker {
        worker_id: worker_id.clone(),
        local: config.local,
        remote: config.remote,
        transport: config.transport,
        refuse_uid: config.refuse_uid,
        queue,
        terminated,
        manager,
        dead_letters,
    };
    spawn_instrumented("endpoint_worker", span, worker.run());

    EndpointWorkerHandle {
        worker_id,
        outbound,
        terminate: Some(terminate),
    }
}

struct EndpointWorker {
    worker_id: String,
    local: Address,
    remote: Address,
    transport: Arc<ProtocolTransport>,
    refuse_uid: Option<u64>,
    queue: mpsc::Receiver<RemoteEnvelope>,
    terminated: oneshot::Receiver<()>,
    manager: mpsc::WeakUnboundedSender<ManagerCommand>,
    dead_letters: Arc<dyn DeadLetterSink>,
}

enum Step {
    Write(RemoteEnvelope),
    PeerFrame(Result<Option<Vec<u8>>, TransportError>),
    Stop,
}

/// Outcome of writing one envelope on an open association.
enum WriteError {
    /// Only this message is undeliverable; the association stays usable.
    Rejected(DeadLetterReason, String),
    /// The connection is broken.
    Connection(String),
}

impl EndpointWorker {
    async fn run(mut self) {
        debug!(
            event = events::WORKER_ASSOCIATING,
            component = COMPONENT,
            worker_id = self.worker_id.as_str(),
            remote = %self.remote,
            "associating"
        );

        // The queue is not read while associating, so sends buffer in arrival order.
        let associated = tokio::select! {
            biased;
            _ = &mut self.terminated => None,
            result = self.transport.associate(&self.remote, self.refuse_uid) => Some(result),
        };

        let mut association = match associated {
            None => return self.finish(WorkerExit::Terminated, None),
            Some(Ok(association)) => association,
            Some(Err(AssociationError::HandshakeRefused { uid })) => {
                warn!(
                    event = events::WORKER_HANDSHAKE_REFUSED,
                    component = COMPONENT,
                    worker_id = self.worker_id.as_str(),
                    remote = %self.remote,
                    uid,
                    "peer presented a quarantined incarnation"
                );
                return self.finish(WorkerExit::Refused { uid }, None);
            }
            Some(Err(err)) => return self.finish(WorkerExit::Failed(err.to_string()), None),
        };

        let uid = association.remote_uid();
        info!(
            event = events::WORKER_OPEN,
            component = COMPONENT,
            worker_id = self.worker_id.as_str(),
            local = %self.local,
            remote = %self.remote,
            uid,
            "endpoint open"
        );
        self.notify(ManagerCommand::EndpointAssociated {
            remote: self.remote.clone(),
            worker_id: self.worker_id.clone(),
            uid,
        });

        loop {
            let step = tokio::select! {
                biased;
                _ = &mut self.terminated => Step::Stop,
                read = association.read_frame() => Step::PeerFrame(read),
                next = self.queue.recv() => next.map_or(Step::Stop, Step::Write),
            };

            let envelope = match step {
                Step::Write(envelope) => envelope,
                Step::PeerFrame(read) => {
                    let cause = Self::peer_close_cause(read);
                    info!(
                        event = events::WORKER_PEER_CLOSED,
                        component = COMPONENT,
                        worker_id = self.worker_id.as_str(),
                        remote = %self.remote,
                        cause = cause.as_str(),
                        "peer closed the association"
                    );
                    association.close().await;
                    return self.finish(WorkerExit::Failed(cause), None);
                }
                Step::Stop => {
                    Self::disassociate(association, fields::REASON_TERMINATED).await;
                    return self.finish(WorkerExit::Terminated, None);
                }
            };

            match Self::write(&mut association, &envelope).await {
                Ok(()) => {}
                Err(WriteError::Rejected(reason, err)) => {
                    warn!(
                        event = events::WORKER_MESSAGE_REJECTED,
                        component = COMPONENT,
                        worker_id = self.worker_id.as_str(),
                        remote = %self.remote,
                        path = envelope.recipient().path(),
                        payload_len = envelope.payload().len(),
                        err = err.as_str(),
                        "message cannot be written; diverting it"
                    );
                    self.dead_letters.publish(DeadLetter { envelope, reason });
                }
                Err(WriteError::Connection(err)) => {
                    warn!(
                        event = events::WORKER_WRITE_FAILED,
                        component = COMPONENT,
                        worker_id = self.worker_id.as_str(),
                        remote = %self.remote,
                        err = err.as_str(),
                        "write failed; closing endpoint"
                    );
                    association.close().await;
                    return self.finish(WorkerExit::Failed(err), Some(envelope));
                }
            }
        }
    }

    async fn write(association: &mut Association, envelope: &RemoteEnvelope) -> Result<(), WriteError> {
        let frame = WireFrame::Payload {
            recipient: envelope.recipient().path().to_string(),
            payload: envelope.payload().to_vec(),
        }
        .encode()
        .map_err(|err| WriteError::Rejected(DeadLetterReason::Unencodable, err.to_string()))?;
        association.write_frame(&frame).await.map_err(|err| match err {
            TransportError::FrameTooLarge { .. } => {
                WriteError::Rejected(DeadLetterReason::FrameTooLarge, err.to_string())
            }
            err => WriteError::Connection(err.to_string()),
        })
    }

    /// The peer never writes after the handshake, so any read result ends the association.
    fn peer_close_cause(read: Result<Option<Vec<u8>>, TransportError>) -> String {
        match read {
            Ok(None) => fields::REASON_PEER_CLOSED.to_string(),
            Ok(Some(frame)) => match WireFrame::decode(&frame) {
                Ok(WireFrame::Disassociate { reason }) => format!("peer disassociated: {reason}"),
                Ok(other) => format!("unexpected {} frame", other.kind()),
                Err(err) => err.to_string(),
            },
            Err(err) => err.to_string(),
        }
    }

    async fn disassociate(mut association: Association, reason: &str) {
        let farewell = WireFrame::Disassociate {
            reason: reason.to_string(),
        };
        if let Ok(frame) = farewell.encode() {
            let _ = association.write_frame(&frame).await;
        }
        association.close().await;
    }

    /// Reports the exit to the manager, then diverts everything still queued.
    fn finish(mut self, exit: WorkerExit, unwritten: Option<RemoteEnvelope>) {
        let report = match exit {
            WorkerExit::Terminated => ManagerCommand::EndpointFailed {
                remote: self.remote.clone(),
                worker_id: self.worker_id.clone(),
                cause: fields::REASON_TERMINATED.to_string(),
            },
            WorkerExit::Failed(cause) => ManagerCommand::EndpointFailed {
                remote: self.remote.clone(),
                worker_id: self.worker_id.clone(),
                cause,
            },
            WorkerExit::Refused { uid } => ManagerCommand::Quarantine {
                remote: self.remote.clone(),
                uid,
                reporter: Some(self.worker_id.clone()),
            },
        };
        self.notify(report);

        self.queue.close();
        let mut diverted = 0usize;
        for envelope in unwritten.into_iter().chain(std::iter::from_fn(|| self.queue.try_recv().ok())) {
            self.dead_letters.publish(DeadLetter {
                envelope,
                reason: DeadLetterReason::EndpointClosed,
            });
            diverted += 1;
        }

        info!(
            event = events::WORKER_CLOSED,
            component = COMPONENT,
            worker_id = self.worker_id.as_str(),
            remote = %self.remote,
            diverted,
            "endpoint closed"
        );
    }

    fn notify(&self, command: ManagerCommand) {
        let delivered = self
            .manager
            .upgrade()
            .map(|manager| manager.send(command).is_ok())
            .unwrap_or(false);
        if !delivered {
            debug!(
                component = COMPONENT,
                worker_id = self.worker_id.as_str(),
                reason = fields::REASON_MAILBOX_CLOSED,
                "manager gone; report dropped"
            );
        }
    }
}
