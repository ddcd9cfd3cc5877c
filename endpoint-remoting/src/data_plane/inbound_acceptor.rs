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

//! Inbound side of a protocol transport: handshake replies and payload dispatch.

use crate::address::Address;
use crate::envelope::InboundEnvelope;
use crate::inbound::InboundDispatcher;
use crate::observability::{events, fields};
use crate::protocol::error::AssociationError;
use crate::protocol::wire::WireFrame;
use crate::transport::driver::Connection;
use crate::transport::error::TransportError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument, Span};

const COMPONENT: &str = "inbound_acceptor";

/// Quarantined incarnation uid per remote address, as last published by the manager.
pub(crate) type QuarantineView = watch::Receiver<BTreeMap<Address, u64>>;

/// A view that never reports a quarantine.
pub(crate) fn empty_quarantine_view() -> QuarantineView {
    watch::channel(BTreeMap::new()).1
}

fn is_quarantined(view: &QuarantineView, origin: &Address, uid: u64) -> bool {
    view.borrow().get(origin) == Some(&uid)
}

/// Everything one inbound association needs to answer and serve a peer.
#[derive(Clone)]
pub(crate) struct InboundSession {
    local: Address,
    local_uid: u64,
    handshake_timeout: Duration,
    dispatcher: Arc<dyn InboundDispatcher>,
    quarantined: QuarantineView,
}

impl InboundSession {
    pub(crate) fn new(
        local: Address,
        local_uid: u64,
        handshake_timeout: Duration,
        dispatcher: Arc<dyn InboundDispatcher>,
        quarantined: QuarantineView,
    ) -> Self {
        Self {
            local,
            local_uid,
            handshake_timeout,
            dispatcher,
            quarantined,
        }
    }
}

/// Accepts connections until `stop` fires (or its sender is dropped) or the driver
/// stops accepting, then aborts and awaits every live inbound association.
pub(crate) async fn run(
    session: InboundSession,
    mut incoming: mpsc::Receiver<Box<dyn Connection>>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut associations = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            accepted = incoming.recv() => match accepted {
                Some(connection) => {
                    associations.spawn(
                        serve(session.clone(), connection).instrument(Span::current()),
                    );
                }
                None => break,
            },
            Some(_) = associations.join_next(), if !associations.is_empty() => {}
        }
    }

    associations.shutdown().await;
    debug!(
        event = events::INBOUND_CLOSED,
        component = COMPONENT,
        local = %session.local,
        "inbound acceptor stopped"
    );
}

async fn serve(session: InboundSession, mut connection: Box<dyn Connection>) {
    let handshake =
        tokio::time::timeout(session.handshake_timeout, read_associate(connection.as_mut())).await;
    let (origin, origin_uid) = match handshake {
        Ok(Ok(peer)) => peer,
        Ok(Err(err)) => {
            warn!(
                event = events::INBOUND_HANDSHAKE_FAILED,
                component = COMPONENT,
                local = %session.local,
                err = %err,
                "inbound handshake failed"
            );
            connection.close().await;
            return;
        }
        Err(_) => {
            warn!(
                event = events::INBOUND_HANDSHAKE_FAILED,
                component = COMPONENT,
                local = %session.local,
                timeout = %fields::format_millis(session.handshake_timeout),
                "inbound handshake timed out"
            );
            connection.close().await;
            return;
        }
    };

    let mut quarantined = session.quarantined.clone();
    if is_quarantined(&quarantined, &origin, origin_uid) {
        warn!(
            event = events::INBOUND_HANDSHAKE_FAILED,
            component = COMPONENT,
            local = %session.local,
            remote = %origin,
            uid = origin_uid,
            reason = fields::REASON_QUARANTINED,
            "refusing quarantined incarnation"
        );
        let refusal = WireFrame::Disassociate {
            reason: fields::REASON_QUARANTINED.to_string(),
        };
        if let Ok(frame) = refusal.encode() {
            let _ = connection.write_frame(&frame).await;
        }
        connection.close().await;
        return;
    }

    let reply = WireFrame::Associate {
        origin: session.local.clone(),
        uid: session.local_uid,
    };
    let written = match reply.encode() {
        Ok(frame) => connection.write_frame(&frame).await.map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };
    if let Err(err) = written {
        warn!(
            event = events::INBOUND_HANDSHAKE_FAILED,
            component = COMPONENT,
            remote = %origin,
            err = err.as_str(),
            "unable to answer inbound handshake"
        );
        return;
    }

    info!(
        event = events::INBOUND_ACCEPTED,
        component = COMPONENT,
        local = %session.local,
        remote = %origin,
        uid = origin_uid,
        "inbound association open"
    );

    let mut watching = true;
    let reason = loop {
        let read = tokio::select! {
            read = connection.read_frame() => read,
            changed = quarantined.changed(), if watching => {
                watching = changed.is_ok();
                if is_quarantined(&quarantined, &origin, origin_uid) {
                    break fields::REASON_QUARANTINED.to_string();
                }
                continue;
            }
        };
        let frame = match read {
            Ok(Some(frame)) => frame,
            Ok(None) => break fields::REASON_PEER_CLOSED.to_string(),
            Err(err) => break err.to_string(),
        };
        match WireFrame::decode(&frame) {
            Ok(WireFrame::Payload { .. }) if is_quarantined(&quarantined, &origin, origin_uid) => {
                break fields::REASON_QUARANTINED.to_string();
            }
            Ok(WireFrame::Payload { recipient, payload }) => {
                session.dispatcher.dispatch(InboundEnvelope {
                    origin: origin.clone(),
                    origin_uid,
                    recipient_path: recipient,
                    payload,
                });
            }
            Ok(WireFrame::Disassociate { reason }) => break reason,
            Ok(other) => break format!("unexpected {} frame", other.kind()),
            Err(err) => break err.to_string(),
        }
    };

    connection.close().await;
    info!(
        event = events::INBOUND_CLOSED,
        component = COMPONENT,
        remote = %origin,
        uid = origin_uid,
        reason = reason.as_str(),
        "inbound association closed"
    );
}

async fn read_associate(connection: &mut dyn Connection) -> Result<(Address, u64), AssociationError> {
    let frame = connection
        .read_frame()
        .await?
        .ok_or(TransportError::ConnectionClosed)?;
    match WireFrame::decode(&frame)? {
        WireFrame::Associate { origin, uid } => Ok((origin, uid)),
        other => Err(AssociationError::UnexpectedFrame(other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::{empty_quarantine_view, run, InboundSession, QuarantineView};
    use crate::address::Address;
    use crate::envelope::InboundEnvelope;
    use crate::inbound::InboundDispatcher;
    use crate::protocol::wire::WireFrame;
    use crate::transport::driver::Connection;
    use crate::transport::loopback::LoopbackConnection;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot, watch};

    #[derive(Default)]
    struct CollectingDispatcher {
        received: Mutex<Vec<InboundEnvelope>>,
    }

    impl InboundDispatcher for CollectingDispatcher {
        fn dispatch(&self, envelope: InboundEnvelope) {
            self.received.lock().unwrap().push(envelope);
        }
    }

    fn session(dispatcher: Arc<CollectingDispatcher>) -> InboundSession {
        watched_session(dispatcher, empty_quarantine_view())
    }

    fn watched_session(
        dispatcher: Arc<CollectingDispatcher>,
        quarantined: QuarantineView,
    ) -> InboundSession {
        InboundSession::new(
            Address::new("remote.loopback", "local", "local", 1),
            99,
            Duration::from_secs(1),
            dispatcher,
            quarantined,
        )
    }

    fn peer_address() -> Address {
        Address::new("remote.loopback", "peer", "peer", 2)
    }

    async fn connect(incoming: &mpsc::Sender<Box<dyn Connection>>) -> LoopbackConnection {
        let (client, server) = LoopbackConnection::pair();
        incoming
            .send(Box::new(server) as Box<dyn Connection>)
            .await
            .unwrap();
        client
    }

    async fn send_frame(client: &mut LoopbackConnection, frame: WireFrame) {
        client.write_frame(&frame.encode().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn answers_handshake_then_dispatches_payloads() {
        let dispatcher = Arc::new(CollectingDispatcher::default());
        let (incoming_tx, incoming_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = oneshot::channel();
        let acceptor = tokio::spawn(run(session(dispatcher.clone()), incoming_rx, stop_rx));

        let (mut client, server) = LoopbackConnection::pair();
        incoming_tx
            .send(Box::new(server) as Box<dyn Connection>)
            .await
            .unwrap();

        let origin = Address::new("remote.loopback", "peer", "peer", 2);
        let hello = WireFrame::Associate {
            origin: origin.clone(),
            uid: 5,
        };
        client.write_frame(&hello.encode().unwrap()).await.unwrap();
        let reply = client.read_frame().await.unwrap().unwrap();
        assert!(matches!(
            WireFrame::decode(&reply).unwrap(),
            WireFrame::Associate { uid: 99, .. }
        ));

        for n in 0..3u8 {
            let payload = WireFrame::Payload {
                recipient: "/user/a".to_string(),
                payload: vec![n],
            };
            client.write_frame(&payload.encode().unwrap()).await.unwrap();
        }
        let bye = WireFrame::Disassociate {
            reason: "bye".to_string(),
        };
        client.write_frame(&bye.encode().unwrap()).await.unwrap();

        // The acceptor closes its end once it has read the disassociate frame.
        assert_eq!(client.read_frame().await.unwrap(), None);

        let received = dispatcher.received.lock().unwrap().clone();
        assert_eq!(
            received.iter().map(|e| e.payload[0]).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(received.iter().all(|e| e.origin == origin && e.origin_uid == 5));

        stop_tx.send(()).unwrap();
        acceptor.await.unwrap();
    }

    #[tokio::test]
    async fn non_handshake_first_frame_is_rejected() {
        let dispatcher = Arc::new(CollectingDispatcher::default());
        let (incoming_tx, incoming_rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = oneshot::channel();
        let _acceptor = tokio::spawn(run(session(dispatcher.clone()), incoming_rx, stop_rx));

        let (mut client, server) = LoopbackConnection::pair();
        incoming_tx
            .send(Box::new(server) as Box<dyn Connection>)
            .await
            .unwrap();
        let payload = WireFrame::Payload {
            recipient: "/user/a".to_string(),
            payload: vec![1],
        };
        client.write_frame(&payload.encode().unwrap()).await.unwrap();

        assert_eq!(client.read_frame().await.unwrap(), None);
        assert!(dispatcher.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_closes_live_associations() {
        let (incoming_tx, incoming_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = oneshot::channel();
        let acceptor = tokio::spawn(run(session(Arc::default()), incoming_rx, stop_rx));

        let (mut client, server) = LoopbackConnection::pair();
        incoming_tx
            .send(Box::new(server) as Box<dyn Connection>)
            .await
            .unwrap();
        let hello = WireFrame::Associate {
            origin: Address::new("remote.loopback", "peer", "peer", 2),
            uid: 5,
        };
        client.write_frame(&hello.encode().unwrap()).await.unwrap();
        client.read_frame().await.unwrap().unwrap();

        stop_tx.send(()).unwrap();
        acceptor.await.unwrap();

        assert!(client.write_frame(b"late").await.is_err());
    }

    #[tokio::test]
    async fn quarantined_incarnation_is_refused_at_handshake() {
        let dispatcher = Arc::new(CollectingDispatcher::default());
        let (_quarantine, view) = watch::channel(BTreeMap::from([(peer_address(), 5)]));
        let (incoming_tx, incoming_rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = oneshot::channel();
        let _acceptor = tokio::spawn(run(
            watched_session(dispatcher.clone(), view),
            incoming_rx,
            stop_rx,
        ));

        let mut client = connect(&incoming_tx).await;
        send_frame(
            &mut client,
            WireFrame::Associate {
                origin: peer_address(),
                uid: 5,
            },
        )
        .await;

        let reply = client.read_frame().await.unwrap().unwrap();
        assert_eq!(
            WireFrame::decode(&reply).unwrap(),
            WireFrame::Disassociate {
                reason: "quarantined".to_string()
            }
        );
        assert_eq!(client.read_frame().await.unwrap(), None);

        let mut next_incarnation = connect(&incoming_tx).await;
        send_frame(
            &mut next_incarnation,
            WireFrame::Associate {
                origin: peer_address(),
                uid: 6,
            },
        )
        .await;
        let reply = next_incarnation.read_frame().await.unwrap().unwrap();
        assert!(matches!(
            WireFrame::decode(&reply).unwrap(),
            WireFrame::Associate { uid: 99, .. }
        ));
        assert!(dispatcher.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn quarantine_closes_an_open_inbound_association() {
        let dispatcher = Arc::new(CollectingDispatcher::default());
        let (quarantine, view) = watch::channel(BTreeMap::new());
        let (incoming_tx, incoming_rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = oneshot::channel();
        let _acceptor = tokio::spawn(run(
            watched_session(dispatcher.clone(), view),
            incoming_rx,
            stop_rx,
        ));

        let mut client = connect(&incoming_tx).await;
        send_frame(
            &mut client,
            WireFrame::Associate {
                origin: peer_address(),
                uid: 5,
            },
        )
        .await;
        client.read_frame().await.unwrap().unwrap();

        quarantine.send_replace(BTreeMap::from([(peer_address(), 5)]));

        assert_eq!(client.read_frame().await.unwrap(), None);
        assert!(client.write_frame(b"late").await.is_err());
        assert!(dispatcher.received.lock().unwrap().is_empty());
    }
}
