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

//! Protocol wrapper around a raw transport driver.

use crate::address::Address;
use crate::data_plane::inbound_acceptor::{self, InboundSession, QuarantineView};
use crate::inbound::InboundDispatcher;
use crate::protocol::error::AssociationError;
use crate::protocol::wire::WireFrame;
use crate::runtime::task_runtime::spawn_instrumented;
use crate::transport::driver::{Connection, TransportDriver};
use crate::transport::error::TransportError;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::info_span;

/// Scheme prefix stamped on every address bound through a protocol wrapper.
pub const PROTOCOL_PREFIX: &str = "remote";

/// Maps a raw driver scheme to the scheme the wrapper exposes, e.g. `tcp` -> `remote.tcp`.
pub fn protocol_scheme(driver_scheme: &str) -> String {
    format!("{PROTOCOL_PREFIX}.{driver_scheme}")
}

/// A local address paired with the protocol transport bound to it, as returned by `Listen`.
#[derive(Clone, Debug)]
pub struct ProtocolTransportAddressPair {
    pub address: Address,
    pub transport: Arc<ProtocolTransport>,
}

/// An open, handshaken outbound connection.
pub struct Association {
    pub(crate) connection: Box<dyn Connection>,
    pub(crate) remote_uid: u64,
}

impl Association {
    /// Incarnation uid the peer presented during the handshake.
    pub fn remote_uid(&self) -> u64 {
        self.remote_uid
    }

    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.connection.write_frame(frame).await
    }

    /// Reads what the peer sends after the handshake. Cancel safe.
    pub(crate) async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        self.connection.read_frame().await
    }

    pub async fn close(mut self) {
        self.connection.close().await;
    }
}

struct AcceptorTask {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct ListenState {
    local_address: Option<Address>,
    acceptor: Option<AcceptorTask>,
}

///
/// [`ProtocolTransport`] keeps the driver's `listen`/`connect` shape and adds the
/// association handshake on top. Both sides send `Associate { origin, uid }` first;
/// an outbound association fails with [`AssociationError::HandshakeRefused`] when
/// the peer presents the refused incarnation uid.
///
/// Once listening, the wrapper also accepts inbound associations, answers their
/// handshake with the local uid and hands decoded payloads to the
/// [`InboundDispatcher`]. Inbound peers whose incarnation the owning manager has
/// quarantined are turned away with a `Disassociate` frame.
pub struct ProtocolTransport {
    driver: Arc<dyn TransportDriver>,
    scheme: String,
    local_uid: u64,
    handshake_timeout: Duration,
    inbound: Arc<dyn InboundDispatcher>,
    quarantined: QuarantineView,
    state: Mutex<ListenState>,
}

impl ProtocolTransport {
    pub fn new(
        driver: Arc<dyn TransportDriver>,
        local_uid: u64,
        handshake_timeout: Duration,
        inbound: Arc<dyn InboundDispatcher>,
    ) -> Self {
        let scheme = protocol_scheme(driver.scheme());
        Self {
            driver,
            scheme,
            local_uid,
            handshake_timeout,
            inbound,
            quarantined: inbound_acceptor::empty_quarantine_view(),
            state: Mutex::new(ListenState::default()),
        }
    }

    /// Inbound associations consult `quarantined` before and while serving a peer.
    pub(crate) fn with_quarantine_view(mut self, quarantined: QuarantineView) -> Self {
        self.quarantined = quarantined;
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn local_uid(&self) -> u64 {
        self.local_uid
    }

    /// Bound local address, once [`ProtocolTransport::listen`] succeeded.
    pub async fn local_address(&self) -> Option<Address> {
        self.state.lock().await.local_address.clone()
    }

    /// Binds the driver and starts accepting inbound associations.
    ///
    /// Listening twice returns the address bound the first time.
    pub async fn listen(&self) -> Result<Address, TransportError> {
        let mut state = self.state.lock().await;
        if let Some(address) = &state.local_address {
            return Ok(address.clone());
        }

        let listener = self.driver.listen().await?;
        let local = listener.address.with_protocol(&self.scheme);

        let session = InboundSession::new(
            local.clone(),
            self.local_uid,
            self.handshake_timeout,
            self.inbound.clone(),
            self.quarantined.clone(),
        );
        let (stop, stop_signal) = oneshot::channel();
        let task = spawn_instrumented(
            "inbound_acceptor",
            info_span!("inbound_acceptor", local = %local),
            inbound_acceptor::run(session, listener.incoming, stop_signal),
        );

        state.local_address = Some(local.clone());
        state.acceptor = Some(AcceptorTask { stop, task });
        Ok(local)
    }

    /// Opens a connection to `remote` and runs the handshake within the handshake timeout.
    pub async fn associate(
        &self,
        remote: &Address,
        refuse_uid: Option<u64>,
    ) -> Result<Association, AssociationError> {
        let local = self
            .local_address()
            .await
            .ok_or(TransportError::NotListening)?;

        tokio::time::timeout(
            self.handshake_timeout,
            self.open_association(local, remote, refuse_uid),
        )
        .await
        .map_err(|_| AssociationError::HandshakeTimeout(self.handshake_timeout))?
    }

    async fn open_association(
        &self,
        local: Address,
        remote: &Address,
        refuse_uid: Option<u64>,
    ) -> Result<Association, AssociationError> {
        let mut connection = self.driver.connect(remote).await?;
        match self
            .handshake(local, connection.as_mut(), refuse_uid)
            .await
        {
            Ok(remote_uid) => Ok(Association {
                connection,
                remote_uid,
            }),
            Err(err) => {
                connection.close().await;
                Err(err)
            }
        }
    }

    async fn handshake(
        &self,
        local: Address,
        connection: &mut dyn Connection,
        refuse_uid: Option<u64>,
    ) -> Result<u64, AssociationError> {
        let hello = WireFrame::Associate {
            origin: local,
            uid: self.local_uid,
        }
        .encode()?;
        connection.write_frame(&hello).await?;

        let reply = connection
            .read_frame()
            .await?
            .ok_or(TransportError::ConnectionClosed)?;
        match WireFrame::decode(&reply)? {
            WireFrame::Associate { uid, .. } if refuse_uid == Some(uid) => {
                Err(AssociationError::HandshakeRefused { uid })
            }
            WireFrame::Associate { uid, .. } => Ok(uid),
            WireFrame::Disassociate { reason } => Err(AssociationError::Disassociated(reason)),
            other => Err(AssociationError::UnexpectedFrame(other.kind())),
        }
    }

    /// Stops accepting, closes inbound associations and shuts the driver down.
    pub async fn shutdown(&self) {
        let acceptor = {
            let mut state = self.state.lock().await;
            state.local_address = None;
            state.acceptor.take()
        };
        if let Some(AcceptorTask { stop, task }) = acceptor {
            let _ = stop.send(());
            let _ = task.await;
        }
        self.driver.shutdown().await;
    }
}

impl Debug for ProtocolTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolTransport")
            .field("scheme", &self.scheme)
            .field("local_uid", &self.local_uid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{protocol_scheme, ProtocolTransport};
    use crate::address::Address;
    use crate::envelope::InboundEnvelope;
    use crate::inbound::InboundDispatcher;
    use crate::protocol::error::AssociationError;
    use crate::protocol::wire::WireFrame;
    use crate::transport::driver::{DriverContext, TransportDriver};
    use crate::transport::error::TransportError;
    use crate::transport::loopback::{LoopbackDriver, LoopbackNetwork};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct CollectingDispatcher {
        received: Mutex<Vec<InboundEnvelope>>,
    }

    impl InboundDispatcher for CollectingDispatcher {
        fn dispatch(&self, envelope: InboundEnvelope) {
            self.received.lock().unwrap().push(envelope);
        }
    }

    fn loopback_transport(
        network: &LoopbackNetwork,
        system: &str,
        uid: u64,
        dispatcher: Arc<CollectingDispatcher>,
    ) -> ProtocolTransport {
        let driver = LoopbackDriver::from_settings(
            network.clone(),
            &DriverContext::new(system),
            &serde_json::json!({ "host": system }),
        )
        .unwrap();
        ProtocolTransport::new(Arc::new(driver), uid, Duration::from_secs(5), dispatcher)
    }

    #[test]
    fn scheme_is_prefixed() {
        assert_eq!(protocol_scheme("tcp"), "remote.tcp");
    }

    #[tokio::test]
    async fn listen_normalizes_the_bound_address() {
        let network = LoopbackNetwork::new();
        let transport = loopback_transport(&network, "alpha", 1, Arc::default());

        let local = transport.listen().await.unwrap();

        assert_eq!(local.protocol(), "remote.loopback");
        assert_eq!(local.system(), "alpha");
        assert_eq!(transport.listen().await.unwrap(), local);
        assert_eq!(transport.local_address().await, Some(local));
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn associate_before_listen_fails() {
        let network = LoopbackNetwork::new();
        let transport = loopback_transport(&network, "alpha", 1, Arc::default());

        let result = transport
            .associate(&Address::new("remote.loopback", "beta", "beta", 1), None)
            .await;

        assert!(matches!(
            result,
            Err(AssociationError::Transport(TransportError::NotListening))
        ));
    }

    #[tokio::test]
    async fn handshake_exchanges_uids_and_delivers_payloads() {
        let network = LoopbackNetwork::new();
        let alpha = loopback_transport(&network, "alpha", 11, Arc::default());
        let beta_inbound = Arc::new(CollectingDispatcher::default());
        let beta = loopback_transport(&network, "beta", 22, beta_inbound.clone());
        let alpha_address = alpha.listen().await.unwrap();
        let beta_address = beta.listen().await.unwrap();

        let mut association = alpha.associate(&beta_address, None).await.unwrap();
        assert_eq!(association.remote_uid(), 22);

        let frame = WireFrame::Payload {
            recipient: "/user/echo".to_string(),
            payload: b"hi".to_vec(),
        };
        association
            .write_frame(&frame.encode().unwrap())
            .await
            .unwrap();
        let bye = WireFrame::Disassociate {
            reason: "done".to_string(),
        };
        association.write_frame(&bye.encode().unwrap()).await.unwrap();
        association.close().await;

        for _ in 0..100 {
            if !beta_inbound.received.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let received = beta_inbound.received.lock().unwrap().clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].origin, alpha_address);
        assert_eq!(received[0].origin_uid, 11);
        assert_eq!(received[0].recipient_path, "/user/echo");
        assert_eq!(received[0].payload, b"hi".to_vec());

        alpha.shutdown().await;
        beta.shutdown().await;
    }

    #[tokio::test]
    async fn refused_uid_fails_the_handshake() {
        let network = LoopbackNetwork::new();
        let alpha = loopback_transport(&network, "alpha", 11, Arc::default());
        let beta = loopback_transport(&network, "beta", 7, Arc::default());
        alpha.listen().await.unwrap();
        let beta_address = beta.listen().await.unwrap();

        let refused = alpha.associate(&beta_address, Some(7)).await;
        assert!(matches!(
            refused,
            Err(AssociationError::HandshakeRefused { uid: 7 })
        ));

        let other_incarnation = alpha.associate(&beta_address, Some(6)).await;
        assert!(other_incarnation.is_ok());
    }

    #[tokio::test]
    async fn quarantined_inbound_peer_is_turned_away() {
        let network = LoopbackNetwork::new();
        let alpha = loopback_transport(&network, "alpha", 11, Arc::default());
        let (quarantine, view) = tokio::sync::watch::channel(std::collections::BTreeMap::new());
        let beta_inbound = Arc::new(CollectingDispatcher::default());
        let beta =
            loopback_transport(&network, "beta", 22, beta_inbound.clone()).with_quarantine_view(view);
        let alpha_address = alpha.listen().await.unwrap();
        let beta_address = beta.listen().await.unwrap();

        quarantine.send_replace([(alpha_address.clone(), 11)].into_iter().collect());
        let refused = alpha.associate(&beta_address, None).await;
        assert!(matches!(
            refused,
            Err(AssociationError::Disassociated(reason)) if reason == "quarantined"
        ));

        quarantine.send_replace([(alpha_address, 10)].into_iter().collect());
        assert!(alpha.associate(&beta_address, None).await.is_ok());
        assert!(beta_inbound.received.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let network = LoopbackNetwork::new();
        let alpha = loopback_transport(&network, "alpha", 11, Arc::default());
        alpha.listen().await.unwrap();

        // A raw listener accepts the connection but never answers the handshake.
        let silent = LoopbackDriver::from_settings(
            network.clone(),
            &DriverContext::new("mute"),
            &serde_json::json!({ "host": "mute" }),
        )
        .unwrap();
        let mut listener = silent.listen().await.unwrap();
        let peer = listener.address.with_protocol("remote.loopback");

        let pending = tokio::spawn(async move { alpha.associate(&peer, None).await });
        let _accepted = listener.incoming.recv().await.unwrap();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(AssociationError::HandshakeTimeout(_))));
    }
}
