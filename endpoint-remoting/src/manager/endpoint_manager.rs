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

//! Endpoint manager: single mailbox loop owning the registry and transport mapping.

use crate::address::Address;
use crate::control_plane::endpoint_policy::EndpointPolicy;
use crate::control_plane::endpoint_registry::EndpointRegistry;
use crate::control_plane::gate_backoff::GateBackoff;
use crate::control_plane::transport_mapping::TransportMapping;
use crate::data_plane::endpoint_worker::{
    spawn_endpoint_worker, EndpointWorkerConfig, EndpointWorkerHandle, ForwardError,
};
use crate::dead_letters::{DeadLetter, DeadLetterReason, DeadLetterSink, LoggingDeadLetters};
use crate::envelope::RemoteEnvelope;
use crate::inbound::{InboundDispatcher, LoggingInboundDispatcher};
use crate::manager::command::ManagerCommand;
use crate::manager::handle::EndpointManagerHandle;
use crate::manager::listen_error::ListenError;
use crate::manager::snapshot::RegistrySnapshot;
use crate::observability::{events, fields};
use crate::protocol::protocol_transport::{ProtocolTransport, ProtocolTransportAddressPair};
use crate::runtime::task_runtime::spawn_instrumented;
use crate::settings::RemoteSettings;
use crate::transport::driver::{DriverContext, TransportDriver};
use crate::transport::driver_registry::DriverRegistry;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

const COMPONENT: &str = "endpoint_manager";

///
/// [`EndpointManager`] configures and spawns the manager mailbox loop.
///
/// The loop processes one command at a time, so every registry mutation is
/// serialized without locks. Workers and callers talk to it only through the
/// mailbox behind [`EndpointManagerHandle`].
///
/// # Examples
///
/// ```
/// use endpoint_remoting::{
///     DriverRegistry, EndpointManager, LoopbackNetwork, RemoteSettings, TransportSettings,
/// };
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let network = LoopbackNetwork::new();
/// let mut drivers = DriverRegistry::with_defaults();
/// network.register_driver(&mut drivers);
///
/// let settings = RemoteSettings::new(
///     "orders",
///     vec![TransportSettings::new("loopback", serde_json::json!({ "host": "orders" }))],
/// );
/// let manager = EndpointManager::new(settings).with_drivers(drivers).spawn();
///
/// let pairs = manager.listen().await.unwrap();
/// assert_eq!(pairs.len(), 1);
/// assert_eq!(pairs[0].address.protocol(), "remote.loopback");
///
/// manager.shutdown().await;
/// # });
/// ```
pub struct EndpointManager {
    settings: RemoteSettings,
    drivers: DriverRegistry,
    dead_letters: Arc<dyn DeadLetterSink>,
    inbound: Arc<dyn InboundDispatcher>,
    uid: u64,
    quarantined: Vec<(Address, u64)>,
}

impl EndpointManager {
    /// Manager with the built-in drivers, logging sinks and a random incarnation uid.
    pub fn new(settings: RemoteSettings) -> Self {
        Self {
            settings,
            drivers: DriverRegistry::with_defaults(),
            dead_letters: Arc::new(LoggingDeadLetters),
            inbound: Arc::new(LoggingInboundDispatcher),
            uid: Uuid::new_v4().as_u128() as u64,
            quarantined: Vec::new(),
        }
    }

    pub fn with_drivers(mut self, drivers: DriverRegistry) -> Self {
        self.drivers = drivers;
        self
    }

    pub fn with_dead_letters(mut self, dead_letters: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = dead_letters;
        self
    }

    pub fn with_inbound_dispatcher(mut self, inbound: Arc<dyn InboundDispatcher>) -> Self {
        self.inbound = inbound;
        self
    }

    /// Overrides the incarnation uid presented in handshakes.
    pub fn with_uid(mut self, uid: u64) -> Self {
        self.uid = uid;
        self
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Restores quarantines recorded by an earlier run, e.g. from
    /// [`RegistrySnapshot::quarantined_uids`]. They stay in force until
    /// [`EndpointManagerHandle::clear_quarantine`].
    pub fn with_quarantined(mut self, quarantined: impl IntoIterator<Item = (Address, u64)>) -> Self {
        self.quarantined.extend(quarantined);
        self
    }

    /// Spawns the mailbox loop on the current tokio runtime.
    ///
    /// The loop stops on [`EndpointManagerHandle::shutdown`] or once every handle is
    /// dropped.
    pub fn spawn(self) -> EndpointManagerHandle {
        let (commands, mailbox) = mpsc::unbounded_channel();
        let handle = EndpointManagerHandle::new(
            commands.clone(),
            self.dead_letters.clone(),
            &self.settings.system_name,
            self.uid,
        );
        let span = info_span!(
            "endpoint_manager",
            system = self.settings.system_name.as_str(),
            uid = self.uid
        );
        let mut registry = EndpointRegistry::new();
        let now = Instant::now();
        for (address, uid) in self.quarantined {
            registry.mark_quarantined(address, uid, now);
        }
        let (quarantine_view, _) = watch::channel(registry.quarantined_uids());
        let manager_loop = ManagerLoop {
            gate_backoff: GateBackoff::new(&self.settings.gate),
            settings: self.settings,
            drivers: self.drivers,
            dead_letters: self.dead_letters,
            inbound: self.inbound,
            uid: self.uid,
            registry,
            quarantine_view,
            transports: TransportMapping::new(),
            mailbox: commands.downgrade(),
            workers_spawned: 0,
        };
        spawn_instrumented("endpoint_manager", span, manager_loop.run(mailbox));
        handle
    }
}

struct ManagerLoop {
    settings: RemoteSettings,
    drivers: DriverRegistry,
    dead_letters: Arc<dyn DeadLetterSink>,
    inbound: Arc<dyn InboundDispatcher>,
    uid: u64,
    registry: EndpointRegistry,
    /// Quarantined uids as seen by the inbound side of every bound transport.
    quarantine_view: watch::Sender<BTreeMap<Address, u64>>,
    gate_backoff: GateBackoff,
    transports: TransportMapping,
    mailbox: mpsc::WeakUnboundedSender<ManagerCommand>,
    workers_spawned: u64,
}

impl ManagerLoop {
    async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<ManagerCommand>) {
        info!(
            event = events::MANAGER_STARTED,
            component = COMPONENT,
            system = self.settings.system_name.as_str(),
            uid = self.uid,
            "endpoint manager started"
        );

        let period = self.settings.prune_interval();
        let mut prune = tokio::time::interval_at(Instant::now() + period, period);
        prune.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut shutdown_reply = None;
        loop {
            tokio::select! {
                command = mailbox.recv() => match command {
                    Some(command) => {
                        if let ControlFlow::Break(reply) = self.handle(command).await {
                            shutdown_reply = Some(reply);
                            break;
                        }
                    }
                    None => break,
                },
                _ = prune.tick() => self.prune_expired_gates(),
            }
        }

        self.shutdown().await;
        mailbox.close();
        while let Ok(command) = mailbox.try_recv() {
            if let ManagerCommand::Send { envelope } = command {
                self.divert(envelope, DeadLetterReason::ManagerStopped);
            }
        }
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }

        info!(
            event = events::MANAGER_STOPPED,
            component = COMPONENT,
            system = self.settings.system_name.as_str(),
            "endpoint manager stopped"
        );
    }

    /// Breaks with the reply channel of a `Shutdown` command.
    async fn handle(&mut self, command: ManagerCommand) -> ControlFlow<oneshot::Sender<()>> {
        match command {
            ManagerCommand::Listen { reply } => {
                let result = self.listen().await;
                let _ = reply.send(result);
            }
            ManagerCommand::Send { envelope } => self.send(envelope),
            ManagerCommand::EndpointFailed {
                remote,
                worker_id,
                cause,
            } => self.endpoint_failed(remote, &worker_id, &cause),
            ManagerCommand::EndpointAssociated {
                remote,
                worker_id,
                uid,
            } => self.endpoint_associated(&remote, &worker_id, uid),
            ManagerCommand::Quarantine {
                remote,
                uid,
                reporter,
            } => self.quarantine(remote, uid, reporter),
            ManagerCommand::ClearQuarantine { remote } => self.clear_quarantine(&remote),
            ManagerCommand::Policy { remote, reply } => {
                let policy = self
                    .registry
                    .lookup(&remote)
                    .map(|policy| policy.snapshot(Instant::now()));
                let _ = reply.send(policy);
            }
            ManagerCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            ManagerCommand::Shutdown { reply } => return ControlFlow::Break(reply),
        }
        ControlFlow::Continue(())
    }

    async fn listen(&mut self) -> Result<Vec<ProtocolTransportAddressPair>, ListenError> {
        info!(
            event = events::LISTEN_START,
            component = COMPONENT,
            transports = self.settings.transports.len(),
            "binding configured transports"
        );

        let previous = self.transports.drain();
        if !previous.is_empty() {
            warn!(
                event = events::LISTEN_REPLACED,
                component = COMPONENT,
                transports = previous.len(),
                "re-listen: shutting down the installed transports first"
            );
        }
        for transport in previous {
            transport.shutdown().await;
        }

        let result = match self.construct_drivers() {
            Ok(drivers) => self.bind_all(drivers).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(pairs) => {
                self.transports.install(&pairs);
                let addresses: Vec<String> =
                    pairs.iter().map(|pair| pair.address.to_string()).collect();
                info!(
                    event = events::LISTEN_OK,
                    component = COMPONENT,
                    addresses = ?addresses,
                    "transports bound"
                );
                Ok(pairs)
            }
            Err(err) => {
                warn!(
                    event = events::LISTEN_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "listen failed; no transport installed"
                );
                Err(err)
            }
        }
    }

    /// Resolves and constructs every configured driver before anything is bound.
    fn construct_drivers(&self) -> Result<Vec<(String, Arc<dyn TransportDriver>)>, ListenError> {
        let context = DriverContext::new(&self.settings.system_name);
        self.settings
            .transports
            .iter()
            .map(|transport| {
                let factory = self.drivers.resolve(&transport.driver).ok_or_else(|| {
                    ListenError::UnknownDriver {
                        driver: transport.driver.clone(),
                    }
                })?;
                let driver = factory(&context, &transport.config).map_err(|source| {
                    ListenError::DriverConstruction {
                        driver: transport.driver.clone(),
                        source,
                    }
                })?;
                Ok((transport.driver.clone(), driver))
            })
            .collect()
    }

    /// Binds drivers in order; on the first failure, shuts down the ones already bound.
    async fn bind_all(
        &self,
        drivers: Vec<(String, Arc<dyn TransportDriver>)>,
    ) -> Result<Vec<ProtocolTransportAddressPair>, ListenError> {
        let mut bound: Vec<ProtocolTransportAddressPair> = Vec::with_capacity(drivers.len());
        for (name, driver) in drivers {
            let transport = Arc::new(
                ProtocolTransport::new(
                    driver,
                    self.uid,
                    self.settings.handshake_timeout(),
                    self.inbound.clone(),
                )
                .with_quarantine_view(self.quarantine_view.subscribe()),
            );
            match transport.listen().await {
                Ok(address) => bound.push(ProtocolTransportAddressPair { address, transport }),
                Err(source) => {
                    for pair in &bound {
                        pair.transport.shutdown().await;
                    }
                    return Err(ListenError::Bind {
                        driver: name,
                        source,
                    });
                }
            }
        }
        Ok(bound)
    }

    fn send(&mut self, envelope: RemoteEnvelope) {
        let remote = envelope.recipient().address().clone();
        let now = Instant::now();

        let refuse_uid = match self.registry.lookup(&remote) {
            Some(EndpointPolicy::Pass(worker)) => return self.forward(worker, envelope),
            Some(EndpointPolicy::Gated { release_at }) if now < *release_at => {
                debug!(
                    event = events::SEND_GATED,
                    component = COMPONENT,
                    remote = %remote,
                    release_in = %fields::format_millis(release_at.saturating_duration_since(now)),
                    "address gated; diverting send"
                );
                return self.divert(envelope, DeadLetterReason::Gated);
            }
            Some(EndpointPolicy::Quarantined { uid, .. }) => Some(*uid),
            Some(EndpointPolicy::Gated { .. }) | None => self.registry.refuse_uid(&remote),
        };

        let Some(worker) = self.create_endpoint(&envelope, refuse_uid) else {
            return self.divert(envelope, DeadLetterReason::NoTransportForLocalAddress);
        };
        self.forward(&worker, envelope);
        if let Err(err) = self.registry.register_writable(remote, worker) {
            warn!(
                component = COMPONENT,
                err = %err,
                "new endpoint worker not registered"
            );
        }
    }

    fn create_endpoint(
        &mut self,
        envelope: &RemoteEnvelope,
        refuse_uid: Option<u64>,
    ) -> Option<EndpointWorkerHandle> {
        let local = envelope.recipient().local_address();
        let Some(transport) = self.transports.get(local) else {
            warn!(
                event = events::SEND_NO_TRANSPORT,
                component = COMPONENT,
                local = %local,
                remote = %envelope.recipient().address(),
                "no transport bound to local address"
            );
            return None;
        };

        self.workers_spawned += 1;
        Some(spawn_endpoint_worker(
            EndpointWorkerConfig {
                local: local.clone(),
                remote: envelope.recipient().address().clone(),
                transport,
                refuse_uid,
                queue_capacity: self.settings.outbound_queue_capacity,
            },
            self.mailbox.clone(),
            self.dead_letters.clone(),
        ))
    }

    fn forward(&self, worker: &EndpointWorkerHandle, envelope: RemoteEnvelope) {
        match worker.forward(envelope) {
            Ok(()) => debug!(
                event = events::SEND_FORWARD,
                component = COMPONENT,
                worker_id = fields::short_worker_id(worker.worker_id()),
                "forwarded to endpoint worker"
            ),
            Err(ForwardError::QueueFull(envelope)) => {
                warn!(
                    event = events::SEND_QUEUE_OVERFLOW,
                    component = COMPONENT,
                    worker_id = fields::short_worker_id(worker.worker_id()),
                    remote = %envelope.recipient().address(),
                    "endpoint queue full; diverting send"
                );
                self.divert(envelope, DeadLetterReason::QueueOverflow);
            }
            Err(ForwardError::Closed(envelope)) => {
                self.divert(envelope, DeadLetterReason::EndpointClosed)
            }
        }
    }

    fn divert(&self, envelope: RemoteEnvelope, reason: DeadLetterReason) {
        self.dead_letters.publish(DeadLetter { envelope, reason });
    }

    fn endpoint_failed(&mut self, remote: Address, worker_id: &str, cause: &str) {
        let current = matches!(
            self.registry.lookup(&remote),
            Some(EndpointPolicy::Pass(worker)) if worker.worker_id() == worker_id
        );
        if !current {
            debug!(
                event = events::ENDPOINT_FAILED_STALE,
                component = COMPONENT,
                remote = %remote,
                worker_id = fields::short_worker_id(worker_id),
                policy = self.registry.lookup(&remote).map_or(fields::NONE, EndpointPolicy::name),
                "ignoring failure of superseded worker"
            );
            return;
        }

        let now = Instant::now();
        let gate = self.gate_backoff.next_gate(&remote, now);
        self.registry.mark_gated(remote.clone(), now + gate);
        warn!(
            event = events::ENDPOINT_FAILED,
            component = COMPONENT,
            remote = %remote,
            worker_id = fields::short_worker_id(worker_id),
            cause,
            gate = %fields::format_millis(gate),
            "endpoint failed; address gated"
        );
    }

    fn endpoint_associated(&mut self, remote: &Address, worker_id: &str, uid: u64) {
        if matches!(
            self.registry.lookup(remote),
            Some(EndpointPolicy::Pass(worker)) if worker.worker_id() == worker_id
        ) {
            self.gate_backoff.reset(remote);
            debug!(
                component = COMPONENT,
                remote = %remote,
                uid,
                "endpoint associated; failure streak reset"
            );
        }
    }

    fn quarantine(&mut self, remote: Address, uid: u64, reporter: Option<String>) {
        let previous = self
            .registry
            .mark_quarantined(remote.clone(), uid, Instant::now());
        if let Some(EndpointPolicy::Pass(worker)) = previous {
            worker.terminate();
        }
        self.gate_backoff.reset(&remote);
        self.publish_quarantine();
        warn!(
            event = events::ENDPOINT_QUARANTINED,
            component = COMPONENT,
            remote = %remote,
            uid,
            reporter = reporter.as_deref().map_or(fields::NONE, fields::short_worker_id),
            "address quarantined"
        );
    }

    fn clear_quarantine(&mut self, remote: &Address) {
        let Some(uid) = self.registry.clear_quarantine(remote) else {
            debug!(
                component = COMPONENT,
                remote = %remote,
                "no quarantine to clear"
            );
            return;
        };
        self.gate_backoff.reset(remote);
        self.publish_quarantine();
        info!(
            event = events::QUARANTINE_CLEARED,
            component = COMPONENT,
            remote = %remote,
            uid,
            "quarantine cleared"
        );
    }

    fn publish_quarantine(&self) {
        self.quarantine_view
            .send_replace(self.registry.quarantined_uids());
    }

    fn prune_expired_gates(&mut self) {
        let now = Instant::now();
        for address in self.registry.prune_expired(now) {
            debug!(
                event = events::GATE_PRUNED,
                component = COMPONENT,
                remote = %address,
                "expired gate removed"
            );
        }
        let streaks = self.gate_backoff.prune(now);
        if streaks > 0 {
            debug!(
                event = events::GATE_PRUNED,
                component = COMPONENT,
                streaks,
                "quiet failure streaks forgotten"
            );
        }
    }

    fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entries: self.registry.snapshot(Instant::now()),
            quarantined_uids: self.registry.quarantined_uids(),
            local_addresses: self.transports.addresses().to_vec(),
            workers_spawned: self.workers_spawned,
        }
    }

    async fn shutdown(&mut self) {
        for worker in self.registry.drain_workers() {
            worker.terminate();
        }
        for transport in self.transports.drain() {
            transport.shutdown().await;
        }
    }
}
