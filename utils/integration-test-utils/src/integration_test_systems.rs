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

use crate::{RecordingDeadLetters, RecordingInbound};
use endpoint_remoting::{
    Address, DeadLetter, DriverRegistry, EndpointManager, EndpointManagerHandle,
    InboundEnvelope, LoopbackNetwork, RemoteSettings, TransportSettings,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Keeps gate expiry in tests driven by explicit sends rather than the pruning tick.
const TEST_PRUNE_INTERVAL_MS: u64 = 3_600_000;

/// Settings for one system with one loopback transport per host.
pub fn loopback_settings(system: &str, hosts: &[&str]) -> RemoteSettings {
    let transports = hosts
        .iter()
        .map(|host| TransportSettings::new("loopback", serde_json::json!({ "host": host })))
        .collect();
    let mut settings = RemoteSettings::new(system, transports);
    settings.prune_interval_ms = TEST_PRUNE_INTERVAL_MS;
    settings
}

/// Protocol-level address of a loopback endpoint.
pub fn loopback_address(system: &str, host: &str, port: u16) -> Address {
    Address::new("remote.loopback", system, host, port)
}

/// An address nothing on the network listens on.
pub fn unused_loopback_address(system: &str) -> Address {
    loopback_address(system, "nowhere", 1)
}

/// One spawned manager plus the channels its sinks record into.
pub struct SystemUnderTest {
    pub handle: EndpointManagerHandle,
    pub dead_letters: UnboundedReceiver<DeadLetter>,
    pub inbound: UnboundedReceiver<InboundEnvelope>,
}

/// Spawns a manager wired to `network` with recording sinks and a fixed uid.
pub fn spawn_system(
    network: &LoopbackNetwork,
    settings: RemoteSettings,
    uid: u64,
) -> SystemUnderTest {
    spawn_configured_system(network, EndpointManager::new(settings).with_uid(uid))
}

/// Spawns a pre-configured `manager` with the network's drivers and recording sinks.
pub fn spawn_configured_system(
    network: &LoopbackNetwork,
    manager: EndpointManager,
) -> SystemUnderTest {
    let mut drivers = DriverRegistry::with_defaults();
    network.register_driver(&mut drivers);
    let (dead_letter_sink, dead_letters) = RecordingDeadLetters::channel();
    let (inbound_sink, inbound) = RecordingInbound::channel();

    let handle = manager
        .with_drivers(drivers)
        .with_dead_letters(dead_letter_sink)
        .with_inbound_dispatcher(inbound_sink)
        .spawn();

    SystemUnderTest {
        handle,
        dead_letters,
        inbound,
    }
}
