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

use endpoint_remoting::{
    Address, EndpointManagerHandle, PolicySnapshot, RemoteActorRef, RemoteSettings,
    TransportSettings,
};

pub(crate) const TARGET_PATH: &str = "/user/target";

/// Loopback transport settings pinned to `host:port`, so a restarted system reuses
/// its address.
pub(crate) fn pinned_loopback(host: &str, port: u16) -> TransportSettings {
    TransportSettings::new(
        "loopback",
        serde_json::json!({ "host": host, "port": port }),
    )
}

pub(crate) fn pinned_settings(system: &str, transports: Vec<TransportSettings>) -> RemoteSettings {
    let mut settings = integration_test_utils::loopback_settings(system, &[]);
    settings.transports = transports;
    settings
}

pub(crate) fn recipient(remote: &Address, local: &Address) -> RemoteActorRef {
    RemoteActorRef::new(remote.clone(), TARGET_PATH, local.clone())
}

pub(crate) async fn listen_single(handle: &EndpointManagerHandle) -> Address {
    let mut pairs = handle.listen().await.expect("listen should succeed");
    assert_eq!(pairs.len(), 1);
    pairs.remove(0).address
}

/// Polls the manager until the policy of `remote` satisfies `accept`. Never sleeps, so
/// paused-clock tests keep their time.
#[allow(dead_code)]
pub(crate) async fn await_policy(
    handle: &EndpointManagerHandle,
    remote: &Address,
    accept: impl Fn(&PolicySnapshot) -> bool,
) -> PolicySnapshot {
    let mut last = None;
    for _ in 0..1_000 {
        last = handle.policy(remote).await;
        if let Some(policy) = last.as_ref().filter(|policy| accept(policy)) {
            return policy.clone();
        }
        tokio::task::yield_now().await;
    }
    panic!("policy for {remote} never matched; last seen {last:?}");
}

#[allow(dead_code)]
pub(crate) async fn pass_worker_id(handle: &EndpointManagerHandle, remote: &Address) -> String {
    match handle.policy(remote).await {
        Some(PolicySnapshot::Pass { worker_id }) => worker_id,
        other => panic!("expected pass policy for {remote}, got {other:?}"),
    }
}
