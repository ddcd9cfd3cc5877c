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

mod support;

use endpoint_remoting::{DeadLetterReason, EndpointManager, LoopbackNetwork, PolicySnapshot};
use integration_test_utils::{
    next_dead_letter, next_inbound, spawn_configured_system, spawn_system,
};
use support::{
    await_policy, listen_single, pass_worker_id, pinned_loopback, pinned_settings, recipient,
};

const BETA_PORT: u16 = 2553;

#[tokio::test]
async fn quarantine_refuses_the_old_incarnation_but_admits_a_new_one() {
    integration_test_utils::init_logging();

    let network = LoopbackNetwork::new();
    let mut alpha = spawn_system(
        &network,
        pinned_settings("alpha", vec![pinned_loopback("alpha", 2552)]),
        1,
    );
    let mut beta = spawn_system(
        &network,
        pinned_settings("beta", vec![pinned_loopback("beta", BETA_PORT)]),
        7,
    );
    let local = listen_single(&alpha.handle).await;
    let remote = listen_single(&beta.handle).await;

    alpha.handle.tell(recipient(&remote, &local), b"m1".to_vec());
    assert_eq!(next_inbound(&mut beta.inbound).await.origin_uid, 1);
    pass_worker_id(&alpha.handle, &remote).await;

    // Quarantine while the worker is live: the worker is terminated and the entry is sticky.
    alpha.handle.quarantine(remote.clone(), 7);
    assert!(matches!(
        alpha.handle.policy(&remote).await,
        Some(PolicySnapshot::Quarantined { uid: 7, .. })
    ));

    // The peer is still incarnation 7, so the next worker refuses it.
    alpha.handle.tell(recipient(&remote, &local), b"m2".to_vec());
    let refused = next_dead_letter(&mut alpha.dead_letters).await;
    assert_eq!(refused.reason, DeadLetterReason::EndpointClosed);
    assert_eq!(refused.envelope.payload(), b"m2");
    assert!(matches!(
        alpha.handle.policy(&remote).await,
        Some(PolicySnapshot::Quarantined { uid: 7, .. })
    ));

    let snapshot = alpha.handle.snapshot().await.expect("manager running");
    assert_eq!(snapshot.workers_spawned, 2);
    assert_eq!(snapshot.quarantined_uids.get(&remote), Some(&7));

    // A restarted peer with a new incarnation is accepted.
    beta.handle.shutdown().await;
    let mut beta = spawn_system(
        &network,
        pinned_settings("beta", vec![pinned_loopback("beta", BETA_PORT)]),
        8,
    );
    assert_eq!(listen_single(&beta.handle).await, remote);

    alpha.handle.tell(recipient(&remote, &local), b"m3".to_vec());
    assert_eq!(next_inbound(&mut beta.inbound).await.payload, b"m3");
    assert!(alpha
        .handle
        .policy(&remote)
        .await
        .is_some_and(|policy| policy.is_pass()));

    alpha.handle.shutdown().await;
    beta.handle.shutdown().await;
}

#[tokio::test]
async fn quarantine_of_an_unseen_address_blocks_its_first_worker() {
    integration_test_utils::init_logging();

    let network = LoopbackNetwork::new();
    let mut alpha = spawn_system(
        &network,
        pinned_settings("alpha", vec![pinned_loopback("alpha", 2552)]),
        1,
    );
    let beta = spawn_system(
        &network,
        pinned_settings("beta", vec![pinned_loopback("beta", BETA_PORT)]),
        7,
    );
    let local = listen_single(&alpha.handle).await;
    let remote = listen_single(&beta.handle).await;

    alpha.handle.quarantine(remote.clone(), 7);
    alpha.handle.tell(recipient(&remote, &local), b"never".to_vec());

    assert_eq!(
        next_dead_letter(&mut alpha.dead_letters).await.reason,
        DeadLetterReason::EndpointClosed
    );
    assert!(matches!(
        alpha.handle.policy(&remote).await,
        Some(PolicySnapshot::Quarantined { uid: 7, .. })
    ));
}

#[tokio::test]
async fn quarantined_incarnation_cannot_associate_inbound() {
    integration_test_utils::init_logging();

    let network = LoopbackNetwork::new();
    let mut alpha = spawn_system(
        &network,
        pinned_settings("alpha", vec![pinned_loopback("alpha", 2552)]),
        1,
    );
    let mut beta = spawn_system(
        &network,
        pinned_settings("beta", vec![pinned_loopback("beta", BETA_PORT)]),
        7,
    );
    let alpha_address = listen_single(&alpha.handle).await;
    let beta_address = listen_single(&beta.handle).await;

    alpha.handle.quarantine(beta_address.clone(), 7);
    alpha.handle.snapshot().await.expect("manager running");

    beta.handle
        .tell(recipient(&alpha_address, &beta_address), b"blocked".to_vec());
    let refused = next_dead_letter(&mut beta.dead_letters).await;
    assert_eq!(refused.reason, DeadLetterReason::EndpointClosed);
    assert_eq!(refused.envelope.payload(), b"blocked");
    assert!(beta
        .handle
        .policy(&alpha_address)
        .await
        .is_some_and(|policy| policy.is_gated()));
    assert!(alpha.inbound.try_recv().is_err());

    alpha.handle.shutdown().await;
    beta.handle.shutdown().await;
}

#[tokio::test]
async fn quarantine_closes_an_inbound_association_already_open() {
    integration_test_utils::init_logging();

    let network = LoopbackNetwork::new();
    let mut alpha = spawn_system(
        &network,
        pinned_settings("alpha", vec![pinned_loopback("alpha", 2552)]),
        1,
    );
    let beta = spawn_system(
        &network,
        pinned_settings("beta", vec![pinned_loopback("beta", BETA_PORT)]),
        7,
    );
    let alpha_address = listen_single(&alpha.handle).await;
    let beta_address = listen_single(&beta.handle).await;

    beta.handle
        .tell(recipient(&alpha_address, &beta_address), b"m1".to_vec());
    assert_eq!(next_inbound(&mut alpha.inbound).await.payload, b"m1");

    alpha.handle.quarantine(beta_address.clone(), 7);

    // Alpha drops the inbound association, so beta's idle worker fails and gates alpha.
    await_policy(&beta.handle, &alpha_address, PolicySnapshot::is_gated).await;
    assert!(alpha.inbound.try_recv().is_err());

    alpha.handle.shutdown().await;
    beta.handle.shutdown().await;
}

#[tokio::test]
async fn restored_quarantine_holds_until_cleared() {
    integration_test_utils::init_logging();

    let network = LoopbackNetwork::new();
    let mut beta = spawn_system(
        &network,
        pinned_settings("beta", vec![pinned_loopback("beta", BETA_PORT)]),
        7,
    );
    let remote = listen_single(&beta.handle).await;

    // The first run of alpha quarantines beta and exports its tombstones.
    let first_run = spawn_system(
        &network,
        pinned_settings("alpha", vec![pinned_loopback("alpha", 2552)]),
        1,
    );
    first_run.handle.quarantine(remote.clone(), 7);
    let exported = first_run
        .handle
        .snapshot()
        .await
        .expect("manager running")
        .quarantined_uids;
    first_run.handle.shutdown().await;
    assert_eq!(exported.get(&remote), Some(&7));

    // The restarted alpha still refuses beta's incarnation.
    let mut alpha = spawn_configured_system(
        &network,
        EndpointManager::new(pinned_settings(
            "alpha",
            vec![pinned_loopback("alpha", 2552)],
        ))
        .with_uid(2)
        .with_quarantined(exported),
    );
    let local = listen_single(&alpha.handle).await;
    assert!(matches!(
        alpha.handle.policy(&remote).await,
        Some(PolicySnapshot::Quarantined { uid: 7, .. })
    ));

    alpha.handle.tell(recipient(&remote, &local), b"m1".to_vec());
    let refused = next_dead_letter(&mut alpha.dead_letters).await;
    assert_eq!(refused.reason, DeadLetterReason::EndpointClosed);
    assert_eq!(refused.envelope.payload(), b"m1");

    alpha.handle.clear_quarantine(remote.clone());
    assert_eq!(alpha.handle.policy(&remote).await, None);
    assert!(alpha
        .handle
        .snapshot()
        .await
        .expect("manager running")
        .quarantined_uids
        .is_empty());

    alpha.handle.tell(recipient(&remote, &local), b"m2".to_vec());
    let delivered = next_inbound(&mut beta.inbound).await;
    assert_eq!(delivered.payload, b"m2");
    assert_eq!(delivered.origin_uid, 2);

    alpha.handle.shutdown().await;
    beta.handle.shutdown().await;
}
