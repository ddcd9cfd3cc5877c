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

//! Remote address -> endpoint policy table.

use crate::address::Address;
use crate::control_plane::endpoint_policy::EndpointPolicy;
use crate::data_plane::endpoint_worker::EndpointWorkerHandle;
use crate::manager::snapshot::PolicySnapshot;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::time::Instant;

/// Quarantined incarnation of an address, kept after the policy entry moves on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Tombstone {
    uid: u64,
    since: Instant,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum RegistryError {
    EndpointAlreadyRegistered { address: Address, worker_id: String },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::EndpointAlreadyRegistered { address, worker_id } => write!(
                f,
                "endpoint {address} already served by live worker {worker_id}"
            ),
        }
    }
}

impl Error for RegistryError {}

/// One policy entry per remote address, plus quarantine tombstones.
///
/// Only the manager mailbox loop owns and mutates the registry.
#[derive(Debug, Default)]
pub(crate) struct EndpointRegistry {
    policies: HashMap<Address, EndpointPolicy>,
    tombstones: HashMap<Address, Tombstone>,
}

impl EndpointRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lookup(&self, address: &Address) -> Option<&EndpointPolicy> {
        self.policies.get(address)
    }

    /// Stores `worker` as the `Pass` entry for `address`.
    ///
    /// Fails while a different worker is still alive for the address. Any `Gated` or
    /// `Quarantined` entry is replaced; the quarantine tombstone stays.
    pub(crate) fn register_writable(
        &mut self,
        address: Address,
        worker: EndpointWorkerHandle,
    ) -> Result<(), RegistryError> {
        if let Some(EndpointPolicy::Pass(current)) = self.policies.get(&address) {
            if current.worker_id() != worker.worker_id() && current.is_alive() {
                return Err(RegistryError::EndpointAlreadyRegistered {
                    worker_id: current.worker_id().to_string(),
                    address,
                });
            }
        }
        self.policies.insert(address, EndpointPolicy::Pass(worker));
        Ok(())
    }

    /// Gates `address` until `release_at`. Returns `false`, leaving the entry
    /// untouched, when the current entry outranks a gate.
    pub(crate) fn mark_gated(&mut self, address: Address, release_at: Instant) -> bool {
        let gated = EndpointPolicy::Gated { release_at };
        if let Some(current) = self.policies.get(&address) {
            if current.precedence() > gated.precedence() {
                return false;
            }
        }
        self.policies.insert(address, gated);
        true
    }

    /// Quarantines incarnation `uid` of `address`, returning the replaced entry so the
    /// caller can terminate a live worker. Re-quarantining the same uid keeps the
    /// original timestamp.
    pub(crate) fn mark_quarantined(
        &mut self,
        address: Address,
        uid: u64,
        now: Instant,
    ) -> Option<EndpointPolicy> {
        let since = match self.tombstones.get(&address) {
            Some(tombstone) if tombstone.uid == uid => tombstone.since,
            _ => now,
        };
        self.tombstones
            .insert(address.clone(), Tombstone { uid, since });
        self.policies
            .insert(address, EndpointPolicy::Quarantined { uid, since })
    }

    pub(crate) fn remove(&mut self, address: &Address) -> Option<EndpointPolicy> {
        self.policies.remove(address)
    }

    /// Forgets the quarantine of `address`: its tombstone and a `Quarantined` entry.
    /// Returns the incarnation uid that was refused.
    pub(crate) fn clear_quarantine(&mut self, address: &Address) -> Option<u64> {
        if matches!(
            self.policies.get(address),
            Some(EndpointPolicy::Quarantined { .. })
        ) {
            self.remove(address);
        }
        self.tombstones.remove(address).map(|tombstone| tombstone.uid)
    }

    /// Incarnation a new worker for `address` must refuse, if any.
    pub(crate) fn refuse_uid(&self, address: &Address) -> Option<u64> {
        self.tombstones.get(address).map(|tombstone| tombstone.uid)
    }

    /// Removes every `Gated` entry whose release time has passed.
    pub(crate) fn prune_expired(&mut self, now: Instant) -> Vec<Address> {
        let expired: Vec<Address> = self
            .policies
            .iter()
            .filter_map(|(address, policy)| match policy {
                EndpointPolicy::Gated { release_at } if *release_at <= now => {
                    Some(address.clone())
                }
                _ => None,
            })
            .collect();
        for address in &expired {
            self.remove(address);
        }
        expired
    }

    /// Removes every `Pass` entry and hands back the worker handles.
    pub(crate) fn drain_workers(&mut self) -> Vec<EndpointWorkerHandle> {
        let passing: Vec<Address> = self
            .policies
            .iter()
            .filter(|(_, policy)| matches!(policy, EndpointPolicy::Pass(_)))
            .map(|(address, _)| address.clone())
            .collect();
        passing
            .iter()
            .filter_map(|address| match self.policies.remove(address) {
                Some(EndpointPolicy::Pass(worker)) => Some(worker),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn snapshot(&self, now: Instant) -> BTreeMap<Address, PolicySnapshot> {
        self.policies
            .iter()
            .map(|(address, policy)| (address.clone(), policy.snapshot(now)))
            .collect()
    }

    pub(crate) fn quarantined_uids(&self) -> BTreeMap<Address, u64> {
        self.tombstones
            .iter()
            .map(|(address, tombstone)| (address.clone(), tombstone.uid))
            .collect()
    }
}
