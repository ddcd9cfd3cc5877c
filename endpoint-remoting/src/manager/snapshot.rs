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

//! Read-only views of the endpoint registry.

use crate::address::Address;
use std::collections::BTreeMap;
use std::time::Duration;

/// Policy currently held for one remote address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PolicySnapshot {
    Pass { worker_id: String },
    /// Sends divert to dead letters for another `release_in`.
    Gated { release_in: Duration },
    /// Incarnation `uid` has been refused for `quarantined_for`.
    Quarantined { uid: u64, quarantined_for: Duration },
}

impl PolicySnapshot {
    pub fn is_pass(&self) -> bool {
        matches!(self, PolicySnapshot::Pass { .. })
    }

    pub fn is_gated(&self) -> bool {
        matches!(self, PolicySnapshot::Gated { .. })
    }

    pub fn is_quarantined(&self) -> bool {
        matches!(self, PolicySnapshot::Quarantined { .. })
    }
}

/// Point-in-time copy of the manager's registry and transport mapping.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegistrySnapshot {
    pub entries: BTreeMap<Address, PolicySnapshot>,
    /// Incarnations refused per address; outlives the policy entry itself.
    pub quarantined_uids: BTreeMap<Address, u64>,
    /// Local addresses installed by the last successful `Listen`.
    pub local_addresses: Vec<Address>,
    /// Endpoint workers created since the manager started.
    pub workers_spawned: u64,
}

impl RegistrySnapshot {
    pub fn policy(&self, address: &Address) -> Option<&PolicySnapshot> {
        self.entries.get(address)
    }

    pub fn live_workers(&self) -> usize {
        self.entries.values().filter(|policy| policy.is_pass()).count()
    }
}
