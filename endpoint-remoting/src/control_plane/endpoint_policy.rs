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

//! Per-address endpoint policy and its precedence order.

use crate::data_plane::endpoint_worker::EndpointWorkerHandle;
use crate::manager::snapshot::PolicySnapshot;
use tokio::time::Instant;

#[derive(Debug)]
pub(crate) enum EndpointPolicy {
    /// Reachable through the live worker held here.
    Pass(EndpointWorkerHandle),
    /// Blocked until `release_at`; the first send after that creates a new worker.
    Gated { release_at: Instant },
    /// Blocked for incarnation `uid`.
    Quarantined { uid: u64, since: Instant },
}

impl EndpointPolicy {
    /// Rank in the total order `Pass < Gated < Quarantined`. A failure report may
    /// only move an entry up this order.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            EndpointPolicy::Pass(_) => 0,
            EndpointPolicy::Gated { .. } => 1,
            EndpointPolicy::Quarantined { .. } => 2,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            EndpointPolicy::Pass(_) => "pass",
            EndpointPolicy::Gated { .. } => "gated",
            EndpointPolicy::Quarantined { .. } => "quarantined",
        }
    }

    pub(crate) fn snapshot(&self, now: Instant) -> PolicySnapshot {
        match self {
            EndpointPolicy::Pass(worker) => PolicySnapshot::Pass {
                worker_id: worker.worker_id().to_string(),
            },
            EndpointPolicy::Gated { release_at } => PolicySnapshot::Gated {
                release_in: release_at.saturating_duration_since(now),
            },
            EndpointPolicy::Quarantined { uid, since } => PolicySnapshot::Quarantined {
                uid: *uid,
                quarantined_for: now.saturating_duration_since(*since),
            },
        }
    }
}
