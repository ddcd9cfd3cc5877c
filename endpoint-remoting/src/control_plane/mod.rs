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

//! Control-plane layer.
//!
//! Owns the endpoint registry and its policy precedence (`Pass < Gated <
//! Quarantined`), gate escalation, and the transport mapping installed by `Listen`.
//! Everything here is plain data mutated only from the manager mailbox loop.

pub(crate) mod endpoint_policy;
pub(crate) mod endpoint_registry;
pub(crate) mod gate_backoff;
pub(crate) mod transport_mapping;
