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

//! Protocol layer.
//!
//! Decorates raw transport drivers with the association handshake: incarnation uid
//! exchange, quarantine refusal and handshake timeouts. Addresses leaving this layer
//! carry the `remote.<scheme>` protocol so the manager never sees raw driver schemes.

pub(crate) mod error;
pub(crate) mod protocol_transport;
pub(crate) mod wire;
