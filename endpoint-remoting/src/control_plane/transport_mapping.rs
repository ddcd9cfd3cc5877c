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

//! Local address -> protocol transport mapping installed by `Listen`.

use crate::address::Address;
use crate::protocol::protocol_transport::{ProtocolTransport, ProtocolTransportAddressPair};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct TransportMapping {
    transports: HashMap<Address, Arc<ProtocolTransport>>,
    order: Vec<Address>,
}

impl TransportMapping {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole mapping with `pairs`.
    pub(crate) fn install(&mut self, pairs: &[ProtocolTransportAddressPair]) {
        self.transports = pairs
            .iter()
            .map(|pair| (pair.address.clone(), pair.transport.clone()))
            .collect();
        self.order = pairs.iter().map(|pair| pair.address.clone()).collect();
    }

    pub(crate) fn get(&self, local: &Address) -> Option<Arc<ProtocolTransport>> {
        self.transports.get(local).cloned()
    }

    /// Local addresses in `Listen` order.
    pub(crate) fn addresses(&self) -> &[Address] {
        &self.order
    }

    /// Empties the mapping and returns the transports it held, in `Listen` order.
    pub(crate) fn drain(&mut self) -> Vec<Arc<ProtocolTransport>> {
        let order = std::mem::take(&mut self.order);
        order
            .iter()
            .filter_map(|address| self.transports.remove(address))
            .collect()
    }
}
