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

//! Runtime integration layer.
//!
//! Every long-lived task of the crate (manager mailbox loop, endpoint workers,
//! inbound acceptors) is spawned through this layer so it runs inside its own
//! tracing span and shows up in the logs when it starts.

pub(crate) mod task_runtime;
