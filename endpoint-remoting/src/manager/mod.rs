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

//! Manager surface: the mailbox loop, its command protocol and the public handle.

pub(crate) mod command;
pub(crate) mod endpoint_manager;
pub(crate) mod handle;
pub(crate) mod listen_error;
pub(crate) mod snapshot;
