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

mod integration_test_logging;
pub use integration_test_logging::init_logging;

mod integration_test_recorders;
pub use integration_test_recorders::{
    drain_dead_letters, next_dead_letter, next_inbound, RecordingDeadLetters, RecordingInbound,
};

mod integration_test_systems;
pub use integration_test_systems::{
    loopback_address, loopback_settings, spawn_configured_system, spawn_system,
    unused_loopback_address, SystemUnderTest,
};
