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

//! Canonical structured field values and value-format helpers.

use std::time::Duration;

pub const NONE: &str = "none";
pub const REASON_TERMINATED: &str = "terminated";
pub const REASON_MAILBOX_CLOSED: &str = "mailbox_closed";
pub const REASON_PEER_CLOSED: &str = "peer_closed";
pub const REASON_QUARANTINED: &str = "quarantined";

/// Short correlation id for logs: the first hyphen-separated block of a worker id.
pub fn short_worker_id(worker_id: &str) -> &str {
    worker_id.split('-').next().unwrap_or(worker_id)
}

pub fn format_optional_uid(uid: Option<u64>) -> String {
    uid.map(|uid| uid.to_string())
        .unwrap_or_else(|| NONE.to_string())
}

pub fn format_millis(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}
