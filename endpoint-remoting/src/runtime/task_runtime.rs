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

//! Instrumented task spawning on the ambient tokio runtime.

use crate::observability::events;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument, Span};

const COMPONENT: &str = "task_runtime";

/// Spawns `future` on the current tokio runtime, instrumented with `span`.
///
/// Must be called from within a tokio runtime.
pub(crate) fn spawn_instrumented<F>(task: &'static str, span: Span, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    debug!(
        event = events::RUNTIME_SPAWN,
        component = COMPONENT,
        task,
        "spawning task"
    );
    tokio::spawn(future.instrument(span))
}
