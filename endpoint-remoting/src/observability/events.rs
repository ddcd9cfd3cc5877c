//! Canonical structured event names used across `endpoint-remoting`.

// Manager mailbox events.
pub const MANAGER_STARTED: &str = "manager_started";
pub const MANAGER_STOPPED: &str = "manager_stopped";
pub const LISTEN_START: &str = "listen_start";
pub const LISTEN_OK: &str = "listen_ok";
pub const LISTEN_FAILED: &str = "listen_failed";
pub const LISTEN_REPLACED: &str = "listen_replaced";
pub const SEND_FORWARD: &str = "send_forward";
pub const SEND_GATED: &str = "send_gated";
pub const SEND_NO_TRANSPORT: &str = "send_no_transport";
pub const SEND_QUEUE_OVERFLOW: &str = "send_queue_overflow";
pub const SEND_MANAGER_STOPPED: &str = "send_manager_stopped";
pub const ENDPOINT_FAILED: &str = "endpoint_failed";
pub const ENDPOINT_FAILED_STALE: &str = "endpoint_failed_stale";
pub const ENDPOINT_QUARANTINED: &str = "endpoint_quarantined";
pub const QUARANTINE_CLEARED: &str = "quarantine_cleared";
pub const GATE_PRUNED: &str = "gate_pruned";

// Endpoint worker events.
pub const WORKER_CREATE: &str = "worker_create";
pub const WORKER_ASSOCIATING: &str = "worker_associating";
pub const WORKER_OPEN: &str = "worker_open";
pub const WORKER_WRITE_FAILED: &str = "worker_write_failed";
pub const WORKER_MESSAGE_REJECTED: &str = "worker_message_rejected";
pub const WORKER_PEER_CLOSED: &str = "worker_peer_closed";
pub const WORKER_CLOSED: &str = "worker_closed";
pub const WORKER_HANDSHAKE_REFUSED: &str = "worker_handshake_refused";

// Transport and protocol events.
pub const DRIVER_BOUND: &str = "driver_bound";
pub const DRIVER_SHUTDOWN: &str = "driver_shutdown";
pub const INBOUND_ACCEPTED: &str = "inbound_accepted";
pub const INBOUND_HANDSHAKE_FAILED: &str = "inbound_handshake_failed";
pub const INBOUND_CLOSED: &str = "inbound_closed";
pub const INBOUND_DISPATCH: &str = "inbound_dispatch";

// Sinks.
pub const DEAD_LETTER: &str = "dead_letter";

// Runtime.
pub const RUNTIME_SPAWN: &str = "runtime_spawn";
