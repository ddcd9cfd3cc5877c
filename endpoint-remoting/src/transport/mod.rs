//! Transport layer.
//!
//! Owns the raw driver contract (bind, connect, frame I/O), the registry of named
//! driver constructors resolved from settings, and the built-in drivers.

pub(crate) mod driver;
pub(crate) mod driver_registry;
pub(crate) mod error;
pub(crate) mod loopback;
pub(crate) mod tcp;
