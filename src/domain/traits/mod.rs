//! Domain traits - Abstractions for infrastructure implementations

pub mod bus;

pub use bus::{BusMessage, BusTransport};
