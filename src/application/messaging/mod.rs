//! Message handling - Decoding bus payloads and dispatching hooks

pub mod decoder;
pub mod dispatcher;


pub use decoder::{EventDecoder, Inbound};
pub use dispatcher::HookDispatcher;
