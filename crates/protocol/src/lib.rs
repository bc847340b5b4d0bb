pub mod constants;
pub mod envelope;
pub mod error;
pub mod format;
pub mod value;

// Re-export primary types for convenience.
pub use constants::{ConsoleTag, MessageType};
pub use envelope::{Envelope, ErrorPayload, Message, NetworkPayload};
pub use error::ProtocolError;
pub use format::{Formatted, RenderedBlock};
pub use value::{Function, Instance, Value};
