//! Request and result types.

pub mod message;
pub mod result;

pub use message::{ContentPart, Message, Role, RunRequest};
pub use result::{AgentResult, ChartSpec, MIN_CONTENT_CHARS};
