//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthError, ContainerToken, KeyPairJwt, PatToken, SessionHandle, SessionToken, TokenProvider,
};
pub use crate::client::AgentClient;
pub use crate::config::{AgentConfig, ClientSettings};
pub use crate::context::{ContextSettings, ConversationContext};
pub use crate::decoder::{DecodeWarning, StreamDecoder};
pub use crate::error::{AgentError, Result};
pub use crate::types::{AgentResult, ChartSpec, Message, Role};
