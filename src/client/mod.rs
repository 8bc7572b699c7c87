//! Agent REST client.
//!
//! # Example
//! ```no_run
//! use cortex_agent::client::AgentClient;
//!
//! # async fn example() -> cortex_agent::error::Result<()> {
//! let client = AgentClient::from_pat("RESORT_EXECUTIVE", "SKI_RESORT_DB", "AGENTS", "xy12345", "my-pat");
//! let result = client.ask("What is total revenue?").await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

pub mod http;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;

use crate::auth::{ContainerToken, KeyPairJwt, PatToken, SessionHandle, SessionToken, TokenProvider};
use crate::config::{AgentConfig, ClientSettings};
use crate::context::ConversationContext;
use crate::decoder::{
    decode_line, DecoderState, Flow, LineBuffer, LineOutcome, ProgressCallback, StreamDecoder,
    StreamEvent,
};
use crate::error::{AgentError, Result};
use crate::types::{AgentResult, Message, RunRequest};
use crate::util::timeout::with_timeout;

/// Client for one agent.
///
/// Never retries: asking a question is not assumed to be idempotent.
#[derive(Clone)]
pub struct AgentClient {
    config: AgentConfig,
    endpoint: String,
    provider: Arc<dyn TokenProvider>,
    http: reqwest::Client,
}

impl fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentClient")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint)
            .field("provider", &"..")
            .finish()
    }
}

impl AgentClient {
    pub fn new(config: AgentConfig, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            endpoint: config.endpoint(),
            config,
            provider,
            http: http::shared_client().clone(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Personal access token authentication.
    pub fn from_pat(
        agent_name: &str,
        database: &str,
        schema: &str,
        account: &str,
        pat: &str,
    ) -> Self {
        Self::with_provider(agent_name, database, schema, Arc::new(PatToken::new(account, pat)))
    }

    /// Key-pair (JWT) authentication from a PEM private key file.
    pub fn from_key_pair(
        agent_name: &str,
        database: &str,
        schema: &str,
        account: &str,
        user: &str,
        private_key_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let provider = KeyPairJwt::from_pem_file(account, user, private_key_path)?;
        Ok(Self::with_provider(agent_name, database, schema, Arc::new(provider)))
    }

    /// Runtime-mounted token; fails outside a container runtime.
    pub fn from_container(agent_name: &str, database: &str, schema: &str) -> Result<Self> {
        let provider = ContainerToken::from_env()?;
        Ok(Self::with_provider(agent_name, database, schema, Arc::new(provider)))
    }

    /// Token borrowed from a live session. Database and schema default to the
    /// session's current ones.
    pub fn from_session(
        session: Arc<dyn SessionHandle>,
        agent_name: &str,
        database: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Self> {
        let database = match database {
            Some(db) => db.to_string(),
            None => session.current_database().ok_or_else(|| {
                AgentError::Configuration("no database given and session has none".to_string())
            })?,
        };
        let schema = match schema {
            Some(schema) => schema.to_string(),
            None => session.current_schema().ok_or_else(|| {
                AgentError::Configuration("no schema given and session has none".to_string())
            })?,
        };
        let provider = SessionToken::new(session)?;
        Ok(Self::with_provider(agent_name, &database, &schema, Arc::new(provider)))
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let provider = settings.token_provider()?;
        let config = settings.agent_config(provider.as_ref())?;
        Ok(Self::new(config, provider))
    }

    /// Build from environment variables (see [`ClientSettings`]).
    pub fn from_env() -> Result<Self> {
        Self::from_settings(&ClientSettings::from_env()?)
    }

    fn with_provider(
        agent_name: &str,
        database: &str,
        schema: &str,
        provider: Arc<dyn TokenProvider>,
    ) -> Self {
        let config = AgentConfig::new(database, schema, agent_name, provider.host());
        Self::new(config, provider)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Prior history followed by the new user turn.
    pub fn build_messages(question: &str, history: &[Message]) -> Result<Vec<Message>> {
        if question.trim().is_empty() {
            return Err(AgentError::InvalidArgument("question is empty".to_string()));
        }
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(Message::user(question));
        Ok(messages)
    }

    /// Ask a single-turn question.
    pub async fn ask(&self, question: &str) -> Result<AgentResult> {
        self.run(question, &[], StreamDecoder::new()).await
    }

    pub async fn ask_with_history(&self, question: &str, history: &[Message]) -> Result<AgentResult> {
        self.run(question, history, StreamDecoder::new()).await
    }

    /// Like [`ask_with_history`](Self::ask_with_history), reporting status
    /// messages as they stream. Repeated identical statuses are reported once.
    pub async fn ask_with_progress(
        &self,
        question: &str,
        history: &[Message],
        progress: ProgressCallback,
    ) -> Result<AgentResult> {
        self.run(question, history, StreamDecoder::with_progress(progress))
            .await
    }

    /// Only the answer text.
    pub async fn ask_text(&self, question: &str) -> Result<String> {
        Ok(self.ask(question).await?.text)
    }

    /// Ask within a conversation thread.
    ///
    /// Uses the thread's history and, when the answer has usable content,
    /// records the question and answer for the next turn.
    pub async fn ask_in_thread(
        &self,
        context: &ConversationContext,
        thread_id: &str,
        question: &str,
    ) -> Result<AgentResult> {
        let history = context.get_history(thread_id);
        let result = self.ask_with_history(question, &history).await?;
        if result.has_content() {
            context.record_turn(thread_id, question, result.text.as_str());
        }
        Ok(result)
    }

    /// Stream answer text as it arrives.
    ///
    /// Only `response.text.delta` chunks are yielded; whole `response.text`
    /// blocks repeat text already streamed.
    ///
    /// The stream ends at `[DONE]` or when the body closes, and cannot be
    /// restarted. Dropping it closes the connection.
    pub async fn stream(&self, question: &str) -> Result<BoxStream<'static, Result<String>>> {
        let messages = Self::build_messages(question, &[])?;
        let response = with_timeout(self.config.timeout, self.send(&messages)).await?;
        let timeout_ms = self.timeout_ms();
        let body = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut lines = LineBuffer::new();
            let mut state = DecoderState::default();
            futures::pin_mut!(body);

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(http::transport_error(e, timeout_ms));
                        return;
                    }
                };
                for line in lines.push(&chunk) {
                    let (next, outcome) = decode_line(state, &line);
                    state = next;
                    match outcome {
                        LineOutcome::Frame { event, payload } => {
                            if let StreamEvent::TextDelta { text } =
                                StreamEvent::classify(event.as_deref(), &payload)
                            {
                                yield Ok(text);
                            }
                        }
                        LineOutcome::Done => return,
                        LineOutcome::Malformed { .. } | LineOutcome::Ignored => {}
                    }
                }
            }

            if let Some(tail) = lines.finish() {
                if let (_, LineOutcome::Frame { event, payload }) = decode_line(state, &tail) {
                    if let StreamEvent::TextDelta { text } =
                        StreamEvent::classify(event.as_deref(), &payload)
                    {
                        yield Ok(text);
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn run(
        &self,
        question: &str,
        history: &[Message],
        mut decoder: StreamDecoder,
    ) -> Result<AgentResult> {
        let messages = Self::build_messages(question, history)?;
        let started = Instant::now();
        let timeout_ms = self.timeout_ms();

        let mut result = with_timeout(self.config.timeout, async {
            let response = self.send(&messages).await?;
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| http::transport_error(e, timeout_ms))?;
                if decoder.feed(&chunk) == Flow::Done {
                    break;
                }
            }
            Ok::<_, AgentError>(decoder.finish())
        })
        .await?;

        result.duration = started.elapsed();
        debug!(
            agent = %self.config.agent_name,
            duration_ms = result.duration.as_millis() as u64,
            events = result.raw_events.len(),
            text_chars = result.text.chars().count(),
            has_sql = result.has_sql(),
            "Agent call finished"
        );
        Ok(result)
    }

    async fn send(&self, messages: &[Message]) -> Result<reqwest::Response> {
        debug!(endpoint = %self.endpoint, messages = messages.len(), "Agent call started");
        let headers = http::agent_headers(self.provider.as_ref())?;
        let response = self
            .http
            .post(&self.endpoint)
            .headers(headers)
            .timeout(self.config.timeout)
            .json(&RunRequest { messages })
            .send()
            .await
            .map_err(|e| http::transport_error(e, self.timeout_ms()))?;
        debug!(status = response.status().as_u16(), "Agent responded");
        http::check_status(response).await
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout.as_millis() as u64
    }
}
