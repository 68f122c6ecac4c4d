//! Chat sessions: the retrieve-then-generate loop and its conversation log.
//!
//! A [`ChatSession`] moves through
//! `Idle → AwaitingInput → Retrieving → Generating → AwaitingInput → … → Closed`.
//! Each submitted message is fully retrieved and answered before the next
//! one is accepted; `submit` takes `&mut self`, so a session can never have
//! two generations in flight.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::Passage;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::pipeline::RagPipeline;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Recorded in place of an assistant turn when a message could not be answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMarker {
    pub message: String,
    pub at: DateTime<Utc>,
}

/// An entry of the [`ConversationLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    Turn(ConversationTurn),
    Error(ErrorMarker),
}

/// Append-only record of a session's conversation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationLog {
    entries: Vec<LogEntry>,
}

impl ConversationLog {
    /// All entries, oldest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Only the turns, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Turn(turn) => Some(turn),
            LogEntry::Error(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_turn(&mut self, role: Role, text: impl Into<String>) {
        self.entries.push(LogEntry::Turn(ConversationTurn {
            role,
            text: text.into(),
            at: Utc::now(),
        }));
    }

    fn push_error(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry::Error(ErrorMarker { message: message.into(), at: Utc::now() }));
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    AwaitingInput,
    Retrieving,
    Generating,
    Closed,
}

/// Result of one submitted message.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The assistant answered; the text is also in the log.
    Reply(String),
    /// Generation failed; the log holds the user turn and an error marker.
    Failed(String),
    /// The message was blank and nothing was recorded.
    Ignored,
}

/// A single user's conversation over a shared [`RagPipeline`].
pub struct ChatSession {
    id: String,
    pipeline: Arc<RagPipeline>,
    generator: Arc<Generator>,
    top_k: usize,
    state: SessionState,
    log: ConversationLog,
}

impl ChatSession {
    /// Create an idle session retrieving `top_k` passages per the pipeline config.
    pub fn new(pipeline: Arc<RagPipeline>, generator: Arc<Generator>) -> Self {
        let top_k = pipeline.config().top_k;
        Self {
            id: Uuid::new_v4().to_string(),
            pipeline,
            generator,
            top_k,
            state: SessionState::Idle,
            log: ConversationLog::default(),
        }
    }

    /// Override the number of passages retrieved per message. Zero is raised to one.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Unique id, also logged as the `session` field.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Everything said so far, including error markers.
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Start accepting messages. No-op unless the session is idle.
    pub fn open(&mut self) {
        if self.state == SessionState::Idle {
            self.transition(SessionState::AwaitingInput);
        }
    }

    /// Stop accepting messages. Closing is final.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            self.transition(SessionState::Closed);
            info!(session = %self.id, entries = self.log.len(), "session closed");
        }
    }

    /// Answer one user message.
    ///
    /// On success the user turn and the assistant turn are appended to the
    /// log. If generation fails the user turn is kept, an error marker takes
    /// the assistant's place, and [`TurnOutcome::Failed`] is returned.
    ///
    /// # Errors
    ///
    /// - [`RagError::SessionClosed`] after [`close`](Self::close).
    /// - Any retrieval error, after recording the user turn and an error marker.
    pub async fn submit(&mut self, text: &str) -> Result<TurnOutcome> {
        match self.state {
            SessionState::Closed => return Err(RagError::SessionClosed),
            SessionState::Idle => self.open(),
            _ => {}
        }

        let query = text.trim();
        if query.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        self.transition(SessionState::Retrieving);
        let retrieved = match self.pipeline.retrieve(query, self.top_k).await {
            Ok(retrieved) => retrieved,
            Err(e) => {
                warn!(session = %self.id, error = %e, "retrieval failed");
                self.log.push_turn(Role::User, text);
                self.log.push_error(e.to_string());
                self.transition(SessionState::AwaitingInput);
                return Err(e);
            }
        };

        self.transition(SessionState::Generating);
        let context: Vec<Passage> = retrieved.into_iter().map(|r| r.passage).collect();
        let outcome = match self.generator.generate(query, &context).await {
            Ok(reply) => {
                self.log.push_turn(Role::User, text);
                self.log.push_turn(Role::Assistant, reply.clone());
                info!(session = %self.id, context = context.len(), "answered message");
                TurnOutcome::Reply(reply)
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "generation failed");
                self.log.push_turn(Role::User, text);
                self.log.push_error(e.to_string());
                TurnOutcome::Failed(e.to_string())
            }
        };
        self.transition(SessionState::AwaitingInput);
        Ok(outcome)
    }

    /// Drive the session from a line-oriented reader until EOF or an exit word.
    ///
    /// Writes a `You: ` prompt before each line and a `Bot: ` line after
    /// each answer. `exit` or `quit` (any case) ends the loop. The session
    /// is closed when this returns.
    pub async fn run_lines<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.open();
        let mut lines = reader.lines();

        loop {
            writer.write_all(b"You: ").await?;
            writer.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if is_exit_command(&line) {
                break;
            }

            let reply = match self.submit(&line).await {
                Ok(TurnOutcome::Reply(reply)) => reply,
                Ok(TurnOutcome::Failed(message)) => format!("[error] {message}"),
                Ok(TurnOutcome::Ignored) => continue,
                Err(e) => format!("[error] {e}"),
            };
            writer.write_all(format!("Bot: {reply}\n").as_bytes()).await?;
        }

        writer.write_all(b"\n").await?;
        writer.flush().await?;
        self.close();
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        debug!(session = %self.id, from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }
}

/// Whether `line` asks to end the conversation.
pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}
