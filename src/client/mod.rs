//! The conversation client: owns the transcript, submits one turn at
//! a time to the relay, and incrementally reconstructs the assistant
//! reply from the frame stream. Every failure path settles into a
//! fixed apology message rather than an error the user has to parse.

mod parser;
pub use parser::FrameParser;

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::openai::{Message, Role};
use crate::relay::Frame;

pub const SIGN_IN_MESSAGE: &str = "Necesitas iniciar sesión para usar el chatbot.";
pub const SERVICE_PROBLEM_MESSAGE: &str = "Lo siento, hubo un problema con el servicio.";
pub const REQUEST_PROBLEM_MESSAGE: &str = "Lo siento, hubo un problema. Intenta de nuevo.";
pub const CONNECTION_PROBLEM_MESSAGE: &str = "Lo siento, hubo un problema de conexión.";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// A previous turn has not settled yet; submissions are never
    /// interleaved into the shared transcript.
    #[error("a turn is already in flight")]
    TurnInFlight,
}

/// How one submitted turn settled.
#[derive(Debug, PartialEq)]
pub enum TurnOutcome {
    /// Input was empty after trimming; nothing happened
    Skipped,
    /// The turn settled and `text` is the finalized assistant message
    Completed { turn_id: u64, text: String },
    /// No token is configured, so no request was made
    SignInRequired { turn_id: u64 },
}

pub struct ChatClient {
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
    transcript: Vec<Message>,
    next_turn_id: u64,
    in_flight: bool,
}

impl ChatClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token,
            transcript: Vec::new(),
            next_turn_id: 1,
            in_flight: false,
        }
    }

    /// The conversation so far, in submission order.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    /// Submit the next user turn, streaming assistant fragments
    /// through `tx` as they arrive. The finalized assistant message
    /// (which on failure is one of the fixed apology messages) is
    /// appended to the transcript before this returns.
    pub async fn submit_turn(
        &mut self,
        text: &str,
        tx: mpsc::UnboundedSender<String>,
    ) -> Result<TurnOutcome, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Skipped);
        }
        if self.in_flight {
            return Err(SubmitError::TurnInFlight);
        }

        self.in_flight = true;
        let turn_id = self.next_turn_id;
        self.next_turn_id += 1;

        // Optimistic append, before any network call
        self.transcript.push(Message::new(Role::User, text));

        // Local gate only; the relay independently verifies the token
        if self.token.is_none() {
            self.in_flight = false;
            return Ok(TurnOutcome::SignInRequired { turn_id });
        }

        let assistant_text = self.stream_turn(&tx).await;
        self.transcript
            .push(Message::new(Role::Assistant, &assistant_text));
        self.in_flight = false;

        Ok(TurnOutcome::Completed {
            turn_id,
            text: assistant_text,
        })
    }

    async fn stream_turn(&self, tx: &mpsc::UnboundedSender<String>) -> String {
        let url = format!("{}/api/chat", self.base_url);
        let mut request = self
            .http
            .post(url)
            .json(&serde_json::json!({ "history": self.transcript }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Chat request failed: {}", e);
                return CONNECTION_PROBLEM_MESSAGE.to_string();
            }
        };
        if !response.status().is_success() {
            return REQUEST_PROBLEM_MESSAGE.to_string();
        }

        let mut stream = response.bytes_stream();
        let mut parser = FrameParser::new();
        let mut acc = String::new();
        let mut done = false;
        let mut errored = false;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    // A drop after Done is a completed turn; anything
                    // earlier is a failure
                    if done {
                        break;
                    }
                    tracing::debug!("Chat stream dropped: {}", e);
                    return CONNECTION_PROBLEM_MESSAGE.to_string();
                }
            };

            for frame in parser.push(&chunk) {
                if done || errored {
                    continue;
                }
                match frame {
                    Frame::Delta(fragment) => {
                        acc.push_str(&fragment);
                        let _ = tx.send(fragment);
                    }
                    Frame::Error(_) => {
                        acc = SERVICE_PROBLEM_MESSAGE.to_string();
                        errored = true;
                    }
                    Frame::Done => {
                        done = true;
                    }
                }
            }
        }

        // Stream end without an explicit Done sentinel counts as done
        acc
    }
}
