//! Chat session state and its reducer.
//!
//! A [`Session`] is the whole state of one chat view: the transcript, the
//! input buffer and whether a query is outstanding. It only changes through
//! [`Session::apply`], which folds one [`SessionEvent`] into the state and
//! hands back a [`QueryTicket`] when the event requires a request to be sent.
//! Sending it, and reporting the outcome back, is the caller's job.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::evidence::RetrievedEvidence;
use crate::types::{QueryRequest, QueryResponse};

/// Example questions offered while the transcript is empty
pub const SAMPLE_PROMPTS: [&str; 3] = [
    "What are the side effects of paracetamol?",
    "Explain how the immune system fights viruses.",
    "What is the normal blood pressure range?",
];

/// Assistant content when the service answered without an answer
pub const FALLBACK_ANSWER: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

/// Assistant content when the service could not be reached or failed
pub const CONNECTIVITY_FALLBACK: &str = "I apologize, but I'm having trouble connecting to the server. Please make sure the backend is running and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the transcript. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    role: Role,
    content: String,
    evidence: Vec<RetrievedEvidence>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            evidence: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, evidence: Vec<RetrievedEvidence>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            evidence,
        }
    }

    fn from_outcome(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Answered(mut response) => {
                let evidence = response.take_evidence();
                let content = response
                    .answer
                    .take()
                    .unwrap_or_else(|| FALLBACK_ANSWER.to_string());
                Self::assistant(content, evidence)
            }
            QueryOutcome::Failed => Self::assistant(CONNECTIVITY_FALLBACK, Vec::new()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Retrieved passages backing this turn. Always empty for user turns.
    pub fn evidence(&self) -> &[RetrievedEvidence] {
        &self.evidence
    }

    pub fn has_sources(&self) -> bool {
        self.role == Role::Assistant && !self.evidence.is_empty()
    }
}

/// Lifetime tag of a session. Bumped by every reset so that answers to
/// requests issued before the reset can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// How an outbound query settled
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The service answered with a 2xx status
    Answered(QueryResponse),
    /// Non-2xx status, transport failure or unreadable body
    Failed,
}

/// A request the session wants sent, tagged with the generation it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTicket {
    pub generation: Generation,
    pub request: QueryRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The input buffer was edited
    EditInput(String),
    /// The user sent `text`
    Submit(String),
    /// A sample prompt was picked from the empty state
    SelectPrompt(String),
    /// A query issued under `generation` settled
    ResponseArrived {
        generation: Generation,
        outcome: QueryOutcome,
    },
    /// Clear everything
    Reset,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    turns: Vec<Turn>,
    pending_input: String,
    awaiting_response: bool,
    generation: Generation,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Whether an outcome tagged with `generation` would be folded in
    pub fn accepts(&self, generation: Generation) -> bool {
        self.awaiting_response && generation == self.generation
    }

    /// Folds one event into the session. Returns the query to send, if any.
    pub fn apply(&mut self, event: SessionEvent) -> Option<QueryTicket> {
        match event {
            SessionEvent::EditInput(text) => {
                if self.awaiting_response {
                    debug!("Input is disabled while a response is pending");
                } else {
                    self.pending_input = text;
                }
                None
            }
            SessionEvent::Submit(text) => self.submit(text),
            SessionEvent::SelectPrompt(text) => {
                if self.turns.is_empty() && !self.awaiting_response {
                    self.pending_input = text;
                } else {
                    debug!("Sample prompts are only offered on an empty session");
                }
                None
            }
            SessionEvent::ResponseArrived {
                generation,
                outcome,
            } => {
                self.settle(generation, outcome);
                None
            }
            SessionEvent::Reset => {
                self.reset();
                None
            }
        }
    }

    fn submit(&mut self, text: String) -> Option<QueryTicket> {
        let query = text.trim();
        if query.is_empty() || self.awaiting_response {
            debug!(
                awaiting_response = self.awaiting_response,
                "Ignoring submission"
            );
            return None;
        }

        let request = QueryRequest::new(query);
        self.turns.push(Turn::user(text));
        self.pending_input.clear();
        self.awaiting_response = true;

        Some(QueryTicket {
            generation: self.generation,
            request,
        })
    }

    fn settle(&mut self, generation: Generation, outcome: QueryOutcome) {
        if !self.accepts(generation) {
            debug!(
                %generation,
                current = %self.generation,
                "Discarding response for a cleared session"
            );
            return;
        }

        self.turns.push(Turn::from_outcome(outcome));
        self.awaiting_response = false;
    }

    fn reset(&mut self) {
        self.turns.clear();
        self.pending_input.clear();
        self.awaiting_response = false;
        self.generation = self.generation.next();
    }
}

/// Pure form of [`Session::apply`]
pub fn reduce(mut state: Session, event: SessionEvent) -> (Session, Option<QueryTicket>) {
    let ticket = state.apply(event);
    (state, ticket)
}
