// Core of the MedAI chat front-end:
// - Session state and the reducer that drives it
// - Evidence attached to assistant answers
// - The view model a chat front-end renders
// - HTTP client for the RAG query service
// - Configuration loading
// - Shared error types

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export types module - Request/response data structures
pub mod types;
pub use types::*;

// Export client module - Query service client
pub mod client;
pub use client::{QueryService, RagClient};

pub mod evidence;
pub use evidence::RetrievedEvidence;

pub mod session;
pub use session::{
    Generation, QueryOutcome, QueryTicket, Role, Session, SessionEvent, Turn, SAMPLE_PROMPTS,
};

pub mod render;
pub use render::ChatView;

pub mod manager;
pub use manager::{ChatSessionManager, Settlement};
