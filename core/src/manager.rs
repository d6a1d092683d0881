//! Chat session manager.
//!
//! Owns the [`Session`] and is the only thing that mutates it. Queries run as
//! spawned tasks and report back over a channel; their outcomes are folded in
//! only when the manager is polled, so every mutation happens on the caller's
//! side of `&mut self` regardless of how many runtime threads exist.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::QueryService;
use crate::render::ChatView;
use crate::session::{Generation, QueryOutcome, QueryTicket, Session, SessionEvent};

/// What happened to a settled query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// An assistant turn was appended
    Applied,
    /// The session was reset while the query was out; the result was dropped
    Discarded,
}

#[derive(Debug)]
struct Completion {
    generation: Generation,
    outcome: QueryOutcome,
}

pub struct ChatSessionManager {
    session: Session,
    service: Arc<dyn QueryService>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ChatSessionManager {
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(),
            service,
            completions_tx,
            completions_rx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> ChatView<'_> {
        ChatView::of(&self.session)
    }

    pub fn edit_input(&mut self, text: impl Into<String>) {
        self.session.apply(SessionEvent::EditInput(text.into()));
    }

    /// Sends `text` as the next question. Returns `false` when the submission
    /// was ignored (blank text, or an answer is still pending).
    pub fn submit(&mut self, text: impl Into<String>) -> bool {
        match self.session.apply(SessionEvent::Submit(text.into())) {
            Some(ticket) => {
                self.dispatch(ticket);
                true
            }
            None => false,
        }
    }

    /// Sends whatever is in the input buffer
    pub fn submit_pending(&mut self) -> bool {
        let text = self.session.pending_input().to_string();
        self.submit(text)
    }

    /// Puts a sample prompt in the input buffer without sending it
    pub fn select_sample_prompt(&mut self, text: impl Into<String>) {
        self.session.apply(SessionEvent::SelectPrompt(text.into()));
    }

    /// Clears the session. A query still in flight keeps running but its
    /// answer will be discarded.
    pub fn reset(&mut self) {
        if self.session.awaiting_response() {
            info!(generation = %self.session.generation(), "Clearing session with a query in flight");
        }
        self.session.apply(SessionEvent::Reset);
    }

    /// Waits for the next query to settle and folds it into the session
    pub async fn next_settlement(&mut self) -> Option<Settlement> {
        let completion = self.completions_rx.recv().await?;
        let accepted = self.session.accepts(completion.generation);

        self.session.apply(SessionEvent::ResponseArrived {
            generation: completion.generation,
            outcome: completion.outcome,
        });

        Some(if accepted {
            Settlement::Applied
        } else {
            Settlement::Discarded
        })
    }

    /// Waits until no answer is pending
    pub async fn settle(&mut self) {
        while self.session.awaiting_response() {
            if self.next_settlement().await.is_none() {
                break;
            }
        }
    }

    fn dispatch(&self, ticket: QueryTicket) {
        let QueryTicket {
            generation,
            request,
        } = ticket;
        let service = Arc::clone(&self.service);
        let completions_tx = self.completions_tx.clone();

        debug!(%generation, "Dispatching query");
        tokio::spawn(async move {
            let outcome = match tokio::spawn(async move { service.query(request).await }).await {
                Ok(Ok(response)) => QueryOutcome::Answered(response),
                Ok(Err(e)) => {
                    warn!(%generation, error = %e, "Query failed");
                    QueryOutcome::Failed
                }
                Err(e) => {
                    warn!(%generation, error = %e, "Query task aborted");
                    QueryOutcome::Failed
                }
            };

            if completions_tx
                .send(Completion {
                    generation,
                    outcome,
                })
                .is_err()
            {
                debug!(%generation, "Session manager dropped before the query settled");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{MedAiError, MedAiResult};
    use crate::render::{Badge, ChatView};
    use crate::session::{CONNECTIVITY_FALLBACK, SAMPLE_PROMPTS};
    use crate::types::{EvidenceMetadata, QueryRequest, QueryResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    /// Answers every query with the same result
    struct CannedService {
        result: Result<QueryResponse, u16>,
        requests: Mutex<Vec<QueryRequest>>,
    }

    impl CannedService {
        fn answering(response: QueryResponse) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(response),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(status_code: u16) -> Arc<Self> {
            Arc::new(Self {
                result: Err(status_code),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl QueryService for CannedService {
        async fn query(&self, request: QueryRequest) -> MedAiResult<QueryResponse> {
            self.requests.lock().unwrap().push(request);
            match &self.result {
                Ok(response) => Ok(response.clone()),
                Err(status_code) => Err(MedAiError::HttpError {
                    status_code: *status_code,
                    message: "Internal Server Error".to_string(),
                }),
            }
        }
    }

    /// Holds every query until the test releases a permit
    struct GatedService {
        gate: Semaphore,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl GatedService {
        fn closed() -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QueryService for GatedService {
        async fn query(&self, request: QueryRequest) -> MedAiResult<QueryResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| MedAiError::RequestError(e.to_string()))?;
            permit.forget();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(QueryResponse {
                answer: Some(format!("answer to {}", request.query)),
                ..Default::default()
            })
        }
    }

    struct PanickingService;

    #[async_trait]
    impl QueryService for PanickingService {
        async fn query(&self, _request: QueryRequest) -> MedAiResult<QueryResponse> {
            panic!("service blew up");
        }
    }

    #[tokio::test]
    async fn test_paracetamol_scenario() {
        let service = CannedService::answering(QueryResponse {
            answer: Some("Paracetamol is usually well tolerated.".to_string()),
            contexts: vec!["passage1".to_string(), "passage2".to_string()],
            scores: vec![Some(0.92)],
            metadata: vec![Some(EvidenceMetadata {
                source: Some("PDR".to_string()),
                ..Default::default()
            })],
        });
        let mut manager = ChatSessionManager::new(service.clone());

        assert!(manager.submit("What are the side effects of paracetamol?"));
        assert!(manager.session().awaiting_response());
        assert_eq!(manager.next_settlement().await, Some(Settlement::Applied));

        let sent = service.requests.lock().unwrap().clone();
        assert_eq!(sent, vec![QueryRequest::new("What are the side effects of paracetamol?")]);

        let turn = &manager.session().turns()[1];
        assert_eq!(turn.evidence().len(), 2);

        let ChatView::Transcript { turns, typing } = manager.view() else {
            panic!("expected transcript");
        };
        assert!(!typing);
        let panel = turns[1].sources.as_ref().unwrap();
        assert_eq!(panel.items[0].relevance.as_deref(), Some("92.0%"));
        assert_eq!(panel.items[0].badges, vec![Badge::Source("PDR")]);
        assert_eq!(panel.items[1].relevance, None);
        assert!(panel.items[1].badges.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_becomes_fallback_turn() {
        let mut manager = ChatSessionManager::new(CannedService::failing(500));

        assert!(manager.submit("x"));
        manager.settle().await;

        let turns = manager.session().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content(), "x");
        assert_eq!(turns[1].content(), CONNECTIVITY_FALLBACK);
        assert!(turns[1].evidence().is_empty());
        assert!(!manager.session().awaiting_response());
    }

    #[tokio::test]
    async fn test_panicking_service_becomes_fallback_turn() {
        let mut manager = ChatSessionManager::new(Arc::new(PanickingService));

        assert!(manager.submit("x"));
        manager.settle().await;

        assert_eq!(manager.session().turns()[1].content(), CONNECTIVITY_FALLBACK);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let service = GatedService::closed();
        let mut manager = ChatSessionManager::new(service.clone());

        assert!(manager.submit("first"));
        assert!(!manager.submit("second"));
        assert!(!manager.submit_pending());
        assert_eq!(manager.session().turns().len(), 1);

        service.gate.add_permits(1);
        manager.settle().await;

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(manager.session().turns().len(), 2);
        assert_eq!(manager.session().turns()[1].content(), "answer to first");
    }

    #[tokio::test]
    async fn test_reset_discards_late_answer() {
        let service = GatedService::closed();
        let mut manager = ChatSessionManager::new(service.clone());

        assert!(manager.submit("a"));
        manager.reset();
        assert!(!manager.session().awaiting_response());

        service.gate.add_permits(1);
        assert_eq!(manager.next_settlement().await, Some(Settlement::Discarded));

        assert!(manager.session().turns().is_empty());
        assert_eq!(manager.session().pending_input(), "");
        assert!(!manager.session().awaiting_response());
    }

    #[tokio::test]
    async fn test_new_question_after_reset_survives_stale_answer() {
        let service = GatedService::closed();
        let mut manager = ChatSessionManager::new(service.clone());

        assert!(manager.submit("a"));
        manager.reset();
        assert!(manager.submit("b"));

        service.gate.add_permits(2);
        let mut settlements = vec![
            manager.next_settlement().await.unwrap(),
            manager.next_settlement().await.unwrap(),
        ];
        settlements.sort_by_key(|s| *s == Settlement::Applied);
        assert_eq!(settlements, vec![Settlement::Discarded, Settlement::Applied]);

        let contents: Vec<&str> = manager.session().turns().iter().map(|t| t.content()).collect();
        assert_eq!(contents, vec!["b", "answer to b"]);
    }

    #[tokio::test]
    async fn test_sample_prompt_then_submit_pending() {
        let service = CannedService::answering(QueryResponse::default());
        let mut manager = ChatSessionManager::new(service.clone());

        manager.select_sample_prompt(SAMPLE_PROMPTS[1]);
        assert_eq!(
            manager.session().pending_input(),
            "Explain how the immune system fights viruses."
        );
        assert!(manager.session().turns().is_empty());
        assert!(matches!(manager.view(), ChatView::Empty(_)));

        assert!(manager.submit_pending());
        manager.settle().await;

        assert_eq!(manager.session().turns().len(), 2);
        assert_eq!(
            service.requests.lock().unwrap()[0].query,
            "Explain how the immune system fights viruses."
        );
    }

    #[tokio::test]
    async fn test_blank_submit_sends_nothing() {
        let service = CannedService::answering(QueryResponse::default());
        let mut manager = ChatSessionManager::new(service.clone());

        manager.edit_input("   ");
        assert!(!manager.submit_pending());
        assert!(!manager.submit(""));

        tokio::task::yield_now().await;
        assert!(service.requests.lock().unwrap().is_empty());
        assert!(manager.session().turns().is_empty());
    }
}
