//! What a chat view shows for a given [`Session`].
//!
//! Nothing here mutates state. Front-ends build a [`ChatView`] after every
//! change and draw it however they like.

use std::fmt;

use crate::evidence::RetrievedEvidence;
use crate::session::{Role, Session, Turn, SAMPLE_PROMPTS};
use crate::types::EvidenceMetadata;

pub const ASSISTANT_NAME: &str = "MedAI";
pub const USER_NAME: &str = "You";
pub const GREETING: &str = "How can I help you today?";
pub const INTRODUCTION: &str = "I'm MedAI, your intelligent medical assistant. Ask me anything about medicine, diseases, treatments, or health.";
pub const DISCLAIMER: &str =
    "MedAI can make mistakes. Always verify medical information with professionals.";

#[derive(Debug, Clone, PartialEq)]
pub enum ChatView<'a> {
    /// Nothing has been said yet
    Empty(EmptyState),
    Transcript {
        turns: Vec<TurnView<'a>>,
        /// Show the typing indicator after the last turn
        typing: bool,
    },
}

impl<'a> ChatView<'a> {
    pub fn of(session: &'a Session) -> Self {
        if session.is_empty() {
            return ChatView::Empty(EmptyState::default());
        }

        ChatView::Transcript {
            turns: session.turns().iter().map(TurnView::of).collect(),
            typing: session.awaiting_response(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmptyState {
    pub greeting: &'static str,
    pub introduction: &'static str,
    pub prompts: &'static [&'static str],
}

impl Default for EmptyState {
    fn default() -> Self {
        Self {
            greeting: GREETING,
            introduction: INTRODUCTION,
            prompts: &SAMPLE_PROMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnView<'a> {
    pub role: Role,
    pub speaker: &'static str,
    pub content: &'a str,
    pub sources: Option<SourcesPanel<'a>>,
}

impl<'a> TurnView<'a> {
    pub fn of(turn: &'a Turn) -> Self {
        let speaker = match turn.role() {
            Role::User => USER_NAME,
            Role::Assistant => ASSISTANT_NAME,
        };

        let sources = turn.has_sources().then(|| SourcesPanel {
            items: turn
                .evidence()
                .iter()
                .enumerate()
                .map(|(i, evidence)| SourceItem::of(i + 1, evidence))
                .collect(),
        });

        Self {
            role: turn.role(),
            speaker,
            content: turn.content(),
            sources,
        }
    }
}

/// The collapsible list of passages under an assistant turn
#[derive(Debug, Clone, PartialEq)]
pub struct SourcesPanel<'a> {
    pub items: Vec<SourceItem<'a>>,
}

impl SourcesPanel<'_> {
    /// Text of the collapsed panel, e.g. "View 2 Sources"
    pub fn label(&self) -> String {
        let count = self.items.len();
        let plural = if count > 1 { "s" } else { "" };
        format!("View {} Source{}", count, plural)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceItem<'a> {
    /// 1-based position in the panel
    pub number: usize,
    pub passage: &'a str,
    /// Relevance as a percentage string, only when a score is known
    pub relevance: Option<String>,
    pub badges: Vec<Badge<'a>>,
}

impl<'a> SourceItem<'a> {
    fn of(number: usize, evidence: &'a RetrievedEvidence) -> Self {
        Self {
            number,
            passage: &evidence.passage,
            relevance: evidence.score.map(format_relevance),
            badges: evidence.metadata.as_ref().map(badges).unwrap_or_default(),
        }
    }

    pub fn heading(&self) -> String {
        format!("Source {}", self.number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge<'a> {
    Source(&'a str),
    Title(&'a str),
    Page(&'a str),
    Section(&'a str),
}

impl fmt::Display for Badge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Badge::Source(source) => write!(f, "📚 {}", source),
            Badge::Title(title) => write!(f, "📖 {}", title),
            Badge::Page(page) => write!(f, "📄 Page {}", page),
            Badge::Section(section) => write!(f, "📑 {}", section),
        }
    }
}

/// Badges for whichever metadata fields are present, in display order
pub fn badges(metadata: &EvidenceMetadata) -> Vec<Badge<'_>> {
    [
        metadata.source.as_deref().map(Badge::Source),
        metadata.title.as_deref().map(Badge::Title),
        metadata.page.as_deref().map(Badge::Page),
        metadata.section.as_deref().map(Badge::Section),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// `0.92` -> `"92.0%"`
pub fn format_relevance(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{QueryOutcome, SessionEvent};
    use crate::types::QueryResponse;

    fn answered_session(response: QueryResponse) -> Session {
        let mut session = Session::new();
        let ticket = session
            .apply(SessionEvent::Submit("What are the side effects of paracetamol?".to_string()))
            .unwrap();
        session.apply(SessionEvent::ResponseArrived {
            generation: ticket.generation,
            outcome: QueryOutcome::Answered(response),
        });
        session
    }

    #[test]
    fn test_empty_session_shows_greeting_and_prompts() {
        let session = Session::new();
        match ChatView::of(&session) {
            ChatView::Empty(state) => {
                assert_eq!(state.greeting, "How can I help you today?");
                assert_eq!(state.prompts.len(), 3);
                assert_eq!(state.prompts[0], "What are the side effects of paracetamol?");
            }
            other => panic!("expected empty state, got {:?}", other),
        }
    }

    #[test]
    fn test_typing_indicator_while_awaiting() {
        let mut session = Session::new();
        session.apply(SessionEvent::Submit("q".to_string()));

        match ChatView::of(&session) {
            ChatView::Transcript { turns, typing } => {
                assert_eq!(turns.len(), 1);
                assert_eq!(turns[0].speaker, "You");
                assert!(typing);
            }
            other => panic!("expected transcript, got {:?}", other),
        }
    }

    #[test]
    fn test_sources_with_partial_scores_and_metadata() {
        let session = answered_session(QueryResponse {
            answer: Some("Mostly mild.".to_string()),
            contexts: vec!["passage1".to_string(), "passage2".to_string()],
            scores: vec![Some(0.92)],
            metadata: vec![Some(EvidenceMetadata {
                source: Some("PDR".to_string()),
                ..Default::default()
            })],
        });

        let ChatView::Transcript { turns, typing } = ChatView::of(&session) else {
            panic!("expected transcript");
        };
        assert!(!typing);
        assert!(turns[0].sources.is_none());

        let assistant = &turns[1];
        assert_eq!(assistant.speaker, "MedAI");
        let panel = assistant.sources.as_ref().expect("sources panel");
        assert_eq!(panel.label(), "View 2 Sources");

        let first = &panel.items[0];
        assert_eq!(first.heading(), "Source 1");
        assert_eq!(first.relevance.as_deref(), Some("92.0%"));
        assert_eq!(first.badges, vec![Badge::Source("PDR")]);
        assert_eq!(first.badges[0].to_string(), "📚 PDR");

        let second = &panel.items[1];
        assert_eq!(second.passage, "passage2");
        assert_eq!(second.relevance, None);
        assert!(second.badges.is_empty());
    }

    #[test]
    fn test_single_source_label() {
        let session = answered_session(QueryResponse {
            answer: Some("a".to_string()),
            contexts: vec!["p".to_string()],
            ..Default::default()
        });

        let ChatView::Transcript { turns, .. } = ChatView::of(&session) else {
            panic!("expected transcript");
        };
        assert_eq!(turns[1].sources.as_ref().unwrap().label(), "View 1 Source");
    }

    #[test]
    fn test_no_panel_without_contexts() {
        let session = answered_session(QueryResponse {
            answer: Some("a".to_string()),
            scores: vec![Some(0.5)],
            ..Default::default()
        });

        let ChatView::Transcript { turns, .. } = ChatView::of(&session) else {
            panic!("expected transcript");
        };
        assert!(turns[1].sources.is_none());
    }

    #[test]
    fn test_all_badges_in_order() {
        let metadata = EvidenceMetadata {
            source: Some("Merck Manual".to_string()),
            title: Some("Hypertension".to_string()),
            page: Some("212".to_string()),
            section: Some("Diagnosis".to_string()),
        };

        let rendered: Vec<String> = badges(&metadata).iter().map(|b| b.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["📚 Merck Manual", "📖 Hypertension", "📄 Page 212", "📑 Diagnosis"]
        );
    }

    #[test]
    fn test_format_relevance() {
        assert_eq!(format_relevance(0.92), "92.0%");
        assert_eq!(format_relevance(0.8749), "87.5%");
        assert_eq!(format_relevance(0.0), "0.0%");
        assert_eq!(format_relevance(1.0), "100.0%");
    }
}
