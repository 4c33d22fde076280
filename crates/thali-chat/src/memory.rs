//! Per-session conversation memory.
//!
//! Holds the transcript and the single "last recommended" slot that lets a
//! follow-up like "add those" resolve to the previous browse turn's items.

use thali_core::{RecommendedItem, Role, TurnRecord};
use tracing::debug;
use uuid::Uuid;

/// Recommendation slot state.
///
/// `Populated` never holds an empty list; setting an empty list moves the
/// slot back to `Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RecommendationState {
    #[default]
    Empty,
    Populated(Vec<RecommendedItem>),
}

/// Mutable state owned by one chat session.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    session_id: Uuid,
    transcript: Vec<TurnRecord>,
    recommendations: RecommendationState,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            transcript: Vec::new(),
            recommendations: RecommendationState::Empty,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Append a turn to the transcript.
    pub fn record_turn(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.push(TurnRecord::new(role, content));
    }

    pub fn transcript(&self) -> &[TurnRecord] {
        &self.transcript
    }

    /// Replace the recommendation slot with `items`.
    pub fn set_last_recommended(&mut self, items: Vec<RecommendedItem>) {
        debug!(items = items.len(), "Recommendations stored");
        self.recommendations = if items.is_empty() {
            RecommendationState::Empty
        } else {
            RecommendationState::Populated(items)
        };
    }

    /// Take the stored recommendations, leaving the slot empty.
    pub fn consume_last_recommended(&mut self) -> Vec<RecommendedItem> {
        match std::mem::take(&mut self.recommendations) {
            RecommendationState::Empty => Vec::new(),
            RecommendationState::Populated(items) => items,
        }
    }

    /// Empty the recommendation slot without reading it.
    pub fn clear_last_recommended(&mut self) {
        self.recommendations = RecommendationState::Empty;
    }

    pub fn last_recommended(&self) -> &[RecommendedItem] {
        match &self.recommendations {
            RecommendationState::Empty => &[],
            RecommendationState::Populated(items) => items,
        }
    }

    pub fn has_recommendations(&self) -> bool {
        matches!(self.recommendations, RecommendationState::Populated(_))
    }

    pub fn recommendation_state(&self) -> &RecommendationState {
        &self.recommendations
    }

    /// Forget the transcript and recommendations; the session id is kept.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.recommendations = RecommendationState::Empty;
        debug!(session = %self.session_id, "Conversation reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biryani() -> RecommendedItem {
        RecommendedItem::new("Chicken Biryani", 450.0)
    }

    #[test]
    fn test_new_memory_is_empty() {
        let memory = ConversationMemory::new();
        assert!(memory.transcript().is_empty());
        assert!(!memory.has_recommendations());
        assert_eq!(memory.recommendation_state(), &RecommendationState::Empty);
    }

    #[test]
    fn test_record_turn_appends_in_order() {
        let mut memory = ConversationMemory::new();
        memory.record_turn(Role::User, "what's good?");
        memory.record_turn(Role::Assistant, "Try the biryani.");
        let transcript = memory.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].content, "Try the biryani.");
        assert!(transcript[0].timestamp <= transcript[1].timestamp);
    }

    #[test]
    fn test_set_then_consume() {
        let mut memory = ConversationMemory::new();
        memory.set_last_recommended(vec![biryani()]);
        assert!(memory.has_recommendations());
        assert_eq!(memory.last_recommended(), &[biryani()]);

        let taken = memory.consume_last_recommended();
        assert_eq!(taken, vec![biryani()]);
        assert!(!memory.has_recommendations());
        assert!(memory.consume_last_recommended().is_empty());
    }

    #[test]
    fn test_set_overwrites_not_merges() {
        let mut memory = ConversationMemory::new();
        memory.set_last_recommended(vec![biryani()]);
        memory.set_last_recommended(vec![RecommendedItem::new("Naan", 80.0)]);
        assert_eq!(memory.last_recommended().len(), 1);
        assert_eq!(memory.last_recommended()[0].name, "Naan");
    }

    #[test]
    fn test_set_empty_list_returns_to_empty_state() {
        let mut memory = ConversationMemory::new();
        memory.set_last_recommended(vec![biryani()]);
        memory.set_last_recommended(Vec::new());
        assert_eq!(memory.recommendation_state(), &RecommendationState::Empty);
    }

    #[test]
    fn test_clear_last_recommended() {
        let mut memory = ConversationMemory::new();
        memory.set_last_recommended(vec![biryani()]);
        memory.clear_last_recommended();
        assert!(memory.last_recommended().is_empty());
    }

    #[test]
    fn test_reset_keeps_session_id() {
        let mut memory = ConversationMemory::new();
        let id = memory.session_id();
        memory.record_turn(Role::User, "hi");
        memory.set_last_recommended(vec![biryani()]);
        memory.reset();
        assert!(memory.transcript().is_empty());
        assert!(!memory.has_recommendations());
        assert_eq!(memory.session_id(), id);
    }
}
