//! One customer's chat session.
//!
//! Owns the conversation memory and cart, and holds the current menu as an
//! `Arc` so reprocessing swaps it in a single assignment.

use std::sync::Arc;

use thali_core::config::PricingConfig;
use tracing::info;
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::ChatError;
use crate::knowledge::MenuKnowledgeBase;
use crate::memory::ConversationMemory;
use crate::orchestrator::{AgenticOrchestrator, TurnResponse};

#[derive(Debug)]
pub struct MenuSession {
    orchestrator: Arc<AgenticOrchestrator>,
    knowledge: Option<Arc<MenuKnowledgeBase>>,
    memory: ConversationMemory,
    cart: Cart,
}

impl MenuSession {
    pub fn new(orchestrator: Arc<AgenticOrchestrator>, pricing: PricingConfig) -> Self {
        Self {
            orchestrator,
            knowledge: None,
            memory: ConversationMemory::new(),
            cart: Cart::new(pricing),
        }
    }

    pub fn id(&self) -> Uuid {
        self.memory.session_id()
    }

    /// Replace the current menu. Conversation memory is reset because old
    /// recommendations may not exist on the new menu; the cart is kept.
    pub fn install_menu(&mut self, knowledge: impl Into<Arc<MenuKnowledgeBase>>) {
        let knowledge = knowledge.into();
        info!(session = %self.id(), items = knowledge.items().len(), "Menu installed");
        self.knowledge = Some(knowledge);
        self.memory.reset();
    }

    pub fn knowledge(&self) -> Option<&MenuKnowledgeBase> {
        self.knowledge.as_deref()
    }

    pub fn has_menu(&self) -> bool {
        self.knowledge.is_some()
    }

    /// Handle one utterance against the installed menu.
    pub async fn ask(&mut self, utterance: &str) -> Result<TurnResponse, ChatError> {
        let knowledge = self
            .knowledge
            .clone()
            .ok_or(ChatError::MenuNotProcessed)?;
        self.orchestrator
            .handle_turn(&knowledge, &mut self.memory, &mut self.cart, utterance)
            .await
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Forget the conversation; menu and cart are kept.
    pub fn reset_conversation(&mut self) {
        self.memory.reset();
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }
}
