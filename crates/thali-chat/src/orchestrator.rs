//! Agentic orchestrator: one full classify-act-respond pass per utterance.
//!
//! Each turn takes exactly one branch:
//! - referential add: commit the previous browse turn's recommendations
//! - auto order: select items for the customer and commit them
//! - browse: answer from retrieved menu context via the LLM and store a
//!   fresh recommendation list
//!
//! LLM failures never abort a turn; the answer is replaced by an apology
//! and the recommendation list is still returned.

use std::sync::Arc;
use std::time::Duration;

use thali_core::config::{AgentConfig, ThaliConfig};
use thali_core::{RecommendedItem, Role};
use tracing::{debug, info, warn};

use crate::cart::CartSink;
use crate::error::ChatError;
use crate::intent::{Classification, Intent, IntentClassifier, IntentKind};
use crate::knowledge::MenuKnowledgeBase;
use crate::llm::{generate_with_timeout, LlmClient};
use crate::memory::ConversationMemory;
use crate::ranking::RelevanceRanker;
use crate::response::{ResponseComposer, APOLOGY_MESSAGE, REPHRASE_MESSAGE};
use crate::selector::{ItemSelector, SelectedItem};

/// Default retrieval depth for browse turns.
const DEFAULT_TOP_K: usize = 4;

/// Default upper bound on one LLM call.
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// TurnResponse
// =============================================================================

/// Which branch handled a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    ReferentialAdd,
    AutoOrder,
    Browse,
}

/// Result of one turn.
#[derive(Debug, Clone)]
pub struct TurnResponse {
    pub kind: TurnKind,
    pub answer: String,
    /// Display list from a browse turn; empty otherwise.
    pub recommendations: Vec<RecommendedItem>,
    /// Names committed to the cart, one entry per unit.
    pub actions_taken: Vec<String>,
    pub auto_added: bool,
    /// Retrieved chunks the browse answer was grounded on.
    pub context: Vec<String>,
}

impl TurnResponse {
    fn committed(kind: TurnKind, answer: String, actions_taken: Vec<String>) -> Self {
        let auto_added = !actions_taken.is_empty();
        Self {
            kind,
            answer,
            recommendations: Vec::new(),
            actions_taken,
            auto_added,
            context: Vec::new(),
        }
    }
}

// =============================================================================
// AgenticOrchestrator
// =============================================================================

/// Per-turn state machine over a processed menu.
///
/// Holds no per-session state: the knowledge base, memory and cart are
/// passed into every call.
pub struct AgenticOrchestrator {
    classifier: IntentClassifier,
    selector: ItemSelector,
    ranker: RelevanceRanker,
    composer: ResponseComposer,
    llm: Arc<dyn LlmClient>,
    agent: AgentConfig,
    top_k: usize,
    llm_timeout: Duration,
}

impl std::fmt::Debug for AgenticOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgenticOrchestrator")
            .field("llm", &self.llm.name())
            .field("agentic_mode", &self.agent.agentic_mode)
            .field("top_k", &self.top_k)
            .field("llm_timeout", &self.llm_timeout)
            .finish()
    }
}

impl AgenticOrchestrator {
    /// Orchestrator with default agent settings.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        let agent = AgentConfig::default();
        Self {
            classifier: IntentClassifier::new(),
            selector: ItemSelector::new(),
            ranker: RelevanceRanker::new(agent.max_recommendations),
            composer: ResponseComposer::new("Rs", agent.prompt_menu_items),
            llm,
            agent,
            top_k: DEFAULT_TOP_K,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    /// Orchestrator following the `[agent]`, `[retrieval]`, `[llm]` and
    /// `[pricing]` config sections.
    pub fn from_config(llm: Arc<dyn LlmClient>, config: &ThaliConfig) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            selector: ItemSelector::new(),
            ranker: RelevanceRanker::new(config.agent.max_recommendations),
            composer: ResponseComposer::new(
                config.pricing.currency.clone(),
                config.agent.prompt_menu_items,
            ),
            llm,
            agent: config.agent.clone(),
            top_k: config.retrieval.top_k,
            llm_timeout: Duration::from_secs(config.llm.timeout_secs.max(1)),
        }
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_agentic_mode(mut self, enabled: bool) -> Self {
        self.agent.agentic_mode = enabled;
        self
    }

    pub fn agentic_mode(&self) -> bool {
        self.agent.agentic_mode
    }

    /// Process one utterance.
    ///
    /// Errors are limited to invalid input and retrieval failures; LLM
    /// failures are absorbed into the answer.
    pub async fn handle_turn(
        &self,
        kb: &MenuKnowledgeBase,
        memory: &mut ConversationMemory,
        cart: &mut dyn CartSink,
        utterance: &str,
    ) -> Result<TurnResponse, ChatError> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if utterance.chars().count() > self.agent.max_message_length {
            return Err(ChatError::MessageTooLong(self.agent.max_message_length));
        }

        let classification = if self.agent.agentic_mode {
            self.classifier.classify(utterance, memory)
        } else {
            Classification::Intent(Intent::browse())
        };

        let response = match classification {
            Classification::ReferentialAdd => self.referential_add(memory, cart),
            Classification::Intent(intent) if intent.kind == IntentKind::Order => {
                self.auto_order(kb, memory, cart, &intent)
            }
            Classification::Intent(_) => self.browse(kb, memory, utterance).await?,
        };

        memory.record_turn(Role::User, utterance);
        memory.record_turn(Role::Assistant, response.answer.clone());
        debug!(
            session = %memory.session_id(),
            kind = ?response.kind,
            actions = response.actions_taken.len(),
            "Turn handled"
        );
        Ok(response)
    }

    fn referential_add(
        &self,
        memory: &mut ConversationMemory,
        cart: &mut dyn CartSink,
    ) -> TurnResponse {
        let items: Vec<SelectedItem> = memory
            .consume_last_recommended()
            .into_iter()
            .map(|r| SelectedItem {
                name: r.name,
                price: r.price,
                quantity: 1,
            })
            .collect();

        let actions = commit(cart, &items);
        info!(items = actions.len(), "Recommended items added");
        let answer = self.composer.compose_added_message(&items, None);
        TurnResponse::committed(TurnKind::ReferentialAdd, answer, actions)
    }

    fn auto_order(
        &self,
        kb: &MenuKnowledgeBase,
        memory: &mut ConversationMemory,
        cart: &mut dyn CartSink,
        intent: &Intent,
    ) -> TurnResponse {
        let selected = self.selector.select(intent, kb.items());
        memory.clear_last_recommended();

        if selected.is_empty() {
            debug!(budget = ?intent.budget, "Nothing selected for order");
            return TurnResponse::committed(
                TurnKind::AutoOrder,
                REPHRASE_MESSAGE.to_string(),
                Vec::new(),
            );
        }

        let actions = commit(cart, &selected);
        info!(items = actions.len(), budget = ?intent.budget, "Items auto-added");
        let answer = self.composer.compose_added_message(&selected, intent.budget);
        TurnResponse::committed(TurnKind::AutoOrder, answer, actions)
    }

    async fn browse(
        &self,
        kb: &MenuKnowledgeBase,
        memory: &mut ConversationMemory,
        utterance: &str,
    ) -> Result<TurnResponse, ChatError> {
        let context = kb.search(utterance, self.top_k).await?;
        let prompt = self.composer.build_prompt(utterance, &context, kb.items());

        let answer = match generate_with_timeout(self.llm.as_ref(), &prompt, self.llm_timeout).await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(provider = self.llm.name(), error = %e, "LLM call failed, answering with fallback");
                APOLOGY_MESSAGE.to_string()
            }
        };

        let recommendations = self.ranker.rank(utterance, kb.items());
        memory.set_last_recommended(recommendations.clone());

        Ok(TurnResponse {
            kind: TurnKind::Browse,
            answer,
            recommendations,
            actions_taken: Vec::new(),
            auto_added: false,
            context,
        })
    }
}

/// Add each unit to the cart, returning one name per call made.
fn commit(cart: &mut dyn CartSink, items: &[SelectedItem]) -> Vec<String> {
    let mut actions = Vec::new();
    for item in items {
        for _ in 0..item.quantity {
            cart.add_item(&item.name, item.price);
            actions.push(item.name.clone());
        }
    }
    actions
}

// =============================================================================
// Tests
// =============================================================================
