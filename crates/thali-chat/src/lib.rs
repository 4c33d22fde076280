//! Conversational ordering engine for Thali.
//!
//! Classifies each customer utterance, answers menu questions through an
//! LLM grounded on retrieved menu text, and commits items to the cart when
//! the customer asks the agent to order or refers back to its suggestions.

pub mod cart;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod ranking;
pub mod response;
pub mod selector;
pub mod session;

pub use cart::{Cart, CartSink, CartTotals};
pub use error::ChatError;
pub use intent::{Classification, FoodCategory, Intent, IntentClassifier, IntentKind};
pub use knowledge::{process_menu, MenuKnowledgeBase};
pub use llm::{
    build_llm_client, generate_with_timeout, GeminiClient, LlmClient, MockLlm, OpenAiCompatClient,
};
pub use memory::{ConversationMemory, RecommendationState};
pub use orchestrator::{AgenticOrchestrator, TurnKind, TurnResponse};
pub use ranking::RelevanceRanker;
pub use response::ResponseComposer;
pub use selector::{Allocation, ItemSelector, SelectedItem};
pub use session::MenuSession;
