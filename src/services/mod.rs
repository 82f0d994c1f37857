//! Business logic services.
//!
//! Services own the memory collection and orchestrate rankers, router and
//! generator into the user-facing operations.

mod chat;
pub mod context;
mod gifts;
mod normalize;
mod session;
mod store;
mod supersede;

pub use chat::{ChatService, ChatTurn, EMPTY_REPLY, GENERATION_FAILURE_REPLY, PreparedTurn};
pub use context::{EMPTY_CONTEXT, build_context, build_conversation, build_system_prompt};
pub use gifts::{
    DEFAULT_CANDIDATE_LIMIT, Effort, GiftCandidate, GiftIdea, GiftIdeaService, GiftIdeas,
    gift_question, select_candidates,
};
pub use normalize::{filter_history, normalize, normalize_all};
pub use session::{SEMANTIC_UNAVAILABLE, SearchSession};
pub use store::MemoryStore;
pub use supersede::{QuerySequencer, QueryTicket};
