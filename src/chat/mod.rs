//! Chat core: rendering, persistence of rendered messages, conversation
//! switching and the session that ties them to the UI

pub mod persist;
pub mod renderer;
pub mod selector;
pub mod session;

pub use persist::{ConversionEvent, ConversionJob, ConversionWorker};
pub use renderer::{
    duration_label, plan_persistence, AudioDescriptor, ChatLog, EntryBody, LogEntry,
    MessageRenderer, PersistPlan, RenderContent,
};
pub use selector::ConversationSelector;
pub use session::{ChatSession, SendOutcome, BLOCKED_NOTICE};
