pub mod data_url;
pub mod filter;
pub mod storage;
pub mod types;

pub use filter::ProfanityFilter;
pub use storage::{
    conversation_key, open_file_store, ConversationStore, FileStore, KeyValueStore, MemoryStore,
};
pub use types::{AudioSource, BlobHandle, Message, MessageBody, Sender};
