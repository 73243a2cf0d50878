//! Reusable widgets of the chat window

pub mod friend_list;
pub mod input_bar;
pub mod message_list;

pub use friend_list::FriendList;
pub use input_bar::InputBar;
pub use message_list::{entry_label, MessageList};
