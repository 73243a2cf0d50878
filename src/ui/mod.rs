//! egui/eframe front-end for the chat session

mod app;
pub mod components;
mod theme;

pub use app::PolypalApp;
pub use theme::Theme;
