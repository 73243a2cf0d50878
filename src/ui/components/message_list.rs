//! Message list component
//!
//! Draws the visible chat log: user messages on the right, bot replies on
//! the left and system notices centered. Audio entries get a play button.

use crate::chat::{EntryBody, LogEntry};
use crate::messages::{AudioSource, Sender};
use crate::ui::theme::Theme;
use chrono::Local;
use egui::{self, Align, Color32, RichText};

/// Accessible description of a log entry
pub fn entry_label(entry: &LogEntry) -> String {
    let who = match entry.sender {
        Sender::User => "User message",
        Sender::Bot => "Bot message",
        Sender::System => "System notice",
    };
    match &entry.body {
        EntryBody::Text(text) => format!("{}: {}", who, text),
        EntryBody::Audio { duration_label, .. } => match duration_label {
            Some(d) => format!("{}: voice message {}", who, d),
            None => format!("{}: voice message", who),
        },
    }
}

pub struct MessageList<'a> {
    entries: &'a [LogEntry],
    theme: &'a Theme,
    has_partner: bool,
    scroll_to_bottom: bool,
}

impl<'a> MessageList<'a> {
    pub fn new(entries: &'a [LogEntry], theme: &'a Theme) -> Self {
        Self {
            entries,
            theme,
            has_partner: true,
            scroll_to_bottom: false,
        }
    }

    pub fn has_partner(mut self, has_partner: bool) -> Self {
        self.has_partner = has_partner;
        self
    }

    pub fn scroll_to_bottom(mut self, scroll: bool) -> Self {
        self.scroll_to_bottom = scroll;
        self
    }

    /// Returns the source of an audio entry whose play button was clicked
    pub fn show(self, ui: &mut egui::Ui) -> Option<AudioSource> {
        let mut play = None;

        egui::ScrollArea::vertical()
            .id_salt("message_list")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.add_space(self.theme.spacing);

                if self.entries.is_empty() {
                    self.show_empty_state(ui);
                }

                for entry in self.entries {
                    if let Some(source) = self.show_entry(ui, entry) {
                        play = Some(source);
                    }
                    ui.add_space(self.theme.spacing_sm);
                }

                if self.scroll_to_bottom {
                    ui.scroll_to_cursor(Some(Align::BOTTOM));
                }
            });

        play
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        let hint = if self.has_partner {
            "No messages yet. Say hello!"
        } else {
            "Select a friend to start chatting."
        };

        ui.vertical_centered(|ui| {
            ui.add_space(80.0);
            ui.label(RichText::new(hint).size(14.0).color(self.theme.text_muted));
        });
    }

    fn show_entry(&self, ui: &mut egui::Ui, entry: &LogEntry) -> Option<AudioSource> {
        let (align, fill, text_color) = match entry.sender {
            Sender::User => (Align::RIGHT, self.theme.user_bubble, Color32::WHITE),
            Sender::Bot => (Align::LEFT, self.theme.bot_bubble, self.theme.text_primary),
            Sender::System => (Align::Center, self.theme.notice_bubble, self.theme.warning),
        };
        let label = entry_label(entry);
        let mut play = None;

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            let max_width = ui.available_width() * 0.7;

            egui::Frame::none()
                .fill(fill)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);

                    match &entry.body {
                        EntryBody::Text(text) => {
                            let response =
                                ui.label(RichText::new(text).size(14.0).color(text_color));
                            response.widget_info(|| {
                                egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label)
                            });
                        }
                        EntryBody::Audio {
                            source,
                            duration_label,
                        } => {
                            ui.horizontal(|ui| {
                                let button = egui::Button::new(
                                    RichText::new("▶").size(16.0).color(text_color),
                                )
                                .rounding(self.theme.button_rounding);
                                let response = ui.add(button);
                                response.widget_info(|| {
                                    egui::WidgetInfo::labeled(
                                        egui::WidgetType::Button,
                                        true,
                                        &label,
                                    )
                                });
                                if response.clicked() {
                                    play = Some(source.clone());
                                }

                                ui.label(
                                    RichText::new(duration_label.as_deref().unwrap_or("Voice"))
                                        .size(13.0)
                                        .color(text_color),
                                );
                            });
                        }
                    }
                });

            if entry.sender != Sender::System {
                let time = entry.timestamp.with_timezone(&Local).format("%H:%M");
                ui.label(
                    RichText::new(time.to_string())
                        .size(11.0)
                        .color(self.theme.text_muted),
                );
            }
        });

        play
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::BlobHandle;
    use chrono::Utc;

    fn entry(sender: Sender, body: EntryBody) -> LogEntry {
        LogEntry {
            id: 0,
            sender,
            timestamp: Utc::now(),
            body,
        }
    }

    #[test]
    fn test_entry_labels() {
        assert_eq!(
            entry_label(&entry(Sender::User, EntryBody::Text("hello".into()))),
            "User message: hello"
        );
        assert_eq!(
            entry_label(&entry(Sender::System, EntryBody::Text("blocked".into()))),
            "System notice: blocked"
        );
        assert_eq!(
            entry_label(&entry(
                Sender::Bot,
                EntryBody::Audio {
                    source: AudioSource::Ephemeral(BlobHandle::new()),
                    duration_label: Some("2s".into()),
                }
            )),
            "Bot message: voice message 2s"
        );
    }
}
