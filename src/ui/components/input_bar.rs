//! Input bar component
//!
//! Mic toggle, message box and send button.

use crate::chat::ChatSession;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText, Vec2};

pub struct InputBar<'a> {
    session: &'a mut ChatSession,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(session: &'a mut ChatSession, theme: &'a Theme) -> Self {
        Self { session, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.bubble_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    self.show_mic_button(ui);
                    self.show_text_input(ui);
                    self.show_send_button(ui);
                });

                if self.session.is_recording() {
                    ui.label(
                        RichText::new(format!(
                            "Recording... {:.1}s",
                            self.session.recording_secs()
                        ))
                        .size(12.0)
                        .color(self.theme.recording),
                    );
                }
            });
    }

    fn show_mic_button(&mut self, ui: &mut egui::Ui) {
        let affordance = self.session.mic_affordance();
        let color = if affordance.recording {
            self.theme.recording
        } else {
            self.theme.text_secondary
        };

        let mut button = egui::Button::new(RichText::new(affordance.icon).size(20.0).color(color))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding);
        if affordance.recording {
            button = button.fill(self.theme.recording.gamma_multiply(0.2));
        }

        let response = ui.add(button);
        let rect = response.rect;
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, true, affordance.label)
        });
        let clicked = response.clicked();
        response.on_hover_text(affordance.label);

        if clicked {
            self.session.toggle_recording();
        }

        if self.session.is_recording() {
            let t = ui.ctx().input(|i| i.time);
            let pulse = ((t * 3.0).sin() * 0.5 + 0.5) as f32;
            ui.painter().circle_stroke(
                rect.center(),
                rect.width() / 2.0 + 2.0 + pulse * 3.0,
                egui::Stroke::new(
                    2.0 * pulse,
                    self.theme.recording.gamma_multiply(1.0 - pulse * 0.5),
                ),
            );
            ui.ctx().request_repaint();
        }
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui) {
        // Leave room for the send button
        let width = (ui.available_width() - 56.0).max(80.0);

        let text_edit = egui::TextEdit::singleline(&mut self.session.input_text)
            .hint_text("Type a message...")
            .desired_width(width)
            .margin(egui::Margin::symmetric(10.0, 8.0))
            .id(egui::Id::new("message_input"));

        let response = ui.add(text_edit);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "Message input")
        });

        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            self.session.send_text();
            response.request_focus();
        }
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) {
        let can_send = !self.session.input_text.trim().is_empty();
        let fill = if can_send {
            self.theme.primary
        } else {
            self.theme.bg_tertiary
        };

        let button = egui::Button::new(RichText::new("➤").size(18.0).color(egui::Color32::WHITE))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding)
            .fill(fill);

        let response = ui.add_enabled(can_send, button);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, can_send, "Send message")
        });
        if response.clicked() {
            self.session.send_text();
        }
        response.on_hover_text("Send message (Enter)");
    }
}
