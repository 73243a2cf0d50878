//! Friend list with search box

use crate::chat::ChatSession;
use crate::ui::theme::Theme;
use egui::{self, RichText};

pub struct FriendList<'a> {
    session: &'a mut ChatSession,
    theme: &'a Theme,
}

impl<'a> FriendList<'a> {
    pub fn new(session: &'a mut ChatSession, theme: &'a Theme) -> Self {
        Self { session, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        ui.label(
            RichText::new("Friends")
                .size(16.0)
                .strong()
                .color(self.theme.text_primary),
        );
        ui.add_space(self.theme.spacing_sm);

        let search = egui::TextEdit::singleline(&mut self.session.selector_mut().query)
            .hint_text("Search friends...")
            .desired_width(f32::INFINITY)
            .id(egui::Id::new("friend_search"));
        let response = ui.add(search);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "Search friends")
        });

        ui.add_space(self.theme.spacing_sm);

        let active = self.session.active_partner().map(str::to_string);
        let visible: Vec<String> = self
            .session
            .selector()
            .visible()
            .into_iter()
            .map(str::to_string)
            .collect();

        if visible.is_empty() {
            ui.label(
                RichText::new("No friends match")
                    .size(12.0)
                    .color(self.theme.text_muted),
            );
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("friend_list")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for name in &visible {
                    let selected = active.as_deref() == Some(name.as_str());
                    let text = RichText::new(name).size(14.0).color(if selected {
                        self.theme.text_primary
                    } else {
                        self.theme.text_secondary
                    });

                    let response = ui.add_sized(
                        [ui.available_width(), 32.0],
                        egui::SelectableLabel::new(selected, text),
                    );
                    if response.clicked() && !selected {
                        clicked = Some(name.clone());
                    }
                }
            });

        if let Some(name) = clicked {
            self.session.select(&name);
        }
    }
}
