//! Main application struct and eframe integration

use crate::chat::ChatSession;
use crate::messages::AudioSource;
use crate::ui::components::{FriendList, InputBar, MessageList};
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};
use std::time::Duration;
use tracing::{debug, info};

#[cfg(feature = "audio-io")]
use crate::audio::{decode_artifact, AudioPlayer};

/// How long to wait for voice messages still converting on exit
const EXIT_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

pub struct PolypalApp {
    session: ChatSession,
    theme: Theme,
    #[cfg(feature = "audio-io")]
    player: Option<AudioPlayer>,
}

impl PolypalApp {
    pub fn new(cc: &eframe::CreationContext<'_>, session: ChatSession) -> Self {
        let app = Self::with_session(session);
        app.theme.apply(&cc.egui_ctx);
        app
    }

    /// App without an eframe context, used when driving the UI from tests
    pub fn with_session(session: ChatSession) -> Self {
        Self {
            session,
            theme: Theme::dark(),
            #[cfg(feature = "audio-io")]
            player: None,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    /// Draw one frame
    pub fn show(&mut self, ctx: &egui::Context) {
        if self.session.poll_events() {
            ctx.request_repaint();
        }

        self.show_friends(ctx);
        self.show_header(ctx);
        self.show_input_area(ctx);
        self.show_content(ctx);
        self.show_alert(ctx);

        if self.session.is_recording() || self.session.pending_conversions() > 0 {
            ctx.request_repaint();
        } else if let Some(wait) = self.session.next_reply_in() {
            ctx.request_repaint_after(wait);
        }
    }

    fn show_friends(&mut self, ctx: &egui::Context) {
        SidePanel::left("friends")
            .resizable(true)
            .default_width(200.0)
            .min_width(160.0)
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_secondary)
                    .inner_margin(self.theme.spacing_sm),
            )
            .show(ctx, |ui| {
                FriendList::new(&mut self.session, &self.theme).show(ui);
            });
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        let title = self
            .session
            .active_partner()
            .unwrap_or("Polypal")
            .to_string();

        TopBottomPanel::top("header")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_secondary)
                    .inner_margin(12.0),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let response = ui.label(
                        RichText::new(&title)
                            .size(20.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(
                            egui::WidgetType::Label,
                            true,
                            format!("Conversation title: {}", title),
                        )
                    });
                });
            });
    }

    fn show_input_area(&mut self, ctx: &egui::Context) {
        TopBottomPanel::bottom("input_area")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(self.theme.spacing_sm),
            )
            .show(ctx, |ui| {
                InputBar::new(&mut self.session, &self.theme).show(ui);
            });
    }

    fn show_content(&mut self, ctx: &egui::Context) {
        let has_partner = self.session.active_partner().is_some();
        let scroll = self.session.log_mut().take_scroll_request();

        let play = CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(self.theme.spacing_sm),
            )
            .show(ctx, |ui| {
                MessageList::new(self.session.log().entries(), &self.theme)
                    .has_partner(has_partner)
                    .scroll_to_bottom(scroll)
                    .show(ui)
            })
            .inner;

        if let Some(source) = play {
            self.play(&source);
        }
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(alert) = self.session.last_alert().map(str::to_string) else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new("Alert")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(&alert).color(self.theme.text_primary));
                ui.add_space(self.theme.spacing_sm);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });

        if dismissed {
            self.session.dismiss_alert();
        }
    }

    #[cfg(feature = "audio-io")]
    fn play(&mut self, source: &AudioSource) {
        let result = self
            .session
            .resolve_audio(source)
            .and_then(|artifact| decode_artifact(&artifact))
            .and_then(|clip| {
                if self.player.is_none() {
                    self.player = Some(AudioPlayer::new()?);
                }
                match self.player.as_mut() {
                    Some(player) => player.play(clip),
                    None => Ok(()),
                }
            });

        if let Err(e) = result {
            tracing::warn!("Could not play voice message: {}", e);
            self.session.raise_alert(&e);
        }
    }

    #[cfg(not(feature = "audio-io"))]
    fn play(&mut self, source: &AudioSource) {
        debug!("Playback unavailable in this build, ignoring {}", source.as_str());
    }
}

impl eframe::App for PolypalApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let pending = self.session.pending_conversions();
        if pending > 0 {
            debug!("Waiting for {} voice messages to be saved", pending);
            self.session.flush_conversions(EXIT_FLUSH_TIMEOUT);
        }
        info!("Polypal shutting down");
    }
}
