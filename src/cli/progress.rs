//! Progress bar for the Link flow

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::services::{LinkEvent, LinkProgress, LINK_STEPS};
use crate::cli::output;

/// Renders `LinkEvent`s as a progress bar with status lines above it.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new(LINK_STEPS);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:30.green/white}] {pos}/{len}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(message.green().to_string());
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl LinkProgress for BarProgress {
    fn report(&self, event: LinkEvent) {
        self.bar.set_position(event.completed_steps());
        self.bar.suspend(|| match &event {
            LinkEvent::LinkTokenCreated => output::success("Created link token..."),
            LinkEvent::BrowserOpened { .. } => {
                output::bold("Opening browser to connect your financial institution...")
            }
            LinkEvent::BrowserUnavailable { url, reason } => {
                output::warning(&format!("Could not open a browser ({reason})."));
                output::bold("Open this URL to connect your financial institution:");
                output::detail(url);
            }
            LinkEvent::WaitingForAuthorization => output::warning("Waiting for authorization..."),
            LinkEvent::AuthorizationReceived => output::success("Received callback from Plaid!"),
            LinkEvent::PublicTokenReceived => output::success("Authorization received!"),
            LinkEvent::TokenExchanged | LinkEvent::ConnectionSaved { .. } => {}
        });
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
