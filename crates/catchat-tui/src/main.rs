mod app;
mod clipboard;
mod handler;
mod logging;
mod tui;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use catchat_core::{Config, ConversationStore};

use crate::app::App;
use crate::tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    // Logging is best effort; the chat works without it
    match logging::init_logging() {
        Ok(path) => tracing::debug!(path = %path.display(), "logging to file"),
        Err(err) => eprintln!("catchat: logging disabled: {:#}", err),
    }

    let config = Config::load().context("failed to load configuration")?;
    let mode = config.delivery_mode()?;
    let store = Arc::new(ConversationStore::new());
    let pipeline = config
        .build_pipeline(store)
        .context("failed to set up message delivery")?;

    tracing::info!(
        mode = mode.as_str(),
        endpoint = config.endpoint(),
        "catchat starting v{}",
        env!("CARGO_PKG_VERSION")
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(pipeline, mode, events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    tracing::info!("catchat exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
