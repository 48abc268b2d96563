use std::time::Duration;
use anyhow::Result;
use clap::Parser;

mod app;
mod chat;
mod config;
mod debug;
mod handler;
mod page;
mod prefs;
mod tui;
mod ui;

use app::App;
use chat::ChatClient;
use config::Config;
use page::PageHandle;

/// How long the panel waits for the page extractor before giving up and
/// opening with empty content.
const PAGE_CONTENT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Study any page with an AI tutor that adapts to how you learn")]
struct Cli {
    /// Page to study: a local file or an http(s) URL
    source: Option<String>,

    /// Chat model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the chat-completion API
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    debug::init();

    // The extractor runs as its own task. If the document cannot be loaded
    // the panel still opens; requests just never get an answer.
    let page = match &cli.source {
        Some(source) => match page::load_document(source).await {
            Ok(text) => PageHandle::spawn(text),
            Err(e) => {
                log::error!("failed to load {}: {}", source, e);
                PageHandle::disconnected()
            }
        },
        None => PageHandle::disconnected(),
    };

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let (learning_style, enhancement_type) = prefs::resolve(&config);

    // Credential comes from the environment first, then the config file;
    // it is never baked into the binary
    let api_key = std::env::var("OPENAI_API_KEY")
        .ok()
        .or_else(|| config.openai_api_key.clone())
        .unwrap_or_default();
    let model = cli
        .model
        .clone()
        .or_else(|| config.default_model.clone())
        .unwrap_or_else(|| chat::DEFAULT_MODEL.to_string());
    let api_url = cli
        .api_url
        .clone()
        .unwrap_or_else(|| chat::DEFAULT_API_BASE.to_string());

    let api_key_missing = api_key.is_empty();
    let chat_client = ChatClient::new(&api_url, &api_key, &model);

    // One snapshot per panel open. No response within the window degrades
    // to empty content; the chat still works, just without page context.
    let page_content = match page.get_page_content(PAGE_CONTENT_TIMEOUT).await {
        Some(content) => content,
        None => {
            log::error!("no response from page extractor");
            String::new()
        }
    };

    let mut app = App::new(learning_style, enhancement_type, page_content, chat_client);
    app.api_key_missing = api_key_missing;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;
        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event)?;
        }
        app.harvest_replies().await;
    }

    tui::restore()?;
    Ok(())
}
