mod action;
mod app;
mod auth;
mod cache;
mod config;
mod error;
mod event;
mod fetcher;
mod git;
mod github;
mod host;
mod message;
mod mutation;
mod patch;
mod section;
mod store;
mod task;
mod tui;
mod types;
mod ui;
mod viewport;

use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::app::App;
use crate::config::{Config, ViewKind};
use crate::event::Event;
use crate::fetcher::Fetcher;
use crate::github::GitHub;
use crate::mutation::ProcessRunner;
use crate::store::DoneStore;
use crate::tui::EventHandler;

/// A terminal dashboard for GitHub pull requests, issues, notifications
/// and local branches.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// View to open on start
    #[arg(short, long, value_enum)]
    view: Option<ViewKind>,

    /// Log at debug level to sift-debug.log
    #[arg(long)]
    debug: bool,
}

const DEBUG_LOG: &str = "sift-debug.log";

fn init_logging(debug: bool) -> std::io::Result<()> {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if debug {
        // Keep logs off the alternate screen
        let file = std::fs::File::create(DEBUG_LOG)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.debug)?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let config = Config::load(args.config.as_deref())?;
    let view = args.view.unwrap_or(config.defaults.view);

    let token = auth::load_token().await?;
    let done = Arc::new(DoneStore::open_default());
    tracing::debug!(count = done.len(), "loaded done notifications");
    let fetcher: Arc<dyn Fetcher> = Arc::new(GitHub::new(token, Arc::clone(&done))?);

    let result = run(config, view, fetcher, done).await;

    tui::restore()?;

    result
}

async fn run(
    config: Config,
    view: ViewKind,
    fetcher: Arc<dyn Fetcher>,
    done: Arc<DoneStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(
        config,
        view,
        fetcher,
        Arc::new(ProcessRunner),
        done,
        action_tx.clone(),
    );
    app.update(Action::Resize(terminal.size()?.height));

    let tick_rate = Duration::from_millis(250);
    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(tick_rate, render_rate);

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break;
                }

                match event {
                    Event::Render => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
