//! feed-app: terminal rendition of the personal feed.
//!
//! Wires the core (feed synchronizer + post composer) to the file-backed
//! store and runs the single event loop: insert notifications re-fetch the
//! feed, published feed changes re-render, and input lines drive the
//! composer.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use feed_app::local::LocalStore;
use feed_app::render;

use feed_core::{Attachment, Composer, FeedSync, SubmitError};

#[derive(Parser, Debug)]
#[command(name = "feed-app")]
#[command(about = "Personal feed with a local store backend")]
struct Args {
    /// Directory the store keeps records and blobs in
    #[arg(short, long, default_value = "wall-data")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

/// App state holding the two stateful components.
struct App {
    sync: FeedSync<Arc<LocalStore>>,
    composer: Composer<Arc<LocalStore>>,
}

impl App {
    /// Handle one input line. Returns false when the app should exit.
    async fn on_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            (":quit", _) => return false,
            (":help", _) => print_help(),
            (":refresh", _) => self.sync.refresh().await,
            (":detach", _) => {
                self.composer.clear_image();
                println!("Attachment removed.");
            }
            (":image", path) if !path.is_empty() => self.attach(path).await,
            (":image", _) => println!("Usage: :image <path>"),
            ("", _) => {}
            _ => self.share(line).await,
        }

        println!(
            "{}",
            render::composer_status(self.composer.remaining(), self.composer.image().is_some())
        );
        true
    }

    /// Load an image from disk and attach it to the draft.
    async fn attach(&mut self, path: &str) {
        match tokio::fs::read(path).await {
            Ok(data) => {
                let file_name = Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string());
                self.composer.attach_image(Attachment { file_name, data });
                println!("Attached {}.", path);
            }
            Err(e) => {
                warn!("Failed to read attachment {}: {}", path, e);
                println!("An error occurred. Please try again.");
            }
        }
    }

    /// Put the line into the draft and run the submission pipeline.
    async fn share(&mut self, line: &str) {
        self.composer.set_body(line);

        match self.composer.submit().await {
            Ok(Some(id)) => {
                debug!("Created post {}", id);
                println!("Shared.");
            }
            Ok(None) => println!("Nothing to share yet."),
            Err(SubmitError::Upload(e)) => {
                warn!("Upload error: {}", e);
                println!("Failed to upload image. Please try again.");
            }
            Err(SubmitError::Insert(e)) => {
                warn!("Insert error: {}", e);
                println!("Failed to create post. Please try again.");
            }
        }
    }
}

fn print_help() {
    println!("Type a line of text to share it as a post.");
    println!("  :image <path>   attach an image to the draft");
    println!("  :detach         remove the attachment");
    println!("  :refresh        re-fetch the feed");
    println!("  :quit           exit");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,feed_app=debug"
    } else {
        "info,feed_app=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting feed-app");
    info!("Data directory: {:?}", args.data_dir);

    let store = Arc::new(LocalStore::new(args.data_dir.clone()));
    let (sync, mut feed_rx) = FeedSync::new(Arc::clone(&store));
    let composer = Composer::new(Arc::clone(&store));
    let mut app = App { sync, composer };

    // One subscription for the app's lifetime; dropped (and released) on exit.
    let mut inserts = app.sync.subscribe();
    app.sync.refresh().await;

    print!("{}", render::header(true));
    print!("{}", render::profile());
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            // A new record landed in the store; re-fetch unconditionally.
            Some(event) = inserts.next() => {
                debug!("Insert notification for record {}", event.id);
                app.sync.refresh().await;
            }

            // The synchronizer republished the feed; re-render it.
            changed = feed_rx.changed() => {
                if changed.is_ok() {
                    println!();
                    print!("{}", render::feed(&feed_rx.borrow_and_update()));
                } else {
                    break;
                }
            }

            // Composer input.
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !app.on_line(&line).await {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }

            // Handle graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down");
    Ok(())
}
