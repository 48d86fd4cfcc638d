//! Terminal front end for HTML and PPTX slide decks.

mod terminal;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deck_core::{
    Deck, DeckFormat, ExportOptions, Presenter, PresenterConfig, PresentationSurface,
    SlideRepository,
};
use std::io::{self, BufRead, Cursor};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use terminal::{parse_token, TerminalSurface, Token};

/// Present, export and print slide decks.
#[derive(Parser, Debug)]
#[command(name = "deck")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Present a deck interactively, one key token per line on stdin
    Show {
        /// Input deck (.html or .pptx)
        input: PathBuf,

        /// Start on this slide (1-based)
        #[arg(long, conflicts_with = "fragment")]
        slide: Option<usize>,

        /// Start from a location fragment such as '#slide-3'
        #[arg(long)]
        fragment: Option<String>,

        /// Advance automatically every SECS seconds
        #[arg(long, value_name = "SECS")]
        auto_advance: Option<u64>,

        /// Open with speaker notes visible
        #[arg(short, long)]
        notes: bool,

        /// Directory for exported files (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export slide titles, content and notes as JSON
    Export {
        /// Input deck (.html or .pptx)
        input: PathBuf,

        /// Output directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Title for the export (default: the deck title)
        #[arg(long)]
        title: Option<String>,

        /// Topic used to name the output file (default: the title)
        #[arg(long)]
        topic: Option<String>,

        /// Extra metadata entry; VALUE is parsed as JSON when possible
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,

        /// Print JSON to stdout instead of writing a file
        #[arg(short, long)]
        print: bool,
    },

    /// Print every slide in a plain-text print layout
    Print {
        /// Input deck (.html or .pptx)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match args.command {
        Command::Show {
            input,
            slide,
            fragment,
            auto_advance,
            notes,
            output,
        } => {
            let deck = load_deck(&input)?;
            let surface = TerminalSurface::new(io::stdout(), output_dir(output));
            let config = PresenterConfig {
                auto_advance_ms: auto_advance.map(|secs| secs.saturating_mul(1_000)),
                ..PresenterConfig::default()
            };
            let mut presenter = Presenter::new(deck, surface)
                .context("Failed to start presenter")?
                .with_config(config);

            presenter.start();
            if notes {
                presenter.toggle_notes();
            }
            if let Some(index) = slide {
                if !presenter.go_to(index).is_moved() && index != presenter.current() {
                    log::warn!("No slide {}; starting on slide 1", index);
                }
            } else if let Some(fragment) = fragment {
                presenter.open_fragment(&fragment);
            }
            run_interactive(&mut presenter)
        }
        Command::Export {
            input,
            output,
            title,
            topic,
            meta,
            print,
        } => {
            let deck = load_deck(&input)?;

            let mut options = ExportOptions::new();
            if let Some(title) = title {
                options = options.with_title(title);
            }
            if let Some(topic) = topic {
                options = options.with_topic(topic);
            }
            for (key, value) in meta {
                let value = serde_json::from_str(&value)
                    .unwrap_or_else(|_| serde_json::Value::String(value));
                options = options.with_metadata(key, value);
            }

            let surface = TerminalSurface::new(io::stderr(), output_dir(output));
            let mut presenter = Presenter::new(deck, surface)
                .context("Failed to load deck")?
                .with_export_options(options);

            if print {
                let json = serde_json::to_string_pretty(&presenter.snapshot())?;
                println!("{}", json);
            } else if presenter.export().is_none() {
                bail!("Export of {} failed", input.display());
            }
            Ok(())
        }
        Command::Print { input } => {
            let deck = load_deck(&input)?;
            let slides: Vec<_> = deck.slides().collect();
            let mut surface = TerminalSurface::new(io::stdout(), output_dir(None));
            surface.print_all(&slides);
            Ok(())
        }
    }
}

/// Read a deck file, detecting its format from content then extension.
fn load_deck(input_path: &Path) -> Result<Deck> {
    let bytes = std::fs::read(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;

    let filename = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    let format = DeckFormat::detect(&bytes, filename)
        .with_context(|| format!("Could not load {}", input_path.display()))?;

    let deck = match format {
        DeckFormat::Html => {
            log::debug!("Parsing as HTML");
            deck_html::HtmlParser::new()
                .parse_str(&String::from_utf8_lossy(&bytes), filename)
                .map_err(|e| anyhow::anyhow!("{}", e))?
        }
        DeckFormat::Pptx => {
            log::debug!("Parsing as PPTX");
            deck_pptx::PptxParser::new()
                .parse(Cursor::new(bytes), filename)
                .map_err(|e| anyhow::anyhow!("{}", e))?
        }
    };

    log::debug!("Loaded {} slides from {}", deck.len(), filename);
    Ok(deck)
}

/// Drive the presenter from stdin tokens and the wall clock.
///
/// Stdin is read on a separate thread so scheduled work keeps running
/// between key presses.
fn run_interactive<R, S>(presenter: &mut Presenter<R, S>) -> Result<()>
where
    R: SlideRepository,
    S: PresentationSurface,
{
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    let started = Instant::now();
    let elapsed_ms = || u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    loop {
        let now = elapsed_ms();
        presenter.advance_clock(now);

        let received = match presenter.next_deadline() {
            Some(deadline) => {
                rx.recv_timeout(Duration::from_millis(deadline.saturating_sub(now)))
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(line) => {
                presenter.advance_clock(elapsed_ms());
                match parse_token(&line) {
                    Some(Token::Quit) => break,
                    Some(Token::Input(events)) => {
                        for event in events {
                            presenter.handle_input(event);
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!("Unknown input '{}'; type ? for help", line.trim()),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    presenter.stop_auto_advance();
    Ok(())
}

fn output_dir(output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from("."))
}

/// Parse a `KEY=VALUE` pair.
fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
