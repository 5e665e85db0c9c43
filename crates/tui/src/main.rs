mod card;
mod renderer;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use scroll_reveal_core::{RevealConfig, ScrollDistance};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: scroll-reveal [--config <config.json>] [--log <file>] [text-file]";

const DEFAULT_PASSAGE: &str = "
When does a man die?
When he is hit by a bullet? No!
When he suffers a disease? No!
When he ate a soup made out of a poisonous mushroom? No!
A man dies when he is forgotten!
";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    log: Option<PathBuf>,
    text: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "--log" => {
                let Some(value) = args.next() else {
                    bail!("{arg} needs a value\n{USAGE}");
                };
                let slot = if arg == "--config" {
                    &mut parsed.config
                } else {
                    &mut parsed.log
                };
                *slot = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => bail!("unknown flag {flag}\n{USAGE}"),
            _ if parsed.text.is_some() => bail!("more than one text file given\n{USAGE}"),
            _ => parsed.text = Some(PathBuf::from(arg)),
        }
    }
    Ok(parsed)
}

/// Settings used when no config file is given: the passage starts fully
/// transparent and blurred, upright, and reveals over one screen.
fn preview_config() -> RevealConfig {
    RevealConfig {
        base_opacity: 0.0,
        enable_blur: true,
        base_rotation_deg: 0.0,
        blur_strength_px: 10.0,
        reveal_end: ScrollDistance::ViewportPercent(100.0),
        ..RevealConfig::default()
    }
}

fn load_config(path: Option<&Path>) -> Result<RevealConfig> {
    let Some(path) = path else {
        return Ok(preview_config());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    RevealConfig::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
}

fn load_text(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading text {}", path.display())),
        None => Ok(DEFAULT_PASSAGE.to_string()),
    }
}

/// The terminal belongs to the UI, so logs only go to a file.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scroll_reveal_core=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    init_logging(args.log.as_deref())?;
    let config = load_config(args.config.as_deref())?;
    let text = load_text(args.text.as_deref())?;
    tracing::info!(?config, chars = text.len(), "starting preview");

    renderer::run(&text, &config)
}
