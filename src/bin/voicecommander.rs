//! Stdio front end for the voice command engine.
//!
//! Reads one recognized utterance per line (JSON) from stdin and writes the
//! resulting input events as JSON lines to stdout, for an OS-level injector
//! to replay. Logs go to stderr.
//!
//! Usage:
//!   echo '{"window":{"executable":"chrome.exe","title":"Inbox"},"sequence":["new tab"]}' \
//!     | voicecommander
//!
//!   # Print the built-in vocabulary as an editable starting point
//!   voicecommander --dump-vocabulary > vocabulary.json
//!
//!   # Create the settings file with every default spelled out
//!   voicecommander --save-config

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use voicecommander_lib::config::{
    load_commander_config, load_json_file, load_vocabulary, save_commander_config, save_json_file,
};
use voicecommander_lib::{CommanderConfig, Engine, JsonLinesBackend, Utterance, VocabularyConfig};

#[derive(Parser, Debug)]
#[command(name = "voicecommander", version, about = "Context-scoped voice command dispatcher")]
struct Args {
    /// Settings file (defaults to config.json in the platform config dir)
    #[arg(long, env = "VOICECOMMANDER_CONFIG")]
    config: Option<PathBuf>,

    /// Vocabulary file replacing the built-in command tables
    #[arg(long, env = "VOICECOMMANDER_VOCABULARY")]
    vocabulary: Option<PathBuf>,

    /// Honor pauses by sleeping instead of forwarding them as events
    #[arg(long)]
    realtime: bool,

    /// Print the active vocabulary as JSON and exit
    #[arg(long)]
    dump_vocabulary: bool,

    /// Write the effective settings (defaults filled in) back to the
    /// settings file and exit
    #[arg(long)]
    save_config: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config: CommanderConfig = match &args.config {
        Some(path) => load_json_file(path),
        None => load_commander_config(),
    };

    if args.save_config {
        match &args.config {
            Some(path) => save_json_file(path, &config)?,
            None => save_commander_config(&config)?,
        }
        tracing::info!("Settings written");
        return Ok(());
    }

    let vocabulary = match args.vocabulary.as_ref().or(config.vocabulary.as_ref()) {
        Some(path) => load_vocabulary(path)
            .with_context(|| format!("loading vocabulary {}", path.display()))?,
        None => VocabularyConfig::builtin(),
    };

    if args.dump_vocabulary {
        println!("{}", serde_json::to_string_pretty(&vocabulary)?);
        return Ok(());
    }

    let mut engine = Engine::new(
        config.dispatch_settings(),
        vocabulary.nested_rule()?,
        vocabulary.dictation_rule()?,
        vocabulary.final_rule()?,
        config.corrector(),
    )
    .with_history_capacity(config.history_capacity);
    vocabulary.environment().install(&mut engine)?;
    engine.start();

    let stdout = io::stdout();
    let mut backend = JsonLinesBackend::new(stdout.lock(), args.realtime);

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break, // stdin closed
        };
        if line.trim().is_empty() {
            continue;
        }

        let utterance: Utterance = match serde_json::from_str(&line) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!("Invalid utterance: {e}");
                continue;
            }
        };

        // Failures are logged and recorded; the next utterance proceeds normally
        if let Err(e) = engine.process(&utterance, &mut backend) {
            tracing::debug!("Skipped utterance: {e}");
        }
    }

    engine.stop();
    tracing::info!(
        processed = engine.processed(),
        failed = engine.failed(),
        "Input closed"
    );

    backend.into_inner().flush()?;
    Ok(())
}
