//! Offline recommendation CLI.
//!
//! Runs the deterministic scorer against answers read from a file or stdin.
//!
//! Usage:
//!   cargo run --bin recommend -- --file answers.json
//!   echo '"electric hatch for the city"' | cargo run --bin recommend -- --explain

use anyhow::{Context, Result};
use car_match::{
    AnswerSet, Catalog, Scorer, config::Config, config::DEFAULT_LOG_FILTER, init_tracing,
};
use clap::Parser;
use std::io::Read;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "recommend")]
#[command(about = "Rank catalog cars for a set of questionnaire answers", long_about = None)]
struct Cli {
    /// JSON file with answers (or `{"answers": ...}`); stdin when omitted
    #[arg(short, long)]
    file: Option<String>,

    /// Treat the input as plain text instead of JSON
    #[arg(long)]
    text: bool,

    /// Catalog TOML file overriding the configured catalog
    #[arg(long)]
    catalog: Option<String>,

    /// Print detected wants, budget tier and candidate scores
    #[arg(long)]
    explain: bool,
}

fn read_input(cli: &Cli) -> Result<String> {
    match &cli.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read answers file {}", path)),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read answers from stdin")?;
            Ok(buf)
        }
    }
}

fn parse_answers(input: &str, as_text: bool) -> Result<AnswerSet> {
    if as_text {
        return Ok(AnswerSet::text(input.trim()));
    }
    let mut value: serde_json::Value =
        serde_json::from_str(input).context("Input is not valid JSON (use --text for free text)")?;
    if let Some(inner) = value.get_mut("answers") {
        value = inner.take();
    }
    Ok(serde_json::from_value(value)?)
}

fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_FILTER);
    let cli = Cli::parse();

    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    let catalog = match cli.catalog.as_ref().or(config.scoring.catalog_path.as_ref()) {
        Some(path) => Catalog::from_toml_file(path)?,
        None => Catalog::default(),
    };
    let scorer = Scorer::new(Arc::new(catalog))
        .with_weights(config.scoring.weights.clone())
        .with_image_base_url(config.images.base_url.clone());

    let answers = parse_answers(&read_input(&cli)?, cli.text)?;
    let analysis = scorer.analyze(&answers);

    if cli.explain {
        let wants: Vec<_> = analysis.wants.iter().map(|w| format!("{w:?}")).collect();
        let wants = if wants.is_empty() {
            "(none)".to_string()
        } else {
            wants.join(", ")
        };
        println!("wants:  {wants}");
        println!("budget: {}", analysis.budget_tier);
        println!("candidates:");
        for scored in &analysis.ranked {
            if let Some(item) = scorer.catalog().get(scored.index) {
                println!("  {:>3}  {}", scored.score, item.display_name());
            }
        }
        println!();
    }

    println!("{}", serde_json::to_string_pretty(&analysis.picks)?);
    Ok(())
}
