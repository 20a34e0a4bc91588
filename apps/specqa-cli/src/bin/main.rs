use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use specqa_core::config::{expand_path, Config, Settings};
use specqa_embed::get_default_embedder;
use specqa_pipeline::{
    ExtractiveGenerator, IngestReport, QaPipeline, QueryResponse, QueryStatus, RetryPolicy, RetryingGenerator,
};

const RULE_WIDTH: usize = 70;

#[derive(Debug, Parser)]
#[command(name = "specqa", about = "Question answering over audio equipment manuals")]
struct Cli {
    /// Configuration overlay to load (dev, test, prod); defaults to RUST_ENV
    #[arg(long, global = true)]
    env: Option<String>,

    /// Increase log verbosity (-d, -dd); RUST_LOG takes precedence
    #[arg(short = 'd', long = "debug", action = clap::ArgAction::Count, global = true)]
    debug: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Chunk and index a directory of .txt manuals, then report what was found
    Ingest {
        /// Defaults to `data_dir` from the configuration
        dir: Option<PathBuf>,
        /// Only the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Answer one question
    Ask {
        question: String,
        /// Log each pipeline step
        #[arg(long)]
        verbose: bool,
        #[arg(long)]
        json: bool,
    },
    /// Interactive question loop; `quit`, `exit` or `q` leaves
    Chat,
    /// Corpus, cache and metrics overview
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match debug {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).without_time().init();
}

fn load_settings(env: Option<&str>) -> Result<Settings> {
    let config = match env {
        Some(name) => Config::load_for_env(name)?,
        None => Config::load()?,
    };
    Ok(config.settings()?)
}

fn build_pipeline(settings: &Settings) -> Result<QaPipeline> {
    let embedder = get_default_embedder(settings.embedding_dim)?;
    let generator = RetryingGenerator::new(ExtractiveGenerator::default(), RetryPolicy::from_settings(settings));
    Ok(QaPipeline::in_memory(settings, embedder, Box::new(generator)))
}

fn ingest_with_progress(qa: &QaPipeline, dir: &Path, limit: Option<usize>) -> Result<IngestReport> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Indexing {}", dir.display()));
    let report = qa.ingest_directory(dir, limit);
    match &report {
        Ok(r) => spinner.finish_with_message(format!(
            "Indexed {} chunks from {} documents",
            r.chunks_added, r.documents
        )),
        Err(_) => spinner.abandon_with_message("Indexing failed"),
    }
    Ok(report?)
}

fn print_response(response: &QueryResponse) {
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("ANSWER:");
    println!("{}", "-".repeat(RULE_WIDTH));
    println!("{}\n", response.answer);

    if let Some(confidence) = &response.confidence {
        println!("Confidence: {} ({:.2})", confidence.label, confidence.overall);
        println!("  {}", confidence.explanation);
        println!("  {}\n", confidence.recommendation());
    }

    if !response.sources.is_empty() {
        println!("SOURCES:");
        println!("{}", "-".repeat(RULE_WIDTH));
        for src in &response.sources {
            println!("{}. Page {} ({})", src.index, src.page, src.content_type);
            println!("   Source: {}", src.source);
            println!("   Snippet: {}\n", src.snippet);
        }
    }

    let cached = if response.cache_hit == Some(true) { ", cached" } else { "" };
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("({:.2}s{cached})", response.time);
}

fn print_stats(qa: &QaPipeline) {
    let info = qa.system_info();
    println!("Documents indexed: {}", info.document_count);
    println!("Generator: {}", info.generator);
    println!("Confidence scoring: {}", if info.confidence_scoring { "on" } else { "off" });

    let cache = &info.cache;
    if cache.enabled {
        println!(
            "Cache: {}/{} entries, hit rate {:.1}% ({} hits, {} misses, {} evictions, {} expired)",
            cache.size,
            cache.max_size,
            cache.hit_rate * 100.0,
            cache.hits,
            cache.misses,
            cache.evictions,
            cache.ttl_expirations
        );
    } else {
        println!("Cache: off");
    }

    let metrics = &info.metrics;
    match (&metrics.overview, &metrics.latency) {
        (Some(overview), latency) => {
            println!(
                "Queries: {} ({} ok, {} failed, {:.1}% success)",
                overview.total_queries,
                overview.successful,
                overview.failed,
                overview.success_rate * 100.0
            );
            if let Some(l) = latency {
                println!("Latency: avg {:.3}s, median {:.3}s, max {:.3}s", l.average, l.median, l.max);
            }
            for (name, stats) in &metrics.components {
                println!("  {name}: mean {:.3}s over {} samples", stats.mean, stats.samples);
            }
            for (kind, count) in &metrics.errors {
                println!("  errors[{kind}]: {count}");
            }
        }
        (None, _) => println!("Metrics: off"),
    }
}

fn chat(qa: &QaPipeline) -> Result<()> {
    println!("Ask about your equipment. Type 'quit' to leave, 'stats' for an overview.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\n> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let question = line?;
        let question = question.trim();
        match question.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "stats" => print_stats(qa),
            _ => {
                let response = qa.answer_query(question, false);
                print_response(&response);
            }
        }
    }
    println!("Goodbye.");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let settings = load_settings(cli.env.as_deref())?;
    let data_dir = expand_path(&settings.data_dir);
    let qa = build_pipeline(&settings)?;

    match cli.command {
        Command::Ingest { dir, limit } => {
            let dir = dir.unwrap_or(data_dir);
            let report = ingest_with_progress(&qa, &dir, limit)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Ask { question, verbose, json } => {
            ingest_with_progress(&qa, &data_dir, None)?;
            let response = qa.answer_query(&question, verbose);
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
            if response.status == QueryStatus::Error {
                std::process::exit(1);
            }
        }
        Command::Chat => {
            ingest_with_progress(&qa, &data_dir, None)?;
            chat(&qa)?;
        }
        Command::Stats { json } => {
            ingest_with_progress(&qa, &data_dir, None)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&qa.system_info())?);
            } else {
                print_stats(&qa);
            }
        }
    }
    Ok(())
}
