use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use semkv_core::config::{Config, Settings};
use semkv_core::kv::KvStore;
use semkv_core::loader::DocumentLoader;
use semkv_search::SearchEngine;

const USAGE: &str = "Usage: semkv <command> [args...]

Commands:
  ingest [dir]              embed and store every document under dir
  query <text> [--top N]    print the closest stored document(s)
  run [dir] <text>          ingest dir, then query";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let (cmd, args) = parse_args();
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;
    let base = env::current_dir()?;
    tracing::debug!(env = config.env_name(), ?settings, "configuration loaded");

    match cmd.as_str() {
        "ingest" => {
            let dir = data_dir(&settings, &base, args.first());
            let engine = semkv_search::open(&settings, &base)?.with_progress(true);
            ingest(&engine, &settings, &dir)?;
        }
        "query" => {
            let (text, top) = parse_query_args(&args)?;
            let engine = semkv_search::open(&settings, &base)?;
            match top {
                Some(k) => {
                    let ranked = engine.query_top_k(&text, k)?;
                    if ranked.is_empty() {
                        println!("no match");
                    }
                    for (i, c) in ranked.iter().enumerate() {
                        println!("{}. score={:.4}  key={}", i + 1, c.score, c.key);
                        println!("   {}", c.text);
                    }
                }
                None => print_best(&engine, &text)?,
            }
        }
        "run" => {
            let (dir, text) = match args.as_slice() {
                [text] => (data_dir(&settings, &base, None), text.clone()),
                [dir, text] => (data_dir(&settings, &base, Some(dir)), text.clone()),
                _ => anyhow::bail!("usage: semkv run [dir] <text>"),
            };
            let engine = semkv_search::open(&settings, &base)?.with_progress(true);
            ingest(&engine, &settings, &dir)?;
            print_best(&engine, &text)?;
        }
        "-h" | "--help" | "help" => println!("{USAGE}"),
        _ => {
            eprintln!("Unknown command: {cmd}\n\n{USAGE}");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn data_dir(settings: &Settings, base: &Path, arg: Option<&String>) -> PathBuf {
    match arg {
        Some(dir) => semkv_core::config::resolve_with_base(base, dir),
        None => settings.data_dir_path(base),
    }
}

fn parse_query_args(args: &[String]) -> anyhow::Result<(String, Option<usize>)> {
    let mut text = None;
    let mut top = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top" => {
                let n = args.get(i + 1).context("--top requires a number")?;
                top = Some(n.parse::<usize>().with_context(|| format!("--top expects a number, got {n:?}"))?);
                i += 1;
            }
            other if text.is_none() => text = Some(other.to_string()),
            other => anyhow::bail!("unexpected argument {other:?}"),
        }
        i += 1;
    }
    let text = text.context("usage: semkv query <text> [--top N]")?;
    Ok((text, top))
}

fn ingest<K: KvStore>(engine: &SearchEngine<K>, settings: &Settings, dir: &Path) -> anyhow::Result<()> {
    println!("Ingesting from {}", dir.display());
    let loader = DocumentLoader::new().with_extension(settings.file_extension.clone());
    let report = engine.ingest_directory(&loader, dir)?;
    println!("Stored {} document(s), {} failed", report.stored.len(), report.failed.len());
    for failure in &report.failed {
        eprintln!("  {}: {}", failure.source, failure.error);
    }
    Ok(())
}

fn print_best<K: KvStore>(engine: &SearchEngine<K>, text: &str) -> anyhow::Result<()> {
    match engine.query(text)? {
        Some(best) => {
            println!("Best match (score={:.4}, key={}):", best.score, best.key);
            println!("{}", best.text);
        }
        None => println!("no match"),
    }
    Ok(())
}
