use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ctxrag_core::chunking::ChunkingConfig;
use ctxrag_core::config::{resolve_with_base, Config, EngineSettings, IdfScheme};
use ctxrag_core::corpus::{CorpusFormat, CorpusSettings};
use ctxrag_text::extract::preview;
use ctxrag_text::ContextEngine;

#[derive(Parser)]
#[command(name = "ctxrag")]
#[command(about = "Answer questions from a local corpus with TF-IDF retrieval")]
struct Cli {
    /// Corpus file or directory; overrides `engine.corpus.path`.
    #[arg(long, global = true, env = "CTXRAG_CORPUS")]
    corpus: Option<String>,
    /// Corpus format: text, records, flattened_records or directory.
    #[arg(long, global = true, value_parser = parse_format)]
    format: Option<CorpusFormat>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Retrieve context for a query and print the extracted section.
    Ask {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        max_context_chars: Option<usize>,
        /// Print scores and snippets of the retrieved chunks as JSON.
        #[arg(long)]
        debug: bool,
        /// Also print up to N relevant sentences per retrieved chunk.
        #[arg(long, value_name = "N")]
        highlights: Option<usize>,
    },
    /// Print chunk previews in corpus order.
    Chunks {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print index statistics.
    Stats,
}

fn parse_format(s: &str) -> Result<CorpusFormat, String> {
    match s {
        "text" => Ok(CorpusFormat::Text),
        "records" => Ok(CorpusFormat::Records),
        "flattened_records" => Ok(CorpusFormat::FlattenedRecords),
        "directory" => Ok(CorpusFormat::Directory),
        other => Err(format!("unknown corpus format '{other}'")),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CTXRAG_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// `[engine]` from config with the command-line corpus applied on top.
fn engine_settings(config: &Config, base: &Path, cli: &Cli) -> anyhow::Result<EngineSettings> {
    let mut settings = match (config.engine_settings(base), cli.corpus.as_deref()) {
        (Ok(settings), _) => settings,
        (Err(e), Some(_)) => {
            warn!(error = %e, "no usable [engine] config, using defaults");
            EngineSettings {
                corpus: CorpusSettings { path: PathBuf::new(), format: CorpusFormat::default() },
                chunking: ChunkingConfig::default(),
                idf: IdfScheme::default(),
            }
        }
        (Err(e), None) => return Err(e.context("no corpus configured; pass --corpus or set [engine.corpus] in config.toml")),
    };
    if let Some(path) = cli.corpus.as_deref() {
        settings.corpus.path = resolve_with_base(base, path);
    }
    if let Some(format) = cli.format {
        settings.corpus.format = format;
    }
    Ok(settings)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let base = env::current_dir().context("current directory")?;
    let settings = engine_settings(&config, &base, &cli)?;
    let answer_settings = config.answer_settings()?;
    let engine = ContextEngine::from_settings(&settings)
        .and_then(|engine| engine.with_answer_settings(&answer_settings))
        .with_context(|| format!("building engine from {}", settings.corpus.path.display()))?;

    match cli.cmd {
        Command::Ask { query, top_k, max_context_chars, debug, highlights } => {
            let top_k = top_k.unwrap_or(answer_settings.top_k);
            let max_context_chars = max_context_chars.unwrap_or(answer_settings.max_context_chars);
            let answer = engine.generate_answer(&query, top_k, max_context_chars, debug);
            println!("🔍 Query: {}", query);
            println!("📝 Answer ({:?}):\n{}", answer.outcome, answer.answer);
            if let Some(trace) = answer.debug_json() {
                println!("🐞 Debug: {}", trace);
            }
            if let Some(max_sentences) = highlights {
                for highlight in engine.highlights(&query, top_k, max_sentences) {
                    println!("  [{}] score={:.4}", highlight.id, highlight.score);
                    for sentence in &highlight.sentences {
                        println!("    - {}", sentence);
                    }
                }
            }
        }
        Command::Chunks { limit } => {
            let limit = limit.unwrap_or(usize::MAX);
            for chunk in engine.chunks().iter().take(limit) {
                println!("[{}] {}", chunk.id, preview(&chunk.text, answer_settings.preview_chars).replace('\n', " "));
            }
        }
        Command::Stats => {
            let stats = engine.stats();
            println!("📊 Corpus: {} ({:?})", settings.corpus.path.display(), settings.corpus.format);
            println!("  chunks: {}", stats.chunks);
            println!("  vocabulary: {}", stats.vocabulary);
            println!("  avg tokens per chunk: {:.1}", stats.avg_tokens_per_chunk);
            println!("  idf: {:?}", stats.idf_scheme);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_flag_overrides_config() {
        let config = Config::from_toml_str(
            r#"
            [engine.corpus]
            path = "rag.json"
            format = "records"
            "#,
        );
        let cli = Cli::try_parse_from(["ctxrag", "--corpus", "notes", "--format", "directory", "stats"]).unwrap();
        let settings = engine_settings(&config, Path::new("/srv"), &cli).unwrap();
        assert_eq!(settings.corpus.path, PathBuf::from("/srv/notes"));
        assert_eq!(settings.corpus.format, CorpusFormat::Directory);
    }

    #[test]
    fn corpus_is_read_from_env() {
        env::set_var("CTXRAG_CORPUS", "/data/context.txt");
        let cli = Cli::try_parse_from(["ctxrag", "--format", "text", "ask", "heartbleed"]).unwrap();
        env::remove_var("CTXRAG_CORPUS");
        assert_eq!(cli.corpus.as_deref(), Some("/data/context.txt"));

        let settings = engine_settings(&Config::from_toml_str(""), Path::new("/srv"), &cli).unwrap();
        assert_eq!(settings.corpus.path, PathBuf::from("/data/context.txt"));
        assert_eq!(settings.corpus.format, CorpusFormat::Text);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["ctxrag", "--format", "yaml", "stats"]).is_err());
    }
}
