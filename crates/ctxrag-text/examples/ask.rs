use std::env;
use std::path::{Path, PathBuf};

use ctxrag_core::config::IdfScheme;

// Answer one query from a JSON record corpus and print the ranked chunks.
// Usage:
//   cargo run -p ctxrag-text --example ask -- "your query" \
//     [--corpus test_data/rag.json] [--top-k 5] [--bm25]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: cargo run -p ctxrag-text --example ask -- <query> [--corpus FILE] [--top-k N] [--bm25]");
        std::process::exit(1);
    }
    let mut query = String::new();
    let mut corpus: Option<PathBuf> = None;
    let mut top_k: usize = 5;
    let mut scheme = IdfScheme::Smoothed;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--corpus" => {
                if i + 1 >= args.len() { eprintln!("--corpus requires a path"); std::process::exit(2); }
                corpus = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "--top-k" => {
                if i + 1 >= args.len() { eprintln!("--top-k requires a number"); std::process::exit(2); }
                top_k = args[i + 1].parse().unwrap_or(top_k);
                i += 2; continue;
            }
            "--bm25" => { scheme = IdfScheme::Bm25; i += 1; continue; }
            s if s.starts_with("-") => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            s => {
                if query.is_empty() { query = s.to_string(); }
                i += 1; continue;
            }
        }
    }

    // flag > CTXRAG_CORPUS > workspace test data
    let corpus = if let Some(path) = corpus {
        path
    } else if let Ok(env_path) = env::var("CTXRAG_CORPUS") {
        PathBuf::from(env_path)
    } else {
        let base = Path::new(env!("CARGO_MANIFEST_DIR"))
            .ancestors().nth(2)
            .unwrap_or(Path::new("."));
        base.join("test_data/rag.json")
    };

    println!("TF-IDF context\n==============");
    println!("Corpus: {}", corpus.display());
    println!("Query: {} (top {})\n", query, top_k);

    let engine = ctxrag_text::ContextEngine::from_json_file(&corpus, scheme)?;
    for (i, (chunk, score)) in engine.retrieve(&query, top_k).iter().enumerate() {
        println!("{:>2}. score={:.4} id={}\n    snippet: {}",
            i + 1, score, chunk.id, ctxrag_text::extract::preview(&chunk.text, 80).replace('\n', " "));
    }

    let answer = engine.generate_answer(&query, top_k, 1500, false);
    println!("\n{:?}:\n{}", answer.outcome, answer.answer);
    Ok(())
}
