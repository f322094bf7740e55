use std::path::Path;

use serde::Serialize;
use tracing::info;

use ctxrag_core::chunking::{ChunkBuilder, ChunkingConfig};
use ctxrag_core::config::{AnswerSettings, EngineSettings, IdfScheme};
use ctxrag_core::corpus::{self, CorpusSettings, Record};
use ctxrag_core::error::Result;
use ctxrag_core::traits::Retriever;
use ctxrag_core::types::{Answer, Chunk, ChunkId, SearchHit};

use crate::extract::AnswerExtractor;
use crate::highlight::relevant_sentences;
use crate::index::{Index, IndexStats};
use crate::search::Ranker;

/// Relevant sentences of one retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub id: ChunkId,
    pub score: f64,
    pub sentences: Vec<String>,
}

/// A corpus indexed once and queried read-only.
///
/// Every constructor builds the full index before returning, so a value of
/// this type is always complete. Queries never mutate it and it can be
/// shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ContextEngine {
    chunks: Vec<Chunk>,
    ranker: Ranker,
    extractor: AnswerExtractor,
}

impl ContextEngine {
    /// Indexes prepared chunks. Ids are renumbered to corpus positions.
    pub fn from_chunks(mut chunks: Vec<Chunk>, scheme: IdfScheme) -> Self {
        for (position, chunk) in chunks.iter_mut().enumerate() {
            chunk.id = position;
        }
        let index = Index::build(&chunks, scheme);
        let stats = index.stats();
        info!(chunks = stats.chunks, vocabulary = stats.vocabulary, idf = ?scheme, "index built");
        let ranker = Ranker::new(index, &chunks);
        Self { chunks, ranker, extractor: AnswerExtractor::default() }
    }

    pub fn from_text(text: &str, chunking: ChunkingConfig, scheme: IdfScheme) -> Result<Self> {
        let builder = ChunkBuilder::new(chunking)?;
        Ok(Self::from_chunks(builder.build_text(text), scheme))
    }

    pub fn from_text_file(path: &Path, chunking: ChunkingConfig, scheme: IdfScheme) -> Result<Self> {
        let text = corpus::read_text(path)?;
        Self::from_text(&text, chunking, scheme)
    }

    /// One chunk per record.
    pub fn from_records(records: &[Record], scheme: IdfScheme) -> Self {
        Self::from_chunks(ChunkBuilder::default().build_records(records), scheme)
    }

    /// One chunk per element of the JSON array stored at `path`.
    pub fn from_json_file(path: &Path, scheme: IdfScheme) -> Result<Self> {
        let records = corpus::read_records(path)?;
        Ok(Self::from_records(&records, scheme))
    }

    pub fn from_corpus(corpus: &CorpusSettings, chunking: ChunkingConfig, scheme: IdfScheme) -> Result<Self> {
        let builder = ChunkBuilder::new(chunking)?;
        let chunks = corpus::load_chunks(corpus, &builder)?;
        Ok(Self::from_chunks(chunks, scheme))
    }

    pub fn from_settings(settings: &EngineSettings) -> Result<Self> {
        Self::from_corpus(&settings.corpus, settings.chunking.clone(), settings.idf)
    }

    /// Replaces the extraction markers and preview length.
    pub fn with_answer_settings(mut self, settings: &AnswerSettings) -> Result<Self> {
        self.extractor = AnswerExtractor::new(settings)?;
        Ok(self)
    }

    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    pub fn index(&self) -> &Index { self.ranker.index() }

    pub fn stats(&self) -> IndexStats { self.index().stats() }

    /// Ranked chunks with their cosine similarity to `query`.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<(&Chunk, f64)> {
        self.ranker
            .rank(query, top_k)
            .into_iter()
            .filter_map(|hit| self.chunks.get(hit.id).map(|chunk| (chunk, hit.score)))
            .collect()
    }

    pub fn generate_answer(&self, query: &str, top_k: usize, max_context_chars: usize, want_debug: bool) -> Answer {
        self.extractor.generate_answer(self, query, top_k, max_context_chars, want_debug)
    }

    /// Up to `max_sentences` query-relevant sentences from each ranked chunk.
    pub fn highlights(&self, query: &str, top_k: usize, max_sentences: usize) -> Vec<Highlight> {
        self.retrieve(query, top_k)
            .into_iter()
            .map(|(chunk, score)| Highlight {
                id: chunk.id,
                score,
                sentences: relevant_sentences(&chunk.text, query, max_sentences),
            })
            .collect()
    }
}

impl Retriever for ContextEngine {
    fn retrieve(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        self.ranker.rank(query, top_k)
    }

    fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxrag_core::chunking::ChunkMode;
    use ctxrag_core::corpus::ExploitBlock;
    use ctxrag_core::types::AnswerOutcome;

    fn record(cve: &str, description: &str, exploit: &str, note: &str) -> Record {
        Record {
            cve_id: cve.to_string(),
            short_description: description.to_string(),
            exploit_example: ExploitBlock { code: exploit.to_string(), note: note.to_string(), ..ExploitBlock::default() },
            ..Record::default()
        }
    }

    #[test]
    fn record_answer_excludes_note() {
        let engine = ContextEngine::from_records(&[record("CVE-1", "heartbleed leak", "EXPLOIT_TEXT", "note")], IdfScheme::Smoothed);
        let answer = engine.generate_answer("heartbleed", 1, 1000, false);
        assert_eq!(answer.outcome, AnswerOutcome::Extracted);
        assert_eq!(answer.answer, "EXPLOIT_TEXT");
    }

    #[test]
    fn picks_matching_record() {
        let engine = ContextEngine::from_records(
            &[
                record("CVE-2016-10033", "phpmailer mail injection", "mail_poc()", ""),
                record("CVE-2014-0160", "openssl heartbleed", "heartbeat_poc()", "lab"),
            ],
            IdfScheme::Bm25,
        );
        let answer = engine.generate_answer("CVE-2014-0160 heartbleed", 1, 1000, true);
        assert_eq!(answer.answer, "heartbeat_poc()");
        let trace = answer.debug.unwrap();
        assert_eq!(trace.scores.len(), 1);
        assert!(trace.scores[0].snippet.starts_with("CVE: CVE-2014-0160"));
    }

    #[test]
    fn paragraph_text_without_marker() {
        let chunking = ChunkingConfig { mode: ChunkMode::Paragraph, max_chunk_chars: 800, overlap_chars: 100 };
        let engine = ContextEngine::from_text("alpha beta\n\ngamma delta", chunking, IdfScheme::Smoothed).unwrap();
        assert_eq!(engine.chunks().len(), 2);
        let answer = engine.generate_answer("gamma", 5, 1000, true);
        assert_eq!(answer.outcome, AnswerOutcome::NoSection);
        assert!(answer.context.is_empty());
    }

    #[test]
    fn from_chunks_renumbers() {
        let engine = ContextEngine::from_chunks(vec![Chunk::new(7, "a"), Chunk::new(9, "b")], IdfScheme::Smoothed);
        let ids: Vec<usize> = engine.chunks().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1]);
        let hits = engine.retrieve("b", 1);
        assert_eq!(hits[0].0.text, "b");
    }

    #[test]
    fn empty_corpus_answers_no_context() {
        let engine = ContextEngine::from_records(&[], IdfScheme::Smoothed);
        assert_eq!(engine.stats().chunks, 0);
        assert_eq!(engine.generate_answer("anything", 3, 100, false).outcome, AnswerOutcome::NoContext);
    }

    #[test]
    fn highlights_follow_ranking() {
        let text = "Heartbleed leaks memory. It was bad.\n\nPHPMailer allows injection.";
        let engine = ContextEngine::from_text(text, ChunkingConfig::default(), IdfScheme::Smoothed).unwrap();
        let highlights = engine.highlights("heartbleed memory", 3, 1);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].sentences, vec!["Heartbleed leaks memory."]);
    }
}
