//! Marker-delimited answer extraction.
//!
//! Only text after the start marker is ever returned. Chunks without the
//! marker still appear in the debug trace but contribute nothing.
use tracing::debug;

use ctxrag_core::config::AnswerSettings;
use ctxrag_core::error::Result;
use ctxrag_core::traits::Retriever;
use ctxrag_core::types::{Answer, AnswerOutcome, DebugTrace, TraceEntry};

pub const NO_CONTEXT_MESSAGE: &str = "Не удалось найти релевантный контекст для ответа.";
pub const NO_SECTION_MESSAGE: &str = "Контекст найден, но в нём нет секции после требуемого маркера.";
pub const BUDGET_EXHAUSTED_MESSAGE: &str = "Контекст найден, но не удалось извлечь нужный фрагмент.";

const SPAN_SEPARATOR: &str = "\n\n";
const SEPARATOR_CHARS: usize = 2;

#[derive(Debug, Clone)]
pub struct AnswerExtractor {
    start_marker: String,
    end_markers: Vec<String>,
    preview_chars: usize,
}

impl Default for AnswerExtractor {
    fn default() -> Self {
        let settings = AnswerSettings::default();
        Self {
            start_marker: settings.start_marker,
            end_markers: settings.end_markers,
            preview_chars: settings.preview_chars,
        }
    }
}

impl AnswerExtractor {
    pub fn new(settings: &AnswerSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            start_marker: settings.start_marker.clone(),
            end_markers: settings.end_markers.clone(),
            preview_chars: settings.preview_chars,
        })
    }

    /// The text after the first start marker, with leading spaces and line
    /// breaks removed, cut at the nearest end marker. `None` when the marker
    /// is missing or nothing follows it.
    pub fn extract_section<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = text.find(&self.start_marker)? + self.start_marker.len();
        let tail = text[start..].trim_start_matches(|c: char| matches!(c, '\n' | '\r' | ' '));
        let section = match self.end_markers.iter().filter_map(|m| tail.find(m.as_str())).min() {
            Some(cut) => tail[..cut].trim_end(),
            None => tail,
        };
        (!section.is_empty()).then_some(section)
    }

    pub fn generate_answer<R>(
        &self,
        retriever: &R,
        query: &str,
        top_k: usize,
        max_context_chars: usize,
        want_debug: bool,
    ) -> Answer
    where
        R: Retriever + ?Sized,
    {
        let hits = retriever.retrieve(query, top_k);
        if hits.is_empty() {
            debug!(query, "no chunk overlaps the query");
            return terminal(AnswerOutcome::NoContext, NO_CONTEXT_MESSAGE, want_debug.then(DebugTrace::default));
        }

        let mut trace = DebugTrace::default();
        let mut spans = Vec::new();
        for hit in &hits {
            let Some(chunk) = retriever.chunk(hit.id) else { continue };
            trace.scores.push(TraceEntry {
                score: round4(hit.score),
                snippet: preview(&chunk.text, self.preview_chars),
            });
            if let Some(span) = self.extract_section(&chunk.text) {
                spans.push(span);
            }
        }
        let debug_trace = want_debug.then_some(trace);

        if spans.is_empty() {
            debug!(hits = hits.len(), "no hit contains the start marker");
            return terminal(AnswerOutcome::NoSection, NO_SECTION_MESSAGE, debug_trace);
        }

        let context = assemble_context(&spans, max_context_chars);
        let excerpt = context.trim();
        if excerpt.is_empty() {
            debug!(max_context_chars, "budget left no room for any section");
            return Answer {
                outcome: AnswerOutcome::BudgetExhausted,
                answer: BUDGET_EXHAUSTED_MESSAGE.to_string(),
                context: BUDGET_EXHAUSTED_MESSAGE.to_string(),
                debug: debug_trace,
            };
        }

        debug!(hits = hits.len(), spans = spans.len(), chars = excerpt.chars().count(), "answer extracted");
        Answer {
            outcome: AnswerOutcome::Extracted,
            answer: excerpt.to_string(),
            context: excerpt.to_string(),
            debug: debug_trace,
        }
    }
}

fn terminal(outcome: AnswerOutcome, message: &str, debug: Option<DebugTrace>) -> Answer {
    Answer { outcome, answer: message.to_string(), context: String::new(), debug }
}

fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

/// The first `max_chars` characters of `text`, with `...` appended when
/// anything was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

/// Joins spans with blank lines within `max_context_chars` characters. Each
/// span reserves room for its separator; the first span that does not fit is
/// cut to the remaining room and nothing after it is kept.
pub fn assemble_context(spans: &[&str], max_context_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0usize;
    for span in spans {
        let len = span.chars().count();
        if used + len + SEPARATOR_CHARS > max_context_chars {
            let remaining = max_context_chars.saturating_sub(used + SEPARATOR_CHARS);
            context.extend(span.chars().take(remaining));
            break;
        }
        context.push_str(span);
        context.push_str(SPAN_SEPARATOR);
        used += len + SEPARATOR_CHARS;
    }
    context
}
