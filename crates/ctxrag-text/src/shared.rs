//! Process-wide engine handle.
//!
//! The engine is built on first use under one initialization lock, so
//! concurrent first callers trigger a single build. `reload` builds a
//! replacement off to the side and swaps the `Arc`; queries that already hold
//! the previous engine finish on it.
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::info;

use ctxrag_core::config::{AnswerSettings, EngineSettings};
use ctxrag_core::error::Result;

use crate::engine::ContextEngine;

pub struct SharedEngine {
    settings: EngineSettings,
    answer: AnswerSettings,
    current: RwLock<Option<Arc<ContextEngine>>>,
    init: Mutex<()>,
}

impl SharedEngine {
    pub fn new(settings: EngineSettings, answer: AnswerSettings) -> Self {
        Self { settings, answer, current: RwLock::new(None), init: Mutex::new(()) }
    }

    /// The current engine, building it if this is the first call. A failed
    /// build leaves the handle empty so a later call can retry.
    pub fn get(&self) -> Result<Arc<ContextEngine>> {
        if let Some(engine) = self.peek() {
            return Ok(engine);
        }
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(engine) = self.peek() {
            return Ok(engine);
        }
        let engine = Arc::new(self.build()?);
        self.install(Arc::clone(&engine));
        Ok(engine)
    }

    /// The current engine without building one.
    pub fn peek(&self) -> Option<Arc<ContextEngine>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Rebuilds from the same settings and swaps the new engine in. On error
    /// the previous engine stays installed.
    pub fn reload(&self) -> Result<Arc<ContextEngine>> {
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        let engine = Arc::new(self.build()?);
        self.install(Arc::clone(&engine));
        info!("engine reloaded");
        Ok(engine)
    }

    fn build(&self) -> Result<ContextEngine> {
        ContextEngine::from_settings(&self.settings)?.with_answer_settings(&self.answer)
    }

    fn install(&self, engine: Arc<ContextEngine>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(engine);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::thread;

    use ctxrag_core::chunking::ChunkingConfig;
    use ctxrag_core::config::IdfScheme;
    use ctxrag_core::corpus::{CorpusFormat, CorpusSettings};
    use ctxrag_core::error::Error;

    fn settings(path: PathBuf) -> EngineSettings {
        EngineSettings {
            corpus: CorpusSettings { path, format: CorpusFormat::Text },
            chunking: ChunkingConfig::default(),
            idf: IdfScheme::Smoothed,
        }
    }

    #[test]
    fn concurrent_first_calls_share_one_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.txt");
        std::fs::write(&path, "alpha\n\nbeta").unwrap();
        let shared = Arc::new(SharedEngine::new(settings(path), AnswerSettings::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || shared.get().unwrap())
            })
            .collect();
        let engines: Vec<Arc<ContextEngine>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(engines.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(engines[0].chunks().len(), 2);
    }

    #[test]
    fn failed_build_leaves_handle_empty() {
        let shared = SharedEngine::new(settings(PathBuf::from("/no/such/context.txt")), AnswerSettings::default());
        assert!(matches!(shared.get(), Err(Error::CorpusNotFound(_))));
        assert!(shared.peek().is_none());
    }

    #[test]
    fn reload_swaps_and_keeps_old_instance_alive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.txt");
        std::fs::write(&path, "alpha").unwrap();
        let shared = SharedEngine::new(settings(path.clone()), AnswerSettings::default());
        let old = shared.get().unwrap();

        std::fs::write(&path, "alpha\n\nbeta\n\ngamma").unwrap();
        let new = shared.reload().unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(old.chunks().len(), 1);
        assert_eq!(shared.get().unwrap().chunks().len(), 3);

        std::fs::remove_file(&path).unwrap();
        assert!(shared.reload().is_err());
        assert!(Arc::ptr_eq(&shared.get().unwrap(), &new));
    }
}
