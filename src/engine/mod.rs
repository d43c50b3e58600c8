//! The incremental pipeline behind one buffer.
//!
//! ```text
//!   Edit ──► TokenStore ──► TokenDelta ──► StructuralParser ──► StructuralDelta
//!                                                                    │
//!   subscribers ◄── broadcast ◄── FactIndex::apply_delta ◄── FactDelta ◄── DetailedParser
//!                                          │
//!                                          └──► QueryCache::advance
//! ```
//!
//! Layers run in dependency order per edit, and the fact index only ever
//! changes through the delta the detailed parser produces. Queries read an
//! index snapshot through the query cache and never touch the parsers.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = Engine::new(LanguageId::Json, EngineConfig::default());
//! engine.open(r#"{"a": 1}"#)?;
//!
//! let edit = Edit::new(Span::new(6, 7), "12", engine.generation());
//! let outcome = engine.apply_edit(edit)?;
//! assert_eq!(outcome.facts.removed.len(), 1);
//! ```

mod config;

pub use config::EngineConfig;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::base::{BoundaryId, EditMap, FactId, Generation, IdAllocator, LineIndex, Span};
use crate::detail::{DetailedParser, ParseInput, ViewportParse};
use crate::fact::{Fact, FactDelta};
use crate::grammar::{Grammar, LanguageId, grammar_for};
use crate::index::{CacheStats, FactIndex, IndexError, IndexSnapshot, Query, QueryCache};
use crate::lexer::{Token, TokenDelta, TokenStore};
use crate::structure::{ParseBoundary, StructuralDelta, StructuralParser};

/// A text change: replace `range` with `new_text`.
///
/// `generation` is the generation the edit was computed against; an edit
/// based on anything but the engine's current generation is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Span,
    pub new_text: String,
    pub generation: Generation,
}

impl Edit {
    pub fn new(range: Span, new_text: impl Into<String>, generation: Generation) -> Self {
        Self {
            range,
            new_text: new_text.into(),
            generation,
        }
    }

    pub fn insert(offset: u32, text: impl Into<String>, generation: Generation) -> Self {
        Self::new(Span::empty(offset), text, generation)
    }

    pub fn delete(range: Span, generation: Generation) -> Self {
        Self::new(range, String::new(), generation)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("edit is based on {edit}, the buffer is at {current}")]
    StaleEdit {
        edit: Generation,
        current: Generation,
    },
    #[error("edit range {range:?} exceeds the buffer length {len}")]
    OutOfBounds { range: Span, len: usize },
    #[error("edit range {range:?} does not fall on character boundaries")]
    NotCharBoundary { range: Span },
    #[error("buffer of {len} bytes exceeds the 4 GiB offset space")]
    TooLarge { len: usize },
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Everything one accepted edit changed, layer by layer.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub generation: Generation,
    pub tokens: TokenDelta,
    pub structure: StructuralDelta,
    pub facts: Arc<FactDelta>,
    /// Boundaries left with placeholder facts, to be finished by
    /// [`Engine::parse_deferred`] or a viewport change.
    pub deferred: Vec<BoundaryId>,
}

/// One buffer and the three parsing layers, fact index and query cache
/// derived from it.
#[derive(Debug)]
pub struct Engine {
    language: LanguageId,
    grammar: &'static dyn Grammar,
    config: EngineConfig,
    alloc: Arc<IdAllocator>,
    text: String,
    tokens: TokenStore,
    structure: StructuralParser,
    detail: DetailedParser,
    index: FactIndex,
    cache: QueryCache,
    events: broadcast::Sender<Arc<FactDelta>>,
}

impl Engine {
    pub fn new(language: LanguageId, config: EngineConfig) -> Self {
        Self::with_allocator(language, config, Arc::new(IdAllocator::new()))
    }

    /// An engine drawing ids and generations from a shared allocator.
    pub fn with_allocator(
        language: LanguageId,
        config: EngineConfig,
        alloc: Arc<IdAllocator>,
    ) -> Self {
        let grammar = grammar_for(language);
        let (events, _) = broadcast::channel(config.subscriber_capacity.max(1));
        Self {
            language,
            grammar,
            tokens: TokenStore::new(grammar, alloc.clone()),
            structure: StructuralParser::new(grammar, alloc.clone(), config.max_depth),
            detail: DetailedParser::new(grammar, alloc.clone(), config.detail_limits()),
            index: FactIndex::new(alloc.clone()),
            cache: QueryCache::new(config.query_cache_capacity).with_ttl(config.query_cache_ttl),
            text: String::new(),
            alloc,
            config,
            events,
        }
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn grammar(&self) -> &'static dyn Grammar {
        self.grammar
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn generation(&self) -> Generation {
        self.index.generation()
    }

    pub fn tokens(&self) -> &[Token] {
        self.tokens.tokens()
    }

    pub fn boundaries(&self) -> &[ParseBoundary] {
        self.structure.boundaries()
    }

    pub fn line_index(&self) -> LineIndex {
        LineIndex::new(&self.text)
    }

    pub fn viewport(&self) -> Option<Span> {
        self.config.viewport
    }

    /// Boundaries still carrying placeholder facts.
    pub fn deferred(&self) -> Vec<BoundaryId> {
        self.detail.deferred().collect()
    }

    /// Replace the whole buffer: one edit spanning everything.
    pub fn open(&mut self, text: &str) -> Result<EditOutcome, EngineError> {
        let edit = Edit::new(
            Span::new(0, self.text.len() as u32),
            text,
            self.generation(),
        );
        self.apply_edit(edit)
    }

    /// Run one edit through every layer and apply the resulting fact delta.
    ///
    /// A no-op edit runs the pipeline, yields empty deltas and leaves the
    /// generation where it was. When the index rejects the delta the edit is
    /// undone and the buffer is rebuilt at a new generation before the error
    /// is returned.
    pub fn apply_edit(&mut self, edit: Edit) -> Result<EditOutcome, EngineError> {
        let current = self.generation();
        self.validate(&edit, current)?;

        let map = EditMap::new(edit.range, edit.new_text.len() as u32);
        let generation = if map.is_noop() {
            current
        } else {
            self.alloc.next_generation()
        };

        let replaced = self.text[edit.range.start as usize..edit.range.end as usize].to_owned();
        self.text
            .replace_range(edit.range.start as usize..edit.range.end as usize, &edit.new_text);
        let tokens = self.tokens.apply_edit(map, &self.text);
        let structure = self
            .structure
            .apply(&tokens, self.tokens.tokens(), &self.text);
        let parse = self.detail.parse_viewport(ParseInput {
            source: &self.text,
            tokens: self.tokens.tokens(),
            boundaries: self.structure.boundaries(),
            structure: &structure,
            affected: tokens.affected,
            viewport: self.config.viewport,
            generation,
            cancel: None,
        });

        debug!(
            %generation,
            range = ?edit.range,
            inserted = edit.new_text.len(),
            tokens_removed = tokens.removed.len(),
            tokens_added = tokens.added.len(),
            boundaries_removed = structure.removed.len(),
            boundaries_added = structure.added.len(),
            "edit"
        );

        let deferred = parse.deferred.clone();
        let facts = match self.commit(current, parse) {
            Ok(facts) => facts,
            Err(err) => {
                let inserted = map.new_range();
                self.text
                    .replace_range(inserted.start as usize..inserted.end as usize, &replaced);
                warn!(%err, range = ?edit.range, "fact delta rejected, rebuilding the buffer");
                self.resync()?;
                return Err(err);
            }
        };
        Ok(EditOutcome {
            generation,
            tokens,
            structure,
            facts,
            deferred,
        })
    }

    /// Move the viewport and finish deferred boundaries inside it.
    pub fn set_viewport(&mut self, viewport: Option<Span>) -> Result<Arc<FactDelta>, EngineError> {
        self.config.viewport = viewport;
        match viewport {
            Some(span) => self.finish_deferred(Some(span), None),
            None => Ok(Arc::new(FactDelta::new(self.generation()))),
        }
    }

    /// Finish every deferred boundary. The delta lands at the current
    /// generation. Boundaries whose parse is cancelled stay deferred.
    pub fn parse_deferred(&mut self, cancel: &CancellationToken) -> Result<Arc<FactDelta>, EngineError> {
        self.finish_deferred(None, Some(cancel))
    }

    fn finish_deferred(
        &mut self,
        only: Option<Span>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Arc<FactDelta>, EngineError> {
        let current = self.generation();
        let unchanged = StructuralDelta::new(EditMap::new(Span::empty(0), 0));
        let parse = self.detail.parse_deferred(
            ParseInput {
                source: &self.text,
                tokens: self.tokens.tokens(),
                boundaries: self.structure.boundaries(),
                structure: &unchanged,
                affected: Span::empty(0),
                viewport: self.config.viewport,
                generation: current,
                cancel,
            },
            only,
        );
        self.commit(current, parse)
    }

    /// Rebuild every layer from the text and replace all live facts, at a
    /// fresh generation.
    fn resync(&mut self) -> Result<Arc<FactDelta>, EngineError> {
        let current = self.generation();
        self.tokens = TokenStore::new(self.grammar, self.alloc.clone());
        self.structure = StructuralParser::new(self.grammar, self.alloc.clone(), self.config.max_depth);
        self.detail.reset();

        let generation = self.alloc.next_generation();
        let map = EditMap::new(Span::empty(0), self.text.len() as u32);
        let tokens = self.tokens.apply_edit(map, &self.text);
        let structure = self
            .structure
            .apply(&tokens, self.tokens.tokens(), &self.text);
        let mut parse = self.detail.parse_viewport(ParseInput {
            source: &self.text,
            tokens: self.tokens.tokens(),
            boundaries: self.structure.boundaries(),
            structure: &structure,
            affected: tokens.affected,
            viewport: self.config.viewport,
            generation,
            cancel: None,
        });
        parse.delta.rebase = None;
        parse.delta.removed = self.index.snapshot().all_ids();
        self.commit(current, parse)
    }

    fn validate(&self, edit: &Edit, current: Generation) -> Result<(), EngineError> {
        if edit.generation != current {
            return Err(EngineError::StaleEdit {
                edit: edit.generation,
                current,
            });
        }
        let len = self.text.len();
        let (start, end) = (edit.range.start as usize, edit.range.end as usize);
        if end > len {
            return Err(EngineError::OutOfBounds {
                range: edit.range,
                len,
            });
        }
        if !self.text.is_char_boundary(start) || !self.text.is_char_boundary(end) {
            return Err(EngineError::NotCharBoundary { range: edit.range });
        }
        let new_len = len - (end - start) + edit.new_text.len();
        if u32::try_from(new_len).is_err() {
            return Err(EngineError::TooLarge { len: new_len });
        }
        Ok(())
    }

    fn commit(&mut self, previous: Generation, parse: ViewportParse) -> Result<Arc<FactDelta>, EngineError> {
        let facts = Arc::new(parse.delta);
        let footprint = self.index.apply_delta(&facts)?;
        self.cache.advance(previous, &footprint);
        if !facts.is_empty() {
            // No receivers is not an error.
            let _ = self.events.send(Arc::clone(&facts));
        }
        Ok(facts)
    }

    /// Receive every non-empty fact delta applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FactDelta>> {
        self.events.subscribe()
    }

    /// Answer a query against the current generation, through the cache.
    pub fn query(&self, query: &Query) -> Arc<[FactId]> {
        let snapshot = self.index.snapshot();
        let generation = snapshot.generation();
        if let Some(hit) = self.cache.get(query, generation) {
            return hit;
        }
        let results: Arc<[FactId]> = snapshot.query(query).into();
        self.cache.put(*query, Arc::clone(&results), generation);
        results
    }

    pub fn get_fact(&self, id: FactId) -> Option<Fact> {
        self.index.get(id)
    }

    pub fn hydrate(&self, ids: &[FactId]) -> Result<Vec<Fact>, EngineError> {
        Ok(self.index.hydrate(ids)?)
    }

    /// A consistent view of every fact at the current generation.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.index.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
