//! Engine setup helpers.

use strata::{Edit, EditOutcome, Engine, EngineConfig, LanguageId, Span};

/// An engine with `text` opened, parsing on the calling thread.
pub fn engine_from(language: LanguageId, text: &str) -> Engine {
    engine_with(language, EngineConfig::default().with_parallel(false), text)
}

pub fn engine_with(language: LanguageId, config: EngineConfig, text: &str) -> Engine {
    let mut engine = Engine::new(language, config);
    engine
        .open(text)
        .unwrap_or_else(|e| panic!("opening {text:?} failed: {e}"));
    engine
}

pub fn json(text: &str) -> Engine {
    engine_from(LanguageId::Json, text)
}

pub fn curly(text: &str) -> Engine {
    engine_from(LanguageId::Curly, text)
}

/// Replace `[start, end)` with `insert` at the engine's current generation.
pub fn edit(engine: &mut Engine, start: u32, end: u32, insert: &str) -> EditOutcome {
    let generation = engine.generation();
    engine
        .apply_edit(Edit::new(Span::new(start, end), insert, generation))
        .unwrap_or_else(|e| panic!("edit {start}..{end} -> {insert:?} failed: {e}"))
}

/// Concatenated text of every token, trivia included.
pub fn token_text(engine: &Engine) -> String {
    engine
        .tokens()
        .iter()
        .map(|t| t.text(engine.text()))
        .collect()
}
