//! Rulesets shipped with the binary: the `user_id` retrofit of the sync
//! backend (`server.js`) and its client (`storage.ts`, `api.ts`).

use crate::config::{load_from_str, ConfigError};
use crate::retrofit::{ColumnRetrofit, TableAnchor};
use crate::ruleset::Ruleset;

const SERVER_ROUTES: &str = include_str!("server.toml");
const STORAGE: &str = include_str!("storage.toml");
const API: &str = include_str!("api.toml");

/// Names accepted by [`load`], in display order.
pub const NAMES: &[&str] = &["server", "storage", "api"];

/// Load a built-in ruleset by name.
///
/// Returns `Ok(None)` for an unknown name.
pub fn load(name: &str) -> Result<Option<Ruleset>, ConfigError> {
    match name {
        "server" => server().map(Some),
        "storage" => load_from_str(STORAGE).map(Some),
        "api" => load_from_str(API).map(Some),
        _ => Ok(None),
    }
}

/// Every built-in ruleset, paired with its name.
pub fn all() -> Result<Vec<(&'static str, Ruleset)>, ConfigError> {
    let mut out = Vec::with_capacity(NAMES.len());
    for name in NAMES {
        if let Some(ruleset) = load(name)? {
            out.push((*name, ruleset));
        }
    }
    Ok(out)
}

/// The `user_id` column as added to the backend tables.
pub fn user_id_retrofit() -> ColumnRetrofit {
    ColumnRetrofit::new("user_id", "user_id TEXT NOT NULL DEFAULT 'user_clement'")
        .table(
            TableAnchor::new("syntheses", "title TEXT NOT NULL").with_index_anchor(
                "CREATE INDEX IF NOT EXISTS idx_syntheses_date ON syntheses(date DESC);",
            ),
        )
        .table(
            TableAnchor::new("books", "title TEXT NOT NULL").with_index_anchor(
                "CREATE INDEX IF NOT EXISTS idx_books_created_at ON books(created_at DESC);",
            ),
        )
        .table(
            TableAnchor::new("book_notes", "book_id TEXT NOT NULL").with_index_anchor(
                "CREATE INDEX IF NOT EXISTS idx_book_notes_book_id ON book_notes(book_id);",
            ),
        )
        .table(
            TableAnchor::new("flashcards", "synthesis_id TEXT").with_index_anchor(
                "CREATE INDEX IF NOT EXISTS idx_flashcards_next_review ON flashcards(next_review);",
            ),
        )
}

/// Schema and index rules from [`user_id_retrofit`], followed by the route rules.
fn server() -> Result<Ruleset, ConfigError> {
    let mut ruleset = load_from_str(SERVER_ROUTES)?;
    let routes = std::mem::take(&mut ruleset.rules);
    ruleset.rules = user_id_retrofit().rules().into_iter().chain(routes).collect();
    Ok(ruleset)
}
