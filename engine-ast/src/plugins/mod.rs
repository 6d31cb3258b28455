//! Reference plugins proving the [`crate::plugin::LanguageParserPlugin`]
//! contract end-to-end. Not a production language matrix (spec §1
//! non-goals) — a production host registers its own plugins for the
//! languages it cares about.

pub mod plain_text;
pub mod rust_plugin;

pub use plain_text::PlainTextPlugin;
pub use rust_plugin::RustPlugin;
