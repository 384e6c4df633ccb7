pub mod entities;
pub mod fuzzy;
pub mod reference;
pub mod session;

pub use entities::{action_verb, extract, is_destructive, looks_like_prd};
pub use fuzzy::{fuzzy_match, levenshtein, similarity, CommandRegistry, CommandSpec};
pub use reference::{PronounResolution, ReferenceResolver, Resolution, UpdateFields};
pub use session::SessionRegistry;
