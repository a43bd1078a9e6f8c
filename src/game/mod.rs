//! Interactive game: commands, character lookup, player input and the
//! investigation loop

mod command;
mod engine;
mod matcher;
mod terminal;

pub use command::{Command, ends_interview};
pub use engine::{Game, GameOptions, GameOutcome};
pub use matcher::find_character;
pub use terminal::Terminal;
