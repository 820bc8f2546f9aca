//! Terminal front end: `duet ask` for one-shot prompts and `duet chat` for
//! an interactive session that keeps conversation memory between turns.

pub mod cli;
pub mod terminal;

pub use cli::{Cli, Command};
pub use terminal::TerminalSession;
