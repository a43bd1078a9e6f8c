//! Parsing of interactive commands

use crate::scenario::Accusation;

/// One line typed (or spoken) at the main prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    /// Name fragment to match against the roster
    Interview(Option<String>),
    /// `None` when fewer than three fields were given
    Accuse(Option<Accusation>),
    Quit,
    Unknown(String),
    Empty,
}

impl Command {
    /// Dispatch on the first word, case-insensitively
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(h, r)| (h, r.trim()));

        match head.to_lowercase().as_str() {
            "" => Self::Empty,
            "help" => Self::Help,
            "list" => Self::List,
            "interview" => Self::Interview((!rest.is_empty()).then(|| rest.to_string())),
            "accuse" => Self::Accuse(Accusation::parse(rest)),
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Whether a line inside an interview ends it
#[must_use]
pub fn ends_interview(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit")
}
