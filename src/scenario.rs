//! Mystery scenario files
//!
//! A scenario is a static JSON document describing the case: title,
//! solution, introduction narration and the roster of characters the
//! detective can interview.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::{Error, Result};

/// Binds a synthesis engine to the voice model it should use
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VoiceBinding {
    /// Synthesis engine name (e.g. "google")
    pub engine: String,

    /// Voice model identifier understood by that engine
    pub model: String,
}

/// Look up the voice model bound to `engine`
///
/// Returns an empty string when there is no binding, which lets the
/// synthesis service fall back to its default voice.
#[must_use]
pub fn voice_for<'a>(bindings: &'a [VoiceBinding], engine: &str) -> &'a str {
    bindings
        .iter()
        .find(|b| b.engine == engine)
        .map_or("", |b| b.model.as_str())
}

/// Who did it, with what, and where
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Solution {
    pub killer: String,
    pub weapon: String,
    pub location: String,
}

/// A player's final accusation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accusation {
    pub name: String,
    pub weapon: String,
    pub location: String,
}

impl Accusation {
    /// Parse `<name> <weapon> <location...>`
    ///
    /// The location keeps every remaining word, so "dining room" works.
    /// Returns `None` when fewer than three fields are present.
    #[must_use]
    pub fn parse(args: &str) -> Option<Self> {
        let mut fields = args.split_whitespace();
        let name = fields.next()?.to_string();
        let weapon = fields.next()?.to_string();
        let location = fields.collect::<Vec<_>>().join(" ");

        if location.is_empty() {
            return None;
        }

        Some(Self {
            name,
            weapon,
            location,
        })
    }
}

/// Outcome of judging an accusation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Wrong,
}

/// A loaded murder mystery
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    pub title: String,

    #[serde(flatten)]
    pub solution: Solution,

    /// Narration read to the detective before the investigation starts
    #[serde(rename = "introduction", default)]
    pub intro: String,

    #[serde(default)]
    pub narrator_tts: Vec<VoiceBinding>,

    pub characters: Vec<Character>,
}

impl Scenario {
    /// Load a scenario from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid JSON, or is
    /// missing the solution or characters
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Scenario(format!("failed to open {}: {e}", path.display()))
        })?;

        let scenario = Self::from_json(&content)?;

        tracing::debug!(
            path = %path.display(),
            title = %scenario.title,
            characters = scenario.characters.len(),
            "scenario loaded"
        );

        Ok(scenario)
    }

    /// Parse a scenario from JSON text
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the scenario is incomplete
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)
            .map_err(|e| Error::Scenario(format!("failed to decode scenario: {e}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        let Solution {
            killer,
            weapon,
            location,
        } = &self.solution;

        if killer.trim().is_empty() || weapon.trim().is_empty() || location.trim().is_empty() {
            return Err(Error::Scenario(
                "killer, weapon and location are required".to_string(),
            ));
        }

        if self.characters.is_empty() {
            return Err(Error::Scenario("scenario has no characters".to_string()));
        }

        Ok(())
    }

    /// Judge an accusation against the solution (case-insensitive)
    #[must_use]
    pub fn judge(&self, accusation: &Accusation) -> Verdict {
        let same = |a: &str, b: &str| a.trim().to_lowercase() == b.trim().to_lowercase();

        if same(&accusation.name, &self.solution.killer)
            && same(&accusation.weapon, &self.solution.weapon)
            && same(&accusation.location, &self.solution.location)
        {
            Verdict::Correct
        } else {
            Verdict::Wrong
        }
    }

    /// Narrator voice for the given synthesis engine
    #[must_use]
    pub fn narrator_voice(&self, engine: &str) -> &str {
        voice_for(&self.narrator_tts, engine)
    }

    /// Roster names in order
    pub fn character_names(&self) -> impl Iterator<Item = &str> {
        self.characters.iter().map(|c| c.name.as_str())
    }
}
