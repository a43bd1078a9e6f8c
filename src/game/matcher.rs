//! Fuzzy lookup of characters by a typed or spoken name fragment

use crate::{Error, Result};

/// Find the roster index best matching `query`
///
/// Tries, in order: the whole query contained in a name; each query word
/// contained in a name; each query word within a small edit distance of a
/// word in a name. Earlier roster entries win ties.
///
/// # Errors
///
/// Returns `Error::CharacterNotFound` if nothing matches
pub fn find_character<S: AsRef<str>>(roster: &[S], query: &str) -> Result<usize> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(Error::CharacterNotFound(query));
    }

    let names: Vec<String> = roster.iter().map(|n| n.as_ref().to_lowercase()).collect();

    if let Some(index) = names.iter().position(|name| name.contains(&query)) {
        return Ok(index);
    }

    let words: Vec<&str> = query.split_whitespace().collect();

    for word in &words {
        if let Some(index) = names.iter().position(|name| name.contains(word)) {
            return Ok(index);
        }
    }

    for word in &words {
        if let Some(index) = nearest(&names, word) {
            return Ok(index);
        }
    }

    Err(Error::CharacterNotFound(query))
}

/// Closest name by edit distance over its words
///
/// A name is accepted only when its closest word is within a third of the
/// query word's length (at least one edit).
fn nearest(names: &[String], word: &str) -> Option<usize> {
    let (index, distance, closest) = names
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            name.split_whitespace()
                .map(|part| (strsim::levenshtein(word, part), part))
                .min_by_key(|(distance, _)| *distance)
                .map(|(distance, part)| (index, distance, part))
        })
        .min_by_key(|(_, distance, _)| *distance)?;

    let bound = (word.chars().count() / 3).max(1);
    tracing::trace!(word, closest, distance, bound, "nearest roster name");

    (distance <= bound).then_some(index)
}
