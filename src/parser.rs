//! Identifier parser using nom.
//!
//! Splits a CamelCase query identifier into its result entity, verb and key.
//!
//! # Grammar
//!
//! ```text
//! UsersJoinedWithComments
//! ──┬── ─────┬──── ───┬───
//!   │        │        └── Key (association, join table or field)
//!   │        └── Verb (By, From, JoinedWith)
//!   └── Result entity
//!
//! AllUsers
//! ┬── ──┬──
//! │     └── Result entity (plural)
//! └── Verb (All)
//! ```
//!
//! Verb tokens are only recognized on word boundaries: `Byline` is a word,
//! not `By` followed by `line`.

use nom::{
    IResult,
    bytes::complete::take_while,
    character::complete::satisfy,
    combinator::{all_consuming, recognize},
    multi::many1,
    sequence::pair,
};
use serde::Serialize;
use std::fmt;

use crate::error::{GetError, GetResult, MULTIPLE_BY};
use crate::inflect;

/// Grammatical token selecting the kind of query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verb {
    /// Field lookup: `UserByEmail`.
    By,
    /// Ancestor walk: `PostsFromUser`.
    From,
    /// Join: `UsersJoinedWithComments`.
    JoinedWith,
    /// Unconditional collection fetch: `AllUsers`.
    All,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::By => write!(f, "By"),
            Verb::From => write!(f, "From"),
            Verb::JoinedWith => write!(f, "JoinedWith"),
            Verb::All => write!(f, "All"),
        }
    }
}

/// Structured intent parsed out of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedIdentifier {
    pub identifier: String,
    pub result_entity: String,
    pub verb: Verb,
    /// Underscored key, `None` for the open-ended and `All` forms.
    pub key: Option<String>,
}

/// Parse a query identifier.
///
/// Returns `Ok(None)` when the identifier is not a query identifier at all,
/// so unrelated names can be passed through without raising.
pub fn parse(identifier: &str) -> GetResult<Option<ParsedIdentifier>> {
    let identifier = identifier.trim();

    let words = match parse_words(identifier) {
        Ok((_, words)) => words,
        Err(_) => return Ok(None),
    };

    if words.iter().filter(|w| **w == "By").count() > 1 {
        return Err(GetError::invalid_class_name(identifier, MULTIPLE_BY));
    }

    if let Some(parsed) = parse_all(identifier, &words) {
        return Ok(Some(parsed));
    }

    Ok(parse_verb(identifier, &words))
}

/// Parse a CamelCase word: one uppercase letter followed by lowercase letters or digits.
fn parse_word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_uppercase()),
        take_while(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit()),
    ))(input)
}

/// Split the whole identifier into words.
fn parse_words(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(many1(parse_word))(input)
}

/// Recognize a verb token starting at `words[at]`, returning it and its width in words.
fn verb_at(words: &[&str], at: usize) -> Option<(Verb, usize)> {
    match words[at] {
        "By" => Some((Verb::By, 1)),
        "From" => Some((Verb::From, 1)),
        "Joined" if words.get(at + 1) == Some(&"With") => Some((Verb::JoinedWith, 2)),
        _ => None,
    }
}

/// `All<Entities>` with nothing else.
fn parse_all(identifier: &str, words: &[&str]) -> Option<ParsedIdentifier> {
    if words.len() < 2 || words[0] != "All" {
        return None;
    }
    if (1..words.len()).any(|at| verb_at(words, at).is_some()) {
        return None;
    }

    let entity = &identifier["All".len()..];
    if !inflect::is_plural(entity) {
        return None;
    }

    Some(ParsedIdentifier {
        identifier: identifier.to_string(),
        result_entity: entity.to_string(),
        verb: Verb::All,
        key: None,
    })
}

/// `<Entity>(By|From|JoinedWith)<Key>`, split at the first verb token.
fn parse_verb(identifier: &str, words: &[&str]) -> Option<ParsedIdentifier> {
    let mut offset = words[0].len();
    for at in 1..words.len() {
        if let Some((verb, width)) = verb_at(words, at) {
            let token_len: usize = words[at..at + width].iter().map(|w| w.len()).sum();
            let key = &identifier[offset + token_len..];
            return Some(ParsedIdentifier {
                identifier: identifier.to_string(),
                result_entity: identifier[..offset].to_string(),
                verb,
                key: (!key.is_empty()).then(|| inflect::underscore(key)),
            });
        }
        offset += words[at].len();
    }
    None
}
