/**
Entity extraction from batches of tagged sequences. An entity is a contiguous chunk of tokens
sharing a tag, located by its sequence index and its half open `[start, end)` token range.

Two extraction strategies are provided. The lenient one follows boundary tolerant transition
rules and recovers entities from any IOB-like tagging without knowing the scheme. The strict one
parses the sequence against the exact pattern tables of a scheme and rejects tokens whose prefix
the scheme does not allow.
*/
use crate::schemes::{InnerToken, InvalidToken, ParsingError, SchemeType, Token, UserPrefix};
use std::error::Error;
use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// A chunk of tokens, located by the index of its sequence inside the batch and its half open
/// token range.
pub struct Entity<'a> {
    pub sent_id: usize,
    pub start: usize,
    pub end: usize,
    pub tag: &'a str,
}

impl<'a> Entity<'a> {
    pub fn new(sent_id: usize, start: usize, end: usize, tag: &'a str) -> Self {
        Self {
            sent_id,
            start,
            end,
            tag,
        }
    }
}

impl Display for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.sent_id, self.start, self.end, self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// The entities of a batch, grouped per sequence.
pub struct Entities<'a>(pub Vec<Vec<Entity<'a>>>);

impl<'a> Entities<'a> {
    /// Iterate over all entities of the batch, in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity<'a>> {
        self.0.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }
}

impl<'a> IntoIterator for Entities<'a> {
    type Item = Entity<'a>;
    type IntoIter = std::iter::Flatten<std::vec::IntoIter<Vec<Entity<'a>>>>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A batch of tokens could not be converted into entities.
pub enum ConversionError {
    /// A token's prefix is not allowed under the configured scheme.
    InvalidToken(InvalidToken),
    /// A token could not be split into a prefix and a tag.
    Parsing(ParsingError),
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken(err) => err.fmt(f),
            Self::Parsing(err) => err.fmt(f),
        }
    }
}
impl Error for ConversionError {}

impl From<InvalidToken> for ConversionError {
    fn from(value: InvalidToken) -> Self {
        Self::InvalidToken(value)
    }
}
impl From<ParsingError> for ConversionError {
    fn from(value: ParsingError) -> Self {
        Self::Parsing(value)
    }
}

/// Extract the entities of a batch with the boundary tolerant transition rules, ignoring the
/// scheme entirely.
pub fn get_entities_lenient<'a>(
    batch: &[Vec<&'a str>],
    suffix: bool,
) -> Result<Entities<'a>, ConversionError> {
    let mut per_sequence = Vec::with_capacity(batch.len());
    for (sent_id, sequence) in batch.iter().enumerate() {
        per_sequence.push(lenient_chunks(sent_id, sequence, suffix)?);
    }
    Ok(Entities(per_sequence))
}

fn lenient_chunks<'a>(
    sent_id: usize,
    sequence: &[&'a str],
    suffix: bool,
) -> Result<Vec<Entity<'a>>, ParsingError> {
    let mut entities = Vec::new();
    let mut prev_prefix = UserPrefix::O;
    let mut prev_tag: Option<&str> = None;
    let mut begin = 0;
    for (index, raw) in sequence
        .iter()
        .copied()
        .chain(std::iter::once("O"))
        .enumerate()
    {
        let token = InnerToken::parse(raw, suffix)?;
        if end_of_chunk(prev_prefix, prev_tag, token.prefix, token.tag) {
            if let Some(tag) = prev_tag {
                entities.push(Entity::new(sent_id, begin, index, tag));
            }
        }
        if start_of_chunk(prev_prefix, prev_tag, token.prefix, token.tag) {
            begin = index;
            prev_tag = Some(token.tag);
        } else if token.prefix == UserPrefix::O {
            prev_tag = None;
        }
        prev_prefix = token.prefix;
    }
    Ok(entities)
}

/// Check whether a chunk ended between the previous and the current token.
fn end_of_chunk(
    prev_prefix: UserPrefix,
    prev_tag: Option<&str>,
    prefix: UserPrefix,
    tag: &str,
) -> bool {
    use UserPrefix::*;
    match (prev_prefix, prefix) {
        (E, _) | (S, _) => true,
        (B, B) | (B, S) | (B, O) => true,
        (I, B) | (I, S) | (I, O) => true,
        (O, _) => false,
        _ => prev_tag.is_some() && prev_tag != Some(tag),
    }
}

/// Check whether a chunk started on the current token.
fn start_of_chunk(
    prev_prefix: UserPrefix,
    prev_tag: Option<&str>,
    prefix: UserPrefix,
    tag: &str,
) -> bool {
    use UserPrefix::*;
    match (prev_prefix, prefix) {
        (_, B) | (_, S) => true,
        (E, E) | (E, I) => true,
        (S, E) | (S, I) => true,
        (O, E) | (O, I) => true,
        (_, O) => false,
        _ => prev_tag != Some(tag),
    }
}

/// Extract the entities of a batch by parsing each sequence against the pattern tables of
/// `scheme`. Tokens whose prefix the scheme does not allow are rejected.
pub fn get_entities_strict<'a>(
    batch: &[Vec<&'a str>],
    scheme: SchemeType,
    suffix: bool,
) -> Result<Entities<'a>, ConversionError> {
    let mut per_sequence = Vec::with_capacity(batch.len());
    for (sent_id, sequence) in batch.iter().enumerate() {
        per_sequence.push(strict_chunks(sent_id, sequence, scheme, suffix)?);
    }
    Ok(Entities(per_sequence))
}

fn strict_chunks<'a>(
    sent_id: usize,
    sequence: &[&'a str],
    scheme: SchemeType,
    suffix: bool,
) -> Result<Vec<Entity<'a>>, ConversionError> {
    // Sandwich the sequence between two outside tokens so that chunks touching either
    // boundary are parsed like any other.
    let mut extended = Vec::with_capacity(sequence.len() + 2);
    extended.push(Token::outside(scheme));
    for raw in sequence.iter().copied() {
        extended.push(Token::new(scheme, InnerToken::parse(raw, suffix)?));
    }
    extended.push(Token::outside(scheme));

    let mut entities = Vec::new();
    let last = extended.len() - 1;
    let mut index = 1;
    while index < last {
        let token = &extended[index];
        if !token.is_valid() {
            return Err(InvalidToken(String::from(token.inner().token)).into());
        }
        let prev = extended[index - 1].inner();
        if token.is_start(prev) {
            let mut end = index + 1;
            while end < last && extended[end].is_inside(extended[end - 1].inner()) {
                end += 1;
            }
            if extended[end].is_end(extended[end - 1].inner()) {
                entities.push(Entity::new(sent_id, index - 1, end - 1, token.inner().tag));
            }
            index = end;
        } else {
            index += 1;
        }
    }
    Ok(entities)
}
