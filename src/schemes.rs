/**
This module gives the tooling necessary to split raw tokens such as `"B-PER"` into a prefix and a
tag, and to describe, for each supported scheme, which prefix transitions start, continue or end a
chunk.
*/
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Character separating the prefix from the tag, as in `I-PER` or `PER-I`.
pub(crate) const DELIMITER: char = '-';

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Sequence)]
/// The prefixes that can actually appear in user supplied tokens. They are all a single character.
pub(crate) enum UserPrefix {
    I,
    O,
    B,
    E,
    S,
    U,
    L,
}

impl TryFrom<char> for UserPrefix {
    type Error = ParsingError;
    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'I' => Ok(Self::I),
            'O' => Ok(Self::O),
            'B' => Ok(Self::B),
            'E' => Ok(Self::E),
            'S' => Ok(Self::S),
            'U' => Ok(Self::U),
            'L' => Ok(Self::L),
            _ => Err(ParsingError::PrefixError(String::from(value))),
        }
    }
}

impl Display for UserPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
/// Prefix as used inside the scheme pattern tables. `Any` is a marker matching every user prefix;
/// it cannot be supplied by the user.
pub(crate) enum Prefix {
    I,
    O,
    B,
    E,
    S,
    U,
    L,
    Any,
}

impl From<UserPrefix> for Prefix {
    fn from(value: UserPrefix) -> Self {
        match value {
            UserPrefix::I => Self::I,
            UserPrefix::O => Self::O,
            UserPrefix::B => Self::B,
            UserPrefix::E => Self::E,
            UserPrefix::S => Self::S,
            UserPrefix::U => Self::U,
            UserPrefix::L => Self::L,
        }
    }
}

impl Prefix {
    fn matches(&self, other: UserPrefix) -> bool {
        *self == Prefix::Any || *self == Prefix::from(other)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
/// Condition on the tags of two neighbouring tokens inside a pattern.
pub(crate) enum Tag {
    Same,
    Diff,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Could not split a raw token into a prefix and a tag.
pub enum ParsingError {
    /// The prefix character is not one of `I`, `O`, `B`, `E`, `S`, `U`, `L`.
    PrefixError(String),
    /// Received an empty token.
    EmptyToken,
}

impl Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrefixError(content) => {
                write!(
                    f,
                    "Could not parse the following string into a prefix: {}",
                    content
                )
            }
            Self::EmptyToken => write!(f, "Received an empty token"),
        }
    }
}
impl Error for ParsingError {}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Encountered a token whose prefix is not allowed under the configured scheme.
pub struct InvalidToken(pub(crate) String);

impl Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid token: {}", self.0)
    }
}
impl Error for InvalidToken {}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
/// Enumeration of the supported tagging schemes. The scheme indicates how a sequence of tokens is
/// chunked into entities when matching strictly.
pub enum SchemeType {
    IOB1,
    IOB2,
    IOE1,
    IOE2,
    IOBES,
    BILOU,
}

impl Display for SchemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSchemeError(String);

impl Display for UnknownSchemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse the string ({}) into a SchemeType", self.0)
    }
}
impl Error for UnknownSchemeError {}

impl FromStr for SchemeType {
    type Err = UnknownSchemeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IOB1" => Ok(Self::IOB1),
            "IOB2" => Ok(Self::IOB2),
            "IOE1" => Ok(Self::IOE1),
            "IOE2" => Ok(Self::IOE2),
            "IOBES" => Ok(Self::IOBES),
            "BILOU" => Ok(Self::BILOU),
            _ => Err(UnknownSchemeError(String::from(s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Sequence, Serialize, Deserialize)]
/// Matching strictness. In the default `Lenient` mode, entity boundaries are recovered with the
/// boundary tolerant transition rules and the scheme is ignored. In `Strict` mode, chunks are
/// parsed with the exact pattern tables of the configured scheme.
pub enum Mode {
    #[default]
    Lenient,
    Strict,
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownModeError(String);

impl Display for UnknownModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse the string ({}) into a Mode", self.0)
    }
}
impl Error for UnknownModeError {}

impl FromStr for Mode {
    type Err = UnknownModeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" | "default" => Ok(Self::Lenient),
            _ => Err(UnknownModeError(String::from(s))),
        }
    }
}

/// The pattern tables describe, per scheme, which (previous prefix, current prefix, tag condition)
/// triples mark the start, the inside and the end of a chunk.
impl SchemeType {
    const IOB1_ALLOWED_PREFIXES: [Prefix; 3] = [Prefix::I, Prefix::O, Prefix::B];
    const IOB1_START_PATTERNS: [(Prefix, Prefix, Tag); 5] = [
        (Prefix::O, Prefix::I, Tag::Any),
        (Prefix::I, Prefix::I, Tag::Diff),
        (Prefix::B, Prefix::I, Tag::Any),
        (Prefix::I, Prefix::B, Tag::Same),
        (Prefix::B, Prefix::B, Tag::Same),
    ];
    const IOB1_INSIDE_PATTERNS: [(Prefix, Prefix, Tag); 2] = [
        (Prefix::B, Prefix::I, Tag::Same),
        (Prefix::I, Prefix::I, Tag::Same),
    ];
    const IOB1_END_PATTERNS: [(Prefix, Prefix, Tag); 6] = [
        (Prefix::I, Prefix::I, Tag::Diff),
        (Prefix::I, Prefix::O, Tag::Any),
        (Prefix::I, Prefix::B, Tag::Any),
        (Prefix::B, Prefix::O, Tag::Any),
        (Prefix::B, Prefix::I, Tag::Diff),
        (Prefix::B, Prefix::B, Tag::Same),
    ];

    const IOB2_ALLOWED_PREFIXES: [Prefix; 3] = [Prefix::I, Prefix::O, Prefix::B];
    const IOB2_START_PATTERNS: [(Prefix, Prefix, Tag); 1] = [(Prefix::Any, Prefix::B, Tag::Any)];
    const IOB2_INSIDE_PATTERNS: [(Prefix, Prefix, Tag); 2] = [
        (Prefix::B, Prefix::I, Tag::Same),
        (Prefix::I, Prefix::I, Tag::Same),
    ];
    const IOB2_END_PATTERNS: [(Prefix, Prefix, Tag); 6] = [
        (Prefix::I, Prefix::O, Tag::Any),
        (Prefix::I, Prefix::I, Tag::Diff),
        (Prefix::I, Prefix::B, Tag::Any),
        (Prefix::B, Prefix::O, Tag::Any),
        (Prefix::B, Prefix::I, Tag::Diff),
        (Prefix::B, Prefix::B, Tag::Any),
    ];

    const IOE1_ALLOWED_PREFIXES: [Prefix; 3] = [Prefix::I, Prefix::O, Prefix::E];
    const IOE1_START_PATTERNS: [(Prefix, Prefix, Tag); 4] = [
        (Prefix::O, Prefix::I, Tag::Any),
        (Prefix::I, Prefix::I, Tag::Diff),
        (Prefix::E, Prefix::I, Tag::Any),
        (Prefix::E, Prefix::E, Tag::Same),
    ];
    const IOE1_INSIDE_PATTERNS: [(Prefix, Prefix, Tag); 2] = [
        (Prefix::I, Prefix::I, Tag::Same),
        (Prefix::I, Prefix::E, Tag::Same),
    ];
    const IOE1_END_PATTERNS: [(Prefix, Prefix, Tag); 5] = [
        (Prefix::I, Prefix::I, Tag::Diff),
        (Prefix::I, Prefix::O, Tag::Any),
        (Prefix::I, Prefix::E, Tag::Diff),
        (Prefix::E, Prefix::I, Tag::Same),
        (Prefix::E, Prefix::E, Tag::Same),
    ];

    const IOE2_ALLOWED_PREFIXES: [Prefix; 3] = [Prefix::I, Prefix::O, Prefix::E];
    const IOE2_START_PATTERNS: [(Prefix, Prefix, Tag); 6] = [
        (Prefix::O, Prefix::I, Tag::Any),
        (Prefix::O, Prefix::E, Tag::Any),
        (Prefix::E, Prefix::I, Tag::Any),
        (Prefix::E, Prefix::E, Tag::Any),
        (Prefix::I, Prefix::I, Tag::Diff),
        (Prefix::I, Prefix::E, Tag::Diff),
    ];
    const IOE2_INSIDE_PATTERNS: [(Prefix, Prefix, Tag); 2] = [
        (Prefix::I, Prefix::I, Tag::Same),
        (Prefix::I, Prefix::E, Tag::Same),
    ];
    const IOE2_END_PATTERNS: [(Prefix, Prefix, Tag); 1] = [(Prefix::E, Prefix::Any, Tag::Any)];

    const IOBES_ALLOWED_PREFIXES: [Prefix; 5] =
        [Prefix::I, Prefix::O, Prefix::B, Prefix::E, Prefix::S];
    const IOBES_START_PATTERNS: [(Prefix, Prefix, Tag); 2] = [
        (Prefix::Any, Prefix::B, Tag::Any),
        (Prefix::Any, Prefix::S, Tag::Any),
    ];
    const IOBES_INSIDE_PATTERNS: [(Prefix, Prefix, Tag); 4] = [
        (Prefix::B, Prefix::I, Tag::Same),
        (Prefix::B, Prefix::E, Tag::Same),
        (Prefix::I, Prefix::I, Tag::Same),
        (Prefix::I, Prefix::E, Tag::Same),
    ];
    const IOBES_END_PATTERNS: [(Prefix, Prefix, Tag); 2] = [
        (Prefix::S, Prefix::Any, Tag::Any),
        (Prefix::E, Prefix::Any, Tag::Any),
    ];

    const BILOU_ALLOWED_PREFIXES: [Prefix; 5] =
        [Prefix::I, Prefix::O, Prefix::B, Prefix::L, Prefix::U];
    const BILOU_START_PATTERNS: [(Prefix, Prefix, Tag); 2] = [
        (Prefix::Any, Prefix::B, Tag::Any),
        (Prefix::Any, Prefix::U, Tag::Any),
    ];
    const BILOU_INSIDE_PATTERNS: [(Prefix, Prefix, Tag); 4] = [
        (Prefix::B, Prefix::I, Tag::Same),
        (Prefix::B, Prefix::L, Tag::Same),
        (Prefix::I, Prefix::I, Tag::Same),
        (Prefix::I, Prefix::L, Tag::Same),
    ];
    const BILOU_END_PATTERNS: [(Prefix, Prefix, Tag); 2] = [
        (Prefix::U, Prefix::Any, Tag::Any),
        (Prefix::L, Prefix::Any, Tag::Any),
    ];

    pub(crate) fn allowed_prefixes(self) -> &'static [Prefix] {
        match self {
            Self::IOB1 => &Self::IOB1_ALLOWED_PREFIXES,
            Self::IOB2 => &Self::IOB2_ALLOWED_PREFIXES,
            Self::IOE1 => &Self::IOE1_ALLOWED_PREFIXES,
            Self::IOE2 => &Self::IOE2_ALLOWED_PREFIXES,
            Self::IOBES => &Self::IOBES_ALLOWED_PREFIXES,
            Self::BILOU => &Self::BILOU_ALLOWED_PREFIXES,
        }
    }
    fn start_patterns(self) -> &'static [(Prefix, Prefix, Tag)] {
        match self {
            Self::IOB1 => &Self::IOB1_START_PATTERNS,
            Self::IOB2 => &Self::IOB2_START_PATTERNS,
            Self::IOE1 => &Self::IOE1_START_PATTERNS,
            Self::IOE2 => &Self::IOE2_START_PATTERNS,
            Self::IOBES => &Self::IOBES_START_PATTERNS,
            Self::BILOU => &Self::BILOU_START_PATTERNS,
        }
    }
    fn inside_patterns(self) -> &'static [(Prefix, Prefix, Tag)] {
        match self {
            Self::IOB1 => &Self::IOB1_INSIDE_PATTERNS,
            Self::IOB2 => &Self::IOB2_INSIDE_PATTERNS,
            Self::IOE1 => &Self::IOE1_INSIDE_PATTERNS,
            Self::IOE2 => &Self::IOE2_INSIDE_PATTERNS,
            Self::IOBES => &Self::IOBES_INSIDE_PATTERNS,
            Self::BILOU => &Self::BILOU_INSIDE_PATTERNS,
        }
    }
    fn end_patterns(self) -> &'static [(Prefix, Prefix, Tag)] {
        match self {
            Self::IOB1 => &Self::IOB1_END_PATTERNS,
            Self::IOB2 => &Self::IOB2_END_PATTERNS,
            Self::IOE1 => &Self::IOE1_END_PATTERNS,
            Self::IOE2 => &Self::IOE2_END_PATTERNS,
            Self::IOBES => &Self::IOBES_END_PATTERNS,
            Self::BILOU => &Self::BILOU_END_PATTERNS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A raw token split into its prefix and its tag.
pub(crate) struct InnerToken<'a> {
    /// The full token, such as `"B-PER"`.
    pub(crate) token: &'a str,
    /// The prefix, such as `B`, `I` or `O`.
    pub(crate) prefix: UserPrefix,
    /// The tag, such as `"PER"` or `"LOC"`.
    pub(crate) tag: &'a str,
}

impl<'a> InnerToken<'a> {
    /// Split `token` on its prefix character, located at the start of the token or, when `suffix`
    /// is true, at its end. A token reduced to its prefix gets the placeholder tag `"_"`.
    pub(crate) fn parse(token: &'a str, suffix: bool) -> Result<Self, ParsingError> {
        let mut chars = token.chars();
        let (prefix_char, rest) = if suffix {
            let last = chars.next_back().ok_or(ParsingError::EmptyToken)?;
            let rest = chars.as_str();
            (last, rest.strip_suffix(DELIMITER).unwrap_or(rest))
        } else {
            let first = chars.next().ok_or(ParsingError::EmptyToken)?;
            let rest = chars.as_str();
            (first, rest.strip_prefix(DELIMITER).unwrap_or(rest))
        };
        let prefix = UserPrefix::try_from(prefix_char)?;
        let tag = if rest.is_empty() { "_" } else { rest };
        Ok(Self { token, prefix, tag })
    }

    /// The implicit token closing every sequence.
    pub(crate) fn outside() -> Self {
        Self {
            token: "O",
            prefix: UserPrefix::O,
            tag: "_",
        }
    }

    fn check_tag(&self, prev: &InnerToken, cond: Tag) -> bool {
        match cond {
            Tag::Any => true,
            Tag::Same => prev.tag == self.tag,
            Tag::Diff => prev.tag != self.tag,
        }
    }

    /// Check whether any of the (previous, current, tag) patterns is matched.
    fn check_patterns(&self, prev: &InnerToken, patterns: &[(Prefix, Prefix, Tag)]) -> bool {
        patterns.iter().any(|(prev_pattern, current_pattern, cond)| {
            prev_pattern.matches(prev.prefix)
                && current_pattern.matches(self.prefix)
                && self.check_tag(prev, *cond)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// An `InnerToken` paired with the scheme it is interpreted under.
pub(crate) struct Token<'a> {
    scheme: SchemeType,
    inner: InnerToken<'a>,
}

impl<'a> Token<'a> {
    pub(crate) fn new(scheme: SchemeType, inner: InnerToken<'a>) -> Self {
        Self { scheme, inner }
    }

    pub(crate) fn outside(scheme: SchemeType) -> Self {
        Self::new(scheme, InnerToken::outside())
    }

    pub(crate) fn inner(&self) -> &InnerToken<'a> {
        &self.inner
    }

    /// Check whether the prefix is allowed under the scheme.
    pub(crate) fn is_valid(&self) -> bool {
        self.scheme
            .allowed_prefixes()
            .contains(&Prefix::from(self.inner.prefix))
    }

    /// Check whether the current token is the start of a chunk.
    pub(crate) fn is_start(&self, prev: &InnerToken) -> bool {
        self.inner.check_patterns(prev, self.scheme.start_patterns())
    }

    /// Check whether the current token continues the chunk of the previous token.
    pub(crate) fn is_inside(&self, prev: &InnerToken) -> bool {
        self.inner.check_patterns(prev, self.scheme.inside_patterns())
    }

    /// Check whether the *previous* token was the end of a chunk.
    pub(crate) fn is_end(&self, prev: &InnerToken) -> bool {
        self.inner.check_patterns(prev, self.scheme.end_patterns())
    }
}
