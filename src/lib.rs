/*!
This library computes entity level precision, recall and F1 scores for sequence labeling tasks,
accumulated batch by batch over the course of an evaluation run.

# SCHEMES
The current schemes are supported:
* IOB1: Here, `I` is a token inside a chunk, `O` is a token outside a chunk and `B` is the
    beginning of the chunk immediately following another chunk of the same named entity.
* IOB2: It is same as IOB1, except that a `B` tag is given for every token, which exists at the
    beginning of the chunk.
* IOE1: An `E` tag used to mark the last token of a chunk immediately preceding another chunk of
    the same named entity.
* IOE2: It is same as IOE1, except that an `E` tag is given for every token, which exists at the
    end of the chunk.
* BILOU/IOBES: `E` and `L` denote the last token of a chunk and `S` and `U` denote a chunk made
    of a single token.

The scheme only matters in [`Mode::Strict`]; lenient matching recovers chunks from the prefix
transitions alone.

## More information about schemes
* [Wikipedia](https://en.wikipedia.org/wiki/Inside%E2%80%93outside%E2%80%93beginning_(tagging))
* [Article](https://cs229.stanford.edu/proj2005/KrishnanGanapathy-NamedEntityRecognition.pdf), chapter 2

# Terminology
* A label is an entity class we are interested in, such as `LOC` for location or `PER` for
    person. It can be anything, but must be represented by a string.
* A token is a string containing a label and a prefix, such as `B-PER`. The prefix indicates
    where we are in the current chunk and is limited to the letters `O`, `I`, `B`, `E`, `S`, `U`
    and `L`. With the suffix convention, the prefix sits at the end of the token, as in `PER-B`.
* A chunk, or entity, is a list of at least one contiguous token sharing a label, such as
    `["B-PER", "I-PER", "I-PER"]`.
* An entity predicted with exactly the right label and boundaries is a true positive. Precision,
    recall and F1 are computed from the counts of predicted, true positive and reference
    entities.

# Example
```rust
use seqmetric::Seqeval;

let mut metric = Seqeval::new(&["MISC", "PER"]).unwrap();
let references = vec![vec!["O", "B-PER", "I-PER", "O"]];
let predictions = vec![vec!["O", "B-PER", "I-PER", "O"]];
let report = metric.forward(&predictions, &references).unwrap();
assert_eq!(report.get("PER_f1"), Some(1.0));
assert_eq!(report.get("overall_f1"), Some(1.0));
```
*/

mod config;
mod entity;
mod metric;
mod schemes;
mod scorer;

// The public api starts here
pub use config::SeqevalBuilder;

pub use entity::{ConversionError, Entities, Entity, get_entities_lenient, get_entities_strict};

pub use metric::{ConfigError, MergeError, Report, Seqeval};

pub use schemes::{
    InvalidToken, Mode, ParsingError, SchemeType, UnknownModeError, UnknownSchemeError,
};

pub use scorer::{
    extract_tp_actual_correct, InconsistentLengthError, LabelCounts, ScoringError,
};
