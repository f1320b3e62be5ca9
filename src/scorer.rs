/**
Conversion of a batch of references and predictions into per label count triples. For every label
appearing on either side, the scorer reports how many entities were predicted, how many of those
are also reference entities, and how many reference entities exist.
*/
use crate::entity::{get_entities_lenient, get_entities_strict, ConversionError, Entities};
use crate::schemes::{Mode, SchemeType};
use ahash::{AHashMap, AHashSet};
use ndarray::Array1;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{self, Display};

/// Per label counts of a batch: the label names in lexicographic order, then for each label the
/// number of predicted entities, the number of true positives and the number of reference
/// entities.
pub type LabelCounts = (Vec<String>, Array1<usize>, Array1<usize>, Array1<usize>);

#[derive(Debug, Clone, PartialEq, Eq)]
/// The references and the predictions do not have the same shape.
pub struct InconsistentLengthError(pub usize, pub usize);

impl Display for InconsistentLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found inconsistent lengths: {} is different from {}",
            self.0, self.1
        )
    }
}
impl Error for InconsistentLengthError {}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A batch could not be scored.
pub enum ScoringError {
    /// One of the inputs contains no sequence. The string names the offending input.
    EmptyInput(String),
    InconsistentLength(InconsistentLengthError),
    Conversion(ConversionError),
    /// Strict matching was requested without a scheme to parse against.
    MissingScheme,
}

impl Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput(name) => write!(f, "Received an empty input: {}", name),
            Self::InconsistentLength(err) => err.fmt(f),
            Self::Conversion(err) => err.fmt(f),
            Self::MissingScheme => write!(f, "Strict matching requires a scheme"),
        }
    }
}
impl Error for ScoringError {}

impl From<InconsistentLengthError> for ScoringError {
    fn from(value: InconsistentLengthError) -> Self {
        Self::InconsistentLength(value)
    }
}
impl From<ConversionError> for ScoringError {
    fn from(value: ConversionError) -> Self {
        Self::Conversion(value)
    }
}

fn check_for_empty_batch(
    y_true: &[Vec<&str>],
    y_pred: &[Vec<&str>],
) -> Result<(), ScoringError> {
    if y_true.is_empty() {
        return Err(ScoringError::EmptyInput(String::from("y_true")));
    }
    if y_pred.is_empty() {
        return Err(ScoringError::EmptyInput(String::from("y_pred")));
    }
    Ok(())
}

fn check_consistent_length(
    y_true: &[Vec<&str>],
    y_pred: &[Vec<&str>],
) -> Result<(), InconsistentLengthError> {
    if y_true.len() != y_pred.len() {
        return Err(InconsistentLengthError(y_true.len(), y_pred.len()));
    }
    for (t, p) in y_true.iter().zip(y_pred) {
        if t.len() != p.len() {
            return Err(InconsistentLengthError(t.len(), p.len()));
        }
    }
    Ok(())
}

/// Index the entities of a batch per label. Each entity is keyed by its sequence index and its
/// token range, so identical spans in different sequences stay distinct.
fn index_spans<'a>(entities: &Entities<'a>) -> AHashMap<&'a str, AHashSet<(usize, usize, usize)>> {
    let mut spans: AHashMap<&str, AHashSet<(usize, usize, usize)>> = AHashMap::new();
    for entity in entities.iter() {
        spans
            .entry(entity.tag)
            .or_default()
            .insert((entity.sent_id, entity.start, entity.end));
    }
    spans
}

/// Score a batch of references against a batch of predictions, returning the per label counts of
/// predicted, true positive and reference entities.
pub fn extract_tp_actual_correct(
    y_true: &[Vec<&str>],
    y_pred: &[Vec<&str>],
    suffix: bool,
    scheme: Option<SchemeType>,
    mode: Mode,
) -> Result<LabelCounts, ScoringError> {
    check_for_empty_batch(y_true, y_pred)?;
    check_consistent_length(y_true, y_pred)?;

    let (entities_true, entities_pred) = match mode {
        Mode::Strict => {
            let scheme = scheme.ok_or(ScoringError::MissingScheme)?;
            (
                get_entities_strict(y_true, scheme, suffix)?,
                get_entities_strict(y_pred, scheme, suffix)?,
            )
        }
        Mode::Lenient => (
            get_entities_lenient(y_true, suffix)?,
            get_entities_lenient(y_pred, suffix)?,
        ),
    };
    let spans_true = index_spans(&entities_true);
    let spans_pred = index_spans(&entities_pred);

    let target_names: BTreeSet<&str> = spans_true
        .keys()
        .chain(spans_pred.keys())
        .copied()
        .collect();

    let mut pred_sum = Vec::with_capacity(target_names.len());
    let mut tp_sum = Vec::with_capacity(target_names.len());
    let mut true_sum = Vec::with_capacity(target_names.len());
    for name in &target_names {
        let pred = spans_pred.get(name);
        let truth = spans_true.get(name);
        pred_sum.push(pred.map_or(0, |spans| spans.len()));
        true_sum.push(truth.map_or(0, |spans| spans.len()));
        tp_sum.push(match (pred, truth) {
            (Some(p), Some(t)) => p.intersection(t).count(),
            _ => 0,
        });
    }

    Ok((
        target_names.into_iter().map(String::from).collect(),
        Array1::from_vec(pred_sum),
        Array1::from_vec(tp_sum),
        Array1::from_vec(true_sum),
    ))
}
