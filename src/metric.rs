/**
The stateful metric. A [`Seqeval`] accumulates, over any number of batches, the per label counts
of predicted, true positive and reference entities for a fixed label vocabulary, and computes
entity level precision, recall and F1 from them at any point.
*/
use crate::config::SeqevalBuilder;
use crate::scorer::{extract_tp_actual_correct, ScoringError};
use crate::schemes::{Mode, SchemeType};
use ahash::AHashMap;
use itertools::multizip;
use ndarray::{arr1, Array1, Zip};
use num::Float;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display};

/// Entity level precision, recall and F1 scores, accumulated batch by batch.
///
/// The metric is bound to a fixed label vocabulary given at construction. Each call to
/// [`update`](Seqeval::update) converts a batch of predictions and references into entity counts
/// and adds them to the running state; entities whose label is outside the vocabulary are
/// silently dropped. [`compute`](Seqeval::compute) reads the state without consuming it, so
/// updating and computing can be interleaved freely.
#[derive(Debug, Clone)]
pub struct Seqeval {
    labels: Vec<String>,
    labels2ind: AHashMap<String, usize>,
    suffix: bool,
    scheme: Option<SchemeType>,
    mode: Mode,
    stage: Option<String>,
    pred_sum: Array1<u64>,
    tp_sum: Array1<u64>,
    true_sum: Array1<u64>,
}

/// Equality compares the scoring configuration and the accumulated counts. The stage only
/// affects report keys and is ignored, matching what [`merge`](Seqeval::merge) requires.
impl PartialEq for Seqeval {
    fn eq(&self, other: &Self) -> bool {
        self.scoring_config_matches(other)
            && self.pred_sum == other.pred_sum
            && self.tp_sum == other.tp_sum
            && self.true_sum == other.true_sum
    }
}

impl Seqeval {
    /// Build a metric over `labels` with the default configuration: prefixed tokens, lenient
    /// matching, no scheme and no stage.
    ///
    /// The labels must be distinct; ordering is preserved in the computed report.
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Result<Self, ConfigError> {
        Self::with_config(
            labels.iter().map(|s| String::from(s.as_ref())).collect(),
            false,
            None,
            Mode::default(),
            None,
        )
    }

    /// Configure a metric step by step.
    pub fn builder() -> SeqevalBuilder {
        SeqevalBuilder::new()
    }

    pub(crate) fn with_config(
        labels: Vec<String>,
        suffix: bool,
        scheme: Option<SchemeType>,
        mode: Mode,
        stage: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut labels2ind = AHashMap::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            if labels2ind.insert(label.clone(), index).is_some() {
                return Err(ConfigError::DuplicateLabel(label.clone()));
            }
        }
        if mode == Mode::Strict && scheme.is_none() {
            return Err(ConfigError::StrictModeRequiresScheme);
        }
        let size = labels.len();
        Ok(Self {
            labels,
            labels2ind,
            suffix,
            scheme,
            mode,
            stage,
            pred_sum: Array1::zeros(size),
            tp_sum: Array1::zeros(size),
            true_sum: Array1::zeros(size),
        })
    }

    fn scoring_config_matches(&self, other: &Self) -> bool {
        self.labels == other.labels
            && self.suffix == other.suffix
            && self.scheme == other.scheme
            && self.mode == other.mode
    }

    /// Score a batch and add its counts to the running state.
    ///
    /// The state is only touched once the whole batch has been scored, so a failed update leaves
    /// the metric unchanged.
    pub fn update(
        &mut self,
        predictions: &[Vec<&str>],
        references: &[Vec<&str>],
    ) -> Result<(), ScoringError> {
        let (names, pred_sum, tp_sum, true_sum) =
            extract_tp_actual_correct(references, predictions, self.suffix, self.scheme, self.mode)?;
        for (name, pred, tp, truth) in multizip((&names, &pred_sum, &tp_sum, &true_sum)) {
            if let Some(&index) = self.labels2ind.get(name.as_str()) {
                self.pred_sum[index] += *pred as u64;
                self.tp_sum[index] += *tp as u64;
                self.true_sum[index] += *truth as u64;
            }
        }
        Ok(())
    }

    /// Compute the scores from the accumulated state. The state is left untouched, so calling
    /// this repeatedly without updating in between returns the same report.
    ///
    /// The report holds, for every label in vocabulary order, its precision, recall, F1 and
    /// number of reference entities, followed by the micro averaged overall scores. A zero
    /// denominator resolves to a score of zero.
    pub fn compute(&self) -> Report {
        let pred_sum = self.pred_sum.mapv(|v| v as f32);
        let tp_sum = self.tp_sum.mapv(|v| v as f32);
        let true_sum = self.true_sum.mapv(|v| v as f32);
        let (precision, recall, f1) = precision_recall_f1(&pred_sum, &tp_sum, &true_sum);

        let mut report = Report::with_capacity(4 * self.labels.len() + 3);
        for (label, value) in self.labels.iter().zip(&precision) {
            report.push(self.key(label, "precision"), *value);
        }
        for (label, value) in self.labels.iter().zip(&recall) {
            report.push(self.key(label, "recall"), *value);
        }
        for (label, value) in self.labels.iter().zip(&f1) {
            report.push(self.key(label, "f1"), *value);
        }
        for (label, value) in self.labels.iter().zip(&true_sum) {
            report.push(self.key(label, "number"), *value);
        }

        let (overall_precision, overall_recall, overall_f1) = precision_recall_f1(
            &arr1(&[pred_sum.sum()]),
            &arr1(&[tp_sum.sum()]),
            &arr1(&[true_sum.sum()]),
        );
        report.push(self.key("overall", "precision"), overall_precision[0]);
        report.push(self.key("overall", "recall"), overall_recall[0]);
        report.push(self.key("overall", "f1"), overall_f1[0]);
        report
    }

    /// Score a batch and compute in one call.
    pub fn forward(
        &mut self,
        predictions: &[Vec<&str>],
        references: &[Vec<&str>],
    ) -> Result<Report, ScoringError> {
        self.update(predictions, references)?;
        Ok(self.compute())
    }

    /// Clear the accumulated counts. The configuration is kept.
    pub fn reset(&mut self) {
        self.pred_sum.fill(0);
        self.tp_sum.fill(0);
        self.true_sum.fill(0);
    }

    /// Fold the counts of `other` into this metric, as if both had seen every batch.
    ///
    /// Both metrics must share the same labels, suffix convention, scheme and mode. The stage is
    /// cosmetic and may differ. Merging is commutative and associative over the counts, so
    /// per worker metrics can be combined in any order.
    pub fn merge(&mut self, other: &Seqeval) -> Result<(), MergeError> {
        if !self.scoring_config_matches(other) {
            return Err(MergeError::ConfigMismatch);
        }
        self.pred_sum += &other.pred_sum;
        self.tp_sum += &other.tp_sum;
        self.true_sum += &other.true_sum;
        Ok(())
    }

    fn key(&self, label: &str, metric: &str) -> String {
        match &self.stage {
            Some(stage) => format!("{stage}_{label}_{metric}"),
            None => format!("{label}_{metric}"),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn pred_sum(&self) -> &Array1<u64> {
        &self.pred_sum
    }

    pub fn tp_sum(&self) -> &Array1<u64> {
        &self.tp_sum
    }

    pub fn true_sum(&self) -> &Array1<u64> {
        &self.true_sum
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The metric could not be configured.
pub enum ConfigError {
    /// The same label was given more than once.
    DuplicateLabel(String),
    /// Strict matching was requested without a scheme to parse against.
    StrictModeRequiresScheme,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateLabel(label) => write!(f, "Duplicate label: {}", label),
            Self::StrictModeRequiresScheme => write!(f, "Strict matching requires a scheme"),
        }
    }
}
impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Two metrics could not be merged.
pub enum MergeError {
    /// The labels, suffix convention, scheme or mode differ.
    ConfigMismatch,
}

impl Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigMismatch => {
                write!(f, "Cannot merge metrics with different scoring configurations")
            }
        }
    }
}
impl Error for MergeError {}

/// Elementwise division where a zero denominator resolves to zero instead of NaN or infinity.
fn safe_divide<F: Float>(numerator: &Array1<F>, denominator: &Array1<F>) -> Array1<F> {
    Zip::from(numerator)
        .and(denominator)
        .map_collect(|&num, &den| if den == F::zero() { F::zero() } else { num / den })
}

/// Elementwise precision, recall and F1 from count vectors. F1 is computed directly from the
/// counts as `2 * tp / (pred + true)`, so a label without predictions and without references
/// scores zero across the board.
fn precision_recall_f1<F: Float>(
    pred_sum: &Array1<F>,
    tp_sum: &Array1<F>,
    true_sum: &Array1<F>,
) -> (Array1<F>, Array1<F>, Array1<F>) {
    let precision = safe_divide(tp_sum, pred_sum);
    let recall = safe_divide(tp_sum, true_sum);
    let two = F::one() + F::one();
    let f1 = safe_divide(&tp_sum.mapv(|v| two * v), &(pred_sum + true_sum));
    (precision, recall, f1)
}

/// The scores of a [`Seqeval::compute`] call, as an insertion ordered list of named values.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Report {
    entries: Vec<(String, f32)>,
}

impl Report {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, key: String, value: f32) {
        self.entries.push((key, value));
    }

    /// Look up a score by its full key, such as `"PER_f1"` or `"overall_precision"`.
    pub fn get(&self, key: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metric, Value")?;
        for (name, value) in &self.entries {
            writeln!(f, "{}, {}", name, value)?;
        }
        Ok(())
    }
}

impl IntoIterator for Report {
    type Item = (String, f32);
    type IntoIter = std::vec::IntoIter<(String, f32)>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<Report> for HashMap<String, f32> {
    fn from(report: Report) -> Self {
        report.entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

    fn metric(labels: &[&str]) -> Seqeval {
        Seqeval::new(labels).unwrap()
    }

    fn batch(sequences: &[&[&'static str]]) -> Vec<Vec<&'static str>> {
        sequences.iter().map(|seq| seq.to_vec()).collect()
    }

    #[derive(Debug, Clone, Copy)]
    enum TagToken {
        BeginPer,
        InsidePer,
        BeginLoc,
        InsideLoc,
        Outside,
    }

    impl TagToken {
        fn as_str(self) -> &'static str {
            match self {
                Self::BeginPer => "B-PER",
                Self::InsidePer => "I-PER",
                Self::BeginLoc => "B-LOC",
                Self::InsideLoc => "I-LOC",
                Self::Outside => "O",
            }
        }
    }

    impl Arbitrary for TagToken {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&[
                Self::BeginPer,
                Self::InsidePer,
                Self::BeginLoc,
                Self::InsideLoc,
                Self::Outside,
            ])
            .unwrap()
        }
    }

    /// Turn generated token pairs into an update batch. Predictions and references get the same
    /// sequence lengths by construction.
    fn to_batches(tokens: &[Vec<(TagToken, TagToken)>]) -> (Vec<Vec<&'static str>>, Vec<Vec<&'static str>>) {
        let predictions = tokens
            .iter()
            .map(|seq| seq.iter().map(|(p, _)| p.as_str()).collect())
            .collect();
        let references = tokens
            .iter()
            .map(|seq| seq.iter().map(|(_, t)| t.as_str()).collect())
            .collect();
        (predictions, references)
    }

    #[test]
    fn test_property_merge_is_commutative() {
        fn merge_is_commutative(
            first: Vec<Vec<(TagToken, TagToken)>>,
            second: Vec<Vec<(TagToken, TagToken)>>,
        ) -> TestResult {
            if first.is_empty() || second.is_empty() {
                return TestResult::discard();
            }
            let (pred_a, true_a) = to_batches(&first);
            let (pred_b, true_b) = to_batches(&second);
            let mut a = metric(&["PER", "LOC"]);
            let mut b = metric(&["PER", "LOC"]);
            a.update(&pred_a, &true_a).unwrap();
            b.update(&pred_b, &true_b).unwrap();
            let mut a_then_b = a.clone();
            a_then_b.merge(&b).unwrap();
            let mut b_then_a = b.clone();
            b_then_a.merge(&a).unwrap();
            TestResult::from_bool(a_then_b == b_then_a)
        }
        let mut qc = QuickCheck::new().tests(500);
        qc.quickcheck(
            merge_is_commutative
                as fn(
                    first: Vec<Vec<(TagToken, TagToken)>>,
                    second: Vec<Vec<(TagToken, TagToken)>>,
                ) -> TestResult,
        )
    }

    #[test]
    fn test_property_merge_is_associative() {
        fn merge_is_associative(
            first: Vec<Vec<(TagToken, TagToken)>>,
            second: Vec<Vec<(TagToken, TagToken)>>,
            third: Vec<Vec<(TagToken, TagToken)>>,
        ) -> TestResult {
            if first.is_empty() || second.is_empty() || third.is_empty() {
                return TestResult::discard();
            }
            let (pred_a, true_a) = to_batches(&first);
            let (pred_b, true_b) = to_batches(&second);
            let (pred_c, true_c) = to_batches(&third);
            let mut a = metric(&["PER", "LOC"]);
            let mut b = metric(&["PER", "LOC"]);
            let mut c = metric(&["PER", "LOC"]);
            a.update(&pred_a, &true_a).unwrap();
            b.update(&pred_b, &true_b).unwrap();
            c.update(&pred_c, &true_c).unwrap();
            // ((a + b) + c) against (a + (b + c)).
            let mut left = a.clone();
            left.merge(&b).unwrap();
            left.merge(&c).unwrap();
            let mut bc = b.clone();
            bc.merge(&c).unwrap();
            let mut right = a.clone();
            right.merge(&bc).unwrap();
            TestResult::from_bool(left == right && left.compute() == right.compute())
        }
        let mut qc = QuickCheck::new().tests(500);
        qc.quickcheck(
            merge_is_associative
                as fn(
                    first: Vec<Vec<(TagToken, TagToken)>>,
                    second: Vec<Vec<(TagToken, TagToken)>>,
                    third: Vec<Vec<(TagToken, TagToken)>>,
                ) -> TestResult,
        )
    }

    #[test]
    fn test_property_merge_matches_sequential_updates() {
        fn merge_matches_sequential(
            first: Vec<Vec<(TagToken, TagToken)>>,
            second: Vec<Vec<(TagToken, TagToken)>>,
        ) -> TestResult {
            if first.is_empty() || second.is_empty() {
                return TestResult::discard();
            }
            let (pred_a, true_a) = to_batches(&first);
            let (pred_b, true_b) = to_batches(&second);
            let mut sequential = metric(&["PER", "LOC"]);
            sequential.update(&pred_a, &true_a).unwrap();
            sequential.update(&pred_b, &true_b).unwrap();
            let mut a = metric(&["PER", "LOC"]);
            let mut b = metric(&["PER", "LOC"]);
            a.update(&pred_a, &true_a).unwrap();
            b.update(&pred_b, &true_b).unwrap();
            a.merge(&b).unwrap();
            TestResult::from_bool(a == sequential)
        }
        let mut qc = QuickCheck::new().tests(500);
        qc.quickcheck(
            merge_matches_sequential
                as fn(
                    first: Vec<Vec<(TagToken, TagToken)>>,
                    second: Vec<Vec<(TagToken, TagToken)>>,
                ) -> TestResult,
        )
    }

    #[test]
    fn test_property_true_positives_bounded_by_counts() {
        fn bounded(tokens: Vec<Vec<(TagToken, TagToken)>>) -> TestResult {
            if tokens.is_empty() {
                return TestResult::discard();
            }
            let (predictions, references) = to_batches(&tokens);
            let mut m = metric(&["PER", "LOC"]);
            m.update(&predictions, &references).unwrap();
            TestResult::from_bool(
                multizip((m.tp_sum(), m.pred_sum(), m.true_sum()))
                    .all(|(tp, pred, truth)| tp <= pred && tp <= truth),
            )
        }
        let mut qc = QuickCheck::new().tests(500);
        qc.quickcheck(bounded as fn(tokens: Vec<Vec<(TagToken, TagToken)>>) -> TestResult)
    }

    #[test]
    fn test_property_compute_is_idempotent() {
        fn idempotent(tokens: Vec<Vec<(TagToken, TagToken)>>) -> TestResult {
            if tokens.is_empty() {
                return TestResult::discard();
            }
            let (predictions, references) = to_batches(&tokens);
            let mut m = metric(&["PER", "LOC"]);
            m.update(&predictions, &references).unwrap();
            TestResult::from_bool(m.compute() == m.compute())
        }
        let mut qc = QuickCheck::new().tests(500);
        qc.quickcheck(idempotent as fn(tokens: Vec<Vec<(TagToken, TagToken)>>) -> TestResult)
    }

    #[test]
    fn test_property_scores_within_unit_interval() {
        fn within_bounds(tokens: Vec<Vec<(TagToken, TagToken)>>) -> TestResult {
            if tokens.is_empty() {
                return TestResult::discard();
            }
            let (predictions, references) = to_batches(&tokens);
            let mut m = metric(&["PER", "LOC"]);
            m.update(&predictions, &references).unwrap();
            TestResult::from_bool(
                m.compute()
                    .iter()
                    .filter(|(name, _)| !name.ends_with("_number"))
                    .all(|(_, value)| (0.0..=1.0).contains(&value)),
            )
        }
        let mut qc = QuickCheck::new().tests(500);
        qc.quickcheck(within_bounds as fn(tokens: Vec<Vec<(TagToken, TagToken)>>) -> TestResult)
    }

    #[test]
    fn test_safe_division_resolves_to_zero() {
        let scores = safe_divide(&arr1(&[1.0_f32, 0.0]), &arr1(&[0.0, 0.0]));
        assert_eq!(scores, arr1(&[0.0, 0.0]));
    }

    #[test]
    fn test_key_prefixing() {
        let m = Seqeval::builder()
            .labels(["PER"])
            .stage("val")
            .build()
            .unwrap();
        let report = m.compute();
        assert_eq!(report.get("val_PER_f1"), Some(0.0));
        assert_eq!(report.get("val_overall_f1"), Some(0.0));
        assert_eq!(report.get("PER_f1"), None);
    }

    #[test]
    fn test_report_entry_order() {
        let m = metric(&["PER", "LOC"]);
        let report = m.compute();
        let keys: Vec<&str> = report.iter().map(|(name, _)| name).collect();
        assert_eq!(
            keys,
            vec![
                "PER_precision",
                "LOC_precision",
                "PER_recall",
                "LOC_recall",
                "PER_f1",
                "LOC_f1",
                "PER_number",
                "LOC_number",
                "overall_precision",
                "overall_recall",
                "overall_f1",
            ]
        );
    }

    #[test]
    fn test_update_ignores_out_of_vocabulary_labels() {
        let mut m = metric(&["PER"]);
        let tokens = batch(&[&["B-PER", "O", "B-LOC"]]);
        m.update(&tokens, &tokens).unwrap();
        assert_eq!(m.pred_sum(), &arr1(&[1]));
        assert_eq!(m.true_sum(), &arr1(&[1]));
    }

    #[test]
    fn test_reset_keeps_configuration() {
        let mut m = metric(&["PER"]);
        let tokens = batch(&[&["B-PER"]]);
        m.update(&tokens, &tokens).unwrap();
        m.reset();
        assert_eq!(m, metric(&["PER"]));
    }

    #[test]
    fn test_merge_rejects_different_labels() {
        let mut a = metric(&["PER"]);
        let b = metric(&["LOC"]);
        assert_eq!(a.merge(&b), Err(MergeError::ConfigMismatch));
    }

    #[test]
    fn test_equality_ignores_stage() {
        let mut train = Seqeval::builder().labels(["PER"]).stage("train").build().unwrap();
        let mut val = Seqeval::builder().labels(["PER"]).stage("val").build().unwrap();
        let tokens = batch(&[&["B-PER"]]);
        train.update(&tokens, &tokens).unwrap();
        val.update(&tokens, &tokens).unwrap();
        assert_eq!(train, val);
        assert_ne!(train.compute(), val.compute());
    }

    #[test]
    fn test_merge_allows_different_stages() {
        let mut a = Seqeval::builder().labels(["PER"]).stage("train").build().unwrap();
        let b = Seqeval::builder().labels(["PER"]).stage("val").build().unwrap();
        assert!(a.merge(&b).is_ok());
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        assert_eq!(
            Seqeval::new(&["PER", "PER"]),
            Err(ConfigError::DuplicateLabel(String::from("PER")))
        );
    }

    #[test]
    fn test_strict_mode_requires_scheme() {
        assert_eq!(
            Seqeval::builder().labels(["PER"]).mode(Mode::Strict).build(),
            Err(ConfigError::StrictModeRequiresScheme)
        );
    }
}
