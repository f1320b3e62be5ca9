/**
Builder for configuring a [`Seqeval`] metric beyond its defaults. The default configuration uses
prefixed tokens, lenient matching, no scheme and no stage prefix.
*/
use crate::metric::{ConfigError, Seqeval};
use crate::schemes::{Mode, SchemeType};

/// Incremental configuration of a [`Seqeval`] metric.
///
/// ```
/// use seqmetric::{Mode, SchemeType, Seqeval};
///
/// let metric = Seqeval::builder()
///     .labels(["PER", "LOC"])
///     .scheme(SchemeType::IOB2)
///     .mode(Mode::Strict)
///     .stage("val")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeqevalBuilder {
    labels: Vec<String>,
    suffix: bool,
    scheme: Option<SchemeType>,
    mode: Mode,
    stage: Option<String>,
}

impl SeqevalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The label vocabulary. Ordering is preserved in the computed report.
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.labels = labels
            .into_iter()
            .map(|label| String::from(label.as_ref()))
            .collect();
        self
    }

    /// Expect tokens of the form `PER-B` instead of `B-PER`.
    pub fn suffix(mut self, suffix: bool) -> Self {
        self.suffix = suffix;
        self
    }

    /// The tagging scheme used when matching strictly.
    pub fn scheme(mut self, scheme: SchemeType) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Prefix every report key with `{stage}_`.
    pub fn stage<S: AsRef<str>>(mut self, stage: S) -> Self {
        self.stage = Some(String::from(stage.as_ref()));
        self
    }

    pub fn build(self) -> Result<Seqeval, ConfigError> {
        Seqeval::with_config(self.labels, self.suffix, self.scheme, self.mode, self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Mode::Lenient)]
    #[case(Mode::Strict)]
    fn test_mode_setter(#[case] mode: Mode) {
        let builder = SeqevalBuilder::new().mode(mode);
        assert_eq!(builder.mode, mode);
    }

    #[rstest]
    #[case(SchemeType::IOB1)]
    #[case(SchemeType::IOB2)]
    #[case(SchemeType::IOE1)]
    #[case(SchemeType::IOE2)]
    #[case(SchemeType::IOBES)]
    #[case(SchemeType::BILOU)]
    fn test_scheme_setter(#[case] scheme: SchemeType) {
        let builder = SeqevalBuilder::new().scheme(scheme);
        assert_eq!(builder.scheme, Some(scheme));
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_suffix_setter(#[case] suffix: bool) {
        let builder = SeqevalBuilder::new().suffix(suffix);
        assert_eq!(builder.suffix, suffix);
    }

    #[test]
    fn test_labels_setter_preserves_order() {
        let builder = SeqevalBuilder::new().labels(["PER", "LOC", "ORG"]);
        assert_eq!(builder.labels, vec!["PER", "LOC", "ORG"]);
    }

    #[test]
    fn test_stage_setter() {
        let builder = SeqevalBuilder::new().stage("train");
        assert_eq!(builder.stage.as_deref(), Some("train"));
    }

    #[test]
    fn test_default_is_lenient_without_scheme() {
        let metric = SeqevalBuilder::new().labels(["PER"]).build().unwrap();
        assert_eq!(metric.labels(), ["PER"]);
    }
}
