use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::window::{PaddedSequence, Window};

/// Name of the constant feature emitted first on every row.
pub const LABEL_FEATURE: &str = "LABEL";

/// Number of leading features a boundary row keeps.
pub const BOUNDARY_FEATURES: usize = 9;

/// Longest prefix/suffix emitted as an affix feature.
pub const MAX_AFFIX_LENGTH: usize = 10;

/// A concrete feature instance such as `W-1_foo`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Feature {
    name: String,
}

impl Feature {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Feature { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Hash for Feature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.as_str().hash(state)
    }
}

impl Borrow<str> for Feature {
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The features of one position, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub label: String,
    pub features: Vec<Feature>,
}

/// Layout of the fixed templates at the head of every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSet {
    /// `LABEL, W0, W-1, W+1, W-10, W0+1, W-2-1, W-2-10, W-3-2-1`
    #[default]
    Standard,
    /// As [`Standard`](Self::Standard) with `W-2` inserted after `W-1`.
    WithSecondPrevious,
}

impl TemplateSet {
    /// Number of fixed templates in the layout.
    pub fn len(&self) -> usize {
        match self {
            TemplateSet::Standard => 9,
            TemplateSet::WithSecondPrevious => 10,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Window Feature Extractor.
///
/// Produces the ordered feature list of a position from its token window:
/// the fixed templates, then suffix/prefix features per length, then
/// character-class flags.
pub struct FeatureExtractor {
    templates: TemplateSet,
    patterns: Vec<(Regex, &'static str)>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(TemplateSet::default())
    }
}

impl FeatureExtractor {
    /// Creates a new instance of [`FeatureExtractor`] for the given layout.
    ///
    /// # Example
    /// ```
    /// use seqfeat::extractor::{FeatureExtractor, TemplateSet};
    ///
    /// let extractor = FeatureExtractor::new(TemplateSet::Standard);
    /// assert_eq!(
    ///     extractor.char_classes("A-1"),
    ///     vec!["CONTAIN_NUMBER", "CONTAIN_UPPER", "CONTAIN_HYPHEN"]
    /// );
    /// ```
    pub fn new(templates: TemplateSet) -> Self {
        let patterns = vec![
            (Regex::new(r"[0-9]").unwrap(), "CONTAIN_NUMBER"),
            (Regex::new(r"[A-Z]").unwrap(), "CONTAIN_UPPER"),
            (Regex::new(r"-").unwrap(), "CONTAIN_HYPHEN"),
        ];

        FeatureExtractor {
            templates,
            patterns,
        }
    }

    pub fn templates(&self) -> TemplateSet {
        self.templates
    }

    /// Extracts the row at padded index `i` of `seq`.
    ///
    /// # Panics
    /// Panics if `i` is not one of `seq.positions()`.
    ///
    /// # Example
    /// ```
    /// use seqfeat::extractor::FeatureExtractor;
    /// use seqfeat::sentence::Sentence;
    /// use seqfeat::window::PaddedSequence;
    ///
    /// let sentence = Sentence::from_iter([("NN", "dog"), ("VB", "runs")]);
    /// let seq = PaddedSequence::new(&sentence, 10).unwrap();
    /// let row = FeatureExtractor::default().extract(&seq, 10);
    ///
    /// assert_eq!(row.label, "NN");
    /// assert_eq!(row.features[1].name(), "W0_dog");
    /// ```
    pub fn extract(&self, seq: &PaddedSequence, i: usize) -> Row {
        let window = seq.window(i);
        let mut features = self.template_features(&window);

        if window.is_boundary() {
            features.truncate(BOUNDARY_FEATURES);
        } else {
            let token = window.token(0);
            features.extend(affixes(token));
            features.extend(self.char_classes(token).into_iter().map(Feature::new));
        }

        Row {
            label: window.label().to_string(),
            features,
        }
    }

    /// Returns the character-class flags that `token` matches, in order.
    pub fn char_classes(&self, token: &str) -> Vec<&'static str> {
        self.patterns
            .iter()
            .filter(|(pattern, _)| pattern.is_match(token))
            .map(|(_, name)| *name)
            .collect()
    }

    fn template_features(&self, w: &Window<'_>) -> Vec<Feature> {
        let w_3 = w.token(-3);
        let w_2 = w.token(-2);
        let w_1 = w.token(-1);
        let w0 = w.token(0);
        let w1 = w.token(1);

        let mut features = Vec::with_capacity(self.templates.len() + 2 * MAX_AFFIX_LENGTH + 3);
        features.push(Feature::new(LABEL_FEATURE));
        features.push(Feature::new(format!("W0_{}", w0)));
        features.push(Feature::new(format!("W-1_{}", w_1)));
        if self.templates == TemplateSet::WithSecondPrevious {
            features.push(Feature::new(format!("W-2_{}", w_2)));
        }
        features.push(Feature::new(format!("W+1_{}", w1)));
        features.push(Feature::new(format!("W-10_{}_{}", w_1, w0)));
        features.push(Feature::new(format!("W0+1_{}_{}", w0, w1)));
        features.push(Feature::new(format!("W-2-1_{}_{}", w_2, w_1)));
        features.push(Feature::new(format!("W-2-10_{}_{}_{}", w_2, w_1, w0)));
        features.push(Feature::new(format!("W-3-2-1_{}_{}_{}", w_3, w_2, w_1)));
        features
    }
}

/// Suffix and prefix features of `token` for every length it covers,
/// suffix first within each length.
fn affixes(token: &str) -> Vec<Feature> {
    let chars: Vec<char> = token.chars().collect();
    let mut features = Vec::with_capacity(2 * MAX_AFFIX_LENGTH);
    for j in 1..=MAX_AFFIX_LENGTH.min(chars.len()) {
        let suffix: String = chars[chars.len() - j..].iter().collect();
        let prefix: String = chars[..j].iter().collect();
        features.push(Feature::new(format!("suf{}_{}", j, suffix)));
        features.push(Feature::new(format!("pre{}_{}", j, prefix)));
    }
    features
}
