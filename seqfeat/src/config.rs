use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqfeatError};
use crate::extractor::TemplateSet;
use crate::history::{OrderPreset, OrderSets};
use crate::window::{DEFAULT_FILLER_LENGTH, MAX_OFFSET};

/// Order sets given either by preset name or as an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderConfig {
    Preset(OrderPreset),
    Custom(Vec<Vec<usize>>),
}

impl Default for OrderConfig {
    fn default() -> Self {
        OrderConfig::Preset(OrderPreset::Standard)
    }
}

impl OrderConfig {
    pub fn to_order_sets(&self) -> OrderSets {
        match self {
            OrderConfig::Preset(preset) => OrderSets::preset(*preset),
            OrderConfig::Custom(orders) => OrderSets::new(orders.clone()),
        }
    }
}

/// One corpus split: where to read it and where its outputs go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Feature table to write. No table is built for the split when absent.
    #[serde(default)]
    pub features: Option<PathBuf>,
    /// Maximum number of sentences to convert, `0` or absent for all.
    #[serde(default)]
    pub max_sentences: Option<usize>,
}

impl SplitConfig {
    pub fn generates_features(&self) -> bool {
        self.features.is_some()
    }

    pub fn sentence_limit(&self) -> usize {
        self.max_sentences.unwrap_or(0)
    }
}

fn default_filler_length() -> usize {
    DEFAULT_FILLER_LENGTH
}

/// Settings shared by every split of a conversion run.
///
/// # Example
/// ```
/// use seqfeat::config::ConversionConfig;
///
/// let config = ConversionConfig::from_reader(r#"{
///     "templates": "with_second_previous",
///     "orders": "alternate",
///     "splits": [
///         {"name": "train", "input": "train.txt", "output": "train_data.txt",
///          "features": "features.txt"},
///         {"name": "test", "input": "test.txt", "output": "test_data.txt"}
///     ]
/// }"#.as_bytes()).unwrap();
///
/// assert_eq!(config.filler_length, 10);
/// assert!(config.splits[0].generates_features());
/// assert!(!config.splits[1].generates_features());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "default_filler_length")]
    pub filler_length: usize,
    #[serde(default)]
    pub templates: TemplateSet,
    #[serde(default)]
    pub orders: OrderConfig,
    pub splits: Vec<SplitConfig>,
}

impl ConversionConfig {
    /// Creates a configuration with default settings for `splits`.
    pub fn new(splits: Vec<SplitConfig>) -> Self {
        ConversionConfig {
            filler_length: DEFAULT_FILLER_LENGTH,
            templates: TemplateSet::default(),
            orders: OrderConfig::default(),
            splits,
        }
    }

    /// Loads and validates a JSON configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Reads and validates a JSON configuration.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: ConversionConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if self.filler_length < MAX_OFFSET {
            return Err(SeqfeatError::invalid_config(format!(
                "filler_length must be at least {}, got {}",
                MAX_OFFSET, self.filler_length
            )));
        }
        if self.splits.is_empty() {
            return Err(SeqfeatError::invalid_config("no splits configured"));
        }
        let mut names = HashSet::new();
        for split in &self.splits {
            if !names.insert(split.name.as_str()) {
                return Err(SeqfeatError::invalid_config(format!(
                    "duplicate split name {:?}",
                    split.name
                )));
            }
        }
        Ok(())
    }
}
