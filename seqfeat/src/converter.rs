use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::{ConversionConfig, SplitConfig};
use crate::error::{Result, SeqfeatError};
use crate::escape::escape;
use crate::extractor::{FeatureExtractor, Row};
use crate::history::{HistoryAggregator, HistoryTable, LabelHistory, OrderSets};
use crate::sentence::{Sentence, SentenceReader};
use crate::window::PaddedSequence;

/// Counts reported after a split has been converted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitSummary {
    pub name: String,
    pub sentences: usize,
    pub rows: usize,
    pub labels: usize,
    /// Distinct features in the history table, if one was built.
    pub table_features: Option<usize>,
    /// Lines written to the history table, if one was built.
    pub table_entries: Option<usize>,
}

/// Converts corpus splits into feature rows and history tables.
pub struct Converter {
    extractor: FeatureExtractor,
    orders: OrderSets,
    filler_length: usize,
}

impl Converter {
    /// Creates a new instance of [`Converter`] from the shared settings of
    /// `config`. Splits are passed separately.
    pub fn new(config: &ConversionConfig) -> Self {
        Converter {
            extractor: FeatureExtractor::new(config.templates),
            orders: config.orders.to_order_sets(),
            filler_length: config.filler_length,
        }
    }

    /// Writes the rows of one sentence followed by a blank line, and feeds
    /// them to `aggregator` when given.
    ///
    /// # Returns
    /// The number of rows written, which is the sentence length plus one.
    pub fn convert_sentence<W: Write>(
        &self,
        sentence: &Sentence,
        writer: &mut W,
        mut aggregator: Option<&mut HistoryAggregator>,
    ) -> Result<usize> {
        let seq = PaddedSequence::new(sentence, self.filler_length)?;
        let mut history = LabelHistory::new();

        for i in seq.positions() {
            let row = self.extractor.extract(&seq, i);
            write_row(writer, &row)?;

            history.push(row.label.as_str());
            if let Some(aggregator) = aggregator.as_deref_mut() {
                aggregator.update(&history, i - seq.filler(), &row.features);
            }
        }
        writeln!(writer)?;

        Ok(seq.len())
    }

    /// Converts every sentence of `reader` into `writer`.
    ///
    /// A history table is built and returned when `aggregate` is set. The
    /// `running` flag is checked before each sentence; once cleared the
    /// conversion stops with [`SeqfeatError::Interrupted`].
    pub fn convert_reader<R: BufRead, W: Write>(
        &self,
        name: &str,
        reader: R,
        writer: &mut W,
        max_sentences: usize,
        aggregate: bool,
        running: &AtomicBool,
    ) -> Result<(SplitSummary, Option<HistoryTable>)> {
        let mut sentences = SentenceReader::new(reader).with_limit(max_sentences);
        let mut aggregator = aggregate.then(|| HistoryAggregator::new(self.orders.clone()));
        let mut summary = SplitSummary {
            name: name.to_string(),
            ..Default::default()
        };

        for sentence in sentences.by_ref() {
            if !running.load(Ordering::SeqCst) {
                warn!(split = name, sentences = summary.sentences, "conversion interrupted");
                return Err(SeqfeatError::Interrupted(name.to_string()));
            }
            let sentence = sentence?;
            summary.rows += self.convert_sentence(&sentence, writer, aggregator.as_mut())?;
            summary.sentences += 1;
            if summary.sentences % 1000 == 0 {
                debug!(split = name, sentences = summary.sentences, "converting");
            }
        }

        summary.labels = sentences.labels().len();
        let table = aggregator.map(|aggregator| aggregator.finalize(sentences.labels()));
        if let Some(table) = &table {
            summary.table_features = Some(table.num_features());
        }
        Ok((summary, table))
    }

    /// Converts one split from its input file.
    ///
    /// Outputs are written to temporary files next to their destinations
    /// and moved into place only once the whole split has succeeded.
    pub fn convert_split(
        &self,
        split: &SplitConfig,
        running: &AtomicBool,
    ) -> Result<SplitSummary> {
        info!(split = %split.name, input = %split.input.display(), "converting split");

        let input = File::open(&split.input).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => SeqfeatError::MissingSplitSource {
                split: split.name.clone(),
                path: split.input.clone(),
            },
            _ => SeqfeatError::Io(err),
        })?;

        let output = temp_file_for(&split.output)?;
        let (mut summary, table) = {
            let mut writer = BufWriter::new(output.as_file());
            let converted = self.convert_reader(
                &split.name,
                BufReader::new(input),
                &mut writer,
                split.sentence_limit(),
                split.generates_features(),
                running,
            )?;
            writer.flush()?;
            converted
        };

        let features = match (&table, &split.features) {
            (Some(table), Some(path)) => {
                let file = temp_file_for(path)?;
                {
                    let mut writer = BufWriter::new(file.as_file());
                    summary.table_entries = Some(table.write_to(&mut writer)?);
                    writer.flush()?;
                }
                Some((file, path))
            }
            _ => None,
        };

        persist(output, &split.output)?;
        if let Some((file, path)) = features {
            persist(file, path)?;
        }

        info!(
            split = %summary.name,
            sentences = summary.sentences,
            rows = summary.rows,
            labels = summary.labels,
            table_entries = ?summary.table_entries,
            "split converted"
        );
        Ok(summary)
    }
}

/// Converts every split of `config` in order.
///
/// All split inputs are checked before anything is written.
///
/// # Errors
/// Returns [`SeqfeatError::MissingSplitSource`] for the first split whose
/// input does not exist, or the first error raised while converting.
pub fn run(config: &ConversionConfig, running: &AtomicBool) -> Result<Vec<SplitSummary>> {
    config.validate()?;
    for split in &config.splits {
        if !split.input.is_file() {
            return Err(SeqfeatError::MissingSplitSource {
                split: split.name.clone(),
                path: split.input.clone(),
            });
        }
    }

    let converter = Converter::new(config);
    config
        .splits
        .iter()
        .map(|split| converter.convert_split(split, running))
        .collect()
}

fn write_row<W: Write>(writer: &mut W, row: &Row) -> io::Result<()> {
    write!(writer, "{}", escape(&row.label))?;
    for feature in &row.features {
        write!(writer, "\t{}", escape(feature.name()))?;
    }
    writeln!(writer)
}

fn temp_file_for(path: &Path) -> io::Result<NamedTempFile> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => NamedTempFile::new_in(dir),
        _ => NamedTempFile::new_in("."),
    }
}

fn persist(file: NamedTempFile, path: &Path) -> io::Result<()> {
    file.persist(path).map(|_| ()).map_err(|err| err.error)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::io::Cursor;

    use tempfile::TempDir;

    use crate::config::OrderConfig;
    use crate::extractor::TemplateSet;
    use crate::history::OrderPreset;
    use crate::BOUNDARY;

    const CORPUS: &str = "NN\tdog\nVB\truns\n\nDT\tThe\nNN\tF-16\nVB\tflies\n\n";

    type Converted = (String, SplitSummary, Option<HistoryTable>);

    fn convert(corpus: &str, aggregate: bool) -> Result<Converted> {
        let converter = Converter::new(&ConversionConfig::new(vec![]));
        let mut out = Vec::new();
        let running = AtomicBool::new(true);
        let (summary, table) = converter.convert_reader(
            "train",
            Cursor::new(corpus),
            &mut out,
            0,
            aggregate,
            &running,
        )?;
        Ok((String::from_utf8(out).unwrap(), summary, table))
    }

    fn split(dir: &Path, name: &str, corpus: &str, features: bool) -> io::Result<SplitConfig> {
        let input = dir.join(format!("{}.txt", name));
        fs::write(&input, corpus)?;
        Ok(SplitConfig {
            name: name.to_string(),
            input,
            output: dir.join(format!("{}_data.txt", name)),
            features: features.then(|| dir.join(format!("{}_features.txt", name))),
            max_sentences: None,
        })
    }

    #[test]
    fn test_convert_sentence_rows() -> Result<(), Box<dyn std::error::Error>> {
        let (output, summary, table) = convert(CORPUS, false)?;

        assert!(table.is_none());
        assert_eq!(summary.sentences, 2);
        assert_eq!(summary.rows, 2 + 1 + 3 + 1);
        assert_eq!(summary.labels, 3);

        let blocks: Vec<&str> = output.split("\n\n").filter(|b| !b.is_empty()).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines().count(), 3);
        assert_eq!(blocks[1].lines().count(), 4);

        let first: Vec<&str> = blocks[0].lines().next().unwrap().split('\t').collect();
        assert_eq!(
            first[..7],
            ["NN", "LABEL", "W0_dog", "W-1_", "W+1_runs", "W-10__dog", "W0+1_dog_runs"]
        );

        for block in &blocks {
            let last: Vec<&str> = block.lines().last().unwrap().split('\t').collect();
            assert_eq!(last[0], BOUNDARY);
            assert_eq!(last.len(), 1 + 9);
        }

        let f16 = blocks[1].lines().nth(1).unwrap();
        assert!(f16.ends_with("\tCONTAIN_NUMBER\tCONTAIN_UPPER\tCONTAIN_HYPHEN"));
        Ok(())
    }

    #[test]
    fn test_convert_escapes_fields() -> Result<(), Box<dyn std::error::Error>> {
        let (output, _, _) = convert("A:B\ta:b#c\\d\n\n", false)?;
        let first = output.lines().next().unwrap();

        assert!(first.starts_with("A\\:B\tLABEL\tW0_a\\:b\\#c\\\\d\t"));
        Ok(())
    }

    #[test]
    fn test_convert_builds_table() -> Result<(), Box<dyn std::error::Error>> {
        let (_, summary, table) = convert(CORPUS, true)?;
        let table = table.unwrap();

        assert_eq!(summary.table_features, Some(table.num_features()));
        let label = table.get("LABEL").unwrap();
        for l in ["NN", "VB", "DT"] {
            assert!(label.iter().any(|t| t.labels() == [BOUNDARY, l]));
            assert!(label.iter().any(|t| t.labels() == [l, BOUNDARY]));
        }
        assert!(table.get("W0_dog").is_some());
        assert!(table.get("CONTAIN_HYPHEN").is_some());
        Ok(())
    }

    #[test]
    fn test_interrupted() {
        let converter = Converter::new(&ConversionConfig::new(vec![]));
        let running = AtomicBool::new(false);
        let result = converter.convert_reader(
            "train",
            Cursor::new(CORPUS),
            &mut io::sink(),
            0,
            true,
            &running,
        );
        assert!(matches!(result, Err(SeqfeatError::Interrupted(name)) if name == "train"));
    }

    #[test]
    fn test_run_writes_outputs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let mut config = ConversionConfig::new(vec![
            split(dir.path(), "train", CORPUS, true)?,
            split(dir.path(), "test", "NN\tcat\n\n", false)?,
        ]);
        config.templates = TemplateSet::WithSecondPrevious;
        config.orders = OrderConfig::Preset(OrderPreset::Alternate);

        let summaries = run(&config, &AtomicBool::new(true))?;

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].sentences, 2);
        assert!(summaries[0].table_entries.unwrap() > 0);
        assert_eq!(summaries[1].table_entries, None);

        let train = fs::read_to_string(dir.path().join("train_data.txt"))?;
        assert!(train.contains("\tW-2_dog\t"));

        let features = fs::read_to_string(dir.path().join("train_features.txt"))?;
        assert_eq!(features.lines().count(), summaries[0].table_entries.unwrap());
        assert!(features.contains("LABEL\t__BOS_EOS__\tDT\n"));
        assert!(!dir.path().join("test_features.txt").exists());
        Ok(())
    }

    #[test]
    fn test_run_limits_sentences() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let mut train = split(dir.path(), "train", CORPUS, false)?;
        train.max_sentences = Some(1);

        let summaries = run(&ConversionConfig::new(vec![train]), &AtomicBool::new(true))?;
        assert_eq!(summaries[0].sentences, 1);
        assert_eq!(summaries[0].rows, 3);
        Ok(())
    }

    #[test]
    fn test_missing_split_source_before_processing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let train = split(dir.path(), "train", CORPUS, true)?;
        let mut test = split(dir.path(), "test", CORPUS, false)?;
        test.input = dir.path().join("absent.txt");

        let result = run(&ConversionConfig::new(vec![train, test]), &AtomicBool::new(true));

        assert!(matches!(
            result,
            Err(SeqfeatError::MissingSplitSource { split, .. }) if split == "test"
        ));
        assert!(!dir.path().join("train_data.txt").exists());
        Ok(())
    }

    #[test]
    fn test_malformed_split_leaves_no_output() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let train = split(dir.path(), "train", "NN\tdog\n\nbroken row\n\n", true)?;

        let result = run(&ConversionConfig::new(vec![train]), &AtomicBool::new(true));

        assert!(matches!(result, Err(SeqfeatError::MalformedSentenceRow { line: 3, .. })));
        assert!(!dir.path().join("train_data.txt").exists());
        assert!(!dir.path().join("train_features.txt").exists());
        Ok(())
    }
}
