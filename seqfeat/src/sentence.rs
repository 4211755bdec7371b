use std::collections::BTreeSet;
use std::io::BufRead;

use crate::error::{Result, SeqfeatError};

/// A labeled token sequence read from the corpus.
///
/// Only real positions are stored; the trailing boundary pair is appended
/// when the sentence is padded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pairs: Vec<(String, String)>,
}

impl Sentence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<L, T>(&mut self, label: L, token: T)
    where
        L: Into<String>,
        T: Into<String>,
    {
        self.pairs.push((label.into(), token.into()));
    }

    /// Returns the `(label, token)` pairs in order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<L, T> FromIterator<(L, T)> for Sentence
where
    L: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (L, T)>>(iter: I) -> Self {
        let mut sentence = Sentence::new();
        for (label, token) in iter {
            sentence.push(label, token);
        }
        sentence
    }
}

/// Reads sentences from a `label<TAB>token` corpus where a blank line ends a
/// sentence.
///
/// The reader remembers every distinct label it has yielded, which is what
/// the history table needs for its boundary transitions.
pub struct SentenceReader<R> {
    reader: R,
    line_no: usize,
    max_sentences: usize,
    num_sentences: usize,
    labels: BTreeSet<String>,
    done: bool,
}

impl<R: BufRead> SentenceReader<R> {
    /// Creates a reader yielding every sentence of `reader`.
    pub fn new(reader: R) -> Self {
        SentenceReader {
            reader,
            line_no: 0,
            max_sentences: 0,
            num_sentences: 0,
            labels: BTreeSet::new(),
            done: false,
        }
    }

    /// Stops after `max_sentences` sentences. `0` means unlimited.
    pub fn with_limit(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences;
        self
    }

    /// Distinct labels of the sentences yielded so far.
    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn into_labels(self) -> BTreeSet<String> {
        self.labels
    }

    fn read_sentence(&mut self) -> Result<Option<Sentence>> {
        let mut sentence = Sentence::new();
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;

            let row = line
                .strip_suffix('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .unwrap_or(&line);
            if row.is_empty() {
                if sentence.is_empty() {
                    continue;
                }
                break;
            }

            let mut fields = row.split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(label), Some(token), None) => sentence.push(label, token),
                _ => {
                    return Err(SeqfeatError::MalformedSentenceRow {
                        line: self.line_no,
                        content: row.to_string(),
                    })
                }
            }
        }

        if sentence.is_empty() {
            return Ok(None);
        }
        for (label, _) in sentence.pairs() {
            if !self.labels.contains(label) {
                self.labels.insert(label.clone());
            }
        }
        self.num_sentences += 1;
        Ok(Some(sentence))
    }
}

impl<R: BufRead> Iterator for SentenceReader<R> {
    type Item = Result<Sentence>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || (self.max_sentences > 0 && self.num_sentences >= self.max_sentences) {
            return None;
        }
        match self.read_sentence() {
            Ok(Some(sentence)) => Some(Ok(sentence)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    fn read_all(corpus: &str) -> Result<Vec<Sentence>> {
        SentenceReader::new(Cursor::new(corpus)).collect()
    }

    #[test]
    fn test_read_sentences() -> Result<(), Box<dyn std::error::Error>> {
        let sentences = read_all("NN\tdog\nVB\truns\n\nDT\tthe\nNN\tcat\n\n")?;

        assert_eq!(sentences.len(), 2);
        assert_eq!(
            sentences[0],
            Sentence::from_iter([("NN", "dog"), ("VB", "runs")])
        );
        assert_eq!(sentences[1].pairs()[0], ("DT".to_string(), "the".to_string()));
        Ok(())
    }

    #[test]
    fn test_trailing_sentence_without_blank_line() -> Result<(), Box<dyn std::error::Error>> {
        let sentences = read_all("NN\tdog\n\nVB\truns")?;
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1].len(), 1);
        Ok(())
    }

    #[test]
    fn test_consecutive_blank_lines_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let sentences = read_all("\n\nNN\tdog\n\n\n\nVB\truns\n\n")?;
        assert_eq!(sentences.len(), 2);
        Ok(())
    }

    #[test]
    fn test_crlf_line_endings() -> Result<(), Box<dyn std::error::Error>> {
        let sentences = read_all("NN\tdog\r\n\r\n")?;
        assert_eq!(sentences[0].pairs()[0].1, "dog");
        Ok(())
    }

    #[test]
    fn test_empty_token_is_kept() -> Result<(), Box<dyn std::error::Error>> {
        let sentences = read_all("NN\t\n\n")?;
        assert_eq!(sentences[0].pairs()[0], ("NN".to_string(), String::new()));
        Ok(())
    }

    #[test]
    fn test_malformed_row() {
        let err = read_all("NN\tdog\nVB runs\n\n").unwrap_err();
        match err {
            SeqfeatError::MalformedSentenceRow { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "VB runs");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            read_all("NN\tdog\textra\n\n"),
            Err(SeqfeatError::MalformedSentenceRow { line: 1, .. })
        ));
    }

    #[test]
    fn test_error_stops_iteration() {
        let mut reader = SentenceReader::new(Cursor::new("bad\n\nNN\tdog\n\n"));
        assert!(matches!(reader.next(), Some(Err(_))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_limit_and_labels() -> Result<(), Box<dyn std::error::Error>> {
        let corpus = "NN\tdog\n\nVB\truns\n\nJJ\tbig\n\n";
        let mut reader = SentenceReader::new(Cursor::new(corpus)).with_limit(2);
        let sentences = reader.by_ref().collect::<Result<Vec<_>>>()?;

        assert_eq!(sentences.len(), 2);
        let labels: Vec<&str> = reader.labels().iter().map(String::as_str).collect();
        assert_eq!(labels, vec!["NN", "VB"]);

        let unlimited = SentenceReader::new(Cursor::new(corpus)).with_limit(0);
        assert_eq!(unlimited.count(), 3);
        Ok(())
    }
}
