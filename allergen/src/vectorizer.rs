//! TF-IDF features over word n-grams.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use hashbrown::{HashMap, HashSet};

use crate::errors::{AllergenError, Result};

/// Default n-gram range: unigrams and bigrams.
pub const DEFAULT_NGRAM_RANGE: (u8, u8) = (1, 2);

/// Default minimum document frequency, as an absolute count.
pub const DEFAULT_MIN_DF: usize = 2;

/// Default maximum document frequency, as a ratio of the corpus size.
pub const DEFAULT_MAX_DF: f64 = 0.95;

/// Default minimum token length in characters.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 2;

/// Settings of the vocabulary fit. They are stored with the vocabulary.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct VectorizerConfig {
    /// The smallest and largest n-gram length, in tokens.
    pub ngram_range: (u8, u8),

    /// Terms found in fewer documents are discarded.
    pub min_df: usize,

    /// Terms found in more than this ratio of documents are discarded.
    pub max_df: f64,

    /// Tokens shorter than this are skipped before n-grams are formed.
    pub min_token_len: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            ngram_range: DEFAULT_NGRAM_RANGE,
            min_df: DEFAULT_MIN_DF,
            max_df: DEFAULT_MAX_DF,
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
        }
    }
}

impl VectorizerConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(AllergenError::invalid_argument(
                "ngram_range",
                format!("invalid range ({min_n}, {max_n})"),
            ));
        }
        if self.min_df == 0 {
            return Err(AllergenError::invalid_argument(
                "min_df",
                "must be at least 1",
            ));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(AllergenError::invalid_argument(
                "max_df",
                format!("must be in (0, 1], got {}", self.max_df),
            ));
        }
        Ok(())
    }

    /// Calls `f` with every n-gram of a normalized text, in order of appearance.
    pub(crate) fn for_each_ngram<F>(&self, text: &str, mut f: F)
    where
        F: FnMut(&str),
    {
        let tokens: Vec<&str> = text
            .split_whitespace()
            .filter(|token| token.chars().count() >= self.min_token_len)
            .collect();
        let (min_n, max_n) = self.ngram_range;
        for n in usize::from(min_n)..=usize::from(max_n) {
            if n == 1 {
                tokens.iter().for_each(|token| f(token));
            } else {
                for window in tokens.windows(n) {
                    f(&window.join(" "));
                }
            }
        }
    }
}

/// Sparse feature vector sorted by feature index.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    dim: usize,
    entries: Vec<(u32, f64)>,
}

impl FeatureVector {
    /// Creates a feature vector from `(index, value)` pairs. Entries are sorted by index and
    /// duplicated indices are summed. Indices are not checked against `dim`.
    pub fn from_sparse<I>(dim: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, f64)>,
    {
        let mut merged = BTreeMap::new();
        for (i, v) in entries {
            *merged.entry(i).or_insert(0.0) += v;
        }
        Self {
            dim,
            entries: merged.into_iter().collect(),
        }
    }

    /// Creates a feature vector from a dense slice, dropping zeros.
    pub fn from_dense(values: &[f64]) -> Self {
        Self {
            dim: values.len(),
            entries: values
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0.0)
                .map(|(i, &v)| (i as u32, v))
                .collect(),
        }
    }

    /// Length of the vector, which is the vocabulary size.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Non-zero entries sorted by index.
    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|&(_, v)| v == 0.0)
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.dim];
        for &(i, v) in &self.entries {
            if let Some(slot) = values.get_mut(i as usize) {
                *slot = v;
            }
        }
        values
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|&(_, v)| v * v).sum::<f64>().sqrt()
    }
}

/// Frozen vocabulary: terms in index order, their IDF weights, and the fit settings.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Vocabulary {
    pub(crate) config: VectorizerConfig,
    pub(crate) terms: Vec<String>,
    pub(crate) idf: Vec<f64>,
}

impl Vocabulary {
    /// Creates a vocabulary from terms and IDF weights given in index order.
    ///
    /// # Errors
    ///
    /// An error is returned if the lengths differ or a term is duplicated.
    pub fn new(config: VectorizerConfig, terms: Vec<String>, idf: Vec<f64>) -> Result<Self> {
        let vocabulary = Self { config, terms, idf };
        vocabulary.validate()?;
        Ok(vocabulary)
    }

    /// Checks the settings, the IDF table length and the uniqueness of terms.
    pub(crate) fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if self.terms.len() != self.idf.len() {
            return Err(AllergenError::invalid_argument(
                "idf",
                format!("{} weights for {} terms", self.idf.len(), self.terms.len()),
            ));
        }
        let n_unique = self
            .terms
            .iter()
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .len();
        if n_unique != self.terms.len() {
            return Err(AllergenError::invalid_argument(
                "terms",
                "contains duplicated terms",
            ));
        }
        Ok(())
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Applies a frozen [`Vocabulary`] to normalized texts.
#[derive(Clone, Debug)]
pub struct Vectorizer {
    vocabulary: Vocabulary,
    term_ids: HashMap<String, u32>,
}

impl Vectorizer {
    /// Creates a vectorizer from a vocabulary.
    ///
    /// # Errors
    ///
    /// [`AllergenError::CastError`] is returned if the vocabulary does not fit in `u32` indices.
    pub fn new(vocabulary: Vocabulary) -> Result<Self> {
        let mut term_ids = HashMap::with_capacity(vocabulary.len());
        for (i, term) in vocabulary.terms.iter().enumerate() {
            term_ids.insert(term.clone(), u32::try_from(i)?);
        }
        Ok(Self {
            vocabulary,
            term_ids,
        })
    }

    /// Builds a vocabulary from a corpus of normalized texts.
    ///
    /// Terms are indexed in lexicographic order. The IDF of a term is
    /// `ln((1 + n) / (1 + df)) + 1`.
    ///
    /// # Errors
    ///
    /// * [`AllergenError::InvalidArgument`] if the configuration is invalid, or if `max_df` covers
    ///   fewer documents than `min_df`.
    /// * [`AllergenError::Vocabulary`] if no term survives the frequency bounds.
    pub fn fit<S>(documents: &[S], config: VectorizerConfig) -> Result<Self>
    where
        S: AsRef<str>,
    {
        config.validate()?;

        let n_docs = documents.len();
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let mut seen = HashSet::new();
            config.for_each_ngram(doc.as_ref(), |term| {
                if !seen.contains(term) {
                    seen.insert(term.to_string());
                    *doc_freqs.entry_ref(term).or_insert(0) += 1;
                }
            });
        }

        let max_df_count = config.max_df * n_docs as f64;
        if doc_freqs.is_empty() {
            return Err(AllergenError::empty_vocabulary(
                n_docs,
                config.min_df,
                max_df_count,
            ));
        }
        if max_df_count < config.min_df as f64 {
            return Err(AllergenError::invalid_argument(
                "max_df",
                format!(
                    "{} documents allowed at most, fewer than min_df {}",
                    max_df_count, config.min_df
                ),
            ));
        }

        // Uses BTreeMap to fix the index order.
        let kept: BTreeMap<String, usize> = doc_freqs
            .into_iter()
            .filter(|&(_, df)| df >= config.min_df && df as f64 <= max_df_count)
            .collect();
        if kept.is_empty() {
            return Err(AllergenError::empty_vocabulary(
                n_docs,
                config.min_df,
                max_df_count,
            ));
        }

        let n = n_docs as f64;
        let mut terms = Vec::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (term, df) in kept {
            terms.push(term);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }
        log::info!(
            "vocabulary: {} terms from {} documents",
            terms.len(),
            n_docs
        );

        Self::new(Vocabulary { config, terms, idf })
    }

    /// Transforms a normalized text into an L2-normalized TF-IDF vector.
    ///
    /// Terms outside the vocabulary are ignored. A text without known terms gives the zero vector.
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: BTreeMap<u32, f64> = BTreeMap::new();
        self.vocabulary.config.for_each_ngram(text, |term| {
            if let Some(&id) = self.term_ids.get(term) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        });
        let mut entries: Vec<(u32, f64)> = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.vocabulary.idf[id as usize]))
            .collect();
        let norm = entries.iter().map(|&(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut entries {
                *v /= norm;
            }
        }
        FeatureVector {
            dim: self.vocabulary.len(),
            entries,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn into_vocabulary(self) -> Vocabulary {
        self.vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: [&str; 5] = [
        "peanut butter cookies",
        "peanut butter and jelly",
        "fresh milk and butter",
        "rice and beans",
        "milk chocolate",
    ];

    fn ngrams(config: &VectorizerConfig, text: &str) -> Vec<String> {
        let mut result = vec![];
        config.for_each_ngram(text, |t| result.push(t.to_string()));
        result
    }

    #[test]
    fn test_ngrams_unigrams_and_bigrams() {
        let config = VectorizerConfig::default();

        assert_eq!(
            vec!["peanut", "butter", "cookies", "peanut butter", "butter cookies"],
            ngrams(&config, "peanut butter cookies")
        );
    }

    #[test]
    fn test_ngrams_skip_short_tokens() {
        let config = VectorizerConfig::default();

        assert_eq!(
            vec!["soy", "oil", "soy oil"],
            ngrams(&config, "a soy b oil")
        );
    }

    #[test]
    fn test_ngrams_empty() {
        let config = VectorizerConfig::default();

        assert!(ngrams(&config, "").is_empty());
    }

    #[test]
    fn test_fit_vocabulary() {
        let v = Vectorizer::fit(&CORPUS, VectorizerConfig::default()).unwrap();

        // "and" and "butter" appear in 3 of 5 documents, the others in 2.
        assert_eq!(
            vec!["and", "butter", "milk", "peanut", "peanut butter"],
            v.vocabulary().terms()
        );
        let idf_and = (6.0f64 / 4.0).ln() + 1.0;
        let idf_two = (6.0f64 / 3.0).ln() + 1.0;
        assert!((v.vocabulary().idf()[0] - idf_and).abs() < 1e-12);
        assert!((v.vocabulary().idf()[1] - (6.0f64 / 4.0).ln() - 1.0).abs() < 1e-12);
        assert!((v.vocabulary().idf()[2] - idf_two).abs() < 1e-12);
    }

    #[test]
    fn test_fit_max_df_filters_ubiquitous_terms() {
        let docs = ["salt water", "salt sugar", "salt sugar"];
        let v = Vectorizer::fit(&docs, VectorizerConfig::default()).unwrap();

        assert_eq!(vec!["salt sugar", "sugar"], v.vocabulary().terms());
    }

    #[test]
    fn test_fit_empty_vocabulary() {
        let docs = ["apple", "banana", "cherry"];
        let v = Vectorizer::fit(&docs, VectorizerConfig::default());

        assert!(matches!(v, Err(AllergenError::Vocabulary(_))));
    }

    #[test]
    fn test_fit_empty_corpus() {
        let docs: [&str; 0] = [];
        let v = Vectorizer::fit(&docs, VectorizerConfig::default());

        assert!(matches!(v, Err(AllergenError::Vocabulary(_))));
    }

    #[test]
    fn test_fit_max_df_below_min_df() {
        let docs = ["egg yolk", "egg white"];
        let v = Vectorizer::fit(&docs, VectorizerConfig::default());

        assert!(matches!(v, Err(AllergenError::InvalidArgument(_))));
    }

    #[test]
    fn test_fit_invalid_ngram_range() {
        let config = VectorizerConfig {
            ngram_range: (2, 1),
            ..VectorizerConfig::default()
        };
        let v = Vectorizer::fit(&CORPUS, config);

        assert_eq!(
            "InvalidArgumentError: ngram_range: invalid range (2, 1)",
            &v.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_transform_l2_normalized() {
        let v = Vectorizer::fit(&CORPUS, VectorizerConfig::default()).unwrap();
        let x = v.transform("peanut butter peanut");

        assert_eq!(5, x.dim());
        assert!((x.norm() - 1.0).abs() < 1e-12);

        let ids: Vec<u32> = x.entries().iter().map(|&(i, _)| i).collect();
        assert_eq!(vec![1, 3, 4], ids);

        // peanut occurs twice, butter once.
        let dense = x.to_dense();
        let idf = v.vocabulary().idf();
        assert!((dense[3] / dense[1] - 2.0 * idf[3] / idf[1]).abs() < 1e-12);
    }

    #[test]
    fn test_transform_out_of_vocabulary_is_zero() {
        let v = Vectorizer::fit(&CORPUS, VectorizerConfig::default()).unwrap();
        let x = v.transform("quinoa kale smoothie");

        assert!(x.is_zero());
        assert_eq!(5, x.dim());
        assert_eq!(vec![0.0; 5], x.to_dense());
    }

    #[test]
    fn test_vocabulary_new_length_mismatch() {
        let v = Vocabulary::new(
            VectorizerConfig::default(),
            vec!["nuts".to_string()],
            vec![],
        );

        assert_eq!(
            "InvalidArgumentError: idf: 0 weights for 1 terms",
            &v.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_vocabulary_new_duplicated_terms() {
        let v = Vocabulary::new(
            VectorizerConfig::default(),
            vec!["nuts".to_string(), "nuts".to_string()],
            vec![1.0, 1.0],
        );

        assert_eq!(
            "InvalidArgumentError: terms: contains duplicated terms",
            &v.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_feature_vector_from_sparse_merges() {
        let x = FeatureVector::from_sparse(4, [(3, 1.0), (1, 0.5), (3, 1.0)]);

        assert_eq!(&[(1, 0.5), (3, 2.0)], x.entries());
        assert_eq!(vec![0.0, 0.5, 0.0, 2.0], x.to_dense());
    }
}
