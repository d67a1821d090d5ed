use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{GeoDataset, GeoUid};
use crate::error::GeoMapError;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Documents built from dataset records, aligned with the ids they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    pub ids: Vec<GeoUid>,
    pub documents: Vec<String>,
}

impl Corpus {
    /// Keeps `ids` order; ids without a resolved record are dropped.
    pub fn from_datasets(datasets: &BTreeMap<GeoUid, Option<GeoDataset>>, ids: &[GeoUid]) -> Self {
        let mut corpus = Corpus::default();
        for &uid in ids {
            if let Some(Some(dataset)) = datasets.get(&uid) {
                corpus.ids.push(uid);
                corpus.documents.push(dataset.document_text());
            }
        }
        corpus
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Row-major sparse matrix; each row holds `(column, value)` pairs sorted by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<Vec<(usize, f64)>>,
    cols: usize,
}

impl SparseMatrix {
    pub fn new(rows: Vec<Vec<(usize, f64)>>, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[(usize, f64)] {
        &self.rows[index]
    }

    /// `self · v` for a dense column vector of length `cols`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|&(col, value)| value * v[col]).sum())
            .collect()
    }

    /// `selfᵀ · u` for a dense column vector of length `rows`.
    pub fn transpose_mul_vec(&self, u: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.cols];
        for (row, &weight) in self.rows.iter().zip(u) {
            for &(col, value) in row {
                out[col] += value * weight;
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct TermMatrix {
    pub vocabulary: Vec<String>,
    pub weights: SparseMatrix,
}

/// TF-IDF with lowercase word tokens of two or more characters, smoothed idf
/// and L2-normalized rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfidfVectorizer;

impl TfidfVectorizer {
    pub fn fit_transform(&self, documents: &[String]) -> Result<TermMatrix, GeoMapError> {
        if documents.is_empty() {
            return Err(GeoMapError::EmptyCorpus);
        }

        let counts: Vec<HashMap<String, usize>> =
            documents.iter().map(|doc| term_counts(doc)).collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &counts {
            for term in doc.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let vocabulary: Vec<String> = doc_freq.keys().map(|term| term.to_string()).collect();
        let index: HashMap<&str, usize> = doc_freq
            .keys()
            .enumerate()
            .map(|(idx, term)| (*term, idx))
            .collect();
        let n = documents.len() as f64;
        let idf: Vec<f64> = doc_freq
            .values()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let rows = counts
            .iter()
            .map(|doc| {
                let mut row: Vec<(usize, f64)> = doc
                    .iter()
                    .map(|(term, &count)| {
                        let col = index[term.as_str()];
                        (col, count as f64 * idf[col])
                    })
                    .collect();
                row.sort_by_key(|&(col, _)| col);
                let norm = row.iter().map(|(_, value)| value * value).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, value) in &mut row {
                        *value /= norm;
                    }
                }
                row
            })
            .collect();

        Ok(TermMatrix {
            weights: SparseMatrix::new(rows, vocabulary.len()),
            vocabulary,
        })
    }
}

pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .collect()
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}
