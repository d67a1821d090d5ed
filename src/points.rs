use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::{Associations, DataPoint, GeoUid, Pmid};
use crate::error::GeoMapError;
use crate::events::{EventSink, FetchEvent};
use crate::reduce::{Projection, TruncatedSvd};
use crate::vectorize::{Corpus, TfidfVectorizer};

/// Dataset -> referencing publications, restricted to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    order: Vec<GeoUid>,
    pmids: HashMap<GeoUid, Vec<Pmid>>,
}

impl InvertedIndex {
    /// Dataset ids in first-occurrence order across the request.
    pub fn dataset_ids(&self) -> &[GeoUid] {
        &self.order
    }

    pub fn pmids(&self, uid: GeoUid) -> Option<&[Pmid]> {
        self.pmids.get(&uid).map(Vec::as_slice)
    }
}

/// Inverts `pub_to_dataset_ids` for the requested publications, keeping the
/// request order. Unknown and repeated publication ids are skipped.
pub fn invert_associations(
    requested: &[Pmid],
    pub_to_dataset_ids: &BTreeMap<Pmid, Vec<GeoUid>>,
    sink: &dyn EventSink,
) -> InvertedIndex {
    let mut index = InvertedIndex::default();
    let mut visited = HashSet::with_capacity(requested.len());
    for &pmid in requested {
        if !visited.insert(pmid) {
            continue;
        }
        let Some(uids) = pub_to_dataset_ids.get(&pmid) else {
            sink.event(FetchEvent::UnknownPublication { pmid });
            continue;
        };
        for &uid in uids {
            let referencing = index.pmids.entry(uid).or_insert_with(|| {
                index.order.push(uid);
                Vec::new()
            });
            if !referencing.contains(&pmid) {
                referencing.push(pmid);
            }
        }
    }
    index
}

/// Joins projection rows with the publications referencing each dataset.
/// `ids[i]` must be the dataset of row `i`.
pub fn assemble_points(
    ids: &[GeoUid],
    index: &InvertedIndex,
    projection: &Projection,
) -> Result<Vec<DataPoint>, GeoMapError> {
    if projection.rows() != ids.len() {
        return Err(GeoMapError::ShapeMismatch {
            rows: projection.rows(),
            ids: ids.len(),
        });
    }
    ids.iter()
        .zip(projection.points())
        .map(|(&uid, &[x, y])| {
            let pmids = index
                .pmids(uid)
                .ok_or(GeoMapError::UnreferencedDataset(uid))?;
            Ok(DataPoint {
                x,
                y,
                pmids: pmids.to_vec(),
                geo_id: uid,
            })
        })
        .collect()
}

/// Requested publications -> one 2D point per linked, resolved dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointBuilder {
    vectorizer: TfidfVectorizer,
    reducer: TruncatedSvd,
}

impl PointBuilder {
    pub fn new(reducer: TruncatedSvd) -> Self {
        Self {
            vectorizer: TfidfVectorizer,
            reducer,
        }
    }

    pub fn build_points(
        &self,
        requested: &[Pmid],
        associations: &Associations,
        sink: &dyn EventSink,
    ) -> Result<Vec<DataPoint>, GeoMapError> {
        let index = invert_associations(requested, &associations.pub_to_dataset_ids, sink);
        let corpus = Corpus::from_datasets(&associations.datasets, index.dataset_ids());
        if corpus.is_empty() {
            sink.event(FetchEvent::EmptyCorpus);
            return Ok(Vec::new());
        }

        let terms = self.vectorizer.fit_transform(&corpus.documents)?;
        if terms.vocabulary.is_empty() {
            sink.event(FetchEvent::EmptyVocabulary {
                documents: corpus.len(),
            });
        }
        let projection = self.reducer.fit_transform(&terms.weights);
        assemble_points(&corpus.ids, &index, &projection)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::events::MemorySink;
    use crate::vectorize::SparseMatrix;

    #[test]
    fn inversion_keeps_request_order() {
        let map = BTreeMap::from([(222, vec![5001, 5002]), (111, vec![5001])]);
        let sink = MemorySink::new();
        let index = invert_associations(&[111, 222, 111, 999], &map, &sink);
        assert_eq!(index.dataset_ids(), &[5001, 5002]);
        assert_eq!(index.pmids(5001), Some(&[111, 222][..]));
        assert_eq!(index.pmids(5002), Some(&[222][..]));
        assert_eq!(sink.warnings(), vec![FetchEvent::UnknownPublication { pmid: 999 }]);
    }

    #[test]
    fn repeated_links_and_requests_list_a_publication_once() {
        let map = BTreeMap::from([(1, vec![9, 9, 8]), (2, vec![8])]);
        let requested: Vec<Pmid> = [1, 2].repeat(500);
        let index = invert_associations(&requested, &map, &MemorySink::new());
        assert_eq!(index.dataset_ids(), &[9, 8]);
        assert_eq!(index.pmids(9), Some(&[1][..]));
        assert_eq!(index.pmids(8), Some(&[1, 2][..]));
    }

    #[test]
    fn unreferenced_dataset_is_an_error() {
        let index = InvertedIndex::default();
        let projection = TruncatedSvd::default()
            .fit_transform(&SparseMatrix::new(vec![vec![(0, 1.0)]], 1));
        assert_matches!(
            assemble_points(&[42], &index, &projection),
            Err(GeoMapError::UnreferencedDataset(42))
        );
    }

    #[test]
    fn misaligned_rows_are_an_error() {
        let index = InvertedIndex::default();
        let projection = TruncatedSvd::default().fit_transform(&SparseMatrix::new(Vec::new(), 1));
        assert_matches!(
            assemble_points(&[1], &index, &projection),
            Err(GeoMapError::ShapeMismatch { rows: 0, ids: 1 })
        );
    }
}
