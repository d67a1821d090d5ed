use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GeoMapError;

/// PubMed identifier of a publication.
pub type Pmid = u64;

/// Numeric GDS identifier of a GEO dataset.
pub type GeoUid = u64;

/// Metadata of one GEO dataset as resolved from esummary plus the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoDataset {
    pub uid: GeoUid,
    pub accession: String,
    pub title: String,
    pub experiment_type: String,
    pub summary: String,
    pub organism: String,
    pub overall_design: String,
}

impl GeoDataset {
    pub fn new(uid: GeoUid) -> Self {
        Self {
            uid,
            accession: String::new(),
            title: String::new(),
            experiment_type: String::new(),
            summary: String::new(),
            organism: String::new(),
            overall_design: String::new(),
        }
    }

    /// Text fed to the vectorizer, fields joined by a single space.
    pub fn document_text(&self) -> String {
        [
            self.title.as_str(),
            self.experiment_type.as_str(),
            self.summary.as_str(),
            self.organism.as_str(),
            self.overall_design.as_str(),
        ]
        .join(" ")
    }
}

/// The publication -> dataset links and the dataset records of one batch.
///
/// A `None` record means resolution was attempted and failed. Every id listed
/// in `pub_to_dataset_ids` has a `Some` record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Associations {
    pub pub_to_dataset_ids: BTreeMap<Pmid, Vec<GeoUid>>,
    pub datasets: BTreeMap<GeoUid, Option<GeoDataset>>,
}

impl Associations {
    pub fn record(&self, uid: GeoUid) -> Option<&GeoDataset> {
        self.datasets.get(&uid).and_then(|record| record.as_ref())
    }

    pub fn resolved_count(&self) -> usize {
        self.datasets.values().filter(|record| record.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    pub pmids: Vec<Pmid>,
    pub geo_id: GeoUid,
}

/// Parses publication ids separated by commas and/or whitespace.
pub fn parse_pmid_list(text: &str) -> Result<Vec<Pmid>, GeoMapError> {
    text.split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<Pmid>()
                .map_err(|_| GeoMapError::PmidList(format!("not a PubMed id: {token}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_whitespace_and_commas() {
        let ids = parse_pmid_list("111 222\n333,444, 555\n").unwrap();
        assert_eq!(ids, vec![111, 222, 333, 444, 555]);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse_pmid_list("111,abc").unwrap_err();
        assert_matches!(err, GeoMapError::PmidList(_));
    }

    #[test]
    fn document_text_joins_fields_in_order() {
        let dataset = GeoDataset {
            title: "T".to_string(),
            experiment_type: "E".to_string(),
            summary: "S".to_string(),
            organism: "O".to_string(),
            overall_design: String::new(),
            ..GeoDataset::new(1)
        };
        assert_eq!(dataset.document_text(), "T E S O ");
    }
}
