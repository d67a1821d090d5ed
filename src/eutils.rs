use serde_json::Value;

use crate::domain::{GeoDataset, GeoUid, Pmid};
use crate::events::{EventSink, FetchEvent};
use crate::geo_page::{DesignMiss, detail_page_url, extract_overall_design};
use crate::http::{RetryingFetcher, Sleeper, Transport};

pub const DEFAULT_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_GEO_BASE: &str = "https://www.ncbi.nlm.nih.gov/geo/query/acc.cgi";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub eutils_base: String,
    pub geo_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            eutils_base: DEFAULT_EUTILS_BASE.to_string(),
            geo_base: DEFAULT_GEO_BASE.to_string(),
        }
    }
}

impl Endpoints {
    pub fn link_url(&self, pmid: Pmid) -> String {
        format!(
            "{}/elink.fcgi?dbfrom=pubmed&db=gds&linkname=pubmed_gds&retmode=json&id={pmid}",
            self.eutils_base
        )
    }

    pub fn summary_url(&self, uid: GeoUid) -> String {
        format!(
            "{}/esummary.fcgi?db=gds&retmode=json&id={uid}",
            self.eutils_base
        )
    }

    pub fn detail_url(&self, accession: &str) -> String {
        detail_page_url(&self.geo_base, accession)
    }
}

/// Maps a publication to the GEO datasets linked from it.
pub trait LinkResolver {
    /// Ids in document order, duplicates kept. Empty on any failure.
    fn linked_datasets(&self, pmid: Pmid, sink: &dyn EventSink) -> Vec<GeoUid>;
}

/// Builds one dataset record from its GDS uid.
pub trait SummaryResolver {
    /// `None` when the summary could not be fetched or lacks required fields.
    fn resolve_dataset(&self, uid: GeoUid, sink: &dyn EventSink) -> Option<GeoDataset>;
}

impl<L: LinkResolver + ?Sized> LinkResolver for &L {
    fn linked_datasets(&self, pmid: Pmid, sink: &dyn EventSink) -> Vec<GeoUid> {
        (**self).linked_datasets(pmid, sink)
    }
}

impl<R: SummaryResolver + ?Sized> SummaryResolver for &R {
    fn resolve_dataset(&self, uid: GeoUid, sink: &dyn EventSink) -> Option<GeoDataset> {
        (**self).resolve_dataset(uid, sink)
    }
}

pub struct EutilsClient<T: Transport, S: Sleeper> {
    fetcher: RetryingFetcher<T, S>,
    endpoints: Endpoints,
}

impl<T: Transport, S: Sleeper> EutilsClient<T, S> {
    pub fn new(fetcher: RetryingFetcher<T, S>, endpoints: Endpoints) -> Self {
        Self { fetcher, endpoints }
    }

    pub fn fetcher(&self) -> &RetryingFetcher<T, S> {
        &self.fetcher
    }

    fn overall_design(&self, accession: &str, sink: &dyn EventSink) -> String {
        let url = self.endpoints.detail_url(accession);
        let Some(content) = self.fetcher.fetch(&url, sink) else {
            return String::new();
        };
        let html = String::from_utf8_lossy(&content);
        match extract_overall_design(&html) {
            Ok(design) => design,
            Err(DesignMiss::LabelMissing) => {
                sink.event(FetchEvent::OverallDesignMissing {
                    accession: accession.to_string(),
                });
                String::new()
            }
            Err(DesignMiss::ValueMissing) => {
                sink.event(FetchEvent::OverallDesignMalformed {
                    accession: accession.to_string(),
                });
                String::new()
            }
        }
    }
}

impl<T: Transport, S: Sleeper> LinkResolver for EutilsClient<T, S> {
    fn linked_datasets(&self, pmid: Pmid, sink: &dyn EventSink) -> Vec<GeoUid> {
        let url = self.endpoints.link_url(pmid);
        let Some(content) = self.fetcher.fetch(&url, sink) else {
            return Vec::new();
        };
        let links = serde_json::from_slice::<Value>(&content)
            .ok()
            .and_then(|payload| parse_links(&payload));
        match links {
            Some(links) => links,
            None => {
                sink.event(FetchEvent::MalformedLinks { pmid });
                Vec::new()
            }
        }
    }
}

impl<T: Transport, S: Sleeper> SummaryResolver for EutilsClient<T, S> {
    fn resolve_dataset(&self, uid: GeoUid, sink: &dyn EventSink) -> Option<GeoDataset> {
        let url = self.endpoints.summary_url(uid);
        let content = self.fetcher.fetch(&url, sink)?;
        let payload = match serde_json::from_slice::<Value>(&content) {
            Ok(payload) => payload,
            Err(_) => {
                sink.event(FetchEvent::SummaryUnavailable { uid });
                return None;
            }
        };
        let mut dataset = match parse_summary(uid, &payload) {
            Ok(dataset) => dataset,
            Err(event) => {
                sink.event(event);
                return None;
            }
        };
        dataset.overall_design = self.overall_design(&dataset.accession, sink);
        Some(dataset)
    }
}

/// Reads `linksets[0].linksetdbs[0].links`; ids may be strings or numbers.
pub fn parse_links(payload: &Value) -> Option<Vec<GeoUid>> {
    let links = payload
        .get("linksets")?
        .get(0)?
        .get("linksetdbs")?
        .get(0)?
        .get("links")?
        .as_array()?;
    links
        .iter()
        .map(|link| match link {
            Value::String(text) => text.trim().parse::<GeoUid>().ok(),
            other => other.as_u64(),
        })
        .collect()
}

/// Extracts the esummary fields of `result["{uid}"]`, leaving `overall_design` empty.
pub fn parse_summary(uid: GeoUid, payload: &Value) -> Result<GeoDataset, FetchEvent> {
    let key = uid.to_string();
    let result = payload
        .get("result")
        .and_then(|result| result.get(&key))
        .ok_or(FetchEvent::MissingSummaryField {
            uid,
            field: "result",
        })?;
    if let Some(error) = result.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(FetchEvent::SummaryError { uid, message });
    }
    let field = |name: &'static str| {
        result
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(FetchEvent::MissingSummaryField { uid, field: name })
    };
    Ok(GeoDataset {
        uid,
        accession: field("accession")?,
        title: field("title")?,
        experiment_type: field("gdstype")?,
        summary: field("summary")?,
        organism: field("taxon")?,
        overall_design: String::new(),
    })
}
