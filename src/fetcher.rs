use camino::Utf8Path;
use serde::Serialize;

use crate::domain::{Associations, Pmid};
use crate::error::GeoMapError;
use crate::eutils::{LinkResolver, SummaryResolver};
use crate::events::{EventSink, FetchEvent};
use crate::snapshot::{load_snapshot, save_snapshot, snapshot_exists};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    /// Loaded wholesale from an existing snapshot; no network calls.
    Snapshot,
    /// Built from the network in this run.
    Network,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub associations: Associations,
    pub source: FetchSource,
    pub persisted: bool,
}

/// Drives link and summary resolution over a batch of publications.
pub struct FetchOrchestrator<L: LinkResolver, R: SummaryResolver> {
    links: L,
    summaries: R,
}

impl<L: LinkResolver, R: SummaryResolver> FetchOrchestrator<L, R> {
    pub fn new(links: L, summaries: R) -> Self {
        Self { links, summaries }
    }

    /// A present snapshot is trusted as-is. Otherwise the whole batch is
    /// fetched and, if `snapshot` is given, written once at the end.
    pub fn fetch(
        &self,
        pmids: &[Pmid],
        snapshot: Option<&Utf8Path>,
        sink: &dyn EventSink,
    ) -> Result<FetchOutcome, GeoMapError> {
        if let Some(path) = snapshot {
            if snapshot_exists(path) {
                let associations = load_snapshot(path)?;
                sink.event(FetchEvent::SnapshotLoaded {
                    path: path.to_path_buf(),
                });
                return Ok(FetchOutcome {
                    associations,
                    source: FetchSource::Snapshot,
                    persisted: false,
                });
            }
        }

        let associations = self.fetch_batch(pmids, sink);

        let persisted = match snapshot {
            Some(path) => {
                save_snapshot(path, &associations)?;
                sink.event(FetchEvent::SnapshotWritten {
                    path: path.to_path_buf(),
                });
                true
            }
            None => false,
        };

        Ok(FetchOutcome {
            associations,
            source: FetchSource::Network,
            persisted,
        })
    }

    fn fetch_batch(&self, pmids: &[Pmid], sink: &dyn EventSink) -> Associations {
        sink.event(FetchEvent::FetchStarted {
            publications: pmids.len(),
        });
        let mut associations = Associations::default();

        for &pmid in pmids {
            if associations.pub_to_dataset_ids.contains_key(&pmid) {
                continue;
            }
            let mut resolved = Vec::new();
            for uid in self.links.linked_datasets(pmid, sink) {
                let record = associations
                    .datasets
                    .entry(uid)
                    .or_insert_with(|| self.summaries.resolve_dataset(uid, sink));
                if record.is_some() {
                    resolved.push(uid);
                }
            }
            associations.pub_to_dataset_ids.insert(pmid, resolved);
        }

        sink.event(FetchEvent::FetchFinished {
            publications: associations.pub_to_dataset_ids.len(),
            datasets: associations.datasets.len(),
        });
        associations
    }
}
