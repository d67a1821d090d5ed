use std::fmt;
use std::sync::Mutex;

use camino::Utf8PathBuf;

use crate::domain::{GeoUid, Pmid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

/// Diagnostics raised while fetching associations or building points.
///
/// Remote failures never surface as errors; they are reported here and the
/// caller continues with an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    AttemptFailed {
        url: String,
        attempt: u32,
        status: Option<u16>,
    },
    RetriesExhausted {
        url: String,
        attempts: u32,
    },
    MalformedLinks {
        pmid: Pmid,
    },
    SummaryUnavailable {
        uid: GeoUid,
    },
    SummaryError {
        uid: GeoUid,
        message: String,
    },
    MissingSummaryField {
        uid: GeoUid,
        field: &'static str,
    },
    OverallDesignMissing {
        accession: String,
    },
    OverallDesignMalformed {
        accession: String,
    },
    SnapshotLoaded {
        path: Utf8PathBuf,
    },
    FetchStarted {
        publications: usize,
    },
    FetchFinished {
        publications: usize,
        datasets: usize,
    },
    SnapshotWritten {
        path: Utf8PathBuf,
    },
    UnknownPublication {
        pmid: Pmid,
    },
    EmptyVocabulary {
        documents: usize,
    },
    EmptyCorpus,
}

impl FetchEvent {
    pub fn level(&self) -> Level {
        match self {
            FetchEvent::AttemptFailed { .. } => Level::Debug,
            FetchEvent::SnapshotLoaded { .. }
            | FetchEvent::FetchStarted { .. }
            | FetchEvent::FetchFinished { .. }
            | FetchEvent::SnapshotWritten { .. } => Level::Info,
            _ => Level::Warn,
        }
    }
}

impl fmt::Display for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchEvent::AttemptFailed {
                url,
                attempt,
                status: Some(status),
            } => write!(f, "attempt {attempt} for {url} returned status {status}"),
            FetchEvent::AttemptFailed {
                url,
                attempt,
                status: None,
            } => write!(f, "attempt {attempt} for {url} failed before a response"),
            FetchEvent::RetriesExhausted { url, attempts } => {
                write!(f, "failed to get content from {url} after {attempts} attempts")
            }
            FetchEvent::MalformedLinks { pmid } => {
                write!(f, "failed to parse linked datasets for {pmid}")
            }
            FetchEvent::SummaryUnavailable { uid } => {
                write!(f, "summary for dataset {uid} is not a JSON document")
            }
            FetchEvent::SummaryError { uid, message } => {
                write!(f, "esummary reported an error for dataset {uid}: {message}")
            }
            FetchEvent::MissingSummaryField { uid, field } => {
                write!(f, "failed to parse dataset info for {uid}: missing {field}")
            }
            FetchEvent::OverallDesignMissing { accession } => {
                write!(f, "no overall design data for {accession}")
            }
            FetchEvent::OverallDesignMalformed { accession } => {
                write!(f, "failed to parse overall design data for {accession}")
            }
            FetchEvent::SnapshotLoaded { path } => {
                write!(f, "loaded previously fetched datasets from {path}")
            }
            FetchEvent::FetchStarted { publications } => {
                write!(f, "started fetching GEO datasets for {publications} publications")
            }
            FetchEvent::FetchFinished {
                publications,
                datasets,
            } => write!(
                f,
                "fetched GEO datasets: {publications} publications, {datasets} datasets"
            ),
            FetchEvent::SnapshotWritten { path } => write!(f, "wrote snapshot {path}"),
            FetchEvent::UnknownPublication { pmid } => {
                write!(f, "publication {pmid} is not part of the fetched batch")
            }
            FetchEvent::EmptyVocabulary { documents } => write!(
                f,
                "no terms found in {documents} documents; coordinates are all zero"
            ),
            FetchEvent::EmptyCorpus => {
                write!(f, "requested publications reference no resolved datasets")
            }
        }
    }
}

/// Receives diagnostics; passed explicitly into every component that can emit them.
pub trait EventSink {
    fn event(&self, event: FetchEvent);
}

/// Forwards events to `tracing` at their level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn event(&self, event: FetchEvent) {
        match event.level() {
            Level::Debug => tracing::debug!("{event}"),
            Level::Info => tracing::info!("{event}"),
            Level::Warn => tracing::warn!("{event}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn event(&self, _event: FetchEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<FetchEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<FetchEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level() == Level::Warn)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn event(&self, event: FetchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
