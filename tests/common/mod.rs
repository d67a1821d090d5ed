#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use geo_pubmap::domain::{GeoDataset, GeoUid, Pmid};
use geo_pubmap::error::GeoMapError;
use geo_pubmap::eutils::{Endpoints, LinkResolver, SummaryResolver};
use geo_pubmap::events::EventSink;
use geo_pubmap::http::{HttpResponse, Sleeper, Transport};

pub const EUTILS: &str = "http://eutils.test";
pub const GEO: &str = "http://geo.test/acc.cgi";

pub fn endpoints() -> Endpoints {
    Endpoints {
        eutils_base: EUTILS.to_string(),
        geo_base: GEO.to_string(),
    }
}

/// Replies keyed by URL; the last reply of a list repeats once the others are used.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, Vec<(u16, String)>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push((status, body.into()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests().iter().filter(|req| *req == url).count()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, GeoMapError> {
        self.requests.lock().unwrap().push(url.to_string());
        let mut replies = self.replies.lock().unwrap();
        let Some(queue) = replies.get_mut(url) else {
            return Err(GeoMapError::Http(format!("connection refused: {url}")));
        };
        let (status, body) = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue[0].clone()
        };
        Ok(HttpResponse {
            status,
            body: body.into_bytes(),
        })
    }
}

impl Transport for &ScriptedTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, GeoMapError> {
        (**self).get(url)
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
}

impl Sleeper for &RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn link_url(pmid: Pmid) -> String {
    endpoints().link_url(pmid)
}

pub fn summary_url(uid: GeoUid) -> String {
    endpoints().summary_url(uid)
}

pub fn detail_url(accession: &str) -> String {
    endpoints().detail_url(accession)
}

pub fn links_body(uids: &[GeoUid]) -> String {
    let links: Vec<String> = uids.iter().map(|uid| format!("\"{uid}\"")).collect();
    format!(
        r#"{{"header": {{"type": "elink"}}, "linksets": [{{"dbfrom": "pubmed", "linksetdbs": [{{"dbto": "gds", "linkname": "pubmed_gds", "links": [{}]}}]}}]}}"#,
        links.join(", ")
    )
}

pub fn summary_body(uid: GeoUid, accession: &str, title: &str, summary: &str) -> String {
    format!(
        r#"{{"result": {{"uids": ["{uid}"], "{uid}": {{"uid": "{uid}", "accession": "{accession}", "title": "{title}", "gdstype": "Expression profiling by array", "summary": "{summary}", "taxon": "Mus musculus"}}}}}}"#
    )
}

pub fn detail_body(design: &str) -> String {
    format!(
        r#"<html><body><table>
<tr valign="top"><td nowrap>Title</td><td style="text-align: justify">ignored</td></tr>
<tr valign="top"><td nowrap>Overall design</td>
<td style="text-align: justify">{design}<br></td>
</tr></table></body></html>"#
    )
}

pub fn dataset(uid: GeoUid, title: &str, summary: &str) -> GeoDataset {
    GeoDataset {
        accession: format!("GSE{uid}"),
        title: title.to_string(),
        experiment_type: "Expression profiling by array".to_string(),
        summary: summary.to_string(),
        organism: "Mus musculus".to_string(),
        ..GeoDataset::new(uid)
    }
}

/// Link table held in memory.
pub struct FixedLinks {
    pub links: HashMap<Pmid, Vec<GeoUid>>,
    pub calls: Mutex<Vec<Pmid>>,
}

impl FixedLinks {
    pub fn new(links: Vec<(Pmid, Vec<GeoUid>)>) -> Self {
        Self {
            links: links.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl LinkResolver for FixedLinks {
    fn linked_datasets(&self, pmid: Pmid, _sink: &dyn EventSink) -> Vec<GeoUid> {
        self.calls.lock().unwrap().push(pmid);
        self.links.get(&pmid).cloned().unwrap_or_default()
    }
}

/// Resolves every uid except the failing ones; records each call.
#[derive(Default)]
pub struct CountingSummaries {
    pub failing: Vec<GeoUid>,
    pub calls: Mutex<Vec<GeoUid>>,
}

impl CountingSummaries {
    pub fn failing(uids: &[GeoUid]) -> Self {
        Self {
            failing: uids.to_vec(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GeoUid> {
        self.calls.lock().unwrap().clone()
    }
}

impl SummaryResolver for CountingSummaries {
    fn resolve_dataset(&self, uid: GeoUid, _sink: &dyn EventSink) -> Option<GeoDataset> {
        self.calls.lock().unwrap().push(uid);
        if self.failing.contains(&uid) {
            return None;
        }
        Some(dataset(uid, &format!("dataset {uid} liver"), "hepatic expression"))
    }
}
