use std::io::{self, Write};

use serde::Serialize;

use crate::domain::DataPoint;
use crate::fetcher::{FetchOutcome, FetchSource};

#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub publications: usize,
    pub datasets: usize,
    pub resolved: usize,
    pub source: FetchSource,
    pub persisted: bool,
}

impl From<&FetchOutcome> for FetchSummary {
    fn from(outcome: &FetchOutcome) -> Self {
        Self {
            publications: outcome.associations.pub_to_dataset_ids.len(),
            datasets: outcome.associations.datasets.len(),
            resolved: outcome.associations.resolved_count(),
            source: outcome.source,
            persisted: outcome.persisted,
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(summary: &FetchSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_points(points: &[DataPoint]) -> io::Result<()> {
        Self::print_json(&points)
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
