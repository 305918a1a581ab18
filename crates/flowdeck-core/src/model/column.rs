// ── Sortable flow columns ──

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::flow::Flow;
use crate::session::SortRequest;
use crate::store::{KeyFn, SortKey};

/// A column the flow list can be sorted by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FlowColumn {
    Id,
    Method,
    Host,
    Path,
    Status,
    Size,
    Time,
    Kind,
}

impl FlowColumn {
    /// Key extractor for this column. Flows lacking the field sort first.
    pub fn key_fn(self) -> KeyFn<Flow> {
        match self {
            Self::Id => Arc::new(|f: &Flow| SortKey::Text(f.id.to_string())),
            Self::Method => Arc::new(|f: &Flow| text_key(f.method())),
            Self::Host => Arc::new(|f: &Flow| text_key(f.host().map(str::to_ascii_lowercase).as_deref())),
            Self::Path => Arc::new(|f: &Flow| text_key(f.path())),
            Self::Status => Arc::new(|f: &Flow| {
                f.status_code().map_or(SortKey::Missing, |s| SortKey::Int(i64::from(s)))
            }),
            Self::Size => Arc::new(|f: &Flow| {
                f.total_size()
                    .map_or(SortKey::Missing, |s| SortKey::Int(i64::try_from(s).unwrap_or(i64::MAX)))
            }),
            Self::Time => Arc::new(|f: &Flow| {
                f.created_at
                    .or_else(|| f.request.as_ref().and_then(|r| r.started_at))
                    .map_or(SortKey::Missing, |t| SortKey::Int(t.timestamp_millis()))
            }),
            Self::Kind => Arc::new(|f: &Flow| SortKey::Text(f.kind.to_string())),
        }
    }

    /// A sort request for this column, ready for `Action::UpdateSorter`.
    pub fn sort_request(self, descending: bool) -> SortRequest<Flow> {
        SortRequest::new(self.to_string(), descending, self.key_fn())
    }
}

fn text_key(value: Option<&str>) -> SortKey {
    value.map_or(SortKey::Missing, |v| SortKey::Text(v.to_owned()))
}
