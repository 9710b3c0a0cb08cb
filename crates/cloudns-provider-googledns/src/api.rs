//! Cloud DNS v1 wire types
//!
//! Only the fields cloudns reads or writes are modelled.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: u32,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordSetList {
    #[serde(default)]
    pub rrsets: Vec<ResourceRecordSet>,
}

/// Body of `POST .../changes`
///
/// Empty lists are left out of the request.
#[derive(Debug, Serialize)]
pub(crate) struct ChangeBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<ResourceRecordSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<ResourceRecordSet>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Change {
    pub id: String,
    pub status: String,
}
