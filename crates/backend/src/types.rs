//! Request/response DTOs for the backend HTTP surface (spec.md §4.H).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WipInfo {
    pub id: u64,
    pub status: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartProcessRequest {
    pub process_id: u32,
    pub operator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteProcessRequest {
    pub operator_id: String,
    pub result: String,
    pub measurements: BTreeMap<String, Value>,
    pub defects: Vec<String>,
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompleteProcessResponse {
    pub wip_item: WipItemStatus,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WipItemStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertToSerialRequest {
    #[serde(flatten)]
    pub payload: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: Value,
}

/// Backend error body shape, used to distinguish business-rule rejections
/// from generic failures.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
