// ============================================================================
// FIRESTORE CACHE - Remote Cache Backend over the Firestore REST API
// ============================================================================
// One document per collection under `<cache_collection>/<name>`, the records
// JSON-encoded in a `payload` string field. Writes go through a single
// `documents:commit` batch together with the `last_sync` status document.
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::FirestoreConfig;
use crate::errors::CacheError;
use crate::models::DataState;
use crate::services::cache_service::CacheStatus;
use crate::utils::constants::COLLECTIONS;

const PAYLOAD_FIELD: &str = "payload";
const UPDATED_AT_FIELD: &str = "updatedAt";
const STATUS_DOC_ID: &str = "last_sync";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<FirestoreDocument>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreDocument {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_value: Option<String>,
}

impl FirestoreValue {
    fn string(value: String) -> Self {
        Self {
            string_value: Some(value),
            ..Self::default()
        }
    }

    fn timestamp(value: String) -> Self {
        Self {
            timestamp_value: Some(value),
            ..Self::default()
        }
    }
}

/// Resource names for one Firestore project
#[derive(Debug, Clone)]
pub struct FirestorePaths {
    config: FirestoreConfig,
}

impl FirestorePaths {
    pub fn new(config: FirestoreConfig) -> Self {
        Self { config }
    }

    /// `projects/<p>/databases/(default)/documents/<collection>/<doc>`
    pub fn document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            self.config.project_id, collection, doc_id
        )
    }

    pub fn cache_doc_name(&self, collection: &str) -> String {
        self.document_name(&self.config.cache_collection, collection)
    }

    pub fn status_doc_name(&self) -> String {
        self.document_name(&self.config.status_collection, STATUS_DOC_ID)
    }

    pub fn list_url(&self, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}?pageSize=100",
            self.config.documents_url(),
            self.config.cache_collection
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }
        self.with_key(url)
    }

    pub fn commit_url(&self) -> String {
        self.with_key(format!("{}:commit", self.config.documents_url()))
    }

    pub fn status_url(&self) -> String {
        self.with_key(format!(
            "{}/{}/{}",
            self.config.documents_url(),
            self.config.status_collection,
            STATUS_DOC_ID
        ))
    }

    fn with_key(&self, url: String) -> String {
        match &self.config.api_key {
            Some(key) => {
                let separator = if url.contains('?') { '&' } else { '?' };
                format!("{}{}key={}", url, separator, key)
            }
            None => url,
        }
    }
}

/// Collection name = last segment of the document name
fn doc_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Decodes listed cache documents into a snapshot; `None` when nothing is cached
pub fn decode_documents(documents: &[FirestoreDocument]) -> Result<Option<DataState>, CacheError> {
    if documents.is_empty() {
        return Ok(None);
    }

    let mut state = DataState::new();
    for document in documents {
        let collection = doc_id(&document.name);
        let payload = document
            .fields
            .get(PAYLOAD_FIELD)
            .and_then(|value| value.string_value.as_deref())
            .ok_or_else(|| CacheError::Payload(format!("{} has no payload", collection)))?;
        let records: Vec<Value> = serde_json::from_str(payload)
            .map_err(|e| CacheError::Payload(format!("{}: {}", collection, e)))?;
        state.set_collection(collection, records);
    }
    Ok(Some(state))
}

/// `documents:commit` body replacing the cached snapshot with `data`.
/// Every known or currently cached collection missing from `data` is deleted
/// so the cache mirrors it.
pub fn build_save_commit(
    paths: &FirestorePaths,
    data: &DataState,
    cached: &[FirestoreDocument],
    updated_at: &str,
) -> Result<Value, CacheError> {
    let mut writes = Vec::new();

    for (collection, records) in data.iter() {
        let payload = serde_json::to_string(records)
            .map_err(|e| CacheError::Payload(format!("{}: {}", collection, e)))?;
        let mut fields = BTreeMap::new();
        fields.insert(PAYLOAD_FIELD.to_string(), FirestoreValue::string(payload));
        fields.insert(
            UPDATED_AT_FIELD.to_string(),
            FirestoreValue::timestamp(updated_at.to_string()),
        );
        writes.push(json!({
            "update": FirestoreDocument {
                name: paths.cache_doc_name(collection),
                fields,
            }
        }));
    }

    let stale: BTreeSet<&str> = COLLECTIONS
        .iter()
        .copied()
        .chain(cached.iter().map(|document| doc_id(&document.name)))
        .filter(|collection| data.collection_names().all(|name| name != *collection))
        .collect();
    for collection in stale {
        writes.push(json!({ "delete": paths.cache_doc_name(collection) }));
    }

    let mut status_fields = BTreeMap::new();
    status_fields.insert(
        UPDATED_AT_FIELD.to_string(),
        FirestoreValue::timestamp(updated_at.to_string()),
    );
    writes.push(json!({
        "update": FirestoreDocument {
            name: paths.status_doc_name(),
            fields: status_fields,
        }
    }));

    Ok(json!({ "writes": writes }))
}

/// `documents:commit` body deleting the listed documents and the status document
pub fn build_clear_commit(paths: &FirestorePaths, documents: &[FirestoreDocument]) -> Value {
    let mut writes: Vec<Value> = documents
        .iter()
        .map(|document| json!({ "delete": document.name }))
        .collect();
    writes.push(json!({ "delete": paths.status_doc_name() }));
    json!({ "writes": writes })
}

pub fn decode_status(document: &FirestoreDocument) -> Option<CacheStatus> {
    document
        .fields
        .get(UPDATED_AT_FIELD)
        .and_then(|value| value.timestamp_value.clone())
        .map(|updated_at| CacheStatus { updated_at })
}

/// HTTP failure → cache error; quota exhaustion is recognised by status or body
pub fn classify_error(status: u16, body: &str) -> CacheError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        CacheError::QuotaExceeded(format!("HTTP {}", status))
    } else {
        CacheError::Backend(format!("HTTP {}: {}", status, body))
    }
}

#[cfg(target_arch = "wasm32")]
pub use http::FirestoreCache;

#[cfg(target_arch = "wasm32")]
mod http {
    use async_trait::async_trait;
    use gloo_net::http::{Request, Response};
    use serde_json::Value;

    use super::*;
    use crate::services::cache_service::CacheBackend;

    pub struct FirestoreCache {
        paths: FirestorePaths,
        available: bool,
    }

    impl FirestoreCache {
        pub fn new(config: FirestoreConfig) -> Self {
            let available = !config.project_id.trim().is_empty();
            if !available {
                log::warn!("⚠️ No Firestore project configured, cache disabled");
            }
            Self {
                paths: FirestorePaths::new(config),
                available,
            }
        }

        async fn check(response: Response) -> Result<Response, CacheError> {
            if response.ok() {
                return Ok(response);
            }
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(classify_error(status, &body))
        }

        async fn list_documents(&self) -> Result<Vec<FirestoreDocument>, CacheError> {
            let mut documents = Vec::new();
            let mut page_token: Option<String> = None;
            loop {
                let response = Request::get(&self.paths.list_url(page_token.as_deref()))
                    .send()
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                let page = Self::check(response)
                    .await?
                    .json::<ListDocumentsResponse>()
                    .await
                    .map_err(|e| CacheError::Payload(e.to_string()))?;
                documents.extend(page.documents);
                match page.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }
            Ok(documents)
        }

        async fn commit(&self, body: &Value) -> Result<(), CacheError> {
            let response = Request::post(&self.paths.commit_url())
                .json(body)
                .map_err(|e| CacheError::Payload(e.to_string()))?
                .send()
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            Self::check(response).await?;
            Ok(())
        }
    }

    #[async_trait(?Send)]
    impl CacheBackend for FirestoreCache {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn load_all_data(&self) -> Result<Option<DataState>, CacheError> {
            let documents = self.list_documents().await?;
            log::info!("📦 Firestore cache: {} documents", documents.len());
            decode_documents(&documents)
        }

        async fn save_all_data(&self, data: &DataState) -> Result<(), CacheError> {
            let cached = self.list_documents().await?;
            let updated_at = chrono::Utc::now().to_rfc3339();
            let body = build_save_commit(&self.paths, data, &cached, &updated_at)?;
            self.commit(&body).await?;
            log::info!("💾 Firestore cache updated ({} collections)", data.len());
            Ok(())
        }

        async fn clear_cache(&self) -> Result<(), CacheError> {
            let documents = self.list_documents().await?;
            self.commit(&build_clear_commit(&self.paths, &documents)).await?;
            log::info!("🗑️ Firestore cache cleared ({} documents)", documents.len());
            Ok(())
        }

        async fn cache_status(&self) -> Result<Option<CacheStatus>, CacheError> {
            let response = Request::get(&self.paths.status_url())
                .send()
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            if response.status() == 404 {
                return Ok(None);
            }
            let document = Self::check(response)
                .await?
                .json::<FirestoreDocument>()
                .await
                .map_err(|e| CacheError::Payload(e.to_string()))?;
            Ok(decode_status(&document))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> FirestorePaths {
        FirestorePaths::new(FirestoreConfig {
            project_id: "demo".to_string(),
            api_key: Some("k".to_string()),
            ..FirestoreConfig::default()
        })
    }

    fn cached(collection: &str, payload: &str) -> FirestoreDocument {
        let mut fields = BTreeMap::new();
        fields.insert(
            PAYLOAD_FIELD.to_string(),
            FirestoreValue::string(payload.to_string()),
        );
        FirestoreDocument {
            name: paths().cache_doc_name(collection),
            fields,
        }
    }

    #[test]
    fn urls_carry_the_api_key() {
        let paths = paths();
        assert!(paths.list_url(None).ends_with("/app_cache?pageSize=100&key=k"));
        assert!(paths.list_url(Some("p2")).ends_with("pageToken=p2&key=k"));
        assert!(paths.commit_url().ends_with("/documents:commit?key=k"));
        assert!(paths.status_url().ends_with("/cache_status/last_sync?key=k"));
    }

    #[test]
    fn decode_rebuilds_collections_from_document_names() {
        let documents = vec![
            cached("students", r#"[{"code":1},{"code":2}]"#),
            cached("scores", "[]"),
        ];
        let state = decode_documents(&documents).unwrap().unwrap();
        assert_eq!(state.students().len(), 2);
        assert!(state.collection("scores").is_empty());
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn decode_of_nothing_is_none() {
        assert_eq!(decode_documents(&[]).unwrap(), None);
    }

    #[test]
    fn broken_payload_is_a_payload_error() {
        let documents = vec![cached("students", "{oops")];
        assert!(matches!(
            decode_documents(&documents),
            Err(CacheError::Payload(_))
        ));
    }

    #[test]
    fn save_commit_updates_present_and_deletes_missing_collections() {
        let data = DataState::new().with_collection("students", vec![json!({"code": 1})]);
        let body = build_save_commit(&paths(), &data, &[], "2026-10-19T00:00:00Z").unwrap();
        let writes = body["writes"].as_array().unwrap();

        let updates: Vec<&str> = writes
            .iter()
            .filter_map(|w| w["update"]["name"].as_str())
            .collect();
        assert!(updates.iter().any(|n| n.ends_with("/app_cache/students")));
        assert!(updates.iter().any(|n| n.ends_with("/cache_status/last_sync")));

        let deletes: Vec<&str> = writes.iter().filter_map(|w| w["delete"].as_str()).collect();
        assert_eq!(deletes.len(), COLLECTIONS.len() - 1);
        assert!(deletes.iter().all(|n| !n.ends_with("/students")));

        let student_doc = writes
            .iter()
            .find(|w| w["update"]["name"].as_str().map_or(false, |n| n.ends_with("/students")))
            .unwrap();
        assert_eq!(
            student_doc["update"]["fields"]["payload"]["stringValue"],
            r#"[{"code":1}]"#
        );
    }

    #[test]
    fn save_commit_deletes_cached_collections_no_longer_served() {
        let data = DataState::new().with_collection("students", vec![]);
        let cached = vec![cached("students", "[]"), cached("homework_2024", "[]")];
        let body = build_save_commit(&paths(), &data, &cached, "2026-10-19T00:00:00Z").unwrap();

        let deletes: Vec<&str> = body["writes"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|w| w["delete"].as_str())
            .collect();
        assert!(deletes.iter().any(|n| n.ends_with("/app_cache/homework_2024")));
        assert!(deletes.iter().all(|n| !n.ends_with("/students")));
        assert_eq!(deletes.len(), COLLECTIONS.len());
    }

    #[test]
    fn urls_without_api_key_carry_no_key_param() {
        let paths = FirestorePaths::new(FirestoreConfig {
            project_id: "demo".to_string(),
            api_key: None,
            ..FirestoreConfig::default()
        });
        assert!(paths.list_url(None).ends_with("/app_cache?pageSize=100"));
        assert!(!paths.commit_url().contains("key="));
    }

    #[test]
    fn quota_is_detected_from_status_or_body() {
        assert!(classify_error(429, "").is_quota());
        assert!(classify_error(403, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#).is_quota());
        assert!(!classify_error(500, "internal").is_quota());
    }

    #[test]
    fn status_document_exposes_update_time() {
        let mut fields = BTreeMap::new();
        fields.insert(
            UPDATED_AT_FIELD.to_string(),
            FirestoreValue::timestamp("2026-10-19T08:00:00Z".to_string()),
        );
        let document = FirestoreDocument {
            name: paths().status_doc_name(),
            fields,
        };
        assert_eq!(
            decode_status(&document),
            Some(CacheStatus {
                updated_at: "2026-10-19T08:00:00Z".to_string()
            })
        );
    }

    #[test]
    fn clear_commit_deletes_listed_and_status_docs() {
        let documents = vec![cached("students", "[]")];
        let body = build_clear_commit(&paths(), &documents);
        assert_eq!(body["writes"].as_array().unwrap().len(), 2);
    }
}
