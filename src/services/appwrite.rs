use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::services::media::{MediaError, MediaStore, StoredMedia};
use crate::services::store::{Document, DocumentStore, RangeQuery, StoreError};

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for StoreError {
    fn from(err: AppwriteError) -> Self {
        match err {
            AppwriteError::RequestError(_) | AppwriteError::ServerError(_) => {
                StoreError::Unavailable(err.to_string())
            }
            AppwriteError::InvalidResponse(msg) => StoreError::InvalidResponse(msg),
            other => StoreError::Rejected(other.to_string()),
        }
    }
}

impl From<AppwriteError> for MediaError {
    fn from(err: AppwriteError) -> Self {
        MediaError::Upload(err.to_string())
    }
}

/// Appwrite API client
///
/// Backs both the document store (profiles, swipes, match lists) and the
/// blob store (profile photos, one storage bucket).
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    bucket_id: String,
    client: Client,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        bucket_id: String,
        timeout: Duration,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            project_id,
            database_id,
            bucket_id,
            client,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url, self.database_id, collection
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.documents_url(collection), urlencoding::encode(id))
    }

    fn files_url(&self) -> String {
        format!("{}/storage/buckets/{}/files", self.base_url, self.bucket_id)
    }

    /// Public URL of an uploaded file
    pub fn file_view_url(&self, file_id: &str) -> String {
        format!(
            "{}/{}/view?project={}",
            self.files_url(),
            file_id,
            urlencoding::encode(&self.project_id)
        )
    }

    /// Map a non-success response onto an error, keeping the body for logs
    async fn status_error(response: Response, context: &str) -> AppwriteError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::debug!("{} failed: {} - {}", context, status, body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppwriteError::Unauthorized,
            StatusCode::NOT_FOUND => AppwriteError::NotFound(context.to_string()),
            StatusCode::CONFLICT => AppwriteError::Conflict(context.to_string()),
            s if s.is_server_error() => AppwriteError::ServerError(format!("{}: {}", context, s)),
            s => AppwriteError::ApiError(format!("{}: {}", context, s)),
        }
    }

    /// Strip Appwrite system attributes (`$id`, `$createdAt`, ...) from a document
    fn into_document(value: Value) -> Result<(String, Document), AppwriteError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            _ => return Err(AppwriteError::InvalidResponse("Document is not an object".into())),
        };

        let id = obj
            .get("$id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppwriteError::InvalidResponse("Document without $id".into()))?;

        // Older deployments wrap attributes in a `data` object
        if let Some(Value::Object(data)) = obj.remove("data") {
            return Ok((id, data));
        }

        obj.retain(|key, _| !key.starts_with('$'));
        Ok((id, obj))
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: Vec<Value>,
    ) -> Result<Vec<(String, Document)>, AppwriteError> {
        let params = queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(&q.to_string())))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{}", self.documents_url(collection), params);

        let response = self.authed(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response, "List documents").await);
        }

        let json: Value = response.json().await?;

        let total = json.get("total").and_then(|t| t.as_u64()).unwrap_or(0);

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .cloned()
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        let docs: Vec<(String, Document)> = documents
            .into_iter()
            .filter_map(|doc| match Self::into_document(doc) {
                Ok(pair) => Some(pair),
                Err(e) => {
                    tracing::warn!("Skipping document in {}: {}", collection, e);
                    None
                }
            })
            .collect();

        tracing::debug!("Listed {} documents from {} (total: {})", docs.len(), collection, total);

        Ok(docs)
    }

    /// PATCH an existing document. Returns `false` when it does not exist.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<bool, AppwriteError> {
        let response = self
            .authed(self.client.patch(self.document_url(collection, id)))
            .json(&json!({ "data": fields }))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::status_error(response, "Update document").await),
        }
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<(), AppwriteError> {
        let response = self
            .authed(self.client.post(self.documents_url(collection)))
            .json(&json!({ "documentId": id, "data": fields }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, "Create document").await);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        tracing::debug!("Fetching {}/{}", collection, id);

        let response = self
            .authed(self.client.get(self.document_url(collection, id)))
            .send()
            .await
            .map_err(AppwriteError::from)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response, "Get document").await.into());
        }

        let json: Value = response.json().await.map_err(AppwriteError::from)?;
        let (_, doc) = Self::into_document(json)?;
        Ok(Some(doc))
    }

    async fn patch(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        if self.update_document(collection, id, &fields).await? {
            return Ok(());
        }

        match self.create_document(collection, id, &fields).await {
            Ok(()) => Ok(()),
            // Another writer created it between our PATCH and POST
            Err(AppwriteError::Conflict(_)) => {
                if self.update_document(collection, id, &fields).await? {
                    Ok(())
                } else {
                    Err(StoreError::Rejected(format!(
                        "{}/{} vanished during create-or-update",
                        collection, id
                    )))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn query_range(
        &self,
        collection: &str,
        query: &RangeQuery,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let queries = vec![
            json!({ "method": "greaterThanEqual", "attribute": query.field, "values": [query.min] }),
            json!({ "method": "lessThanEqual", "attribute": query.field, "values": [query.max] }),
            json!({ "method": "limit", "values": [query.limit] }),
        ];
        Ok(self.list_documents(collection, queries).await?)
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let queries = vec![
            json!({ "method": "equal", "attribute": field, "values": [value] }),
            json!({ "method": "limit", "values": [limit] }),
        ];
        Ok(self.list_documents(collection, queries).await?)
    }

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<(String, Document)>, StoreError> {
        let queries = vec![json!({ "method": "limit", "values": [limit] })];
        Ok(self.list_documents(collection, queries).await?)
    }
}

#[async_trait]
impl MediaStore for AppwriteClient {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<StoredMedia, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::EmptyPayload);
        }

        let file_id = uuid::Uuid::new_v4().to_string();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(format!("{}-{}.jpeg", folder, file_id))
            .mime_str("image/jpeg")
            .map_err(|e| MediaError::Upload(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("fileId", file_id.clone())
            .part("file", part);

        let response = self
            .authed(self.client.post(self.files_url()))
            .multipart(form)
            .send()
            .await
            .map_err(AppwriteError::from)?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, "Upload file").await.into());
        }

        let json: Value = response.json().await.map_err(AppwriteError::from)?;
        let key = json
            .get("$id")
            .and_then(Value::as_str)
            .unwrap_or(file_id.as_str())
            .to_string();

        tracing::debug!("Uploaded file {} to bucket {}", key, self.bucket_id);

        Ok(StoredMedia {
            url: self.file_view_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), MediaError> {
        let url = format!("{}/{}", self.files_url(), urlencoding::encode(key));
        let response = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| MediaError::Delete(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                tracing::debug!("File {} already gone", key);
                Ok(())
            }
            _ => Err(MediaError::Delete(
                Self::status_error(response, "Delete file").await.to_string(),
            )),
        }
    }
}
