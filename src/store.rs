//! Firestore-backed counter store.
//!
//! The counter is one document at a fixed path, `settings/invoiceNumber`,
//! with the shape `{ value: integer }`. Reads and writes go through the
//! Firestore REST API; note that integer fields travel as strings in
//! Firestore's JSON encoding.

use serde::{Deserialize, Serialize};

use crate::counter::CounterStore;
use crate::error::StoreError;

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const COUNTER_DOCUMENT_PATH: &str = "settings/invoiceNumber";

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: String,
    pub base_url: String,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the store at a different endpoint, e.g. a local emulator in
    /// tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    config: FirestoreConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct CounterDocument {
    fields: CounterFields,
}

#[derive(Debug, Serialize, Deserialize)]
struct CounterFields {
    value: IntegerValue,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegerValue {
    integer_value: String,
}

impl CounterDocument {
    fn new(value: i64) -> Self {
        Self {
            fields: CounterFields {
                value: IntegerValue {
                    integer_value: value.to_string(),
                },
            },
        }
    }

    fn value(&self) -> Result<i64, StoreError> {
        self.fields.value.integer_value.parse().map_err(|_| {
            StoreError::Unexpected(format!(
                "counter field is not an integer: {:?}",
                self.fields.value.integer_value
            ))
        })
    }
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn document_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}?key={}",
            self.config.base_url, self.config.project_id, COUNTER_DOCUMENT_PATH, self.config.api_key
        )
    }
}

impl CounterStore for FirestoreStore {
    async fn get(&self) -> Result<Option<i64>, StoreError> {
        let response = self.client.get(self.document_url()).send().await?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let document: CounterDocument = response.json().await?;
                document.value().map(Some)
            }
            status => Err(StoreError::Unexpected(format!(
                "read returned HTTP {status}"
            ))),
        }
    }

    async fn set(&self, value: i64) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.document_url())
            .json(&CounterDocument::new(value))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Unexpected(format!(
                "write returned HTTP {status}"
            )));
        }
        tracing::trace!(value, "persisted invoice counter");
        Ok(())
    }
}
