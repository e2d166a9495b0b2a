use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::task::Task;
use crate::storage::StorageError;

/// Sync configuration, persisted under its own file next to the task
/// collection.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    pub remote_db: RemoteDbSettings,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDbSettings {
    pub enabled: bool,
    pub url: Option<String>,
    pub api_key: Option<String>,
}

/// Load sync settings, degrading to defaults on a missing or corrupt file.
pub fn load_sync_settings(path: &Path) -> SyncSettings {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("failed to parse sync settings, using defaults: {e}");
                SyncSettings::default()
            }
        },
        Err(_) => SyncSettings::default(),
    }
}

pub fn save_sync_settings(path: &Path, settings: &SyncSettings) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| StorageError::SerializeFailed { source: e })?;

    std::fs::write(path, json).map_err(|e| StorageError::SaveFailed {
        path: PathBuf::from(path),
        source: e,
    })
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote sync is not configured")]
    NotConfigured,

    #[error("Sync request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sync failed with status {0}")]
    Status(u16),
}

#[derive(Serialize)]
struct PushPayload<'a> {
    tasks: &'a [Task],
}

#[derive(Deserialize)]
struct PullPayload {
    tasks: Vec<Value>,
}

/// Best-effort client for the user-configured remote endpoint. Every call is
/// fire-and-forget from the store's point of view: failures are reported,
/// never retried, and never block a local operation.
pub struct SyncClient {
    url: String,
    api_key: Option<String>,
    http: reqwest::blocking::Client,
}

impl SyncClient {
    pub fn from_settings(settings: &RemoteDbSettings) -> Result<Self, SyncError> {
        if !settings.enabled {
            return Err(SyncError::NotConfigured);
        }
        let Some(url) = settings.url.clone().filter(|u| !u.is_empty()) else {
            return Err(SyncError::NotConfigured);
        };

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            url,
            api_key: settings.api_key.clone(),
            http,
        })
    }

    /// POST the full collection as `{"tasks": [...]}`.
    pub fn push(&self, tasks: &[Task]) -> Result<(), SyncError> {
        let request = self.authorize(self.http.post(&self.url)).json(&PushPayload { tasks });
        let response = request.send()?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    /// GET the remote collection. The records are returned raw and are NOT
    /// merged into the local store; there is no merge policy yet.
    pub fn pull(&self) -> Result<Vec<Value>, SyncError> {
        let response = self.authorize(self.http.get(&self.url)).send()?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }

        let payload: PullPayload = response.json()?;
        Ok(payload.tasks)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_settings_load_fails_soft() {
        let dir = tempfile::tempdir().unwrap();

        let missing = load_sync_settings(&dir.path().join("sync.json"));
        assert_eq!(missing, SyncSettings::default());

        let corrupt_path = dir.path().join("corrupt.json");
        std::fs::write(&corrupt_path, "{ nope").unwrap();
        assert_eq!(load_sync_settings(&corrupt_path), SyncSettings::default());
    }

    #[test]
    fn test_settings_round_trip_with_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.json");

        let settings = SyncSettings {
            remote_db: RemoteDbSettings {
                enabled: true,
                url: Some(String::from("https://example.test/tasks")),
                api_key: Some(String::from("secret")),
            },
        };

        save_sync_settings(&path, &settings).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["remoteDb"]["apiKey"], "secret");
        assert_eq!(load_sync_settings(&path), settings);
    }

    #[test]
    fn test_client_requires_enabled_url() {
        let disabled = RemoteDbSettings {
            enabled: false,
            url: Some(String::from("https://example.test")),
            api_key: None,
        };
        assert!(matches!(
            SyncClient::from_settings(&disabled),
            Err(SyncError::NotConfigured)
        ));

        let missing_url = RemoteDbSettings {
            enabled: true,
            url: None,
            api_key: None,
        };
        assert!(matches!(
            SyncClient::from_settings(&missing_url),
            Err(SyncError::NotConfigured)
        ));
    }

    #[test]
    fn test_push_posts_tasks_with_bearer_token() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("POST"))
                .and(header("authorization", "Bearer secret"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server),
        );

        let client = SyncClient::from_settings(&RemoteDbSettings {
            enabled: true,
            url: Some(server.uri()),
            api_key: Some(String::from("secret")),
        })
        .unwrap();

        let tasks = vec![Task {
            title: String::from("Synced"),
            ..Task::default()
        }];
        client.push(&tasks).unwrap();

        let requests = rt.block_on(server.received_requests()).unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["tasks"][0]["title"], "Synced");
    }

    #[test]
    fn test_push_surfaces_non_success_status() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server),
        );

        let client = SyncClient::from_settings(&RemoteDbSettings {
            enabled: true,
            url: Some(server.uri()),
            api_key: None,
        })
        .unwrap();

        assert!(matches!(client.push(&[]), Err(SyncError::Status(503))));
    }

    #[test]
    fn test_pull_returns_raw_records_without_merging() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "tasks": [{"title": "Remote"}, {"title": "Other", "id": "r2"}]
                })))
                .mount(&server),
        );

        let client = SyncClient::from_settings(&RemoteDbSettings {
            enabled: true,
            url: Some(server.uri()),
            api_key: None,
        })
        .unwrap();

        let records = client.pull().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["title"], "Remote");
    }
}
