use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::merge::merge;
use crate::models::Application;
use crate::store::{KeyValue, RecordStore};

/// Well-known name of the data file in the user's cloud storage.
pub const DATA_FILE_NAME: &str = "apptrack-data.json";

/// Cloud failures stay distinguishable so the CLI can tell the user
/// whether to reconnect, retry later, or go look at the message.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not authorized with the cloud provider; run 'apptrack drive login' with a fresh token")]
    Unauthorized,
    #[error("transient cloud error, try again later: {0}")]
    Transient(String),
    #[error("cloud sync failed: {0}")]
    Other(String),
}

/// The file operations sync needs from a cloud storage provider.
pub trait CloudFiles {
    fn find_file(&self) -> Result<Option<String>, SyncError>;
    fn file_content(&self, file_id: &str) -> Result<String, SyncError>;
    fn create_file(&self, content: &str) -> Result<String, SyncError>;
    fn update_file(&self, file_id: &str, content: &str) -> Result<(), SyncError>;
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub total: usize,
    pub remote_found: bool,
    pub remote_corrupt: bool,
    pub created_remote: bool,
}

/// One sync pass: fetch remote, merge, upload merged, replace the local
/// collection, stamp the sync time. Strictly sequential; any collaborator
/// failure aborts with the local collection untouched. A remote blob that
/// does not parse is treated as an empty remote so sync can still proceed
/// and rewrite it.
pub fn run_sync<S: KeyValue>(
    store: &mut RecordStore<S>,
    cloud: &dyn CloudFiles,
    now: DateTime<Utc>,
) -> Result<SyncReport, SyncError> {
    let file_id = cloud.find_file()?;

    let mut report = SyncReport {
        remote_found: file_id.is_some(),
        ..SyncReport::default()
    };

    let remote: Vec<Application> = match &file_id {
        Some(id) => {
            let raw = cloud.file_content(id)?;
            match serde_json::from_str(&raw) {
                Ok(apps) => apps,
                Err(_) => {
                    report.remote_corrupt = true;
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    let merged = merge(store.applications(), &remote);
    let payload =
        serde_json::to_string_pretty(&merged).map_err(|e| SyncError::Other(e.to_string()))?;

    match &file_id {
        Some(id) => cloud.update_file(id, &payload)?,
        None => {
            cloud.create_file(&payload)?;
            report.created_remote = true;
        }
    }

    report.total = merged.len();
    store
        .replace_all(merged)
        .map_err(|e| SyncError::Other(e.to_string()))?;
    store
        .record_sync_time(now)
        .map_err(|e| SyncError::Other(e.to_string()))?;

    Ok(report)
}

// --- Google Drive client ---

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const MULTIPART_BOUNDARY: &str = "apptrack_upload_boundary";

#[derive(Debug, serde::Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, serde::Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

pub struct DriveClient {
    token: String,
    client: reqwest::blocking::Client,
}

impl DriveClient {
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(SyncError::Unauthorized),
            408 | 429 => Err(SyncError::Transient(format!("{status}: {body}"))),
            code if code >= 500 => Err(SyncError::Transient(format!("{status}: {body}"))),
            _ => Err(SyncError::Other(format!("{status}: {body}"))),
        }
    }

    fn transport(error: reqwest::Error) -> SyncError {
        if error.is_timeout() || error.is_connect() {
            SyncError::Transient(error.to_string())
        } else {
            SyncError::Other(error.to_string())
        }
    }
}

impl CloudFiles for DriveClient {
    fn find_file(&self) -> Result<Option<String>, SyncError> {
        let query = format!("name = '{DATA_FILE_NAME}' and trashed = false");
        let response = self
            .client
            .get(DRIVE_FILES_URL)
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
            ])
            .send()
            .map_err(Self::transport)?;

        let listing: DriveFileList = Self::check(response)?
            .json()
            .map_err(|e| SyncError::Other(e.to_string()))?;
        Ok(listing.files.into_iter().next().map(|f| f.id))
    }

    fn file_content(&self, file_id: &str) -> Result<String, SyncError> {
        let response = self
            .client
            .get(format!("{DRIVE_FILES_URL}/{file_id}"))
            .bearer_auth(&self.token)
            .query(&[("alt", "media")])
            .send()
            .map_err(Self::transport)?;
        Self::check(response)?
            .text()
            .map_err(|e| SyncError::Other(e.to_string()))
    }

    fn create_file(&self, content: &str) -> Result<String, SyncError> {
        // multipart/related upload: metadata part then content part.
        let metadata = format!("{{\"name\": \"{DATA_FILE_NAME}\"}}");
        let body = format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n\
             --{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/json\r\n\r\n\
             {content}\r\n\
             --{MULTIPART_BOUNDARY}--"
        );

        let response = self
            .client
            .post(DRIVE_UPLOAD_URL)
            .bearer_auth(&self.token)
            .query(&[("uploadType", "multipart")])
            .header(
                "content-type",
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body)
            .send()
            .map_err(Self::transport)?;

        let file: DriveFile = Self::check(response)?
            .json()
            .map_err(|e| SyncError::Other(e.to_string()))?;
        Ok(file.id)
    }

    fn update_file(&self, file_id: &str, content: &str) -> Result<(), SyncError> {
        let response = self
            .client
            .patch(format!("{DRIVE_UPLOAD_URL}/{file_id}"))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "media")])
            .header("content-type", "application/json")
            .body(content.to_string())
            .send()
            .map_err(Self::transport)?;
        Self::check(response)?;
        Ok(())
    }
}
