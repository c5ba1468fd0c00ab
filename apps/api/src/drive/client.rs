//! Google Drive v3 REST client with OAuth refresh-token handling.
//!
//! Tokens come from a token file in the google-auth JSON layout. The
//! interactive consent flow is never run by the server: without a usable
//! token file the client is simply not constructed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::DriveConfig;
use crate::drive::{DocumentStore, RemoteDocument};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
const BOUNDARY: &str = "second_brain_upload_boundary";
/// Tokens this close to expiry are refreshed before use.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drive API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authorization error: {0}")]
    Auth(String),
}

/// Token file contents. Unknown fields are kept so rewriting the file after
/// a refresh does not drop anything the file's other readers rely on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredToken {
    /// An access token that will not expire within the skew window.
    fn usable_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref()?;
        match self.expiry {
            Some(expiry) if expiry <= now + Duration::seconds(EXPIRY_SKEW_SECS) => None,
            _ => Some(token),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.token.is_some() || self.refresh_token.is_some()
    }
}

/// Whether the token file exists and holds an access or refresh token.
/// Unreadable or malformed files count as unauthenticated.
pub fn token_file_is_authenticated(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<StoredToken>(&raw).ok())
        .is_some_and(|token| token.is_authenticated())
}

/// OAuth client secrets file as downloaded from the Google console.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

pub struct DriveClient {
    http: Client,
    files_url: String,
    upload_url: String,
    credentials_path: PathBuf,
    token_path: PathBuf,
    token: Mutex<StoredToken>,
}

impl DriveClient {
    /// Returns `Ok(None)` when Drive is not configured (no credentials file)
    /// or not authenticated (no token file, or a token file without tokens).
    pub fn load(config: &DriveConfig, http: Client) -> Result<Option<Self>, DriveError> {
        if !config.credentials_path.exists() || !config.token_path.exists() {
            return Ok(None);
        }

        let token: StoredToken =
            serde_json::from_str(&std::fs::read_to_string(&config.token_path)?)?;
        if !token.is_authenticated() {
            return Ok(None);
        }

        info!("Drive token loaded from {}", config.token_path.display());
        let base = config.api_base_url.trim_end_matches('/');
        Ok(Some(Self {
            http,
            files_url: format!("{base}/drive/v3/files"),
            upload_url: format!("{base}/upload/drive/v3/files"),
            credentials_path: config.credentials_path.clone(),
            token_path: config.token_path.clone(),
            token: Mutex::new(token),
        }))
    }

    /// Returns a valid access token, refreshing and persisting it when expired.
    async fn access_token(&self) -> Result<String, DriveError> {
        let mut token = self.token.lock().await;
        if let Some(access) = token.usable_access_token(Utc::now()) {
            return Ok(access.to_string());
        }
        self.refresh(&mut token).await?;
        token
            .token
            .clone()
            .ok_or_else(|| DriveError::Auth("refresh returned no access token".to_string()))
    }

    async fn refresh(&self, token: &mut StoredToken) -> Result<(), DriveError> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| DriveError::Auth("access token expired and no refresh token".to_string()))?;
        let (client_id, client_secret, secrets_uri) = self.client_credentials(token)?;
        let token_uri = token
            .token_uri
            .clone()
            .or(secrets_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        let response = self
            .http
            .post(&token_uri)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let refreshed: RefreshResponse = check(response).await?.json().await?;

        token.token = Some(refreshed.access_token);
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        token.client_id = Some(client_id);
        token.client_secret = Some(client_secret);
        token.token_uri = Some(token_uri);

        tokio::fs::write(&self.token_path, serde_json::to_string_pretty(&*token)?).await?;
        debug!("Drive access token refreshed");
        Ok(())
    }

    /// Client id and secret from the token file, falling back to the
    /// credentials file.
    fn client_credentials(
        &self,
        token: &StoredToken,
    ) -> Result<(String, String, Option<String>), DriveError> {
        if let (Some(id), Some(secret)) = (&token.client_id, &token.client_secret) {
            return Ok((id.clone(), secret.clone(), None));
        }
        let secrets = read_client_secrets(&self.credentials_path)?;
        Ok((secrets.client_id, secrets.client_secret, secrets.token_uri))
    }

    async fn upload(
        &self,
        request: reqwest::RequestBuilder,
        metadata: &Value,
        html: &str,
    ) -> Result<Response, DriveError> {
        let access = self.access_token().await?;
        let response = request
            .bearer_auth(access)
            .header(
                "content-type",
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(multipart_body(metadata, html))
            .send()
            .await?;
        check(response).await
    }
}

#[async_trait]
impl DocumentStore for DriveClient {
    async fn ensure_folder(&self, name: &str) -> Result<String, DriveError> {
        let access = self.access_token().await?;
        let query = folder_query(name);
        let response = self
            .http
            .get(&self.files_url)
            .bearer_auth(&access)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
            ])
            .send()
            .await?;
        let existing: FileList = check(response).await?.json().await?;
        if let Some(folder) = existing.files.into_iter().next() {
            return Ok(folder.id);
        }

        let response = self
            .http
            .post(&self.files_url)
            .bearer_auth(&access)
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME }))
            .send()
            .await?;
        let folder: FileRef = check(response).await?.json().await?;
        info!("Created Drive folder '{name}' ({})", folder.id);
        Ok(folder.id)
    }

    async fn create_document(
        &self,
        folder_id: &str,
        document: &RemoteDocument,
    ) -> Result<String, DriveError> {
        let metadata = json!({
            "name": document.name,
            "parents": [folder_id],
            "mimeType": DOCUMENT_MIME,
        });
        let request = self
            .http
            .post(&self.upload_url)
            .query(&[("uploadType", "multipart"), ("fields", "id")]);
        let created: FileRef = self
            .upload(request, &metadata, &document.html)
            .await?
            .json()
            .await?;
        Ok(created.id)
    }

    async fn update_document(
        &self,
        file_id: &str,
        document: &RemoteDocument,
    ) -> Result<(), DriveError> {
        let metadata = json!({ "name": document.name });
        let request = self
            .http
            .patch(format!("{}/{file_id}", self.upload_url))
            .query(&[("uploadType", "multipart")]);
        self.upload(request, &metadata, &document.html).await?;
        Ok(())
    }

    async fn trash_document(&self, file_id: &str) -> Result<(), DriveError> {
        let access = self.access_token().await?;
        let response = self
            .http
            .patch(format!("{}/{file_id}", self.files_url))
            .bearer_auth(access)
            .json(&json!({ "trashed": true }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Passes successful responses through; turns failures into `DriveError::Api`.
async fn check(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(DriveError::Api {
        status: status.as_u16(),
        message,
    })
}

fn read_client_secrets(path: &Path) -> Result<ClientSecrets, DriveError> {
    let file: ClientSecretsFile = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    file.installed
        .or(file.web)
        .ok_or_else(|| DriveError::Auth(format!("{} has no client section", path.display())))
}

/// Drive search query for a live (non-trashed) folder with this exact name.
fn folder_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name='{escaped}' and mimeType='{FOLDER_MIME}' and trashed=false")
}

/// `multipart/related` body: JSON metadata part followed by the HTML media part.
fn multipart_body(metadata: &Value, html: &str) -> Bytes {
    let mut body = BytesMut::new();
    body.put_slice(
        format!("--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.put_slice(metadata.to_string().as_bytes());
    body.put_slice(
        format!("\r\n--{BOUNDARY}\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.put_slice(html.as_bytes());
    body.put_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex as StdMutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::Router;

    fn drive_config(dir: &Path) -> DriveConfig {
        DriveConfig {
            credentials_path: dir.join("credentials.json"),
            token_path: dir.join("token.json"),
            folder_name: "Second Brain".to_string(),
            api_base_url: "https://www.googleapis.com".to_string(),
        }
    }

    #[test]
    fn test_load_without_credentials_is_unconfigured() {
        let dir = tempfile::tempdir().unwrap();
        let config = drive_config(dir.path());
        fs::write(&config.token_path, r#"{"token": "abc"}"#).unwrap();

        assert!(DriveClient::load(&config, Client::new()).unwrap().is_none());
    }

    #[test]
    fn test_load_without_token_file_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let config = drive_config(dir.path());
        fs::write(&config.credentials_path, "{}").unwrap();

        assert!(DriveClient::load(&config, Client::new()).unwrap().is_none());
    }

    #[test]
    fn test_load_reads_google_auth_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = drive_config(dir.path());
        fs::write(&config.credentials_path, "{}").unwrap();
        fs::write(
            &config.token_path,
            r#"{
                "token": "ya29.access",
                "refresh_token": "1//refresh",
                "token_uri": "https://oauth2.googleapis.com/token",
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "secret",
                "scopes": ["https://www.googleapis.com/auth/drive.file"],
                "expiry": "2030-01-01T00:00:00.000000Z"
            }"#,
        )
        .unwrap();

        let client = DriveClient::load(&config, Client::new()).unwrap().unwrap();
        let token = client.token.try_lock().unwrap();
        assert_eq!(token.usable_access_token(Utc::now()), Some("ya29.access"));
        assert!(token.extra.contains_key("scopes"));
    }

    #[test]
    fn test_token_near_expiry_is_not_usable() {
        let now = Utc::now();
        let token = StoredToken {
            token: Some("t".to_string()),
            expiry: Some(now + Duration::seconds(30)),
            ..Default::default()
        };
        assert!(token.usable_access_token(now).is_none());

        let no_expiry = StoredToken {
            token: Some("t".to_string()),
            ..Default::default()
        };
        assert_eq!(no_expiry.usable_access_token(now), Some("t"));
    }

    #[test]
    fn test_client_secrets_fall_back_to_web_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(
            &path,
            r#"{"web": {"client_id": "web-id", "client_secret": "web-secret"}}"#,
        )
        .unwrap();

        let secrets = read_client_secrets(&path).unwrap();
        assert_eq!(secrets.client_id, "web-id");
        assert!(secrets.token_uri.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_token_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = drive_config(dir.path());
        fs::write(&config.credentials_path, "{}").unwrap();
        fs::write(
            &config.token_path,
            r#"{"token": "old", "expiry": "2001-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let client = DriveClient::load(&config, Client::new()).unwrap().unwrap();
        let err = client.access_token().await.unwrap_err();
        assert!(matches!(err, DriveError::Auth(_)));
    }

    #[test]
    fn test_folder_query_escapes_quotes() {
        assert_eq!(
            folder_query("Bob's Brain"),
            "name='Bob\\'s Brain' and mimeType='application/vnd.google-apps.folder' and trashed=false"
        );
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body(&json!({ "name": "[NOTE] T" }), "<html></html>");
        let text = String::from_utf8(body.to_vec()).unwrap();
        let expected = format!(
            "--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n\
             {{\"name\":\"[NOTE] T\"}}\r\n--{BOUNDARY}\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n\
             <html></html>\r\n--{BOUNDARY}--\r\n"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_token_file_authentication_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        assert!(!token_file_is_authenticated(&path));

        fs::write(&path, r#"{"refresh_token": "1//refresh"}"#).unwrap();
        assert!(token_file_is_authenticated(&path));

        fs::write(&path, r#"{"scopes": []}"#).unwrap();
        assert!(!token_file_is_authenticated(&path));

        fs::write(&path, "not json").unwrap();
        assert!(!token_file_is_authenticated(&path));
    }

    /// Local stand-in for the OAuth token endpoint and the Drive v3 API.
    #[derive(Default)]
    struct StubDrive {
        existing_folder: Option<String>,
        requests: StdMutex<Vec<RecordedRequest>>,
    }

    #[derive(Debug, Clone)]
    struct RecordedRequest {
        method: String,
        path: String,
        query: String,
        authorization: Option<String>,
        content_type: Option<String>,
        body: String,
    }

    impl StubDrive {
        fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn stub_drive(
        State(stub): State<Arc<StubDrive>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, axum::Json<Value>) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let path = uri.path().to_string();
        stub.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path: path.clone(),
            query: uri.query().unwrap_or_default().to_string(),
            authorization: header("authorization"),
            content_type: header("content-type"),
            body,
        });

        let ok = |value: Value| (StatusCode::OK, axum::Json(value));
        match (method.as_str(), path.as_str()) {
            ("POST", "/token") => ok(json!({ "access_token": "fresh-token", "expires_in": 3600 })),
            ("GET", "/drive/v3/files") => {
                let files = match &stub.existing_folder {
                    Some(id) => json!([{ "id": id, "name": "Second Brain" }]),
                    None => json!([]),
                };
                ok(json!({ "files": files }))
            }
            ("POST", "/drive/v3/files") => ok(json!({ "id": "folder-1" })),
            ("POST", "/upload/drive/v3/files") => ok(json!({ "id": "doc-1" })),
            ("PATCH", "/upload/drive/v3/files/doc-1") | ("PATCH", "/drive/v3/files/doc-1") => {
                ok(json!({ "id": "doc-1" }))
            }
            _ => (
                StatusCode::NOT_FOUND,
                axum::Json(json!({ "error": { "code": 404, "message": format!("File not found: {path}") } })),
            ),
        }
    }

    /// Serves `stub` on an ephemeral local port and returns its base URL.
    async fn serve_stub(stub: Arc<StubDrive>) -> String {
        let app = Router::new().fallback(stub_drive).with_state(stub);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{addr}")
    }

    fn stub_config(dir: &Path, base: &str, token: &str) -> DriveConfig {
        let config = DriveConfig {
            api_base_url: base.to_string(),
            ..drive_config(dir)
        };
        fs::write(
            &config.credentials_path,
            r#"{"installed": {"client_id": "cid", "client_secret": "csecret"}}"#,
        )
        .unwrap();
        fs::write(&config.token_path, token).unwrap();
        config
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_documents_round_trip() {
        let stub = Arc::new(StubDrive::default());
        let base = serve_stub(stub.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let token = json!({
            "token": "stale",
            "refresh_token": "r1",
            "token_uri": format!("{base}/token"),
            "scopes": ["https://www.googleapis.com/auth/drive.file"],
            "expiry": "2001-01-01T00:00:00Z",
        });
        let config = stub_config(dir.path(), &base, &token.to_string());
        let client = DriveClient::load(&config, Client::new()).unwrap().unwrap();

        let document = RemoteDocument {
            name: "[NOTE] Test".to_string(),
            html: "<p>Hello</p>".to_string(),
        };
        let folder_id = client.ensure_folder("Second Brain").await.unwrap();
        assert_eq!(folder_id, "folder-1");
        let file_id = client.create_document(&folder_id, &document).await.unwrap();
        assert_eq!(file_id, "doc-1");
        client.update_document(&file_id, &document).await.unwrap();
        client.trash_document(&file_id).await.unwrap();

        let requests = stub.requests();
        let calls: Vec<(&str, &str)> = requests
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str()))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("POST", "/token"),
                ("GET", "/drive/v3/files"),
                ("POST", "/drive/v3/files"),
                ("POST", "/upload/drive/v3/files"),
                ("PATCH", "/upload/drive/v3/files/doc-1"),
                ("PATCH", "/drive/v3/files/doc-1"),
            ]
        );

        let refresh = &requests[0];
        assert!(refresh.body.contains("grant_type=refresh_token"));
        assert!(refresh.body.contains("refresh_token=r1"));
        assert!(refresh.body.contains("client_id=cid"));
        for request in &requests[1..] {
            assert_eq!(request.authorization.as_deref(), Some("Bearer fresh-token"));
        }

        assert!(requests[1].query.contains("spaces=drive"));
        assert!(requests[2].body.contains(FOLDER_MIME));
        let upload = &requests[3];
        assert!(upload.query.contains("uploadType=multipart"));
        assert_eq!(
            upload.content_type.as_deref(),
            Some(format!("multipart/related; boundary={BOUNDARY}").as_str())
        );
        assert!(upload.body.contains(r#""parents":["folder-1"]"#));
        assert!(upload.body.contains("<p>Hello</p>"));
        assert!(requests[5].body.contains(r#""trashed":true"#));

        let rewritten: Value =
            serde_json::from_str(&fs::read_to_string(&config.token_path).unwrap()).unwrap();
        assert_eq!(rewritten["token"], "fresh-token");
        assert_eq!(rewritten["refresh_token"], "r1");
        assert_eq!(rewritten["client_id"], "cid");
        assert_eq!(rewritten["client_secret"], "csecret");
        assert!(rewritten["scopes"].is_array());
    }

    #[tokio::test]
    async fn test_existing_folder_is_reused_and_api_errors_carry_message() {
        let stub = Arc::new(StubDrive {
            existing_folder: Some("existing-folder".to_string()),
            ..Default::default()
        });
        let base = serve_stub(stub.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let config = stub_config(
            dir.path(),
            &format!("{base}/"),
            r#"{"token": "still-valid", "expiry": "2099-01-01T00:00:00Z"}"#,
        );
        let client = DriveClient::load(&config, Client::new()).unwrap().unwrap();

        assert_eq!(
            client.ensure_folder("Second Brain").await.unwrap(),
            "existing-folder"
        );
        let err = client.trash_document("doc-9").await.unwrap_err();
        match err {
            DriveError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "File not found: /drive/v3/files/doc-9");
            }
            other => panic!("unexpected error: {other}"),
        }

        let requests = stub.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.path != "/token"));
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer still-valid"));
    }
}
