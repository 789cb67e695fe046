use reqwest::{Client, Method, RequestBuilder, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::media::{Media, multipart_related};
use crate::models::{
    About, Change, ChangeList, File, FileList, Permission, PermissionId, PermissionList,
};
use crate::query::Query;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

impl DriveError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            DriveError::Api { status, .. } => Some(classify_api_status(*status)),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.classification(),
            Some(ApiErrorClass::RateLimit | ApiErrorClass::Transient)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DriveError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_EARLY
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

/// One page of `files.list`.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub query: Option<Query>,
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
}

impl ListRequest {
    pub fn with_query(query: Query) -> Self {
        Self {
            query: Some(query),
            ..Self::default()
        }
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// One page of `changes.list`.
#[derive(Debug, Clone, Default)]
pub struct ChangesRequest {
    pub start_change_id: Option<i64>,
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
}

/// Per-call toggles for `files.update`. Only enabled toggles are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateParams {
    pub set_modified_date: bool,
    pub ocr: bool,
    pub convert: bool,
    pub pinned: bool,
    pub use_content_as_indexable_text: bool,
    pub update_viewed_date: bool,
    pub new_revision: bool,
}

impl UpdateParams {
    fn pairs(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.set_modified_date, "setModifiedDate"),
            (self.ocr, "ocr"),
            (self.convert, "convert"),
            (self.pinned, "pinned"),
            (
                self.use_content_as_indexable_text,
                "useContentAsIndexableText",
            ),
            (self.update_viewed_date, "updateViewedDate"),
            (self.new_revision, "newRevision"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
    }
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl DriveClient {
    pub fn new(token: impl Into<String>) -> Result<Self, DriveError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, DriveError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: Some(token.into()),
        })
    }

    /// Uses a client that already carries (and refreshes) its own credentials.
    pub fn with_http_client(base_url: &str, http: Client) -> Result<Self, DriveError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            token: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_file(&self, id: &str) -> Result<File, DriveError> {
        let url = self.endpoint(&format!("/drive/v2/files/{}", escape_segment(id)))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn list_files(&self, request: &ListRequest) -> Result<FileList, DriveError> {
        let mut url = self.endpoint("/drive/v2/files")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(q) = request.query.as_ref().filter(|q| !q.is_empty()) {
                query.append_pair("q", &q.to_string());
            }
            if let Some(max_results) = request.max_results {
                query.append_pair("maxResults", &max_results.to_string());
            }
            if let Some(token) = request.page_token.as_deref().filter(|t| !t.is_empty()) {
                query.append_pair("pageToken", token);
            }
        }
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn insert_file(&self, metadata: &File, media: Option<Media>) -> Result<File, DriveError> {
        let builder = match media {
            None => {
                let url = self.endpoint("/drive/v2/files")?;
                self.request(Method::POST, url).json(metadata)
            }
            Some(media) => {
                let mut url = self.endpoint("/upload/drive/v2/files")?;
                url.query_pairs_mut().append_pair("uploadType", "multipart");
                let multipart = multipart_related(metadata, media)?;
                self.request(Method::POST, url)
                    .header("Content-Type", multipart.content_type)
                    .body(multipart.body)
            }
        };
        self.send_json(builder).await
    }

    pub async fn update_file(
        &self,
        id: &str,
        metadata: &File,
        params: &UpdateParams,
        media: Option<Media>,
    ) -> Result<File, DriveError> {
        let id = escape_segment(id);
        let mut url = if media.is_some() {
            self.endpoint(&format!("/upload/drive/v2/files/{id}"))?
        } else {
            self.endpoint(&format!("/drive/v2/files/{id}"))?
        };
        {
            let mut query = url.query_pairs_mut();
            if media.is_some() {
                query.append_pair("uploadType", "multipart");
            }
            for name in params.pairs() {
                query.append_pair(name, "true");
            }
        }
        let builder = match media {
            None => self.request(Method::PUT, url).json(metadata),
            Some(media) => {
                let multipart = multipart_related(metadata, media)?;
                self.request(Method::PUT, url)
                    .header("Content-Type", multipart.content_type)
                    .body(multipart.body)
            }
        };
        self.send_json(builder).await
    }

    pub async fn trash_file(&self, id: &str) -> Result<File, DriveError> {
        let url = self.endpoint(&format!("/drive/v2/files/{}/trash", escape_segment(id)))?;
        self.send_json(self.request(Method::POST, url)).await
    }

    pub async fn untrash_file(&self, id: &str) -> Result<File, DriveError> {
        let url = self.endpoint(&format!("/drive/v2/files/{}/untrash", escape_segment(id)))?;
        self.send_json(self.request(Method::POST, url)).await
    }

    pub async fn empty_trash(&self) -> Result<(), DriveError> {
        let url = self.endpoint("/drive/v2/files/trash")?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    pub async fn touch_file(&self, id: &str) -> Result<File, DriveError> {
        let url = self.endpoint(&format!("/drive/v2/files/{}/touch", escape_segment(id)))?;
        self.send_json(self.request(Method::POST, url)).await
    }

    pub async fn about(&self) -> Result<About, DriveError> {
        let url = self.endpoint("/drive/v2/about")?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn list_changes(&self, request: &ChangesRequest) -> Result<ChangeList, DriveError> {
        let mut url = self.endpoint("/drive/v2/changes")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(start) = request.start_change_id {
                query.append_pair("startChangeId", &start.to_string());
            }
            if let Some(max_results) = request.max_results {
                query.append_pair("maxResults", &max_results.to_string());
            }
            if let Some(token) = request.page_token.as_deref().filter(|t| !t.is_empty()) {
                query.append_pair("pageToken", token);
            }
        }
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn get_change(&self, change_id: &str) -> Result<Change, DriveError> {
        let url = self.endpoint(&format!("/drive/v2/changes/{}", escape_segment(change_id)))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn list_permissions(&self, file_id: &str) -> Result<PermissionList, DriveError> {
        let url = self.endpoint(&format!(
            "/drive/v2/files/{}/permissions",
            escape_segment(file_id)
        ))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn insert_permission(
        &self,
        file_id: &str,
        permission: &Permission,
        email_message: Option<&str>,
    ) -> Result<Permission, DriveError> {
        let mut url = self.endpoint(&format!(
            "/drive/v2/files/{}/permissions",
            escape_segment(file_id)
        ))?;
        if let Some(message) = email_message.filter(|m| !m.is_empty()) {
            url.query_pairs_mut().append_pair("emailMessage", message);
        }
        self.send_json(self.request(Method::POST, url).json(permission))
            .await
    }

    pub async fn delete_permission(
        &self,
        file_id: &str,
        permission_id: &str,
    ) -> Result<(), DriveError> {
        let url = self.endpoint(&format!(
            "/drive/v2/files/{}/permissions/{}",
            escape_segment(file_id),
            escape_segment(permission_id)
        ))?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    pub async fn permission_id_for_email(&self, email: &str) -> Result<PermissionId, DriveError> {
        let url = self.endpoint(&format!("/drive/v2/permissionIds/{}", escape_segment(email)))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    /// GETs raw content from a download or export URL.
    pub async fn download(&self, url: &str) -> Result<reqwest::Response, DriveError> {
        let url = Url::parse(url)?;
        let response = self.request(Method::GET, url).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DriveError::Api { status, body })
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "drive request");
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, DriveError> {
        Ok(self.base_url.join(path)?)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, DriveError> {
        let response = builder.send().await?;
        Self::handle_response(response).await
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), DriveError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DriveError::Api { status, body })
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DriveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DriveError::Api { status, body })
        }
    }
}

fn escape_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
