use std::path::{Path, PathBuf};
use std::sync::Arc;

use drive_core::{About, DriveClient, ListRequest, Query};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::mime::MimeResolver;
use crate::object::RemoteObject;
use crate::pager::{Page, PageStream};
use crate::paths::is_hidden;
use crate::upsert::{ChecksumOracle, DiffOracle};

/// Well-known identifier of the namespace root.
pub const ROOT_ID: &str = "root";

/// Path-oriented view over a [`DriveClient`]. Cloning is cheap and shares the transport.
#[derive(Clone)]
pub struct Remote {
    pub(crate) client: DriveClient,
    pub(crate) mime: MimeResolver,
    pub(crate) config: RemoteConfig,
    pub(crate) oracle: Arc<dyn DiffOracle>,
}

impl Remote {
    pub fn new(client: DriveClient, config: RemoteConfig) -> Self {
        Self {
            client,
            mime: MimeResolver::new(),
            config,
            oracle: Arc::new(ChecksumOracle),
        }
    }

    /// Replaces the comparison used to decide whether an update carries content.
    pub fn with_diff_oracle(mut self, oracle: impl DiffOracle + 'static) -> Self {
        self.oracle = Arc::new(oracle);
        self
    }

    pub fn with_token(config: RemoteConfig, token: impl Into<String>) -> Result<Self, RemoteError> {
        let client = DriveClient::with_base_url(&config.api_base_url, token)?;
        Ok(Self::new(client, config))
    }

    /// Wraps a collaborator-supplied client that already authenticates its requests.
    pub fn with_http_client(config: RemoteConfig, http: reqwest::Client) -> Result<Self, RemoteError> {
        let client = DriveClient::with_http_client(&config.api_base_url, http)?;
        Ok(Self::new(client, config))
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    pub async fn find_by_id(&self, id: &str) -> Result<RemoteObject, RemoteError> {
        let file = self
            .client
            .get_file(id)
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))?;
        RemoteObject::try_from(file)
    }

    /// Lists active children, hiding dot-named entries when the config says so.
    pub fn list_children(&self, parent_id: &str) -> PageStream<RemoteObject> {
        self.list_children_filtered(parent_id, self.config.hide_hidden)
    }

    pub fn list_children_filtered(
        &self,
        parent_id: &str,
        hide_hidden: bool,
    ) -> PageStream<RemoteObject> {
        let query = Query::new().parent_in(parent_id).trashed(false);
        self.list_stream(query, hide_hidden)
    }

    pub fn list_trashed_children(&self, parent_id: &str) -> PageStream<RemoteObject> {
        self.list_trashed_children_filtered(parent_id, self.config.hide_hidden)
    }

    pub fn list_trashed_children_filtered(
        &self,
        parent_id: &str,
        hide_hidden: bool,
    ) -> PageStream<RemoteObject> {
        let query = Query::new().parent_in(parent_id).trashed(true);
        self.list_stream(query, hide_hidden)
    }

    pub(crate) fn list_stream(&self, query: Query, hide_hidden: bool) -> PageStream<RemoteObject> {
        let client = self.client.clone();
        let template = ListRequest::with_query(query).max_results(self.config.page_size);
        PageStream::spawn(
            move |page_token| {
                let client = client.clone();
                let mut request = template.clone();
                request.page_token = page_token;
                async move {
                    let list = client.list_files(&request).await?;
                    let items = list
                        .items
                        .into_iter()
                        .map(RemoteObject::try_from)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok::<_, RemoteError>(Page {
                        items,
                        next_page_token: list.next_page_token,
                    })
                }
            },
            move |object: &RemoteObject| !is_hidden(&object.name, hide_hidden),
        )
    }

    /// Single-result query; ambiguous matches resolve to whatever the store returns first.
    pub(crate) async fn find_one(&self, query: Query) -> Result<Option<RemoteObject>, RemoteError> {
        let request = ListRequest::with_query(query).max_results(1);
        let list = self.client.list_files(&request).await?;
        list.items
            .into_iter()
            .next()
            .map(RemoteObject::try_from)
            .transpose()
    }

    pub async fn trash(&self, id: &str) -> Result<RemoteObject, RemoteError> {
        info!(id, "trashing object");
        let file = self
            .client
            .trash_file(id)
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))?;
        RemoteObject::try_from(file)
    }

    pub async fn untrash(&self, id: &str) -> Result<RemoteObject, RemoteError> {
        info!(id, "restoring object from trash");
        let file = self
            .client
            .untrash_file(id)
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))?;
        RemoteObject::try_from(file)
    }

    pub async fn empty_trash(&self) -> Result<(), RemoteError> {
        info!("emptying trash");
        Ok(self.client.empty_trash().await?)
    }

    pub async fn touch(&self, id: &str) -> Result<RemoteObject, RemoteError> {
        let file = self
            .client
            .touch_file(id)
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))?;
        RemoteObject::try_from(file)
    }

    pub async fn about(&self) -> Result<About, RemoteError> {
        Ok(self.client.about().await?)
    }

    /// Streams an object's content into `target`. Without an export link the
    /// public host URL is used.
    pub async fn download(
        &self,
        id: &str,
        export_url: Option<&str>,
        target: &Path,
    ) -> Result<(), RemoteError> {
        let url = match export_url.filter(|url| !url.is_empty()) {
            Some(url) => url.to_string(),
            None => self.public_url(id),
        };
        debug!(id, %url, target = %target.display(), "downloading object");
        let response = self
            .client
            .download(&url)
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(target);
        if let Err(err) = write_body(response, &partial).await {
            warn!(id, error = %err, "download interrupted, removing partial file");
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err);
        }
        tokio::fs::rename(partial, target).await?;
        Ok(())
    }
}

async fn write_body(response: reqwest::Response, partial: &Path) -> Result<(), RemoteError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(drive_core::DriveError::from)?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
