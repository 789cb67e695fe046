use drive_core::Query;
use futures_util::future::BoxFuture;
use tracing::{debug, info};

use crate::error::RemoteError;
use crate::object::{LocalObject, RemoteObject};
use crate::pager::PageStream;
use crate::paths::{is_root, segments, split_parent, to_remote_title};
use crate::remote::{ROOT_ID, Remote};
use crate::upsert::UpsertRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Active,
    Trashed,
}

impl Remote {
    /// Resolves a `/`-delimited path in the active (non-trashed) tree.
    pub async fn resolve(&self, path: &str) -> Result<RemoteObject, RemoteError> {
        self.resolve_in(path, View::Active).await
    }

    /// Resolves a path among trashed objects. The final segment is matched by
    /// title alone since a trashed object's parent may no longer be meaningful.
    pub async fn resolve_trashed(&self, path: &str) -> Result<RemoteObject, RemoteError> {
        self.resolve_in(path, View::Trashed).await
    }

    async fn resolve_in(&self, path: &str, view: View) -> Result<RemoteObject, RemoteError> {
        if is_root(path) {
            return self.find_by_id(ROOT_ID).await;
        }

        let parts: Vec<&str> = segments(path).collect();
        let mut parent_id = ROOT_ID.to_string();
        let mut found = None;
        for (index, segment) in parts.iter().enumerate() {
            let last = index + 1 == parts.len();
            let title = to_remote_title(segment);
            let mut query = Query::new();
            if !(view == View::Trashed && last) {
                query = query.parent_in(&parent_id);
            }
            let query = query.title_eq(&title).trashed(view == View::Trashed);

            let Some(object) = self.find_one(query).await? else {
                debug!(path, segment, ?view, "path segment not found");
                return Err(RemoteError::NotFound(path.to_string()));
            };
            parent_id = object.id.clone();
            found = Some(object);
        }
        found.ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }

    /// Lists objects shared with the caller, optionally narrowed to the title
    /// given by the first segment of `path`. The shared view has no hierarchy.
    pub fn resolve_shared(&self, path: &str) -> PageStream<RemoteObject> {
        let mut query = Query::new();
        if path != ROOT_ID
            && let Some(name) = segments(path).next()
        {
            query = query.title_eq(&to_remote_title(name));
        }
        self.list_stream(query.shared_with_me(), false)
    }

    /// Makes sure every directory along `path` exists, creating missing ones.
    ///
    /// Concurrent callers are tolerated through the initial existence check
    /// only; two callers that both miss it will each create the directory.
    pub fn ensure_directory_path<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<RemoteObject, RemoteError>> {
        Box::pin(async move {
            match self.resolve(path).await {
                Ok(existing) => return Ok(existing),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }

            let (parent_path, name) =
                split_parent(path).ok_or_else(|| RemoteError::CannotModifyRoot(path.to_string()))?;
            let parent = self.ensure_directory_path(parent_path).await?;

            info!(path, parent = %parent.id, "creating missing directory");
            self.upsert(UpsertRequest::new(parent.id, LocalObject::directory(name)))
                .await
        })
    }
}
