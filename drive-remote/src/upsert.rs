use std::io;
use std::path::{Path, PathBuf};

use drive_core::{FOLDER_MIME_TYPE, File, Media, ParentReference, UpdateParams};
use tracing::info;

use crate::error::RemoteError;
use crate::object::{LocalObject, RemoteObject, format_modified};
use crate::paths::to_remote_title;
use crate::remote::Remote;

/// Independent processing toggles for an upsert; all default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    pub convert: bool,
    pub ocr: bool,
    pub update_viewed_date: bool,
    pub content_as_indexable_text: bool,
    pub pinned: bool,
    pub new_revision: bool,
}

impl UpsertOptions {
    pub fn none() -> Self {
        Self::default()
    }

    fn update_params(&self) -> UpdateParams {
        UpdateParams {
            set_modified_date: true,
            ocr: self.ocr,
            convert: self.convert,
            pinned: self.pinned,
            use_content_as_indexable_text: self.content_as_indexable_text,
            update_viewed_date: self.update_viewed_date,
            new_revision: self.new_revision,
        }
    }
}

/// Classification of how a local snapshot differs from its remote counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Differences {
    pub dir_type: bool,
    pub mod_time: bool,
    pub size: bool,
    pub checksum: bool,
}

impl Differences {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub trait DiffOracle: Send + Sync {
    fn differences(
        &self,
        local: &LocalObject,
        remote: &RemoteObject,
        ignore_checksum: bool,
    ) -> Differences;
}

/// Compares md5 checksums, or sizes alone when checksums are ignored or unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumOracle;

impl DiffOracle for ChecksumOracle {
    fn differences(
        &self,
        local: &LocalObject,
        remote: &RemoteObject,
        ignore_checksum: bool,
    ) -> Differences {
        let size = !local.is_dir && !remote.is_dir && local.size != remote.size;
        let checksum = if local.is_dir || remote.is_dir {
            false
        } else if ignore_checksum {
            size
        } else {
            match (&local.md5, &remote.md5) {
                (Some(left), Some(right)) => !left.eq_ignore_ascii_case(right),
                _ => size,
            }
        };
        Differences {
            dir_type: local.is_dir != remote.is_dir,
            mod_time: local.modified != remote.modified,
            size,
            checksum,
        }
    }
}

/// One desired create-or-update. Built per call and consumed by [`Remote::upsert`].
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    pub parent_id: String,
    pub source: Option<PathBuf>,
    pub local: LocalObject,
    pub remote: Option<RemoteObject>,
    pub options: UpsertOptions,
    pub ignore_checksum: bool,
}

impl UpsertRequest {
    pub fn new(parent_id: impl Into<String>, local: LocalObject) -> Self {
        Self {
            parent_id: parent_id.into(),
            source: None,
            local,
            remote: None,
            options: UpsertOptions::none(),
            ignore_checksum: false,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_remote(mut self, remote: RemoteObject) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_options(mut self, options: UpsertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn ignore_checksum(mut self, ignore: bool) -> Self {
        self.ignore_checksum = ignore;
        self
    }
}

impl Remote {
    /// Issues exactly one create (no remote id yet) or one update call.
    pub async fn upsert(&self, request: UpsertRequest) -> Result<RemoteObject, RemoteError> {
        let local = &request.local;
        let source = if local.is_dir {
            None
        } else {
            Some(open_source(request.source.as_deref()).await?)
        };
        let mut metadata = self.upload_metadata(&request)?;

        let Some(id) = local.id.as_deref() else {
            let media = source.map(|file| Media::from_file(file, mime_of(&metadata)));
            info!(
                name = %metadata.title,
                parent = %request.parent_id,
                is_dir = local.is_dir,
                with_content = media.is_some(),
                "creating remote object"
            );
            let created = self.client.insert_file(&metadata, media).await?;
            return RemoteObject::try_from(created);
        };

        let send_content = !local.is_dir
            && match &request.remote {
                None => true,
                Some(remote) => {
                    self.oracle
                        .differences(local, remote, request.ignore_checksum)
                        .checksum
                }
            };
        let media = match source {
            Some(file) if send_content => Some(Media::from_file(file, mime_of(&metadata))),
            _ => {
                if !local.is_dir {
                    metadata.mime_type = None;
                }
                None
            }
        };
        info!(
            id,
            name = %metadata.title,
            with_content = media.is_some(),
            "updating remote object"
        );
        let updated = self
            .client
            .update_file(id, &metadata, &request.options.update_params(), media)
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))?;
        RemoteObject::try_from(updated)
    }

    fn upload_metadata(&self, request: &UpsertRequest) -> Result<File, RemoteError> {
        let local = &request.local;
        let mime_type = if local.is_dir {
            Some(FOLDER_MIME_TYPE.to_string())
        } else {
            Some(self.mime.from_name(&local.name))
                .filter(|mime| !mime.is_empty())
                .map(str::to_string)
        };
        Ok(File {
            title: to_remote_title(&local.name),
            mime_type,
            modified_date: Some(format_modified(local.modified)?),
            parents: vec![ParentReference::new(request.parent_id.clone())],
            ..File::default()
        })
    }
}

fn mime_of(metadata: &File) -> &str {
    metadata.mime_type.as_deref().unwrap_or_default()
}

async fn open_source(path: Option<&Path>) -> Result<tokio::fs::File, RemoteError> {
    let Some(path) = path else {
        return Err(RemoteError::MissingSource {
            path: None,
            source: io::Error::new(io::ErrorKind::NotFound, "no local content source given"),
        });
    };
    tokio::fs::File::open(path)
        .await
        .map_err(|source| RemoteError::MissingSource {
            path: Some(path.to_path_buf()),
            source,
        })
}
