use std::collections::HashMap;
use std::path::Path;

use drive_core::File;
use md5::Context;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};
use tokio::io::AsyncReadExt;

use crate::error::RemoteError;
use crate::paths::to_local_name;

/// Read-only projection of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: String,
    /// Title with separators escaped, usable as a local path segment.
    pub name: String,
    pub is_dir: bool,
    pub mime_type: String,
    pub modified: OffsetDateTime,
    pub parents: Vec<String>,
    pub export_links: HashMap<String, String>,
    pub trashed: bool,
    pub md5: Option<String>,
    pub size: i64,
}

impl RemoteObject {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn has_export_links(&self) -> bool {
        !self.is_dir && !self.export_links.is_empty()
    }
}

impl TryFrom<File> for RemoteObject {
    type Error = RemoteError;

    fn try_from(file: File) -> Result<Self, Self::Error> {
        let is_dir = file.is_folder();
        let trashed = file.is_trashed();
        let modified = match file.modified_date.as_deref() {
            Some(value) => parse_modified(value)?,
            None => OffsetDateTime::UNIX_EPOCH,
        };
        let export_links = if is_dir {
            HashMap::new()
        } else {
            file.export_links
        };
        Ok(Self {
            id: file.id.unwrap_or_default(),
            name: to_local_name(&file.title),
            is_dir,
            mime_type: file.mime_type.unwrap_or_default(),
            modified,
            parents: file.parents.into_iter().map(|parent| parent.id).collect(),
            export_links,
            trashed,
            md5: file.md5_checksum,
            size: file.file_size.unwrap_or_default(),
        })
    }
}

/// Desired state of an object as seen on the local side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalObject {
    /// Remote identifier once the object has been created remotely.
    pub id: Option<String>,
    pub name: String,
    pub is_dir: bool,
    pub modified: OffsetDateTime,
    pub size: i64,
    pub md5: Option<String>,
}

impl LocalObject {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            is_dir: true,
            modified: truncate_to_second(OffsetDateTime::now_utc()),
            size: 0,
            md5: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Snapshots a local file or directory; file checksums are computed by streaming.
    pub async fn from_path(path: &Path) -> Result<Self, RemoteError> {
        let meta = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified = meta
            .modified()
            .map(OffsetDateTime::from)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let (size, md5) = if meta.is_dir() {
            (0, None)
        } else {
            (meta.len() as i64, Some(file_md5(path).await?))
        };
        Ok(Self {
            id: None,
            name,
            is_dir: meta.is_dir(),
            modified: round_to_second(modified.to_offset(UtcOffset::UTC)),
            size,
            md5,
        })
    }
}

async fn file_md5(path: &Path) -> Result<String, RemoteError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut ctx = Context::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        ctx.consume(&buf[..read]);
    }
    Ok(format!("{:x}", ctx.compute()))
}

pub(crate) fn parse_modified(value: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339)?;
    Ok(truncate_to_second(parsed.to_offset(UtcOffset::UTC)))
}

/// Formats as `YYYY-MM-DDTHH:MM:SS.000Z`, rounded to the nearest second.
pub(crate) fn format_modified(value: OffsetDateTime) -> Result<String, time::error::Format> {
    round_to_second(value.to_offset(UtcOffset::UTC)).format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].000Z"
    ))
}

fn round_to_second(value: OffsetDateTime) -> OffsetDateTime {
    truncate_to_second(value + Duration::milliseconds(500))
}

fn truncate_to_second(value: OffsetDateTime) -> OffsetDateTime {
    value.replace_nanosecond(0).unwrap_or(value)
}
