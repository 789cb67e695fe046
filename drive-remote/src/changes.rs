use drive_core::{Change, ChangesRequest};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::RemoteError;
use crate::object::{RemoteObject, parse_modified};
use crate::pager::{Page, PageStream};
use crate::remote::Remote;

/// One entry of the change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub id: i64,
    pub file_id: String,
    pub deleted: bool,
    /// Current state of the object; absent for deletions.
    pub object: Option<RemoteObject>,
    pub modified: Option<OffsetDateTime>,
}

impl ChangeEvent {
    /// Checkpoint to resume from once this event has been applied.
    pub fn next_checkpoint(&self) -> i64 {
        self.id + 1
    }
}

impl TryFrom<Change> for ChangeEvent {
    type Error = RemoteError;

    fn try_from(change: Change) -> Result<Self, Self::Error> {
        let object = match change.file {
            Some(file) if !change.deleted => Some(RemoteObject::try_from(file)?),
            _ => None,
        };
        let modified = change
            .modification_date
            .as_deref()
            .map(parse_modified)
            .transpose()?;
        Ok(Self {
            id: change.id,
            file_id: change.file_id,
            deleted: change.deleted,
            object,
            modified,
        })
    }
}

impl Remote {
    /// Streams change events starting at `start`; `None` or a negative id reads from the beginning.
    pub fn changes(&self, start: Option<i64>) -> PageStream<ChangeEvent> {
        let client = self.client.clone();
        let start_change_id = start.filter(|id| *id >= 0);
        let page_size = self.config.page_size;
        debug!(?start_change_id, "opening change feed");
        PageStream::spawn(
            move |page_token| {
                let client = client.clone();
                let request = ChangesRequest {
                    start_change_id,
                    max_results: Some(page_size),
                    page_token,
                };
                async move {
                    let list = client.list_changes(&request).await?;
                    let items = list
                        .items
                        .into_iter()
                        .map(ChangeEvent::try_from)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok::<_, RemoteError>(Page {
                        items,
                        next_page_token: list.next_page_token,
                    })
                }
            },
            |_: &ChangeEvent| true,
        )
    }

    pub async fn change(&self, id: i64) -> Result<ChangeEvent, RemoteError> {
        let key = id.to_string();
        let change = self
            .client
            .get_change(&key)
            .await
            .map_err(|err| RemoteError::from_lookup(err, &key))?;
        ChangeEvent::try_from(change)
    }
}
