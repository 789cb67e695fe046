mod client;
mod media;
mod models;
mod query;

pub use client::{
    ApiErrorClass, ChangesRequest, DriveClient, DriveError, ListRequest, UpdateParams,
};
pub use media::Media;
pub use models::{
    About, Change, ChangeList, FOLDER_MIME_TYPE, File, FileList, Labels, ParentReference,
    Permission, PermissionId, PermissionList,
};
pub use query::Query;
