use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ParentReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub export_links: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_string_int"
    )]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl File {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    pub fn is_trashed(&self) -> bool {
        self.labels.as_ref().is_some_and(|labels| labels.trashed)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_root: Option<bool>,
}

impl ParentReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_root: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Labels {
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub viewed: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub items: Vec<File>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(with = "string_int")]
    pub id: i64,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub file: Option<File>,
    #[serde(default)]
    pub modification_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeList {
    #[serde(default)]
    pub items: Vec<Change>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default, with = "option_string_int")]
    pub largest_change_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: String,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_link: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PermissionList {
    #[serde(default)]
    pub items: Vec<Permission>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PermissionId {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct About {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub root_folder_id: String,
    #[serde(default, with = "option_string_int")]
    pub largest_change_id: Option<i64>,
    #[serde(default, with = "option_string_int")]
    pub quota_bytes_total: Option<i64>,
    #[serde(default, with = "option_string_int")]
    pub quota_bytes_used: Option<i64>,
}

/// The API encodes int64 values as JSON strings; accept plain numbers too.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInt {
    Number(i64),
    Text(String),
}

impl RawInt {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            RawInt::Number(value) => Ok(value),
            RawInt::Text(text) => text.trim().parse().map_err(E::custom),
        }
    }
}

mod string_int {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::RawInt;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        RawInt::deserialize(deserializer)?.into_i64()
    }
}

mod option_string_int {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::RawInt;

    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        Option::<RawInt>::deserialize(deserializer)?
            .map(RawInt::into_i64)
            .transpose()
    }
}
