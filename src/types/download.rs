use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One tracked download: its source, on-disk location and status flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: String,
    pub url: Url,
    pub path: String,
    pub mimetype: String,
    pub complete: bool,
    pub paused: bool,
    pub error: String,
    pub created: DateTime<Utc>,
    pub incognito: bool,
    /// Insertion counter; breaks ties between records sharing a `created` instant.
    pub sequence: u64,
}

impl DownloadRecord {
    /// Display name derived from the last component of `path`.
    pub fn filename(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Key used to order the registry view: larger keys come first.
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.created, self.sequence)
    }

    /// Reads a single field as a [`FieldValue`].
    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::DownloadId => FieldValue::Text(self.id.clone()),
            Field::Url => FieldValue::Url(self.url.clone()),
            Field::Path => FieldValue::Text(self.path.clone()),
            Field::Filename => FieldValue::Text(self.filename()),
            Field::Mimetype => FieldValue::Text(self.mimetype.clone()),
            Field::Complete => FieldValue::Bool(self.complete),
            Field::Paused => FieldValue::Bool(self.paused),
            Field::Error => FieldValue::Text(self.error.clone()),
            Field::Created => FieldValue::Timestamp(self.created),
            Field::Incognito => FieldValue::Bool(self.incognito),
        }
    }
}

/// Selector for one queryable column of a [`DownloadRecord`].
///
/// Numeric roles start at 257 so they never collide with the display roles a
/// list view reserves for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    DownloadId = 257,
    Url,
    Path,
    Filename,
    Mimetype,
    Complete,
    Paused,
    Error,
    Created,
    Incognito,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::DownloadId,
        Field::Url,
        Field::Path,
        Field::Filename,
        Field::Mimetype,
        Field::Complete,
        Field::Paused,
        Field::Error,
        Field::Created,
        Field::Incognito,
    ];

    pub fn role(self) -> i32 {
        self as i32
    }

    pub fn from_role(role: i32) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.role() == role)
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::DownloadId => "downloadId",
            Field::Url => "url",
            Field::Path => "path",
            Field::Filename => "filename",
            Field::Mimetype => "mimetype",
            Field::Complete => "complete",
            Field::Paused => "paused",
            Field::Error => "error",
            Field::Created => "created",
            Field::Incognito => "incognito",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Result of a positional query. `Invalid` stands in for unknown rows or roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Invalid,
    Text(String),
    Url(Url),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_valid(&self) -> bool {
        !matches!(self, FieldValue::Invalid)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Url(u) => Some(u.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}
