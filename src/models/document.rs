use serde::{Deserialize, Serialize};

/// One registered document. Rows are created on import and deleted on request;
/// they are never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: i64,
    pub name: String,
    pub mime_type: String,
    pub size_in_bytes: i64,
    pub path: String,
    pub last_modified_time_stamp: i64,
    pub owner: String,
    pub author: String,
}

/// A document that has not been stored yet; the database assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub name: String,
    pub mime_type: String,
    pub size_in_bytes: i64,
    pub path: String,
    pub last_modified_time_stamp: i64,
    pub owner: String,
    pub author: String,
}

impl NewDocument {
    pub fn into_record(self, id: i64) -> DocumentRecord {
        DocumentRecord {
            id,
            name: self.name,
            mime_type: self.mime_type,
            size_in_bytes: self.size_in_bytes,
            path: self.path,
            last_modified_time_stamp: self.last_modified_time_stamp,
            owner: self.owner,
            author: self.author,
        }
    }
}
