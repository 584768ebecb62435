//! # Records
//!
//! The shapes a bulk task can iterate. Every shape carries an authoritative,
//! monotonically increasing ordering key that the driver uses as its watermark.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shape of a stored record, used by stores to pick a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    Post,
    Term,
    User,
}

impl RecordShape {
    /// Name of the column holding the ordering key
    pub fn key_column(&self) -> &'static str {
        match self {
            Self::Post | Self::User => "id",
            Self::Term => "term_taxonomy_id",
        }
    }
}

impl std::fmt::Display for RecordShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Post => write!(f, "post"),
            Self::Term => write!(f, "term"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Row-like content record ordered by primary key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub post_type: String,
    pub post_status: String,
    pub title: String,
    pub modified_at: DateTime<Utc>,
}

/// Taxonomy relationship ordered by `term_taxonomy_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub term_taxonomy_id: i64,
    pub term_id: i64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    pub count: i64,
}

/// Principal (account) record ordered by account id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub roles: Vec<String>,
}

/// One row of a flat file, keyed by its 1-based line number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub line_number: i64,
    pub fields: Vec<String>,
}

impl CsvRow {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

/// A record handed to the user callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Post(PostRecord),
    Term(TermRecord),
    User(UserRecord),
    Row(CsvRow),
}

impl Record {
    /// The value the watermark advances to once this record is processed
    pub fn ordering_key(&self) -> i64 {
        match self {
            Self::Post(post) => post.id,
            Self::Term(term) => term.term_taxonomy_id,
            Self::User(user) => user.id,
            Self::Row(row) => row.line_number,
        }
    }

    pub fn as_post(&self) -> Option<&PostRecord> {
        match self {
            Self::Post(post) => Some(post),
            _ => None,
        }
    }

    pub fn as_term(&self) -> Option<&TermRecord> {
        match self {
            Self::Term(term) => Some(term),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&UserRecord> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&CsvRow> {
        match self {
            Self::Row(row) => Some(row),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_key_per_shape() {
        let term = Record::Term(TermRecord {
            term_taxonomy_id: 12,
            term_id: 3,
            taxonomy: "category".to_string(),
            name: "apple".to_string(),
            slug: "apple".to_string(),
            count: 0,
        });
        assert_eq!(term.ordering_key(), 12);

        let row = Record::Row(CsvRow {
            line_number: 5,
            fields: vec!["05".to_string(), "Hello".to_string()],
        });
        assert_eq!(row.ordering_key(), 5);
        assert_eq!(row.as_row().and_then(|r| r.get(1)), Some("Hello"));
        assert!(row.as_term().is_none());
    }

    #[test]
    fn test_record_serde_is_tagged() {
        let user = Record::User(UserRecord {
            id: 7,
            login: "john".to_string(),
            email: "john@example.com".to_string(),
            roles: vec!["contributor".to_string()],
        });
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["kind"], "user");
        assert_eq!(json["id"], 7);
    }
}
