use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use super::RecordStore;
use crate::cache::QueryLog;
use crate::constants::args;
use crate::error::StoreError;
use crate::query::{PredicateScope, QueryArgs, RecordQuery};
use crate::record::{PostRecord, Record, RecordShape, TermRecord, UserRecord};

#[derive(Debug, Default)]
struct Tables {
    posts: BTreeMap<i64, PostRecord>,
    terms: BTreeMap<i64, TermRecord>,
    users: BTreeMap<i64, UserRecord>,
}

/// In-process record store.
///
/// Tables are ordered maps keyed by ordering key, so results come back
/// ascending without sorting. Every executed query is appended to the attached
/// [`QueryLog`], which is what a bulk task's cache reset is there to clear.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    scope: PredicateScope,
    query_log: Option<Arc<QueryLog>>,
    executions: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_log(mut self, log: Arc<QueryLog>) -> Self {
        self.query_log = Some(log);
        self
    }

    pub fn insert_post(&self, post: PostRecord) {
        self.tables.write().posts.insert(post.id, post);
    }

    pub fn insert_term(&self, term: TermRecord) {
        self.tables.write().terms.insert(term.term_taxonomy_id, term);
    }

    pub fn insert_user(&self, user: UserRecord) {
        self.tables.write().users.insert(user.id, user);
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.tables.read().posts.get(&id).cloned()
    }

    pub fn term(&self, term_taxonomy_id: i64) -> Option<TermRecord> {
        self.tables.read().terms.get(&term_taxonomy_id).cloned()
    }

    pub fn user(&self, id: i64) -> Option<UserRecord> {
        self.tables.read().users.get(&id).cloned()
    }

    /// Apply `update` to a stored post; returns false if it does not exist
    pub fn update_post(&self, id: i64, update: impl FnOnce(&mut PostRecord)) -> bool {
        self.tables.write().posts.get_mut(&id).map(update).is_some()
    }

    pub fn update_term(&self, term_taxonomy_id: i64, update: impl FnOnce(&mut TermRecord)) -> bool {
        self.tables
            .write()
            .terms
            .get_mut(&term_taxonomy_id)
            .map(update)
            .is_some()
    }

    pub fn update_user(&self, id: i64, update: impl FnOnce(&mut UserRecord)) -> bool {
        self.tables.write().users.get_mut(&id).map(update).is_some()
    }

    /// Number of queries executed so far
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::SeqCst)
    }

    /// Simulate the store going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "memory store marked unavailable",
            )));
        }
        Ok(())
    }
}

fn matches_any(filter: &Option<Vec<String>>, value: &str) -> bool {
    filter
        .as_ref()
        .map_or(true, |allowed| allowed.iter().any(|v| v == value))
}

fn post_matches(post: &PostRecord, query_args: &QueryArgs) -> bool {
    matches_any(&query_args.get_str_list(args::POST_TYPE), &post.post_type)
        && matches_any(&query_args.get_str_list(args::POST_STATUS), &post.post_status)
}

fn term_matches(term: &TermRecord, query_args: &QueryArgs) -> bool {
    let hide_empty = query_args.get_bool(args::HIDE_EMPTY).unwrap_or(false);
    matches_any(&query_args.get_str_list(args::TAXONOMY), &term.taxonomy)
        && !(hide_empty && term.count == 0)
}

fn user_matches(user: &UserRecord, query_args: &QueryArgs) -> bool {
    match query_args.get_str_list(args::ROLE) {
        Some(roles) => user.roles.iter().any(|role| roles.contains(role)),
        None => true,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn scope(&self) -> &PredicateScope {
        &self.scope
    }

    async fn max_key(&self, shape: RecordShape) -> Result<i64, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();
        let max = match shape {
            RecordShape::Post => tables.posts.keys().next_back(),
            RecordShape::Term => tables.terms.keys().next_back(),
            RecordShape::User => tables.users.keys().next_back(),
        };
        Ok(max.copied().unwrap_or(0))
    }

    async fn execute(&self, query: &RecordQuery) -> Result<Vec<Record>, StoreError> {
        self.check_available()?;
        self.executions.fetch_add(1, Ordering::SeqCst);

        let range = self.scope.predicate_for(query.token());
        let (after, up_to) = range.map_or((i64::MIN, i64::MAX), |r| (r.after, r.up_to));
        let limit = query
            .limit()
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        let query_args = query.args();

        if let Some(log) = &self.query_log {
            log.record(format!(
                "{} {} range={:?} limit={:?}",
                query.shape(),
                serde_json::Value::Object(query_args.as_map().clone()),
                range,
                query.limit()
            ));
        }

        // BTreeMap::range panics when the bounds are inverted
        if after >= up_to {
            return Ok(Vec::new());
        }
        let bounds = (
            std::ops::Bound::Excluded(after),
            std::ops::Bound::Included(up_to),
        );

        let tables = self.tables.read();
        let records: Vec<Record> = match query.shape() {
            RecordShape::Post => tables
                .posts
                .range(bounds)
                .map(|(_, post)| post)
                .filter(|post| post_matches(post, query_args))
                .take(limit)
                .cloned()
                .map(Record::Post)
                .collect(),
            RecordShape::Term => tables
                .terms
                .range(bounds)
                .map(|(_, term)| term)
                .filter(|term| term_matches(term, query_args))
                .take(limit)
                .cloned()
                .map(Record::Term)
                .collect(),
            RecordShape::User => tables
                .users
                .range(bounds)
                .map(|(_, user)| user)
                .filter(|user| user_matches(user, query_args))
                .take(limit)
                .cloned()
                .map(Record::User)
                .collect(),
        };

        trace!(
            shape = %query.shape(),
            token = %query.token(),
            windowed = range.is_some(),
            returned = records.len(),
            "Executed memory query"
        );

        Ok(records)
    }
}
