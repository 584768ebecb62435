//! # Engine Constants
//!
//! Defaults and well-known names shared by the driver, the sources and the CLI.

/// Width of the ID range requested per fetch when nothing else is configured
pub const DEFAULT_STEPPING: i64 = 10_000;

/// Page size used by sources whose caller did not request one
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Prefix applied to a task key to build the cursor's storage key
pub const CURSOR_KEY_PREFIX: &str = "bt_";

/// Source type names understood by the default registry
pub mod source_types {
    pub const POST: &str = "post";
    pub const TERM: &str = "term";
    pub const USER: &str = "user";
    pub const CSV: &str = "csv";

    pub const ALL: [&str; 4] = [POST, TERM, USER, CSV];
}

/// Query argument keys shared across sources
pub mod args {
    pub const ORDER: &str = "order";
    pub const ORDERBY: &str = "orderby";
    pub const NUMBER: &str = "number";
    pub const POSTS_PER_PAGE: &str = "posts_per_page";
    pub const POST_TYPE: &str = "post_type";
    pub const POST_STATUS: &str = "post_status";
    pub const TAXONOMY: &str = "taxonomy";
    pub const HIDE_EMPTY: &str = "hide_empty";
    pub const ROLE: &str = "role";
    pub const CSV: &str = "csv";
    pub const DELIMITER: &str = "delimiter";
    pub const HAS_HEADERS: &str = "has_headers";
    pub const PAGED: &str = "paged";
    pub const NO_FOUND_ROWS: &str = "no_found_rows";
    pub const UPDATE_META_CACHE: &str = "update_meta_cache";
    pub const COUNT_TOTAL: &str = "count_total";

    pub const ASC: &str = "ASC";

    /// Wildcard value meaning "do not filter on this field"
    pub const ANY: &str = "any";
}

/// Process exit codes for the CLI wrapper
pub mod exit_codes {
    pub const COMPLETED: i32 = 0;
    pub const FATAL: i32 = 1;
    pub const HALTED: i32 = 2;
    pub const USAGE: i32 = 64;
}
