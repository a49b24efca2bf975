#![doc(test(attr(deny(warnings))))]

//! Books Core is the double-entry bookkeeping engine behind the invoicing
//! desktop app: chart of accounts, fiscal periods, journal entries derived from
//! invoices and expenses, ledger projections and periodic tax models.

pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod storage;
pub mod utils;

pub use crate::api::{ApiResponse, BooksApi};
pub use crate::core::errors::{BooksError, Result};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        let build = utils::build_info::BuildMetadata::current();
        tracing::info!(
            version = build.version,
            schema = build.schema_version,
            git_hash = build.git_hash,
            "{} started",
            build.label()
        );
    });
}
