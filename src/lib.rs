// Company Registry - Core Library
// Reconciles company profile batches against the persisted registry

pub mod records;
pub mod error;
pub mod novelty;     // Novelty Filter - anti-join by name or contact tuple
pub mod classifier;  // Change Classifier - NEW vs renamed / re-contacted
pub mod allocator;   // Identifier Allocator - surrogate company ids
pub mod formatter;   // Table Formatter - four registry tables
pub mod pipeline;    // One reconciliation pass end to end
pub mod batch;       // CSV batch reader
pub mod db;          // SQLite registry reader/writer + audit events

// Re-export commonly used types
pub use records::{
    optional_eq, CandidateRecord, ClassifiedRecord, ContactKey, RegistryRow, Status,
};
pub use error::ReconcileError;
pub use novelty::{find_novel, KeySpec};
pub use classifier::{
    classify, matches_predicate, AmbiguousMatch, Classification, ClassifyMode, RegistryIndex,
};
pub use allocator::{allocate_ids, IdentifierAllocator};
pub use formatter::{
    format_tables, ContactRow, DescriptionRow, IdentityRow, IpoRow, RegistryTables,
};
pub use pipeline::{run_pass, PassKind, PassOutcome, PassReport};
pub use batch::{list_batch_files, read_batch, Batch, BatchSummary, BATCH_FILE_PATTERN};
pub use db::{
    Event, apply_pass, count_companies, get_events_for_entity, insert_event, load_registry,
    setup_database, write_tables,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
