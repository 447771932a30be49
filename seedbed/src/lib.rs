// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    load_config, load_seeds_from_file, load_seeds_from_source, parse_metadata_args,
    resolve_db_path, seed_all, SeedSummary,
};
