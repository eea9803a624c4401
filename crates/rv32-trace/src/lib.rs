pub mod config;
pub mod diff;
pub mod golden;
pub mod listing;
pub mod record;

// Re-export commonly used types/functions for the CLI
pub use config::{ConfigError, TraceConfig};
pub use diff::{compare, DiffError, DiffReport, LineReport};
pub use golden::{rewrite_all, GoldenError, GoldenRewriter, Step, REGISTER_RESET};
pub use listing::{decode_listing, decode_record, parse_vhex32, VhexError};
pub use record::{read_records, RecordError, TraceRecord};
