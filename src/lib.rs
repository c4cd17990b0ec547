pub mod record;
pub mod signatures;
pub mod verify;
pub mod parser;
pub mod aggregate;
pub mod temporal;
pub mod reports;
pub mod export;
pub mod config;

pub use parser::{parse_line, parse_source, ParsedSource};
pub use record::{BotCategory, LogRecord};
