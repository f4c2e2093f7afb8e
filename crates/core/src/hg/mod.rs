//! Mercurial support for equisync.

pub mod clone;
pub mod history;
pub mod parser;

pub use clone::HgClonedRepository;
pub use history::HgRevisionHistory;
pub use parser::{parse_metadata, unescape};
