//! Git support for equisync, driven through the `git` command line.

pub mod clone;
pub mod history;
pub mod parser;

pub use clone::GitClonedRepository;
pub use history::GitRevisionHistory;
