pub mod common;

pub use common::{atomic_write, ensure_directory_exists};
