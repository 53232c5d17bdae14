pub mod discover;
pub mod sync;
