pub mod merge;
pub mod read;
