pub mod autosave;
pub mod bucket;
pub mod clock;
pub mod config;
pub mod csv;
pub mod db;
pub mod deck;
pub mod error;
pub mod export;
pub mod homework;
pub mod identity;
pub mod ipc;
pub mod logging;
pub mod migrate;
pub mod persist;
pub mod record;
pub mod sections;
pub mod storage;
pub mod table;

pub use error::{KitError, KitResult, Refusal};
pub use homework::Homework;
