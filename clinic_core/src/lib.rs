#![forbid(unsafe_code)]

//! Core domain model and business logic for the clinic records system.
//!
//! This crate provides:
//! - Record shapes (users, patients, schedules, appointments)
//! - The record store abstraction and its file/memory backends
//! - The demographic statistics engine
//! - The fixed-slot appointment scheduler
//! - Session context, registration and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod journal;
pub mod store;
pub mod stats;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{FileStore, MemoryStore, RecordStore};
pub use stats::{compute_statistics, Summary};
pub use scheduler::{book, get_schedule, render_schedule, BookingPolicy, ScheduleEntry};
pub use session::{Section, Session};
pub use export::write_patients_csv;
