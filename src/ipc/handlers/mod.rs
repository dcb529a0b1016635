pub mod accounts;
pub mod analytics;
pub mod attendance;
pub mod core;
pub mod notes;
pub mod students;
