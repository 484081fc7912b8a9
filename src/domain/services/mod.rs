pub mod fetch_scheduler;
pub mod filters;
pub mod indicators;
pub mod screening;
pub mod universe;
