//! API middleware.

pub mod maintenance;
