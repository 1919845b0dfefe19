//! HTTP front end for the ticket repository.

pub mod api;
pub mod metrics;
pub mod state;
