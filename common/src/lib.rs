//! Types shared between the report engine service and its callers.

pub mod jobs;
pub mod model;
pub mod requests;
pub mod responses;
