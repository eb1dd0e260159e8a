//! Request and response bodies of the host endpoints.

pub mod response;
