//! Application services: read queries, write commands and their errors.

pub mod auth;
pub mod error;
pub mod feed;
pub mod follow;
pub mod groups;
pub mod pagination;
pub mod posts;
pub mod repos;
