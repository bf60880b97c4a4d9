//! comments_server: REST and GraphQL front ends for the group comments service.

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod graph;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod router;
pub mod seed;
