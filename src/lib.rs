pub mod backend;
pub mod config;
pub mod mcp_server;
pub mod meeting;
pub mod search;
pub mod store;
