pub mod bot;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod files;
pub mod geo;
pub mod messages;
pub mod payload;
pub mod store;
