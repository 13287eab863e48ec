pub mod admin;
pub mod baselinker;
pub mod feeds;
pub mod health;
pub mod sanitize;
