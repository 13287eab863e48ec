pub mod baselinker;
pub mod feeds;
