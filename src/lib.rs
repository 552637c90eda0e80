pub mod config;
pub mod error;
pub mod structs;
pub mod ui;

pub mod gtp;
pub mod range;

pub mod compose;
pub mod session;
pub mod sink;
