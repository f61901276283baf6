#![allow(clippy::new_without_default)]

pub mod actor;
pub mod binding;
pub mod bus;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod host;
pub mod overlay;
pub mod page;
pub mod promise;
pub mod rating;
pub mod rows;
pub mod storage;
pub mod sync;
#[cfg(test)]
mod testing;
pub mod track;
pub mod util;
pub mod watch;
pub mod webapi;
