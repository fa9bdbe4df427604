#[macro_use]
pub mod macros;

pub mod config;
pub mod error;
pub mod extract;
pub mod fs_json_util;
pub mod normalize;
pub mod runner;
pub mod schema;
pub mod summary;
pub mod website;
