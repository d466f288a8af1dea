pub mod changelog;
pub mod config;
pub mod keeper;

pub mod testing;
