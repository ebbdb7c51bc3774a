//! Facilities shared across the compiler: caseless strings, arenas,
//! configuration, diagnostics, engine limits, and the OS facade.

pub mod arena;
pub mod caseless;
pub mod config;
pub mod limits;
pub mod os;
pub mod reporting;
pub mod stats;
