// This is free and unencumbered software released into the public domain.

pub mod app;

#[cfg(feature = "cli")]
pub mod cli;

pub mod shared;
