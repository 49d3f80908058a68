//! Built-in tree backends

pub mod libxml;
