//! Utility modules

pub mod sequences;
