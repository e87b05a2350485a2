//! # Tarkib Support
//!
//! Shared utilities for the Tarkib crates.
//!
//! This crate provides:
//! - Type name rendering (qualified, short and simple names)
//! - Resolution path rendering for error messages
//! - "Did you mean?" suggestions for unresolved type names

pub mod rendering;
