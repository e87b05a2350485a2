//! Derive macros for Tarkib: `Service`, `Injectable` and `service_contract`.

pub use tarkib_macros::*;
