//! Core value types for the writer.
//!
//! These describe how objects are laid out in the bucket (partitioning and
//! compression) and the key each upload lands on. They carry no I/O.

pub mod layout;
pub mod object_key;
