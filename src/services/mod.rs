//! Upload pipeline: key derivation, session acquisition and the writer
//! that ties them together.

pub mod key_builder;
pub mod session_factory;
pub mod writer;
