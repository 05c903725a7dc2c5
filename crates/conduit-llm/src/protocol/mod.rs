//! Wire formats spoken with the completion engine

pub mod engine;
