//! Specialized data structures used by the engine.

pub mod arena;
pub mod pair_key;

pub use arrayvec::ArrayVec;
