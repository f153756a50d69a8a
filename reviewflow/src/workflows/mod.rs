//! Ready-made workflows built on the generation port.

pub mod refine;

pub use refine::{refine, RefineError};
