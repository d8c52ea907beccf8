//! ensign-sexp — S-expression data model for the swank wire protocol.
//!
//! Parsing, printing, and keyed-list helpers. This crate carries no
//! protocol semantics; the layers above work purely in terms of [`Sexp`].

pub mod error;
pub mod parser;
pub mod value;

pub use error::SexpError;
pub use parser::parse;
pub use value::{key_map, Sexp};
