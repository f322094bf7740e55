#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]
//! ctxrag-core
//!
//! Domain types, error taxonomy, configuration, tokenization, chunking and
//! corpus loading shared by the retrieval engine and its front ends.

pub mod chunking;
pub mod config;
pub mod corpus;
pub mod error;
pub mod tokenize;
pub mod traits;
pub mod types;
