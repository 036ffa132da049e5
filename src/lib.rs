//! Game Grammar
//!
//! Path-addressed schema validation for game configuration documents.
//!
//! ## Features
//!
//! - **Grammar tables**: constraints declared per `/`-delimited path, as Rust
//!   constants or JSON files
//! - **Schema trees**: tables compile into a prefix trie of `SchemaNode`s that
//!   only check what they declare
//! - **Document validation**: `defaults` and every game checked in document
//!   order, failing fast with the path of the offending object
//! - **Statistics**: registry of statistic kinds named by descriptors
//! - **Catalog**: games resolved against their defaults
//!
//! ## Architecture
//!
//! ```text
//! GrammarTable --SchemaCompiler--> SchemaNode trie --TreeRegistry
//!                                                        |
//! info.json ------------------------------------> GameDataValidator
//!                                                        |
//!                                     GameCatalog <------+------> StatRegistry
//! ```

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod grammar;
pub mod node;
pub mod orchestrator;
pub mod predicate;
pub mod stats;
pub mod value_type;

pub use catalog::{GameCatalog, GameEntry};
pub use compiler::{SchemaCompiler, TreeRegistry};
pub use config::{OutputFormat, ValidatorConfig};
pub use error::{Result, SchemaError};
pub use grammar::{GrammarSpec, GrammarTable};
pub use node::SchemaNode;
pub use orchestrator::GameDataValidator;
pub use predicate::{Check, CompareMode, Predicate};
pub use stats::{StatAggregator, StatRegistry, Statistic};
pub use value_type::ValueType;
