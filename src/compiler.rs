//! Grammar compiler
//!
//! Turns a flat `GrammarTable` into a `SchemaNode` trie over `/`-delimited
//! segments. Entries sharing a prefix share the router nodes for it; only the
//! last segment of each declared path carries constraints.
//!
//! ```text
//! difficulties                               difficulties: mapping<int, string>
//! stat_settings/include_default_statistics   stat_settings: *
//! stat_settings/order_by                ->     include_default_statistics: bool
//!                                              order_by: sequence<string>
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::grammar::{split_path, GrammarSpec, GrammarTable};
use crate::node::SchemaNode;

/// Compiles grammar tables into schema trees
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaCompiler;

impl SchemaCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile every entry of `table`, in order, under one router root
    ///
    /// Fails on the first malformed entry, and with `DuplicateKey` when a
    /// path is declared twice.
    pub fn compile(&self, table: &GrammarTable) -> Result<SchemaNode> {
        let mut root = SchemaNode::router();
        for (path, spec) in table.iter() {
            let segments = split_path(path)?;
            Self::attach(&mut root, &segments, spec, path)?;
        }
        debug!(entries = table.len(), "compiled grammar table");
        Ok(root)
    }

    /// A single-node tree checking whatever value it is given against `spec`
    pub fn compile_root(&self, spec: &GrammarSpec) -> Result<SchemaNode> {
        SchemaNode::from_spec(spec)
    }

    /// Walk down `segments` while children already exist, then hang a fresh
    /// chain for the remainder off the deepest existing node
    fn attach(node: &mut SchemaNode, segments: &[&str], spec: &GrammarSpec, path: &str) -> Result<()> {
        let Some((first, rest)) = segments.split_first() else {
            // every segment already existed
            return Err(SchemaError::DuplicateKey {
                key: path.to_string(),
            });
        };

        match node.child_mut(first) {
            Some(child) => Self::attach(child, rest, spec, path),
            None => {
                let chain = Self::build_chain(rest, spec)?;
                node.insert_child(*first, chain)
            }
        }
    }

    /// Router nodes for every segment of `rest`, ending in the leaf for `spec`
    fn build_chain(rest: &[&str], spec: &GrammarSpec) -> Result<SchemaNode> {
        match rest.split_first() {
            None => SchemaNode::from_spec(spec),
            Some((segment, tail)) => {
                let mut router = SchemaNode::router();
                router.insert_child(*segment, Self::build_chain(tail, spec)?)?;
                Ok(router)
            }
        }
    }
}

/// Compiled trees registered under labels
#[derive(Debug, Default, Clone)]
pub struct TreeRegistry {
    trees: BTreeMap<String, SchemaNode>,
}

impl TreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `table` and register the tree under `label`
    pub fn add_table(&mut self, label: impl Into<String>, table: &GrammarTable) -> Result<()> {
        let tree = SchemaCompiler::new().compile(table)?;
        self.add_tree(label, tree)
    }

    /// Register an already built tree; each label can be used once
    pub fn add_tree(&mut self, label: impl Into<String>, tree: SchemaNode) -> Result<()> {
        let label = label.into();
        if self.trees.contains_key(&label) {
            return Err(SchemaError::DuplicateKey { key: label });
        }
        debug!(label = %label, "registered grammar tree");
        self.trees.insert(label, tree);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&SchemaNode> {
        self.trees.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    /// Validate `data` against the tree registered under `label`
    pub fn validate(&self, label: &str, data: &Value) -> Result<()> {
        self.trees
            .get(label)
            .ok_or_else(|| SchemaError::UnknownTree(label.to_string()))?
            .visit(data)
    }
}
