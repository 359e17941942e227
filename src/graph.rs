//! Build graph model and construction.
//!
//! This module defines the backend-agnostic dependency graph the generator
//! accumulates before serialisation: [`BuildNode`] describes one build action
//! and its edges, and [`GraphBuilder`] is the explicit accumulator the rule
//! emitters append to. Validation of the graph invariants is centralised in
//! [`GraphBuilder::finalize`], which yields an immutable [`BuildGraph`] for
//! the serialiser.
//!
//! # Examples
//!
//! ```
//! use confgen::graph::{GraphBuilder, TransformRequest};
//! use camino::Utf8PathBuf;
//!
//! let mut builder = GraphBuilder::new();
//! builder
//!     .emit_transform(
//!         Utf8PathBuf::from("gen/boot.h"),
//!         Utf8PathBuf::from("../posix/posix_boot.fs"),
//!         TransformRequest::named("boot"),
//!     )
//!     .expect("emit");
//! let graph = builder.finalize().expect("finalize");
//! assert_eq!(graph.nodes().len(), 2);
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header emission mode passed to the external transcode tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// C++ string-literal header, the common case.
    #[default]
    Cpp,
    /// Windows resource-friendly header.
    Win,
    /// JavaScript module for the web target.
    Web,
}

impl HeaderMode {
    /// The mode name as the transcode tool expects it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpp => "cpp",
            Self::Win => "win",
            Self::Web => "web",
        }
    }
}

/// Options forwarded to the transcode tool for one transform node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Header emission mode, only meaningful together with `name`.
    pub header_mode: HeaderMode,
    /// Symbol name for the generated header; omitted for plain transforms.
    pub name: Option<String>,
    /// Preserve the first comment block of the source document.
    pub keep_first_comment: bool,
}

impl TransformOptions {
    /// Render the options string for the tool invocation template.
    #[must_use]
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if self.keep_first_comment {
            parts.push("--keep-first-comment".to_owned());
        }
        if let Some(name) = &self.name {
            parts.push(format!("--name {name} --header {}", self.header_mode.as_str()));
        }
        parts.join(" ")
    }
}

/// The action a [`BuildNode`] performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create an output directory.
    MakeDirectory,
    /// Run the external source-to-header transcode tool.
    Transform(TransformOptions),
    /// Compile a source and strip the resulting binary in one step.
    Compile,
}

/// One unit of work in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildNode {
    /// Paths this node produces. Unique across the whole graph.
    pub outputs: Vec<Utf8PathBuf>,
    /// What the node does.
    pub action: Action,
    /// Required inputs passed as primary source text.
    pub explicit_inputs: Vec<Utf8PathBuf>,
    /// Inputs that trigger rebuilds without being primary sources.
    pub implicit_inputs: Vec<Utf8PathBuf>,
    /// Prerequisites that must exist but never trigger rebuilds.
    pub order_only_inputs: Vec<Utf8PathBuf>,
    /// Dependency file written by the external tool or compiler.
    pub depfile: Option<Utf8PathBuf>,
}

/// Per-call parameters for [`GraphBuilder::emit_transform`].
#[derive(Debug, Clone, Default)]
pub struct TransformRequest {
    /// Options forwarded to the transcode tool.
    pub options: TransformOptions,
    /// Depfile override; defaults to `<output>.dd`.
    pub depfile: Option<Utf8PathBuf>,
    /// Graph-internal inputs that must be rebuilt before this node.
    pub implicit_inputs: Vec<Utf8PathBuf>,
}

impl TransformRequest {
    /// A request carrying only a header name, with default mode and no
    /// implicit inputs.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            options: TransformOptions {
                name: Some(name.to_owned()),
                ..TransformOptions::default()
            },
            ..Self::default()
        }
    }
}

/// One constituent of an optional-feature bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BundlePart {
    /// Part name; also derives the generated header path and symbol name.
    pub name: String,
    /// Source document for the part.
    pub source: Utf8PathBuf,
}

/// Errors raised while constructing or validating the graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Two nodes claim the same output path.
    #[error("duplicate output `{output}`")]
    DuplicateOutput {
        /// The contested output path.
        output: Utf8PathBuf,
    },
    /// An input is neither an external source nor produced by any node.
    #[error("input `{input}` of `{node}` is not produced by any node")]
    UnresolvedInput {
        /// First output of the node holding the dangling edge.
        node: Utf8PathBuf,
        /// The input path that failed to resolve.
        input: Utf8PathBuf,
    },
    /// A bundle declared no parts and no main source.
    #[error("bundle `{bundle}` has no parts and no main source")]
    EmptyBundle {
        /// The offending bundle name.
        bundle: String,
    },
}

/// Accumulator for [`BuildNode`]s with construction-time invariant checks.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<BuildNode>,
    outputs: IndexMap<Utf8PathBuf, usize>,
}

impl GraphBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The nodes emitted so far, in emission order.
    #[must_use]
    pub fn nodes(&self) -> &[BuildNode] {
        &self.nodes
    }

    /// Append a node, rejecting output collisions.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] if any output is already
    /// claimed by an earlier node.
    pub fn add_node(&mut self, node: BuildNode) -> Result<(), GraphError> {
        for output in &node.outputs {
            if self.outputs.contains_key(output) {
                return Err(GraphError::DuplicateOutput {
                    output: output.clone(),
                });
            }
        }
        let index = self.nodes.len();
        for output in &node.outputs {
            self.outputs.insert(output.clone(), index);
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Declare an output directory. Repeated requests for the same path are
    /// no-ops, so directories are created exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] if a non-directory node
    /// already claims `path`.
    pub fn emit_make_directory(&mut self, path: &Utf8Path) -> Result<(), GraphError> {
        if let Some(index) = self.outputs.get(path) {
            return match self.nodes.get(*index).map(|node| &node.action) {
                Some(Action::MakeDirectory) => Ok(()),
                _ => Err(GraphError::DuplicateOutput {
                    output: path.to_owned(),
                }),
            };
        }
        self.add_node(BuildNode {
            outputs: vec![path.to_owned()],
            action: Action::MakeDirectory,
            explicit_inputs: Vec::new(),
            implicit_inputs: Vec::new(),
            order_only_inputs: Vec::new(),
            depfile: None,
        })
    }

    /// Emit a transform node for `output` from `source`.
    ///
    /// The output's parent directory becomes an order-only input, declared
    /// via [`Self::emit_make_directory`] if it is not yet in the graph. The
    /// depfile defaults to `<output>.dd`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] if `output` is already
    /// claimed.
    pub fn emit_transform(
        &mut self,
        output: Utf8PathBuf,
        source: Utf8PathBuf,
        request: TransformRequest,
    ) -> Result<(), GraphError> {
        let order_only = self.output_directory(&output)?;
        let depfile = request
            .depfile
            .unwrap_or_else(|| Utf8PathBuf::from(format!("{output}.dd")));
        self.add_node(BuildNode {
            outputs: vec![output],
            action: Action::Transform(request.options),
            explicit_inputs: vec![source],
            implicit_inputs: request.implicit_inputs,
            order_only_inputs: order_only,
            depfile: Some(depfile),
        })
    }

    /// Emit a compile-then-strip node for `output` from `source`.
    ///
    /// The compiler writes the depfile (`<output>.d`); stripping is part of
    /// the same node because the downstream executor treats the pair as one
    /// atomic rebuild unit.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] if `output` is already
    /// claimed.
    pub fn emit_compile(
        &mut self,
        output: Utf8PathBuf,
        source: Utf8PathBuf,
        implicit_inputs: Vec<Utf8PathBuf>,
    ) -> Result<(), GraphError> {
        let order_only = self.output_directory(&output)?;
        let depfile = Utf8PathBuf::from(format!("{output}.d"));
        self.add_node(BuildNode {
            outputs: vec![output],
            action: Action::Compile,
            explicit_inputs: vec![source],
            implicit_inputs,
            order_only_inputs: order_only,
            depfile: Some(depfile),
        })
    }

    /// Emit an optional-feature bundle under `scope`.
    ///
    /// Each part is transformed to `gen/<scope>_<part>.h` with the part name
    /// (separators normalised to `_`) as the header symbol. The aggregate is
    /// then transformed to `gen/<scope>_optional_<bundle>.h` with every part
    /// output as an implicit input, so the aggregate is rebuilt whenever any
    /// constituent changes. When `main_source` is absent the first part's
    /// generated header doubles as the aggregate's source text.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EmptyBundle`] when there is nothing to
    /// aggregate, or [`GraphError::DuplicateOutput`] on output collisions.
    pub fn emit_optional_bundle(
        &mut self,
        scope: &str,
        bundle: &str,
        parts: &[BundlePart],
        main_source: Option<Utf8PathBuf>,
    ) -> Result<(), GraphError> {
        let mut part_outputs = Vec::with_capacity(parts.len());
        for part in parts {
            let output = Utf8PathBuf::from(format!("gen/{scope}_{}.h", part.name));
            let request = TransformRequest::named(&part.name.replace('-', "_"));
            self.emit_transform(output.clone(), part.source.clone(), request)?;
            part_outputs.push(output);
        }

        let Some(source) = main_source.or_else(|| part_outputs.first().cloned()) else {
            return Err(GraphError::EmptyBundle {
                bundle: bundle.to_owned(),
            });
        };

        let output = Utf8PathBuf::from(format!("gen/{scope}_optional_{bundle}.h"));
        let request = TransformRequest {
            options: TransformOptions {
                keep_first_comment: true,
                ..TransformOptions::default()
            },
            depfile: Some(Utf8PathBuf::from(format!("{output}.dd"))),
            implicit_inputs: part_outputs,
        };
        self.emit_transform(output, source, request)
    }

    /// Validate the graph invariants and freeze the node list.
    ///
    /// Implicit and order-only inputs must resolve to a producing node;
    /// explicit inputs must resolve whenever they fall under a directory the
    /// graph itself creates, and are otherwise external sources.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedInput`] for the first dangling edge.
    pub fn finalize(self) -> Result<BuildGraph, GraphError> {
        let managed_dirs: Vec<&Utf8Path> = self
            .nodes
            .iter()
            .filter(|node| node.action == Action::MakeDirectory)
            .flat_map(|node| node.outputs.iter().map(Utf8PathBuf::as_path))
            .collect();

        for node in &self.nodes {
            let internal = node.implicit_inputs.iter().chain(&node.order_only_inputs);
            for input in internal {
                if !self.outputs.contains_key(input) {
                    return Err(unresolved(node, input));
                }
            }
            for input in &node.explicit_inputs {
                let graph_internal = managed_dirs.iter().any(|dir| input.starts_with(dir));
                if graph_internal && !self.outputs.contains_key(input) {
                    return Err(unresolved(node, input));
                }
            }
        }

        Ok(BuildGraph { nodes: self.nodes })
    }

    /// Ensure the directory node for `output`'s parent exists and return it
    /// as the order-only input list. Outputs in the build root have none.
    fn output_directory(&mut self, output: &Utf8Path) -> Result<Vec<Utf8PathBuf>, GraphError> {
        match output.parent() {
            Some(parent) if !parent.as_str().is_empty() => {
                self.emit_make_directory(parent)?;
                Ok(vec![parent.to_owned()])
            }
            _ => Ok(Vec::new()),
        }
    }
}

fn unresolved(node: &BuildNode, input: &Utf8Path) -> GraphError {
    GraphError::UnresolvedInput {
        node: node.outputs.first().cloned().unwrap_or_default(),
        input: input.to_owned(),
    }
}

/// A validated, immutable build graph ready for serialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildGraph {
    nodes: Vec<BuildNode>,
}

impl BuildGraph {
    /// All nodes in emission order.
    #[must_use]
    pub fn nodes(&self) -> &[BuildNode] {
        &self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(p)
    }

    #[test]
    fn make_directory_is_idempotent() {
        let mut builder = GraphBuilder::new();
        for _ in 0..3 {
            builder.emit_make_directory(Utf8Path::new("gen")).expect("mkdir");
        }
        assert_eq!(builder.nodes().len(), 1);
    }

    #[test]
    fn transform_output_colliding_with_directory_is_rejected() {
        let mut builder = GraphBuilder::new();
        builder.emit_make_directory(Utf8Path::new("gen")).expect("mkdir");
        let err = builder
            .emit_transform(path("gen"), path("../a.fs"), TransformRequest::default())
            .expect_err("collision");
        assert!(matches!(err, GraphError::DuplicateOutput { output } if output == "gen"));
    }

    #[test]
    fn transform_depfile_defaults_to_dd_suffix() {
        let mut builder = GraphBuilder::new();
        builder
            .emit_transform(path("gen/boot.h"), path("../boot.fs"), TransformRequest::default())
            .expect("emit");
        let node = builder.nodes().last().expect("node");
        assert_eq!(node.depfile.as_deref(), Some(Utf8Path::new("gen/boot.h.dd")));
        assert_eq!(node.order_only_inputs, vec![path("gen")]);
    }

    #[test]
    fn unresolved_implicit_input_fails_finalize() {
        let mut builder = GraphBuilder::new();
        let request = TransformRequest {
            implicit_inputs: vec![path("gen/missing.h")],
            ..TransformRequest::default()
        };
        builder
            .emit_transform(path("gen/out.h"), path("../a.fs"), request)
            .expect("emit");
        let err = builder.finalize().expect_err("dangling edge");
        assert!(matches!(err, GraphError::UnresolvedInput { input, .. } if input == "gen/missing.h"));
    }

    #[test]
    fn explicit_input_under_managed_directory_must_resolve() {
        let mut builder = GraphBuilder::new();
        builder
            .emit_transform(path("gen/out.h"), path("gen/phantom.h"), TransformRequest::default())
            .expect("emit");
        let err = builder.finalize().expect_err("dangling edge");
        assert!(matches!(err, GraphError::UnresolvedInput { input, .. } if input == "gen/phantom.h"));
    }
}
