//! Descriptor loading and recursive inclusion.
//!
//! A project is described by per-directory `BUILD.yml` fragments. The
//! [`Loader`] reads a fragment, interprets its directives in textual order
//! against the shared [`GraphBuilder`], and recurses into `include`
//! directives, so the graph is composed from many independently-authored
//! fragments. Any failure aborts generation: a partial graph is never
//! handed to the serialiser.

use crate::ast::{BundleDirective, CompileDirective, Directive, Fragment, TransformDirective};
use crate::graph::{BundlePart, GraphBuilder, GraphError, TransformOptions, TransformRequest};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;
use tracing::debug;

/// Conventional descriptor file name within each project directory.
pub const DESCRIPTOR_FILE: &str = "BUILD.yml";

/// Errors raised while loading or interpreting descriptors.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor file could not be read.
    #[error("missing descriptor `{path}`: {source}")]
    Missing {
        /// Path of the descriptor that failed to load.
        path: Utf8PathBuf,
        /// The underlying filesystem error.
        source: std::io::Error,
    },
    /// The descriptor file is not a valid directive document.
    #[error("invalid descriptor `{path}`: {message}")]
    Parse {
        /// Path of the offending descriptor.
        path: Utf8PathBuf,
        /// Parser or schema diagnostic.
        message: String,
    },
    /// An `include` chain revisited a directory already being included.
    #[error("descriptor include cycle at `{path}`")]
    CircularInclude {
        /// The directory whose inclusion would recurse forever.
        path: Utf8PathBuf,
    },
    /// Graph construction rejected a directive.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Recursive fragment loader bound to one project root.
///
/// `include` paths are resolved relative to the project root, and directive
/// source paths are prefixed with the source root so the emitted graph is
/// consumable from a build directory beside the sources.
#[derive(Debug)]
pub struct Loader {
    root: Utf8PathBuf,
    source_root: Utf8PathBuf,
    stack: Vec<Utf8PathBuf>,
}

impl Loader {
    /// Create a loader for the project at `root`.
    #[must_use]
    pub fn new(root: &Utf8Path, source_root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
            source_root: source_root.to_owned(),
            stack: Vec::new(),
        }
    }

    /// Load and execute the descriptor of `dir` (project-root-relative).
    ///
    /// Each call completes fully, including all transitively nested
    /// includes, before returning; fragment execution order is exactly the
    /// textual order of `include` directives.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the descriptor is missing or
    /// invalid, when inclusion cycles, or when a directive violates a graph
    /// invariant.
    pub fn include(
        &mut self,
        dir: &Utf8Path,
        graph: &mut GraphBuilder,
    ) -> Result<(), DescriptorError> {
        if self.stack.iter().any(|entry| entry == dir) {
            return Err(DescriptorError::CircularInclude {
                path: dir.to_owned(),
            });
        }

        let path = self.root.join(dir).join(DESCRIPTOR_FILE);
        let text = fs::read_to_string(&path).map_err(|source| DescriptorError::Missing {
            path: path.clone(),
            source,
        })?;
        let fragment = Fragment::parse(&text).map_err(|error| DescriptorError::Parse {
            path: path.clone(),
            message: error.to_string(),
        })?;
        debug!(descriptor = %path, directives = fragment.directives.len(), "loaded descriptor");

        self.stack.push(dir.to_owned());
        let result = fragment
            .directives
            .into_iter()
            .try_for_each(|directive| self.apply(directive, graph));
        self.stack.pop();
        result
    }

    fn apply(
        &mut self,
        directive: Directive,
        graph: &mut GraphBuilder,
    ) -> Result<(), DescriptorError> {
        match directive {
            Directive::Mkdir(path) => graph.emit_make_directory(&path)?,
            Directive::Transform(transform) => self.apply_transform(transform, graph)?,
            Directive::Compile(compile) => self.apply_compile(compile, graph)?,
            Directive::Bundle(bundle) => self.apply_bundle(bundle, graph)?,
            Directive::Include(dir) => self.include(&dir, graph)?,
        }
        Ok(())
    }

    fn apply_transform(
        &self,
        directive: TransformDirective,
        graph: &mut GraphBuilder,
    ) -> Result<(), GraphError> {
        let request = TransformRequest {
            options: TransformOptions {
                header_mode: directive.header,
                name: directive.name,
                keep_first_comment: directive.keep_first_comment,
            },
            depfile: directive.depfile,
            implicit_inputs: directive.deps.into_vec(),
        };
        graph.emit_transform(directive.output, self.resolve(&directive.source), request)
    }

    fn apply_compile(
        &self,
        directive: CompileDirective,
        graph: &mut GraphBuilder,
    ) -> Result<(), GraphError> {
        graph.emit_compile(
            directive.output,
            self.resolve(&directive.source),
            directive.deps.into_vec(),
        )
    }

    fn apply_bundle(
        &self,
        directive: BundleDirective,
        graph: &mut GraphBuilder,
    ) -> Result<(), GraphError> {
        let parts: Vec<BundlePart> = directive
            .parts
            .into_iter()
            .map(|part| BundlePart {
                name: part.name,
                source: self.resolve(&part.source),
            })
            .collect();
        graph.emit_optional_bundle(
            &directive.scope,
            &directive.name,
            &parts,
            directive.main_source.map(|source| self.resolve(&source)),
        )
    }

    /// Prefix a project-root-relative source with the source root.
    fn resolve(&self, source: &Utf8Path) -> Utf8PathBuf {
        self.source_root.join(source)
    }
}

/// Build the graph for the project rooted at `root`, starting from its
/// top-level descriptor.
///
/// # Errors
///
/// Returns [`DescriptorError`] on any loading or interpretation failure.
pub fn load_project(
    root: &Utf8Path,
    source_root: &Utf8Path,
    graph: &mut GraphBuilder,
) -> Result<(), DescriptorError> {
    Loader::new(root, source_root).include(Utf8Path::new(""), graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_descriptor_is_fatal() {
        let mut graph = GraphBuilder::new();
        let mut loader = Loader::new(Utf8Path::new("/nonexistent"), Utf8Path::new(".."));
        let err = loader
            .include(Utf8Path::new(""), &mut graph)
            .expect_err("missing");
        assert!(matches!(err, DescriptorError::Missing { .. }));
    }
}
