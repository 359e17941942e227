//! Descriptor fragment schema.
//!
//! This module defines the data structures representing a parsed `BUILD.yml`
//! descriptor. A descriptor is a flat list of typed directives; there is no
//! embedded code, so a fragment can be fully validated before a single node
//! is emitted.
//!
//! ```rust
//! use confgen::ast::{Directive, Fragment};
//!
//! let yaml = "directives:\n  - mkdir: gen\n  - include: esp32\n";
//! let fragment = Fragment::parse(yaml).expect("parse");
//! assert_eq!(fragment.directives.len(), 2);
//! assert!(matches!(&fragment.directives[1], Directive::Include(dir) if dir == "esp32"));
//! ```

use crate::graph::{BundlePart, HeaderMode};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A parsed descriptor fragment.
///
/// Directives execute strictly in textual order, which keeps repeated
/// generator runs byte-identical.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Fragment {
    /// The directives contributed by this fragment, in execution order.
    #[serde(default)]
    pub directives: Vec<Directive>,
}

impl Fragment {
    /// Parse a descriptor document from YAML text.
    ///
    /// The YAML is first read into a generic value and then deserialised
    /// into the typed schema, so schema violations surface as data errors
    /// with field context rather than low-level scanner failures.
    ///
    /// # Errors
    ///
    /// Returns an error when the YAML is malformed or does not match the
    /// directive schema.
    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        let doc: serde_json::Value = serde_saphyr::from_str(yaml)?;
        Ok(serde_json::from_value(doc)?)
    }
}

/// One build-graph contribution within a fragment.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    /// Declare an output directory.
    Mkdir(Utf8PathBuf),
    /// Transform a source document into a generated header.
    Transform(TransformDirective),
    /// Compile and strip a binary.
    Compile(CompileDirective),
    /// Build an optional-feature bundle from several parts.
    Bundle(BundleDirective),
    /// Execute the descriptor of a subdirectory.
    Include(Utf8PathBuf),
}

/// Parameters of a `transform` directive.
///
/// `source` is project-root-relative; `output`, `depfile`, and `deps` are
/// build-directory-relative.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransformDirective {
    /// Generated output path.
    pub output: Utf8PathBuf,
    /// Source document to transform.
    pub source: Utf8PathBuf,
    /// Header symbol name; enables `--name`/`--header` options when set.
    #[serde(default)]
    pub name: Option<String>,
    /// Header emission mode.
    #[serde(default)]
    pub header: HeaderMode,
    /// Preserve the first comment block of the source.
    #[serde(default)]
    pub keep_first_comment: bool,
    /// Depfile override; defaults to `<output>.dd`.
    #[serde(default)]
    pub depfile: Option<Utf8PathBuf>,
    /// Graph-internal inputs that must be rebuilt before this node.
    #[serde(default)]
    pub deps: PathOrList,
}

/// Parameters of a `compile` directive.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompileDirective {
    /// Binary output path.
    pub output: Utf8PathBuf,
    /// Source file handed to the toolchain.
    pub source: Utf8PathBuf,
    /// Graph-internal inputs that must be rebuilt before this node.
    #[serde(default)]
    pub deps: PathOrList,
}

/// Parameters of a `bundle` directive.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BundleDirective {
    /// Bundle name; derives the aggregate output path.
    pub name: String,
    /// Namespace prefix for the generated headers.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Constituent parts, each transformed independently.
    #[serde(default)]
    pub parts: Vec<BundlePart>,
    /// Distinct top-level source; the first part's header is reused when
    /// absent.
    #[serde(default)]
    pub main_source: Option<Utf8PathBuf>,
}

fn default_scope() -> String {
    "esp32".to_owned()
}

/// A helper for fields that accept either a single path or a list of paths.
///
/// Mirrors YAML syntax where a scalar or a sequence is allowed; empty values
/// deserialise to [`PathOrList::Empty`].
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single path.
    One(Utf8PathBuf),
    /// A list of paths.
    Many(Vec<Utf8PathBuf>),
}

impl PathOrList {
    /// Flatten into a plain list.
    #[must_use]
    pub fn into_vec(self) -> Vec<Utf8PathBuf> {
        match self {
            Self::Empty => Vec::new(),
            Self::One(path) => vec![path],
            Self::Many(paths) => paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_directive_defaults() {
        let yaml = concat!(
            "directives:\n",
            "  - transform:\n",
            "      output: gen/boot.h\n",
            "      source: posix/posix_boot.fs\n",
            "      name: boot\n",
        );
        let fragment = Fragment::parse(yaml).expect("parse");
        let Some(Directive::Transform(transform)) = fragment.directives.first() else {
            panic!("expected transform directive");
        };
        assert_eq!(transform.header, HeaderMode::Cpp);
        assert!(!transform.keep_first_comment);
        assert_eq!(transform.deps, PathOrList::Empty);
    }

    #[test]
    fn unknown_directive_fields_are_rejected() {
        let yaml = concat!(
            "directives:\n",
            "  - transform:\n",
            "      output: gen/boot.h\n",
            "      source: posix/posix_boot.fs\n",
            "      frobnicate: true\n",
        );
        assert!(Fragment::parse(yaml).is_err());
    }

    #[test]
    fn deps_accept_scalar_or_sequence() {
        let yaml = concat!(
            "directives:\n",
            "  - compile:\n",
            "      output: forth\n",
            "      source: posix/main.cpp\n",
            "      deps: [gen/posix_boot.h]\n",
        );
        let fragment = Fragment::parse(yaml).expect("parse");
        let Some(Directive::Compile(compile)) = fragment.directives.first() else {
            panic!("expected compile directive");
        };
        assert_eq!(
            compile.deps.clone().into_vec(),
            vec![Utf8PathBuf::from("gen/posix_boot.h")]
        );
    }
}
