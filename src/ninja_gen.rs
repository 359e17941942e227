//! Ninja file generator.
//!
//! This module converts a finalized [`crate::graph::BuildGraph`] into the
//! textual representation expected by the Ninja build system: a preamble of
//! global variables and rule templates followed by one build stanza per node
//! in emission order. Emission order is fixed by graph construction, so
//! repeated runs on identical inputs produce byte-identical output.

use crate::flags::FlagSet;
use crate::graph::{Action, BuildGraph, BuildNode};
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use std::fmt::{self, Display, Formatter, Write};

macro_rules! write_kv {
    ($f:expr, $key:expr, $opt:expr) => {
        if let Some(val) = $opt {
            writeln!($f, "  {} = {}", $key, val)?;
        }
    };
}

/// Generate the build description as a string.
///
/// The graph must already be validated via
/// [`crate::graph::GraphBuilder::finalize`]; no text is produced for an
/// unvalidated graph because the builder is the only way to obtain a
/// [`BuildGraph`].
///
/// # Panics
///
/// Panics if writing to the output string fails, which is unexpected under
/// normal conditions.
#[must_use]
pub fn generate(graph: &BuildGraph, flags: &FlagSet, src_root: &Utf8Path) -> String {
    let mut out = String::new();
    write!(out, "{}", Preamble { flags, src_root }).expect("write preamble");
    for node in graph.nodes() {
        write!(out, "{}", Stanza { node }).expect("write build stanza");
    }
    out
}

/// Convert a slice of paths into a space-separated string.
fn join(paths: &[Utf8PathBuf]) -> String {
    paths.iter().map(|p| p.as_str()).join(" ")
}

/// Wrapper struct to display the global variables and rule templates.
struct Preamble<'a> {
    flags: &'a FlagSet,
    src_root: &'a Utf8Path,
}

impl Display for Preamble<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "version = {}", self.flags.version)?;
        writeln!(f, "revision = {}", self.flags.revision)?;
        writeln!(f, "src = {}", self.src_root)?;
        writeln!(f, "cxx = c++")?;
        let cflags = self
            .flags
            .compile
            .iter()
            .chain(&self.flags.link)
            .join(" ");
        writeln!(f, "cflags = {cflags}")?;
        writeln!(f, "strip_args = {}", self.flags.strip.iter().join(" "))?;
        writeln!(f, "libs = {}", self.flags.libs.iter().join(" "))?;
        writeln!(f)?;
        writeln!(f, "rule mkdir")?;
        writeln!(f, "  description = mkdir")?;
        writeln!(f, "  command = mkdir -p $out")?;
        writeln!(f)?;
        writeln!(f, "rule transform")?;
        writeln!(f, "  description = transform")?;
        writeln!(f, "  depfile = $depfile")?;
        writeln!(
            f,
            "  command = $src/tools/transcode -i $in -o $out -I . -I $src $options \
             --depsout $depfile -DVERSION=$version -DREVISION=$revision"
        )?;
        writeln!(f)?;
        writeln!(f, "rule compile")?;
        writeln!(f, "  description = compile")?;
        writeln!(f, "  depfile = $depfile")?;
        writeln!(f, "  deps = gcc")?;
        writeln!(
            f,
            "  command = $cxx $cflags $in -o $out $libs -MD -MF $depfile \
             && strip $strip_args $out"
        )?;
        writeln!(f)
    }
}

/// Wrapper struct to display one build stanza.
struct Stanza<'a> {
    node: &'a BuildNode,
}

impl Display for Stanza<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let node = self.node;
        write!(f, "build {}: {}", join(&node.outputs), rule_name(&node.action))?;
        if !node.explicit_inputs.is_empty() {
            write!(f, " {}", join(&node.explicit_inputs))?;
        }
        if !node.implicit_inputs.is_empty() {
            write!(f, " | {}", join(&node.implicit_inputs))?;
        }
        if !node.order_only_inputs.is_empty() {
            write!(f, " || {}", join(&node.order_only_inputs))?;
        }
        writeln!(f)?;
        if let Action::Transform(options) = &node.action {
            let rendered = options.render();
            write_kv!(f, "options", (!rendered.is_empty()).then_some(rendered));
        }
        write_kv!(f, "depfile", node.depfile.as_ref());
        writeln!(f)
    }
}

const fn rule_name(action: &Action) -> &'static str {
    match action {
        Action::MakeDirectory => "mkdir",
        Action::Transform(_) => "transform",
        Action::Compile => "compile",
    }
}
