//! Tests for graph construction, emitters, and bundle aggregation.

use camino::{Utf8Path, Utf8PathBuf};
use confgen::graph::{
    Action, BuildNode, BundlePart, GraphBuilder, GraphError, TransformRequest,
};
use rstest::rstest;

fn path(p: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(p)
}

fn part(name: &str, source: &str) -> BundlePart {
    BundlePart {
        name: name.to_owned(),
        source: path(source),
    }
}

fn node_for<'a>(builder: &'a GraphBuilder, output: &str) -> &'a BuildNode {
    builder
        .nodes()
        .iter()
        .find(|node| node.outputs.iter().any(|out| out == output))
        .unwrap_or_else(|| panic!("no node produces {output}"))
}

#[rstest]
#[case(1)]
#[case(4)]
fn directory_nodes_are_never_duplicated(#[case] requests: usize) {
    let mut builder = GraphBuilder::new();
    for _ in 0..requests {
        builder.emit_make_directory(Utf8Path::new("gen")).expect("mkdir");
    }
    let dirs = builder
        .nodes()
        .iter()
        .filter(|node| node.action == Action::MakeDirectory)
        .count();
    assert_eq!(dirs, 1);
}

#[test]
fn duplicate_transform_output_is_reported() {
    let mut builder = GraphBuilder::new();
    builder
        .emit_transform(path("gen/boot.h"), path("a.fs"), TransformRequest::default())
        .expect("first emit");
    let err = builder
        .emit_transform(path("gen/boot.h"), path("b.fs"), TransformRequest::default())
        .expect_err("collision");
    assert!(matches!(err, GraphError::DuplicateOutput { output } if output == "gen/boot.h"));
}

#[test]
fn bundle_fan_in_is_complete() {
    let mut builder = GraphBuilder::new();
    let parts = [
        part("camera", "camera.fs"),
        part("oled", "oled.fs"),
        part("interrupts", "timers.fs"),
    ];
    builder
        .emit_optional_bundle("esp32", "extras", &parts, None)
        .expect("bundle");

    let aggregate = node_for(&builder, "gen/esp32_optional_extras.h");
    assert_eq!(
        aggregate.implicit_inputs,
        vec![
            path("gen/esp32_camera.h"),
            path("gen/esp32_oled.h"),
            path("gen/esp32_interrupts.h"),
        ]
    );
    assert_eq!(aggregate.explicit_inputs, vec![path("gen/esp32_camera.h")]);
    assert_eq!(
        aggregate.depfile.as_deref(),
        Some(Utf8Path::new("gen/esp32_optional_extras.h.dd"))
    );
    let Action::Transform(options) = &aggregate.action else {
        panic!("aggregate must be a transform");
    };
    assert!(options.keep_first_comment);
    assert_eq!(options.name, None);

    builder.finalize().expect("aggregate inputs all resolve");
}

#[test]
fn bundle_main_source_overrides_first_part() {
    let mut builder = GraphBuilder::new();
    let parts = [part("camera", "camera.fs")];
    builder
        .emit_optional_bundle("esp32", "extras", &parts, Some(path("extras.fs")))
        .expect("bundle");
    let aggregate = node_for(&builder, "gen/esp32_optional_extras.h");
    assert_eq!(aggregate.explicit_inputs, vec![path("extras.fs")]);
}

#[test]
fn bundle_part_names_are_normalised_for_the_tool() {
    let mut builder = GraphBuilder::new();
    let parts = [part("spi-flash", "spi-flash.fs")];
    builder
        .emit_optional_bundle("esp32", "extras", &parts, None)
        .expect("bundle");
    let node = node_for(&builder, "gen/esp32_spi-flash.h");
    let Action::Transform(options) = &node.action else {
        panic!("part must be a transform");
    };
    assert_eq!(options.name.as_deref(), Some("spi_flash"));
    assert_eq!(options.render(), "--name spi_flash --header cpp");
}

#[test]
fn empty_bundle_is_rejected() {
    let mut builder = GraphBuilder::new();
    let err = builder
        .emit_optional_bundle("esp32", "hollow", &[], None)
        .expect_err("nothing to aggregate");
    assert!(matches!(err, GraphError::EmptyBundle { bundle } if bundle == "hollow"));
}

#[test]
fn compile_nodes_default_their_depfile() {
    let mut builder = GraphBuilder::new();
    builder
        .emit_compile(path("forth"), path("../posix/main.cpp"), Vec::new())
        .expect("compile");
    let node = node_for(&builder, "forth");
    assert_eq!(node.action, Action::Compile);
    assert_eq!(node.depfile.as_deref(), Some(Utf8Path::new("forth.d")));
    assert!(node.order_only_inputs.is_empty());
}

#[test]
fn compile_implicit_inputs_must_resolve() {
    let mut builder = GraphBuilder::new();
    builder
        .emit_compile(
            path("forth"),
            path("../posix/main.cpp"),
            vec![path("gen/posix_boot.h")],
        )
        .expect("compile");
    let err = builder.finalize().expect_err("nothing produces the header");
    assert!(matches!(err, GraphError::UnresolvedInput { input, .. } if input == "gen/posix_boot.h"));

    let mut resolved = GraphBuilder::new();
    resolved
        .emit_transform(
            path("gen/posix_boot.h"),
            path("../posix/posix_boot.fs"),
            TransformRequest::named("boot"),
        )
        .expect("transform");
    resolved
        .emit_compile(
            path("forth"),
            path("../posix/main.cpp"),
            vec![path("gen/posix_boot.h")],
        )
        .expect("compile");
    resolved.finalize().expect("header is produced");
}
