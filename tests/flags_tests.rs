//! Tests for platform-conditional flag derivation.

use confgen::flags::{FlagSet, Platform};
use rstest::rstest;

fn owned(flag: &str) -> String {
    flag.to_owned()
}

#[rstest]
#[case(Platform::Linux)]
#[case(Platform::Darwin)]
#[case(Platform::Other)]
fn compute_is_pure(#[case] platform: Platform) {
    let first = FlagSet::compute(platform, true, "1.0", "rev");
    let second = FlagSet::compute(platform, true, "1.0", "rev");
    assert_eq!(first, second);
}

#[test]
fn linux_minimize_suppresses_build_id() {
    let flags = FlagSet::compute(Platform::Linux, true, "1.0", "rev");
    assert!(flags.compile.contains(&owned("-Wl,--build-id=none")));
    assert!(flags.link.contains(&owned("-Wl,--build-id=none")));
    assert!(flags.strip.contains(&owned("--strip-unneeded")));
    assert!(
        flags
            .strip
            .contains(&owned("--remove-section=.note.gnu.build-id"))
    );
}

#[test]
fn darwin_gets_dead_strip_and_feature_test_macro() {
    let flags = FlagSet::compute(Platform::Darwin, true, "1.0", "rev");
    assert!(flags.link.contains(&owned("-Wl,-dead_strip")));
    assert!(flags.link.contains(&owned("-D_GNU_SOURCE")));
    assert_eq!(flags.strip, vec!["-S", "-x"]);
    assert!(!flags.compile.contains(&owned("-Wl,--build-id=none")));
}

#[test]
fn minimize_off_omits_size_reduction_flags() {
    let flags = FlagSet::compute(Platform::Linux, false, "1.0", "rev");
    assert!(!flags.compile.contains(&owned("-ffreestanding")));
    assert!(!flags.compile.contains(&owned("-DMINIMAL")));
    assert!(flags.compile.contains(&owned("-O2")));
}

#[test]
fn version_and_revision_are_recorded() {
    let flags = FlagSet::compute(Platform::Other, false, "7.0.7.16", "cafe1234");
    assert_eq!(flags.version, "7.0.7.16");
    assert_eq!(flags.revision, "cafe1234");
}
