//! Toolchain flag configuration.
//!
//! Flag derivation is a pure function of the target [`Platform`], the
//! minimise-size build mode, and the project version/revision strings. The
//! platform is decided once at the top level and threaded through explicitly;
//! nothing in this module inspects the ambient operating system beyond
//! [`Platform::host`].

use clap::ValueEnum;

/// Target platform for the generated build description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    /// Linux hosts (GNU toolchain, ELF binaries).
    Linux,
    /// macOS hosts (Apple toolchain, Mach-O binaries).
    Darwin,
    /// Any platform without dedicated flag handling.
    Other,
}

impl Platform {
    /// Detect the platform the generator is running on.
    ///
    /// Unrecognised operating systems map to [`Platform::Other`], which
    /// receives the common flag set with no platform-specific additions.
    #[must_use]
    pub fn host() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::Darwin,
            _ => Self::Other,
        }
    }
}

/// Immutable record of the flag lists shared by all rule templates.
///
/// Computed once at startup via [`FlagSet::compute`] and read-only
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet {
    /// Project version string, exported as the `version` variable.
    pub version: String,
    /// Source revision string, exported as the `revision` variable.
    pub revision: String,
    /// Compiler flags (optimisation, include roots, size reduction).
    pub compile: Vec<String>,
    /// Linker flags, appended to the compiler invocation.
    pub link: Vec<String>,
    /// Arguments for the strip tool run after linking.
    pub strip: Vec<String>,
    /// Libraries appended to the link line.
    pub libs: Vec<String>,
}

const COMPILE_COMMON: &[&str] = &["-O2", "-I", "./", "-I", "../"];

const COMPILE_MINIMIZE: &[&str] = &[
    "-DMINIMAL",
    "-fno-exceptions",
    "-ffreestanding",
    "-fno-stack-protector",
    "-fomit-frame-pointer",
    "-fno-ident",
    "-ffunction-sections",
    "-fdata-sections",
    "-fmerge-all-constants",
];

const COMPILE_BASE: &[&str] = &["-std=c++11", "-Wall", "-Werror"];

const LINK_COMMON: &[&str] = &["-no-pie", "-Wl,--gc-sections"];

const STRIP_LINUX_SECTIONS: &[&str] = &[
    "--remove-section=.note.gnu.gold-version",
    "--remove-section=.comment",
    "--remove-section=.note",
    "--remove-section=.note.gnu.build-id",
    "--remove-section=.note.ABI-tag",
];

impl FlagSet {
    /// Derive the full flag set for `platform`.
    ///
    /// When `minimize` is set the compiler additionally gets the
    /// size-reduction flags (and, on Linux, build-id suppression so stripped
    /// binaries carry no identifying note sections).
    #[must_use]
    pub fn compute(platform: Platform, minimize: bool, version: &str, revision: &str) -> Self {
        let mut compile = to_strings(COMPILE_COMMON);
        if minimize {
            compile.extend(to_strings(COMPILE_MINIMIZE));
            if platform == Platform::Linux {
                compile.push("-Wl,--build-id=none".to_owned());
            }
        }
        compile.extend(to_strings(COMPILE_BASE));

        let mut link = to_strings(LINK_COMMON);
        let mut strip = vec!["-S".to_owned()];
        match platform {
            Platform::Darwin => {
                link.push("-Wl,-dead_strip".to_owned());
                link.push("-D_GNU_SOURCE".to_owned());
                strip.push("-x".to_owned());
            }
            Platform::Linux => {
                link.push("-s".to_owned());
                link.push("-Wl,--build-id=none".to_owned());
                strip.push("--strip-unneeded".to_owned());
                strip.extend(to_strings(STRIP_LINUX_SECTIONS));
            }
            Platform::Other => {}
        }

        Self {
            version: version.to_owned(),
            revision: revision.to_owned(),
            compile,
            link,
            strip,
            libs: vec!["-ldl".to_owned()],
        }
    }
}

fn to_strings(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| (*f).to_owned()).collect()
}
