use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything the walk and the trailer need to know about the tree and the toolchain.
///
/// All fields default to the x86 kernel layout, so an empty YAML document (or no
/// document at all) yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub layout: Layout,
    /// Objects linked directly by the trailer, in link order. Never emitted by the walk.
    pub standalone_objects: Vec<String>,
    pub toolchain: Toolchain,
    pub trailer: TrailerConfig,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            standalone_objects: vec![
                "arch/x86/kernel/head_64.o".to_string(),
                "arch/x86/kernel/head64.o".to_string(),
                "arch/x86/kernel/ebda.o".to_string(),
                "arch/x86/kernel/platform-quirks.o".to_string(),
            ],
            toolchain: Toolchain::default(),
            trailer: TrailerConfig::default(),
        }
    }
}

impl PlanConfig {
    pub fn trace_loaded(&self) {
        info!(
            arch_root = %self.layout.arch_root,
            arch_exceptions = self.layout.arch_exceptions.len(),
            standalone_objects = self.standalone_objects.len(),
            static_libraries = self.trailer.static_libraries.len(),
            "Loaded plan config"
        );
        debug!(?self, "Plan config loaded (full debug)");
    }
}

/// Naming conventions of the source tree and of the mirrored output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Top-level directory that has no aggregate archive of its own.
    pub arch_root: String,
    /// Second-level directories under `<arch_root>/<arch>/` aggregated on their own.
    pub arch_exceptions: Vec<String>,
    /// File name of a directory's aggregate archive.
    pub aggregate_archive: String,
    pub object_suffix: String,
    /// Directory under `$build_home` that mirrors the source tree.
    pub output_dir: String,
    /// Per-directory staging directory for extracted leaf bitcode.
    pub staging_dir: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            arch_root: "arch".to_string(),
            arch_exceptions: ["lib", "pci", "video", "power"]
                .into_iter()
                .map(String::from)
                .collect(),
            aggregate_archive: "built-in.o".to_string(),
            object_suffix: ".o".to_string(),
            output_dir: "built-ins".to_string(),
            staging_dir: "objects".to_string(),
        }
    }
}

impl Layout {
    /// Path of the aggregate archive for a node, relative to the source root.
    pub fn aggregate_of(&self, node: &str) -> String {
        format!("{node}/{}", self.aggregate_archive)
    }
}

/// External tools named in the generated script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    pub extractor: String,
    pub extractor_args: Vec<String>,
    pub compiler: String,
    pub compile_args: Vec<String>,
    pub thin_archive_converter: String,
    /// Suffix the converter appends to the archive it rewrites.
    pub converted_suffix: String,
    /// Suffix the extractor appends to an object to name its bitcode.
    pub bitcode_suffix: String,
    pub linker: String,
    pub linker_args: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            extractor: "get-bc".to_string(),
            extractor_args: vec!["-b".to_string()],
            compiler: "clang".to_string(),
            compile_args: ["-c", "-no-integrated-as", "-mcmodel=kernel"]
                .into_iter()
                .map(String::from)
                .collect(),
            thin_archive_converter: "convert-thin-archive.sh".to_string(),
            converted_suffix: ".new".to_string(),
            bitcode_suffix: ".bc".to_string(),
            linker: "ld".to_string(),
            linker_args: vec!["--build-id".to_string()],
        }
    }
}

impl Toolchain {
    pub fn extract_command(&self, target: &str) -> String {
        join_command(&self.extractor, &self.extractor_args, &[target])
    }

    pub fn compile_command(&self, output: &str, input: &str) -> String {
        join_command(&self.compiler, &self.compile_args, &["-o", output, input])
    }

    pub fn convert_command(&self, archive: &str) -> String {
        join_command(&self.thin_archive_converter, &[], &[archive])
    }
}

fn join_command(program: &str, fixed: &[String], rest: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in fixed.iter().map(String::as_str).chain(rest.iter().copied()) {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Settings of the fixed trailer appended after the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailerConfig {
    /// Libraries linked inside `--start-group`/`--end-group`, in order.
    pub static_libraries: Vec<StaticLibrary>,
    /// Linker script copied to `$build_home` and passed with `-T`.
    pub linker_script: Option<String>,
    /// Prebuilt objects copied to `$build_home` and linked at the end of the group.
    pub group_objects: Vec<String>,
    /// File name of the link-argument file inside `$build_home`.
    pub link_args_file: String,
    pub output: String,
}

impl Default for TrailerConfig {
    fn default() -> Self {
        Self {
            static_libraries: vec![
                StaticLibrary {
                    archive: "lib/lib.a".to_string(),
                    scan_assembly: false,
                },
                StaticLibrary {
                    archive: "arch/x86/lib/lib.a".to_string(),
                    scan_assembly: true,
                },
            ],
            linker_script: Some("arch/x86/kernel/vmlinux.lds".to_string()),
            group_objects: vec![".tmp_kallsyms2.o".to_string()],
            link_args_file: "link-args".to_string(),
            output: "vmlinux".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticLibrary {
    pub archive: String,
    /// Extract while planning and carry the assembly-only members along as objects.
    #[serde(default)]
    pub scan_assembly: bool,
}
