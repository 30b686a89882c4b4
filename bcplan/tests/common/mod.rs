#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Stand-in for `ar`: listings are stored as plain text in the archive files.
pub const FAKE_AR: &str = "#!/bin/sh\ncat \"$2\"\n";

/// Stand-in for `get-bc -b <archive>`: always produces aggregate bitcode, and reports
/// every line of `<archive>.asm` as a member without bitcode.
pub const FAKE_GET_BC: &str = r#"#!/bin/sh
touch "$2.a.bc"
if [ -f "$2.asm" ]; then
  while read -r obj; do
    echo "WARNING:Error reading the .llvm_bc section of ELF file $obj." >> "$GLLVM_OUTPUT_FILE"
  done < "$2.asm"
fi
"#;

pub const FAILING_GET_BC: &str = "#!/bin/sh\necho boom >&2\nexit 3\n";

pub fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write tool script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod tool script");
    path
}

/// Writes `rel` under `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write file");
}

/// A two-directory tree: `init` and `kernel`, each with its own aggregate archive.
pub fn small_kernel_tree(root: &Path) {
    write_file(
        root,
        "built-in.o",
        "arch/x86/kernel/head_64.o\ninit/main.o\n\nkernel/fork.o\nkernel/sched/core.o\n",
    );
    write_file(root, "init/built-in.o", "init/main.o\n");
    write_file(root, "kernel/built-in.o", "kernel/fork.o\nkernel/sched/core.o\n");
}
