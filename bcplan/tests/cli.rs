mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use common::{small_kernel_tree, write_file, write_tool, FAILING_GET_BC, FAKE_AR, FAKE_GET_BC};

fn bcplan() -> Command {
    let mut cmd = Command::cargo_bin("bcplan").expect("Binary exists");
    cmd.env_remove("BCPLAN_AR")
        .env_remove("BCPLAN_EXTRACTION_LOG")
        .env_remove("GLLVM_OUTPUT_FILE");
    cmd
}

/// Config pointing the plan at stand-in tools, with only the assembly-scanned library.
fn write_config(dir: &Path, ar: &Path, get_bc: &Path) -> std::path::PathBuf {
    let path = dir.join("bcplan.yaml");
    let yaml = format!(
        "plan:\n  toolchain:\n    extractor: {}\n  trailer:\n    static_libraries:\n      - archive: arch/x86/lib/lib.a\n        scan_assembly: true\ntools:\n  ar: {}\n",
        get_bc.display(),
        ar.display()
    );
    fs::write(&path, yaml).expect("write config");
    path
}

#[test]
fn help_lists_both_subcommands() {
    bcplan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan").and(predicate::str::contains("segment")));
}

#[test]
#[serial]
fn plan_writes_script_and_link_args() {
    let tools = tempdir().unwrap();
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    let ar = write_tool(tools.path(), "ar", FAKE_AR);
    let get_bc = write_tool(tools.path(), "get-bc", FAKE_GET_BC);
    let config = write_config(tools.path(), &ar, &get_bc);
    small_kernel_tree(tree.path());
    write_file(tree.path(), "arch/x86/lib/lib.a", "");
    write_file(tree.path(), "arch/x86/lib/lib.a.asm", "arch/x86/lib/memcpy_64.o\n");

    let build_home = out.path().join("build");
    let script = out.path().join("build_script.sh");
    let report = out.path().join("report.json");

    bcplan()
        .arg("plan")
        .arg(&build_home)
        .arg("--config")
        .arg(&config)
        .arg("--source-root")
        .arg(tree.path())
        .arg("--script")
        .arg(&script)
        .arg("--report")
        .arg(&report)
        .assert()
        .success();

    let link_args = fs::read_to_string(build_home.join("link-args")).expect("link-args written");
    assert_eq!(link_args, "built-ins/initbibc.o built-ins/kernelbibc.o");

    let script = fs::read_to_string(&script).expect("script written");
    let lines: Vec<&str> = script.lines().collect();
    assert_eq!(lines[0], "# Script written by bcplan");
    assert_eq!(lines[1], format!("export build_home={}/", build_home.display()));
    assert!(lines.contains(&"cp init/built-in.o.a.bc $build_home/built-ins/initbi.o.bc"));
    assert!(lines.contains(&"cp arch/x86/lib/memcpy_64.o $build_home/arch/x86/lib/objects/"));
    assert!(!script.contains("head_64.o $build_home/built-ins"));
    assert!(lines
        .last()
        .is_some_and(|l| l.ends_with("arch/x86/lib/objects/* .tmp_kallsyms2.o --end-group -o vmlinux")));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report written")).unwrap();
    assert_eq!(report["stats"]["directories"], 2);
}

#[test]
#[serial]
fn plan_failure_leaves_no_output() {
    let tools = tempdir().unwrap();
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    let ar = write_tool(tools.path(), "ar", FAKE_AR);
    let get_bc = write_tool(tools.path(), "get-bc", FAILING_GET_BC);
    let config = write_config(tools.path(), &ar, &get_bc);
    small_kernel_tree(tree.path());

    let build_home = out.path().join("build");
    let script = out.path().join("build_script.sh");

    bcplan()
        .arg("plan")
        .arg(&build_home)
        .arg("--config")
        .arg(&config)
        .arg("--source-root")
        .arg(tree.path())
        .arg("--script")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Planning failed"));

    assert!(!script.exists());
    assert!(!build_home.join("link-args").exists());
}

#[test]
fn segment_writes_script_and_list() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "drivers/arbi",
        "drivers/built-in.o\nmodules.order\nacpi/bus.o\nversion.o\nbase/core.o\ntrailer.o\n",
    );
    let script = dir.path().join("segment.sh");
    let list = dir.path().join("segment.list");

    bcplan()
        .current_dir(dir.path())
        .args(["segment", "drivers/arbi", "--build-home", "/srv/kbuild"])
        .arg("--script")
        .arg(&script)
        .arg("--list")
        .arg(&list)
        .args(["--native", "1"])
        .assert()
        .success();

    let list = fs::read_to_string(&list).expect("list written");
    assert_eq!(
        list,
        "built-ins/drivers/acpibibc.o built-ins/drivers/objects/versionbc.o built-ins/drivers/basebi.o"
    );
    let script = fs::read_to_string(&script).expect("script written");
    assert!(script.starts_with("export build_home=/srv/kbuild\n"));
    assert!(script.contains("convert-thin-archive.sh base/built-in.o\n"));
}

#[test]
fn segment_takes_folder_from_absolute_listing_path() {
    let dir = tempdir().unwrap();
    write_file(
        dir.path(),
        "linux/fs/arbi",
        "fs/built-in.o\nmodules.order\next4/inode.o\nopen.o\nlast.o\n",
    );
    let listing = dir.path().join("linux/fs/arbi");
    let list = dir.path().join("fs.list");

    bcplan()
        .arg("segment")
        .arg(&listing)
        .arg("--script")
        .arg(dir.path().join("fs.sh"))
        .arg("--list")
        .arg(&list)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&list).expect("list written"),
        "built-ins/fs/ext4bibc.o built-ins/fs/objects/openbc.o"
    );
}

#[test]
fn segment_help_explains_folder_choice() {
    bcplan()
        .args(["segment", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("directory holding this file"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[test]
fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use bcplan::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Segment {
            listing: "does/not/exist".into(),
            script: "unused.sh".into(),
            list: "unused.list".into(),
            build_home: "/tmp".to_string(),
            bitcode_cutoff: None,
            native: vec![],
            skip_leading: 2,
            skip_trailing: 1,
        },
    };

    let result = run(cli);
    assert!(result.is_err(), "missing listing must fail");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
