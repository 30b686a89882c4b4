//! Fixed trailer appended after the walk: static libraries, standalone objects and
//! the final link command.
//!
//! Nothing emitted here goes into the link-argument list. The libraries are linked
//! inside `--start-group`/`--end-group` to resolve their circular references, and the
//! standalone objects lead the command under `--whole-archive`.

use tracing::{debug, info};

use crate::classify::file_name;
use crate::config::{PlanConfig, StaticLibrary};
use crate::contract::BitcodeExtractor;
use crate::error::ToolFailure;
use crate::plan::{in_build_home, BuildPlan, BUILD_HOME_VAR};

/// Appends the trailer to `plan`. Libraries with assembly scanning are extracted now,
/// through `extractor`.
pub fn emit_trailer<E>(
    plan: &mut BuildPlan,
    config: &PlanConfig,
    extractor: &E,
) -> Result<(), ToolFailure>
where
    E: BitcodeExtractor + ?Sized,
{
    let trailer = &config.trailer;
    let mut group = Vec::new();

    for library in &trailer.static_libraries {
        group.extend(static_library(plan, config, library, extractor)?);
    }
    group.extend(trailer.group_objects.iter().cloned());

    if let Some(script) = &trailer.linker_script {
        plan.copy(script, BUILD_HOME_VAR);
    }
    for object in &trailer.group_objects {
        copy_to_build_home(plan, object);
    }
    for object in &config.standalone_objects {
        plan.copy_parents(object, BUILD_HOME_VAR);
    }

    plan.blank();
    plan.command("# linking command");
    plan.command(format!("cd {BUILD_HOME_VAR}"));
    plan.command(link_command(config, &group));

    info!(
        group_members = group.len(),
        standalone_objects = config.standalone_objects.len(),
        "Emitted trailer"
    );
    Ok(())
}

/// Extract, copy and recompile one static library. Returns what the link group needs
/// from it: the recompiled object and, if any were found, a glob over its assembly
/// objects.
fn static_library<E>(
    plan: &mut BuildPlan,
    config: &PlanConfig,
    library: &StaticLibrary,
    extractor: &E,
) -> Result<Vec<String>, ToolFailure>
where
    E: BitcodeExtractor + ?Sized,
{
    let toolchain = &config.toolchain;
    let archive = library.archive.as_str();
    let dir = archive.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let objects_dir = join(dir, &config.layout.staging_dir);
    let bitcode = format!("{archive}{}", toolchain.bitcode_suffix);
    let output = format!("{archive}.o");
    let mut group = Vec::new();

    if library.scan_assembly {
        let outcome = extractor.extract(archive)?;
        plan.mkdir(&in_build_home(&objects_dir));
        for object in &outcome.assembly_objects {
            plan.copy(object, &format!("{}/", in_build_home(&objects_dir)));
        }
        debug!(
            library = archive,
            assembly_objects = outcome.assembly_objects.len(),
            "Scanned static library"
        );
        group.push(output.clone());
        if !outcome.assembly_objects.is_empty() {
            group.push(format!("{objects_dir}/*"));
        }
    } else {
        plan.command(toolchain.extract_command(archive));
        plan.mkdir(&in_build_home(dir));
        group.push(output.clone());
    }

    plan.copy(&bitcode, &in_build_home(&bitcode));
    plan.command(toolchain.compile_command(&in_build_home(&output), &in_build_home(&bitcode)));
    plan.blank();
    Ok(group)
}

fn copy_to_build_home(plan: &mut BuildPlan, object: &str) {
    if object.contains('/') {
        plan.copy_parents(object, BUILD_HOME_VAR);
    } else {
        plan.copy(object, BUILD_HOME_VAR);
    }
}

/// The final link command. Runs from `$build_home`, so every path is relative to it.
pub fn link_command(config: &PlanConfig, group: &[String]) -> String {
    let toolchain = &config.toolchain;
    let trailer = &config.trailer;
    let mut parts: Vec<String> = vec![toolchain.linker.clone()];
    parts.extend(toolchain.linker_args.iter().cloned());
    if let Some(script) = &trailer.linker_script {
        parts.push("-T".to_string());
        parts.push(file_name(script).to_string());
    }
    parts.push("--whole-archive".to_string());
    parts.extend(config.standalone_objects.iter().cloned());
    parts.push(format!("@{}", trailer.link_args_file));
    parts.push("--no-whole-archive".to_string());
    parts.push("--start-group".to_string());
    parts.extend(group.iter().cloned());
    parts.push("--end-group".to_string());
    parts.push("-o".to_string());
    parts.push(trailer.output.clone());
    parts.join(" ")
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
