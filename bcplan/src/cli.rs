/// CLI for bcplan: argument parsing, tool wiring and writing of the generated files.
///
/// All planning logic lives in [`bcplan-core`]. This module builds the real tool
/// adapters from [`crate::tools`], hands them to the core, and writes what comes back.
///
/// ## How To Use
/// - From a shell: `bcplan plan <BUILD_HOME> [EXCLUDED]...` inside a built kernel tree,
///   or `bcplan segment <LISTING> --script <path> --list <path>`. See `--help`.
/// - From tests: construct a [`Cli`] and call [`run`].
///
/// Output files are only written once planning succeeded, each through a temporary
/// file in the destination directory that is renamed into place.
///
/// [`bcplan-core`]: ../../bcplan-core/
use crate::load_config::{load_config, CliConfig};
use crate::tools::{ArchiveLister, GetBcExtractor};
use anyhow::{Context, Result};
use bcplan_core::segment::{folder_of, segment_plan, SegmentOptions};
use bcplan_core::synthesise::{synthesise, PlanRequest};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Plans the rebuild of a compiled kernel tree from its embedded bitcode.
#[derive(Parser)]
#[clap(
    name = "bcplan",
    version,
    about = "Generate the shell script and link-argument file that rebuild a kernel from bitcode"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk the aggregate archives of the tree and write the full rebuild plan
    Plan {
        /// Directory the script rebuilds into; also receives the link-argument file
        build_home: PathBuf,
        /// Subtrees linked from their native archives, e.g. drivers/net/ethernet
        excluded: Vec<String>,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Where to write the generated script
        #[clap(long, default_value = "build_script.sh")]
        script: PathBuf,
        /// Root of the compiled kernel tree
        #[clap(long, default_value = ".")]
        source_root: PathBuf,
        /// Also write the plan report as JSON
        #[clap(long)]
        report: Option<PathBuf>,
    },
    /// Write the bisection script and link list for one folder's archive listing
    Segment {
        /// `ar -t` output of the folder's aggregate archive, e.g. drivers/arbi. The
        /// folder is the name of the directory holding this file
        listing: PathBuf,
        #[clap(long)]
        script: PathBuf,
        #[clap(long)]
        list: PathBuf,
        #[clap(long, default_value = "$HOME/standalone-build")]
        build_home: String,
        /// Last directory ordinal linked from bitcode
        #[clap(long)]
        bitcode_cutoff: Option<usize>,
        /// Directory ordinal always linked natively (repeatable)
        #[clap(long = "native")]
        native: Vec<usize>,
        #[clap(long, default_value_t = 2)]
        skip_leading: usize,
        #[clap(long, default_value_t = 1)]
        skip_trailing: usize,
    },
}

/// CLI entrypoint for main() and integration tests.
pub fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Plan {
            build_home,
            excluded,
            config,
            script,
            source_root,
            report,
        } => {
            let config = match config {
                Some(path) => load_config(path)?,
                None => CliConfig::from_env(),
            };
            tracing::info!(
                command = "plan",
                build_home = %build_home.display(),
                source_root = %source_root.display(),
                excluded = excluded.len(),
                "Starting plan"
            );

            let lister = ArchiveLister::new(&source_root, &config.tools.ar, &config.plan.layout);
            let extractor = GetBcExtractor::new(
                &source_root,
                &config.plan.toolchain,
                &config.tools.extraction_log,
            );
            let request = PlanRequest {
                build_home: build_home.to_string_lossy().into_owned(),
                excluded,
            };

            let outcome = match synthesise(&config.plan, &request, &lister, &extractor) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(command = "plan", error = %e, "Planning failed");
                    return Err(anyhow::Error::new(e).context("Planning failed"));
                }
            };

            fs::create_dir_all(&build_home).with_context(|| {
                format!("Failed to create build home {}", build_home.display())
            })?;
            let link_args_path = build_home.join(&config.plan.trailer.link_args_file);
            write_atomically(&script, &outcome.plan.render_script())?;
            write_atomically(&link_args_path, &outcome.plan.render_link_args())?;
            if let Some(report_path) = report {
                let json = serde_json::to_string_pretty(&outcome)
                    .context("Failed to serialise plan report")?;
                write_atomically(&report_path, &json)?;
            }

            tracing::info!(
                command = "plan",
                script = %script.display(),
                link_args = %link_args_path.display(),
                stats = ?outcome.stats,
                unmatched_exclusions = ?outcome.unmatched_exclusions,
                "Plan written"
            );
            Ok(())
        }
        Commands::Segment {
            listing,
            script,
            list,
            build_home,
            bitcode_cutoff,
            native,
            skip_leading,
            skip_trailing,
        } => {
            let content = fs::read_to_string(&listing)
                .with_context(|| format!("Failed to read listing {}", listing.display()))?;
            let members: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
            let listing_name = listing.to_string_lossy();
            let folder = folder_of(&listing_name);
            let options = SegmentOptions {
                build_home,
                skip_leading,
                skip_trailing,
                bitcode_cutoff,
                native_positions: native,
            };
            tracing::info!(command = "segment", folder, members = members.len(), "Starting segment plan");

            let config = CliConfig::from_env();
            let plan = segment_plan(folder, &members, &options, &config.plan);
            write_atomically(&script, &plan.render_script())?;
            write_atomically(&list, &plan.render_link_args())?;

            tracing::info!(
                command = "segment",
                script = %script.display(),
                list = %list.display(),
                entries = plan.link_args().len(),
                "Segment plan written"
            );
            Ok(())
        }
    }
}

/// Writes `contents` next to `path` and renames it into place.
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.persist(path)
        .with_context(|| format!("Failed to persist {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote output file");
    Ok(())
}
