//! Real adapters for the core capabilities: `ar` for member listings and `get-bc`
//! for bitcode extraction.
//!
//! Both run their tool with the source root as working directory, so every path
//! crossing the [`MemberLister`]/[`BitcodeExtractor`] boundary stays relative to it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use bcplan_core::assembly::scan_extraction_log;
use bcplan_core::classify::flat_name;
use bcplan_core::config::{Layout, Toolchain};
use bcplan_core::contract::{BitcodeExtractor, ExtractionOutcome, MemberLister};
use bcplan_core::error::{ListingError, ToolFailure};

/// Lists aggregate archives with `ar -t`.
#[derive(Debug, Clone)]
pub struct ArchiveLister {
    source_root: PathBuf,
    ar: String,
    aggregate_archive: String,
}

impl ArchiveLister {
    pub fn new(source_root: impl Into<PathBuf>, ar: impl Into<String>, layout: &Layout) -> Self {
        Self {
            source_root: source_root.into(),
            ar: ar.into(),
            aggregate_archive: layout.aggregate_archive.clone(),
        }
    }
}

impl MemberLister for ArchiveLister {
    fn list_members(&self, base_dir: &str) -> Result<Vec<String>, ListingError> {
        let archive = format!("{base_dir}{}", self.aggregate_archive);
        if !self.source_root.join(&archive).is_file() {
            tracing::debug!(archive = %archive, "No aggregate archive");
            return Err(ListingError::Unavailable { archive });
        }

        let output = Command::new(&self.ar)
            .arg("-t")
            .arg(&archive)
            .current_dir(&self.source_root)
            .output();

        match output {
            Ok(out) if out.status.success() => {
                let members: Vec<String> = String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect();
                tracing::debug!(archive = %archive, members = members.len(), "Listed archive");
                Ok(members)
            }
            Ok(out) => {
                let detail = format!(
                    "{}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                tracing::error!(archive = %archive, detail = %detail, "ar exited with non-zero code");
                Err(ListingError::Tool { archive, detail })
            }
            Err(e) => {
                tracing::error!(error = ?e, archive = %archive, tool = %self.ar, "Failed to launch ar");
                Err(ListingError::Tool {
                    archive,
                    detail: e.to_string(),
                })
            }
        }
    }
}

/// Runs `get-bc` on an archive and reads back what it produced.
///
/// The extractor reports members without bitcode only through its log file, so the
/// log is rotated before every run and scanned afterwards.
#[derive(Debug, Clone)]
pub struct GetBcExtractor {
    source_root: PathBuf,
    extractor: String,
    extractor_args: Vec<String>,
    bitcode_suffix: String,
    log_path: PathBuf,
}

impl GetBcExtractor {
    /// `log_path` is resolved against `source_root` when relative.
    pub fn new(
        source_root: impl Into<PathBuf>,
        toolchain: &Toolchain,
        log_path: impl AsRef<Path>,
    ) -> Self {
        let source_root = source_root.into();
        let log_path = source_root.join(log_path);
        Self {
            source_root,
            extractor: toolchain.extractor.clone(),
            extractor_args: toolchain.extractor_args.clone(),
            bitcode_suffix: toolchain.bitcode_suffix.clone(),
            log_path,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Moves the previous log aside as `before_<archive>.log` next to it.
    fn rotate_log(&self, archive: &str) -> Result<(), ToolFailure> {
        if !self.log_path.exists() {
            return Ok(());
        }
        let rotated = self
            .log_path
            .with_file_name(format!("before_{}.log", flat_name(archive)));
        fs::rename(&self.log_path, &rotated).map_err(|e| {
            tracing::error!(error = ?e, log = %self.log_path.display(), "Failed to rotate extraction log");
            self.failure(archive, format!("cannot rotate {}: {e}", self.log_path.display()))
        })
    }

    fn prepare_log_dir(&self, archive: &str) -> Result<(), ToolFailure> {
        match self.log_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
                fs::create_dir_all(dir).map_err(|e| {
                    self.failure(archive, format!("cannot create {}: {e}", dir.display()))
                })
            }
            _ => Ok(()),
        }
    }

    fn aggregate_bitcode(&self, archive: &str) -> Option<String> {
        [
            format!("{archive}.a{}", self.bitcode_suffix),
            format!("{archive}{}", self.bitcode_suffix),
        ]
        .into_iter()
        .find(|candidate| self.source_root.join(candidate).is_file())
    }

    fn failure(&self, archive: &str, detail: String) -> ToolFailure {
        ToolFailure {
            tool: self.extractor.clone(),
            target: archive.to_string(),
            detail,
        }
    }
}

impl BitcodeExtractor for GetBcExtractor {
    fn extract(&self, archive: &str) -> Result<ExtractionOutcome, ToolFailure> {
        if !self.source_root.join(archive).exists() {
            tracing::debug!(archive, "Archive missing, nothing to extract");
            return Ok(ExtractionOutcome::default());
        }

        self.prepare_log_dir(archive)?;
        self.rotate_log(archive)?;

        let mut command = Command::new(&self.extractor);
        command
            .args(&self.extractor_args)
            .arg(archive)
            .current_dir(&self.source_root)
            .env("GLLVM_OUTPUT_FILE", &self.log_path);
        if std::env::var_os("GLLVM_OUTPUT_LEVEL").is_none() {
            command.env("GLLVM_OUTPUT_LEVEL", "WARNING");
        }

        match command.output() {
            Ok(out) if out.status.success() => {
                tracing::debug!(archive, status = ?out.status, "Extraction finished");
            }
            Ok(out) => {
                let detail = format!(
                    "{}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                tracing::error!(archive, detail = %detail, "Extractor exited with non-zero code");
                return Err(self.failure(archive, detail));
            }
            Err(e) => {
                tracing::error!(error = ?e, archive, tool = %self.extractor, "Failed to launch extractor");
                return Err(self.failure(archive, e.to_string()));
            }
        }

        let assembly_objects = match fs::read_to_string(&self.log_path) {
            Ok(log) => scan_extraction_log(&log),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::error!(error = ?e, log = %self.log_path.display(), "Failed to read extraction log");
                return Err(self.failure(archive, format!("cannot read extraction log: {e}")));
            }
        };

        let outcome = ExtractionOutcome {
            aggregate_bitcode: self.aggregate_bitcode(archive),
            assembly_objects,
        };
        tracing::info!(
            archive,
            bitcode = outcome.aggregate_bitcode.is_some(),
            assembly_objects = outcome.assembly_objects.len(),
            "Extracted archive"
        );
        Ok(outcome)
    }
}
