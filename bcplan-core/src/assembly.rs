//! Detection of archive members that carry no bitcode.
//!
//! Objects assembled from hand-written `.S` files have no `.llvm_bc` section. The
//! extractor logs one warning per such member and carries on; this module turns that
//! log back into the list of members that must be linked as native objects.
//! Only extractor adapters call this; the walk sees an [`ExtractionOutcome`] instead.
//!
//! [`ExtractionOutcome`]: crate::contract::ExtractionOutcome

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Start of the extractor's warning for a member without a bitcode section.
pub const ASSEMBLY_WARNING_PREFIX: &str = "WARNING:Error reading the .llvm_bc section of ELF file";

fn warning_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(&format!(
            r"^{}:? (?P<path>\S+?)\.?$",
            regex::escape(ASSEMBLY_WARNING_PREFIX)
        ))
        .expect("assembly warning pattern is valid")
    })
}

/// Returns the object paths named by assembly-only warnings in `log`, de-duplicated,
/// in the order they first appear. Every other line is ignored.
pub fn scan_extraction_log(log: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut objects = Vec::new();
    for line in log.lines() {
        let line = line.trim_end();
        let Some(caps) = warning_line().captures(line) else {
            continue;
        };
        let path = caps["path"].to_string();
        if seen.insert(path.clone()) {
            objects.push(path);
        }
    }
    objects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_fifty_four_characters() {
        assert_eq!(ASSEMBLY_WARNING_PREFIX.len(), 54);
    }

    #[test]
    fn picks_paths_in_both_message_shapes() {
        let log = "\
INFO:extracting drivers/built-in.o
WARNING:Error reading the .llvm_bc section of ELF file drivers/a/entry.o.
WARNING:Error reading the .llvm_bc section of ELF file: drivers/b/head.o
WARNING:something else entirely
";
        assert_eq!(
            scan_extraction_log(log),
            vec!["drivers/a/entry.o".to_string(), "drivers/b/head.o".to_string()]
        );
    }

    #[test]
    fn repeated_warnings_count_once() {
        let log = "WARNING:Error reading the .llvm_bc section of ELF file: a/b.o\r\n\
                   WARNING:Error reading the .llvm_bc section of ELF file: a/b.o\n";
        assert_eq!(scan_extraction_log(log), vec!["a/b.o".to_string()]);
    }

    #[test]
    fn warning_must_start_the_line() {
        let log = "note: WARNING:Error reading the .llvm_bc section of ELF file: a/b.o\n";
        assert!(scan_extraction_log(log).is_empty());
    }
}
