//! The two output streams of a build plan.
//!
//! Commands and link arguments are only ever appended, and always from the single
//! walk that produces them, so their relative order is the traversal order.

use serde::Serialize;

/// Shell variable the script exports and every output path is rooted at.
pub const BUILD_HOME_VAR: &str = "$build_home";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    script: Vec<String>,
    link_args: Vec<String>,
}

impl BuildPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&mut self, line: impl Into<String>) {
        self.script.push(line.into());
    }

    /// Blank separator line after a finished unit.
    pub fn blank(&mut self) {
        self.script.push(String::new());
    }

    pub fn mkdir(&mut self, dir: &str) {
        self.command(format!("mkdir -p {dir}"));
    }

    pub fn copy(&mut self, from: &str, to: &str) {
        self.command(format!("cp {from} {to}"));
    }

    /// `cp --parents`: keeps `from`'s relative directories under `to`.
    pub fn copy_parents(&mut self, from: &str, to: &str) {
        self.command(format!("cp --parents {from} {to}"));
    }

    /// Appends a path, relative to the build home, to the link-argument list.
    pub fn link(&mut self, path: impl Into<String>) {
        self.link_args.push(path.into());
    }

    /// Appends a branch buffer, keeping its internal order after everything already here.
    pub fn append(&mut self, other: BuildPlan) {
        self.script.extend(other.script);
        self.link_args.extend(other.link_args);
    }

    pub fn script(&self) -> &[String] {
        &self.script
    }

    pub fn link_args(&self) -> &[String] {
        &self.link_args
    }

    /// Script text, one command per line.
    pub fn render_script(&self) -> String {
        let mut out = String::new();
        for line in &self.script {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Link-argument file contents: space-separated, in link order.
    pub fn render_link_args(&self) -> String {
        self.link_args.join(" ")
    }
}

/// `$build_home/<rel>`.
pub fn in_build_home(rel: &str) -> String {
    format!("{BUILD_HOME_VAR}/{rel}")
}
