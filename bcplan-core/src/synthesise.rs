//! High-level entrypoint: header → archive walk → trailer.
//!
//! [`synthesise`] is the only function callers need. It takes the explicit
//! configuration, the build home and the excluded paths, plus the two capabilities
//! from [`crate::contract`], and returns the finished plan with a report of what
//! happened along the way.
//!
//! # Error Handling
//! Fail-fast: the first fatal error (a listing tool failing, an extraction tool
//! failing) aborts the run and no plan is returned. Callers must not write anything
//! in that case. Exclusion paths that never match a node are not errors; they are
//! logged and listed in [`PlanReport::unmatched_exclusions`].

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::PlanConfig;
use crate::contract::{BitcodeExtractor, MemberLister};
use crate::error::PlanError;
use crate::exclusion::ExclusionSet;
use crate::plan::BuildPlan;
use crate::trailer::emit_trailer;
use crate::walk::{PlanBuilder, WalkStats};

/// What to plan: where the rebuilt kernel goes and what stays native.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub build_home: String,
    /// Subtrees to link from their converted thin archives, e.g. `drivers/net/ethernet`.
    pub excluded: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub build_home: String,
    pub plan: BuildPlan,
    pub stats: WalkStats,
    pub unmatched_exclusions: Vec<String>,
}

pub fn synthesise<L, E>(
    config: &PlanConfig,
    request: &PlanRequest,
    lister: &L,
    extractor: &E,
) -> Result<PlanReport, PlanError>
where
    L: MemberLister + ?Sized,
    E: BitcodeExtractor + ?Sized,
{
    let build_home = normalise_build_home(&request.build_home);
    info!(
        build_home = %build_home,
        excluded = request.excluded.len(),
        "[PLAN] Starting build plan synthesis"
    );

    let excluded = ExclusionSet::parse(&request.excluded, &config.layout);

    let mut builder = PlanBuilder::new(config, lister, extractor);
    if let Err(e) = builder.walk(&excluded) {
        error!(error = %e, "[PLAN][ERROR] Archive walk failed");
        return Err(e);
    }
    let (walked, stats, matched) = builder.into_parts();

    let mut plan = BuildPlan::new();
    plan.command("# Script written by bcplan");
    plan.command(format!("export build_home={build_home}"));
    plan.append(walked);

    if let Err(e) = emit_trailer(&mut plan, config, extractor) {
        error!(error = %e, "[PLAN][ERROR] Trailer emission failed");
        return Err(e.into());
    }

    let unmatched_exclusions: Vec<String> = excluded
        .paths()
        .iter()
        .filter(|p| !matched.contains(&p.id))
        .map(|p| {
            let raw = request.excluded[p.id].clone();
            warn!(exclusion = %raw, folded = %p, "[PLAN] Exclusion path never matched a node");
            raw
        })
        .collect();

    info!(
        commands = plan.script().len(),
        link_args = plan.link_args().len(),
        unmatched = unmatched_exclusions.len(),
        "[PLAN] Build plan complete"
    );

    Ok(PlanReport {
        build_home,
        plan,
        stats,
        unmatched_exclusions,
    })
}

/// Build home as exported by the script: always with a trailing `/`.
pub fn normalise_build_home(raw: &str) -> String {
    if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    }
}
