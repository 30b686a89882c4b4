#![doc = "bcplan-core: planning logic for rebuilding a kernel from embedded bitcode."]

//! This crate holds everything needed to turn a tree of `built-in.o` thin archives
//! into an ordered rebuild plan: a shell script that extracts, copies and recompiles
//! bitcode, and a link-argument list whose order mirrors the archives' own ordering.
//! No external tool is run from here; listing and extraction come in through the
//! [`contract`] traits so the walk can be driven by real tools or by test data.
//!
//! # Usage
//! Build a [`config::PlanConfig`], implement or mock the [`contract`] traits and call
//! [`synthesise::synthesise`].

pub mod assembly;
pub mod classify;
pub mod config;
pub mod contract;
pub mod error;
pub mod exclusion;
pub mod plan;
pub mod segment;
pub mod synthesise;
pub mod trailer;
pub mod walk;
