#![allow(dead_code)]

use std::collections::HashMap;

use bcplan_core::contract::{ExtractionOutcome, MemberLister, MockBitcodeExtractor};
use bcplan_core::error::ListingError;

/// Member listings keyed by base directory. Directories not in the map have no
/// aggregate archive.
#[derive(Default)]
pub struct TreeLister {
    listings: HashMap<String, Vec<String>>,
}

impl TreeLister {
    pub fn with(mut self, base_dir: &str, members: &[&str]) -> Self {
        self.listings.insert(
            base_dir.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }
}

impl MemberLister for TreeLister {
    fn list_members(&self, base_dir: &str) -> Result<Vec<String>, ListingError> {
        self.listings
            .get(base_dir)
            .cloned()
            .ok_or_else(|| ListingError::Unavailable {
                archive: format!("{base_dir}built-in.o"),
            })
    }
}

/// Every archive yields an aggregate bitcode file and nothing else.
pub fn bitcode_everywhere() -> MockBitcodeExtractor {
    let mut extractor = MockBitcodeExtractor::new();
    extractor.expect_extract().returning(|archive: &str| {
        Ok(ExtractionOutcome {
            aggregate_bitcode: Some(format!("{archive}.a.bc")),
            assembly_objects: vec![],
        })
    });
    extractor
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
