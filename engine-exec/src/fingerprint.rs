//! Stable fingerprint of an `Analyze` operation's relevant fields, used
//! as part of the analyze cache key (spec §4.F, GLOSSARY "Fingerprint").

use std::hash::{Hash, Hasher};

use engine_core::model::AnalyzePayload;
use rustc_hash::FxHasher;

pub fn analyze_fingerprint(payload: &AnalyzePayload) -> String {
    let mut hasher = FxHasher::default();
    payload.search.hash(&mut hasher);
    payload.patterns.hash(&mut hasher);
    payload.extract.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
