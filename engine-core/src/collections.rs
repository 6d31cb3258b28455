//! Fast hash-map/set aliases used throughout the engine.
//!
//! `rustc-hash`'s `FxHash` trades DoS-resistance for speed; fine here
//! because keys are paths and operation ids the engine itself controls,
//! never untrusted network input.

use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

use rustc_hash::FxHasher;

pub type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
pub type FxHashSet<T> = HashSet<T, BuildHasherDefault<FxHasher>>;
