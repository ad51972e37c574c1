use std::hash::{Hash, Hasher};

pub fn stable_u32(s: &str) -> u32 {
    let mut h = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut h);
    (h.finish() & 0xFFFF_FFFF) as u32
}

/// Id for the edge between two processes; order matters.
pub fn edge_id(parent: &str, child: &str) -> u32 {
    // NUL cannot appear in entity ids, so ("ab","c") and ("a","bc") differ
    stable_u32(&format!("{parent}\u{0}{child}"))
}
