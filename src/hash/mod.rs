//! Minimal perfect hashing for the directory name index.
//!
//! The section table may carry a `DirectoryIndex` section: a BDZ minimal
//! perfect hash over the local directory names, mapping each name to its
//! directory index in O(1) with no collisions inside the key set. Out-of-set
//! queries still return *some* in-range slot - a perfect hash cannot detect
//! absence - so every caller must re-compare the name stored at the returned
//! index.
//!
//! # Packed blob layout
//!
//! ```text
//! u32  value_table_offset     offset of the value table from blob start
//! u32  seed                   hash seed the build converged on
//! u32  n_keys                 number of keys
//! u32  n_vertices             hypergraph vertex count, a multiple of 3
//! [u8] g-array                2 bits per vertex, 3 = unassigned
//!      (pad to 4)
//! [u32] rank table            assigned-vertex count per 128-vertex block
//!      (pad to 4)
//! [u16] value table           n_keys values in hash order
//! ```
//!
//! Everything is native byte order, like the rest of the format.

mod builder;
mod search;

pub use builder::PerfectHashBuilder;
pub use search::perfect_hash_search;

/// Byte offset of the seed field.
const SEED_OFFSET: usize = 4;
/// Byte offset of the key count.
const N_KEYS_OFFSET: usize = 8;
/// Byte offset of the vertex count.
const N_VERTICES_OFFSET: usize = 12;
/// Byte offset of the g-array.
const G_ARRAY_OFFSET: usize = 16;
/// Vertices covered by one rank-table entry.
const RANK_BLOCK: usize = 128;
/// The 2-bit g value marking a vertex no key maps through.
const UNASSIGNED: u8 = 3;

/// Round `offset` up to the next 4-byte boundary.
fn pad4(offset: usize) -> usize {
    offset.div_ceil(4) * 4
}

/// Byte length of a 2-bit-per-vertex g-array.
fn g_array_len(n_vertices: usize) -> usize {
    n_vertices.div_ceil(4)
}

/// Extract the 2-bit g value of `vertex`.
fn g_value(g: &[u8], vertex: usize) -> u8 {
    (g[vertex / 4] >> ((vertex % 4) * 2)) & 0x3
}

/// Jenkins-style mix producing three words per key. All three hypergraph
/// vertices of a key come from one pass over the bytes.
fn hash_triple(seed: u32, key: &[u8]) -> [u32; 3] {
    const GOLDEN: u32 = 0x9e37_79b9;

    fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
        *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 13);
        *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 8);
        *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 13);
        *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 12);
        *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 16);
        *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 5);
        *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 3);
        *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 10);
        *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 15);
    }

    fn word(chunk: &[u8]) -> u32 {
        let mut bytes = [0u8; 4];
        bytes[..chunk.len()].copy_from_slice(chunk);
        u32::from_le_bytes(bytes)
    }

    let mut a = GOLDEN;
    let mut b = GOLDEN;
    let mut c = seed;

    let mut chunks = key.chunks_exact(12);
    for chunk in &mut chunks {
        a = a.wrapping_add(word(&chunk[0..4]));
        b = b.wrapping_add(word(&chunk[4..8]));
        c = c.wrapping_add(word(&chunk[8..12]));
        mix(&mut a, &mut b, &mut c);
    }

    let tail = chunks.remainder();
    c = c.wrapping_add(key.len() as u32);
    if !tail.is_empty() {
        a = a.wrapping_add(word(&tail[..tail.len().min(4)]));
    }
    if tail.len() > 4 {
        b = b.wrapping_add(word(&tail[4..tail.len().min(8)]));
    }
    if tail.len() > 8 {
        c = c.wrapping_add(word(&tail[8..]).wrapping_shl(8));
    }
    mix(&mut a, &mut b, &mut c);

    [a, b, c]
}

/// The three hypergraph vertices of a key, one per third of the vertex range.
fn key_vertices(seed: u32, key: &[u8], vertices_per_part: usize) -> [usize; 3] {
    let [a, b, c] = hash_triple(seed, key);
    let r = vertices_per_part as u32;
    [
        (a % r) as usize,
        vertices_per_part + (b % r) as usize,
        2 * vertices_per_part + (c % r) as usize,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_triple(42, b"get_name"), hash_triple(42, b"get_name"));
        assert_ne!(hash_triple(42, b"get_name"), hash_triple(43, b"get_name"));
        assert_ne!(hash_triple(42, b"get_name"), hash_triple(42, b"set_name"));
    }

    #[test]
    fn vertices_land_in_distinct_parts() {
        let [v0, v1, v2] = key_vertices(7, b"Color", 100);
        assert!(v0 < 100);
        assert!((100..200).contains(&v1));
        assert!((200..300).contains(&v2));
    }

    #[test]
    fn g_array_packing() {
        // vertex 0 -> 2, vertex 1 -> 3, vertex 5 -> 1
        let g = [0b0000_1110u8, 0b0000_0100];
        assert_eq!(g_value(&g, 0), 2);
        assert_eq!(g_value(&g, 1), 3);
        assert_eq!(g_value(&g, 5), 1);
        assert_eq!(g_value(&g, 7), 0);
        assert_eq!(g_array_len(9), 3);
    }
}
