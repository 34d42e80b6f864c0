//! Lookup against a packed perfect-hash blob.

use super::{
    g_array_len, g_value, key_vertices, pad4, G_ARRAY_OFFSET, N_KEYS_OFFSET, N_VERTICES_OFFSET,
    RANK_BLOCK, SEED_OFFSET, UNASSIGNED,
};
use crate::file::io::read_ne;

/// Look `name` up in a packed perfect-hash blob.
///
/// Returns `None` only when the blob is structurally truncated. For any
/// well-formed blob the result is an in-range value - including for names
/// outside the key set, which land on an arbitrary slot (a raw rank past the
/// key count clamps to slot 0). The caller must re-compare the name stored at
/// the returned index before trusting it.
pub fn perfect_hash_search(blob: &[u8], name: &str) -> Option<u16> {
    let value_table_offset = read_ne::<u32>(blob, 0).ok()? as usize;
    let seed = read_ne::<u32>(blob, SEED_OFFSET).ok()?;
    let n_keys = read_ne::<u32>(blob, N_KEYS_OFFSET).ok()? as usize;
    let n_vertices = read_ne::<u32>(blob, N_VERTICES_OFFSET).ok()? as usize;

    if n_keys == 0 || n_vertices == 0 || n_vertices % 3 != 0 {
        return None;
    }

    let g_len = g_array_len(n_vertices);
    let g = blob.get(G_ARRAY_OFFSET..G_ARRAY_OFFSET + g_len)?;
    let rank_offset = pad4(G_ARRAY_OFFSET + g_len);
    if value_table_offset < rank_offset
        || blob.len() < value_table_offset + n_keys * 2
    {
        return None;
    }

    let [v0, v1, v2] = key_vertices(seed, name.as_bytes(), n_vertices / 3);
    let sum = usize::from(g_value(g, v0)) + usize::from(g_value(g, v1)) + usize::from(g_value(g, v2));
    let vertex = [v0, v1, v2][sum % 3];

    let mut rank = read_ne::<u32>(blob, rank_offset + (vertex / RANK_BLOCK) * 4).ok()? as usize;
    for v in (vertex / RANK_BLOCK) * RANK_BLOCK..vertex {
        if g_value(g, v) != UNASSIGNED {
            rank += 1;
        }
    }

    // Out-of-set names can rank past the table; clamp rather than reject,
    // the caller re-compares the name either way.
    if rank >= n_keys {
        rank = 0;
    }

    read_ne::<u16>(blob, value_table_offset + rank * 2).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::PerfectHashBuilder;

    fn build(names: &[&str]) -> Vec<u8> {
        let entries: Vec<(String, u16)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), (i + 1) as u16))
            .collect();
        PerfectHashBuilder::new(&entries).build()
    }

    #[test]
    fn out_of_set_stays_in_range() {
        let blob = build(&["one", "two", "three", "four", "five"]);
        for probe in ["six", "", "completely_unrelated_name", "On", "onee"] {
            let value = perfect_hash_search(&blob, probe).unwrap();
            assert!((1..=5).contains(&value), "probe {probe} -> {value}");
        }
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let blob = build(&["one", "two", "three"]);
        for len in 0..blob.len() {
            assert_eq!(
                perfect_hash_search(&blob[..len], "one"),
                None,
                "prefix of {len} bytes"
            );
        }
    }

    #[test]
    fn empty_blob() {
        assert_eq!(perfect_hash_search(&[], "anything"), None);
    }
}
