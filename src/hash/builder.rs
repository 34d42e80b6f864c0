//! BDZ construction: peel a random 3-hypergraph, assign 2-bit g values,
//! attach a rank directory for minimality.

use super::{g_array_len, key_vertices, pad4, G_ARRAY_OFFSET, RANK_BLOCK, UNASSIGNED};

/// Builds the packed perfect-hash blob for a set of (name, value) pairs.
///
/// Construction retries deterministic seeds until the induced 3-hypergraph is
/// acyclic, so the output depends only on the key set. Duplicate names are
/// dropped (first occurrence wins) - a duplicated key can never form an
/// acyclic graph. An empty key set still packs a well-formed blob; its search
/// side answers `None` for every probe (the header records zero keys, which
/// [`super::perfect_hash_search`] rejects up front).
pub struct PerfectHashBuilder {
    entries: Vec<(String, u16)>,
}

/// One hyperedge per key plus the peeling bookkeeping.
struct Hypergraph {
    /// Vertex triple per key
    edges: Vec<[usize; 3]>,
    /// Incident edge ids per vertex
    incidence: Vec<Vec<usize>>,
    /// Remaining degree per vertex
    degree: Vec<usize>,
}

impl Hypergraph {
    fn build(seed: u32, keys: &[&str], vertices_per_part: usize) -> Hypergraph {
        let n_vertices = 3 * vertices_per_part;
        let mut graph = Hypergraph {
            edges: Vec::with_capacity(keys.len()),
            incidence: vec![Vec::new(); n_vertices],
            degree: vec![0; n_vertices],
        };

        for (edge_id, key) in keys.iter().enumerate() {
            let vertices = key_vertices(seed, key.as_bytes(), vertices_per_part);
            for &v in &vertices {
                graph.incidence[v].push(edge_id);
                graph.degree[v] += 1;
            }
            graph.edges.push(vertices);
        }

        graph
    }

    /// Peel degree-1 vertices until no edge remains. Returns the removal
    /// order as (edge, free-vertex slot) pairs, or `None` if a 2-core is left.
    fn peel(&mut self) -> Option<Vec<(usize, usize)>> {
        let n_edges = self.edges.len();
        let mut removed = vec![false; n_edges];
        let mut order = Vec::with_capacity(n_edges);
        let mut queue: Vec<usize> = (0..self.degree.len())
            .filter(|&v| self.degree[v] == 1)
            .collect();

        while let Some(v) = queue.pop() {
            if self.degree[v] != 1 {
                continue;
            }
            let Some(&edge_id) = self.incidence[v].iter().find(|&&e| !removed[e]) else {
                continue;
            };

            let vertices = self.edges[edge_id];
            let slot = vertices.iter().position(|&u| u == v).unwrap_or(0);
            order.push((edge_id, slot));
            removed[edge_id] = true;

            for &u in &vertices {
                self.degree[u] -= 1;
                if self.degree[u] == 1 {
                    queue.push(u);
                }
            }
        }

        (order.len() == n_edges).then_some(order)
    }
}

impl PerfectHashBuilder {
    /// Create a builder over (name, value) pairs. Values are what the search
    /// returns, typically 1-based directory indices.
    pub fn new(entries: &[(String, u16)]) -> PerfectHashBuilder {
        let mut seen = std::collections::HashSet::new();
        let entries = entries
            .iter()
            .filter(|(name, _)| seen.insert(name.clone()))
            .cloned()
            .collect();
        PerfectHashBuilder { entries }
    }

    /// Pack the blob. Deterministic for a given key set.
    pub fn build(self) -> Vec<u8> {
        let n_keys = self.entries.len();
        let keys: Vec<&str> = self.entries.iter().map(|(name, _)| name.as_str()).collect();

        // c = 1.23 gives the acyclicity threshold for 3-hypergraphs; the +1
        // keeps tiny key sets away from the edge of it.
        let vertices_per_part = (n_keys * 123).div_ceil(300) + 1;
        let n_vertices = 3 * vertices_per_part;

        let (seed, order, edges) = Self::find_acyclic_seed(&keys, vertices_per_part);
        let g = Self::assign(&order, &edges, n_vertices);
        let ranks = Self::rank_table(&g, n_vertices);

        // Hash-order the values: slot of a key = rank of its chosen vertex.
        let mut values = vec![0u16; n_keys];
        for (i, &(_, value)) in self.entries.iter().enumerate() {
            let [v0, v1, v2] = edges[i];
            let sum = usize::from(super::g_value(&g, v0))
                + usize::from(super::g_value(&g, v1))
                + usize::from(super::g_value(&g, v2));
            let vertex = edges[i][sum % 3];
            values[Self::rank(&g, &ranks, vertex)] = value;
        }

        Self::pack(seed, n_keys, n_vertices, &g, &ranks, &values)
    }

    /// Walk a deterministic seed sequence until the hypergraph peels fully.
    fn find_acyclic_seed(
        keys: &[&str],
        vertices_per_part: usize,
    ) -> (u32, Vec<(usize, usize)>, Vec<[usize; 3]>) {
        let mut seed = 0x1505_7301u32;
        loop {
            let mut graph = Hypergraph::build(seed, keys, vertices_per_part);
            if let Some(order) = graph.peel() {
                return (seed, order, graph.edges);
            }
            seed = seed.wrapping_mul(0x0019_660d).wrapping_add(0x3c6e_f35f);
        }
    }

    /// Assign g values in reverse peel order so every edge sums to its free
    /// vertex's slot mod 3.
    fn assign(order: &[(usize, usize)], edges: &[[usize; 3]], n_vertices: usize) -> Vec<u8> {
        let mut g = vec![0u8; g_array_len(n_vertices)];
        for byte in &mut g {
            *byte = 0b1111_1111; // all vertices start unassigned
        }
        let mut visited = vec![false; n_vertices];

        let set = |g: &mut Vec<u8>, vertex: usize, value: u8| {
            let shift = (vertex % 4) * 2;
            g[vertex / 4] = (g[vertex / 4] & !(0x3 << shift)) | (value << shift);
        };

        for &(edge_id, slot) in order.iter().rev() {
            let vertices = edges[edge_id];
            let free = vertices[slot];
            debug_assert!(!visited[free]);

            let mut sum = 0usize;
            for (i, &v) in vertices.iter().enumerate() {
                if i != slot {
                    visited[v] = true;
                    sum += usize::from(super::g_value(&g, v));
                }
            }
            set(&mut g, free, ((slot + 3 - sum % 3) % 3) as u8);
            visited[free] = true;
        }

        g
    }

    /// Assigned-vertex count before each 128-vertex block.
    fn rank_table(g: &[u8], n_vertices: usize) -> Vec<u32> {
        let mut ranks = Vec::with_capacity(n_vertices.div_ceil(RANK_BLOCK));
        let mut total = 0u32;
        for block_start in (0..n_vertices).step_by(RANK_BLOCK) {
            ranks.push(total);
            let block_end = (block_start + RANK_BLOCK).min(n_vertices);
            for v in block_start..block_end {
                if super::g_value(g, v) != UNASSIGNED {
                    total += 1;
                }
            }
        }
        ranks
    }

    /// Rank of `vertex` among assigned vertices.
    fn rank(g: &[u8], ranks: &[u32], vertex: usize) -> usize {
        let mut rank = ranks[vertex / RANK_BLOCK] as usize;
        for v in (vertex / RANK_BLOCK) * RANK_BLOCK..vertex {
            if super::g_value(g, v) != UNASSIGNED {
                rank += 1;
            }
        }
        rank
    }

    fn pack(
        seed: u32,
        n_keys: usize,
        n_vertices: usize,
        g: &[u8],
        ranks: &[u32],
        values: &[u16],
    ) -> Vec<u8> {
        let rank_offset = pad4(G_ARRAY_OFFSET + g.len());
        let value_offset = pad4(rank_offset + ranks.len() * 4);

        let mut blob = Vec::with_capacity(value_offset + values.len() * 2);
        blob.extend_from_slice(&(value_offset as u32).to_ne_bytes());
        blob.extend_from_slice(&seed.to_ne_bytes());
        blob.extend_from_slice(&(n_keys as u32).to_ne_bytes());
        blob.extend_from_slice(&(n_vertices as u32).to_ne_bytes());
        blob.extend_from_slice(g);
        blob.resize(rank_offset, 0);
        for &rank in ranks {
            blob.extend_from_slice(&rank.to_ne_bytes());
        }
        blob.resize(value_offset, 0);
        for &value in values {
            blob.extend_from_slice(&value.to_ne_bytes());
        }
        blob
    }
}
