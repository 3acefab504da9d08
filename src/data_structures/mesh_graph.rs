//! Vertex adjacency of a polygon mesh.
//!
//! Every face polygon contributes its boundary edges, including the closing
//! edge from the last vertex back to the first. Used to trace shortest vertex
//! paths across a loaded model.

use std::collections::{BTreeSet, VecDeque};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexGraph {
    adjacency: Vec<BTreeSet<usize>>,
}

impl VertexGraph {
    /// Builds the graph over `vertex_count` vertices from 0-based face
    /// polygons. Edges touching a vertex outside the range are skipped.
    pub fn from_faces<'a>(
        vertex_count: usize,
        faces: impl IntoIterator<Item = &'a [usize]>,
    ) -> Self {
        let mut adjacency = vec![BTreeSet::new(); vertex_count];
        for face in faces {
            if face.len() < 2 {
                continue;
            }
            for (i, &a) in face.iter().enumerate() {
                let b = face[(i + 1) % face.len()];
                if a >= vertex_count || b >= vertex_count {
                    log::warn!(
                        "skipping edge {a}-{b}: the graph only has {vertex_count} vertices"
                    );
                    continue;
                }
                if a != b {
                    adjacency[a].insert(b);
                    adjacency[b].insert(a);
                }
            }
        }
        Self { adjacency }
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn neighbors(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency
            .get(vertex)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Fewest-edges path from `from` to `to`, both ends included.
    ///
    /// Empty when either vertex is unknown or the two are not connected.
    pub fn shortest_path(&self, from: usize, to: usize) -> Vec<usize> {
        if from >= self.vertex_count() || to >= self.vertex_count() {
            log::warn!("path endpoints {from} and {to} must both be graph vertices");
            return Vec::new();
        }
        let mut previous: Vec<Option<usize>> = vec![None; self.vertex_count()];
        let mut visited = vec![false; self.vertex_count()];
        let mut queue = VecDeque::from([from]);
        visited[from] = true;

        while let Some(vertex) = queue.pop_front() {
            if vertex == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(p) = previous[cursor] {
                    path.push(p);
                    cursor = p;
                }
                path.reverse();
                return path;
            }
            for next in self.neighbors(vertex) {
                if !visited[next] {
                    visited[next] = true;
                    previous[next] = Some(vertex);
                    queue.push_back(next);
                }
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_tail() -> VertexGraph {
        // 0-1-2-3 quad, 3-4 via a degenerate face, 5 isolated
        let quad = [0, 1, 2, 3];
        let tail = [3, 4];
        VertexGraph::from_faces(6, [&quad[..], &tail[..]])
    }

    #[test]
    fn closing_edge_is_included() {
        let graph = square_with_tail();
        assert!(graph.neighbors(0).any(|v| v == 3));
        assert_eq!(graph.edge_count(), 5);
    }

    #[test]
    fn bfs_finds_fewest_edges() {
        let graph = square_with_tail();
        assert_eq!(graph.shortest_path(0, 4), vec![0, 3, 4]);
        assert_eq!(graph.shortest_path(1, 1), vec![1]);
    }

    #[test]
    fn disconnected_or_unknown_vertices_give_empty_path() {
        let graph = square_with_tail();
        assert!(graph.shortest_path(0, 5).is_empty());
        assert!(graph.shortest_path(0, 42).is_empty());
    }
}
