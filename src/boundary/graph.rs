use crate::boundary::segment::ColoredEdge;

/// One bit per cluster or per boundary edge.
pub(crate) type Booleans = u32;

/// An undirected edge of the dual graph: the clusters on either side and the boundary edges
/// that separate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DualEdge {
    pub(crate) left: Booleans,
    pub(crate) right: Booleans,
    pub(crate) edge: Booleans,
}

impl DualEdge {
    /// The sides are stored with `left < right` so two edges between the same node sets compare
    /// equal whatever direction they were built in.
    pub(crate) fn new(left: Booleans, right: Booleans, edge: Booleans) -> Self {
        if left < right {
            DualEdge { left, right, edge }
        } else {
            DualEdge { left: right, right: left, edge }
        }
    }

    pub(crate) fn same_as(&self, other: &DualEdge) -> bool {
        self.left == other.left && self.right == other.right
    }
}

/// The dual of a cluster map: each cluster becomes a node and each run of boundary between two
/// clusters becomes an edge. Merging the two nodes of an edge gives a simpler graph; repeating
/// until one edge is left yields a two way split of the clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DualGraph {
    pub(crate) nodes: Vec<Booleans>,
    pub(crate) duals: Vec<DualEdge>,
    pub(crate) removed: Booleans,
}

fn merge_into(duals: &mut Vec<DualEdge>, dual: DualEdge) {
    match duals.iter_mut().find(|d| d.same_as(&dual)) {
        Some(existing) => existing.edge |= dual.edge,
        None => duals.push(dual),
    }
}

impl DualGraph {
    /// Builds the dual graph of `edges`, all of which must separate two real clusters
    /// (colors `1..colorful`). Bit `k` of an edge mask stands for `edges[k]`.
    pub(crate) fn from_edges(colorful: usize, edges: &[ColoredEdge<i16>]) -> Self {
        let nodes = (1..colorful).map(|c| 1 << (c - 1)).collect();
        let mut duals = Vec::with_capacity(edges.len());
        for (k, edge) in edges.iter().enumerate() {
            debug_assert!(edge.clockwise > 0 && edge.widdershins > 0);
            let dual = DualEdge::new(
                1 << (edge.widdershins - 1),
                1 << (edge.clockwise - 1),
                1 << k,
            );
            merge_into(&mut duals, dual);
        }
        DualGraph { nodes, duals, removed: 0 }
    }

    pub(crate) fn is_simple(&self) -> bool {
        self.duals.len() == 1
    }

    pub(crate) fn left(&self) -> Booleans {
        self.duals[0].left
    }

    #[cfg(test)]
    pub(crate) fn right(&self) -> Booleans {
        self.duals[0].right
    }

    pub(crate) fn edge(&self) -> Booleans {
        self.duals[0].edge
    }

    /// Every graph reachable by merging the two ends of one dual edge. Edges whose mask is
    /// below the removal history are skipped since a sibling branch already merged them in
    /// another order. That prunes most but not necessarily all duplicate paths.
    pub(crate) fn simplify(&self) -> Vec<DualGraph> {
        let mut graphs = Vec::with_capacity(self.duals.len());
        for (i, remove) in self.duals.iter().enumerate() {
            if remove.edge < self.removed {
                continue;
            }
            let merged = remove.left | remove.right;
            let mut nodes: Vec<Booleans> = self
                .nodes
                .iter()
                .copied()
                .filter(|&node| node & merged == 0)
                .collect();
            nodes.push(merged);

            let mut duals = Vec::with_capacity(self.duals.len() - 1);
            for (j, dual) in self.duals.iter().enumerate() {
                if i == j {
                    continue;
                }
                // node sets are disjoint so touching the merged set means equal to one side
                if dual.left & merged != 0 {
                    if dual.right & merged == 0 {
                        merge_into(&mut duals, DualEdge::new(dual.right, merged, dual.edge));
                    }
                } else if dual.right & merged != 0 {
                    merge_into(&mut duals, DualEdge::new(dual.left, merged, dual.edge));
                } else {
                    duals.push(*dual);
                }
            }
            graphs.push(DualGraph { nodes, duals, removed: self.removed | remove.edge });
        }
        graphs
    }
}
