//! Maximum spanning arborescence decoding.
//!
//! Implementation of the Chu-Liu/Edmonds algorithm. Cycles are
//! contracted iteratively; every contraction is recorded on a stack
//! together with the mapping between the vertices before and after
//! contraction, so that the decoded arborescence can be expanded
//! level by level.

use std::f64::NEG_INFINITY;

use ndarray::{Array2, ArrayView2};

/// Decode the maximum spanning arborescence of a score matrix.
///
/// `scores[[dependent, head]]` is the score of attaching `dependent`
/// to `head`. Non-finite scores are treated as absent edges. Absent
/// edges are only used when there is no arborescence without them, so
/// that a tree is produced for any matrix.
///
/// Returns the head of every vertex, the head of `root` is `None`.
pub fn chu_liu_edmonds(scores: ArrayView2<f32>, root: usize) -> Vec<Option<usize>> {
    decode(complete_weights(scores, root), root)
}

/// Convert scores to edge weights.
///
/// Absent edges get a weight that is lower than any arborescence of
/// finite edges. Edges into `root` and self-loops are impossible and
/// get weight negative infinity.
pub(crate) fn complete_weights(scores: ArrayView2<f32>, root: usize) -> Array2<f64> {
    assert_eq!(
        scores.nrows(),
        scores.ncols(),
        "Score matrix should be square"
    );

    let n_vertices = scores.nrows();

    let (min, max) = scores
        .iter()
        .filter(|score| score.is_finite())
        .map(|&score| score as f64)
        .fold((f64::INFINITY, NEG_INFINITY), |(min, max), score| {
            (min.min(score), max.max(score))
        });
    let (min, max) = if min > max { (0., 0.) } else { (min, max) };
    let absent = min - (n_vertices as f64 + 1.) * (max - min + 1.);

    Array2::from_shape_fn((n_vertices, n_vertices), |(dependent, head)| {
        if dependent == head || dependent == root {
            NEG_INFINITY
        } else {
            let score = scores[[dependent, head]];
            if score.is_finite() {
                score as f64
            } else {
                absent
            }
        }
    })
}

/// Decode the maximum spanning arborescence of an edge weight matrix.
///
/// Edges with weight negative infinity are impossible. The caller must
/// ensure that an arborescence rooted in `root` exists.
pub(crate) fn decode(mut weights: Array2<f64>, mut root: usize) -> Vec<Option<usize>> {
    let mut contractions = Vec::new();

    let mut heads = loop {
        let heads = best_heads(weights.view(), root);
        match find_cycle(&heads) {
            Some(cycle) => {
                let (contracted, contraction) = Contraction::new(weights.view(), &heads, &cycle);
                // The root has no head, so it is never part of a cycle.
                root = contraction
                    .to_prev
                    .iter()
                    .take_while(|&&vertex| vertex < root)
                    .count();
                weights = contracted;
                contractions.push(contraction);
            }
            None => break heads,
        }
    };

    while let Some(contraction) = contractions.pop() {
        heads = contraction.expand(&heads);
    }

    heads
}

/// Pick the best incoming edge of every vertex.
///
/// Ties are resolved in favor of the lowest head index.
fn best_heads(weights: ArrayView2<f64>, root: usize) -> Vec<Option<usize>> {
    weights
        .outer_iter()
        .enumerate()
        .map(|(dependent, head_weights)| {
            if dependent == root {
                return None;
            }

            let mut best: Option<(usize, f64)> = None;
            for (head, &weight) in head_weights.iter().enumerate() {
                if weight == NEG_INFINITY {
                    continue;
                }
                if best.map(|(_, best_weight)| weight > best_weight).unwrap_or(true) {
                    best = Some((head, weight));
                }
            }

            best.map(|(head, _)| head)
        })
        .collect()
}

/// Find a cycle in a head assignment.
fn find_cycle(heads: &[Option<usize>]) -> Option<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;

    // Every vertex is stamped with the start vertex of the walk that
    // first visited it. Revisiting a vertex of the current walk means
    // that there is a cycle.
    let mut stamps = vec![UNVISITED; heads.len()];
    for start in 0..heads.len() {
        let mut vertex = start;
        while stamps[vertex] == UNVISITED {
            stamps[vertex] = start;
            match heads[vertex] {
                Some(head) => vertex = head,
                None => break,
            }
        }

        if stamps[vertex] != start || heads[vertex].is_none() {
            continue;
        }

        let mut cycle = vec![vertex];
        let mut next = heads[vertex];
        while let Some(head) = next {
            if head == vertex {
                break;
            }
            cycle.push(head);
            next = heads[head];
        }

        return Some(cycle);
    }

    None
}

/// A cycle contraction.
///
/// Vertices that are not in the cycle keep their relative order after
/// contraction. The cycle is replaced by a single vertex that follows
/// all other vertices.
struct Contraction {
    /// Vertex before contraction of each vertex outside the cycle.
    to_prev: Vec<usize>,

    /// Cycle vertices and their heads in the cycle.
    cycle_heads: Vec<(usize, usize)>,

    /// The cycle vertex that is entered when the cycle is attached to
    /// a head (indexed by contracted head).
    enter: Vec<usize>,

    /// The cycle vertex that heads a dependent when the dependent is
    /// attached to the cycle (indexed by contracted dependent).
    leave: Vec<usize>,

    n_prev: usize,
}

impl Contraction {
    fn new(
        weights: ArrayView2<f64>,
        heads: &[Option<usize>],
        cycle: &[usize],
    ) -> (Array2<f64>, Self) {
        let n_prev = weights.nrows();

        let mut in_cycle = vec![false; n_prev];
        let mut cycle_heads = Vec::with_capacity(cycle.len());
        for &vertex in cycle {
            in_cycle[vertex] = true;
            if let Some(head) = heads[vertex] {
                cycle_heads.push((vertex, head));
            }
        }

        let to_prev = (0..n_prev)
            .filter(|&vertex| !in_cycle[vertex])
            .collect::<Vec<_>>();
        let cycle_vertex = to_prev.len();

        let mut contracted = Array2::from_elem((cycle_vertex + 1, cycle_vertex + 1), NEG_INFINITY);
        let mut enter = vec![0; cycle_vertex];
        let mut leave = vec![0; cycle_vertex];

        for (dependent, &prev_dependent) in to_prev.iter().enumerate() {
            for (head, &prev_head) in to_prev.iter().enumerate() {
                contracted[[dependent, head]] = weights[[prev_dependent, prev_head]];
            }

            let (best_head, weight) = best_of(
                cycle_heads
                    .iter()
                    .map(|&(vertex, _)| (vertex, weights[[prev_dependent, vertex]])),
            );
            contracted[[dependent, cycle_vertex]] = weight;
            leave[dependent] = best_head;
        }

        for (head, &prev_head) in to_prev.iter().enumerate() {
            // Attaching the cycle to a head replaces the incoming edge
            // of one cycle vertex.
            let (best_dependent, weight) =
                best_of(cycle_heads.iter().map(|&(vertex, cycle_head)| {
                    (
                        vertex,
                        weights[[vertex, prev_head]] - weights[[vertex, cycle_head]],
                    )
                }));
            contracted[[cycle_vertex, head]] = weight;
            enter[head] = best_dependent;
        }

        (
            contracted,
            Contraction {
                to_prev,
                cycle_heads,
                enter,
                leave,
                n_prev,
            },
        )
    }

    /// Expand the heads of the contracted graph.
    fn expand(&self, contracted_heads: &[Option<usize>]) -> Vec<Option<usize>> {
        let cycle_vertex = self.to_prev.len();

        let mut heads = vec![None; self.n_prev];
        for (dependent, &prev_dependent) in self.to_prev.iter().enumerate() {
            heads[prev_dependent] = contracted_heads[dependent].map(|head| {
                if head == cycle_vertex {
                    self.leave[dependent]
                } else {
                    self.to_prev[head]
                }
            });
        }

        for &(vertex, head) in &self.cycle_heads {
            heads[vertex] = Some(head);
        }

        if let Some(head) = contracted_heads[cycle_vertex] {
            heads[self.enter[head]] = Some(self.to_prev[head]);
        }

        heads
    }
}

/// Get the first candidate with the highest weight.
fn best_of(candidates: impl Iterator<Item = (usize, f64)>) -> (usize, f64) {
    let mut best = (0, NEG_INFINITY);
    let mut first = true;
    for (vertex, weight) in candidates {
        if first || weight > best.1 {
            best = (vertex, weight);
            first = false;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr2, Array2};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xorshift::XorShiftRng;

    use super::chu_liu_edmonds;

    fn tree_weight(scores: &Array2<f32>, heads: &[Option<usize>]) -> f32 {
        heads
            .iter()
            .enumerate()
            .filter_map(|(dependent, head)| head.map(|head| scores[[dependent, head]]))
            .sum()
    }

    fn is_tree(heads: &[Option<usize>]) -> bool {
        (1..heads.len()).all(|start| {
            let mut vertex = start;
            for _ in 0..heads.len() {
                match heads[vertex] {
                    Some(head) => vertex = head,
                    None => return vertex == 0,
                }
            }
            false
        })
    }

    /// Find the best tree by enumerating all head assignments.
    fn brute_force(scores: &Array2<f32>) -> f32 {
        let n = scores.nrows();
        let mut best = std::f32::NEG_INFINITY;
        let mut assignment = vec![0; n - 1];
        loop {
            let heads = std::iter::once(None)
                .chain(assignment.iter().map(|&head| Some(head)))
                .collect::<Vec<_>>();
            let no_self_loops = heads
                .iter()
                .enumerate()
                .all(|(dependent, head)| *head != Some(dependent));
            if no_self_loops && is_tree(&heads) {
                best = best.max(tree_weight(scores, &heads));
            }

            // Advance to the next assignment.
            let mut idx = 0;
            loop {
                if idx == assignment.len() {
                    return best;
                }
                assignment[idx] += 1;
                if assignment[idx] < n {
                    break;
                }
                assignment[idx] = 0;
                idx += 1;
            }
        }
    }

    #[test]
    fn breaks_cycle_at_cheapest_edge() {
        // Tokens 1 and 2 prefer each other as heads.
        let scores = arr2(&[
            [0., 0., 0., 0.],
            [5., 0., 10., 0.],
            [1., 10., 0., 0.],
            [0., 3., 4., 0.],
        ]);
        let heads = chu_liu_edmonds(scores.view(), 0);
        assert_eq!(heads, vec![None, Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn nested_cycles() {
        let scores = arr2(&[
            [0., 0., 0., 0., 0.],
            [1., 0., 9., 2., 0.],
            [1., 2., 0., 9., 0.],
            [1., 9., 2., 0., 8.],
            [2., 0., 0., 9., 0.],
        ]);
        let heads = chu_liu_edmonds(scores.view(), 0);
        assert!(is_tree(&heads));
        assert_abs_diff_eq!(
            tree_weight(&scores, &heads),
            brute_force(&scores),
            epsilon = 1e-5
        );
    }

    #[test]
    fn finds_maximum_arborescence() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for n in 2..7 {
            for _ in 0..20 {
                let scores = Array2::random_using((n, n), Uniform::new(0f32, 1f32), &mut rng);
                let heads = chu_liu_edmonds(scores.view(), 0);
                assert_eq!(heads[0], None);
                assert!(is_tree(&heads));
                assert_abs_diff_eq!(
                    tree_weight(&scores, &heads),
                    brute_force(&scores),
                    epsilon = 1e-4
                );
            }
        }
    }

    #[test]
    fn missing_edges_still_give_a_tree() {
        let mut scores = Array2::from_elem((5, 5), std::f32::NAN);
        let heads = chu_liu_edmonds(scores.view(), 0);
        assert!(is_tree(&heads));

        // Only a chain is available.
        for dependent in 1..5 {
            scores[[dependent, dependent - 1]] = -1.;
        }
        let heads = chu_liu_edmonds(scores.view(), 0);
        assert_eq!(heads, vec![None, Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn single_vertex() {
        let scores = Array2::<f32>::zeros((1, 1));
        assert_eq!(chu_liu_edmonds(scores.view(), 0), vec![None]);
    }
}
