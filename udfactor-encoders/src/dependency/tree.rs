use std::f64::NEG_INFINITY;
use std::fmt;

use ndarray::ArrayView2;
use ordered_float::OrderedFloat;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mst;

/// Invalid head assignment.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TreeError {
    /// The head is not a token of the sentence.
    HeadOutOfRange { token: usize, head: usize },

    /// The token is its own head.
    SelfLoop { token: usize },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TreeError::*;

        match self {
            HeadOutOfRange { token, head } => {
                write!(f, "Head {} of token {} is out of range", head, token)
            }
            SelfLoop { token } => write!(f, "Token {} is attached to itself", token),
        }
    }
}

/// A dependency tree.
///
/// Tokens are numbered from 1, the artificial root is 0. Every token
/// has exactly one head.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DependencyTree {
    heads: Vec<usize>,
}

impl DependencyTree {
    /// Construct a tree from the heads of tokens `1..=n`.
    ///
    /// Heads are checked to be in range. Cycles are not an error, use
    /// [`DependencyTree::is_well_formed`] to check for them.
    pub fn from_heads(heads: Vec<usize>) -> Result<Self, TreeError> {
        for (idx, &head) in heads.iter().enumerate() {
            let token = idx + 1;
            if head > heads.len() {
                return Err(TreeError::HeadOutOfRange { token, head });
            }
            if head == token {
                return Err(TreeError::SelfLoop { token });
            }
        }

        Ok(DependencyTree { heads })
    }

    /// The heads of tokens `1..=n`.
    pub fn heads(&self) -> &[usize] {
        &self.heads
    }

    /// The head of a token, `None` for the root or unknown tokens.
    pub fn head(&self, token: usize) -> Option<usize> {
        token
            .checked_sub(1)
            .and_then(|idx| self.heads.get(idx))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Tokens that are attached to the root.
    pub fn root_children(&self) -> Vec<usize> {
        self.heads
            .iter()
            .enumerate()
            .filter(|(_, &head)| head == 0)
            .map(|(idx, _)| idx + 1)
            .collect()
    }

    /// Check that the heads form a tree rooted in 0.
    pub fn is_well_formed(&self) -> bool {
        let mut graph = DiGraph::<(), ()>::with_capacity(self.heads.len() + 1, self.heads.len());
        let nodes = (0..=self.heads.len())
            .map(|_| graph.add_node(()))
            .collect::<Vec<_>>();

        for (idx, &head) in self.heads.iter().enumerate() {
            match nodes.get(head) {
                Some(&head_node) => {
                    graph.add_edge(head_node, nodes[idx + 1], ());
                }
                None => return false,
            }
        }

        // With one head per token, an acyclic graph is a tree.
        !is_cyclic_directed(&graph)
    }
}

/// Decoder of head score matrices.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TreeDecoder {
    single_root: bool,
}

impl TreeDecoder {
    /// Construct a decoder.
    ///
    /// With `single_root`, exactly one token is attached to the root.
    pub fn new(single_root: bool) -> Self {
        TreeDecoder { single_root }
    }

    pub fn single_root(&self) -> bool {
        self.single_root
    }

    /// Decode the best tree of a head score matrix.
    ///
    /// `scores[[dependent, head]]` is the score of attaching
    /// `dependent` to `head`, row and column 0 are the root. A tree is
    /// produced for any square matrix, including matrices without
    /// finite scores.
    pub fn decode(&self, scores: ArrayView2<f32>) -> DependencyTree {
        let n_vertices = scores.nrows();
        if n_vertices <= 1 {
            return DependencyTree { heads: Vec::new() };
        }

        let mut weights = mst::complete_weights(scores, 0);

        if self.single_root {
            let root_child = (1..n_vertices)
                .filter(|&token| scores[[token, 0]].is_finite())
                .rev()
                .max_by_key(|&token| OrderedFloat(scores[[token, 0]]))
                .unwrap_or(1);

            for token in 1..n_vertices {
                if token != root_child {
                    weights[[token, 0]] = NEG_INFINITY;
                }
            }
        }

        let heads = mst::decode(weights, 0)
            .into_iter()
            .skip(1)
            .map(|head| head.unwrap_or(0))
            .collect();

        DependencyTree { heads }
    }
}
