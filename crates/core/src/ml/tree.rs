use serde::{Deserialize, Serialize};

use crate::ml::{FeatureVector, FEATURE_COUNT};

/// Splits that reduce squared error by less than this are not taken.
const MIN_SPLIT_GAIN: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// Depth-limited least-squares regression tree over feature vectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    pub fn fit(rows: &[FeatureVector], targets: &[f64], params: &TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let indices: Vec<usize> = (0..rows.len().min(targets.len())).collect();
        tree.grow(rows, targets, indices, 0, params);
        tree
    }

    pub fn predict(&self, row: &FeatureVector) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split { feature, threshold, left, right }) => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    /// A single leaf carrying (numerically) no correction.
    pub fn is_trivial(&self) -> bool {
        matches!(self.nodes.as_slice(), [TreeNode::Leaf { value }] if value.abs() < 1e-12)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn grow(
        &mut self,
        rows: &[FeatureVector],
        targets: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let node_index = self.nodes.len();
        let value = if indices.is_empty() {
            0.0
        } else {
            indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
        };
        self.nodes.push(TreeNode::Leaf { value });

        let min_leaf = params.min_samples_leaf.max(1);
        if depth >= params.max_depth || indices.len() < 2 * min_leaf {
            return node_index;
        }

        let Some(split) = best_split(rows, targets, &indices, min_leaf) else {
            return node_index;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| rows[i][split.feature] <= split.threshold);
        let left = self.grow(rows, targets, left_indices, depth + 1, params);
        let right = self.grow(rows, targets, right_indices, depth + 1, params);
        self.nodes[node_index] =
            TreeNode::Split { feature: split.feature, threshold: split.threshold, left, right };
        node_index
    }
}

fn best_split(
    rows: &[FeatureVector],
    targets: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = indices.len();
    let total: f64 = indices.iter().map(|&i| targets[i]).sum();
    let baseline = total * total / n as f64;
    let mut best: Option<SplitCandidate> = None;

    for feature in 0..FEATURE_COUNT {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

        let mut left_sum = 0.0;
        for position in 0..(n - 1) {
            left_sum += targets[sorted[position]];
            let left_n = position + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let current = rows[sorted[position]][feature];
            let next = rows[sorted[position + 1]][feature];
            if current >= next {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
                - baseline;
            let improves = best.as_ref().map_or(true, |candidate| gain > candidate.gain);
            if gain > MIN_SPLIT_GAIN && improves {
                best = Some(SplitCandidate { feature, threshold: (current + next) / 2.0, gain });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::{RegressionTree, TreeParams};
    use crate::ml::{FeatureVector, FEATURE_COUNT};

    fn row(category: f64, price: f64) -> FeatureVector {
        let mut row = [0.0; FEATURE_COUNT];
        row[1] = category;
        row[5] = price;
        row
    }

    #[test]
    fn splits_on_the_informative_feature() {
        let rows: Vec<FeatureVector> =
            (0..20).map(|i| row(if i < 10 { 1.0 } else { 2.0 }, 50.0)).collect();
        let targets: Vec<f64> = (0..20).map(|i| if i < 10 { 4.0 } else { 10.0 }).collect();
        let params = TreeParams { max_depth: 2, min_samples_leaf: 2 };

        let tree = RegressionTree::fit(&rows, &targets, &params);
        assert!((tree.predict(&row(1.0, 50.0)) - 4.0).abs() < 1e-12);
        assert!((tree.predict(&row(2.0, 50.0)) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn constant_targets_produce_single_leaf() {
        let rows: Vec<FeatureVector> = (0..12).map(|i| row(1.0, i as f64)).collect();
        let targets = vec![0.0; 12];
        let params = TreeParams { max_depth: 3, min_samples_leaf: 1 };

        let tree = RegressionTree::fit(&rows, &targets, &params);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.is_trivial());
    }

    #[test]
    fn leaves_respect_minimum_size() {
        let rows: Vec<FeatureVector> = (0..6).map(|i| row(1.0, i as f64)).collect();
        let targets = vec![0.0, 0.0, 0.0, 0.0, 0.0, 100.0];
        let params = TreeParams { max_depth: 4, min_samples_leaf: 3 };

        let tree = RegressionTree::fit(&rows, &targets, &params);
        // the outlier cannot be isolated, it is averaged with two neighbours
        assert!((tree.predict(&row(1.0, 5.0)) - 100.0 / 3.0).abs() < 1e-9);
    }
}
