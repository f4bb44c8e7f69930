use crate::{
	binning::BinnedFeatures,
	split::{choose_best_split, FindSplitOutput},
	BranchNode, BranchSplit, LeafNode, Node, SplitDirection, Tree,
};
use num_traits::ToPrimitive;
use rand::Rng;
use std::{cmp::Ordering, collections::BinaryHeap, ops::Range};

/// These are the options for growing a single tree.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TrainTreeOptions {
	/// A node at this depth will always be a leaf. The root has depth 0.
	pub max_depth: usize,
	/// Stop splitting once the tree has this many leaves.
	pub max_leaf_nodes: usize,
	/// A node with fewer examples than this will not be split.
	pub min_examples_to_split: usize,
	/// A split is only valid if both of its children receive at least this many examples.
	pub min_examples_per_child: usize,
	/// This is added to the number of examples in the denominator of the leaf values and split gains.
	pub l2_regularization: f32,
	/// A split must have a gain strictly greater than this to be considered.
	pub min_gain_to_split: f32,
	/// If set, each node considers only a random subset of this many of the tree's features.
	pub max_features_per_split: Option<usize>,
}

impl Default for TrainTreeOptions {
	fn default() -> Self {
		Self {
			max_depth: 6,
			max_leaf_nodes: usize::MAX,
			min_examples_to_split: 2,
			min_examples_per_child: 1,
			l2_regularization: 0.0,
			min_gain_to_split: 0.0,
			max_features_per_split: None,
		}
	}
}

/// Nodes are split in best first order. The queue holds the nodes that have a valid split but have not yet been added to the tree.
#[derive(Debug)]
struct QueueItem {
	split: FindSplitOutput,
	parent: Option<(usize, SplitDirection)>,
	depth: usize,
	examples_index_range: Range<usize>,
	sum_gradients: f64,
}

impl PartialEq for QueueItem {
	fn eq(&self, other: &Self) -> bool {
		self.split.gain == other.split.gain
	}
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for QueueItem {
	fn cmp(&self, other: &Self) -> Ordering {
		self.split
			.gain
			.partial_cmp(&other.split.gain)
			.unwrap_or(Ordering::Equal)
	}
}

/**
Grow a single regression tree.

With a squared error loss, the gradient for each example is `prediction - label` and every hessian is 1. Each leaf outputs `-sum_gradients / (n_examples + l2_regularization)`, multiplied by `leaf_scale`. A random forest passes `-label` as the gradient, no regularization, and a scale of 1, so each leaf outputs the mean label of its examples. Gradient boosting passes the residuals and its learning rate.

`examples_index` holds the examples to train on and is reordered in place as nodes are split. It may contain the same example more than once.
*/
pub fn train_tree(
	binned_features: &BinnedFeatures,
	feature_indexes: &[usize],
	gradients: &[f32],
	examples_index: &mut [usize],
	leaf_scale: f32,
	options: &TrainTreeOptions,
	rng: &mut impl Rng,
) -> Tree {
	let n_examples_root = examples_index.len();
	let examples_fraction = |n_examples: usize| {
		n_examples.to_f32().unwrap() / n_examples_root.max(1).to_f32().unwrap()
	};
	let leaf_value = |sum_gradients: f64, n_examples: usize| {
		let denominator = n_examples.to_f64().unwrap() + options.l2_regularization.to_f64().unwrap();
		if denominator <= 0.0 {
			return 0.0;
		}
		(-sum_gradients / denominator).to_f32().unwrap() * leaf_scale
	};
	let can_split = |n_examples: usize, depth: usize| {
		options.max_leaf_nodes > 1
			&& depth < options.max_depth
			&& n_examples >= options.min_examples_to_split
			&& n_examples >= 2 * options.min_examples_per_child.max(1)
	};
	let sum_gradients_root: f64 = examples_index
		.iter()
		.map(|example_index| gradients[*example_index].to_f64().unwrap())
		.sum();
	let root_split = if can_split(n_examples_root, 0) {
		let features = sample_features(feature_indexes, options.max_features_per_split, rng);
		choose_best_split(
			binned_features,
			&features,
			gradients,
			examples_index,
			sum_gradients_root,
			options,
		)
	} else {
		None
	};
	let root_split = match root_split {
		Some(root_split) => root_split,
		None => {
			return Tree {
				nodes: vec![Node::Leaf(LeafNode {
					value: leaf_value(sum_gradients_root, n_examples_root),
					examples_fraction: 1.0,
				})],
			}
		}
	};
	let mut nodes: Vec<Node> = Vec::new();
	let mut n_branches = 0;
	let mut queue = BinaryHeap::new();
	queue.push(QueueItem {
		split: root_split,
		parent: None,
		depth: 0,
		examples_index_range: 0..n_examples_root,
		sum_gradients: sum_gradients_root,
	});
	while let Some(item) = queue.pop() {
		let n_examples = item.examples_index_range.len();
		// Splitting this node would bring the number of leaves over the limit, so it becomes a leaf.
		if n_branches + 2 > options.max_leaf_nodes {
			add_node(
				&mut nodes,
				item.parent,
				Node::Leaf(LeafNode {
					value: leaf_value(item.sum_gradients, n_examples),
					examples_fraction: examples_fraction(n_examples),
				}),
			);
			continue;
		}
		let split = item.split;
		let node_index = add_node(
			&mut nodes,
			item.parent,
			Node::Branch(BranchNode {
				// The child indexes are filled in when the children are added. Index 0 is always the root, so it is never a child.
				left_child_index: 0,
				right_child_index: 0,
				split: BranchSplit {
					feature_index: split.feature_index,
					split_value: split.split_value,
					invalid_values_direction: SplitDirection::Left,
				},
				examples_fraction: examples_fraction(n_examples),
			}),
		);
		n_branches += 1;
		let (left_range, right_range) = partition_examples_index(
			binned_features,
			&split,
			examples_index,
			item.examples_index_range.clone(),
		);
		let children = [
			(SplitDirection::Left, left_range, split.left_sum_gradients),
			(SplitDirection::Right, right_range, split.right_sum_gradients),
		];
		for (direction, range, sum_gradients) in children.iter().cloned() {
			let depth = item.depth + 1;
			let n_examples = range.len();
			let child_split = if can_split(n_examples, depth) {
				let features = sample_features(feature_indexes, options.max_features_per_split, rng);
				choose_best_split(
					binned_features,
					&features,
					gradients,
					&examples_index[range.clone()],
					sum_gradients,
					options,
				)
			} else {
				None
			};
			match child_split {
				Some(child_split) => queue.push(QueueItem {
					split: child_split,
					parent: Some((node_index, direction)),
					depth,
					examples_index_range: range,
					sum_gradients,
				}),
				None => {
					add_node(
						&mut nodes,
						Some((node_index, direction)),
						Node::Leaf(LeafNode {
							value: leaf_value(sum_gradients, n_examples),
							examples_fraction: examples_fraction(n_examples),
						}),
					);
				}
			}
		}
	}
	Tree { nodes }
}

/// Push a node and point its parent at it.
fn add_node(nodes: &mut Vec<Node>, parent: Option<(usize, SplitDirection)>, node: Node) -> usize {
	let node_index = nodes.len();
	nodes.push(node);
	if let Some((parent_index, direction)) = parent {
		if let Node::Branch(parent) = &mut nodes[parent_index] {
			match direction {
				SplitDirection::Left => parent.left_child_index = node_index,
				SplitDirection::Right => parent.right_child_index = node_index,
			}
		}
	}
	node_index
}

/// Reorder `examples_index[range]` so the examples sent left come first, and return the ranges for the two children.
fn partition_examples_index(
	binned_features: &BinnedFeatures,
	split: &FindSplitOutput,
	examples_index: &mut [usize],
	range: Range<usize>,
) -> (Range<usize>, Range<usize>) {
	let column = &binned_features.columns[split.feature_index];
	let examples_index = &mut examples_index[range.clone()];
	let (left, right): (Vec<usize>, Vec<usize>) = examples_index
		.iter()
		.partition(|example_index| column[**example_index] <= split.bin_index);
	let n_left = left.len();
	examples_index[..n_left].copy_from_slice(&left);
	examples_index[n_left..].copy_from_slice(&right);
	let middle = range.start + n_left;
	(range.start..middle, middle..range.end)
}

fn sample_features(
	feature_indexes: &[usize],
	max_features: Option<usize>,
	rng: &mut impl Rng,
) -> Vec<usize> {
	match max_features {
		Some(max_features) if max_features < feature_indexes.len() => {
			let mut features: Vec<usize> =
				rand::seq::index::sample(rng, feature_indexes.len(), max_features.max(1))
					.into_iter()
					.map(|i| feature_indexes[i])
					.collect();
			features.sort_unstable();
			features
		}
		_ => feature_indexes.to_owned(),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::compute_binned_features;
	use ndarray::prelude::*;
	use rand::SeedableRng;
	use rand_xoshiro::Xoshiro256Plus;

	fn fit(features: Array2<f32>, labels: &[f32], options: &TrainTreeOptions) -> Tree {
		let binned_features = compute_binned_features(features.view(), 255, 100_000);
		let gradients: Vec<f32> = labels.iter().map(|label| -label).collect();
		let mut examples_index: Vec<usize> = (0..labels.len()).collect();
		let feature_indexes: Vec<usize> = (0..features.ncols()).collect();
		let mut rng = Xoshiro256Plus::seed_from_u64(0);
		train_tree(
			&binned_features,
			&feature_indexes,
			&gradients,
			&mut examples_index,
			1.0,
			options,
			&mut rng,
		)
	}

	#[test]
	fn test_step_function() {
		let features = arr2(&[[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]]);
		let labels = [10.0, 10.0, 10.0, 20.0, 20.0, 20.0];
		let tree = fit(features, &labels, &TrainTreeOptions::default());
		assert_eq!(tree.n_leaves(), 2);
		assert_eq!(tree.predict(&[2.5]), 10.0);
		assert_eq!(tree.predict(&[3.6]), 20.0);
		// Values equal to the split value go left.
		assert_eq!(tree.predict(&[3.5]), 10.0);
		assert_eq!(tree.predict(&[f32::NAN]), 10.0);
	}

	#[test]
	fn test_max_leaf_nodes() {
		let features = arr2(&[[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]]);
		let labels = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0];
		let options = TrainTreeOptions {
			max_depth: 10,
			max_leaf_nodes: 3,
			..Default::default()
		};
		let tree = fit(features, &labels, &options);
		assert_eq!(tree.n_leaves(), 3);
	}

	#[test]
	fn test_min_examples_per_child() {
		let features = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
		let labels = [0.0, 0.0, 0.0, 100.0];
		let options = TrainTreeOptions {
			min_examples_per_child: 2,
			..Default::default()
		};
		let tree = fit(features, &labels, &options);
		// The best split isolates the last example, but that child would be too small.
		assert_eq!(tree.n_leaves(), 2);
		assert_eq!(tree.predict(&[4.0]), 50.0);
		assert_eq!(tree.predict(&[1.0]), 0.0);
	}

	#[test]
	fn test_constant_labels_make_a_single_leaf() {
		let features = arr2(&[[1.0], [2.0], [3.0]]);
		let labels = [7.0, 7.0, 7.0];
		let tree = fit(features, &labels, &TrainTreeOptions::default());
		assert_eq!(tree.nodes.len(), 1);
		assert_eq!(tree.predict(&[100.0]), 7.0);
	}
}
