/*!
This crate implements regression models built from ensembles of decision trees: a [`RandomForestRegressor`](struct.RandomForestRegressor.html), which averages deep trees trained on bootstrap samples, and a [`GradientBoostingRegressor`](struct.GradientBoostingRegressor.html), which adds shallow trees fit to the residuals of the trees before them.

Both models share one tree learner. Number features are first binned into at most 255 bins, and each node is split by accumulating the gradients of its examples into per-bin histograms and choosing the threshold with the highest gain.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod binning;
mod feature_importances;
mod gradient_boosting;
mod random_forest;
mod split;
mod train_tree;

pub use self::binning::{compute_binned_features, BinnedFeatures, BinningInstruction};
pub use self::feature_importances::compute_feature_importances;
pub use self::gradient_boosting::{GradientBoostingRegressor, GradientBoostingTrainOptions};
pub use self::random_forest::{MaxFeatures, RandomForestRegressor, RandomForestTrainOptions};
pub use self::train_tree::{train_tree, TrainTreeOptions};

use autovalue_util::progress_counter::ProgressCounter;

/// This enum reports the training progress of a tree ensemble.
#[derive(Clone, Debug)]
pub enum TrainProgress {
	Initializing,
	Training(ProgressCounter),
}

/// Trees are stored as a `Vec` of `Node`s. Each branch in the tree has two indexes into the `Vec`, one for each of its children.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

impl Tree {
	/// Make a prediction for a given example.
	pub fn predict(&self, features: &[f32]) -> f32 {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					split:
						BranchSplit {
							feature_index,
							split_value,
							invalid_values_direction,
						},
					..
				}) => {
					let value = features[*feature_index];
					let direction = if value.is_nan() {
						*invalid_values_direction
					} else if value <= *split_value {
						SplitDirection::Left
					} else {
						SplitDirection::Right
					};
					node_index = match direction {
						SplitDirection::Left => *left_child_index,
						SplitDirection::Right => *right_child_index,
					};
				}
				// We made it to a leaf! The prediction is the leaf's value.
				Node::Leaf(LeafNode { value, .. }) => return *value,
			}
		}
	}

	pub fn n_leaves(&self) -> usize {
		self.nodes
			.iter()
			.filter(|node| matches!(node, Node::Leaf(_)))
			.count()
	}
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

/// A `BranchNode` is a branch in a tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BranchNode {
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
	/// When making predictions, an example will be sent either to the right or left child. The `split` contains the information necessary to determine which way it will go.
	pub split: BranchSplit,
	/// The fraction of the tree's training examples that passed through this node.
	pub examples_fraction: f32,
}

/// A split takes the value of a single number feature and compares it with `split_value`. If the value is <= `split_value`, the example is sent left, and if it is > `split_value`, it is sent right.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BranchSplit {
	/// This is the index of the feature to get the value for.
	pub feature_index: usize,
	/// This is the threshold value of the split.
	pub split_value: f32,
	/// This is the direction invalid values should be sent.
	pub invalid_values_direction: SplitDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitDirection {
	Left,
	Right,
}

/// The leaves in a tree hold the values to output for examples that get sent to them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LeafNode {
	/// This is the value to output.
	pub value: f32,
	/// The fraction of the tree's training examples that were sent to this leaf.
	pub examples_fraction: f32,
}

#[test]
fn test_tree_predict() {
	// x0 <= 1.5 ? 10 : (x1 <= 0.0 ? 20 : 30)
	let tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				split: BranchSplit {
					feature_index: 0,
					split_value: 1.5,
					invalid_values_direction: SplitDirection::Left,
				},
				examples_fraction: 1.0,
			}),
			Node::Leaf(LeafNode {
				value: 10.0,
				examples_fraction: 0.5,
			}),
			Node::Branch(BranchNode {
				left_child_index: 3,
				right_child_index: 4,
				split: BranchSplit {
					feature_index: 1,
					split_value: 0.0,
					invalid_values_direction: SplitDirection::Right,
				},
				examples_fraction: 0.5,
			}),
			Node::Leaf(LeafNode {
				value: 20.0,
				examples_fraction: 0.25,
			}),
			Node::Leaf(LeafNode {
				value: 30.0,
				examples_fraction: 0.25,
			}),
		],
	};
	assert_eq!(tree.predict(&[1.5, 5.0]), 10.0);
	assert_eq!(tree.predict(&[2.0, 0.0]), 20.0);
	assert_eq!(tree.predict(&[2.0, 1.0]), 30.0);
	assert_eq!(tree.predict(&[f32::NAN, 1.0]), 10.0);
	assert_eq!(tree.predict(&[2.0, f32::NAN]), 30.0);
	assert_eq!(tree.n_leaves(), 3);
}
