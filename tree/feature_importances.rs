use crate::{BranchNode, BranchSplit, Node, Tree};

/// This function computes feature importances using the "split" method, where a feature's importance is proportional to the number of nodes that use it to split. If no tree has a branch, every importance is zero.
pub fn compute_feature_importances(trees: &[Tree], n_features: usize) -> Vec<f32> {
	let mut feature_importances = vec![0.0; n_features];
	for tree in trees.iter() {
		tree.nodes.iter().for_each(|node| match node {
			Node::Branch(BranchNode {
				split: BranchSplit { feature_index, .. },
				..
			}) => {
				feature_importances[*feature_index] += 1.0;
			}
			Node::Leaf(_) => {}
		});
	}
	// Normalize the feature_importances.
	let total: f32 = feature_importances.iter().sum();
	if total > 0.0 {
		for feature_importance in feature_importances.iter_mut() {
			*feature_importance /= total;
		}
	}
	feature_importances
}

#[test]
fn test_feature_importances() {
	use crate::{LeafNode, SplitDirection};
	let leaf = |value| {
		Node::Leaf(LeafNode {
			value,
			examples_fraction: 0.5,
		})
	};
	let tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				split: BranchSplit {
					feature_index: 2,
					split_value: 0.5,
					invalid_values_direction: SplitDirection::Left,
				},
				examples_fraction: 1.0,
			}),
			leaf(1.0),
			leaf(2.0),
		],
	};
	let stump = Tree {
		nodes: vec![leaf(0.0)],
	};
	assert_eq!(
		compute_feature_importances(&[tree.clone(), tree], 3),
		vec![0.0, 0.0, 1.0]
	);
	assert_eq!(compute_feature_importances(&[stump], 2), vec![0.0, 0.0]);
}
