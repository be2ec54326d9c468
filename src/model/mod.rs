//! Classifier implementations

mod decision_tree;
mod random_forest;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
