//! Model training module
//!
//! Provides the regressors and search procedures the modelling strategies
//! drive:
//! - Linear models (OLS, single-feature polynomial, Lasso) and LassoCV
//! - Decision trees and Random Forests
//! - K-fold cross-validation and grid search
//! - Importance-based feature selection
//! - Clustering (DBSCAN)

mod models;
pub mod clustering;
pub mod cross_validation;
pub mod decision_tree;
pub mod feature_selection;
pub mod grid_search;
pub mod lasso_cv;
pub mod linear_models;
pub mod random_forest;

pub use clustering::{DBSCAN, NOISE_LABEL};
pub use cross_validation::{CVResults, CVSplit, CrossValidator};
pub use decision_tree::{DecisionTree, TreeNode};
pub use feature_selection::{select_by_importance, SelectThenFit};
pub use grid_search::{expand_grid, grid_search, GridSearchResult, TreeParams};
pub use lasso_cv::LassoCV;
pub use linear_models::{r2_score, LassoRegression, LinearRegression, PolynomialRegression};
pub use models::Model;
pub use random_forest::RandomForest;
