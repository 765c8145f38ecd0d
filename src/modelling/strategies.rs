//! Regression strategies over a train/test dataset pair
//!
//! Every strategy fits on the training split only, predicts both splits,
//! maps log-scale outcomes back to original units and evaluates. An outcome
//! transformation of `None` falls back to the configured one.

use crate::config::{OutcomeTransformation, PipelineConfig};
use crate::dataset::{ensure_same_schema, Dataset};
use crate::error::{CostBenchError, Result};
use crate::evaluation::{model_evaluation, EvaluationRecord, ImportanceTable};
use crate::preprocessing::StandardScaler;
use crate::training::linear_models::matrix_inverse;
use crate::training::{
    expand_grid, grid_search, r2_score, CrossValidator, DecisionTree, LassoCV, LinearRegression,
    Model, RandomForest, SelectThenFit, TreeParams,
};
use crate::utils::ParallelConfig;
use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Log-scale values are clipped here before exponentiating
pub const LOG_CLIP: f64 = 700.0;

/// A fitted model bound to the columns it was trained on
pub trait Predictor: Send + Sync {
    /// Input columns, in the order the model expects them
    fn features(&self) -> &[String];

    fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn predict(&self, data: &Dataset) -> Result<Array1<f64>> {
        let x = finite_matrix(data, self.features())?;
        self.predict_matrix(&x)
    }
}

/// Actuals and predictions of both splits, in original units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub y_train: Array1<f64>,
    pub y_train_pred: Array1<f64>,
    pub y_test: Array1<f64>,
    pub y_test_pred: Array1<f64>,
}

impl Predictions {
    pub fn evaluate(&self, model_name: &str) -> Result<EvaluationRecord> {
        model_evaluation(&self.y_train, &self.y_train_pred, &self.y_test, &self.y_test_pred, model_name)
    }

    /// Stack several prediction sets split by split, in the given order
    pub fn concat(parts: &[&Predictions]) -> Result<Predictions> {
        Ok(Predictions {
            y_train: stack(parts, |p| &p.y_train)?,
            y_train_pred: stack(parts, |p| &p.y_train_pred)?,
            y_test: stack(parts, |p| &p.y_test)?,
            y_test_pred: stack(parts, |p| &p.y_test_pred)?,
        })
    }
}

fn stack<F>(parts: &[&Predictions], pick: F) -> Result<Array1<f64>>
where
    F: Fn(&Predictions) -> &Array1<f64>,
{
    let views: Vec<_> = parts.iter().map(|p| pick(p).view()).collect();
    Ok(concatenate(Axis(0), &views)?)
}

/// Map values to original units: `exp(min(v, 700)) - 1` for log outcomes
pub fn back_transform(values: &Array1<f64>, transformation: OutcomeTransformation) -> Array1<f64> {
    match transformation {
        OutcomeTransformation::None => values.clone(),
        OutcomeTransformation::Log => values.mapv(|v| v.min(LOG_CLIP).exp_m1()),
    }
}

/// Predict both splits with `model` and return everything in original units
pub fn predict_outcome<P: Predictor + ?Sized>(
    model: &P,
    train: &Dataset,
    test: &Dataset,
    transformation: OutcomeTransformation,
) -> Result<Predictions> {
    Ok(Predictions {
        y_train: back_transform(&finite_target(train)?, transformation),
        y_train_pred: back_transform(&model.predict(train)?, transformation),
        y_test: back_transform(&finite_target(test)?, transformation),
        y_test_pred: back_transform(&model.predict(test)?, transformation),
    })
}

/// Evaluation, fitted model and feature ranking of one strategy run
#[derive(Debug, Clone)]
pub struct StrategyOutput<M> {
    pub record: EvaluationRecord,
    pub model: M,
    pub importance: ImportanceTable,
}

fn finite_matrix(data: &Dataset, features: &[String]) -> Result<Array2<f64>> {
    let x = data.feature_matrix(features)?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(CostBenchError::DataError(
            "feature matrix has missing or non-finite cells; impute before modelling".to_string(),
        ));
    }
    Ok(x)
}

fn finite_target(data: &Dataset) -> Result<Array1<f64>> {
    let y = data.target_array()?;
    if y.iter().any(|v| !v.is_finite()) {
        return Err(CostBenchError::DataError(format!(
            "target '{}' has missing or non-finite cells",
            data.target()
        )));
    }
    Ok(y)
}

/// Feature names plus training matrix and target, after the shared checks
fn training_arrays(train: &Dataset, test: &Dataset) -> Result<(Vec<String>, Array2<f64>, Array1<f64>)> {
    ensure_same_schema(train, test, "modelling input")?;
    let features = train.feature_names();
    if features.is_empty() {
        return Err(CostBenchError::DataError(format!(
            "no feature columns besides target '{}'",
            train.target()
        )));
    }
    let x = finite_matrix(train, &features)?;
    let y = finite_target(train)?;
    Ok((features, x, y))
}

fn run_in_pool<R, F>(config: &PipelineConfig, f: F) -> Result<R>
where
    R: Send,
    F: FnOnce() -> Result<R> + Send,
{
    config.validate()?;
    ParallelConfig::from_n_jobs(config.n_jobs).install(f)?
}

// ---------------------------------------------------------------------------
// Lasso
// ---------------------------------------------------------------------------

/// Standardized Lasso with cross-validated alpha and non-negative coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoPredictor {
    features: Vec<String>,
    scaler: StandardScaler,
    lasso: LassoCV,
}

impl LassoPredictor {
    pub fn fit(train: &Dataset, x: &Array2<f64>, y: &Array1<f64>, config: &PipelineConfig) -> Result<Self> {
        let mut scaler = StandardScaler::new();
        let x_scaled = scaler.fit_transform(x)?;

        let mut lasso = LassoCV::new(config.lasso.clone(), config.cv_folds);
        lasso.fit(&x_scaled, y)?;
        lasso.model_mut()?.clamp_negative_coefficients();

        Ok(Self {
            features: train.feature_names(),
            scaler,
            lasso,
        })
    }

    pub fn coefficients(&self) -> Result<&Array1<f64>> {
        self.lasso.coefficients()
    }

    pub fn alpha(&self) -> Option<f64> {
        self.lasso.alpha
    }

    /// Nonzero coefficients on the standardized scale, largest first
    pub fn importance(&self) -> Result<ImportanceTable> {
        let coef = self.coefficients()?;
        let kept: Vec<usize> = (0..coef.len()).filter(|&i| coef[i] != 0.0).collect();
        let names = kept.iter().map(|&i| self.features[i].clone()).collect();
        let scores = Array1::from_iter(kept.iter().map(|&i| coef[i]));
        ImportanceTable::new("Coefficient", names, &scores)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}

impl Predictor for LassoPredictor {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.lasso.predict(&self.scaler.transform(x)?)
    }
}

/// Lasso regression on standardized features.
///
/// Alpha comes from K-fold cross-validation over a log-spaced path; negative
/// coefficients are set to zero after the fit.
pub fn lasso_regression(
    train: &Dataset,
    test: &Dataset,
    model_name: &str,
    outcome_transformation: Option<OutcomeTransformation>,
    config: &PipelineConfig,
) -> Result<StrategyOutput<LassoPredictor>> {
    let outcome = config.resolve_outcome(outcome_transformation);
    run_in_pool(config, || {
        let start = Instant::now();
        let (_, x, y) = training_arrays(train, test)?;
        let model = LassoPredictor::fit(train, &x, &y, config)?;

        let predictions = predict_outcome(&model, train, test, outcome)?;
        let record = predictions.evaluate(model_name)?;
        let importance = model.importance()?;

        info!(
            model = %model_name,
            alpha = ?model.alpha(),
            selected = importance.len(),
            test_mape = %record.test_mape,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Lasso regression fitted"
        );
        Ok(StrategyOutput { record, model, importance })
    })
}

// ---------------------------------------------------------------------------
// Lasso selection + OLS
// ---------------------------------------------------------------------------

/// Coefficient table of an ordinary least squares fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsSummary {
    /// `const` followed by the selected features
    pub terms: Vec<String>,
    pub coefficients: Vec<f64>,
    /// NaN when the residual degrees of freedom are exhausted
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub n_obs: usize,
}

impl OlsSummary {
    fn compute(model: &LinearRegression, x: &Array2<f64>, y: &Array1<f64>, names: &[String]) -> Result<Self> {
        let coef = model.coefficients.as_ref().ok_or(CostBenchError::ModelNotFitted)?;
        let intercept = model.intercept.unwrap_or(0.0);
        let (n, p) = x.dim();

        let fitted = model.predict(x)?;
        let rss = (y - &fitted).mapv(|r| r * r).sum();
        let dof = n as f64 - p as f64 - 1.0;
        let sigma2 = if dof > 0.0 { rss / dof } else { f64::NAN };

        let design = concatenate(Axis(1), &[Array2::<f64>::ones((n, 1)).view(), x.view()])?;
        let xtx_inv = matrix_inverse(&design.t().dot(&design));

        let coefficients: Vec<f64> = std::iter::once(intercept).chain(coef.iter().copied()).collect();
        let std_errors: Vec<f64> = (0..=p)
            .map(|i| match &xtx_inv {
                Some(inv) => (sigma2 * inv[[i, i]]).sqrt(),
                None => f64::NAN,
            })
            .collect();
        let t_values = coefficients.iter().zip(&std_errors).map(|(c, se)| c / se).collect();

        let r_squared = r2_score(y, &fitted);
        let adj_r_squared = if dof > 0.0 {
            1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / dof
        } else {
            f64::NAN
        };

        Ok(Self {
            terms: std::iter::once("const".to_string()).chain(names.iter().cloned()).collect(),
            coefficients,
            std_errors,
            t_values,
            r_squared,
            adj_r_squared,
            n_obs: n,
        })
    }
}

/// OLS with intercept on the standardized features Lasso kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsPredictor {
    features: Vec<String>,
    selected: Vec<usize>,
    scaler: StandardScaler,
    ols: LinearRegression,
}

impl OlsPredictor {
    pub fn selected_features(&self) -> Vec<String> {
        self.selected.iter().map(|&i| self.features[i].clone()).collect()
    }
}

impl Predictor for OlsPredictor {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scaled = self.scaler.transform(x)?;
        self.ols.predict(&scaled.select(Axis(1), &self.selected))
    }
}

/// Result of [`lasso_ols_regression`]
#[derive(Debug, Clone)]
pub struct OlsOutput {
    pub record: EvaluationRecord,
    pub model: OlsPredictor,
    pub summary: OlsSummary,
}

/// Lasso picks the features with a positive coefficient, OLS refits on them.
///
/// Fails with `NoFeaturesSelected` when Lasso keeps nothing.
pub fn lasso_ols_regression(
    train: &Dataset,
    test: &Dataset,
    model_name: &str,
    outcome_transformation: Option<OutcomeTransformation>,
    config: &PipelineConfig,
) -> Result<OlsOutput> {
    let outcome = config.resolve_outcome(outcome_transformation);
    run_in_pool(config, || {
        let (features, x, y) = training_arrays(train, test)?;
        let lasso = LassoPredictor::fit(train, &x, &y, config)?;

        let coef = lasso.coefficients()?;
        let selected: Vec<usize> = (0..coef.len()).filter(|&i| coef[i] > 0.0).collect();
        if selected.is_empty() {
            return Err(CostBenchError::NoFeaturesSelected(format!(
                "Lasso at alpha {:.4e} zeroed all {} coefficients; try a smaller alpha",
                lasso.alpha().unwrap_or(f64::NAN),
                coef.len()
            )));
        }

        let x_selected = lasso.scaler().transform(&x)?.select(Axis(1), &selected);
        let mut ols = LinearRegression::new();
        ols.fit(&x_selected, &y)?;

        let names: Vec<String> = selected.iter().map(|&i| features[i].clone()).collect();
        let summary = OlsSummary::compute(&ols, &x_selected, &y, &names)?;

        let model = OlsPredictor {
            features,
            selected,
            scaler: lasso.scaler().clone(),
            ols,
        };
        let predictions = predict_outcome(&model, train, test, outcome)?;
        let record = predictions.evaluate(model_name)?;

        info!(
            model = %model_name,
            selected = names.len(),
            r_squared = summary.r_squared,
            test_mape = %record.test_mape,
            "Lasso + OLS fitted"
        );
        Ok(OlsOutput { record, model, summary })
    })
}

// ---------------------------------------------------------------------------
// Tree pipelines
// ---------------------------------------------------------------------------

/// Importance-based selection followed by a tuned tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreePipeline<M> {
    features: Vec<String>,
    pipeline: SelectThenFit<M>,
    pub best_params: TreeParams,
    /// Mean cross-validated R² of the chosen parameters
    pub cv_r2: f64,
}

impl<M: Model + Clone> TreePipeline<M> {
    /// Names of the columns kept by the selection step
    pub fn selected_features(&self) -> Result<Vec<String>> {
        Ok(self
            .pipeline
            .support()?
            .iter()
            .map(|&i| self.features[i].clone())
            .collect())
    }

    /// Importances of the final model over the selected columns, largest first
    pub fn importance(&self) -> Result<ImportanceTable> {
        let scores = self.pipeline.feature_importances().ok_or(CostBenchError::ModelNotFitted)?;
        ImportanceTable::new("Importance", self.selected_features()?, &scores)
    }

    pub fn model(&self) -> &M {
        &self.pipeline.model
    }
}

impl<M: Model + Clone> Predictor for TreePipeline<M> {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.pipeline.predict(x)
    }
}

/// Grid-search a select-then-fit pipeline by cross-validated R², then refit
/// the best parameters on the whole training split.
fn fit_tree_pipeline<M, F>(
    features: Vec<String>,
    x: &Array2<f64>,
    y: &Array1<f64>,
    grid: &[TreeParams],
    selector: M,
    make: F,
    config: &PipelineConfig,
) -> Result<TreePipeline<M>>
where
    M: Model + Clone,
    F: Fn(&TreeParams) -> M + Sync,
{
    let cv = CrossValidator::k_fold(config.cv_folds);
    let max_features = config.max_features;

    let search = grid_search(grid, x, y, &cv, |params, x_train, y_train, x_valid| {
        let mut pipeline = SelectThenFit::new(selector.clone(), make(params), max_features);
        pipeline.fit(x_train, y_train)?;
        pipeline.predict(x_valid)
    })?;

    let cv_r2 = search.cv_results[search.best_index].mean_score;
    debug!(params = %search.best_params, cv_r2, "Best tree parameters");

    let mut pipeline = SelectThenFit::new(selector, make(&search.best_params), max_features);
    pipeline.fit(x, y)?;

    Ok(TreePipeline {
        features,
        pipeline,
        best_params: search.best_params,
        cv_r2,
    })
}

fn tree_strategy<M, F>(
    train: &Dataset,
    test: &Dataset,
    model_name: &str,
    outcome_transformation: OutcomeTransformation,
    config: &PipelineConfig,
    grid: Vec<TreeParams>,
    selector: M,
    make: F,
) -> Result<StrategyOutput<TreePipeline<M>>>
where
    M: Model + Clone,
    F: Fn(&TreeParams) -> M + Sync + Send,
{
    run_in_pool(config, || {
        let start = Instant::now();
        let (features, x, y) = training_arrays(train, test)?;
        let model = fit_tree_pipeline(features, &x, &y, &grid, selector, make, config)?;

        let predictions = predict_outcome(&model, train, test, outcome_transformation)?;
        let record = predictions.evaluate(model_name)?;
        let importance = model.importance()?;

        info!(
            model = %model_name,
            params = %model.best_params,
            cv_r2 = model.cv_r2,
            selected = importance.len(),
            test_mape = %record.test_mape,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tree pipeline fitted"
        );
        Ok(StrategyOutput { record, model, importance })
    })
}

/// Random forest behind importance-based selection, tuned over the forest grid.
///
/// The selection forest uses default settings with the first grid value
/// for the number of trees.
pub fn random_forest_regression(
    train: &Dataset,
    test: &Dataset,
    model_name: &str,
    outcome_transformation: Option<OutcomeTransformation>,
    config: &PipelineConfig,
) -> Result<StrategyOutput<TreePipeline<RandomForest>>> {
    let seed = config.random_state;
    let g = &config.forest_grid;
    let grid = expand_grid(&g.n_estimators, &g.max_depth, &g.min_samples_split, &g.min_samples_leaf);
    let selector_trees = g.n_estimators.first().copied().unwrap_or(100);

    tree_strategy(
        train,
        test,
        model_name,
        config.resolve_outcome(outcome_transformation),
        config,
        grid,
        RandomForest::new_regressor(selector_trees).with_random_state(seed),
        move |p: &TreeParams| {
            RandomForest::new_regressor(p.n_estimators)
                .with_max_depth(p.max_depth)
                .with_min_samples_split(p.min_samples_split)
                .with_min_samples_leaf(p.min_samples_leaf)
                .with_random_state(seed)
        },
    )
}

/// Single regression tree behind importance-based selection, tuned over the tree grid
pub fn decision_tree_regression(
    train: &Dataset,
    test: &Dataset,
    model_name: &str,
    outcome_transformation: Option<OutcomeTransformation>,
    config: &PipelineConfig,
) -> Result<StrategyOutput<TreePipeline<DecisionTree>>> {
    let seed = config.random_state;
    let g = &config.tree_grid;
    let grid = expand_grid(&[1], &g.max_depth, &g.min_samples_split, &g.min_samples_leaf);

    tree_strategy(
        train,
        test,
        model_name,
        config.resolve_outcome(outcome_transformation),
        config,
        grid,
        DecisionTree::new_regressor().with_random_state(seed),
        move |p: &TreeParams| {
            DecisionTree::new_regressor()
                .with_max_depth(p.max_depth)
                .with_min_samples_split(p.min_samples_split)
                .with_min_samples_leaf(p.min_samples_leaf)
                .with_random_state(seed)
        },
    )
}
