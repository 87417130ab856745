//! Least-squares gradient boosting over smartcore regression trees.
//!
//! Starts from the mean target and adds one shallow tree per stage, each fit
//! to the residuals left by the stages before it and shrunk by the learning
//! rate. With `subsample < 1.0` every stage sees a random fraction of the
//! rows (stochastic gradient boosting); the sampler is seeded so a given
//! configuration always produces the same model.

use crate::domain::errors::PredictorError;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, PartialEq)]
pub struct BoostingParameters {
    pub n_estimators: usize,
    pub max_depth: u16,
    pub learning_rate: f64,
    pub subsample: f64,
    pub seed: u64,
}

pub struct GradientBoostingRegressor {
    init: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl GradientBoostingRegressor {
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        params: &BoostingParameters,
    ) -> Result<Self, PredictorError> {
        if x.is_empty() || y.is_empty() {
            return Err(PredictorError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(PredictorError::Matrix {
                reason: format!("{} feature rows but {} targets", x.len(), y.len()),
            });
        }
        if let Some(index) = y.iter().position(|t| !t.is_finite()) {
            return Err(PredictorError::Matrix {
                reason: format!("target {} is not finite ({})", index, y[index]),
            });
        }

        let n = x.len();
        let init = y.iter().sum::<f64>() / n as f64;
        let x_matrix = to_matrix(x)?;
        let mut current = vec![init; n];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let stage_rows = ((n as f64 * params.subsample).round() as usize).clamp(1, n);

        let tree_params = DecisionTreeRegressorParameters::default()
            .with_max_depth(params.max_depth)
            .with_min_samples_leaf(1)
            .with_min_samples_split(2);

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, f)| t - f).collect();

            let tree = if stage_rows == n {
                Tree::fit(&x_matrix, &residuals, tree_params.clone())
            } else {
                let mut picked = sample(&mut rng, n, stage_rows).into_vec();
                picked.sort_unstable();
                let x_stage: Vec<Vec<f64>> = picked.iter().map(|&i| x[i].clone()).collect();
                let r_stage: Vec<f64> = picked.iter().map(|&i| residuals[i]).collect();
                Tree::fit(&to_matrix(&x_stage)?, &r_stage, tree_params.clone())
            }
            .map_err(|e| PredictorError::Model {
                reason: format!("tree fit failed: {}", e),
            })?;

            let update = tree.predict(&x_matrix).map_err(|e| PredictorError::Model {
                reason: format!("tree predict failed: {}", e),
            })?;
            for (f, u) in current.iter_mut().zip(update) {
                *f += params.learning_rate * u;
            }
            trees.push(tree);
        }

        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, PredictorError> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let x_matrix = to_matrix(x)?;
        let mut scores = vec![self.init; x.len()];
        for tree in &self.trees {
            let update = tree.predict(&x_matrix).map_err(|e| PredictorError::Model {
                reason: format!("tree predict failed: {}", e),
            })?;
            for (s, u) in scores.iter_mut().zip(update) {
                *s += self.learning_rate * u;
            }
        }
        Ok(scores)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn to_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>, PredictorError> {
    DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| PredictorError::Matrix {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(n_estimators: usize) -> BoostingParameters {
        BoostingParameters {
            n_estimators,
            max_depth: 3,
            learning_rate: 0.1,
            subsample: 1.0,
            seed: 42,
        }
    }

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (1..=20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        (x, y)
    }

    fn mse(pred: &[f64], y: &[f64]) -> f64 {
        pred.iter().zip(y).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / y.len() as f64
    }

    #[test]
    fn test_zero_stages_predicts_mean() {
        let (x, y) = linear_data();
        let model = GradientBoostingRegressor::fit(&x, &y, &params(0)).unwrap();
        let pred = model.predict(&x).unwrap();
        assert!(pred.iter().all(|p| (p - 10.5).abs() < 1e-9));
    }

    #[test]
    fn test_more_stages_reduce_training_error() {
        let (x, y) = linear_data();
        let few = GradientBoostingRegressor::fit(&x, &y, &params(5)).unwrap();
        let many = GradientBoostingRegressor::fit(&x, &y, &params(100)).unwrap();

        let err_few = mse(&few.predict(&x).unwrap(), &y);
        let err_many = mse(&many.predict(&x).unwrap(), &y);
        assert!(err_many < err_few);
        assert!(err_many < 1.0);
        assert_eq!(many.n_trees(), 100);
    }

    #[test]
    fn test_predictions_follow_target_order() {
        let (x, y) = linear_data();
        let model = GradientBoostingRegressor::fit(&x, &y, &params(100)).unwrap();
        let pred = model.predict(&[vec![2.0, 2.0], vec![18.0, 0.0]]).unwrap();
        assert!(pred[0] < pred[1]);
    }

    #[test]
    fn test_subsampled_fit_is_deterministic() {
        let (x, y) = linear_data();
        let mut p = params(20);
        p.subsample = 0.5;
        let a = GradientBoostingRegressor::fit(&x, &y, &p).unwrap();
        let b = GradientBoostingRegressor::fit(&x, &y, &p).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let result = GradientBoostingRegressor::fit(&[], &[], &params(10));
        assert!(matches!(result, Err(PredictorError::EmptyTrainingSet)));
    }

    #[test]
    fn test_non_finite_targets_are_rejected() {
        let (x, mut y) = linear_data();
        y[7] = f64::NAN;
        let result = GradientBoostingRegressor::fit(&x, &y, &params(10));
        assert!(matches!(result, Err(PredictorError::Matrix { .. })));

        y[7] = f64::INFINITY;
        let result = GradientBoostingRegressor::fit(&x, &y, &params(10));
        assert!(matches!(result, Err(PredictorError::Matrix { .. })));
    }

    #[test]
    fn test_mismatched_lengths_are_rejected() {
        let result = GradientBoostingRegressor::fit(&[vec![1.0]], &[1.0, 2.0], &params(10));
        assert!(matches!(result, Err(PredictorError::Matrix { .. })));
    }
}
