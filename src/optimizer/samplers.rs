//! Sampling strategies for the hyperparameter search

use super::search_space::{ParameterValue, SearchSpace, TrialParams};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Trait for hyperparameter samplers. The objective is maximized; history
/// entries are (params, score) pairs of completed trials.
pub trait Sampler: Send {
    /// Sample the next set of hyperparameters
    fn sample(&mut self, search_space: &SearchSpace, history: &[(TrialParams, f64)])
        -> TrialParams;
}

/// Uniform random sampler
#[derive(Debug)]
pub struct RandomSampler {
    rng: Xoshiro256PlusPlus,
}

impl RandomSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        Self { rng }
    }
}

impl Sampler for RandomSampler {
    fn sample(
        &mut self,
        search_space: &SearchSpace,
        _history: &[(TrialParams, f64)],
    ) -> TrialParams {
        search_space.sample(&mut self.rng)
    }
}

/// Tree-structured Parzen Estimator style sampler.
///
/// Random sampling during the startup trials; afterwards a batch of
/// candidates is drawn and the one most similar to the best-scoring
/// fraction of the history is kept.
#[derive(Debug)]
pub struct TpeSampler {
    rng: Xoshiro256PlusPlus,
    n_startup_trials: usize,
    gamma: f64,
    n_candidates: usize,
}

impl TpeSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        Self {
            rng,
            n_startup_trials: 10,
            gamma: 0.25,
            n_candidates: 24,
        }
    }

    /// Set number of startup trials
    pub fn with_n_startup(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    fn similarity(candidate: &TrialParams, good_trials: &[&TrialParams]) -> f64 {
        if good_trials.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        for good in good_trials {
            let mut dist = 0.0;
            let mut count = 0;
            for (key, val) in candidate {
                if let Some(good_val) = good.get(key) {
                    let d = Self::param_distance(val, good_val);
                    dist += d * d;
                    count += 1;
                }
            }
            if count > 0 {
                dist = (dist / count as f64).sqrt();
                total += 1.0 / (1.0 + dist);
            }
        }
        total / good_trials.len() as f64
    }

    fn param_distance(a: &ParameterValue, b: &ParameterValue) -> f64 {
        match (a, b) {
            (ParameterValue::Float(va), ParameterValue::Float(vb)) => (va - vb).abs(),
            (ParameterValue::Int(va), ParameterValue::Int(vb)) => (va - vb).abs() as f64,
            (ParameterValue::String(va), ParameterValue::String(vb)) => {
                if va == vb {
                    0.0
                } else {
                    1.0
                }
            }
            _ => 1.0,
        }
    }
}

impl Sampler for TpeSampler {
    fn sample(
        &mut self,
        search_space: &SearchSpace,
        history: &[(TrialParams, f64)],
    ) -> TrialParams {
        if history.len() < self.n_startup_trials {
            return search_space.sample(&mut self.rng);
        }

        // Best-scoring fraction of the history (objective is maximized)
        let mut sorted: Vec<_> = history.iter().collect();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let n_good = ((sorted.len() as f64 * self.gamma).ceil() as usize).max(1);
        let good_trials: Vec<_> = sorted[..n_good].iter().map(|(p, _)| p).collect();

        let mut best_params = search_space.sample(&mut self.rng);
        let mut best_score = f64::MIN;
        for _ in 0..self.n_candidates {
            let candidate = search_space.sample(&mut self.rng);
            let score = Self::similarity(&candidate, &good_trials);
            if score > best_score {
                best_score = score;
                best_params = candidate;
            }
        }

        best_params
    }
}
