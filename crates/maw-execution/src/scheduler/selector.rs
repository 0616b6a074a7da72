use std::fmt;

use maw_common::config::SelectorKind;

use crate::estimator::Estimator;
use crate::id::NodeId;
use crate::scheduler::SchedulerOptions;

/// A worker that is ready to accept another job.
pub struct Candidate<'a> {
    pub worker: NodeId,
    /// The position of the worker in the order the workers were first seen.
    pub position: usize,
    pub outstanding: usize,
    pub estimator: &'a mut dyn Estimator,
}

/// The policy that picks one of the ready workers for the next job.
/// The candidates are given in the order the workers were first seen.
pub trait WorkerSelector: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    fn select(&mut self, candidates: &mut [Candidate<'_>]) -> Option<NodeId>;
}

pub fn create_selector(options: &SchedulerOptions) -> Box<dyn WorkerSelector> {
    match options.selector {
        SelectorKind::Learning => Box::new(LearningSelector::new(options.account_queued_work)),
        SelectorKind::RoundRobin => Box::new(RoundRobinSelector::default()),
    }
}

/// Picks the worker with the smallest sampled completion time.
///
/// Sampling a likely value rather than using the average keeps exploring
/// workers whose estimate is uncertain. Ties go to the worker seen first.
#[derive(Debug)]
pub struct LearningSelector {
    account_queued_work: bool,
}

impl LearningSelector {
    pub fn new(account_queued_work: bool) -> Self {
        Self {
            account_queued_work,
        }
    }

    fn score(&self, candidate: &mut Candidate<'_>) -> f64 {
        let mut score = candidate.estimator.likely_value();
        if self.account_queued_work && candidate.outstanding > 0 {
            score += candidate.outstanding as f64 * candidate.estimator.high_estimate();
        }
        if score.is_nan() {
            f64::INFINITY
        } else {
            score
        }
    }
}

impl WorkerSelector for LearningSelector {
    fn name(&self) -> &'static str {
        "learning"
    }

    fn select(&mut self, candidates: &mut [Candidate<'_>]) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for candidate in candidates.iter_mut() {
            let score = self.score(candidate);
            match best {
                Some((_, s)) if s <= score => {}
                _ => best = Some((candidate.worker, score)),
            }
        }
        best.map(|(worker, _)| worker)
    }
}

/// Cycles through the ready workers in the order they were first seen.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    last_position: Option<usize>,
}

impl WorkerSelector for RoundRobinSelector {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn select(&mut self, candidates: &mut [Candidate<'_>]) -> Option<NodeId> {
        let chosen = match self.last_position {
            Some(last) => candidates
                .iter()
                .find(|x| x.position > last)
                .or_else(|| candidates.first()),
            None => candidates.first(),
        }?;
        self.last_position = Some(chosen.position);
        Some(chosen.worker)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::estimator::ExactEstimator;
    use crate::testing::node;

    fn estimator(samples: &[f64]) -> ExactEstimator {
        let mut e = ExactEstimator::new(ChaCha8Rng::seed_from_u64(11));
        for x in samples {
            e.add_sample(*x);
        }
        e
    }

    #[test]
    fn test_learning_selector_prefers_faster_worker() {
        let mut slow = estimator(&[10.0, 10.1, 9.9, 10.0]);
        let mut fast = estimator(&[1.0, 1.1, 0.9, 1.0]);
        let mut selector = LearningSelector::new(false);
        for _ in 0..100 {
            let mut candidates = vec![
                Candidate {
                    worker: node(2),
                    position: 0,
                    outstanding: 0,
                    estimator: &mut slow,
                },
                Candidate {
                    worker: node(3),
                    position: 1,
                    outstanding: 0,
                    estimator: &mut fast,
                },
            ];
            assert_eq!(selector.select(&mut candidates), Some(node(3)));
        }
    }

    #[test]
    fn test_learning_selector_breaks_ties_by_first_seen() {
        let mut a = estimator(&[0.0]);
        let mut b = estimator(&[0.0]);
        let mut selector = LearningSelector::new(false);
        let mut candidates = vec![
            Candidate {
                worker: node(5),
                position: 0,
                outstanding: 0,
                estimator: &mut a,
            },
            Candidate {
                worker: node(4),
                position: 1,
                outstanding: 0,
                estimator: &mut b,
            },
        ];
        assert_eq!(selector.select(&mut candidates), Some(node(5)));
        assert_eq!(selector.select(&mut []), None);
    }

    #[test]
    fn test_learning_selector_accounts_queued_work() {
        let mut busy = estimator(&[1.0, 1.0, 1.0]);
        let mut idle = estimator(&[1.5, 1.5, 1.5]);
        let mut selector = LearningSelector::new(false);
        let mut candidates = vec![
            Candidate {
                worker: node(2),
                position: 0,
                outstanding: 1,
                estimator: &mut busy,
            },
            Candidate {
                worker: node(3),
                position: 1,
                outstanding: 0,
                estimator: &mut idle,
            },
        ];
        assert_eq!(selector.select(&mut candidates), Some(node(2)));
        let mut selector = LearningSelector::new(true);
        // the busy worker scores 1.0 + 1 * 1.0
        assert_eq!(selector.select(&mut candidates), Some(node(3)));
    }

    #[test]
    fn test_round_robin_selector() {
        let mut estimators = (0..3).map(|_| estimator(&[0.0])).collect::<Vec<_>>();
        let mut selector = RoundRobinSelector::default();
        let mut picks = vec![];
        for _ in 0..4 {
            let mut candidates = estimators
                .iter_mut()
                .enumerate()
                .map(|(i, e)| Candidate {
                    worker: node(i as u64 + 2),
                    position: i,
                    outstanding: 0,
                    estimator: e,
                })
                .collect::<Vec<_>>();
            picks.push(selector.select(&mut candidates).unwrap());
        }
        assert_eq!(picks, vec![node(2), node(3), node(4), node(2)]);
    }
}
