use rand::Rng;
use rand::seq::IndexedRandom;

use crate::error::AgentError;
use crate::game::Observation;

/// A single step of experience for RL training.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Observation,
    pub action: usize,
    pub reward: f32,
    pub next_state: Observation,
    pub done: bool,
}

/// Multiplicative epsilon decay with a floor.
///
/// After `k` calls to [`EpsilonSchedule::advance`] the value is
/// `max(end, start * decay^k)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EpsilonSchedule {
    start: f64,
    end: f64,
    decay: f64,
    steps: u64,
}

impl EpsilonSchedule {
    pub fn new(start: f64, end: f64, decay: f64) -> Self {
        EpsilonSchedule {
            start,
            end,
            decay,
            steps: 0,
        }
    }

    pub fn value(&self) -> f64 {
        (self.start * self.decay.powf(self.steps as f64)).max(self.end)
    }

    pub fn advance(&mut self) {
        self.steps += 1;
    }

    /// Number of decay steps applied so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The same schedule after `steps` decay steps.
    pub fn with_steps(&self, steps: u64) -> Self {
        EpsilonSchedule {
            steps,
            ..self.clone()
        }
    }

    /// Whether both schedules share start, floor and decay.
    pub fn same_parameters(&self, other: &EpsilonSchedule) -> bool {
        self.start == other.start && self.end == other.end && self.decay == other.decay
    }
}

/// Epsilon-greedy choice over `q_values` at a fixed `epsilon`.
///
/// With `valid` set, only those indices are candidates; otherwise every index of
/// `q_values` is. Greedy ties go to the first candidate in iteration order.
/// A mask entry outside `q_values` is an error.
pub fn choose_action<R: Rng + ?Sized>(
    q_values: &[f32],
    valid: Option<&[usize]>,
    epsilon: f64,
    rng: &mut R,
) -> Result<usize, AgentError> {
    if let Some(&action) = valid
        .into_iter()
        .flatten()
        .find(|&&action| action >= q_values.len())
    {
        return Err(AgentError::ActionOutOfRange {
            action,
            action_count: q_values.len(),
        });
    }
    let explore = rng.random::<f64>() < epsilon;
    match valid {
        Some(valid) => {
            if explore {
                return valid.choose(rng).copied().ok_or(AgentError::NoValidMoves);
            }
            greedy(valid.iter().copied(), q_values)
        }
        None => {
            if q_values.is_empty() {
                return Err(AgentError::NoValidMoves);
            }
            if explore {
                return Ok(rng.random_range(0..q_values.len()));
            }
            greedy(0..q_values.len(), q_values)
        }
    }
}

/// Highest-valued candidate; the first one wins on equal values.
fn greedy(candidates: impl Iterator<Item = usize>, q_values: &[f32]) -> Result<usize, AgentError> {
    let mut best: Option<(usize, f32)> = None;
    for idx in candidates {
        let q = q_values[idx];
        match best {
            Some((_, best_q)) if q <= best_q => {}
            _ => best = Some((idx, q)),
        }
    }
    best.map(|(idx, _)| idx).ok_or(AgentError::NoValidMoves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_epsilon_matches_closed_form() {
        let mut schedule = EpsilonSchedule::new(1.0, 0.05, 0.9);
        for k in 0..60 {
            let expected = (1.0f64 * 0.9f64.powi(k)).max(0.05);
            assert!((schedule.value() - expected).abs() < 1e-12, "k = {k}");
            schedule.advance();
        }
        assert_eq!(schedule.value(), 0.05);
    }

    #[test]
    fn test_epsilon_is_non_increasing() {
        let mut schedule = EpsilonSchedule::new(0.8, 0.1, 0.99);
        let mut prev = schedule.value();
        for _ in 0..500 {
            schedule.advance();
            assert!(schedule.value() <= prev);
            prev = schedule.value();
        }
    }

    #[test]
    fn test_greedy_respects_mask() {
        let mut rng = StdRng::seed_from_u64(7);
        let q = [9.0, 1.0, 5.0, 3.0];
        let action = choose_action(&q, Some(&[1, 2, 3]), 0.0, &mut rng).unwrap();
        assert_eq!(action, 2);
    }

    #[test]
    fn test_greedy_unmasked_takes_global_max() {
        let mut rng = StdRng::seed_from_u64(7);
        let q = [0.0, 4.0, -1.0, 2.0];
        assert_eq!(choose_action(&q, None, 0.0, &mut rng).unwrap(), 1);
    }

    #[test]
    fn test_greedy_ties_take_first_candidate() {
        let mut rng = StdRng::seed_from_u64(7);
        let q = [1.0, 2.0, 2.0, 2.0];
        assert_eq!(choose_action(&q, Some(&[3, 1, 2]), 0.0, &mut rng).unwrap(), 3);
        assert_eq!(choose_action(&q, None, 0.0, &mut rng).unwrap(), 1);
    }

    #[test]
    fn test_exploration_stays_in_valid_set() {
        let mut rng = StdRng::seed_from_u64(11);
        let q = vec![0.0; 25];
        let valid = [3, 7, 19];
        for _ in 0..200 {
            let action = choose_action(&q, Some(&valid), 1.0, &mut rng).unwrap();
            assert!(valid.contains(&action));
        }
    }

    #[test]
    fn test_unmasked_exploration_covers_action_space() {
        let mut rng = StdRng::seed_from_u64(3);
        let q = vec![0.0; 9];
        let mut seen = [false; 9];
        for _ in 0..500 {
            seen[choose_action(&q, None, 1.0, &mut rng).unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_mask_outside_action_space_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let q = vec![0.0; 25];
        for epsilon in [0.0, 1.0] {
            assert_eq!(
                choose_action(&q, Some(&[3, 25]), epsilon, &mut rng),
                Err(AgentError::ActionOutOfRange {
                    action: 25,
                    action_count: 25,
                })
            );
        }
        assert_eq!(choose_action(&q, Some(&[24]), 0.0, &mut rng), Ok(24));
    }

    #[test]
    fn test_empty_valid_set_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let q = [1.0, 2.0];
        assert_eq!(
            choose_action(&q, Some(&[]), 0.0, &mut rng),
            Err(AgentError::NoValidMoves)
        );
        assert_eq!(
            choose_action(&q, Some(&[]), 1.0, &mut rng),
            Err(AgentError::NoValidMoves)
        );
    }
}
