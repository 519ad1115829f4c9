// src/core/generator.rs — Synthetic task generation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::types::Task;

const TASK_DESCRIPTIONS: [&str; 10] = [
    "Analyze data patterns",
    "Optimize algorithm efficiency",
    "Validate system integrity",
    "Process large dataset",
    "Coordinate with other agents",
    "Generate report summary",
    "Execute benchmark tests",
    "Update system configuration",
    "Monitor performance metrics",
    "Resolve conflicts between agents",
];

const MIN_COMPLEXITY: f64 = 0.1;
const MAX_COMPLEXITY: f64 = 1.0;

/// Produces the work items for one cycle.
pub trait TaskGenerator: Send {
    fn generate(&mut self, count: usize, cycle: u32) -> Vec<Task>;
}

/// Uniform complexity in [0.1, 1.0], description picked from a fixed catalog.
pub struct RandomTaskGenerator {
    rng: StdRng,
}

impl RandomTaskGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible generator for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomTaskGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGenerator for RandomTaskGenerator {
    fn generate(&mut self, count: usize, cycle: u32) -> Vec<Task> {
        (0..count)
            .map(|index| {
                let description = TASK_DESCRIPTIONS
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(TASK_DESCRIPTIONS[0]);
                let complexity = self.rng.gen_range(MIN_COMPLEXITY..=MAX_COMPLEXITY);
                Task::new(cycle, index, description, complexity)
            })
            .collect()
    }
}
