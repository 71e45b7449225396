//! Grid foraging environment.

use metta::env::{Action, EnvInfo, GridObject, MettaEnv, StepResult};
use metta::spaces::{Box as BoxSpace, Discrete, DynSpace, MultiDiscrete};
use metta::{MettaError, Result};
use ndarray::{Array3, ArrayD};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const AGENT: usize = 0;
const RESOURCE: usize = 1;
const WALL: usize = 2;
const ENERGY: usize = 3;
const PROGRESS: usize = 4;

// up, down, left, right
const MOVES: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Configuration for [`GridForage`]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridForageConfig {
    pub height: usize,
    pub width: usize,
    pub num_resources: usize,
    pub num_walls: usize,
    /// Episode is truncated after this many steps
    pub max_steps: u32,
    /// Energy at reset; every move costs one
    pub energy: u32,
    /// Use `MultiDiscrete([3, 4])` (verb, direction) instead of `Discrete(5)`
    pub multi_discrete: bool,
    /// Seed used until `reset` is given one
    pub seed: u64,
}

impl Default for GridForageConfig {
    fn default() -> Self {
        Self {
            height: 7,
            width: 7,
            num_resources: 4,
            num_walls: 3,
            max_steps: 64,
            energy: 32,
            multi_discrete: false,
            seed: 0,
        }
    }
}

/// Single-agent grid world: walk around, pick up resources.
///
/// Observations are `[5, height, width]`: one-hot planes for the agent,
/// resources and walls, then constant planes holding the remaining energy
/// and the episode progress, both scaled to `[0, 1]`.
///
/// With `Discrete(5)` the actions are noop, up, down, left, right and walking
/// onto a resource collects it. With `MultiDiscrete([3, 4])` the first part is
/// the verb (noop, move, collect) and the second the direction; collecting
/// picks up a resource on the neighbouring cell.
///
/// The episode terminates when every resource is collected or the energy runs
/// out, and is truncated at `max_steps`.
pub struct GridForage {
    config: GridForageConfig,
    walls: Vec<(usize, usize)>,
    resources: Vec<(usize, usize)>,
    agent: (usize, usize),
    energy: u32,
    collected: u32,
    tick: u32,
    done: bool,
    objects: Vec<GridObject>,
    rng: ChaCha8Rng,
}

impl GridForage {
    /// Create a new environment
    pub fn new(config: GridForageConfig) -> Self {
        assert!(
            config.height > 0 && config.width > 0,
            "grid must have at least one cell"
        );
        assert!(
            config.num_resources + config.num_walls < config.height * config.width,
            "grid too small for {} resources and {} walls",
            config.num_resources,
            config.num_walls
        );
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut env = Self {
            config,
            walls: Vec::new(),
            resources: Vec::new(),
            agent: (0, 0),
            energy: 0,
            collected: 0,
            tick: 0,
            done: false,
            objects: Vec::new(),
            rng,
        };
        env.place();
        env
    }

    /// Names of the per-cell observation channels, in order
    pub fn grid_features() -> Vec<String> {
        ["agent", "resource", "wall"].iter().map(|s| s.to_string()).collect()
    }

    /// Names of the global observation channels, in order
    pub fn global_features() -> Vec<String> {
        ["energy", "progress"].iter().map(|s| s.to_string()).collect()
    }

    pub fn config(&self) -> &GridForageConfig {
        &self.config
    }

    pub fn collected(&self) -> u32 {
        self.collected
    }

    pub fn energy(&self) -> u32 {
        self.energy
    }

    fn place(&mut self) {
        let (h, w) = (self.config.height, self.config.width);
        let mut cells: Vec<(usize, usize)> =
            (0..h).flat_map(|r| (0..w).map(move |c| (r, c))).collect();
        cells.shuffle(&mut self.rng);

        let mut cells = cells.into_iter();
        self.agent = cells.next().unwrap_or((0, 0));
        self.walls = cells.by_ref().take(self.config.num_walls).collect();
        self.resources = cells.take(self.config.num_resources).collect();
        self.energy = self.config.energy;
        self.collected = 0;
        self.tick = 0;
        self.done = false;
        self.refresh_objects();
    }

    fn refresh_objects(&mut self) {
        let mut objects = Vec::with_capacity(1 + self.walls.len() + self.resources.len());
        objects.push(
            GridObject::new(0, "agent", self.agent.0, self.agent.1)
                .with_property("energy", self.energy as f32)
                .with_property("collected", self.collected as f32),
        );
        let mut id = 1;
        for &(r, c) in &self.walls {
            objects.push(GridObject::new(id, "wall", r, c));
            id += 1;
        }
        for &(r, c) in &self.resources {
            objects.push(GridObject::new(id, "resource", r, c));
            id += 1;
        }
        self.objects = objects;
    }

    fn observe(&self) -> ArrayD<f32> {
        let (h, w) = (self.config.height, self.config.width);
        let mut obs = Array3::<f32>::zeros((5, h, w));
        obs[(AGENT, self.agent.0, self.agent.1)] = 1.0;
        for &(r, c) in &self.resources {
            obs[(RESOURCE, r, c)] = 1.0;
        }
        for &(r, c) in &self.walls {
            obs[(WALL, r, c)] = 1.0;
        }
        let energy = if self.config.energy == 0 {
            0.0
        } else {
            self.energy as f32 / self.config.energy as f32
        };
        let progress = self.tick as f32 / self.config.max_steps.max(1) as f32;
        obs.index_axis_mut(ndarray::Axis(0), ENERGY).fill(energy);
        obs.index_axis_mut(ndarray::Axis(0), PROGRESS).fill(progress.min(1.0));
        obs.into_dyn()
    }

    fn neighbour(&self, direction: usize) -> Option<(usize, usize)> {
        let (dr, dc) = MOVES[direction];
        let r = self.agent.0.checked_add_signed(dr)?;
        let c = self.agent.1.checked_add_signed(dc)?;
        (r < self.config.height && c < self.config.width).then_some((r, c))
    }

    fn walk(&mut self, direction: usize) -> f32 {
        self.energy = self.energy.saturating_sub(1);
        match self.neighbour(direction) {
            Some(cell) if !self.walls.contains(&cell) => {
                self.agent = cell;
                if self.config.multi_discrete {
                    0.0
                } else {
                    self.collect_at(cell)
                }
            }
            _ => 0.0,
        }
    }

    fn collect_at(&mut self, cell: (usize, usize)) -> f32 {
        match self.resources.iter().position(|&r| r == cell) {
            Some(idx) => {
                self.resources.swap_remove(idx);
                self.collected += 1;
                1.0
            }
            None => 0.0,
        }
    }

    /// `(verb, direction)` for either action layout
    fn decode(&self, action: Action) -> Result<(i64, usize)> {
        let invalid = || MettaError::EnvironmentStep(format!("invalid action {action:?}"));
        match (action, self.config.multi_discrete) {
            (Action::Discrete(0), false) => Ok((0, 0)),
            (Action::Discrete(a @ 1..=4), false) => Ok((1, (a - 1) as usize)),
            (Action::MultiDiscrete([verb @ 0..=2, dir @ 0..=3]), true) => Ok((verb, dir as usize)),
            _ => Err(invalid()),
        }
    }
}

impl MettaEnv for GridForage {
    fn observation_space(&self) -> DynSpace {
        DynSpace::Box(BoxSpace::grid(5, self.config.height, self.config.width, 1.0))
    }

    fn action_space(&self) -> DynSpace {
        if self.config.multi_discrete {
            DynSpace::MultiDiscrete(MultiDiscrete::new(vec![3, 4]))
        } else {
            DynSpace::Discrete(Discrete::new(5))
        }
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        if let Some(s) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(s);
        }
        self.place();
        Ok((self.observe(), EnvInfo::new()))
    }

    fn step(&mut self, action: Action) -> Result<StepResult> {
        if self.done {
            return Err(MettaError::EnvironmentStep(
                "step called on a finished episode".into(),
            ));
        }
        let (verb, direction) = self.decode(action)?;

        let reward = match verb {
            1 => self.walk(direction),
            2 => match self.neighbour(direction) {
                Some(cell) => self.collect_at(cell),
                None => 0.0,
            },
            _ => 0.0,
        };
        self.tick += 1;

        let terminated = self.resources.is_empty() || self.energy == 0;
        let truncated = !terminated && self.tick >= self.config.max_steps;
        self.done = terminated || truncated;
        self.refresh_objects();

        let info = if self.done {
            tracing::trace!(collected = self.collected, tick = self.tick, "episode over");
            EnvInfo::new()
                .with_extra("resources_collected", self.collected as f32)
                .with_extra("energy_left", self.energy as f32)
        } else {
            EnvInfo::new()
        };

        Ok(StepResult {
            observation: self.observe(),
            reward,
            terminated,
            truncated,
            info,
        })
    }

    fn grid_objects(&self) -> &[GridObject] {
        &self.objects
    }

    fn render(&self) -> Option<String> {
        let mut lines = Vec::with_capacity(self.config.height);
        for r in 0..self.config.height {
            let line: String = (0..self.config.width)
                .map(|c| {
                    if self.agent == (r, c) {
                        '@'
                    } else if self.walls.contains(&(r, c)) {
                        '#'
                    } else if self.resources.contains(&(r, c)) {
                        '*'
                    } else {
                        '.'
                    }
                })
                .collect();
            lines.push(line);
        }
        Some(lines.join("\n"))
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
