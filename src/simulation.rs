//! Pull-driven pipeline of generation stages
//!
//! The host calls [`SimulationDriver::tick`] once per frame. Each tick runs
//! exactly one invocation of the current stage against a mutable context
//! and reports it as a [`StageCompleted`] event. Repeating stages stay on
//! the cursor until their stop predicate accepts the latest output.
//!
//! ```text
//! driver.queue("ocean", ..)
//!       .repeat("humidity", .., Some(10))
//!       .until(|attempt, out, prev| ..)?
//!       .queue("biomes", ..)
//!       .complete()?;
//! while driver.can_advance() {
//!     driver.tick(&mut ctx)?;
//! }
//! ```

use std::time::Instant;

use crate::error::{Result, SimError};

pub type StageFn<C, O> = Box<dyn FnMut(&mut C) -> Result<O>>;

/// `(attempt_number, output, previous_output) -> stop?`
pub type StopPredicate<O> = Box<dyn FnMut(u32, &O, Option<&O>) -> bool>;

type Listener<O> = Box<dyn FnMut(&StageCompleted<O>)>;

/// Name of the terminal stage appended by [`SimulationDriver::complete`]
pub const COMPLETE_STAGE: &str = "complete";

enum Stage<C, O> {
    /// Runs exactly once
    OneShot { name: String, run: StageFn<C, O> },
    /// Runs until `stop` returns true; without one it runs once
    Repeating {
        name: String,
        run: StageFn<C, O>,
        stop: Option<StopPredicate<O>>,
        log_throttle: Option<u32>,
    },
    /// Terminal no-op that reports total time
    Complete,
}

impl<C, O> Stage<C, O> {
    fn name(&self) -> &str {
        match self {
            Stage::OneShot { name, .. } | Stage::Repeating { name, .. } => name,
            Stage::Complete => COMPLETE_STAGE,
        }
    }

    fn log_throttle(&self) -> Option<u32> {
        match self {
            Stage::Repeating { log_throttle, .. } => *log_throttle,
            _ => None,
        }
    }
}

/// Notification emitted once per tick
#[derive(Debug, Clone, PartialEq)]
pub struct StageCompleted<O> {
    pub name: String,
    pub output: O,
    pub will_repeat: bool,
    pub attempt_number: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum Cursor {
    /// Stages are still being added
    Setup,
    At(usize),
    /// A stage failed; nothing else will run
    Halted(String),
}

pub struct SimulationDriver<C, O> {
    stages: Vec<Stage<C, O>>,
    cursor: Cursor,
    attempts: u32,
    previous: Option<O>,
    started: Option<Instant>,
    listeners: Vec<Listener<O>>,
}

impl<C, O> Default for SimulationDriver<C, O> {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            cursor: Cursor::Setup,
            attempts: 0,
            previous: None,
            started: None,
            listeners: Vec::new(),
        }
    }
}

impl<C, O: Clone + Default> SimulationDriver<C, O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage that runs exactly once
    pub fn queue<F>(&mut self, name: &str, run: F) -> &mut Self
    where
        F: FnMut(&mut C) -> Result<O> + 'static,
    {
        self.stages.push(Stage::OneShot {
            name: name.to_string(),
            run: Box::new(run),
        });
        self
    }

    /// Add a stage that repeats until the predicate set by [`Self::until`]
    /// accepts its output. `log_throttle` only affects logging: every Nth
    /// attempt is reported at info level.
    pub fn repeat<F>(&mut self, name: &str, run: F, log_throttle: Option<u32>) -> &mut Self
    where
        F: FnMut(&mut C) -> Result<O> + 'static,
    {
        self.stages.push(Stage::Repeating {
            name: name.to_string(),
            run: Box::new(run),
            stop: None,
            log_throttle,
        });
        self
    }

    /// Attach a stop predicate to the most recently added stage
    pub fn until<P>(&mut self, stop: P) -> Result<&mut Self>
    where
        P: FnMut(u32, &O, Option<&O>) -> bool + 'static,
    {
        let Some(last) = self.stages.pop() else {
            return Err(SimError::UntilWithoutStage);
        };
        let stage = match last {
            Stage::OneShot { name, run } => Stage::Repeating {
                name,
                run,
                stop: Some(Box::new(stop)),
                log_throttle: None,
            },
            Stage::Repeating {
                name, run, log_throttle, ..
            } => Stage::Repeating {
                name,
                run,
                stop: Some(Box::new(stop)),
                log_throttle,
            },
            Stage::Complete => {
                self.stages.push(Stage::Complete);
                return Err(SimError::UntilWithoutStage);
            }
        };
        self.stages.push(stage);
        Ok(self)
    }

    /// Finalize the stage list, appending the terminal stage, and place the
    /// cursor on the first stage.
    pub fn complete(&mut self) -> Result<&mut Self> {
        if self.stages.is_empty() {
            return Err(SimError::EmptyPipeline);
        }
        self.stages.push(Stage::Complete);
        self.cursor = Cursor::At(0);
        self.attempts = 0;
        self.previous = None;
        Ok(self)
    }

    /// Subscribe to the per-tick notification stream
    pub fn on_stage_completed<F>(&mut self, listener: F) -> &mut Self
    where
        F: FnMut(&StageCompleted<O>) + 'static,
    {
        self.listeners.push(Box::new(listener));
        self
    }

    /// True while there are stages left to run and nothing has failed
    pub fn can_advance(&self) -> bool {
        matches!(self.cursor, Cursor::At(index) if index < self.stages.len())
    }

    /// Name of the stage the next tick will run
    pub fn current_stage(&self) -> Option<&str> {
        match self.cursor {
            Cursor::At(index) => self.stages.get(index).map(Stage::name),
            _ => None,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.cursor, Cursor::Halted(_))
    }

    /// Run one invocation of the current stage.
    ///
    /// A stage error halts the driver for good and is returned as is; later
    /// ticks report [`SimError::PipelineHalted`].
    pub fn tick(&mut self, ctx: &mut C) -> Result<StageCompleted<O>> {
        let index = match &self.cursor {
            Cursor::Setup => return Err(SimError::PipelineNotComplete),
            Cursor::Halted(name) => return Err(SimError::PipelineHalted(name.clone())),
            Cursor::At(index) if *index >= self.stages.len() => return Err(SimError::PipelineExhausted),
            Cursor::At(index) => *index,
        };

        if index == 0 && self.attempts == 0 {
            self.started = Some(Instant::now());
        }
        self.attempts += 1;
        let attempt = self.attempts;
        let stage_start = Instant::now();

        let stage = &mut self.stages[index];
        let name = stage.name().to_string();
        if attempt == 1 {
            tracing::debug!("Simulation:{} started", name);
        }

        let result = match stage {
            Stage::OneShot { run, .. } | Stage::Repeating { run, .. } => run(ctx),
            Stage::Complete => {
                if let Some(started) = self.started {
                    tracing::info!("Simulation finished in {:.2?}", started.elapsed());
                }
                Ok(O::default())
            }
        };
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                tracing::error!("Simulation error on stage {} ({}), halting: {}", index, name, err);
                self.cursor = Cursor::Halted(name);
                return Err(err);
            }
        };

        let will_repeat = match stage {
            Stage::Repeating { stop: Some(stop), .. } => !stop(attempt, &output, self.previous.as_ref()),
            _ => false,
        };

        let throttle = stage.log_throttle();
        if throttle.map_or(true, |every| every > 0 && attempt % every == 0) || !will_repeat {
            tracing::info!("Simulation:{}:{} took {:.2?}", name, attempt, stage_start.elapsed());
        } else {
            tracing::trace!("Simulation:{}:{} took {:.2?}", name, attempt, stage_start.elapsed());
        }

        if will_repeat {
            self.previous = Some(output.clone());
        } else {
            self.cursor = Cursor::At(index + 1);
            self.attempts = 0;
            self.previous = None;
        }

        let event = StageCompleted {
            name,
            output,
            will_repeat,
            attempt_number: attempt,
        };
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
        Ok(event)
    }
}
