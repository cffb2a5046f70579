//! The epoch and batching state machine.

use crate::{
    assembler::{Batch, BatchAssembler},
    common::*,
    error::{Error, Result},
    loader::ImageLoader,
    pool::{EpochPlan, RemainderPolicy, SamplePool},
};

/// State of a [BatchGenerator].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Nothing was requested yet.
    Idle,
    /// The pool is reshuffled on the next request.
    EpochStart,
    /// The next request produces the window at this index.
    Batching { window: usize },
    /// An error was returned. The generator yields nothing afterwards.
    Halted,
}

/// Options of batch generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub batch_size: NonZeroUsize,
    /// Only the first `sample_limit` identifiers of each shuffled epoch are used.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    #[serde(default)]
    pub remainder: RemainderPolicy,
    /// Seed of the shuffling RNG. Seeded from entropy if unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Rewrite the sample pool file after every shuffle.
    #[serde(default)]
    pub persist_shuffle: bool,
}

fn default_sample_limit() -> usize {
    5000
}

impl GeneratorConfig {
    pub fn new(batch_size: NonZeroUsize) -> Self {
        Self {
            batch_size,
            sample_limit: default_sample_limit(),
            remainder: RemainderPolicy::default(),
            seed: None,
            persist_shuffle: false,
        }
    }
}

/// An unbounded iterator of shuffled training batches.
///
/// Every epoch reshuffles the pool, splits its leading samples into windows and
/// assembles one batch per window. A failure is yielded once and ends the
/// iteration.
#[derive(Debug)]
pub struct BatchGenerator<L, R = StdRng>
where
    L: ImageLoader,
    R: Rng,
{
    assembler: BatchAssembler<L>,
    pool: SamplePool,
    rng: R,
    plan: EpochPlan,
    persist_shuffle: bool,
    state: GeneratorState,
    epoch: usize,
    step: usize,
}

impl<L, R> BatchGenerator<L, R>
where
    L: ImageLoader,
    R: Rng,
{
    pub fn new(
        assembler: BatchAssembler<L>,
        pool: SamplePool,
        config: &GeneratorConfig,
        rng: R,
    ) -> Result<Self> {
        let GeneratorConfig {
            batch_size,
            sample_limit,
            remainder,
            persist_shuffle,
            ..
        } = *config;

        if sample_limit > pool.len() {
            warn!(
                "sample_limit {} exceeds the pool size {}, use the whole pool",
                sample_limit,
                pool.len()
            );
        }

        let plan = EpochPlan::new(pool.len(), sample_limit, batch_size, remainder);
        if plan.num_windows == 0 {
            return Err(Error::InvalidConfig(format!(
                "an epoch of {} samples yields no batch of size {}",
                plan.num_samples, batch_size
            )));
        }
        if persist_shuffle && pool.path().is_none() {
            return Err(Error::InvalidConfig(
                "persist_shuffle requires a sample pool file".into(),
            ));
        }

        Ok(Self {
            assembler,
            pool,
            rng,
            plan,
            persist_shuffle,
            state: GeneratorState::Idle,
            epoch: 0,
            step: 0,
        })
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Number of started epochs.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Number of produced batches.
    pub fn global_step(&self) -> usize {
        self.step
    }

    pub fn plan(&self) -> &EpochPlan {
        &self.plan
    }

    pub fn pool(&self) -> &SamplePool {
        &self.pool
    }

    pub fn assembler(&self) -> &BatchAssembler<L> {
        &self.assembler
    }

    fn start_epoch(&mut self) -> Result<()> {
        self.pool.shuffle(&mut self.rng);
        if self.persist_shuffle {
            self.pool.save()?;
        }
        self.epoch += 1;

        info!(
            "start epoch {} with {} batches",
            self.epoch, self.plan.num_windows
        );
        Ok(())
    }

    fn halt(&mut self, err: Error) -> Option<Result<Batch>> {
        self.state = GeneratorState::Halted;
        Some(Err(err))
    }
}

impl<L, R> Iterator for BatchGenerator<L, R>
where
    L: ImageLoader,
    R: Rng,
{
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                GeneratorState::Idle => {
                    self.state = GeneratorState::EpochStart;
                }
                GeneratorState::EpochStart => {
                    if let Err(err) = self.start_epoch() {
                        return self.halt(err);
                    }
                    self.state = GeneratorState::Batching { window: 0 };
                }
                GeneratorState::Batching { window } => {
                    let ids = match self.plan.window(window, self.pool.ids()) {
                        Some(ids) => ids,
                        None => {
                            self.state = GeneratorState::EpochStart;
                            continue;
                        }
                    };
                    self.state = GeneratorState::Batching { window: window + 1 };

                    match self.assembler.assemble(&ids) {
                        Ok(batch) => {
                            self.step += 1;
                            debug!(
                                "epoch {} batch {}/{} (step {})",
                                self.epoch,
                                window + 1,
                                self.plan.num_windows,
                                self.step
                            );
                            return Some(Ok(batch));
                        }
                        Err(err) => return self.halt(err),
                    }
                }
                GeneratorState::Halted => return None,
            }
        }
    }
}
