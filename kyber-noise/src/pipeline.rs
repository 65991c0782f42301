//! Sequencing of one harness run.
//!
//! For every term, in the order given:
//!
//! 1. take a zeroed buffer of `η * N / 4` bytes from the workspace,
//! 2. raise the trigger and read the clock,
//! 3. expand `(seed, nonce)` into the buffer and sample the polynomial,
//! 4. drop the trigger and read the clock again.
//!
//! Everything that can be checked up front (term list, widths, buffer sizes,
//! trigger state) is checked before the first window opens. Logging, range
//! checks and the per-term observer all run between windows.

use alloc::vec::Vec;

use crate::cbd::Sampler;
use crate::error::{ConfigError, HarnessError};
use crate::poly::NoisePolynomial;
use crate::prf::Expander;
use crate::seed::Seed;
use crate::term::{check_buffer_len, validate_terms, NoiseTermSpec};
use crate::timing::{MonotonicClock, PipelineTiming, TimingRecorder, TimingSample};
use crate::trigger::{TriggerController, TriggerPin};
use crate::workspace::NoiseWorkspace;

/// A finished term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermResult {
    pub spec: NoiseTermSpec,
    pub polynomial: NoisePolynomial,
    pub timing: TimingSample,
}

/// A complete run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseRun {
    pub results: Vec<TermResult>,
    pub total: PipelineTiming,
}

impl NoiseRun {
    /// Sum of the per-term elapsed times; never exceeds `total.elapsed_us`.
    pub fn measured_us(&self) -> u64 {
        self.results.iter().map(|r| r.timing.elapsed_us).sum()
    }
}

/// A run that stopped early. Terms finished before the failure are kept so
/// they can still be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub completed: Vec<TermResult>,
    /// The term being processed, `None` if the run never got that far.
    pub failed: Option<NoiseTermSpec>,
    pub error: HarnessError,
}

impl RunFailure {
    fn before_start(error: HarnessError) -> Self {
        Self {
            completed: Vec::new(),
            failed: None,
            error,
        }
    }
}

pub struct NoisePipeline<P, C, X, S> {
    trigger: TriggerController<P>,
    recorder: TimingRecorder<C>,
    expander: X,
    sampler: S,
    workspace: NoiseWorkspace,
    check_coefficients: bool,
}

impl<P, C, X, S> NoisePipeline<P, C, X, S>
where
    P: TriggerPin,
    C: MonotonicClock,
    X: Expander,
    S: Sampler,
{
    /// The trigger must already be configured; see [`TriggerController::configure`].
    pub fn new(trigger: TriggerController<P>, clock: C, expander: X, sampler: S) -> Self {
        Self {
            trigger,
            recorder: TimingRecorder::new(clock),
            expander,
            sampler,
            workspace: NoiseWorkspace::new(),
            check_coefficients: true,
        }
    }

    /// Enable or disable the post-window `|c| <= η` check.
    pub fn with_coefficient_check(mut self, enabled: bool) -> Self {
        self.check_coefficients = enabled;
        self
    }

    pub fn trigger(&self) -> &TriggerController<P> {
        &self.trigger
    }

    pub fn clock_mut(&mut self) -> &mut C {
        self.recorder.clock_mut()
    }

    pub fn into_trigger(self) -> TriggerController<P> {
        self.trigger
    }

    pub fn run(&mut self, seed: &Seed, terms: &[NoiseTermSpec]) -> Result<NoiseRun, RunFailure> {
        self.run_with(seed, terms, |_| {})
    }

    /// Like [`run`](Self::run), calling `observer` after each term's window
    /// has closed.
    pub fn run_with<F>(
        &mut self,
        seed: &Seed,
        terms: &[NoiseTermSpec],
        mut observer: F,
    ) -> Result<NoiseRun, RunFailure>
    where
        F: FnMut(&TermResult),
    {
        self.preflight(terms).map_err(RunFailure::before_start)?;
        log::info!("noise run: {} terms", terms.len());

        let mut results = Vec::with_capacity(terms.len());
        for spec in terms {
            match self.measure(seed, spec) {
                Ok(result) => {
                    log::debug!(
                        "term {} nonce={} eta={}: {} us",
                        spec.name,
                        spec.nonce,
                        spec.distribution_width,
                        result.timing.elapsed_us
                    );
                    observer(&result);
                    results.push(result);
                }
                Err(error) => {
                    self.workspace.clear();
                    log::error!("noise run aborted: {}", error);
                    return Err(RunFailure {
                        completed: results,
                        failed: Some(*spec),
                        error,
                    });
                }
            }
        }
        self.workspace.clear();

        // preflight rejects empty term lists
        let total = match (results.first(), results.last()) {
            (Some(first), Some(last)) => PipelineTiming::spanning(&first.timing, &last.timing),
            _ => return Err(RunFailure::before_start(ConfigError::NoTerms.into())),
        };
        log::info!(
            "noise run complete: {} us total, {} us in windows",
            total.elapsed_us,
            results.iter().map(|r| r.timing.elapsed_us).sum::<u64>()
        );
        Ok(NoiseRun { results, total })
    }

    fn preflight(&mut self, terms: &[NoiseTermSpec]) -> Result<(), HarnessError> {
        validate_terms(terms)?;
        for term in terms {
            if !self.sampler.supports(term.distribution_width) {
                return Err(ConfigError::UnsupportedWidth {
                    term: term.name,
                    width: term.distribution_width,
                }
                .into());
            }
            let needed = term.buffer_len();
            if needed > self.workspace.capacity() {
                return Err(ConfigError::BufferTooLarge {
                    term: term.name,
                    needed,
                    capacity: self.workspace.capacity(),
                }
                .into());
            }
            let consumed = self.sampler.input_len(term.distribution_width);
            check_buffer_len(term.name, term.distribution_width, consumed)?;
        }
        self.trigger.check_idle().map_err(ConfigError::from)?;
        Ok(())
    }

    fn measure(&mut self, seed: &Seed, spec: &NoiseTermSpec) -> Result<TermResult, HarnessError> {
        let len = spec.buffer_len();
        let capacity = self.workspace.capacity();
        let buffer = self
            .workspace
            .noise_buffer(len)
            .ok_or(ConfigError::BufferTooLarge {
                term: spec.name,
                needed: len,
                capacity,
            })?;

        let window = self.trigger.enter().map_err(ConfigError::from)?;
        let start = self.recorder.start();
        let polynomial = self
            .expander
            .expand(seed, spec.nonce, buffer)
            .map_err(|source| HarnessError::Expansion {
                term: spec.name,
                source,
            })
            .and_then(|()| {
                self.sampler
                    .sample(buffer, spec.distribution_width)
                    .map_err(|source| HarnessError::Sampling {
                        term: spec.name,
                        source,
                    })
            });
        window.exit();
        let timing = self.recorder.sample(spec.name, start);

        let polynomial = polynomial?;
        if self.check_coefficients {
            polynomial
                .check_range(spec.distribution_width)
                .map_err(|source| HarnessError::Sampling {
                    term: spec.name,
                    source,
                })?;
        }
        Ok(TermResult {
            spec: *spec,
            polynomial,
            timing,
        })
    }
}
