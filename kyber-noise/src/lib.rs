//! Instrumented generation of [Kyber] noise polynomials for side-channel
//! measurement.
//!
//! A harness run draws one seed, then for each noise term (`s`, `e`, `r`,
//! `e1`, `e2` in the reference layout) expands `(seed, nonce)` with
//! SHAKE-256 and maps the output to a centered binomial polynomial. Each term
//! is bracketed by a hardware trigger pulse and a pair of microsecond
//! timestamps, so an oscilloscope capture can be matched to the term that
//! produced it and the harness's own timings can be checked against the
//! measured pulse width.
//!
//! The crate is `no_std` + `alloc` and designed for microcontrollers. The
//! hardware it needs is abstracted behind three traits:
//!
//! - [`trigger::TriggerPin`]: the GPIO line used as trigger,
//! - [`timing::MonotonicClock`]: a microsecond clock,
//! - [`seed::EntropySource`]: a source of seed bytes.
//!
//! [Kyber]: https://pq-crystals.org/kyber/
//!
//! # Usage
//!
//! ```ignore
//! use kyber_noise::{
//!     cbd::CbdSampler, params::HarnessConfig, pipeline::NoisePipeline, prf::Shake256Prf,
//!     report::render, seed::Seed, trigger::TriggerController,
//! };
//!
//! let config = HarnessConfig::default();
//! let mut trigger = TriggerController::new(your_trigger_pin());
//! trigger.configure()?;
//! let mut pipeline = NoisePipeline::new(trigger, your_clock(), Shake256Prf, CbdSampler);
//!
//! let seed = Seed::acquire(&mut your_entropy_source())?;
//! let outcome = pipeline.run(&seed, &config.terms());
//! let report = render(&seed, &outcome, config.row_width)?;
//! ```
//!
//! Enable the `std` feature for a host clock and an adapter that writes
//! reports to `std::io` sinks.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod cbd;
pub mod command;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod poly;
pub mod prf;
pub mod report;
pub mod seed;
pub mod term;
pub mod timing;
pub mod trigger;
pub mod workspace;

pub use error::{ConfigError, HarnessError};
pub use params::{HarnessConfig, KyberVariant, TermLayout, N, SYMBYTES};
pub use pipeline::{NoisePipeline, NoiseRun, RunFailure, TermResult};
pub use poly::NoisePolynomial;
pub use seed::Seed;
pub use term::NoiseTermSpec;
