//! Harness module - binds the noise pipeline to STM32H7 peripherals

extern crate alloc;

use alloc::string::String;
use cortex_m::peripheral::{DCB, DWT};
use kyber_noise::cbd::CbdSampler;
use kyber_noise::error::HarnessError;
use kyber_noise::params::HarnessConfig;
use kyber_noise::pipeline::NoisePipeline;
use kyber_noise::prf::Shake256Prf;
use kyber_noise::report::render;
use kyber_noise::seed::{EntropySource, Seed};
use kyber_noise::term::NoiseTermSpec;
use kyber_noise::timing::{ExtendedCounter, MonotonicClock};
use kyber_noise::trigger::{TriggerController, TriggerPin};
use rtt_target::rprintln;
use stm32h7xx_hal::gpio::{Output, Pin, PushPull, Pull, Speed};
use stm32h7xx_hal::pac;
use stm32h7xx_hal::rng::Rng;

/// Trigger output: PB0, active high.
pub type TriggerLine = Pin<'B', 0, Output<PushPull>>;

/// EXTI line shared by every pin 0.
const TRIGGER_EXTI_MASK: u32 = 1 << 0;

/// GPIO trigger for the oscilloscope.
pub struct GpioTrigger {
    pin: TriggerLine,
}

impl GpioTrigger {
    pub fn new(pin: TriggerLine) -> Self {
        Self { pin }
    }
}

impl TriggerPin for GpioTrigger {
    fn configure(&mut self) {
        self.pin.set_internal_resistor(Pull::None);
        self.pin.set_speed(Speed::VeryHigh);
        // Mask the EXTI line and clear both edge selections so the trigger
        // never raises an interrupt of its own.
        unsafe {
            let exti = &*pac::EXTI::ptr();
            exti.cpuimr1.modify(|r, w| w.bits(r.bits() & !TRIGGER_EXTI_MASK));
            exti.rtsr1.modify(|r, w| w.bits(r.bits() & !TRIGGER_EXTI_MASK));
            exti.ftsr1.modify(|r, w| w.bits(r.bits() & !TRIGGER_EXTI_MASK));
        }
    }

    #[inline(always)]
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    #[inline(always)]
    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}

/// Microsecond clock from the DWT cycle counter.
pub struct DwtClock {
    counter: ExtendedCounter,
    cycles_per_us: u64,
}

impl DwtClock {
    pub fn new(dwt: &mut DWT, dcb: &mut DCB, sysclk_mhz: u32) -> Self {
        dcb.enable_trace();
        DWT::unlock();
        dwt.enable_cycle_counter();
        Self {
            counter: ExtendedCounter::new(),
            cycles_per_us: sysclk_mhz as u64,
        }
    }
}

impl MonotonicClock for DwtClock {
    #[inline(always)]
    fn now_us(&mut self) -> u64 {
        self.counter.extend(DWT::cycle_count()) / self.cycles_per_us
    }
}

/// Seed source backed by the RNG peripheral.
pub struct HwEntropy {
    rng: Rng,
}

impl HwEntropy {
    pub fn new(rng: Rng) -> Self {
        Self { rng }
    }
}

impl EntropySource for HwEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), HarnessError> {
        for chunk in buf.chunks_mut(4) {
            let word = self.rng.value().map_err(|_| HarnessError::EntropyUnavailable)?;
            chunk.copy_from_slice(&word.to_le_bytes()[..chunk.len()]);
        }
        Ok(())
    }
}

pub type DevicePipeline = NoisePipeline<GpioTrigger, DwtClock, Shake256Prf, CbdSampler>;

/// Harness owns the pipeline and produces one report per run
pub struct Harness {
    pipeline: DevicePipeline,
    entropy: HwEntropy,
    config: HarnessConfig,
    terms: alloc::vec::Vec<NoiseTermSpec>,
}

impl Harness {
    /// The trigger must already be configured.
    pub fn new(
        trigger: TriggerController<GpioTrigger>,
        clock: DwtClock,
        entropy: HwEntropy,
        config: HarnessConfig,
    ) -> Self {
        let pipeline = NoisePipeline::new(trigger, clock, Shake256Prf, CbdSampler)
            .with_coefficient_check(config.check_coefficients);
        Self {
            pipeline,
            entropy,
            terms: config.terms(),
            config,
        }
    }

    /// Draw a seed to make sure the TRNG works before accepting commands.
    pub fn self_test(&mut self) -> Result<(), HarnessError> {
        Seed::acquire(&mut self.entropy).map(|_| ())
    }

    /// Run the pipeline once and render the report.
    ///
    /// Uses `seed` if given, otherwise a fresh seed from the TRNG.
    pub fn run_once(&mut self, seed: Option<Seed>) -> Result<String, HarnessError> {
        let seed = match seed {
            Some(seed) => seed,
            None => Seed::acquire(&mut self.entropy)?,
        };
        rprintln!("Running {} noise terms...", self.terms.len());

        let outcome = self.pipeline.run_with(&seed, &self.terms, |result| {
            rprintln!(
                "  {} nonce={} eta={}: {} us",
                result.spec.name,
                result.spec.nonce,
                result.spec.distribution_width,
                result.timing.elapsed_us
            );
        });
        match &outcome {
            Ok(run) => rprintln!("Run complete: {} us total", run.total.elapsed_us),
            Err(failure) => rprintln!("ERROR: run failed: {}", failure.error),
        }

        Ok(render(&seed, &outcome, self.config.row_width)?)
    }
}
