#![no_std]

extern crate alloc;

use kyber_noise::cbd::CbdSampler;
use kyber_noise::params::{HarnessConfig, KyberVariant, TermLayout};
use kyber_noise::pipeline::NoisePipeline;
use kyber_noise::prf::Shake256Prf;
use kyber_noise::report::ReportEmitter;
use kyber_noise::seed::{RngEntropy, Seed};
use kyber_noise::timing::StepClock;
use kyber_noise::trigger::{RecordingPin, TriggerController};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

/// Fixed-capacity sink, as a device would use for a serial line.
struct LineBuffer {
    bytes: [u8; 8192],
    len: usize,
}

impl core::fmt::Write for LineBuffer {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let end = self.len + s.len();
        if end > self.bytes.len() {
            return Err(core::fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

#[test]
fn test_nostd_run_and_report() {
    let config = HarnessConfig {
        variant: KyberVariant::Kyber1024,
        layout: TermLayout::Split,
        ..HarnessConfig::default()
    };
    let mut trigger = TriggerController::new(RecordingPin::new());
    trigger.configure().expect("pin configures");
    let mut pipeline = NoisePipeline::new(trigger, StepClock::new(1), Shake256Prf, CbdSampler);

    let mut entropy = RngEntropy::new(ChaCha20Rng::from_seed([9u8; 32]));
    let seed = Seed::acquire(&mut entropy).expect("ChaCha never runs dry");
    let run = pipeline.run(&seed, &config.terms()).expect("run succeeds");
    assert_eq!(run.results.len(), 5);

    let sink = LineBuffer {
        bytes: [0u8; 8192],
        len: 0,
    };
    let mut emitter = ReportEmitter::new(sink, config.row_width).expect("row width is valid");
    emitter.emit(&seed, &run).expect("report fits the buffer");
    let sink = emitter.into_inner();
    let text = core::str::from_utf8(&sink.bytes[..sink.len]).expect("report is ascii");
    assert!(text.ends_with("end\n"));
}

#[test]
fn test_nostd_report_overflow_is_an_error() {
    let mut trigger = TriggerController::new(RecordingPin::new());
    trigger.configure().expect("pin configures");
    let mut pipeline = NoisePipeline::new(trigger, StepClock::new(1), Shake256Prf, CbdSampler);
    let seed = Seed::from_bytes([0u8; 32]);
    let run = pipeline
        .run(&seed, &HarnessConfig::default().terms())
        .expect("run succeeds");

    struct Tiny(usize);
    impl core::fmt::Write for Tiny {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            self.0 += s.len();
            if self.0 > 100 {
                Err(core::fmt::Error)
            } else {
                Ok(())
            }
        }
    }
    let mut emitter = ReportEmitter::new(Tiny(0), 16).expect("row width is valid");
    assert!(emitter.emit(&seed, &run).is_err());
}
