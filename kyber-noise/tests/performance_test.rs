use kyber_noise::cbd::CbdSampler;
use kyber_noise::params::{noise_terms, KyberVariant, TermLayout};
use kyber_noise::pipeline::NoisePipeline;
use kyber_noise::prf::Shake256Prf;
use kyber_noise::seed::{RngEntropy, Seed};
use kyber_noise::timing::MonotonicClock;
use kyber_noise::trigger::{RecordingPin, TriggerController};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::time::Instant;

struct InstantClock(Instant);

impl MonotonicClock for InstantClock {
    fn now_us(&mut self) -> u64 {
        self.0.elapsed().as_micros() as u64
    }
}

#[test]
fn test_pipeline_timing_on_host() {
    let iterations = 20;
    let mut trigger = TriggerController::new(RecordingPin::new());
    trigger.configure().unwrap();
    let mut pipeline =
        NoisePipeline::new(trigger, InstantClock(Instant::now()), Shake256Prf, CbdSampler);
    let mut entropy = RngEntropy::new(ChaCha20Rng::from_seed([1u8; 32]));

    println!("\n=== Noise Pipeline Timing ===");

    for variant in [KyberVariant::Kyber512, KyberVariant::Kyber768] {
        let terms = noise_terms(variant, TermLayout::Split);
        let mut window_total = 0u64;
        let mut run_total = 0u64;

        for i in 0..iterations {
            // fresh seed every cycle
            let seed = Seed::acquire(&mut entropy).unwrap();
            let start = Instant::now();
            let run = pipeline.run(&seed, &terms).unwrap();
            let wall = start.elapsed();

            assert!(run.measured_us() <= run.total.elapsed_us);
            assert!(run.total.elapsed_us as u128 <= wall.as_micros() + 1);
            window_total += run.measured_us();
            run_total += run.total.elapsed_us;

            if i < 3 {
                println!(
                    "  {} iteration {}: windows={}us total={}us wall={:?}",
                    variant.name(),
                    i + 1,
                    run.measured_us(),
                    run.total.elapsed_us,
                    wall
                );
            }
        }

        println!(
            "  {} average: windows={}us total={}us",
            variant.name(),
            window_total / iterations,
            run_total / iterations
        );
    }
}
