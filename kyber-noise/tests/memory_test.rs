use kyber_noise::cbd::CbdSampler;
use kyber_noise::params::{noise_terms, KyberVariant, TermLayout};
use kyber_noise::pipeline::NoisePipeline;
use kyber_noise::prf::Shake256Prf;
use kyber_noise::seed::Seed;
use kyber_noise::timing::StepClock;
use kyber_noise::trigger::{TriggerController, TriggerPin};
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

// Allocation tracking, per thread so parallel tests do not interfere
struct TrackingAllocator;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

fn allocations() -> usize {
    ALLOCATIONS.try_with(|c| c.get()).unwrap_or(0)
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|c| c.set(c.get() + 1));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
    }
}

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

/// Snapshots the allocation counter at every edge.
#[derive(Default)]
struct AllocProbePin {
    high: bool,
    opened_at: usize,
    allocations_in_windows: Vec<usize>,
}

impl TriggerPin for AllocProbePin {
    fn configure(&mut self) {
        self.allocations_in_windows.reserve(16);
    }

    fn set_high(&mut self) {
        self.high = true;
        self.opened_at = allocations();
    }

    fn set_low(&mut self) {
        if self.high {
            let delta = allocations() - self.opened_at;
            // capacity reserved in configure, so this push never allocates
            self.allocations_in_windows.push(delta);
        }
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

#[test]
fn test_no_allocation_inside_trigger_windows() {
    println!("\n=== Allocations inside trigger windows ===");

    let mut trigger = TriggerController::new(AllocProbePin::default());
    trigger.configure().unwrap();
    let mut pipeline = NoisePipeline::new(trigger, StepClock::new(1), Shake256Prf, CbdSampler);

    let seed = Seed::from_bytes([42u8; 32]);
    let terms = noise_terms(KyberVariant::Kyber512, TermLayout::Split);

    let before = allocations();
    let run = pipeline.run(&seed, &terms).unwrap();
    let after = allocations();
    println!("Allocations during run: {}", after - before);

    let pin = pipeline.into_trigger().into_pin();
    println!("Per window: {:?}", pin.allocations_in_windows);
    assert_eq!(pin.allocations_in_windows.len(), run.results.len());
    assert!(pin.allocations_in_windows.iter().all(|&n| n == 0));
}
