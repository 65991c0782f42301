#![no_std]
#![no_main]

use panic_rtt_target as _;
use rtt_target::{rprintln, rtt_init_print};

use cortex_m_rt::entry;
use kyber_noise::params::HarnessConfig;
use kyber_noise::trigger::TriggerController;
use stm32h7xx_hal::{pac, prelude::*, rcc::rec::UsbClkSel};

// USB imports
use stm32h7xx_hal::usb_hs::{UsbBus, USB1};
use usb_device::device::UsbDeviceBuilder;
use usb_device::prelude::*;
use usbd_serial::{SerialPort, USB_CLASS_CDC};

// Set up the global allocator for heap allocations
use embedded_alloc::Heap;

#[global_allocator]
static HEAP: Heap = Heap::empty();

mod harness;
mod usb;

use harness::{DwtClock, GpioTrigger, Harness, HwEntropy};
use kyber_noise::command::Command;
use usb::UsbCommandHandler;

/// Core clock; the DWT clock divides cycles by this to get microseconds
const SYSCLK_MHZ: u32 = 200;

// Heap for run results and the rendered report
const HEAP_SIZE: usize = 64 * 1024;

// Simple delay function
fn delay_ms(ms: u32) {
    for _ in 0..(ms * 10000) {
        cortex_m::asm::nop();
    }
}

fn halt() -> ! {
    loop {
        cortex_m::asm::nop();
    }
}

/// USB-driven Kyber noise measurement harness
///
/// Workflow:
/// 1. Configure the trigger pin (PB0) low, start the cycle counter, test the TRNG
/// 2. Wait for a `RUN` command over USB
/// 3. Generate the noise terms, pulsing PB0 around each one
/// 4. Send the report back via USB
#[entry]
fn main() -> ! {
    // Initialize RTT for debug output
    rtt_init_print!();
    rprintln!("=== STM32H743 Kyber Noise Harness ===");
    rprintln!("Initializing...");

    // Get device peripherals
    let dp = pac::Peripherals::take().unwrap();
    let mut cp = cortex_m::Peripherals::take().unwrap();

    let pwr = dp.PWR.constrain();
    let pwrcfg = pwr.freeze();
    let rcc = dp.RCC.constrain();
    let mut ccdr = rcc.sys_ck(SYSCLK_MHZ.MHz()).freeze(pwrcfg, &dp.SYSCFG);

    // Configure USB clock - use HSI48 (internal 48MHz oscillator)
    rprintln!("Configuring USB clock...");
    let _ = ccdr.clocks.hsi48_ck().expect("HSI48 must run");
    ccdr.peripheral.kernel_usb_clk_mux(UsbClkSel::Hsi48);

    // Enable USB voltage regulator (required for some H7 variants)
    unsafe {
        let pwr = &*pac::PWR::ptr();
        pwr.cr3.modify(|_, w| w.usbregen().set_bit());
        delay_ms(10);
    }
    rprintln!("USB power configured");

    // Setup LED on PE3; never touched while a trigger window is open
    let gpioe = dp.GPIOE.split(ccdr.peripheral.GPIOE);
    let mut led = gpioe.pe3.into_push_pull_output();

    // Trigger on PB0, forced low once before any measurement
    let gpiob = dp.GPIOB.split(ccdr.peripheral.GPIOB);
    let trigger_pin = GpioTrigger::new(gpiob.pb0.into_push_pull_output());
    let mut trigger = TriggerController::new(trigger_pin);
    if trigger.configure().is_err() {
        rprintln!("ERROR: Trigger pin configuration failed");
        halt();
    }
    rprintln!("Trigger initialized on PB0 (idle low)");

    // Initialize heap allocator
    rprintln!("Setting up heap allocator ({}KB)...", HEAP_SIZE / 1024);
    {
        use core::mem::MaybeUninit;
        static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
        unsafe {
            let heap_ptr = core::ptr::addr_of_mut!(HEAP_MEM);
            HEAP.init((*heap_ptr).as_mut_ptr() as usize, HEAP_SIZE)
        }
    }

    let clock = DwtClock::new(&mut cp.DWT, &mut cp.DCB, SYSCLK_MHZ);
    let rng = dp.RNG.constrain(ccdr.peripheral.RNG, &ccdr.clocks);
    let mut harness = Harness::new(trigger, clock, HwEntropy::new(rng), HarnessConfig::default());

    rprintln!("Testing hardware RNG...");
    if let Err(err) = harness.self_test() {
        rprintln!("ERROR: {}", err);
        halt();
    }
    rprintln!("RNG ok");

    // Setup USB - USB1 OTG FS on PA11/PA12
    rprintln!("Initializing USB...");
    let gpioa = dp.GPIOA.split(ccdr.peripheral.GPIOA);
    let usb_dm = gpioa.pa11.into_alternate::<10>();
    let usb_dp = gpioa.pa12.into_alternate::<10>();

    // USB endpoint memory
    static mut EP_MEMORY: [u32; 1024] = [0; 1024];

    let usb = USB1::new(
        dp.OTG1_HS_GLOBAL,
        dp.OTG1_HS_DEVICE,
        dp.OTG1_HS_PWRCLK,
        usb_dm,
        usb_dp,
        ccdr.peripheral.USB1OTG,
        &ccdr.clocks,
    );
    let usb_bus = UsbBus::new(usb, unsafe { &mut *core::ptr::addr_of_mut!(EP_MEMORY) });
    let mut serial = SerialPort::new(&usb_bus);

    // Use STM32 VID/PID for CDC device (0x0483:0x5740)
    let mut usb_dev = UsbDeviceBuilder::new(&usb_bus, UsbVidPid(0x0483, 0x5740))
        .device_class(USB_CLASS_CDC)
        .build();
    rprintln!("USB initialized successfully!");

    // Give USB time to enumerate
    delay_ms(2000);

    rprintln!("\n=== Ready: send RUN or RUN <seed hex> ===\n");

    let mut handler = UsbCommandHandler::new();
    let mut runs = 0u32;

    loop {
        if usb_dev.poll(&mut [&mut serial]) {
            handler.receive(&mut serial);
        } else if !handler.has_pending() {
            continue;
        }

        let Some(Command::Run(seed)) = handler.next_command() else {
            continue;
        };

        runs += 1;
        rprintln!("Run {} requested", runs);
        led.set_high();
        let report = match harness.run_once(seed) {
            Ok(report) => report,
            Err(err) => {
                // TRNG failures are not retried
                rprintln!("ERROR: {}", err);
                led.set_low();
                halt();
            }
        };
        led.set_low();

        handler.send_report(&mut usb_dev, &mut serial, report.as_bytes());
        rprintln!("Ready for next run\n");
    }
}
