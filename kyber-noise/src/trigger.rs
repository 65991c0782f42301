//! Hardware trigger for external capture equipment.
//!
//! A [`TriggerController`] owns the one output line that marks measured
//! operations. [`TriggerController::enter`] drives it high and hands back a
//! [`TriggerWindow`]; the line goes low again when the window is dropped, on
//! every exit path. The window mutably borrows the controller, so windows
//! cannot nest and nothing else can touch the pin while one is open.

use alloc::vec::Vec;

use crate::error::TriggerError;

/// The raw output line.
///
/// Implementations talk to GPIO registers directly and must not log, sleep or
/// otherwise take time beyond the register access itself.
pub trait TriggerPin {
    /// Make the line a driven push-pull output with pulls and edge
    /// interrupts disabled.
    fn configure(&mut self);

    fn set_high(&mut self);

    fn set_low(&mut self);

    fn is_set_high(&self) -> bool;
}

/// Owner of the trigger line.
pub struct TriggerController<P> {
    pin: P,
    configured: bool,
    entries: u32,
    exits: u32,
}

impl<P: TriggerPin> TriggerController<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            configured: false,
            entries: 0,
            exits: 0,
        }
    }

    /// Configure the line and force it low. Allowed exactly once.
    pub fn configure(&mut self) -> Result<(), TriggerError> {
        if self.configured {
            return Err(TriggerError::AlreadyConfigured);
        }
        self.pin.configure();
        self.pin.set_low();
        self.configured = true;
        log::debug!("trigger pin configured, idle low");
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Ready to open a window: configured and currently low.
    pub fn check_idle(&self) -> Result<(), TriggerError> {
        if !self.configured {
            return Err(TriggerError::NotConfigured);
        }
        if self.pin.is_set_high() {
            return Err(TriggerError::NotIdle);
        }
        Ok(())
    }

    /// Drive the line high until the returned window is dropped.
    pub fn enter(&mut self) -> Result<TriggerWindow<'_, P>, TriggerError> {
        self.check_idle()?;
        self.pin.set_high();
        self.entries += 1;
        Ok(TriggerWindow { controller: self })
    }

    /// Windows opened since creation.
    pub fn entries(&self) -> u32 {
        self.entries
    }

    /// Windows closed since creation.
    pub fn exits(&self) -> u32 {
        self.exits
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }

    pub fn into_pin(self) -> P {
        self.pin
    }
}

/// An open trigger window. The line is high for exactly as long as this lives.
pub struct TriggerWindow<'a, P: TriggerPin> {
    controller: &'a mut TriggerController<P>,
}

impl<P: TriggerPin> TriggerWindow<'_, P> {
    /// Close the window. Same as dropping it.
    pub fn exit(self) {}
}

impl<P: TriggerPin> Drop for TriggerWindow<'_, P> {
    fn drop(&mut self) {
        self.controller.pin.set_low();
        self.controller.exits += 1;
    }
}

/// A level change seen by [`RecordingPin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Configured,
    High,
    Low,
}

/// Simulated line that records every write, for host runs and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingPin {
    high: bool,
    history: Vec<Edge>,
}

impl RecordingPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Edge] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Number of low-to-high transitions.
    pub fn rising_edges(&self) -> usize {
        let mut high = false;
        let mut count = 0;
        for edge in &self.history {
            match edge {
                Edge::High if !high => {
                    count += 1;
                    high = true;
                }
                Edge::Low => high = false,
                _ => {}
            }
        }
        count
    }
}

impl TriggerPin for RecordingPin {
    fn configure(&mut self) {
        self.history.push(Edge::Configured);
    }

    fn set_high(&mut self) {
        self.high = true;
        self.history.push(Edge::High);
    }

    fn set_low(&mut self) {
        self.high = false;
        self.history.push(Edge::Low);
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_forces_low_once() {
        let mut trigger = TriggerController::new(RecordingPin::new());
        trigger.configure().unwrap();
        assert_eq!(trigger.pin().history(), &[Edge::Configured, Edge::Low]);
        assert_eq!(trigger.configure(), Err(TriggerError::AlreadyConfigured));
    }

    #[test]
    fn test_enter_requires_configuration() {
        let mut trigger = TriggerController::new(RecordingPin::new());
        assert!(matches!(trigger.enter(), Err(TriggerError::NotConfigured)));
        assert!(trigger.pin().history().is_empty());
    }

    #[test]
    fn test_window_drives_high_then_low() {
        let mut trigger = TriggerController::new(RecordingPin::new());
        trigger.configure().unwrap();
        {
            let window = trigger.enter().unwrap();
            window.exit();
        }
        assert_eq!(
            trigger.pin().history(),
            &[Edge::Configured, Edge::Low, Edge::High, Edge::Low]
        );
        assert_eq!((trigger.entries(), trigger.exits()), (1, 1));
        assert!(!trigger.pin().is_set_high());
    }

    #[test]
    fn test_window_closes_on_error_path() {
        fn failing(trigger: &mut TriggerController<RecordingPin>) -> Result<(), TriggerError> {
            let _window = trigger.enter()?;
            Err(TriggerError::NotIdle)
        }

        let mut trigger = TriggerController::new(RecordingPin::new());
        trigger.configure().unwrap();
        assert!(failing(&mut trigger).is_err());
        assert!(!trigger.pin().is_set_high());
        assert_eq!(trigger.exits(), 1);
    }

    #[test]
    fn test_refuses_to_enter_while_line_high() {
        let mut trigger = TriggerController::new(RecordingPin::new());
        trigger.configure().unwrap();
        trigger.pin_mut().set_high();
        assert!(matches!(trigger.enter(), Err(TriggerError::NotIdle)));
        assert_eq!(trigger.entries(), 0);
    }

    #[test]
    fn test_rising_edges_counted() {
        let mut trigger = TriggerController::new(RecordingPin::new());
        trigger.configure().unwrap();
        for _ in 0..3 {
            trigger.enter().unwrap().exit();
        }
        assert_eq!(trigger.pin().rising_edges(), 3);
    }
}
