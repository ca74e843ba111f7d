// ==============================================================================
// early_stop.rs - Validation-Loss Early Stopping
// ==============================================================================
// Description: Patience counter that keeps the best model seen so far
// Author: Matt Barham
// Created: 2026-01-14
// Modified: 2026-01-17
// Version: 1.0.0
// ==============================================================================

use tracing::{debug, info, warn};

/// Early-stopping monitor.
///
/// Call [`EarlyStop::step`] once per epoch with the validation loss and the
/// current model. A loss strictly below the best so far resets the counter
/// and snapshots the model; anything else increments the counter. Once the
/// counter reaches `patience` the monitor stays stopped.
#[derive(Debug, Clone)]
pub struct EarlyStop<M: Clone> {
    patience: usize,
    counter: usize,
    best_loss: f64,
    stopped: bool,
    best_model: Option<M>,
}

impl<M: Clone> EarlyStop<M> {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            counter: 0,
            best_loss: f64::INFINITY,
            stopped: false,
            best_model: None,
        }
    }

    /// Record one epoch. Returns whether training should stop.
    pub fn step(&mut self, val_loss: f64, model: &M) -> bool {
        if self.stopped {
            warn!("Early stop already triggered; ignoring loss {:.6}", val_loss);
            return true;
        }

        if val_loss < self.best_loss {
            debug!("Validation loss improved {:.6} -> {:.6}", self.best_loss, val_loss);
            self.best_loss = val_loss;
            self.counter = 0;
            self.best_model = Some(model.clone());
        } else {
            self.counter += 1;
            debug!("No improvement ({}/{})", self.counter, self.patience);
            if self.counter >= self.patience {
                info!("Early stop after {} epochs without improvement", self.counter);
                self.stopped = true;
            }
        }

        self.stopped
    }

    pub fn should_stop(&self) -> bool {
        self.stopped
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn best_model(&self) -> Option<&M> {
        self.best_model.as_ref()
    }

    pub fn into_best_model(self) -> Option<M> {
        self.best_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improvement_resets_counter() {
        let mut stop = EarlyStop::new(2);
        assert!(!stop.step(1.0, &"epoch1"));
        assert!(!stop.step(1.5, &"epoch2"));
        assert!(!stop.step(0.5, &"epoch3"));
        assert!(!stop.step(0.7, &"epoch4"));
        assert_eq!(stop.best_model(), Some(&"epoch3"));
        assert_eq!(stop.best_loss(), 0.5);
    }

    #[test]
    fn test_stops_after_patience_and_stays_stopped() {
        let mut stop = EarlyStop::new(2);
        stop.step(1.0, &1);
        assert!(!stop.step(1.0, &2));
        assert!(stop.step(2.0, &3));
        assert!(stop.step(0.1, &4));
        assert!(stop.should_stop());
        assert_eq!(stop.into_best_model(), Some(1));
    }

    #[test]
    fn test_plateau_measured_against_best() {
        // 0.9 after 1.2 is not an improvement on 0.8
        let mut stop = EarlyStop::new(3);
        stop.step(0.8, &0);
        stop.step(1.2, &1);
        stop.step(0.9, &2);
        assert!(stop.step(0.85, &3));
        assert_eq!(stop.best_model(), Some(&0));
    }
}
