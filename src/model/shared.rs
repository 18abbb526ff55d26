//! A model shared between threads. Only one step or force evaluation runs at a time; a caller
//! that does not want to wait gets `EngineBusy` instead.
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use crate::errors::{KineticaError, Result};
use crate::model::atomic::AtomicModel;
use crate::model::StepReport;
use crate::potentials::potential::PotentialTerms;

#[derive(Debug, Clone)]
pub struct SharedModel {
    inner: Arc<Mutex<AtomicModel>>,
}

impl SharedModel {
    pub fn new(model: AtomicModel) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    // a step either finishes or has not started mutating, so a poisoned model is still usable
    fn lock(&self) -> MutexGuard<'_, AtomicModel> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_lock(&self) -> Result<MutexGuard<'_, AtomicModel>> {
        match self.inner.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(KineticaError::EngineBusy),
        }
    }

    /// Blocks until the model is free, then advances it.
    pub fn advance(&self, step: usize) -> StepReport {
        self.lock().advance(step)
    }

    pub fn try_advance(&self, step: usize) -> Result<StepReport> {
        Ok(self.try_lock()?.advance(step))
    }

    pub fn try_compute_force(&self, time: f64) -> Result<PotentialTerms> {
        Ok(self.try_lock()?.compute_force(time))
    }

    /// Runs a query against a consistent state of the model.
    pub fn read<T>(&self, query: impl FnOnce(&AtomicModel) -> T) -> T {
        query(&self.lock())
    }

    pub fn write<T>(&self, edit: impl FnOnce(&mut AtomicModel) -> T) -> T {
        edit(&mut self.lock())
    }

    /// Hands the model back once every other handle is gone.
    pub fn into_inner(self) -> std::result::Result<AtomicModel, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap_or_else(|p| p.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }
}
