//! Interruptible mutual exclusion
//!
//! [`InterruptibleMutex`] serialises access like a `std::sync::Mutex`, but a
//! thread blocked in [`lock`](InterruptibleMutex::lock) can be released by
//! an [`Interrupter`] and gets [`Error::Interrupted`] instead of the lock.
//! Threads that already hold the lock are never affected.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::error::{Error, Result};

struct Slot<T> {
    value: Option<T>,
    generation: u64,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    available: Condvar,
}

impl<T> Shared<T> {
    // The slot is only touched inside short critical sections that cannot
    // panic, so a poisoned lock still holds consistent data.
    fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A mutex whose waiters can be cancelled
pub struct InterruptibleMutex<T> {
    shared: Arc<Shared<T>>,
}

impl<T> InterruptibleMutex<T> {
    /// Create a new unlocked mutex
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    value: Some(value),
                    generation: 0,
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Acquire the lock, blocking until it is free or the wait is interrupted
    pub fn lock(&self) -> Result<InterruptibleGuard<'_, T>> {
        let mut slot = self.shared.slot();
        let generation = slot.generation;
        loop {
            if slot.generation != generation {
                return Err(Error::Interrupted);
            }
            if let Some(value) = slot.value.take() {
                return Ok(InterruptibleGuard {
                    owner: self,
                    value: Some(value),
                });
            }
            slot = self
                .shared
                .available
                .wait(slot)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Consume the mutex and return the protected value
    ///
    /// Returns `None` only if a guard was leaked with `mem::forget`.
    pub fn into_inner(self) -> Option<T> {
        self.shared.slot().value.take()
    }

    fn release(&self, value: T) {
        self.shared.slot().value = Some(value);
        // A woken waiter may have been interrupted, so wake them all
        self.shared.available.notify_all();
    }
}

impl<T: Send + 'static> InterruptibleMutex<T> {
    /// Handle that interrupts waiters on this mutex
    pub fn interrupter(&self) -> Interrupter {
        let shared: Arc<dyn Interrupt + Send + Sync> = self.shared.clone();
        Interrupter { shared }
    }
}

/// Exclusive access to the value in an [`InterruptibleMutex`]
pub struct InterruptibleGuard<'a, T> {
    owner: &'a InterruptibleMutex<T>,
    value: Option<T>,
}

impl<T> Deref for InterruptibleGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only emptied in drop
        match &self.value {
            Some(value) => value,
            None => unreachable!("guard used after release"),
        }
    }
}

impl<T> DerefMut for InterruptibleGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("guard used after release"),
        }
    }
}

impl<T> Drop for InterruptibleGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.owner.release(value);
        }
    }
}

trait Interrupt {
    fn interrupt(&self);
}

impl<T> Interrupt for Shared<T> {
    fn interrupt(&self) {
        self.slot().generation += 1;
        self.available.notify_all();
    }
}

/// Cancels threads waiting for an [`InterruptibleMutex`]
///
/// Cloneable and usable from any thread, e.g. a signal-handling thread.
#[derive(Clone)]
pub struct Interrupter {
    shared: Arc<dyn Interrupt + Send + Sync>,
}

impl Interrupter {
    /// Wake every thread currently waiting for the lock with
    /// [`Error::Interrupted`]
    ///
    /// Threads that start waiting afterwards are not affected.
    pub fn interrupt(&self) {
        self.shared.interrupt();
    }
}

impl std::fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Interrupter")
    }
}
