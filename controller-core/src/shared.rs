//! Lock-free state shared between the acquisition and dispatch contexts.
//!
//! [`SharedInputState`] stores an [`InputState`] as three 32-bit words, one
//! per field group. Each group is written with a single atomic store, so a
//! reader never observes a torn group. Groups are independent: a reader may
//! see buttons from one pass and sticks from the next.
//!
//! [`PublishOnce`] is the startup handshake: a pointer written exactly once
//! with release ordering and read with acquire ordering.

use core::ptr;
use portable_atomic::{AtomicPtr, AtomicU32, Ordering};

use crate::types::{AnalogStick, Buttons, InputState};

const FLAG_AUX_PRESENT: u8 = 1 << 0;

/// [`InputState`] published field-group by field-group.
///
/// Only the acquisition context calls [`publish`](Self::publish); every other
/// context only calls [`snapshot`](Self::snapshot).
pub struct SharedInputState {
    buttons: AtomicU32,
    sticks: AtomicU32,
    triggers: AtomicU32,
}

impl SharedInputState {
    /// Create a shared state holding [`InputState::neutral`].
    #[must_use]
    pub const fn new() -> Self {
        let n = InputState::neutral();
        Self {
            buttons: AtomicU32::new(n.buttons.raw()),
            sticks: AtomicU32::new(pack_sticks(n.left_stick, n.right_stick)),
            triggers: AtomicU32::new(pack_triggers(n.left_trigger, n.right_trigger, 0)),
        }
    }

    /// Store a complete pass. One atomic store per field group.
    #[inline]
    pub fn publish(&self, state: &InputState) {
        let flags = if state.aux_present { FLAG_AUX_PRESENT } else { 0 };
        self.buttons.store(state.buttons.raw(), Ordering::Relaxed);
        self.sticks
            .store(pack_sticks(state.left_stick, state.right_stick), Ordering::Relaxed);
        self.triggers.store(
            pack_triggers(state.left_trigger, state.right_trigger, flags),
            Ordering::Relaxed,
        );
    }

    /// Read the current state. One atomic load per field group.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> InputState {
        let [lx, ly, rx, ry] = self.sticks.load(Ordering::Relaxed).to_le_bytes();
        let [lt, rt, flags, _] = self.triggers.load(Ordering::Relaxed).to_le_bytes();
        InputState {
            buttons: self.held(),
            left_stick: AnalogStick::new(lx, ly),
            right_stick: AnalogStick::new(rx, ry),
            left_trigger: lt,
            right_trigger: rt,
            aux_present: flags & FLAG_AUX_PRESENT != 0,
        }
    }

    /// Read only the button group.
    #[inline]
    #[must_use]
    pub fn held(&self) -> Buttons {
        Buttons(self.buttons.load(Ordering::Relaxed))
    }
}

impl Default for SharedInputState {
    fn default() -> Self {
        Self::new()
    }
}

const fn pack_sticks(left: AnalogStick, right: AnalogStick) -> u32 {
    u32::from_le_bytes([left.x, left.y, right.x, right.y])
}

const fn pack_triggers(lt: u8, rt: u8, flags: u8) -> u32 {
    u32::from_le_bytes([lt, rt, flags, 0])
}

/// A `&'static T` that transitions once from empty to populated.
///
/// Readers that observe the populated state also observe every write the
/// publisher made before publishing.
pub struct PublishOnce<T: 'static> {
    ptr: AtomicPtr<T>,
}

impl<T: 'static> PublishOnce<T> {
    /// Create an empty handle.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Publish `value`. Returns `false` if a value was already published,
    /// in which case the first value stays.
    pub fn publish(&self, value: &'static T) -> bool {
        self.ptr
            .compare_exchange(
                ptr::null_mut(),
                ptr::from_ref(value).cast_mut(),
                Ordering::Release,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// The published value, or `None` while still empty.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&'static T> {
        let p = self.ptr.load(Ordering::Acquire);
        // SAFETY: the only non-null value ever stored comes from a
        // `&'static T` in `publish`, and it is never written through.
        unsafe { p.as_ref() }
    }

    /// Busy-wait until a value is published.
    pub fn wait(&self) -> &'static T {
        loop {
            if let Some(value) = self.get() {
                return value;
            }
            core::hint::spin_loop();
        }
    }

    /// Check whether a value has been published.
    #[inline]
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.get().is_some()
    }
}

impl<T: 'static> Default for PublishOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::types::Button;
    use std::boxed::Box;

    #[test]
    fn test_publish_then_snapshot() {
        let shared = SharedInputState::new();
        assert_eq!(shared.snapshot(), InputState::neutral());

        let mut state = InputState::neutral();
        state.press(Button::RF1);
        state.press(Button::LT5);
        state.left_stick = AnalogStick::new(10, 250);
        state.right_stick = AnalogStick::new(0, 255);
        state.left_trigger = 140;
        state.right_trigger = 3;
        state.aux_present = true;
        shared.publish(&state);

        assert_eq!(shared.snapshot(), state);
        assert_eq!(shared.held(), state.buttons);
    }

    #[test]
    fn test_publish_once_keeps_first_value() {
        let first: &'static u32 = Box::leak(Box::new(1));
        let second: &'static u32 = Box::leak(Box::new(2));
        let handle = PublishOnce::new();

        assert!(handle.get().is_none());
        assert!(!handle.is_published());
        assert!(handle.publish(first));
        assert!(!handle.publish(second));
        assert_eq!(handle.get(), Some(&1));
        assert_eq!(*handle.wait(), 1);
    }
}
