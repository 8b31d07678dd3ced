//! Platform services consumed by the node

/// Board-level hooks
///
/// Only the clock is mandatory. The remaining hooks default to "not supported".
pub trait Platform {
    /// Milliseconds since an arbitrary epoch, wrapping on overflow
    fn time_ms(&self) -> u32;

    /// Schedules a restart
    ///
    /// Must return without waiting for the restart. Returns `true` if the request was accepted.
    fn request_restart(&mut self) -> bool {
        false
    }

    fn read_unique_id(&self, unique_id: &mut [u8; 16]) {
        unique_id.fill(0);
    }
}

impl<T: Platform + ?Sized> Platform for &mut T {
    fn time_ms(&self) -> u32 {
        T::time_ms(self)
    }

    fn request_restart(&mut self) -> bool {
        T::request_restart(self)
    }

    fn read_unique_id(&self, unique_id: &mut [u8; 16]) {
        T::read_unique_id(self, unique_id)
    }
}
