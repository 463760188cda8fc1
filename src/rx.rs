//! Receive queue between the transport interrupt and the control loop.
//!
//! A bounded byte queue built on `critical-section` and `heapless::Deque`.
//! The transport ISR pushes raw bytes through [`RxProducer`]; the control
//! loop drains them through [`RxConsumer`] once per service pass.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

/// Error returned when pushing into a full queue. Carries the lost byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxOverflow(pub u8);

/// Bounded, interrupt-safe byte queue.
pub struct RxQueue<const SIZE: usize> {
    inner: Mutex<RefCell<Deque<u8, SIZE>>>,
}

impl<const SIZE: usize> RxQueue<SIZE> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Handle for the interrupt side.
    pub const fn producer(&self) -> RxProducer<'_, SIZE> {
        RxProducer { queue: self }
    }

    /// Handle for the control-loop side.
    pub const fn consumer(&self) -> RxConsumer<'_, SIZE> {
        RxConsumer { queue: self }
    }

    fn push(&self, byte: u8) -> Result<(), RxOverflow> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.push_back(byte).map_err(RxOverflow)
        })
    }

    fn pop(&self) -> Option<u8> {
        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            queue.pop_front()
        })
    }
}

impl<const SIZE: usize> Default for RxQueue<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Push side of an [`RxQueue`]. Cheap to copy into an ISR.
#[derive(Clone, Copy)]
pub struct RxProducer<'a, const SIZE: usize> {
    queue: &'a RxQueue<SIZE>,
}

impl<const SIZE: usize> RxProducer<'_, SIZE> {
    /// Push one received byte.
    ///
    /// Returns `Err(RxOverflow(byte))` when the queue is full; the transport
    /// treats that as a dropped byte, not a fault.
    pub fn push(&self, byte: u8) -> Result<(), RxOverflow> {
        self.queue.push(byte)
    }
}

/// Drain side of an [`RxQueue`].
#[derive(Clone, Copy)]
pub struct RxConsumer<'a, const SIZE: usize> {
    queue: &'a RxQueue<SIZE>,
}

impl<const SIZE: usize> RxConsumer<'_, SIZE> {
    /// Pop the oldest queued byte, if any.
    pub fn pop(&self) -> Option<u8> {
        self.queue.pop()
    }
}
