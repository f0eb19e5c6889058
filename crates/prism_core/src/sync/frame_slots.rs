//! # Multi-Slot Frame Buffers
//!
//! K >= 2 physical copies of a per-frame resource, written round-robin.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────────────────┐
//!                    │          FrameSlots<T>          │
//!                    │                                 │
//!                    │  ┌────────┐ ┌────────┐ ┌──────┐ │
//!                    │  │ Slot 0 │ │ Slot 1 │ │ ...  │ │
//!                    │  └────────┘ └────────┘ └──────┘ │
//!                    │  in-flight frame per slot       │
//!                    └─────────────────────────────────┘
//!                              │
//!              ┌───────────────┼────────────────────┐
//!              ▼               ▼                    ▼
//!      ┌──────────────┐ ┌────────────┐ ┌──────────────────┐
//!      │  SlotWriter  │ │ read(tkt)  │ │ CompletionHandle │
//!      │  (producer)  │ │ (consumer) │ │  (GPU callback)  │
//!      └──────────────┘ └────────────┘ └──────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! - `SlotWriter`: exclusive access to the next slot (one at a time)
//! - `read`: shared access to a submitted slot (many allowed)
//! - `CompletionHandle`: `Send + Clone`, signals from any thread

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::SyncError;

/// Identifies a submitted frame and the slot holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTicket {
    /// Frame number.
    pub frame: u64,
    /// Physical slot index.
    pub slot: usize,
}

struct Slot<T> {
    data: RwLock<T>,
    /// Frame the consumer has not finished with yet.
    in_flight: Mutex<Option<u64>>,
}

/// Round-robin multi-slot storage keyed to consumer completion signals.
///
/// ## Usage
///
/// ```rust,ignore
/// let slots = FrameSlots::new(3, Vec::new)?;
/// let completions = slots.completion_handle();
///
/// loop {
///     let mut writer = slots.begin_frame(Duration::from_millis(100))?;
///     writer.clear();
///     writer.extend(draws);
///     let ticket = writer.submit();
///
///     // GPU side, once the command buffer finishes:
///     completions.signal(ticket);
/// }
/// ```
pub struct FrameSlots<T> {
    slots: Box<[Slot<T>]>,
    /// Next frame number to hand out.
    next_frame: AtomicU64,
    /// Whether a writer is currently held.
    writer_active: AtomicBool,
    completion_tx: Sender<FrameTicket>,
    completion_rx: Receiver<FrameTicket>,
}

impl<T> FrameSlots<T> {
    /// Creates `count` slots, each initialised by `init`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TooFewSlots`] if `count < 2`.
    pub fn new(count: usize, mut init: impl FnMut() -> T) -> Result<Self, SyncError> {
        if count < 2 {
            return Err(SyncError::TooFewSlots(count));
        }
        let slots = (0..count)
            .map(|_| Slot {
                data: RwLock::new(init()),
                in_flight: Mutex::new(None),
            })
            .collect();
        let (completion_tx, completion_rx) = crossbeam_channel::unbounded();
        Ok(Self {
            slots,
            next_frame: AtomicU64::new(0),
            writer_active: AtomicBool::new(false),
            completion_tx,
            completion_rx,
        })
    }

    /// Number of physical slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of frames submitted so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.next_frame.load(Ordering::Acquire)
    }

    /// Number of slots the consumer still holds.
    #[must_use]
    pub fn frames_in_flight(&self) -> usize {
        self.drain_completions();
        self.slots
            .iter()
            .filter(|slot| slot.in_flight.lock().is_some())
            .count()
    }

    /// A cloneable handle the consumer uses to signal frame completion.
    #[must_use]
    pub fn completion_handle(&self) -> CompletionHandle {
        CompletionHandle {
            tx: self.completion_tx.clone(),
        }
    }

    /// Marks a submitted frame as finished by the consumer.
    pub fn complete(&self, ticket: FrameTicket) {
        self.release(ticket);
    }

    /// Takes the next slot for writing without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WriterActive`] if a writer is already held, or
    /// [`SyncError::SlotInFlight`] if the consumer still holds the next slot.
    pub fn try_begin_frame(&self) -> Result<SlotWriter<'_, T>, SyncError> {
        if self.writer_active.swap(true, Ordering::AcqRel) {
            return Err(SyncError::WriterActive);
        }
        self.drain_completions();

        let frame = self.next_frame.load(Ordering::Acquire);
        let slot = (frame % self.slots.len() as u64) as usize;

        let busy = *self.slots[slot].in_flight.lock();
        if let Some(busy) = busy {
            self.writer_active.store(false, Ordering::Release);
            tracing::trace!(slot, in_flight = busy, "next frame slot still in flight");
            return Err(SyncError::SlotInFlight { slot, frame: busy });
        }

        Ok(SlotWriter {
            owner: self,
            data: self.slots[slot].data.write(),
            frame,
            slot,
        })
    }

    /// Takes the next slot for writing, waiting up to `timeout` for the
    /// consumer to release it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Timeout`] if no completion arrives in time, or
    /// [`SyncError::WriterActive`] if a writer is already held.
    pub fn begin_frame(&self, timeout: Duration) -> Result<SlotWriter<'_, T>, SyncError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.try_begin_frame() {
                Err(SyncError::SlotInFlight { slot, frame }) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match self.completion_rx.recv_timeout(remaining) {
                        Ok(ticket) => self.release(ticket),
                        Err(_) => {
                            tracing::warn!(slot, frame, ?timeout, "frame slot back-pressure timeout");
                            return Err(SyncError::Timeout);
                        }
                    }
                }
                other => return other,
            }
        }
    }

    /// Shared access to a submitted frame the consumer has not yet completed.
    #[must_use]
    pub fn read(&self, ticket: FrameTicket) -> Option<RwLockReadGuard<'_, T>> {
        let slot = self.slots.get(ticket.slot)?;
        // Guard first: no writer can take the slot while it is held
        let data = slot.data.read();
        if *slot.in_flight.lock() != Some(ticket.frame) {
            return None;
        }
        Some(data)
    }

    fn drain_completions(&self) {
        for ticket in self.completion_rx.try_iter() {
            self.release(ticket);
        }
    }

    fn release(&self, ticket: FrameTicket) {
        if let Some(slot) = self.slots.get(ticket.slot) {
            let mut in_flight = slot.in_flight.lock();
            if *in_flight == Some(ticket.frame) {
                *in_flight = None;
            }
        }
    }
}

/// Exclusive write access to one slot for one frame.
///
/// Dropping the writer without [`SlotWriter::submit`] discards the frame;
/// the next writer reuses its frame number and slot.
pub struct SlotWriter<'a, T> {
    owner: &'a FrameSlots<T>,
    data: RwLockWriteGuard<'a, T>,
    frame: u64,
    slot: usize,
}

impl<T> SlotWriter<'_, T> {
    /// Frame number being written.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Physical slot being written.
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Hands the slot to the consumer.
    #[must_use]
    pub fn submit(self) -> FrameTicket {
        *self.owner.slots[self.slot].in_flight.lock() = Some(self.frame);
        self.owner.next_frame.store(self.frame + 1, Ordering::Release);
        FrameTicket {
            frame: self.frame,
            slot: self.slot,
        }
    }
}

impl<T> Deref for SlotWriter<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for SlotWriter<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T> Drop for SlotWriter<'_, T> {
    fn drop(&mut self) {
        self.owner.writer_active.store(false, Ordering::Release);
    }
}

/// Consumer-side frame completion signal.
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    tx: Sender<FrameTicket>,
}

impl CompletionHandle {
    /// Signals that the consumer has finished reading `ticket`'s slot.
    pub fn signal(&self, ticket: FrameTicket) {
        if self.tx.send(ticket).is_err() {
            tracing::trace!(frame = ticket.frame, "completion after frame slots dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_too_few_slots() {
        assert_eq!(
            FrameSlots::new(1, || 0u32).err(),
            Some(SyncError::TooFewSlots(1))
        );
    }

    #[test]
    fn test_round_robin() {
        let slots = FrameSlots::new(2, || 0u32).unwrap();

        let t0 = slots.try_begin_frame().unwrap().submit();
        let t1 = slots.try_begin_frame().unwrap().submit();
        assert_eq!((t0.frame, t0.slot), (0, 0));
        assert_eq!((t1.frame, t1.slot), (1, 1));
        assert_eq!(slots.frames_in_flight(), 2);

        // Slot 0 still in flight: frame 2 must not overwrite it
        assert_eq!(
            slots.try_begin_frame().err(),
            Some(SyncError::SlotInFlight { slot: 0, frame: 0 })
        );

        slots.complete(t0);
        let t2 = slots.try_begin_frame().unwrap().submit();
        assert_eq!((t2.frame, t2.slot), (2, 0));
    }

    #[test]
    fn test_writer_is_exclusive() {
        let slots = FrameSlots::new(2, || 0u32).unwrap();
        let writer = slots.try_begin_frame().unwrap();
        assert_eq!(slots.try_begin_frame().err(), Some(SyncError::WriterActive));
        drop(writer);
        assert!(slots.try_begin_frame().is_ok());
    }

    #[test]
    fn test_dropped_writer_discards_frame() {
        let slots = FrameSlots::new(2, || 0u32).unwrap();
        {
            let mut writer = slots.try_begin_frame().unwrap();
            *writer = 99;
        }
        assert_eq!(slots.frame_count(), 0);

        let writer = slots.try_begin_frame().unwrap();
        assert_eq!(writer.frame(), 0);
        assert_eq!(writer.slot(), 0);
    }

    #[test]
    fn test_read_only_submitted_frames() {
        let slots = FrameSlots::new(2, Vec::new).unwrap();
        let mut writer = slots.try_begin_frame().unwrap();
        writer.push(7u32);
        let ticket = writer.submit();

        assert_eq!(slots.read(ticket).as_deref(), Some(&vec![7]));

        slots.complete(ticket);
        assert!(slots.read(ticket).is_none());
        assert!(slots.read(FrameTicket { frame: 0, slot: 9 }).is_none());
    }

    #[test]
    fn test_completion_handle_from_other_thread() {
        let slots = FrameSlots::new(2, || 0u32).unwrap();
        let handle = slots.completion_handle();

        let t0 = slots.try_begin_frame().unwrap().submit();
        let _t1 = slots.try_begin_frame().unwrap().submit();

        let signaller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            handle.signal(t0);
        });

        let writer = slots.begin_frame(Duration::from_secs(5)).unwrap();
        assert_eq!(writer.slot(), 0);
        assert_eq!(writer.frame(), 2);
        signaller.join().unwrap();
    }

    #[test]
    fn test_begin_frame_times_out() {
        let slots = FrameSlots::new(2, || 0u32).unwrap();
        let _t0 = slots.try_begin_frame().unwrap().submit();
        let _t1 = slots.try_begin_frame().unwrap().submit();

        assert_eq!(
            slots.begin_frame(Duration::from_millis(5)).err(),
            Some(SyncError::Timeout)
        );
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let slots = FrameSlots::new(2, || 0u32).unwrap();
        let t0 = slots.try_begin_frame().unwrap().submit();
        slots.complete(t0);
        let _t1 = slots.try_begin_frame().unwrap().submit();
        let t2 = slots.try_begin_frame().unwrap().submit();

        // Completing frame 0 again must not free frame 2's slot
        slots.complete(t0);
        assert!(slots.read(t2).is_some());
    }

    #[test]
    fn test_read_never_sees_a_later_frame() {
        let slots = FrameSlots::new(2, || u64::MAX).unwrap();
        let (ticket_tx, ticket_rx) = crossbeam_channel::bounded::<FrameTicket>(1);
        let handle = slots.completion_handle();

        thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..5_000 {
                    let mut writer = slots.begin_frame(Duration::from_secs(5)).unwrap();
                    let frame = writer.frame();
                    *writer = frame;
                    let _ = ticket_tx.send(writer.submit());
                }
                drop(ticket_tx);
            });

            let mut previous: Option<FrameTicket> = None;
            for ticket in ticket_rx.iter() {
                assert_eq!(slots.read(ticket).as_deref(), Some(&ticket.frame));
                handle.signal(ticket);
                // Racing the producer: a released frame reads as gone or as itself
                if let Some(stale) = previous {
                    if let Some(data) = slots.read(stale) {
                        assert_eq!(*data, stale.frame);
                    }
                }
                previous = Some(ticket);
            }
        });
    }
}
