use core::marker::PhantomData;
use core::sync::atomic::{fence, AtomicUsize, Ordering};

use crate::event::{DefaultEvent, WaitEvent};

/// Ceiling under which the barrier counters stay.
pub const DEFAULT_CEILING: usize = i32::MAX as usize / 2;

/// A reusable rendezvous for a fixed number of cores.
///
/// Both counters only grow until they reach `threshold`, the largest
/// multiple of `parties` under the ceiling. The last core to leave at that
/// point resets them to zero; a core that enters while the reset is still
/// pending backs off and enters again once it has happened.
///
/// There is no failure path. A party that never arrives blocks everyone.
pub struct CpuBarrier<E: WaitEvent = DefaultEvent> {
    parties: usize,
    threshold: usize,
    entered: AtomicUsize,
    left: AtomicUsize,
    _event: PhantomData<fn() -> E>,
}

impl<E: WaitEvent> CpuBarrier<E> {
    /// Create a barrier for `parties` cores.
    pub const fn new(parties: usize) -> Self {
        Self::with_ceiling(parties, DEFAULT_CEILING)
    }

    /// Create a barrier whose counters reset once they reach the largest
    /// multiple of `parties` not above `ceiling`.
    pub const fn with_ceiling(parties: usize, ceiling: usize) -> Self {
        assert!(parties > 0, "barrier needs at least one party");
        assert!(ceiling >= parties, "ceiling below party count");
        Self {
            parties,
            threshold: ceiling - ceiling % parties,
            entered: AtomicUsize::new(0),
            left: AtomicUsize::new(0),
            _event: PhantomData,
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Block until all `parties` cores of the current cohort have called
    /// `wait`, then return on all of them.
    pub fn wait(&self) {
        let n = self.parties;
        let i = loop {
            let i = self.entered.fetch_add(1, Ordering::AcqRel) + 1;
            E::signal();
            if i <= self.threshold {
                break i;
            }
            while self.entered.load(Ordering::Acquire) > self.threshold {
                E::wait();
            }
        };

        let release = ((i - 1) / n + 1) * n;
        while self.entered.load(Ordering::Acquire) < release {
            E::wait();
        }

        let o = self.left.fetch_add(1, Ordering::AcqRel) + 1;
        if o == self.threshold {
            fence(Ordering::Acquire);
            self.left.store(0, Ordering::Relaxed);
            self.entered.store(0, Ordering::Release);
            E::signal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SpinEvent;
    use std::sync::Arc;
    use std::thread;

    struct YieldEvent;

    impl WaitEvent for YieldEvent {
        fn wait() {
            thread::yield_now();
        }
        fn signal() {}
    }

    /// Every core records its arrival for `round` before waiting; after
    /// `wait` returns the whole cohort must be counted, and nobody may have
    /// run ahead by more than one round.
    fn run_rounds(barrier: Arc<CpuBarrier<YieldEvent>>, rounds: usize) {
        let n = barrier.parties();
        let arrivals = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..n)
            .map(|_| {
                let barrier = barrier.clone();
                let arrivals = arrivals.clone();
                thread::spawn(move || {
                    for round in 0..rounds {
                        arrivals.fetch_add(1, Ordering::Relaxed);
                        barrier.wait();
                        let seen = arrivals.load(Ordering::Relaxed);
                        assert!(seen >= (round + 1) * n, "released early in round {}", round);
                        assert!(seen < (round + 2) * n, "cohort overrun in round {}", round);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(arrivals.load(Ordering::Relaxed), rounds * n);
    }

    #[test]
    fn threshold_is_multiple_of_parties() {
        let b = CpuBarrier::<SpinEvent>::with_ceiling(4, 14);
        assert_eq!(b.threshold(), 12);
        let b = CpuBarrier::<SpinEvent>::new(3);
        assert_eq!(b.threshold() % 3, 0);
        assert!(b.threshold() <= DEFAULT_CEILING);
        assert!(DEFAULT_CEILING - b.threshold() < 3);
    }

    #[test]
    fn cohorts_release_together() {
        run_rounds(Arc::new(CpuBarrier::new(4)), 500);
    }

    #[test]
    fn survives_many_resets() {
        // Threshold 12: a reset every third round.
        run_rounds(Arc::new(CpuBarrier::with_ceiling(4, 14)), 600);
    }

    #[test]
    fn reset_at_smallest_threshold() {
        // Threshold equals the party count: every round resets.
        run_rounds(Arc::new(CpuBarrier::with_ceiling(3, 3)), 300);
    }

    #[test]
    fn single_party_never_blocks() {
        let b = CpuBarrier::<YieldEvent>::with_ceiling(1, 5);
        for _ in 0..100 {
            b.wait();
        }
        assert!(b.entered.load(Ordering::Relaxed) <= b.threshold());
    }

    #[test]
    fn writes_before_wait_are_visible_after() {
        const N: usize = 4;
        const ROUNDS: usize = 200;
        let barrier = Arc::new(CpuBarrier::<YieldEvent>::with_ceiling(N, 20));
        let slots: Arc<Vec<AtomicUsize>> = Arc::new((0..N).map(|_| AtomicUsize::new(0)).collect());
        let handles: Vec<_> = (0..N)
            .map(|id| {
                let barrier = barrier.clone();
                let slots = slots.clone();
                thread::spawn(move || {
                    for round in 1..=ROUNDS {
                        slots[id].store(round, Ordering::Relaxed);
                        barrier.wait();
                        for slot in slots.iter() {
                            assert!(slot.load(Ordering::Relaxed) >= round);
                        }
                        barrier.wait();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    #[should_panic(expected = "at least one party")]
    fn zero_parties_rejected() {
        let _ = CpuBarrier::<SpinEvent>::new(0);
    }
}
