use std::{
    sync::{Condvar, Mutex, PoisonError},
    time::Duration,
};

use tracing::debug;

// 全員が1本目のフォークを持つまで待たせるための集合場所
// std::sync::Barrier と違って、揃わなくても grace が過ぎれば通す
// (正しい順序だと全員は揃わないので、普通の Barrier だとそれ自体がデッドロックになる)
#[derive(Debug)]
pub struct Rendezvous {
    expected: usize,
    arrived: Mutex<usize>,
    cond: Condvar,
    grace: Duration,
}

impl Rendezvous {
    pub fn new(expected: usize, grace: Duration) -> Self {
        Rendezvous {
            expected,
            arrived: Mutex::new(0),
            cond: Condvar::new(),
            grace,
        }
    }

    /// 全員揃ったら true、grace が過ぎても揃わなければ false
    pub fn arrive(&self) -> bool {
        let mut arrived = self.arrived.lock().unwrap_or_else(PoisonError::into_inner);
        *arrived += 1;
        if *arrived >= self.expected {
            self.cond.notify_all();
            return true;
        }

        let (arrived, _) = self
            .cond
            .wait_timeout_while(arrived, self.grace, |n| *n < self.expected)
            .unwrap_or_else(PoisonError::into_inner);
        let complete = *arrived >= self.expected;
        if !complete {
            debug!(arrived = *arrived, expected = self.expected, "rendezvous grace elapsed");
        }
        complete
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{sync::Arc, thread, time::Instant};

    #[test]
    fn test_all_arrive() {
        const NUM_THREADS: usize = 4;
        let r = Arc::new(Rendezvous::new(NUM_THREADS, Duration::from_secs(10)));
        let mut v = Vec::new();

        for _ in 0..NUM_THREADS {
            let r0 = r.clone();
            v.push(thread::spawn(move || r0.arrive()));
        }

        for t in v {
            assert!(t.join().unwrap());
        }
    }

    #[test]
    fn test_grace_elapses() {
        let r = Rendezvous::new(2, Duration::from_millis(30));
        let start = Instant::now();

        assert!(!r.arrive());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_single_expected_passes_immediately() {
        let r = Rendezvous::new(1, Duration::from_secs(10));
        assert!(r.arrive());
    }
}
