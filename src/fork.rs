use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tracing::trace;

// フォーク
// 誰が持っているかは Mutex の中だけで管理する
// 外から状態を書き換えられるのは pickup と put_down (ForkGuard の drop) だけ
#[derive(Debug)]
pub struct Fork {
    id: usize,
    holder: Mutex<Option<usize>>, // 持っている哲学者の席番号。None なら空き
    cond: Condvar,                // 空くのを待つ哲学者用
}

// フォークを持っている間だけ存在する型
// drop されるとフォークを置く
#[derive(Debug)]
pub struct ForkGuard<'a> {
    fork: &'a Fork,
    seat: usize,
}

impl Fork {
    pub fn new(id: usize) -> Self {
        Fork {
            id,
            holder: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// 空くまでブロックしてから取る。失敗はしない
    pub fn pickup(&self, seat: usize) -> ForkGuard<'_> {
        let mut holder = self.lock_holder();
        while holder.is_some() {
            holder = self
                .cond
                .wait(holder)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *holder = Some(seat);
        trace!(fork = self.id, seat, "fork picked up");

        ForkGuard { fork: self, seat }
    }

    /// patience だけ待っても空かなければ None
    pub fn pickup_within(&self, seat: usize, patience: Duration) -> Option<ForkGuard<'_>> {
        let holder = self.lock_holder();
        // spurious wakeup があるので wait_timeout_while で条件ごと待つ
        let (mut holder, _) = self
            .cond
            .wait_timeout_while(holder, patience, |h| h.is_some())
            .unwrap_or_else(PoisonError::into_inner);

        if holder.is_some() {
            trace!(fork = self.id, seat, ?patience, "fork still busy");
            return None;
        }
        *holder = Some(seat);
        trace!(fork = self.id, seat, "fork picked up");

        Some(ForkGuard { fork: self, seat })
    }

    fn put_down(&self, seat: usize) {
        let mut holder = self.lock_holder();
        // 持っていない人が置くのはバグなので即座に落とす
        assert_eq!(
            *holder,
            Some(seat),
            "fork {} put down by seat {seat} which does not hold it",
            self.id
        );
        *holder = None;
        trace!(fork = self.id, seat, "fork put down");
        self.cond.notify_one();
    }

    // holder の更新途中で panic することはないので、poison されても中身は壊れていない
    fn lock_holder(&self) -> MutexGuard<'_, Option<usize>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn holder(&self) -> Option<usize> {
        *self.lock_holder()
    }
}

impl<'a> ForkGuard<'a> {
    pub fn fork_id(&self) -> usize {
        self.fork.id
    }

    pub fn put_down(self) {
        // 実際に置くのは drop
        drop(self);
    }
}

impl<'a> Drop for ForkGuard<'a> {
    fn drop(&mut self) {
        self.fork.put_down(self.seat);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        sync::{mpsc, Arc},
        thread,
    };

    #[test]
    fn test_pickup_records_holder() {
        let fork = Fork::new(3);
        let guard = fork.pickup(1);
        assert_eq!(guard.fork_id(), 3);
        assert_eq!(fork.holder(), Some(1));

        guard.put_down();
        assert_eq!(fork.holder(), None);
    }

    #[test]
    fn test_drop_puts_down() {
        let fork = Fork::new(0);
        {
            let _guard = fork.pickup(2);
            assert_eq!(fork.holder(), Some(2));
        }
        assert_eq!(fork.holder(), None);
    }

    #[test]
    fn test_pickup_within_times_out_while_held() {
        let fork = Fork::new(0);
        let _guard = fork.pickup(0);

        assert!(fork.pickup_within(1, Duration::from_millis(20)).is_none());
        assert_eq!(fork.holder(), Some(0));
    }

    #[test]
    fn test_pickup_within_free_fork() {
        let fork = Fork::new(0);
        let guard = fork.pickup_within(4, Duration::from_millis(20));
        assert!(guard.is_some());
        assert_eq!(fork.holder(), Some(4));
    }

    #[test]
    fn test_waiter_wakes_after_put_down() {
        let fork = Arc::new(Fork::new(0));
        let guard = fork.pickup(0);

        let (tx, rx) = mpsc::channel();
        let fork0 = fork.clone();
        let t = thread::spawn(move || {
            let g = fork0.pickup(1);
            tx.send(g.fork_id()).unwrap();
        });

        // 持っている間は取れない
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        guard.put_down();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(0));
        t.join().unwrap();
        assert_eq!(fork.holder(), None);
    }

    #[test]
    fn test_mutual_exclusion_under_contention() {
        const NUM_THREADS: usize = 4;
        const NUM_LOOP: usize = 10000;

        let fork = Arc::new(Fork::new(0));
        let inside = Arc::new(Mutex::new(0usize));
        let mut v = Vec::new();

        for seat in 0..NUM_THREADS {
            let fork0 = fork.clone();
            let inside0 = inside.clone();
            let t = thread::spawn(move || {
                for _ in 0..NUM_LOOP {
                    let _guard = fork0.pickup(seat);
                    let mut n = inside0.lock().unwrap();
                    *n += 1;
                    assert_eq!(*n, 1, "two holders at once");
                    *n -= 1;
                }
            });
            v.push(t);
        }

        for t in v {
            t.join().unwrap();
        }
        assert_eq!(fork.holder(), None);
    }

    #[test]
    #[should_panic(expected = "does not hold it")]
    fn test_put_down_without_holding_panics() {
        let fork = Fork::new(7);
        fork.put_down(0);
    }

    #[test]
    #[should_panic(expected = "does not hold it")]
    fn test_put_down_by_other_seat_panics() {
        let fork = Fork::new(7);
        let guard = fork.pickup(0);
        std::mem::forget(guard);
        fork.put_down(1);
    }
}
