use std::{sync::Arc, thread, time::Duration};

use rand::Rng;
use tracing::{trace, warn};

use crate::{
    error::{DiningError, Result},
    event::{Action, Event, Observer},
    fork::{Fork, ForkGuard},
    rendezvous::Rendezvous,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Thinking,
    Eating,
    Finished,
}

// 食事の作法。全員で共有する
#[derive(Debug, Clone, Default)]
pub struct Conduct {
    pub patience: Option<Duration>,           // None なら空くまでずっと待つ
    pub think_for: Duration,                  // 考える時間の上限。実際は 0..=think_for のランダム
    pub rendezvous: Option<Arc<Rendezvous>>,  // 1本目を取った後に全員を待つ (敵対的スケジュール)
}

impl Conduct {
    fn ponder(&self) {
        let max = self.think_for.as_micros() as u64;
        if max == 0 {
            return;
        }
        let us = rand::thread_rng().gen_range(0..=max);
        thread::sleep(Duration::from_micros(us));
    }
}

#[derive(Debug)]
pub struct Philosopher {
    seat: usize,
    name: String,
    state: State,
    forks: [Arc<Fork>; 2], // [先に取る, 後に取る]。左右の順とは限らない
}

impl Philosopher {
    pub fn new(seat: usize, name: impl Into<String>, first: Arc<Fork>, second: Arc<Fork>) -> Self {
        Philosopher {
            seat,
            name: name.into(),
            state: State::Thinking,
            forks: [first, second],
        }
    }

    pub fn seat(&self) -> usize {
        self.seat
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// (先に取るフォーク, 後に取るフォーク)
    pub fn pickup_order(&self) -> (usize, usize) {
        (self.forks[0].id(), self.forks[1].id())
    }

    /// Thinking -> Eating -> Finished を一度だけ回る
    pub fn dine(&mut self, conduct: &Conduct, observer: &dyn Observer) -> Result<()> {
        // 持っているフォーク。Eating の間だけ2本になる
        let mut held: Vec<ForkGuard<'_>> = Vec::with_capacity(2);

        loop {
            match self.state {
                State::Thinking => {
                    observer.notify(&Event::new(self.seat, &self.name, Action::Think));
                    conduct.ponder();

                    for (nth, fork) in self.forks.iter().enumerate() {
                        let guard = match conduct.patience {
                            None => fork.pickup(self.seat),
                            Some(patience) => match fork.pickup_within(self.seat, patience) {
                                Some(guard) => guard,
                                None => {
                                    warn!(philosopher = %self.name, fork = fork.id(), ?patience, "giving up");
                                    observer.notify(&Event::new(
                                        self.seat,
                                        &self.name,
                                        Action::GiveUp(fork.id()),
                                    ));
                                    put_down_all(self.seat, &self.name, &mut held, observer);
                                    return Err(DiningError::Timeout {
                                        philosopher: self.name.clone(),
                                        fork: fork.id(),
                                        waited: patience,
                                    });
                                }
                            },
                        };
                        observer.notify(&Event::new(self.seat, &self.name, Action::PickUp(fork.id())));
                        held.push(guard);

                        if nth == 0 {
                            if let Some(rendezvous) = &conduct.rendezvous {
                                let complete = rendezvous.arrive();
                                trace!(philosopher = %self.name, complete, "left rendezvous");
                            }
                        }
                    }
                    self.state = State::Eating;
                }
                State::Eating => {
                    debug_assert_eq!(held.len(), 2);
                    observer.notify(&Event::new(self.seat, &self.name, Action::Eat));
                    // 取った順に置く
                    put_down_all(self.seat, &self.name, &mut held, observer);
                    self.state = State::Finished;
                }
                State::Finished => {
                    observer.notify(&Event::new(self.seat, &self.name, Action::Full));
                    return Ok(());
                }
            }
        }
    }
}

// 置く前に通知する
// こうしておけば、通知の並びの上で同じフォークの保持区間が重なることはない
fn put_down_all(seat: usize, name: &str, held: &mut Vec<ForkGuard<'_>>, observer: &dyn Observer) {
    for guard in held.drain(..) {
        observer.notify(&Event::new(seat, name, Action::PutDown(guard.fork_id())));
        guard.put_down();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transcript::Transcript;

    fn pair(a: usize, b: usize) -> (Arc<Fork>, Arc<Fork>) {
        (Arc::new(Fork::new(a)), Arc::new(Fork::new(b)))
    }

    #[test]
    fn test_dine_once() {
        let (f0, f4) = pair(0, 4);
        let mut p = Philosopher::new(4, "A4", f0, f4);
        let transcript = Transcript::new();

        assert_eq!(p.state(), State::Thinking);
        p.dine(&Conduct::default(), &transcript).unwrap();
        assert_eq!(p.state(), State::Finished);

        let actions: Vec<Action> = transcript.events().into_iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                Action::Think,
                Action::PickUp(0),
                Action::PickUp(4),
                Action::Eat,
                Action::PutDown(0),
                Action::PutDown(4),
                Action::Full,
            ]
        );
    }

    #[test]
    fn test_forks_free_after_dining() {
        let (f1, f2) = pair(1, 2);
        let mut p = Philosopher::new(1, "A1", f1.clone(), f2.clone());
        p.dine(&Conduct::default(), &Transcript::new()).unwrap();

        assert!(f1.pickup_within(9, Duration::ZERO).is_some());
        assert!(f2.pickup_within(9, Duration::ZERO).is_some());
    }

    #[test]
    fn test_gives_up_and_returns_first_fork() {
        let (f0, f1) = pair(0, 1);
        // 2本目を誰かが持ったまま
        let _blocker = f1.pickup(99);

        let mut p = Philosopher::new(0, "A0", f0.clone(), f1.clone());
        let conduct = Conduct {
            patience: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let transcript = Transcript::new();

        let err = p.dine(&conduct, &transcript).unwrap_err();
        assert_eq!(
            err,
            DiningError::Timeout {
                philosopher: "A0".to_string(),
                fork: 1,
                waited: Duration::from_millis(20),
            }
        );
        assert_eq!(p.state(), State::Thinking);

        // 1本目は置いてある
        assert!(f0.pickup_within(9, Duration::ZERO).is_some());

        let actions: Vec<Action> = transcript.events().into_iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                Action::Think,
                Action::PickUp(0),
                Action::GiveUp(1),
                Action::PutDown(0),
            ]
        );
    }

    #[test]
    fn test_pickup_order() {
        let (f0, f4) = pair(0, 4);
        let p = Philosopher::new(4, "A4", f0, f4);
        assert_eq!(p.pickup_order(), (0, 4));
        assert_eq!(p.seat(), 4);
        assert_eq!(p.name(), "A4");
    }
}
