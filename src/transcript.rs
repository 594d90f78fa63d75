use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use thiserror::Error;

use crate::event::{Action, Event, Observer};

// イベントを届いた順に全部記録する観測者
// 記録は Mutex の中で行うので、全スレッドのイベントが1本の列に並ぶ
#[derive(Debug, Default)]
pub struct Transcript {
    events: Mutex<Vec<Event>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("fork {fork} picked up by seat {seat} while seat {holder} holds it")]
    DoubleHold { fork: usize, seat: usize, holder: usize },

    #[error("fork {fork} put down by seat {seat} which does not hold it")]
    ForeignPutDown { fork: usize, seat: usize },

    #[error("seat {seat} went through {actual:?}, expected {expected:?}")]
    Lifecycle {
        seat: usize,
        expected: Vec<Action>,
        actual: Vec<Action>,
    },

    #[error("fork {fork} still held by seat {holder} at the end")]
    Unreleased { fork: usize, holder: usize },
}

impl Observer for Transcript {
    fn notify(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, pred: impl Fn(&Action) -> bool) -> usize {
        self.events().iter().filter(|e| pred(&e.action)).count()
    }

    /// フォークごとの取得回数
    pub fn pickups_per_fork(&self) -> HashMap<usize, usize> {
        let mut counts = HashMap::new();
        for e in self.events() {
            if let Action::PickUp(fork) = e.action {
                *counts.entry(fork).or_insert(0) += 1;
            }
        }
        counts
    }

    /// 同じフォークを2人が同時に持った瞬間がないか
    pub fn check_mutual_exclusion(&self) -> Result<(), Violation> {
        check_mutual_exclusion(&self.events())
    }

    /// 各哲学者が Think, 取る, 取る, Eat, 置く, 置く, Full の順に一度だけ進んだか
    /// pickup_order は席ごとの (先に取る, 後に取る)
    pub fn check_lifecycles(&self, pickup_order: &[(usize, usize)]) -> Result<(), Violation> {
        check_lifecycles(&self.events(), pickup_order)
    }
}

pub fn check_mutual_exclusion(events: &[Event]) -> Result<(), Violation> {
    // フォーク番号 -> 持っている席
    let mut holders: HashMap<usize, usize> = HashMap::new();

    for e in events {
        match e.action {
            Action::PickUp(fork) => {
                if let Some(&holder) = holders.get(&fork) {
                    return Err(Violation::DoubleHold {
                        fork,
                        seat: e.seat,
                        holder,
                    });
                }
                holders.insert(fork, e.seat);
            }
            Action::PutDown(fork) => {
                if holders.get(&fork) != Some(&e.seat) {
                    return Err(Violation::ForeignPutDown { fork, seat: e.seat });
                }
                holders.remove(&fork);
            }
            _ => {}
        }
    }

    // 番号の小さい順に報告する
    match holders.into_iter().min() {
        Some((fork, holder)) => Err(Violation::Unreleased { fork, holder }),
        None => Ok(()),
    }
}

pub fn check_lifecycles(events: &[Event], pickup_order: &[(usize, usize)]) -> Result<(), Violation> {
    let mut per_seat: Vec<Vec<Action>> = vec![Vec::new(); pickup_order.len()];
    for e in events {
        if let Some(actions) = per_seat.get_mut(e.seat) {
            actions.push(e.action);
        }
    }

    for (seat, (actual, &(first, second))) in per_seat.into_iter().zip(pickup_order).enumerate() {
        let expected = vec![
            Action::Think,
            Action::PickUp(first),
            Action::PickUp(second),
            Action::Eat,
            Action::PutDown(first),
            Action::PutDown(second),
            Action::Full,
        ];
        if actual != expected {
            return Err(Violation::Lifecycle {
                seat,
                expected,
                actual,
            });
        }
    }
    Ok(())
}
