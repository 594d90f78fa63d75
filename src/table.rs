use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    error::{DiningError, Result},
    event::Observer,
    fork::Fork,
    philosopher::{Conduct, Philosopher},
    rendezvous::Rendezvous,
};

// フォークを取る順番の決め方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickupOrder {
    // 番号の小さいほうから取る
    // 席 0..N-2 は左 (i) -> 右 (i+1)、席 N-1 だけ右 (0) -> 左 (N-1) になる
    #[default]
    Ranked,
    // 全員が左 -> 右。席 N-1 が N-1 -> 0 と取るので待ちの輪が閉じる
    LeftFirst,
}

impl PickupOrder {
    /// seat 番目の哲学者が (先に取る, 後に取る) フォーク番号
    pub fn forks_for(self, seat: usize, seats: usize) -> (usize, usize) {
        let left = seat;
        let right = (seat + 1) % seats;
        match self {
            PickupOrder::Ranked => (left.min(right), left.max(right)),
            PickupOrder::LeftFirst => (left, right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Names {
    Numbered(String), // prefix + 席番号
    Listed(Vec<String>),
}

impl Default for Names {
    fn default() -> Self {
        Names::Numbered("A".to_string())
    }
}

impl Names {
    fn resolve(&self, seats: usize) -> Result<Vec<String>> {
        match self {
            Names::Numbered(prefix) => Ok((0..seats).map(|i| format!("{prefix}{i}")).collect()),
            Names::Listed(names) if names.len() == seats => Ok(names.clone()),
            Names::Listed(names) => Err(DiningError::NameCountMismatch {
                seats,
                names: names.len(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableConfig {
    pub seats: usize,
    pub names: Names,
    pub order: PickupOrder,
    pub patience: Option<Duration>,
    pub think_for: Duration,
    pub lockstep: Option<Duration>, // Some(grace) なら1本目を取った後に全員を待つ
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            seats: 5,
            names: Names::default(),
            order: PickupOrder::default(),
            patience: None,
            think_for: Duration::ZERO,
            lockstep: None,
        }
    }
}

// 円卓。フォークの輪と哲学者を組み立てて、全員を同時に走らせる
#[derive(Debug)]
pub struct Table {
    forks: Vec<Arc<Fork>>, // 組み立て後は変わらない
    philosophers: Vec<Philosopher>,
    conduct: Conduct,
}

impl Table {
    pub fn new(config: &TableConfig) -> Result<Self> {
        let seats = config.seats;
        if seats < 2 {
            return Err(DiningError::TooFewSeats { seats });
        }
        let names = config.names.resolve(seats)?;

        let forks: Vec<Arc<Fork>> = (0..seats).map(|id| Arc::new(Fork::new(id))).collect();
        let philosophers = names
            .into_iter()
            .enumerate()
            .map(|(seat, name)| {
                let (first, second) = config.order.forks_for(seat, seats);
                Philosopher::new(seat, name, forks[first].clone(), forks[second].clone())
            })
            .collect();

        let conduct = Conduct {
            patience: config.patience,
            think_for: config.think_for,
            rendezvous: config
                .lockstep
                .map(|grace| Arc::new(Rendezvous::new(seats, grace))),
        };
        debug!(seats, order = ?config.order, ?conduct, "table laid");

        Ok(Table {
            forks,
            philosophers,
            conduct,
        })
    }

    pub fn seats(&self) -> usize {
        self.forks.len()
    }

    pub fn philosophers(&self) -> &[Philosopher] {
        &self.philosophers
    }

    /// 席ごとの (先に取る, 後に取る) フォーク番号
    pub fn assignments(&self) -> Vec<(usize, usize)> {
        self.philosophers.iter().map(Philosopher::pickup_order).collect()
    }

    /// 全員をスレッドで走らせ、全員が終わるまで待つ
    /// 誰か1人でも失敗したら最初の失敗を返す (それでも全員の join はする)
    pub fn run(self, observer: Arc<dyn Observer>) -> Result<()> {
        info!(seats = self.seats(), "seating philosophers");
        let conduct = Arc::new(self.conduct);

        let mut v: Vec<(String, JoinHandle<Result<()>>)> = Vec::new();
        let mut spawn_err = None;
        for mut p in self.philosophers {
            let name = p.name().to_string();
            let conduct0 = conduct.clone();
            let observer0 = observer.clone();
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || p.dine(&conduct0, &*observer0));

            match spawned {
                Ok(t) => {
                    debug!(philosopher = %name, "seated");
                    v.push((name, t));
                }
                Err(e) => {
                    // 座れた人だけ待つ。lockstep だと grace が過ぎるまで進まない
                    warn!(philosopher = %name, error = %e, "could not seat");
                    spawn_err = Some(DiningError::Spawn {
                        philosopher: name,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        let mut first_err = spawn_err;
        for (name, t) in v {
            let outcome = match t.join() {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(philosopher = %name, "panicked");
                    Err(DiningError::Panicked { philosopher: name })
                }
            };
            if let Err(e) = outcome {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                info!("all philosophers are full");
                Ok(())
            }
        }
    }
}
