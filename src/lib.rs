// 食事する哲学者問題
// 各フォークは Mutex で守られ、哲学者は番号の小さいフォークから取ることで待ちの輪を作らない

pub mod error;
pub mod event;
pub mod fork;
pub mod philosopher;
pub mod rendezvous;
pub mod table;
pub mod transcript;

pub use error::{DiningError, Result};
pub use event::{Action, Event, Narrator, Observer};
pub use fork::{Fork, ForkGuard};
pub use philosopher::{Conduct, Philosopher, State};
pub use rendezvous::Rendezvous;
pub use table::{Names, PickupOrder, Table, TableConfig};
pub use transcript::{Transcript, Violation};
