use std::fmt;

// 状態遷移とフォークの取得・解放ごとに出るイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Think,
    PickUp(usize), // フォーク番号
    Eat,
    PutDown(usize),
    Full,
    GiveUp(usize), // 待ちきれなかったフォーク
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seat: usize,
    pub name: String,
    pub action: Action,
}

impl Event {
    pub fn new(seat: usize, name: &str, action: Action) -> Self {
        Event {
            seat,
            name: name.to_string(),
            action,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.name;
        match self.action {
            Action::Think => write!(f, "{name} is thinking"),
            Action::PickUp(id) => write!(f, "{name} picked up fork {id}"),
            Action::Eat => write!(f, "{name} is eating"),
            Action::PutDown(id) => write!(f, "{name} put down fork {id}"),
            Action::Full => write!(f, "{name} is full"),
            Action::GiveUp(id) => write!(f, "{name} gave up waiting for fork {id}"),
        }
    }
}

/// 哲学者のスレッドから直接呼ばれるので Send + Sync が必要
pub trait Observer: Send + Sync {
    fn notify(&self, event: &Event);
}

// 1イベント1行で標準出力に書くだけの観測者
#[derive(Debug, Default)]
pub struct Narrator;

impl Observer for Narrator {
    fn notify(&self, event: &Event) {
        println!("{event}");
    }
}
