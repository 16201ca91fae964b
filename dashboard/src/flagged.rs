use regex::Regex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::types::FlaggedSnapshot;

/// 一覧の1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedItem {
    pub key: String,
    pub reason: String,
}

impl FlaggedItem {
    pub fn display(&self) -> String {
        format!("{} - {}", self.key, self.reason)
    }
}

/// フラグ付きキーの一覧。
///
/// 選択はチャネル経由でアプリ側に通知する。一覧の描画と選択後の処理
/// （履歴の取得など）はここでは結び付けない。
#[derive(Debug)]
pub struct FlaggedList {
    items: Vec<FlaggedItem>,
    filter_text: String,
    filter_regex: Option<Regex>,
    cursor: Option<usize>,
    selections: UnboundedSender<String>,
}

impl FlaggedList {
    pub fn channel() -> (Self, UnboundedReceiver<String>) {
        let (selections, rx) = mpsc::unbounded_channel();
        let list = Self {
            items: Vec::new(),
            filter_text: String::new(),
            filter_regex: None,
            cursor: None,
            selections,
        };
        (list, rx)
    }

    /// 一覧をまるごと作り直す。カーソルは同じキーがあればそこに残す
    pub fn render(&mut self, flagged: &FlaggedSnapshot) {
        let highlighted = self.highlighted().map(|item| item.key.clone());

        self.items.clear();
        self.items
            .extend(flagged.iter().map(|(key, entry)| FlaggedItem {
                key: key.clone(),
                reason: entry.reason.clone(),
            }));

        self.cursor = highlighted.and_then(|key| self.visible().position(|item| item.key == key));
    }

    /// フィルタを通った行
    pub fn visible(&self) -> impl Iterator<Item = &FlaggedItem> {
        self.items.iter().filter(|item| match &self.filter_regex {
            Some(regex) => regex.is_match(&item.display()),
            None => true,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn highlighted(&self) -> Option<&FlaggedItem> {
        self.cursor.and_then(|i| self.visible().nth(i))
    }

    pub fn select_next(&mut self) {
        let len = self.visible().count();
        if len == 0 {
            return;
        }

        let i = match self.cursor {
            None => 0,
            Some(i) => {
                if i >= len - 1 {
                    len - 1
                } else {
                    i + 1
                }
            }
        };
        self.cursor = Some(i);
    }

    pub fn select_previous(&mut self) {
        if self.visible().next().is_none() {
            return;
        }

        if let Some(i) = self.cursor {
            self.cursor = Some(i.saturating_sub(1));
        }
    }

    pub fn unselect(&mut self) {
        self.cursor = None;
    }

    /// カーソル位置のキーを選択として通知する
    pub fn activate(&self) -> bool {
        match self.highlighted() {
            Some(item) => {
                self.select(&item.key);
                true
            }
            None => false,
        }
    }

    pub fn select(&self, key: &str) {
        info!(key, "flagged key selected");
        if self.selections.send(key.to_string()).is_err() {
            warn!(key, "selection receiver closed");
        }
    }

    /// ローカルの一覧から取り除く（次回の取得で上書きされる）
    pub fn remove(&mut self, key: &str) {
        let highlighted = self.highlighted().map(|item| item.key.clone());
        self.items.retain(|item| item.key != key);
        self.cursor = highlighted
            .filter(|k| k != key)
            .and_then(|k| self.visible().position(|item| item.key == k));
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    /// 空文字または不正な正規表現ならフィルタ無し
    pub fn set_filter(&mut self, text: String) {
        self.filter_regex = if text.is_empty() {
            None
        } else {
            match Regex::new(&text) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(filter = %text, error = %e, "invalid filter; showing all entries");
                    None
                }
            }
        };
        self.filter_text = text;
        self.cursor = None;
    }
}
