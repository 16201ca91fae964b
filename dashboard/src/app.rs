use anyhow::Result;
use base64::{Engine as _, engine::general_purpose};
use chrono::Local;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use futures_util::StreamExt;
use std::io::{Write, stdout};
use std::time::Duration;
use tokio::time;
use tracing::{info, warn};

use crate::api::StatsClient;
use crate::config::DashboardConfig;
use crate::flagged::FlaggedList;
use crate::generator::RequestGenerator;
use crate::poll::{Poller, Update};
use crate::scheduler::{FirstTick, RepeatTimer};
use crate::state::{AppState, FollowUp, InputMode, StatusLine};
use crate::tui;

const TICK_RATE: u64 = 100;

/// キー入力の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

pub async fn run(config: DashboardConfig) -> Result<()> {
    let client = StatsClient::new(&config.base_url);
    let (poller, mut updates) = Poller::channel(client);
    let (flagged, mut selections) = FlaggedList::channel();
    let mut state = AppState::new(flagged, RequestGenerator::new(config.spam_interval));

    // 全体の更新は起動直後から
    let mut poll_timer = RepeatTimer::new(config.poll_interval, FirstTick::Immediate);
    poll_timer.start();
    // キー別の再取得は設定されている場合のみ、選択後に開始
    let mut drilldown_timer = RepeatTimer::new(
        config.drilldown_interval.unwrap_or(config.poll_interval),
        FirstTick::AfterPeriod,
    );
    let repoll = config.drilldown_interval.is_some();

    info!(base_url = %config.base_url, "dashboard started");

    // TUIの初期化
    let mut terminal = tui::init()?;

    let app_result = async {
        let mut redraw = time::interval(Duration::from_millis(TICK_RATE));
        let mut event_stream = EventStream::new();

        loop {
            tokio::select! {
                // 定期的な描画タイミング
                _ = redraw.tick() => {
                    terminal.draw(|f| tui::ui(f, &state))?;
                }

                _ = poll_timer.tick() => poller.refresh_global(),

                _ = drilldown_timer.tick() => on_drilldown_tick(&state, &poller),

                _ = state.generator.next_repeat() => state.generator.send_once(&poller),

                Some(update) = updates.recv() => on_update(&mut state, &poller, update),

                Some(key) = selections.recv() => {
                    on_selection(&mut state, &poller, &mut drilldown_timer, key, repoll);
                }

                // キー入力イベントの処理
                Some(Ok(event)) = event_stream.next() => {
                    if let Event::Key(key) = event {
                        if key.kind == KeyEventKind::Press
                            && handle_key(&mut state, &poller, key.code) == Control::Quit
                        {
                            break;
                        }
                    }
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    // TUIの終了処理
    tui::restore()?;
    info!("dashboard stopped");

    app_result
}

/// 取得結果を反映し、管理操作の後は全体を取り直す
pub fn on_update(state: &mut AppState, poller: &Poller, update: Update) {
    if state.apply(update, Local::now()) == FollowUp::RefreshGlobal {
        poller.refresh_global();
    }
}

/// 一覧で選択されたら次の周期を待たずに履歴を取得する
pub fn on_selection(
    state: &mut AppState,
    poller: &Poller,
    drilldown_timer: &mut RepeatTimer,
    key: String,
    repoll: bool,
) {
    poller.refresh_drilldown(&key);
    state.select_key(key);
    if repoll {
        drilldown_timer.restart();
    }
}

pub fn on_drilldown_tick(state: &AppState, poller: &Poller) {
    if let Some(key) = state.selected_key.as_deref() {
        poller.refresh_drilldown(key);
    }
}

pub fn handle_key(state: &mut AppState, poller: &Poller, code: KeyCode) -> Control {
    if state.input_mode == InputMode::Editing {
        match code {
            KeyCode::Enter => state.submit_editing(),
            KeyCode::Esc => state.cancel_editing(),
            KeyCode::Backspace => {
                state.editing_text.pop();
            }
            KeyCode::Char(c) => state.editing_text.push(c),
            _ => {}
        }
        return Control::Continue;
    }

    match code {
        // 終了
        KeyCode::Char('q') => return Control::Quit,
        // 一覧のカーソル移動
        KeyCode::Up | KeyCode::Char('k') => state.flagged.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => state.flagged.select_next(),
        KeyCode::Esc => state.flagged.unselect(),
        // カーソル位置のキーを選択
        KeyCode::Enter => {
            state.flagged.activate();
        }
        KeyCode::Char('s') => state.generator.send_once(poller),
        KeyCode::Char(' ') => {
            state.generator.toggle_repeat();
        }
        KeyCode::Char('r') => poller.refresh_global(),
        KeyCode::Char('/') => state.start_editing(),
        KeyCode::Char('u') => match state.selected_key.as_deref() {
            Some(key) => {
                info!(key, "unblock requested");
                poller.unblock(key);
            }
            None => state.status = Some(StatusLine::error("no key selected")),
        },
        KeyCode::Char('x') => {
            info!("incident log clear requested");
            poller.clear_logs();
        }
        // 選択中のキーをクリップボードにコピー
        KeyCode::Char('c') => {
            if let Some(key) = state.selected_key.clone() {
                match copy_to_clipboard(&key) {
                    Ok(()) => state.status = Some(StatusLine::info(format!("copied {key}"))),
                    Err(e) => warn!(error = %e, "failed to copy to clipboard"),
                }
            }
        }
        _ => {}
    }
    Control::Continue
}

/// OSC 52 のエスケープシーケンス（`\x1b]52;c;{Base64文字列}\x07`）
fn osc52_sequence(text: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(text);
    format!("\x1b]52;c;{}\x07", encoded)
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    // ターミナルが解釈してクリップボードに設定する
    let mut out = stdout();
    write!(out, "{}", osc52_sequence(text))?;
    out.flush()?;

    Ok(())
}
