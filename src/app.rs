use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use tokio::sync::oneshot;
use tracing::debug;

use crate::action::{Action, Direction};
use crate::config::{Config, KeybindsConfig, parse_key};
use crate::system::bus::{CollectorHealth, Snapshot, SnapshotBus};
use crate::system::collector::{ProcessControl, ProcessView};
use crate::system::error::ProcessError;
use crate::system::kill::TerminateSignal;
use crate::system::snapshot::{
    CpuSnapshot, Domain, HostSnapshot, MemorySnapshot, NetworkSnapshot, ProcessEntry,
    ProcessSnapshot, SortKey,
};
use crate::ui::dashboard_layout;
use crate::ui::theme::Theme;

/// Page size before the terminal has reported its dimensions.
const PAGE_ROWS: usize = 10;
const STATUS_TTL_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Filter,
    Help,
}

#[derive(Debug, Clone)]
pub struct ResolvedKeybinds {
    pub quit: KeyCode,
    pub filter: KeyCode,
    pub kill: KeyCode,
    pub force_kill: KeyCode,
    pub cycle_sort: KeyCode,
    pub reverse_sort: KeyCode,
    pub help: KeyCode,
}

impl ResolvedKeybinds {
    pub fn from_config(kb: &KeybindsConfig) -> Self {
        Self {
            quit: parse_key(&kb.quit).unwrap_or(KeyCode::Char('q')),
            filter: parse_key(&kb.filter).unwrap_or(KeyCode::Char('/')),
            kill: parse_key(&kb.kill).unwrap_or(KeyCode::Char('k')),
            force_kill: parse_key(&kb.force_kill).unwrap_or(KeyCode::Char('K')),
            cycle_sort: parse_key(&kb.cycle_sort).unwrap_or(KeyCode::Char('s')),
            reverse_sort: parse_key(&kb.reverse_sort).unwrap_or(KeyCode::Char('r')),
            help: parse_key(&kb.help).unwrap_or(KeyCode::Char('?')),
        }
    }

    /// Returns (key_label, description) pairs for all configurable keybinds.
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        vec![
            (key_label(self.quit), "Quit"),
            (key_label(self.filter), "Filter processes"),
            (key_label(self.kill), "Terminate (SIGTERM)"),
            (key_label(self.force_kill), "Force kill (SIGKILL)"),
            (key_label(self.cycle_sort), "Cycle sort column"),
            (key_label(self.reverse_sort), "Reverse sort"),
            (key_label(self.help), "Toggle help"),
            ("t".to_string(), "Cycle theme"),
            ("\u{2191}\u{2193}".to_string(), "Select process"),
            ("PgUp/PgDn".to_string(), "Page"),
            ("Ctrl+C".to_string(), "Quit (always)"),
        ]
    }
}

pub fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Bksp".to_string(),
        KeyCode::Delete => "Del".to_string(),
        _ => "?".to_string(),
    }
}

/// Latest snapshot per domain as last pulled from the bus.
#[derive(Debug, Default, Clone)]
pub struct Dashboard {
    pub cpu: Option<Arc<CpuSnapshot>>,
    pub memory: Option<Arc<MemorySnapshot>>,
    pub network: Option<Arc<NetworkSnapshot>>,
    pub processes: Option<Arc<ProcessSnapshot>>,
    pub host: Option<Arc<HostSnapshot>>,
}

struct PendingKill {
    pid: u32,
    signal: TerminateSignal,
    rx: oneshot::Receiver<Result<(), ProcessError>>,
}

pub struct App {
    pub running: bool,
    pub data: Dashboard,
    pub selected_index: usize,
    pub input_mode: InputMode,
    pub filter_text: String,
    pub theme: Theme,
    pub status_message: Option<(String, Instant)>,
    pub keybinds: ResolvedKeybinds,
    bus: Arc<SnapshotBus>,
    control: ProcessControl,
    generations: [u64; Domain::ALL.len()],
    health: [CollectorHealth; Domain::ALL.len()],
    selected_pid: Option<u32>,
    pending_kills: Vec<PendingKill>,
    viewport: Option<Rect>,
}

impl App {
    pub fn new(config: &Config, bus: Arc<SnapshotBus>, control: ProcessControl) -> Self {
        let mut app = App {
            running: true,
            data: Dashboard::default(),
            selected_index: 0,
            input_mode: InputMode::Normal,
            filter_text: control.view().filter,
            theme: Theme::from_config(&config.general.theme),
            status_message: None,
            keybinds: ResolvedKeybinds::from_config(&config.keybinds),
            bus,
            control,
            generations: [0; Domain::ALL.len()],
            health: Default::default(),
            selected_pid: None,
            pending_kills: Vec::new(),
            viewport: None,
        };
        app.refresh_data();
        app
    }

    /// Pulls every domain whose generation moved since the last call.
    /// Returns `true` when anything visible changed.
    pub fn refresh_data(&mut self) -> bool {
        let mut changed = false;

        for domain in Domain::ALL {
            let i = domain.index();
            let health = self.bus.health(domain);
            if health != self.health[i] {
                self.health[i] = health;
                changed = true;
            }

            if self.bus.generation(domain) == self.generations[i] {
                continue;
            }
            let Some((snapshot, generation)) = self.bus.read(domain) else {
                continue;
            };
            self.generations[i] = generation;
            changed = true;
            match snapshot {
                Snapshot::Cpu(s) => self.data.cpu = Some(s),
                Snapshot::Memory(s) => self.data.memory = Some(s),
                Snapshot::Network(s) => self.data.network = Some(s),
                Snapshot::Processes(s) => {
                    self.data.processes = Some(s);
                    self.restore_selection();
                }
                Snapshot::Host(s) => self.data.host = Some(s),
            }
        }

        changed |= self.housekeep();
        changed
    }

    /// Kill results and status expiry; nothing here reads the bus.
    pub fn housekeep(&mut self) -> bool {
        let mut changed = self.poll_pending_kills();
        if let Some((_, created)) = &self.status_message
            && created.elapsed().as_secs() >= STATUS_TTL_SECS
        {
            self.status_message = None;
            changed = true;
        }
        changed
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport = Some(Rect::new(0, 0, width, height));
    }

    pub fn core_count(&self) -> usize {
        self.data.cpu.as_ref().map_or(1, |cpu| cpu.core_count())
    }

    /// Rows PageUp/PageDown move by: what the process table shows right now.
    pub fn page_rows(&self) -> usize {
        self.viewport
            .map(|area| dashboard_layout(area, self.core_count()).process_rows())
            .unwrap_or(PAGE_ROWS)
            .max(1)
    }

    pub fn health(&self, domain: Domain) -> &CollectorHealth {
        &self.health[domain.index()]
    }

    pub fn degraded_domains(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|d| self.health(*d).is_degraded())
            .collect()
    }

    /// Rows of the current process snapshot that pass the filter being typed.
    /// The collector applies the same filter from its next scan onwards.
    pub fn visible_processes(&self) -> Vec<&ProcessEntry> {
        let Some(snapshot) = &self.data.processes else {
            return Vec::new();
        };
        let view = ProcessView {
            filter: self.filter_text.clone(),
            ..ProcessView::default()
        };
        snapshot.entries.iter().filter(|e| view.matches(e)).collect()
    }

    pub fn selected_pid(&self) -> Option<u32> {
        self.visible_processes()
            .get(self.selected_index)
            .map(|e| e.pid)
    }

    pub fn selected_process(&self) -> Option<&ProcessEntry> {
        self.visible_processes().get(self.selected_index).copied()
    }

    /// Sort as requested; the snapshot may still show the previous one.
    pub fn requested_view(&self) -> ProcessView {
        self.control.view()
    }

    fn restore_selection(&mut self) {
        let visible = self.visible_processes();
        let index = self
            .selected_pid
            .and_then(|pid| visible.iter().position(|e| e.pid == pid))
            .unwrap_or_else(|| self.selected_index.min(visible.len().saturating_sub(1)));
        let pid = visible.get(index).map(|e| e.pid);
        self.selected_index = index;
        self.selected_pid = pid;
    }

    fn select(&mut self, index: usize) {
        self.selected_index = index;
        self.selected_pid = self.selected_pid();
    }

    pub fn map_key(&self, key: KeyEvent) -> Action {
        // Ctrl+C always quits (hardwired safety)
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        match self.input_mode {
            InputMode::Normal => self.map_key_normal(key),
            InputMode::Filter => self.map_key_filter(key),
            InputMode::Help => self.map_key_help(key),
        }
    }

    fn map_key_normal(&self, key: KeyEvent) -> Action {
        let code = key.code;
        let kb = &self.keybinds;

        match code {
            KeyCode::Up => return Action::Navigate(Direction::Up),
            KeyCode::Down => return Action::Navigate(Direction::Down),
            KeyCode::PageUp => return Action::Navigate(Direction::PageUp),
            KeyCode::PageDown => return Action::Navigate(Direction::PageDown),
            KeyCode::Home => return Action::Navigate(Direction::Top),
            KeyCode::End => return Action::Navigate(Direction::Bottom),
            KeyCode::Esc if !self.filter_text.is_empty() => return Action::ClearFilter,
            _ => {}
        }

        if code == kb.quit {
            return Action::Quit;
        }
        if code == kb.filter {
            return Action::EnterFilterMode;
        }
        if code == kb.kill {
            return self.selected_pid().map_or(Action::None, Action::Kill);
        }
        if code == kb.force_kill {
            return self.selected_pid().map_or(Action::None, Action::ForceKill);
        }
        if code == kb.cycle_sort {
            return Action::CycleSortMode;
        }
        if code == kb.reverse_sort {
            return Action::ToggleReverseSort;
        }
        if code == kb.help {
            return Action::ToggleHelp;
        }
        if code == KeyCode::Char('t') {
            return Action::CycleTheme;
        }

        Action::None
    }

    fn map_key_help(&self, key: KeyEvent) -> Action {
        let code = key.code;
        if code == self.keybinds.help || code == KeyCode::Esc {
            return Action::ToggleHelp;
        }
        Action::None
    }

    fn map_key_filter(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::ClearFilter,
            KeyCode::Enter => Action::ExitFilterMode,
            KeyCode::Backspace => {
                let mut text = self.filter_text.clone();
                text.pop();
                Action::UpdateFilter(text)
            }
            KeyCode::Char(c) => {
                let mut text = self.filter_text.clone();
                text.push(c);
                Action::UpdateFilter(text)
            }
            _ => Action::None,
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Navigate(dir) => self.navigate(dir),
            Action::EnterFilterMode => self.input_mode = InputMode::Filter,
            Action::ExitFilterMode => self.input_mode = InputMode::Normal,
            Action::ClearFilter => {
                self.filter_text.clear();
                self.control.request_filter("");
                self.input_mode = InputMode::Normal;
                self.restore_selection();
            }
            Action::UpdateFilter(text) => {
                self.control.request_filter(&text);
                self.filter_text = text;
                self.restore_selection();
            }
            Action::CycleSortMode => {
                let sort = self.control.view().sort.next();
                self.control.request_sort(sort);
                self.set_status(format!("Sorting by {}", sort.label()));
            }
            Action::ToggleReverseSort => {
                let reverse = !self.control.view().reverse;
                self.control.request_reverse(reverse);
                self.set_status(if reverse {
                    "Sort reversed".to_string()
                } else {
                    "Sort order restored".to_string()
                });
            }
            Action::CycleTheme => self.theme = self.theme.next(),
            Action::Kill(pid) => self.terminate(pid, TerminateSignal::Graceful),
            Action::ForceKill(pid) => self.terminate(pid, TerminateSignal::Force),
            Action::ToggleHelp => {
                self.input_mode = if self.input_mode == InputMode::Help {
                    InputMode::Normal
                } else {
                    InputMode::Help
                };
            }
            Action::None => {}
        }
    }

    fn navigate(&mut self, direction: Direction) {
        let len = self.visible_processes().len();
        if len == 0 {
            return;
        }
        let last = len - 1;
        let index = match direction {
            Direction::Up => self.selected_index.saturating_sub(1),
            Direction::Down => (self.selected_index + 1).min(last),
            Direction::PageUp => self.selected_index.saturating_sub(self.page_rows()),
            Direction::PageDown => (self.selected_index + self.page_rows()).min(last),
            Direction::Top => 0,
            Direction::Bottom => last,
        };
        self.select(index);
    }

    fn terminate(&mut self, pid: u32, signal: TerminateSignal) {
        if self.pending_kills.iter().any(|k| k.pid == pid) {
            return;
        }
        debug!(pid, ?signal, "terminate requested");
        let rx = self.control.terminate(pid, signal);
        self.pending_kills.push(PendingKill { pid, signal, rx });
        self.set_status(format!("Sending {} to PID {pid}", signal.name()));
    }

    fn poll_pending_kills(&mut self) -> bool {
        let mut messages = Vec::new();
        self.pending_kills.retain_mut(|kill| match kill.rx.try_recv() {
            Ok(Ok(())) => {
                messages.push(format!("Sent {} to PID {}", kill.signal.name(), kill.pid));
                false
            }
            Ok(Err(err)) => {
                messages.push(capitalize(&err.to_string()));
                false
            }
            Err(oneshot::error::TryRecvError::Empty) => true,
            Err(oneshot::error::TryRecvError::Closed) => {
                messages.push(format!("Signal to PID {} was not delivered", kill.pid));
                false
            }
        });
        let changed = !messages.is_empty();
        if let Some(last) = messages.pop() {
            self.set_status(last);
        }
        changed
    }

    fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    pub fn show_help(&self) -> bool {
        self.input_mode == InputMode::Help
    }

    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        self.keybinds.help_entries()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
