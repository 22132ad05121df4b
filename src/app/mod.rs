use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::api::{ApiRequest, Completed, RequestWorker, SettingsApi};
use crate::config::AppConfig;
use crate::editor::{FormAction, LicenseEditor, LicenseView, SettingsEditor};
use crate::ui;

pub mod state;

pub use state::{AppState, FolderOverlay, NumberOverlay, OverlayState, RecordRow, Screen};

enum Action {
    Quit,
    NextTab,
    PreviousTab,
    JumpToTab(&'static str),
    SelectNext,
    SelectPrevious,
    Toggle,
    CycleOption(isize),
    Activate,
    Remove,
    MoveRecord(isize),
    Save,
    ClearCache,
}

pub struct App {
    pub config: Arc<AppConfig>,
    worker: RequestWorker,
    state: AppState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
    in_flight: usize,
}

impl App {
    /// Loads the current settings and opens the settings editor.
    pub fn settings(config: Arc<AppConfig>, api: Arc<dyn SettingsApi>) -> Result<Self> {
        let loaded = api
            .load_settings()
            .context("loading settings for the editor")?;
        tracing::info!(
            accounts = loaded.settings.accounts.len(),
            signatures = loaded.settings.signatures.len(),
            "settings loaded"
        );
        let editor = SettingsEditor::new(loaded, config.host.clone(), config.theme_registry());
        Ok(Self::with_state(config, api, AppState::for_settings(editor)))
    }

    /// Opens the standalone license window.
    pub fn license(config: Arc<AppConfig>, api: Arc<dyn SettingsApi>) -> Self {
        let editor = LicenseEditor::new(config.host.clone());
        Self::with_state(config, api, AppState::for_license(editor))
    }

    fn with_state(config: Arc<AppConfig>, api: Arc<dyn SettingsApi>, state: AppState) -> Self {
        let tick_rate = config.ui.tick_rate();
        Self {
            config,
            worker: RequestWorker::new(api),
            state,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Runs until the user quits or an editor asks to close. Returns the line to print afterwards.
    pub fn run(&mut self) -> Result<Option<String>> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        self.worker.shutdown();
        result.map(|()| self.state.farewell())
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    self.list_state.select(Some(self.state.selected));
                    ui::draw_app(frame, &self.state, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.handle_action(Action::Quit);
            return;
        }
        if self.handle_overlay_key(key) {
            return;
        }
        if self.state.screen() == Screen::License {
            self.handle_license_key(key);
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Save)
            }
            KeyCode::Tab => Some(Action::NextTab),
            KeyCode::BackTab => Some(Action::PreviousTab),
            KeyCode::Char('1') if plain => Some(Action::JumpToTab("accounts")),
            KeyCode::Char('2') if plain => Some(Action::JumpToTab("appearance")),
            KeyCode::Char('3') if plain => Some(Action::JumpToTab("system")),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('J') => Some(Action::MoveRecord(1)),
            KeyCode::Char('K') => Some(Action::MoveRecord(-1)),
            KeyCode::Char('h') | KeyCode::Left => Some(Action::CycleOption(-1)),
            KeyCode::Char('l') | KeyCode::Right => Some(Action::CycleOption(1)),
            KeyCode::Char(' ') => Some(Action::Toggle),
            KeyCode::Enter => Some(Action::Activate),
            KeyCode::Char('x') | KeyCode::Delete if plain => Some(Action::Remove),
            KeyCode::Char('s') if plain => Some(Action::Save),
            KeyCode::Char('C') => Some(Action::ClearCache),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::NextTab => self.state.cycle_tab(true),
            Action::PreviousTab => self.state.cycle_tab(false),
            Action::JumpToTab(tag) => self.state.select_tab(tag),
            Action::SelectNext => self.state.move_selection(1),
            Action::SelectPrevious => self.state.move_selection(-1),
            Action::Toggle => {
                self.state.toggle_selected();
            }
            Action::CycleOption(delta) => {
                self.state.cycle_selected_option(delta);
            }
            Action::Activate => self.handle_activate(),
            Action::Remove => {
                if !self.state.remove_selected() {
                    self.state.set_status_message(Some("Nothing to remove here"));
                }
            }
            Action::MoveRecord(delta) => {
                self.state.move_selected_record(delta);
            }
            Action::Save => {
                if let Some(request) = self.state.submit_settings() {
                    self.dispatch(request);
                }
            }
            Action::ClearCache => self.handle_clear_cache(),
        }
    }

    fn handle_activate(&mut self) {
        match self.state.selected_action() {
            Some(FormAction::ClearCache) => self.handle_clear_cache(),
            Some(FormAction::OpenLicense) => {
                self.state
                    .open_license(LicenseEditor::new(self.config.host.clone()));
                self.state.set_status_message(None::<String>);
            }
            None => {
                self.state.begin_edit_selected();
            }
        }
    }

    fn handle_clear_cache(&mut self) {
        let request = self
            .state
            .settings_mut()
            .and_then(SettingsEditor::request_clear_cache);
        match request {
            Some(request) => {
                self.state.set_status_message(Some("Clearing cache..."));
                self.dispatch(request);
            }
            None => self
                .state
                .set_status_message(Some("Cache clear already in progress")),
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        if self.state.overlay().is_none() {
            return false;
        }
        match key.code {
            KeyCode::Esc => self.state.cancel_overlay(),
            KeyCode::Enter => self.state.commit_overlay(),
            KeyCode::Backspace => self.state.overlay_pop_char(),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.state.overlay_push_char(ch)
            }
            _ => {}
        }
        true
    }

    fn handle_license_key(&mut self, key: KeyEvent) {
        let view = match self.state.license() {
            Some(editor) => editor.view(),
            None => return,
        };
        if key.code == KeyCode::Esc {
            if !self.state.close_license() {
                self.should_quit = true;
            }
            return;
        }
        match view {
            LicenseView::Licensed { .. } => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char('d')) {
                    let request = self
                        .state
                        .license_mut()
                        .and_then(LicenseEditor::request_remove);
                    if let Some(request) = request {
                        self.dispatch(request);
                    }
                }
            }
            LicenseView::Unlicensed { .. } => match key.code {
                KeyCode::Enter => {
                    let request = self.state.license_mut().and_then(LicenseEditor::submit);
                    if let Some(request) = request {
                        self.dispatch(request);
                    }
                }
                KeyCode::Backspace => self.state.license_pop_char(),
                KeyCode::Char(ch)
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
                {
                    self.state.license_push_char(ch)
                }
                _ => {}
            },
        }
    }

    fn dispatch(&mut self, request: ApiRequest) {
        self.in_flight += 1;
        self.worker.dispatch(request);
    }

    fn on_tick(&mut self) {
        for completed in self.worker.poll() {
            self.apply_completed(completed);
        }
    }

    fn apply_completed(&mut self, completed: Completed) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Err(err) = &completed.outcome {
            tracing::error!(?err, kind = %completed.kind, "request failed");
        }
        self.state.apply(completed);
        if self.state.close_requested() {
            self.should_quit = true;
        }
    }

    #[cfg(test)]
    fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.worker.wait(Duration::from_secs(5)) {
                Some(completed) => self.apply_completed(completed),
                None => break,
            }
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
