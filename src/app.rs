use crate::config::TICK_MS;
use crate::dashboard::Dashboard;
use crate::selection::TimeRange;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use tracing::info;

pub struct App {
    pub should_quit: bool,
    pub dashboard: Dashboard,
}

impl App {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            should_quit: false,
            dashboard,
        }
    }

    pub async fn run(&mut self, terminal: &mut crate::tui::Tui) -> io::Result<()> {
        self.dashboard.start();

        while !self.should_quit {
            self.dashboard.poll();
            terminal.draw(|f| crate::ui::render(f, &self.dashboard))?;

            if event::poll(std::time::Duration::from_millis(TICK_MS))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        info!("Dashboard closed");
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        // A notice is modal: nothing else happens until it is dismissed.
        if self.dashboard.notice().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.dashboard.dismiss_notice();
            }
            return;
        }

        let dash = &mut self.dashboard;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => dash.toggle_asset_class(),
            KeyCode::Up | KeyCode::Char('k') => dash.prev_symbol(),
            KeyCode::Down | KeyCode::Char('j') => dash.next_symbol(),
            KeyCode::Left | KeyCode::Char('h') => dash.prev_range(),
            KeyCode::Right | KeyCode::Char('l') => dash.next_range(),
            KeyCode::F(n @ 1..=9) => {
                if let Some(entry) = dash.selection().catalog().get(usize::from(n) - 1) {
                    dash.select_symbol(entry.value);
                }
            }
            KeyCode::Char(c @ '1'..='6') => {
                let idx = c as usize - '1' as usize;
                dash.set_time_range(TimeRange::ALL[idx]);
            }
            KeyCode::Char('p') | KeyCode::Enter => {
                dash.request_prediction();
            }
            KeyCode::Char('m') => dash.refresh_model(),
            _ => {}
        }
    }
}
