//! App: terminal init, main loop, tick and key handling.

use crate::game::GameState;
use crate::highscores::{self, HighScores};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, Difficulty};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding.
const REPEAT_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
}

pub struct App {
    args: Args,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    menu_selected: Difficulty,
    /// Gravity pace; the menu difficulty picks it, --tick-ms overrides.
    tick_interval: Duration,
    last_tick: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    high_scores: HighScores,
    new_best: bool,
    /// TachyonFX fade for the game-over overlay (created when the screen flips).
    game_over_effect: Option<Effect>,
    /// Last time the game-over effect was processed (for delta).
    effect_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, theme: Theme) -> Result<Self> {
        let state = GameState::new(args.width as usize, args.height as usize);
        let tick_interval =
            Duration::from_millis(args.tick_ms.unwrap_or_else(|| args.difficulty.tick_ms()));
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let menu_selected = args.difficulty;
        Ok(Self {
            args,
            theme,
            state,
            screen,
            paused: false,
            menu_selected,
            tick_interval,
            last_tick: Instant::now(),
            repeat_state: None,
            last_repeat_fire: None,
            high_scores: highscores::load_high_scores(),
            new_best: false,
            game_over_effect: None,
            effect_time: None,
        })
    }

    fn start_game(&mut self, difficulty: Difficulty) {
        self.args.difficulty = difficulty;
        self.tick_interval =
            Duration::from_millis(self.args.tick_ms.unwrap_or_else(|| difficulty.tick_ms()));
        self.state = GameState::new(self.args.width as usize, self.args.height as usize);
        self.screen = Screen::Playing;
        self.paused = false;
        self.last_tick = Instant::now();
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.new_best = false;
        self.game_over_effect = None;
        self.effect_time = None;
    }

    /// Terminal board state reached: record the best score and switch screens.
    fn finish_game(&mut self) {
        let score = self.state.grid.score;
        let best = match self.args.difficulty {
            Difficulty::Easy => &mut self.high_scores.easy,
            Difficulty::Normal => &mut self.high_scores.normal,
            Difficulty::Hard => &mut self.high_scores.hard,
        };
        if score > *best {
            *best = score;
            self.new_best = true;
            // Best effort; a read-only config dir should not kill the game.
            let _ = highscores::save_high_scores(self.high_scores);
        }
        self.repeat_state = None;
        self.game_over_effect = None;
        self.effect_time = None;
        self.screen = Screen::GameOver;
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::MoveLeft => self.state.move_left(),
            Action::MoveRight => self.state.move_right(),
            Action::SoftDrop => self.state.soft_drop(),
            Action::HardDrop => {
                self.state.hard_drop();
                self.repeat_state = None;
            }
            Action::Pause | Action::Quit | Action::None => {}
        }
    }

    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let (action, first) = match self.repeat_state {
            Some(s) => s,
            None => return,
        };
        if !matches!(
            action,
            Action::MoveLeft | Action::MoveRight | Action::SoftDrop
        ) {
            return;
        }
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next =
            self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action);
            self.last_repeat_fire = Some(now);
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
                PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Attempt to enable enhanced keyboard for Release events
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    self.args.difficulty,
                    self.menu_selected,
                    self.high_scores,
                    self.new_best,
                    &mut self.game_over_effect,
                    &mut self.effect_time,
                    now,
                );
            })?;

            // Poll with a budget that keeps rendering around 60 FPS.
            let timeout = Duration::from_millis(16).saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);

                        // Ignore OS repeats; our own DAS/ARR does the repeating.
                        if key.kind != KeyEventKind::Press {
                            if key.kind == KeyEventKind::Release
                                && self.repeat_state.map(|(a, _)| a) == Some(action)
                            {
                                self.repeat_state = None;
                                self.last_repeat_fire = None;
                            }
                            continue;
                        }
                        if self.repeat_state.map(|(a, _)| a) == Some(action) {
                            continue;
                        }

                        if self.handle_key(action, key.code)? {
                            return Ok(());
                        }
                    }
                }
            }

            if self.screen == Screen::Playing && !self.paused {
                self.tick_repeat();
                if self.last_tick.elapsed() >= self.tick_interval {
                    self.last_tick = Instant::now();
                    self.state.tick();
                    if self.state.game_over() {
                        self.finish_game();
                    }
                }
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, action: Action, code: KeyCode) -> Result<bool> {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return Ok(true),
                Action::MoveLeft => {
                    self.menu_selected = match self.menu_selected {
                        Difficulty::Easy => Difficulty::Hard,
                        Difficulty::Normal => Difficulty::Easy,
                        Difficulty::Hard => Difficulty::Normal,
                    };
                }
                Action::MoveRight => {
                    self.menu_selected = match self.menu_selected {
                        Difficulty::Easy => Difficulty::Normal,
                        Difficulty::Normal => Difficulty::Hard,
                        Difficulty::Hard => Difficulty::Easy,
                    };
                }
                Action::HardDrop => self.start_game(self.menu_selected),
                _ => {}
            },
            Screen::Playing if self.paused => match action {
                Action::Pause => self.paused = false,
                Action::Quit => {
                    self.paused = false;
                    self.screen = Screen::Menu;
                }
                _ => {
                    if matches!(code, KeyCode::Char('r') | KeyCode::Char('R')) {
                        self.start_game(self.args.difficulty);
                    }
                }
            },
            Screen::Playing => match action {
                Action::Pause | Action::Quit => {
                    self.paused = true;
                    self.repeat_state = None;
                    self.last_repeat_fire = None;
                }
                Action::None => {}
                _ => {
                    self.apply_action(action);
                    if matches!(
                        action,
                        Action::MoveLeft | Action::MoveRight | Action::SoftDrop
                    ) {
                        self.repeat_state = Some((action, Instant::now()));
                        self.last_repeat_fire = None;
                    }
                }
            },
            Screen::GameOver => {
                if action == Action::Quit {
                    return Ok(true);
                }
                match code {
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        self.start_game(self.args.difficulty);
                    }
                    KeyCode::Char('m') | KeyCode::Char('M') => {
                        self.screen = Screen::Menu;
                    }
                    _ => {}
                }
            }
        }
        Ok(false)
    }
}
