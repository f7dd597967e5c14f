//! tetra2048 — Tetris x 2048 hybrid puzzle in the terminal.

mod app;
mod game;
mod highscores;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_default();
    let mut app = App::new(args, theme)?;
    app.run()?;
    Ok(())
}

/// Tetris x 2048 hybrid puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tetra2048",
    version,
    about = "Tetris x 2048: numbered tetrominoes fall, equal tiles merge upward, full rows clear.",
    long_about = "tetra2048 drops tetromino pieces made of numbered tiles onto a board.\n\n\
        When equal tiles stack vertically they merge into one tile of double value; \
        rows filled edge-to-edge are cleared for score, and tiles that lose their \
        support sift down through the gaps.\n\n\
        CONTROLS (normal):\n  Left/Right  Move    Down   Soft drop\n  Enter/Space/Up  Hard drop   P  Pause   Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/l  Move    j  Soft drop   k / Space  Hard drop   p  Pause   q  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Difficulty: easy, normal, or hard. Sets how fast pieces fall.
    #[arg(short, long, default_value = "easy")]
    pub difficulty: Difficulty,

    /// Board width in columns.
    #[arg(long, default_value = "12", value_name = "COLS")]
    pub width: u16,

    /// Board height in rows.
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: u16,

    /// Tick interval in milliseconds; overrides the difficulty's pace.
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Skip the difficulty menu and start playing immediately.
    #[arg(long)]
    pub no_menu: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// Tick interval per difficulty. The core treats this as an opaque
    /// pacing parameter; these are the menu's three speeds.
    pub fn tick_ms(self) -> u64 {
        match self {
            Self::Easy => 250,
            Self::Normal => 150,
            Self::Hard => 50,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Normal => "NORMAL",
            Self::Hard => "HARD",
        }
    }
}
