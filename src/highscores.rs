//! Persist best scores to disk (XDG config or ~/.config/tetra2048), one
//! line per difficulty. Board state itself is never persisted.

use anyhow::Result;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

const FILENAME: &str = "highscores";

/// Best score per difficulty, in menu order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighScores {
    pub easy: u32,
    pub normal: u32,
    pub hard: u32,
}

/// Returns the path to the high scores file (config dir / tetra2048 / highscores).
fn config_path() -> Result<PathBuf> {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    Ok(base.join("tetra2048").join(FILENAME))
}

/// Load best scores from disk; zeroes on missing or malformed file.
pub fn load_high_scores() -> HighScores {
    let path = match config_path() {
        Ok(p) => p,
        Err(_) => return HighScores::default(),
    };
    let content = match fs::read(path) {
        Ok(c) => c,
        Err(_) => return HighScores::default(),
    };
    let mut scores = HighScores::default();
    for (i, line) in BufReader::new(&content[..]).lines().take(3).enumerate() {
        let n = line
            .ok()
            .as_ref()
            .and_then(|l| l.trim().parse::<u32>().ok())
            .unwrap_or(0);
        match i {
            0 => scores.easy = n,
            1 => scores.normal = n,
            2 => scores.hard = n,
            _ => {}
        }
    }
    scores
}

/// Save best scores to disk. Creates the config directory if needed.
pub fn save_high_scores(scores: HighScores) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    writeln!(f, "{}", scores.easy)?;
    writeln!(f, "{}", scores.normal)?;
    writeln!(f, "{}", scores.hard)?;
    Ok(())
}
