//! Layout and drawing: menu, board, sidebar, pause and game-over overlays.

use crate::Difficulty;
use crate::app::Screen;
use crate::game::{GameState, Piece, Tile};
use crate::highscores::HighScores;
use crate::theme::{self, Theme};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// One grid cell is 4x1 terminal cells, wide enough for a 4-digit value.
const CELL_WIDTH: u16 = 4;
const CELL_HEIGHT: u16 = 1;

const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the game-over fade-in (TachyonFX) in ms.
const GAME_OVER_FADE_MS: u32 = 600;

/// Board size in terminal cells (border + grid) for given grid dimensions.
fn board_pixel_size(width: u16, height: u16) -> (u16, u16) {
    (width * CELL_WIDTH + 2, height * CELL_HEIGHT + 2)
}

/// Draw current screen (menu, game, game over), with optional pause overlay.
/// On game over the popup fades in; `game_over_effect` / `effect_time` hold
/// the running TachyonFX state across frames.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    difficulty: Difficulty,
    menu_selected: Difficulty,
    high_scores: HighScores,
    new_best: bool,
    game_over_effect: &mut Option<Effect>,
    effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_selected, high_scores, area),
        Screen::Playing => {
            draw_game(frame, state, theme, difficulty, high_scores, area);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::GameOver => {
            draw_game(frame, state, theme, difficulty, high_scores, area);
            let popup = draw_game_over(frame, state, theme, difficulty, high_scores, new_best, area);
            apply_game_over_effect(frame, theme, popup, game_over_effect, effect_time, now);
        }
    }
}

/// Create or update the game-over fade and process it (popup fades in from bg).
fn apply_game_over_effect(
    frame: &mut Frame,
    theme: &Theme,
    popup: Rect,
    game_over_effect: &mut Option<Effect>,
    effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *effect_time = Some(now);

    if game_over_effect.is_none() {
        let bg = theme.bg;
        let effect = fx::fade_from(bg, bg, (GAME_OVER_FADE_MS, Interpolation::Linear))
            .with_area(popup);
        *game_over_effect = Some(effect);
    }

    if let Some(effect) = game_over_effect {
        frame.render_effect(effect, popup, tfx_delta);
    }
}

fn draw_menu(
    frame: &mut Frame,
    theme: &Theme,
    selected: Difficulty,
    high_scores: HighScores,
    area: Rect,
) {
    let popup_w = 48u16;
    let popup_h = 18u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" tetra ", Style::default().fg(theme.title).bold()),
        Span::styled(
            " 2048 ",
            Style::default()
                .fg(Color::Black)
                .bg(theme::tile_color(2048))
                .bold(),
        ),
    ]);

    let highlight_style = Style::default()
        .fg(Color::Black)
        .bg(theme::tile_color(2048))
        .bold();
    let normal_style = Style::default().fg(theme.main_fg);
    let tab = |d: Difficulty| {
        let style = if selected == d {
            highlight_style
        } else {
            normal_style
        };
        Span::styled(format!(" {} ", d.label()), style)
    };

    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            " ─ DIFFICULTY ─ ",
            Style::default().fg(theme.div_line),
        )),
        Line::from(vec![
            tab(Difficulty::Easy),
            Span::from("  "),
            tab(Difficulty::Normal),
            Span::from("  "),
            tab(Difficulty::Hard),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                " Best   easy {}   normal {}   hard {} ",
                high_scores.easy, high_scores.normal, high_scores.hard
            ),
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(" [ START ] ", highlight_style)),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↔ ", Style::default().fg(theme.title)),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", Style::default().fg(theme.title)),
            Span::from("START"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(Color::Rgb(255, 80, 80)),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 44u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    R — Restart    Q — Menu ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw the game-over popup and return its rect for the fade effect.
fn draw_game_over(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    difficulty: Difficulty,
    high_scores: HighScores,
    new_best: bool,
    area: Rect,
) -> Rect {
    let popup_w = 40u16;
    let popup_h = 11u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let best = match difficulty {
        Difficulty::Easy => high_scores.easy,
        Difficulty::Normal => high_scores.normal,
        Difficulty::Hard => high_scores.hard,
    };
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", state.grid.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", best),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if new_best {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Restart    M — Menu    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" tetra2048 ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
    popup
}

/// Draw game: board + sidebar; use full area and center the pair.
fn draw_game(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    difficulty: Difficulty,
    high_scores: HighScores,
    area: Rect,
) {
    let (bw, bh) = board_pixel_size(state.grid.width as u16, state.grid.height as u16);
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let center_horiz = horiz_chunks[1];

    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Fill(1),
        ])
        .split(center_horiz);
    let active_area = vert_chunks[1];

    let (board_area, sidebar_area) = {
        let inner = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
            .split(active_area);
        (inner[0], inner[1])
    };

    draw_board(frame, state, theme, board_area);
    draw_sidebar(frame, state, theme, difficulty, high_scores, sidebar_area);
}

/// Absolute (row, col) of each tile of the falling piece, with the tile.
fn piece_cells(piece: &Piece) -> Vec<(i32, i32, &Tile)> {
    let (rows, cols) = piece.box_size();
    let mut out = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if let Some(tile) = piece.tile_at(r, c) {
                out.push((
                    piece.anchor.row + r as i32,
                    piece.anchor.col + c as i32,
                    tile,
                ));
            }
        }
    }
    out
}

fn draw_board(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" tetra2048 ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let board_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: (state.grid.width as u16 * CELL_WIDTH).min(inner.width),
        height: (state.grid.height as u16 * CELL_HEIGHT).min(inner.height),
    };

    let falling = state.piece.as_ref().map(piece_cells).unwrap_or_default();
    let buf = frame.buffer_mut();

    // Row 0 is the bottom of the board; the terminal draws top-down.
    for display_y in 0..state.grid.height {
        let grid_row = state.grid.height - 1 - display_y;
        let ry = board_rect.y + display_y as u16 * CELL_HEIGHT;
        for col in 0..state.grid.width {
            let rx = board_rect.x + col as u16 * CELL_WIDTH;
            if rx >= board_rect.x + board_rect.width || ry >= board_rect.y + board_rect.height {
                continue;
            }

            // Falling piece covers the locked grid; cells above the ceiling
            // are simply not drawn.
            let tile = falling
                .iter()
                .find(|&&(r, c, _)| r == grid_row as i32 && c == col as i32)
                .map(|&(_, _, t)| t)
                .or_else(|| state.grid.tile_at(grid_row, col));

            match tile {
                Some(tile) => {
                    let text = format!("{:^width$}", tile.value, width = CELL_WIDTH as usize);
                    let style = Style::default().fg(Color::Black).bg(tile.color).bold();
                    buf.set_stringn(rx, ry, text, CELL_WIDTH as usize, style);
                }
                None => {
                    let style = Style::default().fg(theme.inactive_fg).bg(theme.bg);
                    buf.set_stringn(rx, ry, "    ", CELL_WIDTH as usize, style);
                }
            }
        }
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    difficulty: Difficulty,
    high_scores: HighScores,
    area: Rect,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let best = match difficulty {
        Difficulty::Easy => high_scores.easy,
        Difficulty::Normal => high_scores.normal,
        Difficulty::Hard => high_scores.hard,
    };

    // Free-floating sections with their own borders; vertical layout with small gaps
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Next (border + title + preview)
            Constraint::Length(1), // gap
            Constraint::Length(5), // Stats (border + score, best, speed)
            Constraint::Length(1), // gap
            Constraint::Length(7), // Controls
        ])
        .split(area);

    // --- Next (own border) ---
    let next_outer = chunks[0];
    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let next_inner = next_block.inner(next_outer);
    next_block.render(next_outer, frame.buffer_mut());
    let next_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(5)])
        .split(next_inner);
    Paragraph::new(Line::from(Span::styled("Next", title_style)))
        .render(next_layout[0], frame.buffer_mut());
    draw_next_preview(frame, state, theme, next_layout[1]);

    // --- Stats (own border): Score, Best, Speed ---
    let stats_outer = chunks[2];
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(stats_outer);
    stats_block.render(stats_outer, frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.grid.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best: ", title_style),
            Span::styled(best.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Speed: ", title_style),
            Span::styled(difficulty.label(), fg_style),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    // --- Controls (own border) ---
    let controls_outer = chunks[4];
    let controls_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let controls_inner = controls_block.inner(controls_outer);
    controls_block.render(controls_outer, frame.buffer_mut());
    let dim = Style::default().fg(theme.inactive_fg);
    let controls_lines = vec![
        Line::from(vec![
            Span::styled("←→ ", title_style),
            Span::styled("move", dim),
        ]),
        Line::from(vec![
            Span::styled(" ↓ ", title_style),
            Span::styled("soft drop", dim),
        ]),
        Line::from(vec![
            Span::styled(" ␣ ", title_style),
            Span::styled("hard drop", dim),
        ]),
        Line::from(vec![
            Span::styled(" P ", title_style),
            Span::styled("pause", dim),
        ]),
        Line::from(vec![
            Span::styled(" Q ", title_style),
            Span::styled("quit", dim),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(controls_lines))
        .render(controls_inner, frame.buffer_mut());
}

/// Next piece preview: the shape's bounding box, two terminal cells per tile.
fn draw_next_preview(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let template = state.next_shape.template();
    let buf = frame.buffer_mut();
    let tile_style = Style::default().bg(theme::tile_color(2));

    // Templates store row 0 at the bottom; preview draws top-down.
    for (display_y, row) in template.iter().rev().enumerate() {
        let ry = area.y + 1 + display_y as u16;
        if ry >= area.y + area.height {
            continue;
        }
        for (c, &occupied) in row.iter().enumerate() {
            if !occupied {
                continue;
            }
            let rx = area.x + 1 + c as u16 * 2;
            if rx + 1 < area.x + area.width {
                buf.set_stringn(rx, ry, "  ", 2, tile_style);
            }
        }
    }
}
