//! GameView: maps a [`BoardSnapshot`] plus animation and cursor state into a
//! terminal framebuffer.
//!
//! This module is pure (no I/O). It is the only place that knows how grid
//! coordinates map to terminal cells.

use crate::animator::{Animator, CellVisual};
use crate::core::BoardSnapshot;
use crate::fb::{CellStyle, FrameBuffer, Rect, Rgb};
use crate::types::{GemKind, Pos, SpecialKind, GRID_COLS, GRID_ROWS};

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatusView {
    pub enabled: bool,
    pub client_count: u16,
    pub controller_id: Option<usize>,
    pub streaming_count: u16,
}

/// Caller-side marks drawn on top of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decor {
    pub cursor: Option<Pos>,
    pub selected: Option<Pos>,
    pub hint: Option<(Pos, Pos)>,
    /// No swap on the board makes a match
    pub no_moves: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorY {
    Center,
    Top,
}

const BOARD_BG: Rgb = Rgb::new(24, 24, 34);
const BOARD_BG_ALT: Rgb = Rgb::new(30, 30, 42);
const PANEL_BG: Rgb = Rgb::new(0, 0, 0);

/// Terminal renderer for the gem board.
pub struct GameView {
    /// Grid cell width in terminal columns.
    cell_w: u16,
    /// Grid cell height in terminal rows.
    cell_h: u16,
    anchor_y: AnchorY,
}

impl Default for GameView {
    fn default() -> Self {
        // 4x2 keeps cells roughly square and leaves room for sub-cell motion.
        Self {
            cell_w: 4,
            cell_h: 2,
            anchor_y: AnchorY::Center,
        }
    }
}

impl GameView {
    pub fn new(cell_w: u16, cell_h: u16) -> Self {
        Self {
            cell_w: cell_w.max(1),
            cell_h: cell_h.max(1),
            anchor_y: AnchorY::Center,
        }
    }

    pub fn with_anchor_y(mut self, anchor_y: AnchorY) -> Self {
        self.anchor_y = anchor_y;
        self
    }

    /// Board frame size including the border
    pub fn frame_size(&self) -> (u16, u16) {
        (
            GRID_COLS as u16 * self.cell_w + 2,
            GRID_ROWS as u16 * self.cell_h + 2,
        )
    }

    /// Top-left corner of the board frame inside `viewport`
    pub fn frame_origin(&self, viewport: Viewport) -> (u16, u16) {
        let (frame_w, frame_h) = self.frame_size();
        let x = viewport.width.saturating_sub(frame_w) / 2;
        let y = match self.anchor_y {
            AnchorY::Center => viewport.height.saturating_sub(frame_h) / 2,
            AnchorY::Top => 0,
        };
        (x, y)
    }

    /// Grid cell under a terminal position, if any
    pub fn hit_test(&self, viewport: Viewport, x: u16, y: u16) -> Option<Pos> {
        let (ox, oy) = self.frame_origin(viewport);
        let inner_x = x.checked_sub(ox + 1)?;
        let inner_y = y.checked_sub(oy + 1)?;
        let (col, row) = (inner_x / self.cell_w, inner_y / self.cell_h);
        if col >= GRID_COLS as u16 || row >= GRID_ROWS as u16 {
            return None;
        }
        Some(Pos::new(row as u8, col as u8))
    }

    /// Render a still frame (no animation, no cursor).
    pub fn render_into(&self, snap: &BoardSnapshot, viewport: Viewport, fb: &mut FrameBuffer) {
        self.render_into_with(snap, None, &Decor::default(), None, viewport, fb);
    }

    /// Render into an existing framebuffer.
    ///
    /// This is the allocation-free hot path. Callers reuse one framebuffer across
    /// frames; it is only resized when the terminal size changes.
    pub fn render_into_with(
        &self,
        snap: &BoardSnapshot,
        anim: Option<&Animator>,
        decor: &Decor,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::new(Rgb::new(220, 220, 220), PANEL_BG).into_cell(' '));

        let (frame_w, frame_h) = self.frame_size();
        let (start_x, start_y) = self.frame_origin(viewport);
        let inner = Rect::new(
            start_x + 1,
            start_y + 1,
            GRID_COLS as u16 * self.cell_w,
            GRID_ROWS as u16 * self.cell_h,
        );

        self.draw_border(
            fb,
            start_x,
            start_y,
            frame_w,
            frame_h,
            CellStyle::new(Rgb::new(200, 200, 200), PANEL_BG),
        );

        // Checkerboard background.
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLS {
                let bg = if (row + col) % 2 == 0 { BOARD_BG } else { BOARD_BG_ALT };
                let (x, y) = self.cell_origin(inner, Pos::new(row, col));
                fb.fill_rect(
                    x as u16,
                    y as u16,
                    self.cell_w,
                    self.cell_h,
                    ' ',
                    CellStyle::new(bg, bg),
                );
            }
        }

        if let Some(sel) = decor.selected {
            self.draw_highlight(fb, inner, sel, Rgb::new(70, 70, 110));
        }

        // Still gems first, moving gems on top.
        for pass in [false, true] {
            for row in 0..GRID_ROWS {
                for col in 0..GRID_COLS {
                    let pos = Pos::new(row, col);
                    let visual = anim.map(|a| a.cell_visual(pos)).unwrap_or_default();
                    let moving = visual.d_row != 0.0 || visual.d_col != 0.0;
                    if moving != pass {
                        continue;
                    }
                    let Some(kind) = GemKind::from_code(snap.gem_code(pos)) else {
                        continue;
                    };
                    let special =
                        SpecialKind::from_code(snap.special_code(pos)).unwrap_or_default();
                    self.draw_gem(fb, inner, pos, kind, special, visual);
                }
            }
        }

        if let Some((a, b)) = decor.hint {
            let style = CellStyle::new(Rgb::new(255, 255, 140), BOARD_BG).bold();
            for p in [a, b] {
                let (x, y) = self.cell_origin(inner, p);
                fb.put_char_clipped(x, y, inner, '?', style);
            }
        }

        if let Some(cur) = decor.cursor {
            self.draw_cursor(fb, inner, cur);
        }

        self.draw_side_panel(fb, snap, anim, adapter, viewport, start_x, start_y, frame_w);

        if snap.game_over {
            self.draw_overlay_text(fb, start_x, start_y, frame_w, frame_h, "GAME OVER");
        } else if decor.no_moves && snap.phase.accepts_input() {
            self.draw_overlay_text(fb, start_x, start_y, frame_w, frame_h, "NO MOVES");
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, snap: &BoardSnapshot, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(snap, viewport, &mut fb);
        fb
    }

    pub fn render_with(
        &self,
        snap: &BoardSnapshot,
        anim: Option<&Animator>,
        decor: &Decor,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
    ) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into_with(snap, anim, decor, adapter, viewport, &mut fb);
        fb
    }

    fn cell_origin(&self, inner: Rect, pos: Pos) -> (i32, i32) {
        (
            inner.x as i32 + pos.col as i32 * self.cell_w as i32,
            inner.y as i32 + pos.row as i32 * self.cell_h as i32,
        )
    }

    fn draw_border(&self, fb: &mut FrameBuffer, x: u16, y: u16, w: u16, h: u16, style: CellStyle) {
        if w < 2 || h < 2 {
            return;
        }

        fb.put_char(x, y, '╭', style);
        fb.put_char(x + w - 1, y, '╮', style);
        fb.put_char(x, y + h - 1, '╰', style);
        fb.put_char(x + w - 1, y + h - 1, '╯', style);

        for dx in 1..w - 1 {
            fb.put_char(x + dx, y, '─', style);
            fb.put_char(x + dx, y + h - 1, '─', style);
        }
        for dy in 1..h - 1 {
            fb.put_char(x, y + dy, '│', style);
            fb.put_char(x + w - 1, y + dy, '│', style);
        }
    }

    fn draw_highlight(&self, fb: &mut FrameBuffer, inner: Rect, pos: Pos, bg: Rgb) {
        let (x, y) = self.cell_origin(inner, pos);
        fb.fill_rect_clipped(x, y, self.cell_w, self.cell_h, inner, ' ', CellStyle::new(bg, bg));
    }

    fn draw_gem(
        &self,
        fb: &mut FrameBuffer,
        inner: Rect,
        pos: Pos,
        kind: GemKind,
        special: SpecialKind,
        visual: CellVisual,
    ) {
        if visual.alpha <= 0.05 {
            return;
        }

        let (cx, cy) = self.cell_origin(inner, pos);
        let x = cx + (visual.d_col * self.cell_w as f32).round() as i32;
        let y = cy + (visual.d_row * self.cell_h as f32).round() as i32;

        let base = gem_color(kind);
        let fg = BOARD_BG.lerp(base, visual.alpha);
        let fill_bg = BOARD_BG.lerp(base.scale(0.35), visual.alpha);
        let fill = if visual.flash {
            CellStyle::new(fg, base.scale(0.7)).bold()
        } else {
            CellStyle::new(fg, fill_bg)
        };

        // Leave a one-column gutter so neighbouring gems stay distinct.
        let body_w = if self.cell_w > 2 { self.cell_w - 1 } else { self.cell_w };
        fb.fill_rect_clipped(x, y, body_w, self.cell_h, inner, ' ', fill);

        let glyph = match special {
            SpecialKind::None => gem_glyph(kind),
            other => special_glyph(other),
        };
        let glyph_style = if special.is_special() { fill.bold() } else { fill };
        let gx = x + (body_w as i32 - 1) / 2;
        let gy = y + (self.cell_h as i32 - 1) / 2;
        fb.put_char_clipped(gx, gy, inner, glyph, glyph_style);
        if special == SpecialKind::LineClear && body_w >= 3 {
            fb.put_char_clipped(gx - 1, gy, inner, '═', glyph_style);
            fb.put_char_clipped(gx + 1, gy, inner, '═', glyph_style);
        }
    }

    fn draw_cursor(&self, fb: &mut FrameBuffer, inner: Rect, pos: Pos) {
        let style = CellStyle::new(Rgb::new(255, 255, 255), PANEL_BG).bold();
        let (x, y) = self.cell_origin(inner, pos);
        let right = x + self.cell_w as i32 - 1;
        let bottom = y + self.cell_h as i32 - 1;
        if self.cell_h >= 2 {
            fb.put_char_clipped(x, y, inner, '┌', style);
            fb.put_char_clipped(right, y, inner, '┐', style);
            fb.put_char_clipped(x, bottom, inner, '└', style);
            fb.put_char_clipped(right, bottom, inner, '┘', style);
        } else {
            fb.put_char_clipped(x, y, inner, '[', style);
            fb.put_char_clipped(right, y, inner, ']', style);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        snap: &BoardSnapshot,
        anim: Option<&Animator>,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        start_x: u16,
        start_y: u16,
        frame_w: u16,
    ) {
        let panel_x = start_x.saturating_add(frame_w).saturating_add(2);
        if panel_x >= viewport.width {
            return;
        }
        let panel_w = viewport.width - panel_x;
        if panel_w < 12 {
            return;
        }

        let label = CellStyle::new(Rgb::new(220, 220, 220), PANEL_BG).bold();
        let value = CellStyle::new(Rgb::new(200, 200, 200), PANEL_BG);
        let dim = value.dim();

        let mut y = start_y;
        fb.put_str(panel_x, y, "SCORE", label);
        y = y.saturating_add(1);
        let end = fb.put_u32(panel_x, y, snap.score, value);
        if let Some(p) = anim.and_then(|a| a.popup()) {
            let pop = CellStyle::new(Rgb::new(255, 220, 120), PANEL_BG).bold();
            let x = fb.put_str(end.saturating_add(1), y, "+", pop);
            fb.put_u32(x, y, p.points, pop);
        }
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "MOVES", label);
        y = y.saturating_add(1);
        fb.put_u32(panel_x, y, snap.moves_left, value);
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "PHASE", label);
        y = y.saturating_add(1);
        fb.put_str(panel_x, y, snap.phase.as_str(), value);
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "CASCADE", label);
        y = y.saturating_add(1);
        if snap.cascade > 1 {
            fb.put_char(panel_x, y, 'x', value);
            fb.put_u32(panel_x + 1, y, snap.cascade, value);
        } else {
            fb.put_str(panel_x, y, "-", value);
        }
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "EPISODE", label);
        y = y.saturating_add(1);
        fb.put_u32(panel_x, y, snap.episode_id, dim);
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "AI", label);
        y = y.saturating_add(1);
        if let Some(st) = adapter.filter(|st| st.enabled) {
            fb.put_str(panel_x, y, "ON", value);
            if panel_w >= 16 {
                fb.put_str(panel_x + 3, y, "clients", dim);
            }
            y = y.saturating_add(1);
            fb.put_str(panel_x, y, "C", value);
            fb.put_u32(panel_x + 2, y, st.client_count as u32, value);
            y = y.saturating_add(1);
            fb.put_str(panel_x, y, "S", value);
            fb.put_u32(panel_x + 2, y, st.streaming_count as u32, value);
            y = y.saturating_add(1);
            fb.put_str(panel_x, y, "CTRL", value);
            if let Some(id) = st.controller_id {
                fb.put_u32(panel_x + 5, y, id as u32, value);
            } else {
                fb.put_str(panel_x + 5, y, "-", value);
            }
        } else {
            fb.put_str(panel_x, y, "OFF", value);
        }

        let help_y = start_y.saturating_add(self.frame_size().1).saturating_sub(1);
        if help_y > y && panel_w >= 20 {
            fb.put_str(panel_x, help_y, "space:pick ?:hint r:new q:quit", dim);
        }
    }

    fn draw_overlay_text(
        &self,
        fb: &mut FrameBuffer,
        start_x: u16,
        start_y: u16,
        frame_w: u16,
        frame_h: u16,
        text: &str,
    ) {
        let mid_y = start_y.saturating_add(frame_h / 2);
        let style = CellStyle::new(Rgb::new(255, 255, 255), PANEL_BG).bold();
        let text_w = text.chars().count() as u16 + 2;
        let x = start_x.saturating_add(frame_w.saturating_sub(text_w) / 2);
        fb.fill_rect(x, mid_y, text_w, 1, ' ', style);
        fb.put_str_centered(start_x, mid_y, frame_w, text, style);
    }
}

fn gem_color(kind: GemKind) -> Rgb {
    match kind {
        GemKind::Ruby => Rgb::new(230, 60, 70),
        GemKind::Sapphire => Rgb::new(70, 120, 235),
        GemKind::Emerald => Rgb::new(60, 200, 110),
        GemKind::Topaz => Rgb::new(240, 200, 60),
        GemKind::Amethyst => Rgb::new(170, 90, 220),
        GemKind::Diamond => Rgb::new(220, 235, 245),
    }
}

fn gem_glyph(kind: GemKind) -> char {
    match kind {
        GemKind::Ruby => '◆',
        GemKind::Sapphire => '●',
        GemKind::Emerald => '■',
        GemKind::Topaz => '▲',
        GemKind::Amethyst => '✦',
        GemKind::Diamond => '◇',
    }
}

fn special_glyph(special: SpecialKind) -> char {
    match special {
        SpecialKind::None => ' ',
        SpecialKind::LineClear => '═',
        SpecialKind::AreaBomb => '✸',
        SpecialKind::ColorBomb => '✺',
    }
}
