//! TerminalRenderer: flushes a framebuffer to a real terminal.
//!
//! Frames are diffed against the previous one and only changed runs are written.
//! Style changes and cursor moves are only emitted when the next cell needs them.

use std::io::{self, Write};

use anyhow::Result;

use crossterm::{
    cursor, event,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal, QueueableCommand,
};

use crate::fb::{CellStyle, FrameBuffer, Rgb};

/// How much a draw wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawStats {
    pub runs: u32,
    pub cells: u32,
    pub bytes: usize,
}

pub struct TerminalRenderer {
    stdout: io::Stdout,
    prev: FrameBuffer,
    /// Next draw must repaint everything
    dirty: bool,
    buf: Vec<u8>,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            prev: FrameBuffer::new(0, 0),
            dirty: true,
            buf: Vec::with_capacity(64 * 1024),
        }
    }

    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.buf.clear();
        self.buf.queue(terminal::EnterAlternateScreen)?;
        self.buf.queue(cursor::Hide)?;
        self.buf.queue(terminal::DisableLineWrap)?;
        self.buf.queue(event::EnableMouseCapture)?;
        self.flush_buf()?;
        self.dirty = true;
        Ok(())
    }

    /// Restore the terminal. Safe to call after a failed `enter`.
    pub fn exit(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.queue(ResetColor)?;
        self.buf.queue(SetAttribute(Attribute::Reset))?;
        self.buf.queue(event::DisableMouseCapture)?;
        self.buf.queue(terminal::EnableLineWrap)?;
        self.buf.queue(cursor::Show)?;
        self.buf.queue(terminal::LeaveAlternateScreen)?;
        self.flush_buf()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Force the next draw to repaint the whole screen (terminal resize).
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Draw `fb`, then swap it with the previous frame so the caller can refill the
    /// old buffer next frame without cloning.
    pub fn draw_swap(&mut self, fb: &mut FrameBuffer) -> Result<DrawStats> {
        self.buf.clear();
        let resized = self.prev.width() != fb.width() || self.prev.height() != fb.height();
        let mut stats = if self.dirty || resized {
            encode_full_into(fb, &mut self.buf)?
        } else {
            encode_diff_into(&self.prev, fb, &mut self.buf)?
        };
        stats.bytes = self.buf.len();
        if !self.buf.is_empty() {
            self.flush_buf()?;
        }

        if resized {
            self.prev.resize(fb.width(), fb.height());
        }
        std::mem::swap(&mut self.prev, fb);
        self.dirty = false;
        Ok(stats)
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.stdout.write_all(&self.buf)?;
        self.stdout.flush()?;
        Ok(())
    }
}

/// Tracks terminal pen state while encoding so redundant commands are skipped.
struct Pen {
    style: Option<CellStyle>,
    at: Option<(u16, u16)>,
}

impl Pen {
    fn new() -> Self {
        Self {
            style: None,
            at: None,
        }
    }

    fn print(&mut self, out: &mut Vec<u8>, x: u16, y: u16, ch: char, style: CellStyle) -> Result<()> {
        if self.at != Some((x, y)) {
            out.queue(cursor::MoveTo(x, y))?;
        }
        if self.style != Some(style) {
            apply_style_into(out, style)?;
            self.style = Some(style);
        }
        out.queue(Print(ch))?;
        self.at = Some((x.saturating_add(1), y));
        Ok(())
    }

    fn finish(self, out: &mut Vec<u8>) -> Result<()> {
        if self.style.is_some() {
            out.queue(ResetColor)?;
            out.queue(SetAttribute(Attribute::Reset))?;
        }
        Ok(())
    }
}

/// Encode a full-frame repaint into `out`.
pub fn encode_full_into(fb: &FrameBuffer, out: &mut Vec<u8>) -> Result<DrawStats> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    let mut pen = Pen::new();
    for y in 0..fb.height() {
        for x in 0..fb.width() {
            let cell = fb.get(x, y).unwrap_or_default();
            pen.print(out, x, y, cell.ch, cell.style)?;
        }
    }
    pen.finish(out)?;

    Ok(DrawStats {
        runs: fb.height() as u32,
        cells: fb.width() as u32 * fb.height() as u32,
        bytes: out.len(),
    })
}

/// Encode only the runs of cells that differ between `prev` and `next`.
///
/// Frames of different sizes are treated as fully changed.
pub fn encode_diff_into(
    prev: &FrameBuffer,
    next: &FrameBuffer,
    out: &mut Vec<u8>,
) -> Result<DrawStats> {
    let mut stats = DrawStats::default();
    let mut pen = Pen::new();

    for_each_changed_run(prev, next, |x, y, len| {
        stats.runs += 1;
        stats.cells += len as u32;
        for dx in 0..len {
            let cell = next.get(x + dx, y).unwrap_or_default();
            pen.print(out, x + dx, y, cell.ch, cell.style)?;
        }
        Ok(())
    })?;
    pen.finish(out)?;

    stats.bytes = out.len();
    Ok(stats)
}

fn apply_style_into(out: &mut Vec<u8>, style: CellStyle) -> Result<()> {
    out.queue(SetAttribute(Attribute::Reset))?;
    out.queue(SetForegroundColor(rgb_to_color(style.fg)))?;
    out.queue(SetBackgroundColor(rgb_to_color(style.bg)))?;
    if style.bold {
        out.queue(SetAttribute(Attribute::Bold))?;
    }
    if style.dim {
        out.queue(SetAttribute(Attribute::Dim))?;
    }
    Ok(())
}

fn rgb_to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

fn for_each_changed_run(
    prev: &FrameBuffer,
    next: &FrameBuffer,
    mut f: impl FnMut(u16, u16, u16) -> Result<()>,
) -> Result<()> {
    let w = next.width();
    if prev.width() != w || prev.height() != next.height() {
        for y in 0..next.height() {
            f(0, y, w)?;
        }
        return Ok(());
    }

    let row_len = w as usize;
    for (y, (a, b)) in prev
        .cells()
        .chunks(row_len.max(1))
        .zip(next.cells().chunks(row_len.max(1)))
        .enumerate()
    {
        let mut x = 0usize;
        while x < row_len {
            if a[x] == b[x] {
                x += 1;
                continue;
            }
            let start = x;
            while x < row_len && a[x] != b[x] {
                x += 1;
            }
            f(start as u16, y as u16, (x - start) as u16)?;
        }
    }

    Ok(())
}
