use std::io::{self, Write};

use crossterm::{
    cursor, execute,
    style::{Color, Print, Stylize},
    terminal::{Clear, ClearType},
};
use unicode_width::UnicodeWidthChar;

use crate::ui::symbols::Symbols;

pub(crate) const TITLE_BANNER: [&str; 5] = [
    "  ___                       _ _   _    ",
    " | _ \\__ _ __ _ ___ ____ __ (_) |_| |_  ",
    " |  _/ _` / _` / -_|_-< '  \\| |  _| ' \\ ",
    " |_| \\__,_\\__, \\___/__/_|_|_|_|\\__|_||_|",
    "          |___/                         ",
];

/// Append-only transcript plus a managed footer (status line, input line and
/// hint line) that is redrawn in place.
pub(crate) struct Screen {
    stdout: io::Stdout,
    pub status: String,
    pub hint: String,
    pub input: String,
    /// Byte offset of the cursor inside `input`.
    pub input_cursor: usize,
    /// Shows the animated spinner in front of `status`.
    pub is_running: bool,
    pub spinner_tick: u64,
    managed_lines: usize,
    cursor_rows_above_hint: usize,
}

impl Screen {
    pub(crate) fn new(subtitle: &[String]) -> io::Result<Self> {
        let mut s = Self {
            stdout: io::stdout(),
            status: String::new(),
            hint: String::new(),
            input: String::new(),
            input_cursor: 0,
            is_running: false,
            spinner_tick: 0,
            managed_lines: 3,
            cursor_rows_above_hint: 0,
        };
        execute!(s.stdout, cursor::MoveToColumn(0), Print("\r\n"))?;
        for line in TITLE_BANNER {
            execute!(
                s.stdout,
                cursor::MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(format!(
                    "{}\r\n",
                    line.with(Color::Rgb {
                        r: 94,
                        g: 196,
                        b: 255
                    })
                    .bold()
                ))
            )?;
        }

        let budget = terminal_cols().saturating_sub(rendered_text_width("  "));
        for (i, line) in subtitle.iter().enumerate() {
            let line = fit_single_line_tail(line, budget);
            let styled = if i == 0 {
                line.bold().to_string()
            } else {
                line.grey().to_string()
            };
            execute!(
                s.stdout,
                cursor::MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(format!("  {styled}\r\n"))
            )?;
        }
        execute!(s.stdout, Print("\r\n"))?;
        s.draw_managed();
        Ok(s)
    }

    fn clear_managed(&mut self) {
        if self.cursor_rows_above_hint > 0 {
            let down = self.cursor_rows_above_hint.min(u16::MAX as usize) as u16;
            let _ = execute!(self.stdout, cursor::MoveDown(down));
            self.cursor_rows_above_hint = 0;
        }
        let up = self.managed_lines.saturating_sub(1).min(u16::MAX as usize) as u16;
        let _ = execute!(
            self.stdout,
            cursor::MoveToColumn(0),
            cursor::MoveUp(up),
            Clear(ClearType::FromCursorDown),
        );
    }

    fn draw_managed(&mut self) {
        let cols = terminal_cols();
        let sym = Symbols::current();
        let _ = execute!(self.stdout, cursor::Hide);

        let status = if self.is_running {
            let frame = sym.spinner_frames[self.spinner_tick as usize % sym.spinner_frames.len()];
            let label = if self.status.is_empty() {
                "Generating..."
            } else {
                self.status.as_str()
            };
            format!("{} {}", frame.cyan().bold(), label)
        } else {
            self.status.clone()
        };
        let status = fit_single_line_tail_styled(&status, cols.saturating_sub(2));
        let _ = execute!(self.stdout, Print(format!("  {status}\r\n")));

        let prompt = format!("{} ", sym.prompt);
        let prompt_width = rendered_text_width(&prompt);
        let budget = cols.saturating_sub(prompt_width);
        let (shown, cursor_col) = visible_input_window(&self.input, self.input_cursor, budget);
        let _ = execute!(self.stdout, Print(format!("{prompt}{shown}\r\n")));

        let hint = fit_single_line_tail(&self.hint, cols.saturating_sub(2));
        let _ = execute!(self.stdout, Print(format!("  {}", hint.dark_grey())));
        self.managed_lines = 3;

        let col = (prompt_width + cursor_col).min(u16::MAX as usize) as u16;
        let _ = execute!(
            self.stdout,
            cursor::MoveUp(1),
            cursor::MoveToColumn(col),
            cursor::Show
        );
        self.cursor_rows_above_hint = 1;
        let _ = self.stdout.flush();
    }

    /// Print `lines` above the managed footer.
    pub(crate) fn emit(&mut self, lines: &[String]) {
        self.clear_managed();
        for line in lines {
            let _ = execute!(self.stdout, Print(format!("{line}\r\n")));
        }
        self.draw_managed();
    }

    pub(crate) fn refresh(&mut self) {
        self.clear_managed();
        self.draw_managed();
    }

    /// Advance the spinner by one frame and redraw.
    pub(crate) fn tick(&mut self) {
        if self.is_running {
            self.spinner_tick = self.spinner_tick.wrapping_add(1);
            self.refresh();
        }
    }

    /// Leave the footer in place and move below it before exiting.
    pub(crate) fn finish(&mut self) {
        self.clear_managed();
        let _ = execute!(self.stdout, cursor::Show);
        let _ = self.stdout.flush();
    }

    // ── Input editing ────────────────────────────────────────────────────────

    pub(crate) fn take_input(&mut self) -> String {
        self.input_cursor = 0;
        std::mem::take(&mut self.input)
    }

    pub(crate) fn insert_char_at_cursor(&mut self, c: char) {
        self.input.insert(self.input_cursor, c);
        self.input_cursor += c.len_utf8();
    }

    pub(crate) fn insert_at_cursor(&mut self, s: &str) {
        self.input.insert_str(self.input_cursor, s);
        self.input_cursor += s.len();
    }

    pub(crate) fn delete_char_before_cursor(&mut self) -> Option<char> {
        let ch = self.input[..self.input_cursor].chars().next_back()?;
        self.input_cursor -= ch.len_utf8();
        self.input.remove(self.input_cursor);
        Some(ch)
    }

    pub(crate) fn cursor_left(&mut self) -> bool {
        match self.input[..self.input_cursor].chars().next_back() {
            Some(ch) => {
                self.input_cursor -= ch.len_utf8();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cursor_right(&mut self) -> bool {
        match self.input[self.input_cursor..].chars().next() {
            Some(ch) => {
                self.input_cursor += ch.len_utf8();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub(crate) fn cursor_end(&mut self) {
        self.input_cursor = self.input.len();
    }
}

fn terminal_cols() -> usize {
    crossterm::terminal::size()
        .map(|(c, _)| c.max(1) as usize)
        .unwrap_or(80)
}

/// Slice of `input` that fits in `budget` columns while keeping the cursor
/// visible, plus the cursor column inside that slice.
fn visible_input_window(input: &str, cursor: usize, budget: usize) -> (String, usize) {
    let before = &input[..cursor];
    let before_width = rendered_text_width(before);
    if rendered_text_width(input) <= budget || budget == 0 {
        return (input.to_string(), before_width);
    }

    // Keep the tail that ends at the cursor, then fill with what follows.
    let mut kept: Vec<char> = Vec::new();
    let mut used = 0usize;
    for ch in before.chars().rev() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget.saturating_sub(1) {
            break;
        }
        kept.push(ch);
        used += w;
    }
    kept.reverse();
    let cursor_col = used;
    for ch in input[cursor..].chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        kept.push(ch);
        used += w;
    }
    (kept.into_iter().collect(), cursor_col)
}

pub(crate) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' && matches!(chars.peek(), Some('[')) {
            let _ = chars.next();
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}

pub(crate) fn rendered_text_width(s: &str) -> usize {
    const TAB_STOP: usize = 8;
    let mut col = 0usize;
    for ch in s.chars() {
        match ch {
            '\t' => col += TAB_STOP - (col % TAB_STOP),
            '\r' | '\n' => {}
            c if c.is_control() => {}
            c => col += UnicodeWidthChar::width(c).unwrap_or(0),
        }
    }
    col
}

/// Plain-text tail of `s` that fits in `max_width`, prefixed with an
/// ellipsis when anything was cut.
pub(crate) fn fit_single_line_tail(s: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let plain = strip_ansi(s).replace(['\t', '\n', '\r'], " ");
    if rendered_text_width(plain.as_str()) <= max_width {
        return plain;
    }

    let ellipsis = Symbols::current().ellipsis;
    let ellipsis_width = rendered_text_width(ellipsis);
    if max_width <= ellipsis_width {
        return ellipsis.to_string();
    }
    let budget = max_width - ellipsis_width;

    let mut kept_rev: Vec<char> = Vec::new();
    let mut used = 0usize;
    for ch in plain.chars().rev() {
        if ch.is_control() {
            continue;
        }
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w == 0 {
            continue;
        }
        if used + w > budget {
            break;
        }
        kept_rev.push(ch);
        used += w;
    }

    kept_rev.reverse();
    let mut out = String::from(ellipsis);
    out.extend(kept_rev);
    out
}

/// Like [`fit_single_line_tail`], but keeps styling when nothing needs cutting.
fn fit_single_line_tail_styled(s: &str, max_width: usize) -> String {
    if rendered_text_width(&strip_ansi(s)) <= max_width && !s.contains('\n') {
        s.to_string()
    } else {
        fit_single_line_tail(s, max_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_ansi_removes_color_sequences() {
        let styled = "ready".green().bold().to_string();
        assert_eq!(strip_ansi(&styled), "ready");
    }

    #[test]
    fn width_counts_wide_chars_and_tabs() {
        assert_eq!(rendered_text_width("abc"), 3);
        assert_eq!(rendered_text_width("页面"), 4);
        assert_eq!(rendered_text_width("a\tb"), 9);
    }

    #[test]
    fn tail_fit_keeps_the_end() {
        let ellipsis = Symbols::current().ellipsis;
        let fitted = fit_single_line_tail("abcdefghij", 6);
        assert!(fitted.starts_with(ellipsis));
        assert!(fitted.ends_with("hij"));
        assert!(rendered_text_width(&fitted) <= 6);
        assert_eq!(fit_single_line_tail("short", 10), "short");
    }

    #[test]
    fn input_window_follows_cursor() {
        let input = "0123456789";
        let (shown, col) = visible_input_window(input, 10, 5);
        assert_eq!(shown, "6789");
        assert_eq!(col, 4);

        let (shown, col) = visible_input_window(input, 2, 20);
        assert_eq!(shown, input);
        assert_eq!(col, 2);
    }
}
