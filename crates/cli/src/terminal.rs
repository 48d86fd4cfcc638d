//! Plain-text presentation surface and stdin token parsing.

use deck_core::extract::strip_tags;
use deck_core::{
    Affordance, InputEvent, Key, KeyEvent, Notification, NotificationKind, PresentationSurface,
    SlideRecord,
};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;

/// Writes the presentation as text to any writer.
///
/// Downloads are saved as files under `output_dir`.
pub struct TerminalSurface<W: Write> {
    out: W,
    output_dir: PathBuf,
    timer: Option<String>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            out,
            output_dir: output_dir.into(),
            timer: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments) {
        if let Err(e) = writeln!(self.out, "{}", args) {
            log::warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> PresentationSurface for TerminalSurface<W> {
    fn render_slide(&mut self, slide: &SlideRecord) {
        self.line(format_args!(""));
        self.line(format_args!("=== {} ===", display_title(slide)));
        for line in &slide.content_lines {
            self.line(format_args!("  {}", line));
        }
    }

    fn update_counter(&mut self, current: usize, total: usize) {
        match self.timer.clone() {
            Some(timer) => self.line(format_args!("[{}/{}]  {}", current, total, timer)),
            None => self.line(format_args!("[{}/{}]", current, total)),
        }
    }

    fn update_affordances(&mut self, can_prev: bool, can_next: bool, next_label: &str) {
        let prev = if can_prev { "❮ Prev" } else { "  -   " };
        let next = if can_next {
            next_label.to_string()
        } else {
            format!("({})", next_label)
        };
        self.line(format_args!("{}    {}", prev, next));
    }

    fn update_position(&mut self, current: usize, total: usize) {
        let dots: Vec<&str> = (1..=total)
            .map(|i| if i == current { "●" } else { "○" })
            .collect();
        self.line(format_args!("{}", dots.join(" ")));
    }

    fn set_notes_visible(&mut self, visible: bool) {
        if !visible {
            self.line(format_args!("(notes hidden)"));
        }
    }

    fn show_notes(&mut self, notes_html: &str) {
        self.line(format_args!("Notes: {}", strip_tags(notes_html)));
    }

    fn announce(&mut self, message: &str) {
        log::debug!("Announce: {}", message);
    }

    fn notify(&mut self, notification: &Notification) {
        let mark = match notification.kind {
            NotificationKind::Success => "✓",
            NotificationKind::Error => "✗",
        };
        self.line(format_args!("{} {}", mark, notification.message));
    }

    fn set_help_visible(&mut self, visible: bool, shortcuts: &[(&str, &str)]) {
        if !visible {
            return;
        }
        self.line(format_args!("Keyboard shortcuts:"));
        for (keys, action) in shortcuts {
            self.line(format_args!("  {:<12} {}", keys, action));
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        let state = if fullscreen { "on" } else { "off" };
        self.line(format_args!("Fullscreen {}", state));
    }

    fn print_all(&mut self, slides: &[&SlideRecord]) {
        for slide in slides {
            self.line(format_args!("{}", "-".repeat(60)));
            self.line(format_args!("{}", display_title(slide)));
            self.line(format_args!(""));
            for line in &slide.content_lines {
                self.line(format_args!("  {}", line));
            }
            if slide.has_notes() {
                self.line(format_args!(""));
                self.line(format_args!("  Notes: {}", strip_tags(&slide.notes_html)));
            }
        }
        self.line(format_args!("{}", "-".repeat(60)));
    }

    fn update_timer(&mut self, display: &str) {
        self.timer = Some(display.to_string());
    }

    fn download(&mut self, filename: &str, contents: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(filename);
        std::fs::write(&path, contents)?;
        self.line(format_args!("Saved {}", path.display()));
        Ok(())
    }
}

fn display_title(slide: &SlideRecord) -> String {
    if slide.title.trim().is_empty() {
        format!("Slide {}", slide.index)
    } else {
        format!("{}. {}", slide.index, slide.title)
    }
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Input(Vec<InputEvent>),
    Quit,
}

/// Parse an input line such as `right`, `ctrl+p`, `3` or `swipe -80 5`.
pub fn parse_token(line: &str) -> Option<Token> {
    let mut parts = line.split_whitespace();
    let word = parts.next()?;

    if word.eq_ignore_ascii_case("swipe") {
        let dx: f64 = parts.next()?.parse().ok()?;
        let dy: f64 = parts.next().unwrap_or("0").parse().ok()?;
        return Some(Token::Input(vec![
            InputEvent::TouchStart { x: 0.0, y: 0.0 },
            InputEvent::TouchEnd { x: dx, y: dy },
        ]));
    }

    if let Ok(slide) = word.parse::<usize>() {
        return Some(Token::Input(vec![InputEvent::Click(Affordance::Dot(slide))]));
    }

    let key = match word.to_ascii_lowercase().as_str() {
        "q" | "quit" => return Some(Token::Quit),
        "right" => KeyEvent::new(Key::ArrowRight),
        "left" => KeyEvent::new(Key::ArrowLeft),
        "space" => KeyEvent::new(Key::Space),
        "enter" => KeyEvent::new(Key::Enter),
        "home" => KeyEvent::new(Key::Home),
        "end" => KeyEvent::new(Key::End),
        "esc" | "escape" => KeyEvent::new(Key::Escape),
        "ctrl+p" => KeyEvent::new(Key::Char('p')).with_ctrl(),
        "cmd+p" | "meta+p" => KeyEvent::new(Key::Char('p')).with_meta(),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyEvent::new(Key::Char(c)),
                _ => return None,
            }
        }
    };

    Some(Token::Input(vec![InputEvent::Key(key)]))
}
