//! Translation of raw keyboard, pointer and touch input into commands.

/// Default minimum horizontal travel for a swipe to count.
pub const SWIPE_THRESHOLD: f64 = 50.0;

/// Shortcut table shown in the help overlay.
pub const SHORTCUTS: &[(&str, &str)] = &[
    ("→ / Space", "Next slide"),
    ("←", "Previous slide"),
    ("Home", "First slide"),
    ("End", "Last slide"),
    ("N", "Toggle speaker notes"),
    ("Ctrl+P", "Print presentation"),
    ("E", "Export presentation"),
    ("F", "Toggle fullscreen"),
    ("Esc", "Close panel / overlay"),
    ("?", "Show this help"),
];

/// A key, independent of the platform producing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowRight,
    ArrowLeft,
    Space,
    Enter,
    Home,
    End,
    Escape,
    Char(char),
}

/// A key press with modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// Clickable navigation affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    PrevButton,
    NextButton,
    /// Position dot for a 1-based slide.
    Dot(usize),
}

/// Raw input as delivered by a front end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Key pressed while a position dot has focus.
    DotKey { slide: usize, key: Key },
    Click(Affordance),
    TouchStart { x: f64, y: f64 },
    TouchEnd { x: f64, y: f64 },
}

impl InputEvent {
    /// Whether this counts as deliberate interaction for the elapsed clock.
    pub fn is_interaction(&self) -> bool {
        matches!(
            self,
            InputEvent::Key(_) | InputEvent::DotKey { .. } | InputEvent::Click(_)
        )
    }
}

/// The closed set of operations the presenter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    First,
    Last,
    GoTo(usize),
    ToggleNotes,
    ShowHelp,
    /// Close overlays and hide notes.
    Escape,
    Print,
    Export,
    ToggleFullscreen,
}

/// Stateful router; remembers where a touch began.
#[derive(Debug, Clone)]
pub struct InputRouter {
    touch_start: Option<(f64, f64)>,
    swipe_threshold: f64,
}

impl InputRouter {
    pub fn new() -> Self {
        Self {
            touch_start: None,
            swipe_threshold: SWIPE_THRESHOLD,
        }
    }

    /// Require horizontal travel strictly greater than `threshold` for a swipe.
    pub fn with_swipe_threshold(mut self, threshold: f64) -> Self {
        self.swipe_threshold = threshold;
        self
    }

    pub fn swipe_threshold(&self) -> f64 {
        self.swipe_threshold
    }

    /// Map one event to a command, if it has one.
    pub fn route(&mut self, event: InputEvent) -> Option<Command> {
        match event {
            InputEvent::Key(key) => route_key(key),
            InputEvent::DotKey { slide, key } => match key {
                Key::Enter | Key::Space => Some(Command::GoTo(slide)),
                _ => None,
            },
            InputEvent::Click(Affordance::PrevButton) => Some(Command::Prev),
            InputEvent::Click(Affordance::NextButton) => Some(Command::Next),
            InputEvent::Click(Affordance::Dot(slide)) => Some(Command::GoTo(slide)),
            InputEvent::TouchStart { x, y } => {
                self.touch_start = Some((x, y));
                None
            }
            InputEvent::TouchEnd { x, y } => {
                let (start_x, start_y) = self.touch_start.take()?;
                swipe_command(start_x - x, start_y - y, self.swipe_threshold)
            }
        }
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn route_key(event: KeyEvent) -> Option<Command> {
    match event.key {
        Key::ArrowRight | Key::Space => Some(Command::Next),
        Key::ArrowLeft => Some(Command::Prev),
        Key::Home => Some(Command::First),
        Key::End => Some(Command::Last),
        Key::Escape => Some(Command::Escape),
        Key::Enter => None,
        Key::Char(c) => match c {
            'p' | 'P' if event.ctrl || event.meta => Some(Command::Print),
            'n' | 'N' => Some(Command::ToggleNotes),
            '?' => Some(Command::ShowHelp),
            '/' if event.shift => Some(Command::ShowHelp),
            'e' | 'E' if !event.ctrl && !event.meta => Some(Command::Export),
            'f' | 'F' if !event.ctrl && !event.meta => Some(Command::ToggleFullscreen),
            _ => None,
        },
    }
}

/// `dx`/`dy` are start minus end; a leftward swipe (positive `dx`) advances.
fn swipe_command(dx: f64, dy: f64, threshold: f64) -> Option<Command> {
    if dx.abs() <= dy.abs() || dx.abs() <= threshold {
        return None;
    }
    if dx > 0.0 {
        Some(Command::Next)
    } else {
        Some(Command::Prev)
    }
}

/// Parse a `#slide-N` location fragment.
pub fn parse_fragment(fragment: &str) -> Option<usize> {
    fragment
        .trim()
        .strip_prefix("#slide-")?
        .parse::<usize>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: Key) -> InputEvent {
        InputEvent::Key(KeyEvent::new(k))
    }

    #[test]
    fn test_navigation_keys() {
        let mut router = InputRouter::new();
        assert_eq!(router.route(key(Key::ArrowRight)), Some(Command::Next));
        assert_eq!(router.route(key(Key::Space)), Some(Command::Next));
        assert_eq!(router.route(key(Key::ArrowLeft)), Some(Command::Prev));
        assert_eq!(router.route(key(Key::Home)), Some(Command::First));
        assert_eq!(router.route(key(Key::End)), Some(Command::Last));
        assert_eq!(router.route(key(Key::Escape)), Some(Command::Escape));
        assert_eq!(router.route(key(Key::Enter)), None);
    }

    #[test]
    fn test_character_keys() {
        let mut router = InputRouter::new();
        assert_eq!(router.route(key(Key::Char('n'))), Some(Command::ToggleNotes));
        assert_eq!(router.route(key(Key::Char('N'))), Some(Command::ToggleNotes));
        assert_eq!(router.route(key(Key::Char('?'))), Some(Command::ShowHelp));
        assert_eq!(
            router.route(InputEvent::Key(KeyEvent::new(Key::Char('/')).with_shift())),
            Some(Command::ShowHelp)
        );
        assert_eq!(router.route(key(Key::Char('/'))), None);
        assert_eq!(router.route(key(Key::Char('x'))), None);
    }

    #[test]
    fn test_print_requires_modifier() {
        let mut router = InputRouter::new();
        assert_eq!(router.route(key(Key::Char('p'))), None);
        assert_eq!(
            router.route(InputEvent::Key(KeyEvent::new(Key::Char('p')).with_ctrl())),
            Some(Command::Print)
        );
        assert_eq!(
            router.route(InputEvent::Key(KeyEvent::new(Key::Char('P')).with_meta())),
            Some(Command::Print)
        );
    }

    #[test]
    fn test_clicks_and_dots() {
        let mut router = InputRouter::new();
        assert_eq!(
            router.route(InputEvent::Click(Affordance::NextButton)),
            Some(Command::Next)
        );
        assert_eq!(
            router.route(InputEvent::Click(Affordance::PrevButton)),
            Some(Command::Prev)
        );
        assert_eq!(
            router.route(InputEvent::Click(Affordance::Dot(4))),
            Some(Command::GoTo(4))
        );
        assert_eq!(
            router.route(InputEvent::DotKey { slide: 2, key: Key::Enter }),
            Some(Command::GoTo(2))
        );
        assert_eq!(
            router.route(InputEvent::DotKey { slide: 2, key: Key::Char('a') }),
            None
        );
    }

    #[test]
    fn test_swipe_left_advances() {
        let mut router = InputRouter::new();
        assert_eq!(router.route(InputEvent::TouchStart { x: 300.0, y: 100.0 }), None);
        assert_eq!(
            router.route(InputEvent::TouchEnd { x: 200.0, y: 110.0 }),
            Some(Command::Next)
        );
    }

    #[test]
    fn test_swipe_right_goes_back() {
        let mut router = InputRouter::new();
        router.route(InputEvent::TouchStart { x: 0.0, y: 0.0 });
        assert_eq!(
            router.route(InputEvent::TouchEnd { x: 80.0, y: 5.0 }),
            Some(Command::Prev)
        );
    }

    #[test]
    fn test_short_or_vertical_swipes_ignored() {
        let mut router = InputRouter::new();

        router.route(InputEvent::TouchStart { x: 100.0, y: 100.0 });
        assert_eq!(router.route(InputEvent::TouchEnd { x: 60.0, y: 100.0 }), None);

        router.route(InputEvent::TouchStart { x: 100.0, y: 0.0 });
        assert_eq!(router.route(InputEvent::TouchEnd { x: 20.0, y: 200.0 }), None);

        // Exactly the threshold does not count.
        router.route(InputEvent::TouchStart { x: 100.0, y: 0.0 });
        assert_eq!(router.route(InputEvent::TouchEnd { x: 50.0, y: 0.0 }), None);
    }

    #[test]
    fn test_custom_swipe_threshold() {
        let mut router = InputRouter::new().with_swipe_threshold(120.0);
        assert_eq!(router.swipe_threshold(), 120.0);

        router.route(InputEvent::TouchStart { x: 300.0, y: 0.0 });
        assert_eq!(router.route(InputEvent::TouchEnd { x: 200.0, y: 0.0 }), None);

        router.route(InputEvent::TouchStart { x: 300.0, y: 0.0 });
        assert_eq!(
            router.route(InputEvent::TouchEnd { x: 150.0, y: 0.0 }),
            Some(Command::Next)
        );
    }

    #[test]
    fn test_touch_end_without_start() {
        let mut router = InputRouter::new();
        assert_eq!(router.route(InputEvent::TouchEnd { x: 0.0, y: 0.0 }), None);

        // Origin coordinates are a valid start point.
        router.route(InputEvent::TouchStart { x: 0.0, y: 0.0 });
        router.route(InputEvent::TouchEnd { x: -100.0, y: 0.0 });
        assert_eq!(router.route(InputEvent::TouchEnd { x: -100.0, y: 0.0 }), None);
    }

    #[test]
    fn test_parse_fragment() {
        assert_eq!(parse_fragment("#slide-3"), Some(3));
        assert_eq!(parse_fragment(" #slide-12 "), Some(12));
        assert_eq!(parse_fragment("#slide-"), None);
        assert_eq!(parse_fragment("#slide-x"), None);
        assert_eq!(parse_fragment("slide-3"), None);
        assert_eq!(parse_fragment("#page-3"), None);
    }
}
