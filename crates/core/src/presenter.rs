//! Presenter: the navigation state machine wired to a surface.
//!
//! Every successful transition pushes the same ordered sequence to the
//! surface: render, counter, affordances, position indicator, notes panel
//! (only while visible), announcement. Scheduled work (auto-advance,
//! announcement cleanup, notification dismissal, timer ticks) runs from
//! [`Presenter::advance_clock`] on the caller's thread.

use crate::elapsed::ElapsedClock;
use crate::error::{Error, Result};
use crate::extract::{ExportOptions, Extractor};
use crate::input::{parse_fragment, Command, InputEvent, InputRouter, SHORTCUTS, SWIPE_THRESHOLD};
use crate::navigation::{Navigator, Transition};
use crate::notes::NotesCache;
use crate::repository::SlideRepository;
use crate::schedule::{Millis, Scheduler, TaskId};
use crate::surface::{Notification, NotificationKind, PresentationSurface};
use crate::types::{ExportSnapshot, NavigationState, SlideRecord};

const NEXT_LABEL: &str = "Next ❯";
const DONE_LABEL: &str = "Done ✓";

/// Timing and input knobs; durations are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenterConfig {
    /// Auto-advance interval started by [`Presenter::start`], if any.
    pub auto_advance_ms: Option<Millis>,
    /// How long an announcement stays before it is cleared.
    pub announcement_ms: Millis,
    /// How long a notification stays before it is dismissed.
    pub notification_ms: Millis,
    /// Interval between elapsed-time display updates.
    pub timer_tick_ms: Millis,
    /// Minimum horizontal travel for a swipe.
    pub swipe_threshold: f64,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            auto_advance_ms: None,
            announcement_ms: 1_000,
            notification_ms: 3_000,
            timer_tick_ms: 1_000,
            swipe_threshold: SWIPE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    AutoAdvance,
    ClearAnnouncement,
    DismissNotification(u64),
    TimerTick,
}

/// Owns one deck's navigation state and drives a surface from it.
pub struct Presenter<R, S> {
    repository: R,
    notes: NotesCache,
    navigator: Navigator,
    surface: S,
    router: InputRouter,
    extractor: Extractor,
    config: PresenterConfig,
    scheduler: Scheduler<Task>,
    now: Millis,
    clock: ElapsedClock,
    auto_advance: Option<TaskId>,
    announcement: Option<TaskId>,
    timer_tick: Option<TaskId>,
    help_visible: bool,
    fullscreen: bool,
    next_notification_id: u64,
}

impl<R: SlideRepository, S: PresentationSurface> Presenter<R, S> {
    /// Build a presenter for a non-empty repository.
    pub fn new(repository: R, surface: S) -> Result<Self> {
        if repository.is_empty() {
            return Err(Error::EmptyDeck(
                repository.title().unwrap_or("presentation").to_string(),
            ));
        }

        let notes = NotesCache::build(&repository);
        let navigator = Navigator::new(repository.len());

        Ok(Self {
            repository,
            notes,
            navigator,
            surface,
            router: InputRouter::new(),
            extractor: Extractor::default(),
            config: PresenterConfig::default(),
            scheduler: Scheduler::new(),
            now: 0,
            clock: ElapsedClock::new(),
            auto_advance: None,
            announcement: None,
            timer_tick: None,
            help_visible: false,
            fullscreen: false,
            next_notification_id: 0,
        })
    }

    pub fn with_config(mut self, config: PresenterConfig) -> Self {
        self.router = InputRouter::new().with_swipe_threshold(config.swipe_threshold);
        self.config = config;
        self
    }

    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.extractor = Extractor::new(options);
        self
    }

    /// Show the first slide and start any configured auto-advance.
    /// Call once before handling input.
    pub fn start(&mut self) {
        self.sync_surface();
        if let Some(interval) = self.config.auto_advance_ms {
            self.start_auto_advance(interval);
        }
    }

    pub fn state(&self) -> NavigationState {
        self.navigator.state()
    }

    pub fn current(&self) -> usize {
        self.navigator.current()
    }

    pub fn total(&self) -> usize {
        self.navigator.total()
    }

    pub fn current_slide(&self) -> Option<&SlideRecord> {
        self.repository.find_slide_by_index(self.navigator.current())
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn notes(&self) -> &NotesCache {
        &self.notes
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn is_help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_auto_advancing(&self) -> bool {
        self.auto_advance
            .is_some_and(|id| self.scheduler.is_scheduled(id))
    }

    /// When the next piece of scheduled work is due.
    pub fn next_deadline(&mut self) -> Option<Millis> {
        self.scheduler.next_deadline()
    }

    /// Move to slide `index`; out-of-range requests are ignored.
    pub fn go_to(&mut self, index: usize) -> Transition {
        if self.repository.find_slide_by_index(index).is_none() {
            log::debug!("No slide at position {}", index);
            return Transition::Ignored;
        }

        let transition = self.navigator.go_to(index);
        if transition.is_moved() {
            self.sync_surface();
        }
        transition
    }

    pub fn next(&mut self) -> Transition {
        let transition = self.navigator.next();
        if transition.is_moved() {
            self.sync_surface();
        }
        transition
    }

    pub fn prev(&mut self) -> Transition {
        let transition = self.navigator.prev();
        if transition.is_moved() {
            self.sync_surface();
        }
        transition
    }

    pub fn first(&mut self) -> Transition {
        self.go_to(1)
    }

    pub fn last(&mut self) -> Transition {
        self.go_to(self.navigator.total())
    }

    /// Seed the position from a `#slide-N` fragment.
    pub fn open_fragment(&mut self, fragment: &str) -> Transition {
        match parse_fragment(fragment) {
            Some(index) => self.go_to(index),
            None => Transition::Ignored,
        }
    }

    /// Flip the notes panel, returning the new visibility.
    pub fn toggle_notes(&mut self) -> bool {
        let visible = self.navigator.toggle_notes();
        self.surface.set_notes_visible(visible);
        if visible {
            self.surface
                .show_notes(self.notes.get(self.navigator.current()));
        }
        visible
    }

    pub fn show_help(&mut self) {
        self.help_visible = true;
        self.surface.set_help_visible(true, SHORTCUTS);
    }

    /// Close the help overlay and hide notes, whichever are open.
    pub fn close_overlays(&mut self) {
        if self.help_visible {
            self.help_visible = false;
            self.surface.set_help_visible(false, SHORTCUTS);
        }
        if self.navigator.notes_visible() {
            self.toggle_notes();
        }
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.surface.set_fullscreen(self.fullscreen);
        self.fullscreen
    }

    /// Route a raw input event, starting the elapsed clock on first interaction.
    pub fn handle_input(&mut self, event: InputEvent) {
        if event.is_interaction() {
            self.start_elapsed_clock();
        }
        if let Some(command) = self.router.route(event) {
            self.dispatch(command);
        }
    }

    pub fn dispatch(&mut self, command: Command) {
        log::debug!("Dispatching {:?} on slide {}", command, self.current());
        match command {
            Command::Next => {
                self.next();
            }
            Command::Prev => {
                self.prev();
            }
            Command::First => {
                self.first();
            }
            Command::Last => {
                self.last();
            }
            Command::GoTo(index) => {
                self.go_to(index);
            }
            Command::ToggleNotes => {
                self.toggle_notes();
            }
            Command::ShowHelp => self.show_help(),
            Command::Escape => self.close_overlays(),
            Command::Print => self.prepare_print(),
            Command::Export => {
                self.export();
            }
            Command::ToggleFullscreen => {
                self.toggle_fullscreen();
            }
        }
    }

    /// Advance `next()` every `interval` ms until the last slide.
    ///
    /// Any running auto-advance is cancelled first.
    pub fn start_auto_advance(&mut self, interval: Millis) {
        self.stop_auto_advance();
        let id = self
            .scheduler
            .schedule_repeating(Task::AutoAdvance, self.now, interval);
        self.auto_advance = Some(id);
        log::debug!("Auto-advance every {} ms", interval);
    }

    /// Cancel auto-advance; a no-op when none is running.
    pub fn stop_auto_advance(&mut self) {
        if let Some(id) = self.auto_advance.take() {
            self.scheduler.cancel(id);
            log::debug!("Auto-advance stopped on slide {}", self.current());
        }
    }

    /// Move the clock forward to `now` and run everything that fell due.
    ///
    /// Each task runs with the clock at its own deadline, so work it
    /// schedules is timed from when it was due.
    pub fn advance_clock(&mut self, now: Millis) {
        let target = self.now.max(now);
        while let Some((id, task, deadline)) = self.scheduler.pop_due(target) {
            self.now = self.now.max(deadline);
            self.run_task(id, task);
        }
        self.now = target;
    }

    /// Snapshot of the deck as it would be exported now.
    pub fn snapshot(&self) -> ExportSnapshot {
        self.extractor
            .extract_all(&self.repository, &self.notes, self.navigator.state())
    }

    /// Serialize the deck and hand it to the surface as a download.
    ///
    /// Failures are logged and shown as an error notification; the returned
    /// file name is `None` in that case.
    pub fn export(&mut self) -> Option<String> {
        let filename = self.extractor.file_name(&self.repository);
        let snapshot = self.snapshot();

        let result = serde_json::to_vec_pretty(&snapshot)
            .map_err(Error::from)
            .and_then(|bytes| {
                self.surface
                    .download(&filename, &bytes)
                    .map_err(Error::from)
            });

        match result {
            Ok(()) => {
                log::info!("Exported {} slides to {}", snapshot.slides.len(), filename);
                self.notify("Presentation exported!", NotificationKind::Success);
                Some(filename)
            }
            Err(e) => {
                log::error!("Export error: {}", e);
                self.notify("Export failed", NotificationKind::Error);
                None
            }
        }
    }

    /// Lay every slide out for printing, then restore the current slide.
    pub fn prepare_print(&mut self) {
        let slides: Vec<&SlideRecord> = self.repository.slides().collect();
        self.surface.print_all(&slides);
        self.sync_surface();
        self.notify("Print dialog opened", NotificationKind::Success);
    }

    fn sync_surface(&mut self) {
        let current = self.navigator.current();
        let total = self.navigator.total();

        if let Some(slide) = self.repository.find_slide_by_index(current) {
            self.surface.render_slide(slide);
        }
        self.surface.update_counter(current, total);

        let next_label = if self.navigator.is_last() {
            DONE_LABEL
        } else {
            NEXT_LABEL
        };
        self.surface.update_affordances(
            !self.navigator.is_first(),
            !self.navigator.is_last(),
            next_label,
        );
        self.surface.update_position(current, total);

        if self.navigator.notes_visible() {
            self.surface.show_notes(self.notes.get(current));
        }

        self.announce(&format!("Slide {} of {}", current, total));
    }

    fn announce(&mut self, message: &str) {
        self.surface.announce(message);
        if let Some(previous) = self.announcement.take() {
            self.scheduler.cancel(previous);
        }
        let id = self.scheduler.schedule_once(
            Task::ClearAnnouncement,
            self.now.saturating_add(self.config.announcement_ms),
        );
        self.announcement = Some(id);
    }

    fn notify(&mut self, message: &str, kind: NotificationKind) {
        let id = self.next_notification_id;
        self.next_notification_id += 1;

        self.surface.notify(&Notification {
            id,
            message: message.to_string(),
            kind,
        });
        self.scheduler.schedule_once(
            Task::DismissNotification(id),
            self.now.saturating_add(self.config.notification_ms),
        );
    }

    fn start_elapsed_clock(&mut self) {
        if !self.clock.start(self.now) {
            return;
        }
        self.surface.update_timer(&self.clock.display(self.now));
        let id = self.scheduler.schedule_repeating(
            Task::TimerTick,
            self.now,
            self.config.timer_tick_ms,
        );
        self.timer_tick = Some(id);
    }

    fn run_task(&mut self, id: TaskId, task: Task) {
        match task {
            Task::AutoAdvance => {
                if !self.navigator.is_last() {
                    self.next();
                }
                if self.navigator.is_last() {
                    self.stop_auto_advance();
                }
            }
            Task::ClearAnnouncement => {
                if self.announcement == Some(id) {
                    self.announcement = None;
                    self.surface.clear_announcement();
                }
            }
            Task::DismissNotification(notification) => {
                self.surface.dismiss_notification(notification);
            }
            Task::TimerTick => {
                if self.timer_tick == Some(id) {
                    self.surface.update_timer(&self.clock.display(self.now));
                }
            }
        }
    }
}
