//! Core domain types, navigation state machine, speaker notes, export
//! extraction and scheduling for slide presentations.

pub mod elapsed;
pub mod error;
pub mod extract;
pub mod input;
pub mod navigation;
pub mod notes;
pub mod presenter;
pub mod repository;
pub mod schedule;
pub mod surface;
pub mod types;

pub use error::{Error, Result};
pub use extract::{ExportOptions, Extractor};
pub use input::{Affordance, Command, InputEvent, InputRouter, Key, KeyEvent};
pub use navigation::{Navigator, Transition};
pub use notes::NotesCache;
pub use presenter::{Presenter, PresenterConfig};
pub use repository::SlideRepository;
pub use schedule::{Millis, Scheduler, TaskId};
pub use surface::{Notification, NotificationKind, PresentationSurface};
pub use types::{Deck, DeckFormat, ExportSnapshot, ExportedSlide, NavigationState, SlideRecord};
