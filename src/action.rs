use chrono::{DateTime, Utc};

use crate::error::SiftError;
use crate::message::CompletionMessage;

/// A row action picked from the keyboard, before it is validated against the
/// focused row and turned into a `Mutation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationIntent {
    Close,
    Reopen,
    Ready,
    Merge,
    UpdateBranch,
    Comment,
    Label,
    Assign,
    Unassign,
    MarkDone,
    MarkRead,
    Push,
    CreatePr,
}

#[derive(Debug, Clone)]
pub enum Action {
    Quit,

    // Navigation
    NextRow,
    PrevRow,
    FirstRow,
    LastRow,
    NextSection,
    PrevSection,
    FocusSection(usize),
    SwitchView,
    Resize(u16),

    // Fetching
    Refresh,
    RefreshAll,
    Tick,

    // Polish
    ToggleSidebar,
    OpenInBrowser,
    YankUrl,
    OpenSearchInBrowser,
    DismissBanner,

    // Search and prompt input
    EnterSearchMode,
    InputChar(char),
    InputBackspace,
    InputConfirm,
    InputCancel,

    // Mutations
    Mutate(MutationIntent),
    ConfirmYes,
    ConfirmNo,
    PopupUp,
    PopupDown,
    PopupSelect,

    // Background work
    TaskFinished(CompletionMessage),
    ClearTask {
        id: String,
        finished_time: DateTime<Utc>,
    },
    UserLoaded(String),

    Error(String),
    None,
}

impl From<SiftError> for Action {
    fn from(err: SiftError) -> Self {
        Action::Error(err.to_string())
    }
}
