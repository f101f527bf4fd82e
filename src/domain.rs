use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum ViewerError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    InvalidArgument(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::IoError(e) => write!(f, "io error: {e}"),
            ViewerError::PolarsError(e) => write!(f, "could not read data: {e}"),
            ViewerError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            ViewerError::FileNotFound => write!(f, "file not found"),
            ViewerError::PermissionDenied => write!(f, "permission denied"),
            ViewerError::UnknownFileType => write!(f, "unknown file type"),
            ViewerError::InvalidArgument(arg) => write!(f, "invalid argument: {arg}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewerError::IoError(e) => Some(e),
            ViewerError::PolarsError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for ViewerError {
    fn from(err: Error) -> Self {
        ViewerError::IoError(err)
    }
}

impl From<PolarsError> for ViewerError {
    fn from(err: PolarsError) -> Self {
        ViewerError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct ViewerConfig {
    /// Milliseconds to wait for a terminal event before redrawing.
    pub event_poll_time: u64,
    /// Terminals narrower than this get the direct page input instead of page buttons.
    pub narrow_width: usize,
    pub max_column_width: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            event_poll_time: 100,
            narrow_width: 80,
            max_column_width: 40,
        }
    }
}

/// What the command line input is currently editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    Filter(usize),
    ResultsPerPage,
    PageNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    Sort,
    ToggleFilters,
    FocusNextControl,
    FocusPrevControl,
    NextOption,
    PrevOption,
    ClearFilters,
    GotoPage,
    Search,
    Enter,
    Exit,
    CopyCell,
    CopyRow,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  j/k, Up/Down     move the row cursor
  h/l, Left/Right  move the column cursor
  n/p, PgDn/PgUp   next / previous page
  g/G, Home/End    first / last page
  :                jump to a page number

Sorting
  s                sort by the current column, again to reverse

Filters
  f                show / hide the filter panel
  /                edit the first search filter
  Tab/Shift-Tab    focus the next / previous filter control
  Enter            edit the focused control (cycles dropdown values)
  +/-              next / previous dropdown value
  x                clear all filters

Records
  Enter            show the selected record
  y / Y            copy cell / row to the clipboard

  ?                this help
  Esc              close views and popups
  q                quit";
