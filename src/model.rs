use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::{HELP_TEXT, InputTarget, Message, ViewerConfig};
use crate::field::Filter;
use crate::inputter::{InputResult, Inputter};
use crate::list::{FilterableList, ListView};
use crate::record::Record;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    RECORD,
    POPUP,
    CMDINPUT,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub narrow: bool,
}

impl UILayout {
    pub fn from_values(config: &ViewerConfig, width: usize, height: usize) -> Self {
        let layout = UILayout {
            width,
            height,
            narrow: width < config.narrow_width,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Detail view of a single record, one line per leaf value.
#[derive(Default, Clone, Debug)]
pub struct RecordView {
    pub position: usize, // Position in the filtered ordering
    pub lines: Vec<(String, String)>,
    pub curser_row: usize,
}

/// Snapshot of everything the UI draws. Rebuilt after every model change.
pub struct UIData {
    pub name: String,
    pub list: ListView<Vec<String>>,
    pub visible_columns: Vec<usize>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub focused_control: Option<usize>,
    pub record: Option<RecordView>,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub cmdinput: InputResult,
    pub input_target: Option<InputTarget>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_update: Instant,
}

pub struct Model {
    config: ViewerConfig,
    name: String,
    list: FilterableList<Record>,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    curser_row: usize,
    curser_column: usize, // Index into the visible columns
    focused_control: Option<usize>,
    record_view: RecordView,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    input_target: Option<InputTarget>,
    input_origin: String, // Filter value to restore when a live search is canceled
    last_input: InputResult,
    status_message: String,
}

impl Model {
    pub fn init(
        config: &ViewerConfig,
        name: impl Into<String>,
        list: FilterableList<Record>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let clipboard = Clipboard::new()
            .map_err(|e| warn!("Clipboard is not available: {:?}", e))
            .ok();
        let uilayout = UILayout::from_values(config, ui_width, ui_height);
        let uidata = UIData {
            name: String::new(),
            list: list.render(&|_: &Record, _: usize| Vec::new()),
            visible_columns: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            focused_control: None,
            record: None,
            show_popup: false,
            popup_message: String::new(),
            layout: uilayout.clone(),
            cmdinput: InputResult::default(),
            input_target: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_update: Instant::now(),
        };
        let mut model = Self {
            config: config.clone(),
            name: name.into(),
            list,
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            curser_row: 0,
            curser_column: 0,
            focused_control: None,
            record_view: RecordView::default(),
            uilayout,
            uidata,
            clipboard,
            input: Inputter::default(),
            input_target: None,
            input_origin: String::new(),
            last_input: InputResult::default(),
            status_message: String::new(),
        };
        model.set_status_message(format!("Loaded {} records", model.list.data().len()));
        model
    }

    pub fn list(&self) -> &FilterableList<Record> {
        &self.list
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// Keys go to the input line instead of being mapped to messages.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.update_uidata();
    }

    /// Indices of the fields that fit the current terminal width.
    fn visible_columns(&self) -> Vec<usize> {
        self.list
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.min_width().is_none_or(|w| self.uilayout.width >= w as usize))
            .map(|(idx, _)| idx)
            .collect()
    }

    fn page_len(&self) -> usize {
        self.list.page_records().len()
    }

    fn control_count(&self) -> usize {
        // One control per filter plus the page size input
        self.list.filters().len() + 1
    }

    fn update_uidata(&mut self) {
        let fields = self.list.fields().to_vec();
        let view = self.list.render(&|record: &Record, _: usize| {
            fields.iter().map(|f| f.display(record)).collect::<Vec<String>>()
        });
        let visible_columns = self.visible_columns();
        self.curser_column = std::cmp::min(self.curser_column, visible_columns.len().saturating_sub(1));
        self.curser_row = std::cmp::min(self.curser_row, self.page_len().saturating_sub(1));

        self.uidata = UIData {
            name: self.name.clone(),
            list: view,
            visible_columns,
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            focused_control: self.focused_control,
            record: (self.modus == Modus::RECORD
                || (self.modus == Modus::POPUP && self.previous_modus == Modus::RECORD))
                .then(|| self.record_view.clone()),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.uidata.popup_message.clone(),
            layout: self.uilayout.clone(),
            cmdinput: self.last_input.clone(),
            input_target: self.input_target,
            active_cmdinput: self.modus == Modus::CMDINPUT,
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(&self.config, width, height);
        self.update_uidata();
    }

    pub fn update(&mut self, message: Option<Message>) {
        let Some(msg) = message else {
            return;
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.curser_row = self.curser_row.saturating_sub(1),
                Message::MoveDown => {
                    self.curser_row = std::cmp::min(self.curser_row + 1, self.page_len().saturating_sub(1))
                }
                Message::MoveLeft => self.curser_column = self.curser_column.saturating_sub(1),
                Message::MoveRight => self.curser_column += 1,
                Message::NextPage => self.list.next_page(),
                Message::PrevPage => self.list.prev_page(),
                Message::FirstPage => self.list.first_page(),
                Message::LastPage => self.list.last_page(),
                Message::Sort => self.sort_current_column(),
                Message::ToggleFilters => self.toggle_filters(),
                Message::FocusNextControl => self.focus_control(1),
                Message::FocusPrevControl => self.focus_control(-1),
                Message::NextOption => self.cycle_option(1),
                Message::PrevOption => self.cycle_option(-1),
                Message::ClearFilters => {
                    self.list.clear_filters();
                    self.set_status_message("Cleared filters");
                }
                Message::GotoPage => self.enter_cmd_mode(InputTarget::PageNumber),
                Message::Search => self.search(),
                Message::Enter => self.enter(),
                Message::Exit => self.focused_control = None,
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::RECORD => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => {
                    self.record_view.curser_row = self.record_view.curser_row.saturating_sub(1)
                }
                Message::MoveDown => {
                    self.record_view.curser_row = std::cmp::min(
                        self.record_view.curser_row + 1,
                        self.record_view.lines.len().saturating_sub(1),
                    )
                }
                Message::MoveLeft | Message::PrevPage => self.step_record(-1),
                Message::MoveRight | Message::NextPage => self.step_record(1),
                Message::CopyCell => self.copy_record_cell(),
                Message::Help => self.show_help(),
                Message::Exit | Message::Enter => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CMDINPUT => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        self.update_uidata();
    }

    // -------------------- Control handling functions ---------------------- //

    fn enter(&mut self) {
        match self.focused_control {
            Some(idx) if idx < self.list.filters().len() => {
                if self.list.filters()[idx].is_dropdown() {
                    self.cycle_option(1);
                } else {
                    self.enter_cmd_mode(InputTarget::Filter(idx));
                }
            }
            Some(_) => self.enter_cmd_mode(InputTarget::ResultsPerPage),
            None => self.build_record_view(),
        }
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::RECORD => {
                self.previous_modus = Modus::RECORD;
                self.modus = Modus::TABLE;
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::TABLE | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
    }

    fn sort_current_column(&mut self) {
        let visible = self.visible_columns();
        if let Some(&field_idx) = visible.get(self.curser_column) {
            self.list.sort_by(field_idx);
            let order = self.list.state().sort_order;
            let key = self.list.fields()[field_idx].key().to_string();
            self.set_status_message(format!("Sorted by {} {:?}", key, order));
        }
    }

    fn toggle_filters(&mut self) {
        self.list.toggle_filters();
        if !self.list.state().filters_visible {
            self.focused_control = None;
        }
    }

    fn focus_control(&mut self, step: i32) {
        if !self.list.state().filters_visible {
            self.list.toggle_filters();
        }
        let count = self.control_count() as i32;
        self.focused_control = Some(match self.focused_control {
            None if step >= 0 => 0,
            None => (count - 1) as usize,
            Some(idx) => (idx as i32 + step).rem_euclid(count) as usize,
        });
    }

    /// Selects the next dropdown value of the focused control. The empty selection
    /// (no filtering) sits before the first value.
    fn cycle_option(&mut self, step: i32) {
        let Some(Filter::Dropdown { field }) = self.focused_control.and_then(|idx| self.list.filters().get(idx))
        else {
            return;
        };
        let key = field.key().to_string();
        let mut choices = vec![String::new()];
        choices.extend(self.list.dropdown_options(&key).iter().cloned());

        let current = self.list.filter_value(&key);
        let pos = choices.iter().position(|c| c == current).unwrap_or(0) as i32;
        let next = (pos + step).rem_euclid(choices.len() as i32) as usize;
        let choice = choices[next].clone();
        debug!("Dropdown {} -> {:?}", key, choice);
        self.list.set_filter(&key, choice);
        self.curser_row = 0;
        self.report_matches();
    }

    fn search(&mut self) {
        let first_search = self
            .list
            .filters()
            .iter()
            .position(|f| !f.is_dropdown());
        match first_search {
            Some(idx) => {
                if !self.list.state().filters_visible {
                    self.list.toggle_filters();
                }
                self.focused_control = Some(idx);
                self.enter_cmd_mode(InputTarget::Filter(idx));
            }
            None => self.set_status_message("No search filter configured"),
        }
    }

    fn report_matches(&mut self) {
        let total = self.list.data().iter().flatten().count();
        let filtered = self.list.filtered_len();
        if filtered == 0 {
            self.set_status_message("Found no matches!");
        } else {
            self.set_status_message(format!("{filtered} of {total} records"));
        }
    }

    fn enter_cmd_mode(&mut self, target: InputTarget) {
        trace!("Entering command mode for {:?} ...", target);
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.input_target = Some(target);

        let initial = match target {
            InputTarget::Filter(idx) => {
                let key = self.list.filters()[idx].key().to_string();
                self.list.filter_value(&key).to_string()
            }
            InputTarget::ResultsPerPage => self.list.results_per_page().to_string(),
            InputTarget::PageNumber => String::new(),
        };
        self.input_origin = initial.clone();
        self.input.set(&initial);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        let Some(target) = self.input_target else {
            return;
        };

        // Search filters follow every keystroke
        if let InputTarget::Filter(idx) = target {
            let filter_key = self.list.filters()[idx].key().to_string();
            let value = if self.last_input.canceled {
                self.input_origin.clone()
            } else {
                self.last_input.input.clone()
            };
            self.list.set_filter(&filter_key, value);
            self.curser_row = 0;
        }

        if self.last_input.finished {
            self.handle_cmd_input(target);
        }
    }

    fn handle_cmd_input(&mut self, target: InputTarget) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.input_target = None;

        if self.last_input.canceled {
            self.set_status_message("Canceled");
            return;
        }
        let cmd_input = self.last_input.input.clone();
        match target {
            InputTarget::Filter(_) => self.report_matches(),
            InputTarget::ResultsPerPage => {
                if self.list.apply_results_per_page_input(&cmd_input) {
                    info!("Showing {} results per page", self.list.results_per_page());
                } else {
                    self.set_status_message(format!("Not a page size: {cmd_input}"));
                }
            }
            InputTarget::PageNumber => {
                if self.list.apply_page_input(&cmd_input) {
                    self.curser_row = 0;
                } else {
                    self.set_status_message(format!("Not a page number: {cmd_input}"));
                }
            }
        }
    }

    fn build_record_view(&mut self) {
        let position = self.list.page_offset() + self.curser_row;
        if self.list.page_record(self.curser_row).is_none() {
            return;
        }
        trace!("Building record view for position {position} ...");
        self.show_record(position);
        self.previous_modus = Modus::TABLE;
        self.modus = Modus::RECORD;
    }

    fn show_record(&mut self, position: usize) {
        let rows = self.list.ordered_indices();
        let Some(record) = rows.get(position).and_then(|&idx| self.list.data()[idx].as_ref()) else {
            return;
        };
        self.record_view = RecordView {
            position,
            lines: record.leaves(),
            curser_row: 0,
        };
    }

    fn step_record(&mut self, step: i32) {
        let last = self.list.filtered_len().saturating_sub(1) as i32;
        let position = (self.record_view.position as i32 + step).clamp(0, last) as usize;
        if position != self.record_view.position {
            self.show_record(position);
        }
    }

    fn copy_to_clipboard(&mut self, content: String) {
        trace!("Copy content: {}", content);
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.set_status_message("Copied to clipboard."),
                Err(e) => warn!("Error copying to clipboard: {:?}", e),
            },
            None => self.set_status_message("No clipboard available"),
        }
    }

    fn copy_table_cell(&mut self) {
        let visible = self.visible_columns();
        let cell = match (
            self.list.page_record(self.curser_row),
            visible.get(self.curser_column),
        ) {
            (Some(record), Some(&field_idx)) => self.list.fields()[field_idx].display(record),
            _ => return,
        };
        self.copy_to_clipboard(cell);
    }

    fn copy_table_row(&mut self) {
        let Some(record) = self.list.page_record(self.curser_row) else {
            return;
        };
        let row_content = self
            .visible_columns()
            .iter()
            .map(|&idx| wrap_cell_content(&self.list.fields()[idx].display(record)))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(row_content);
    }

    fn copy_record_cell(&mut self) {
        if let Some((_, value)) = self.record_view.lines.get(self.record_view.curser_row) {
            let value = value.clone();
            self.copy_to_clipboard(value);
        }
    }
}

/// Quotes a cell for a CSV line.
fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',' || c == '"');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}
