use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use crate::domain::{InputTarget, ViewerConfig};
use crate::list::{FilterControl, SortOrder};
use crate::model::{RecordView, UIData};
use crate::pagination::PageSlot;

pub const TITLE_HEIGHT: u16 = 1;
pub const TABLE_HEADER_HEIGHT: u16 = 1;
pub const PAGINATION_HEIGHT: u16 = 1;
pub const CMDLINE_HEIGH: u16 = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        let panel_height = uidata
            .list
            .filter_controls
            .as_ref()
            .map(|controls| controls.len() as u16 + 1)
            .unwrap_or(0);

        let areas = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT),
            Constraint::Length(panel_height),
            Constraint::Min(TABLE_HEADER_HEIGHT),
            Constraint::Length(PAGINATION_HEIGHT),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .split(frame.area());

        frame.render_widget(Paragraph::new(self.title_line(uidata)), areas[0]);
        if let Some(controls) = uidata.list.filter_controls.as_ref() {
            frame.render_widget(
                Paragraph::new(self.filter_lines(uidata, controls)),
                areas[1],
            );
        }
        match uidata.record.as_ref() {
            Some(record) => self.draw_record(record, frame, areas[2]),
            None => self.draw_table(uidata, frame, areas[2]),
        }
        frame.render_widget(Paragraph::new(self.pagination_line(uidata)), areas[3]);
        self.draw_cmdline(uidata, frame, areas[4]);

        if uidata.show_popup {
            self.draw_popup(&uidata.popup_message, frame);
        }
    }

    fn title_line(&self, uidata: &UIData) -> Line<'static> {
        let toggle = if uidata.list.filters_visible {
            "▾ Filters"
        } else {
            "▸ Filters"
        };
        Line::from(vec![
            Span::styled(format!(" {} ", uidata.name), Style::default().bold()),
            Span::raw(" "),
            Span::styled(format!("[f] {toggle}"), Style::default().fg(Color::Cyan)),
            Span::raw(format!("  {} matching", uidata.list.filtered_count)),
        ])
    }

    fn filter_lines(&self, uidata: &UIData, controls: &[FilterControl]) -> Vec<Line<'static>> {
        let focus_style = Style::default().add_modifier(Modifier::REVERSED);
        let mut lines = Vec::with_capacity(controls.len() + 1);
        for (idx, control) in controls.iter().enumerate() {
            let value = match control.options.as_ref() {
                Some(_) if control.value.is_empty() => "‹ All ›".to_string(),
                Some(_) => format!("‹ {} ›", control.value),
                None => format!("[{}]", control.value),
            };
            let style = if uidata.focused_control == Some(idx) {
                focus_style
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::raw(format!("  {}: ", control.label)),
                Span::styled(value, style),
            ]));
        }
        let style = if uidata.focused_control == Some(controls.len()) {
            focus_style
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw("  Results per page: "),
            Span::styled(format!("[{}]", uidata.list.results_per_page), style),
        ]));
        lines
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let list = &uidata.list;
        let widths = self.column_widths(uidata);

        let header = Row::new(uidata.visible_columns.iter().zip(widths.iter()).map(|(&cidx, &width)| {
            let header = &list.headers[cidx];
            let marker = match header.sorted {
                Some(SortOrder::Ascending) => " ▲",
                Some(SortOrder::Descending) => " ▼",
                None => "",
            };
            Cell::from(get_visible_name(format!("{}{}", header.label, marker), width))
        }))
        .style(Style::default().bold().underlined())
        .height(TABLE_HEADER_HEIGHT);

        let rows = list.rows.iter().enumerate().map(|(ridx, row)| match row {
            Some(cells) => {
                let row = Row::new(uidata.visible_columns.iter().zip(widths.iter()).enumerate().map(
                    |(vidx, (&cidx, &width))| {
                        let cell = Cell::from(get_visible_name(cells[cidx].clone(), width));
                        if ridx == uidata.selected_row && vidx == uidata.selected_column {
                            cell.style(Style::default().add_modifier(Modifier::REVERSED))
                        } else {
                            cell
                        }
                    },
                ));
                if ridx == uidata.selected_row {
                    row.style(Style::default().bg(Color::DarkGray))
                } else {
                    row
                }
            }
            // Filler keeps the page height constant
            None => Row::new(vec![Cell::from(""); uidata.visible_columns.len()]),
        });

        let constraints = widths.iter().map(|&w| Constraint::Length(w as u16));
        frame.render_widget(Table::new(rows, constraints).header(header).column_spacing(1), area);
    }

    fn column_widths(&self, uidata: &UIData) -> Vec<usize> {
        let list = &uidata.list;
        uidata
            .visible_columns
            .iter()
            .map(|&cidx| {
                let header_width = list.headers[cidx].label.chars().count() + 2;
                let content_width = list
                    .rows
                    .iter()
                    .flatten()
                    .map(|cells| cells[cidx].chars().count())
                    .max()
                    .unwrap_or(0);
                std::cmp::min(
                    std::cmp::max(header_width, content_width) + COLUMN_WIDTH_MARGIN,
                    self.max_column_width,
                )
            })
            .collect()
    }

    fn draw_record(&self, record: &RecordView, frame: &mut Frame, area: Rect) {
        let header_width = record
            .lines
            .iter()
            .map(|(path, _)| path.chars().count())
            .max()
            .unwrap_or(0);
        let rows = record.lines.iter().enumerate().map(|(idx, (path, value))| {
            let row = Row::new(vec![Cell::from(path.clone()), Cell::from(value.clone())]);
            if idx == record.curser_row {
                row.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                row
            }
        });
        let table = Table::new(
            rows,
            [Constraint::Length(header_width as u16 + 1), Constraint::Fill(1)],
        )
        .block(Block::bordered().title(format!(" Record {} ", record.position + 1)));
        frame.render_widget(table, area);
    }

    fn pagination_line(&self, uidata: &UIData) -> Line<'static> {
        let pagination = &uidata.list.pagination;
        let enabled = Style::default().fg(Color::Cyan);
        let disabled = Style::default().fg(Color::DarkGray);

        let mut spans = vec![Span::styled(
            "‹ Prev ",
            if pagination.has_previous { enabled } else { disabled },
        )];
        if uidata.layout.narrow {
            let editing = uidata.active_cmdinput && uidata.input_target == Some(InputTarget::PageNumber);
            let page = if editing {
                uidata.cmdinput.input.clone()
            } else {
                pagination.current_page.to_string()
            };
            spans.push(Span::raw(" Page "));
            spans.push(Span::styled(format!("[{page}]"), Style::default().add_modifier(Modifier::REVERSED)));
            spans.push(Span::raw(format!(" / {} ", pagination.total_pages)));
        } else {
            for slot in pagination.slots.iter() {
                match slot {
                    PageSlot::Page(p) if *p == pagination.current_page => {
                        spans.push(Span::styled(format!("[{p}]"), Style::default().bold().fg(Color::Yellow)))
                    }
                    PageSlot::Page(p) => spans.push(Span::raw(format!(" {p} "))),
                    PageSlot::Ellipsis => spans.push(Span::raw(" … ")),
                }
            }
        }
        spans.push(Span::styled(
            " Next ›",
            if pagination.has_next { enabled } else { disabled },
        ));
        Line::from(spans)
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.input_target {
                Some(InputTarget::Filter(idx)) => uidata
                    .list
                    .filter_controls
                    .as_ref()
                    .and_then(|c| c.get(idx))
                    .map(|c| format!("{}: ", c.label))
                    .unwrap_or_else(|| "Filter: ".to_string()),
                Some(InputTarget::ResultsPerPage) => "Results per page: ".to_string(),
                Some(InputTarget::PageNumber) => "Go to page: ".to_string(),
                None => "> ".to_string(),
            };
            let x = area.x
                + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            frame.render_widget(
                Paragraph::new(format!("{prompt}{}", uidata.cmdinput.input)),
                area,
            );
            frame.set_cursor_position((std::cmp::min(x, area.right().saturating_sub(1)), area.y));
        } else {
            frame.render_widget(
                Paragraph::new(uidata.status_message.clone()).style(Style::default().italic()),
                area,
            );
        }
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let area = centered(frame.area(), 60, 80);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message.to_string())
                .wrap(Wrap { trim: false })
                .block(Block::bordered().title(" Help ").title_bottom(" Esc to close ")),
            area,
        );
    }
}

/// Cuts `name` to `width` characters, marking cut text with "...".
fn get_visible_name(name: String, width: usize) -> String {
    let length = name.chars().count();
    if length <= width {
        return name;
    }
    if width < 3 {
        return name.chars().take(width).collect();
    }
    let mut reduced_name = name.chars().take(width - 3).collect::<String>();
    reduced_name.push_str("...");
    reduced_name
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(percent_y) / 100) as u16;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
