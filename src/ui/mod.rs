use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use strum::IntoEnumIterator;
use time::{macros::format_description, OffsetDateTime};

use crate::app::state::{AppState, OverlayState, Screen};
use crate::editor::{
    ButtonLabel, FormAction, FormRow, LicenseEditor, LicenseView, Message, MessageKind,
    SettingsEditor, Tab,
};
use crate::settings::{FieldSpec, FieldValue, ListSection, Widget};

pub fn draw_app(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    match state.screen() {
        Screen::License => draw_license(frame, state),
        Screen::Settings => draw_settings(frame, state, list_state),
    }
    render_overlay(frame, state);
}

fn draw_settings(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let Some(editor) = state.settings() else {
        return;
    };
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(5),
        ])
        .split(frame.size());

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(16)])
        .split(vertical[0]);

    frame.render_widget(
        Paragraph::new(tab_line(editor)).block(
            Block::default()
                .title("Settings")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        header[0],
    );
    frame.render_widget(button(&editor.save_button()), header[1]);

    let body_block = Block::default().borders(Borders::ALL);
    match editor.active_tab() {
        Some(Tab::Accounts) => {
            let items = account_items(state);
            let list = List::new(items)
                .block(body_block.title("Accounts & signatures"))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
            frame.render_stateful_widget(list, vertical[1], list_state);
        }
        Some(tab) => {
            let items: Vec<ListItem> = state
                .rows()
                .iter()
                .map(|row| form_row_item(editor, row))
                .collect();
            let list = List::new(items)
                .block(body_block.title(tab.title()))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
            frame.render_stateful_widget(list, vertical[1], list_state);
        }
        None => {
            let paragraph = Paragraph::new(format!(
                "Nothing to show for \"{}\"",
                editor.tabs().selected_tag()
            ))
            .block(body_block);
            frame.render_widget(paragraph, vertical[1]);
        }
    }

    let footer = Paragraph::new(settings_footer(state, editor))
        .block(Block::default().borders(Borders::TOP))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, vertical[2]);
}

fn tab_line(editor: &SettingsEditor) -> Line<'static> {
    let mut spans = Vec::new();
    for (index, tab) in Tab::iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if editor.tabs().is_active(tab) {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!("{} {}", index + 1, tab.title()), style));
    }
    Line::from(spans)
}

fn button(label: &ButtonLabel) -> Paragraph<'static> {
    let style = if label.enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Paragraph::new(Span::styled(label.text.clone(), style))
        .block(Block::default().borders(Borders::ALL).border_style(style))
        .wrap(Wrap { trim: true })
}

fn account_items(state: &AppState) -> Vec<ListItem<'static>> {
    let rows = state.record_rows();
    if rows.is_empty() {
        return vec![ListItem::new("No accounts or signatures configured.")];
    }
    rows.into_iter()
        .map(|row| {
            let marker = match (row.section, row.connected) {
                (ListSection::Accounts, Some(true)) => {
                    Span::styled("● ", Style::default().fg(Color::Green))
                }
                (ListSection::Accounts, _) => Span::styled("○ ", Style::default().fg(Color::Red)),
                (ListSection::Signatures, _) => {
                    Span::styled("✎ ", Style::default().fg(Color::Magenta))
                }
            };
            let kind = match row.section {
                ListSection::Accounts => "account",
                ListSection::Signatures => "signature",
            };
            ListItem::new(Line::from(vec![
                marker,
                Span::styled(row.name, Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {kind}"), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect()
}

fn form_row_item(editor: &SettingsEditor, row: &FormRow) -> ListItem<'static> {
    match row {
        FormRow::Field(field) => {
            let value = editor.state().get(field.section, field.key);
            let mut spans = Vec::new();
            if field.danger {
                spans.push(Span::styled("⚠ ", Style::default().fg(Color::Red)));
            }
            spans.push(Span::styled(
                format!("{:<30}", field.label),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            spans.push(field_value_span(editor, field, value));
            ListItem::new(Line::from(spans))
        }
        FormRow::Action(action) => {
            let style = match action {
                FormAction::ClearCache => Style::default().fg(Color::Red),
                FormAction::OpenLicense => Style::default().fg(Color::Cyan),
            };
            ListItem::new(Line::from(Span::styled(
                format!("[ {} ]", action.label()),
                style.add_modifier(Modifier::BOLD),
            )))
        }
    }
}

fn field_value_span(
    editor: &SettingsEditor,
    field: &FieldSpec,
    value: Option<&FieldValue>,
) -> Span<'static> {
    match field.widget {
        Widget::Checkbox => {
            let checked = value.is_some_and(FieldValue::is_truthy);
            Span::raw(if checked { "[x]" } else { "[ ]" })
        }
        Widget::Select => {
            let text = value.map(FieldValue::display).unwrap_or_default();
            Span::styled(format!("‹ {text} ›"), Style::default().fg(Color::Cyan))
        }
        Widget::CreatableMultiSelect => {
            let text = value.map(FieldValue::display).unwrap_or_default();
            let known = editor.sidebar_folder_options().len();
            Span::styled(
                format!("{text}  ({known} known)"),
                Style::default().fg(Color::Cyan),
            )
        }
        Widget::Number { required } => match value {
            Some(value) if !value.is_absent() => Span::raw(value.display()),
            _ if required => Span::styled("required", Style::default().fg(Color::Red)),
            _ => Span::styled("unset", Style::default().fg(Color::Gray)),
        },
    }
}

fn settings_footer(state: &AppState, editor: &SettingsEditor) -> Text<'static> {
    let mut lines = Vec::new();
    if let Some(message) = editor.message() {
        let mut line = message_line(&message);
        let lifecycle = editor.save_lifecycle();
        let stamp = lifecycle
            .error()
            .map(|err| err.occurred_at())
            .or_else(|| lifecycle.saved_at());
        if let Some(at) = stamp {
            line.spans.push(Span::styled(
                format!(" ({})", format_time_short(at)),
                Style::default().fg(Color::Gray),
            ));
        }
        lines.push(line);
    }
    if let Some(status) = state.status_message() {
        lines.push(Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(Color::Yellow),
        )));
    }
    let help = match state.selected_row() {
        Some(FormRow::Field(field)) => field.help,
        Some(FormRow::Action(action)) => Some(action.help()),
        None => None,
    };
    if let Some(help) = help {
        lines.push(Line::from(Span::styled(
            help.to_string(),
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Line::from(Span::styled(
        key_hints(editor.active_tab()),
        Style::default().fg(Color::DarkGray),
    )));
    Text::from(lines)
}

fn key_hints(tab: Option<Tab>) -> &'static str {
    match tab {
        Some(Tab::Accounts) => "Tab switch • j/k select • J/K reorder • x remove • Ctrl-s save • q quit",
        Some(Tab::Appearance) => {
            "Tab switch • j/k select • space toggle • h/l theme • Enter add folder • x drop folder • Ctrl-s save"
        }
        Some(Tab::System) => "Tab switch • j/k select • space toggle • Enter edit/run • C clear cache • Ctrl-s save",
        None => "Tab switch • q quit",
    }
}

fn message_line(message: &Message) -> Line<'static> {
    let style = match message.kind {
        MessageKind::Success => Style::default().fg(Color::Green),
        MessageKind::Error => Style::default().fg(Color::Red),
    };
    Line::from(Span::styled(
        message.text.clone(),
        style.add_modifier(Modifier::BOLD),
    ))
}

fn draw_license(frame: &mut Frame, state: &AppState) {
    let Some(editor) = state.license() else {
        return;
    };
    let area = centered_rect(70, 60, frame.size());
    let paragraph = Paragraph::new(license_text(editor, state.status_message()))
        .block(
            Block::default()
                .title("License")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn license_text(editor: &LicenseEditor, status: Option<&str>) -> Text<'static> {
    let hint = Style::default().fg(Color::Gray);
    let mut lines = Vec::new();
    match editor.view() {
        LicenseView::Licensed { email } => {
            lines.push(Line::from(vec![
                Span::raw("Licensed to "),
                Span::styled(email, Style::default().add_modifier(Modifier::BOLD)),
            ]));
            lines.push(Line::from(""));
            lines.push(Line::from(label_span(&editor.remove_button())));
            if let Some(message) = editor.message() {
                lines.push(Line::from(""));
                lines.push(message_line(&message));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enter/d remove • Esc back",
                hint,
            )));
        }
        LicenseView::Unlicensed { purchase_url } => {
            lines.push(Line::from("Paste your license key below."));
            lines.push(Line::from(Span::styled(
                format!("Buy a license at {purchase_url}"),
                hint,
            )));
            lines.push(Line::from(""));
            let mut display = editor.license().to_string();
            display.push('▌');
            lines.extend(display.lines().map(|line| Line::from(line.to_string())));
            lines.push(Line::from(""));
            lines.push(Line::from(label_span(&editor.submit_button())));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enter submit • Backspace delete • Esc back",
                hint,
            )));
        }
    }
    if let Some(status) = status {
        lines.push(Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(Color::Yellow),
        )));
    }
    Text::from(lines)
}

fn label_span(label: &ButtonLabel) -> Span<'static> {
    let style = if label.text.starts_with("Error") {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if label.enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!("[ {} ]", label.text), style)
}

fn render_overlay(frame: &mut Frame, state: &AppState) {
    let (title, prompt, input) = match state.overlay() {
        Some(OverlayState::Number(overlay)) => (
            "Edit value",
            overlay.label.to_string(),
            overlay.input.clone(),
        ),
        Some(OverlayState::NewFolder(overlay)) => (
            "Add sidebar folder",
            "Folder name".to_string(),
            overlay.input.clone(),
        ),
        None => return,
    };
    let area = centered_rect(60, 30, frame.size());
    frame.render_widget(Clear, area);
    let mut display = input;
    display.push('▌');
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            prompt,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(display),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to apply • Esc to cancel",
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn format_time_short(dt: OffsetDateTime) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RequestKind;
    use crate::config::themes::ThemeRegistry;
    use crate::config::HostCapabilities;
    use crate::editor::SaveAttempt;
    use crate::settings::LoadedSettings;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use serde_json::json;

    fn rendered(state: &AppState) -> anyhow::Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(120, 30))?;
        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        terminal.draw(|frame| draw_app(frame, state, &mut list_state))?;
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn settings_editor() -> anyhow::Result<SettingsEditor> {
        let loaded: LoadedSettings = serde_json::from_value(json!({
            "settings": {
                "accounts": [{ "name": "work" }, { "name": "old" }],
                "signatures": [],
                "system": { "sync_interval": 60000 },
                "style": { "theme_light": "light" }
            },
            "account_name_to_connected": { "work": true, "old": false }
        }))?;
        Ok(SettingsEditor::new(
            loaded,
            HostCapabilities::default(),
            ThemeRegistry::default(),
        ))
    }

    fn settings_state() -> anyhow::Result<AppState> {
        Ok(AppState::for_settings(settings_editor()?))
    }

    #[test]
    fn accounts_tab_lists_records() -> anyhow::Result<()> {
        let screen = rendered(&settings_state()?)?;
        assert!(screen.contains("● work"));
        assert!(screen.contains("○ old"));
        assert!(screen.contains("Save"));
        Ok(())
    }

    #[test]
    fn system_tab_marks_empty_required_numbers() -> anyhow::Result<()> {
        let mut state = settings_state()?;
        state.select_tab("system");
        let screen = rendered(&state)?;
        assert!(screen.contains("60000"));
        assert!(screen.contains("required"));
        assert!(screen.contains("[ Clear cache ]"));
        assert!(!screen.contains("Update license"));
        Ok(())
    }

    #[test]
    fn footer_stamps_successful_save_with_time() -> anyhow::Result<()> {
        let mut editor = settings_editor()?;
        assert!(matches!(editor.submit_save(), SaveAttempt::Request(_)));
        editor.complete(RequestKind::SaveSettings, Ok(()));
        let at = editor.save_lifecycle().saved_at().expect("saved time");
        let screen = rendered(&AppState::for_settings(editor))?;
        assert!(screen.contains("Settings saved"));
        assert!(screen.contains(&format!("({})", format_time_short(at))));
        Ok(())
    }

    #[test]
    fn unknown_tab_renders_placeholder() -> anyhow::Result<()> {
        let mut state = settings_state()?;
        state.select_tab("filters");
        let screen = rendered(&state)?;
        assert!(screen.contains("Nothing to show for \"filters\""));
        Ok(())
    }

    #[test]
    fn license_screen_shows_purchase_link() -> anyhow::Result<()> {
        let state = AppState::for_license(LicenseEditor::new(HostCapabilities::default()));
        let screen = rendered(&state)?;
        assert!(screen.contains("https://kanmail.io/license"));
        assert!(screen.contains("Validate license →"));
        Ok(())
    }
}
