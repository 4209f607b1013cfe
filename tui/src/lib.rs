//! TUI rendering for Jifra using ratatui.

mod input;
mod theme;

pub use input::{Action, apply, map_event};
pub use theme::{Glyphs, Palette, UiOptions, glyphs, palette, styles};

use chrono::{DateTime, Local};
use ratatui::{
    Frame,
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use jifra_engine::{
    App, Direction, DisplayBlock, Focus, HistoryEntry, LatestResult, ModelResolution, NoticeLevel,
    SchemaHints, Sleeper, Style as OutputStyle, TextModel, parse_blocks,
};
use jifra_types::sanitize_terminal_text;

const HISTORY_WIDTH: u16 = 34;
const INPUT_HEIGHT: u16 = 7;
const PASSWORD_WIDTH: u16 = 44;

/// Main draw function.
pub fn draw<M, S>(frame: &mut Frame, app: &App<M, S>, options: UiOptions)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let palette = palette(options);
    let glyphs = glyphs(options);

    let bg = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg, frame.area());

    let rows = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(1), // style bar
            Constraint::Length(1), // direction
            Constraint::Min(6),    // body
            Constraint::Length(1), // status
        ])
        .split(frame.area());

    draw_header(frame, app, rows[0], &palette, &glyphs);
    draw_style_bar(frame, app, rows[1], &palette);
    draw_direction(frame, app, rows[2], &palette);

    let body = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(HISTORY_WIDTH)])
        .split(rows[3]);
    let main = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Length(INPUT_HEIGHT), Constraint::Min(3)])
        .split(body[0]);

    draw_input(frame, app, main[0], &palette);
    draw_result(frame, app, main[1], &palette, &glyphs);
    draw_history(frame, app, body[1], &palette, &glyphs);
    draw_status(frame, app, rows[4], &palette, &glyphs);

    if app.focus() == Focus::Password {
        draw_password_prompt(frame, app, &palette, &glyphs);
    }
}

fn draw_header<M, S>(frame: &mut Frame, app: &App<M, S>, area: Rect, palette: &Palette, glyphs: &Glyphs)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let tier = app.session().tier();
    let model = match app.model_resolution() {
        Some(ModelResolution::Resolved(model)) => model.short_name().to_string(),
        Some(ModelResolution::Unavailable { .. }) => "model unavailable".to_string(),
        None => "model: auto".to_string(),
    };
    let badge = if tier.is_pro() {
        format!(" {} {} ", glyphs.pro, tier.display_name())
    } else {
        format!(" {} ", tier.display_name())
    };

    let line = Line::from(vec![
        Span::styled(format!(" Jifra{}", glyphs.title), styles::title(palette)),
        Span::styled("  Smart AI Refined Translator  ", styles::key_hint(palette)),
        Span::styled(badge, styles::tier_badge(palette, tier.is_pro())),
        Span::styled(format!("  {model}"), Style::default().fg(palette.text_secondary)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_style_bar<M, S>(frame: &mut Frame, app: &App<M, S>, area: Rect, palette: &Palette)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let session = app.session();
    let mut spans = vec![Span::styled(" Style ", styles::key_hint(palette))];
    for style in OutputStyle::all() {
        let selected = *style == session.style();
        let available = style.available_in(session.tier());
        spans.push(Span::styled(
            format!(" {} ", style.display_name()),
            styles::choice(palette, selected, available),
        ));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_direction<M, S>(frame: &mut Frame, app: &App<M, S>, area: Rect, palette: &Palette)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let session = app.session();
    let mut spans = vec![Span::styled(" Direction ", styles::key_hint(palette))];

    if session.style().uses_direction() {
        for direction in Direction::all() {
            if !direction.available_in(session.tier()) {
                continue;
            }
            let selected = *direction == session.direction();
            let mut label = direction.display_name().to_string();
            if selected
                && *direction == Direction::Auto
                && let Some(language) = app.detected_language()
            {
                label = format!("{label} ({})", language.code());
            }
            spans.push(Span::styled(
                format!(" {label} "),
                styles::choice(palette, selected, true),
            ));
            spans.push(Span::raw(" "));
        }
    } else {
        spans.push(Span::styled(
            "(not used by this style)",
            Style::default().fg(palette.text_disabled),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_input<M, S>(frame: &mut Frame, app: &App<M, S>, area: Rect, palette: &Palette)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let focused = app.focus() == Focus::Input;
    let hints = Line::from(vec![
        Span::styled(" Enter", styles::key_highlight(palette)),
        Span::styled(" send  ", styles::key_hint(palette)),
        Span::styled("Ctrl+J", styles::key_highlight(palette)),
        Span::styled(" newline  ", styles::key_hint(palette)),
        Span::styled("Ctrl+T/D", styles::key_highlight(palette)),
        Span::styled(" style/dir  ", styles::key_hint(palette)),
        Span::styled("Ctrl+L", styles::key_highlight(palette)),
        Span::styled(" clear  ", styles::key_hint(palette)),
        Span::styled("Ctrl+P", styles::key_highlight(palette)),
        Span::styled(" PRO ", styles::key_hint(palette)),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette, focused))
        .title(" Input ")
        .title_bottom(hints);
    let inner = block.inner(area);

    let draft = app.input();
    let (cursor_line, before_cursor) = draft.cursor_line();
    let visible = inner.height.max(1) as usize;
    let scroll = cursor_line.saturating_sub(visible - 1);

    let paragraph = if draft.text().is_empty() {
        Paragraph::new(Span::styled(
            "テキストを入力してください...",
            Style::default().fg(palette.text_muted),
        ))
    } else {
        Paragraph::new(draft.text())
            .style(Style::default().fg(palette.text_primary))
            .scroll((scroll as u16, 0))
    };
    frame.render_widget(paragraph.block(block), area);

    if focused && inner.width > 0 && inner.height > 0 {
        let x = inner.x + (before_cursor.width() as u16).min(inner.width - 1);
        let y = inner.y + (cursor_line - scroll) as u16;
        frame.set_cursor_position((x, y));
    }
}

/// Lines for one result, rendered as cards.
fn result_lines(
    style: OutputStyle,
    blocks: &[DisplayBlock],
    palette: &Palette,
    glyphs: &Glyphs,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        if index > 0 {
            lines.push(Line::from(""));
        }
        let header = match (&block.label, style) {
            (Some(label), _) => format!("{} {}", glyphs.pattern, sanitize_terminal_text(label)),
            (None, OutputStyle::Sns) => format!("{} SNS Collection", glyphs.sns),
            (None, OutputStyle::PromptGen) => format!("{} Generated Prompts", glyphs.prompt_gen),
            (None, _) => format!("{} Result", glyphs.pattern),
        };
        lines.push(Line::from(Span::styled(header, styles::card_header(palette))));
        for text in sanitize_terminal_text(&block.text).lines() {
            lines.push(Line::from(Span::styled(
                text.to_string(),
                Style::default().fg(palette.text_primary),
            )));
        }
        if let Some(back) = &block.back_translation {
            lines.push(Line::from(Span::styled(
                format!("{} {}", glyphs.back_translation, sanitize_terminal_text(back)),
                styles::back_translation(palette),
            )));
        }
    }
    lines
}

fn draw_result<M, S>(frame: &mut Frame, app: &App<M, S>, area: Rect, palette: &Palette, glyphs: &Glyphs)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette, false));

    // History focus previews the selected entry instead of the latest result.
    let (title, lines) = match (app.focus(), app.selected_entry()) {
        (Focus::History, Some(entry)) => {
            let blocks = parse_blocks(entry.result(), &SchemaHints::for_style(entry.style()));
            (
                format!(" #{} {} ", entry.id(), entry.style().display_name()),
                result_lines(entry.style(), &blocks, palette, glyphs),
            )
        }
        _ => match app.session().latest() {
            Some(LatestResult::Failure { message }) => (
                " Latest Result ".to_string(),
                vec![Line::from(Span::styled(
                    format!("{} Error: {}", glyphs.error, sanitize_terminal_text(message)),
                    Style::default().fg(palette.error),
                ))],
            ),
            Some(LatestResult::Success { .. }) => {
                let (style, blocks) = app.latest_blocks().unwrap_or_default();
                (
                    " Latest Result ".to_string(),
                    result_lines(style, &blocks, palette, glyphs),
                )
            }
            None => (" Latest Result ".to_string(), Vec::new()),
        },
    };

    let paragraph = Paragraph::new(lines)
        .block(block.title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn history_row(entry: &HistoryEntry, glyphs: &Glyphs, width: usize) -> String {
    let time = DateTime::<Local>::from(entry.created_at()).format("%H:%M:%S");
    let marker = if entry.is_pinned() {
        glyphs.pin
    } else {
        glyphs.unpinned
    };
    let preview = sanitize_terminal_text(&entry.input_preview()).into_owned();
    let row = format!("{marker}{time} | {preview}");
    fit_width(&row, width, glyphs.ellipsis)
}

/// Cut `text` to at most `width` terminal columns, marking the cut with `ellipsis`.
fn fit_width(text: &str, width: usize, ellipsis: &str) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let budget = width.saturating_sub(ellipsis.width());
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ellipsis);
    out
}

fn draw_history<M, S>(frame: &mut Frame, app: &App<M, S>, area: Rect, palette: &Palette, glyphs: &Glyphs)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let focused = app.focus() == Focus::History;
    let history = app.session().history();
    let title = format!(" 翻訳履歴 ({}) ", history.len());
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette, focused))
        .title(title);
    if focused {
        let hints = if app.session().tier().is_pro() {
            " Space pin  x clear "
        } else {
            " Esc back "
        };
        block = block.title_bottom(Span::styled(hints, styles::key_hint(palette)));
    }

    if history.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "履歴はありません",
            Style::default().fg(palette.text_muted),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let width = block.inner(area).width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = history
        .entries()
        .iter()
        .map(|entry| {
            ListItem::new(history_row(entry, glyphs, width))
                .style(Style::default().fg(palette.text_secondary))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_symbol(glyphs.selected)
        .highlight_style(
            Style::default()
                .bg(palette.bg_highlight)
                .fg(palette.text_primary)
                .add_modifier(Modifier::BOLD),
        );
    let mut state = ListState::default();
    if focused {
        state.select(Some(app.history_cursor()));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_status<M, S>(frame: &mut Frame, app: &App<M, S>, area: Rect, palette: &Palette, glyphs: &Glyphs)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let (text, color) = if app.is_processing() {
        (format!("{} Processing...", glyphs.processing), palette.primary)
    } else if let Some(notice) = app.session().notice() {
        let color = match notice.level() {
            NoticeLevel::Info => palette.text_secondary,
            NoticeLevel::Success => palette.success,
            NoticeLevel::Warning => palette.warning,
            NoticeLevel::Error => palette.error,
        };
        (sanitize_terminal_text(notice.text()).into_owned(), color)
    } else {
        let pinned = app.session().history().pinned_count();
        (
            format!(
                "Tab history  Esc quit  |  {} entries, {pinned} pinned",
                app.session().history().len()
            ),
            palette.text_muted,
        )
    };
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(text, Style::default().fg(color)),
    ]));
    frame.render_widget(status, area);
}

fn draw_password_prompt<M, S>(frame: &mut Frame, app: &App<M, S>, palette: &Palette, glyphs: &Glyphs)
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    let area = frame.area();
    let width = PASSWORD_WIDTH.min(area.width.saturating_sub(2));
    let height = 3;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height: height.min(area.height),
    };

    let masked = glyphs.mask.repeat(app.password().grapheme_count());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(palette.pro))
        .style(Style::default().bg(palette.bg_popup))
        .title(" PRO Password ")
        .title_bottom(Span::styled(" Enter ok  Esc cancel ", styles::key_hint(palette)));
    let inner = block.inner(popup);

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(masked)
            .style(Style::default().fg(palette.text_primary))
            .block(block),
        popup,
    );

    if inner.width > 0 && inner.height > 0 {
        let cursor = glyphs.mask.width() * app.password().cursor();
        let x = inner.x + (cursor as u16).min(inner.width - 1);
        frame.set_cursor_position((x, inner.y));
    }
}
