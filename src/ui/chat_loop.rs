//! Main chat event loop and UI rendering.
//!
//! One submit-and-respond cycle runs at a time: while a turn streams, the
//! loop blocks on the stream and the streaming view repaints the screen
//! after every fragment. Input events queue up and are handled once the
//! turn finishes.

use std::error::Error;
use std::io::{self, Stdout};
use std::time::Duration;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use crate::commands::{process_input, CommandResult};
use crate::core::app::App;
use crate::core::chat_stream::{ChatStreamService, StreamParams};
use crate::core::conversation::TurnError;
use crate::core::message::{Message, Role};
use crate::core::sink::{DisplaySurface, StreamingSink};

type TuiBackend = CrosstermBackend<Stdout>;

pub async fn run_chat(mut app: App) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let welcome = format!("Session {}. Type /help for commands.", app.session_id);
    app.push_info(welcome);

    let result = event_loop(&mut app, &mut terminal).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    app: &mut App,
    terminal: &mut Terminal<TuiBackend>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| draw_main(f, app))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(());
                }
                KeyCode::Enter => {
                    let input = std::mem::take(&mut app.input);
                    match process_input(app, &input) {
                        CommandResult::Continue => {}
                        CommandResult::ProcessAsMessage(text) => {
                            run_turn(app, terminal, &text).await?;
                        }
                    }
                }
                KeyCode::Char(c) => {
                    app.input.push(c);
                }
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Up => {
                    app.auto_scroll = false;
                    app.scroll_offset = app.scroll_offset.saturating_sub(1);
                }
                KeyCode::Down => {
                    app.scroll_offset = app.scroll_offset.saturating_add(1);
                }
                KeyCode::End => {
                    app.auto_scroll = true;
                }
                _ => {}
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => {
                    app.auto_scroll = false;
                    app.scroll_offset = app.scroll_offset.saturating_sub(3);
                }
                MouseEventKind::ScrollDown => {
                    app.scroll_offset = app.scroll_offset.saturating_add(3);
                }
                _ => {}
            },
            _ => {}
        }
    }
}

/// Runs one full turn: records the user message, streams the reply into the
/// transcript area, commits it on success. Display failures bubble up and
/// end the loop; API failures are shown as an error line.
async fn run_turn(
    app: &mut App,
    terminal: &mut Terminal<TuiBackend>,
    input: &str,
) -> Result<(), Box<dyn Error>> {
    let Some(messages) =
        app.conversation
            .begin_turn(&mut app.transcript, &mut app.store, &app.session_id, input)
    else {
        return Ok(());
    };
    log_last_message(app);

    let (service, mut events) = ChatStreamService::new();
    service.spawn_stream(StreamParams {
        client: app.client.clone(),
        base_url: app.base_url.clone(),
        api_key: app.api_key.clone(),
        model: app.conversation.model().to_string(),
        messages,
    });

    let mut view = StreamingView {
        terminal,
        prior: transcript_lines(app.transcript.messages()),
        title: session_title(&app.session_id),
    };
    let mut sink = StreamingSink::new(&mut view);

    let outcome = app
        .conversation
        .complete_turn(
            &mut app.transcript,
            &mut app.store,
            &app.session_id,
            &mut sink,
            &mut events,
        )
        .await;

    match outcome {
        Ok(_) => {
            log_last_message(app);
            app.auto_scroll = true;
            Ok(())
        }
        Err(TurnError::Api(message)) => {
            app.push_error(message);
            app.auto_scroll = true;
            Ok(())
        }
        Err(TurnError::Display(e)) => Err(e.into()),
    }
}

fn log_last_message(app: &mut App) {
    let result = match app.transcript.messages().last() {
        Some(message) => app.logging.log_message(message),
        None => Ok(()),
    };
    if let Err(e) = result {
        app.push_error(format!("Logging failed: {e}"));
    }
}

fn session_title(session_id: &str) -> String {
    format!("Causette ({session_id})")
}

fn draw_main(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let lines = transcript_lines(app.transcript.messages());
    let available_height = chunks[0].height.saturating_sub(1);
    let max_offset = max_scroll_offset(lines.len() as u16, available_height);
    if app.auto_scroll {
        app.scroll_offset = max_offset;
    } else {
        app.scroll_offset = app.scroll_offset.min(max_offset);
        if app.scroll_offset == max_offset {
            app.auto_scroll = true;
        }
    }

    let transcript = Paragraph::new(lines)
        .block(Block::default().title(session_title(&app.session_id)))
        .wrap(Wrap { trim: true })
        .scroll((app.scroll_offset, 0));
    f.render_widget(transcript, chunks[0]);

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Type your message (Enter to send, Ctrl+C to quit)"),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(input, chunks[1]);

    f.set_cursor_position((
        chunks[1].x + app.input.as_str().width() as u16 + 1,
        chunks[1].y + 1,
    ));
}

/// Renders the frozen transcript plus the in-progress response while a turn
/// streams. This is the display surface the sink republishes to after every
/// fragment.
struct StreamingView<'a> {
    terminal: &'a mut Terminal<TuiBackend>,
    prior: Vec<Line<'static>>,
    title: String,
}

impl DisplaySurface for StreamingView<'_> {
    fn set_text(&mut self, text: &str) -> io::Result<()> {
        let prior = &self.prior;
        let title = &self.title;
        self.terminal
            .draw(|f| draw_streaming(f, prior, title, text))?;
        Ok(())
    }
}

fn draw_streaming(f: &mut Frame, prior: &[Line<'static>], title: &str, text: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let mut lines = prior.to_vec();
    for content_line in text.lines() {
        if content_line.trim().is_empty() {
            lines.push(Line::from(""));
        } else {
            lines.push(Line::from(Span::styled(
                content_line.to_string(),
                Style::default().fg(Color::White),
            )));
        }
    }

    let available_height = chunks[0].height.saturating_sub(1);
    let scroll = max_scroll_offset(lines.len() as u16, available_height);

    let transcript = Paragraph::new(lines)
        .block(Block::default().title(title.to_string()))
        .wrap(Wrap { trim: true })
        .scroll((scroll, 0));
    f.render_widget(transcript, chunks[0]);

    let input = Paragraph::new("")
        .block(Block::default().borders(Borders::ALL).title("Waiting for response..."));
    f.render_widget(input, chunks[1]);
}

fn transcript_lines(messages: &[Message]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for msg in messages {
        match msg.role {
            Role::User => {
                lines.push(Line::from(vec![
                    Span::styled(
                        "You: ",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(msg.content.clone(), Style::default().fg(Color::Cyan)),
                ]));
                lines.push(Line::from(""));
            }
            Role::Assistant => {
                if msg.content.is_empty() {
                    continue;
                }
                for content_line in msg.content.lines() {
                    if content_line.trim().is_empty() {
                        lines.push(Line::from(""));
                    } else {
                        lines.push(Line::from(Span::styled(
                            content_line.to_string(),
                            Style::default().fg(Color::White),
                        )));
                    }
                }
                lines.push(Line::from(""));
            }
            Role::AppInfo => {
                for content_line in msg.content.lines() {
                    lines.push(Line::from(Span::styled(
                        content_line.to_string(),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                lines.push(Line::from(""));
            }
            Role::AppError => {
                lines.push(Line::from(Span::styled(
                    msg.content.clone(),
                    Style::default().fg(Color::Red),
                )));
                lines.push(Line::from(""));
            }
        }
    }

    lines
}

fn max_scroll_offset(total_lines: u16, available_height: u16) -> u16 {
    total_lines.saturating_sub(available_height)
}
