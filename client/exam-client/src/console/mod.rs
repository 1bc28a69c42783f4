use std::future::Future;
use std::io::IsTerminal;

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::error::SessionError;
use crate::models::{
    FinishReason, FocusSignal, Notice, Phase, SessionEvent, DURATION_BUDGET_SECONDS,
    QUESTION_LIMIT,
};
use crate::services::focus_monitor::FocusMonitor;
use crate::services::session_machine::{EventOutcome, FinishSummary, Navigation, SessionMachine};
use crate::services::AppState;

pub mod input;
pub mod views;

use input::{parse_command, parse_confirmation, Command, InputDecoder, InputEvent};

/// Remaining-time marks at which the participant is warned.
const TIME_WARNINGS: [u32; 2] = [300, 60];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Name,
    Code { name: String },
    Rules,
    Answering,
    ConfirmFinish,
    Finished,
}

/// Interactive front of the session machine. Turns input lines and session
/// events into machine calls and buffers the text to print.
pub struct ConsoleApp {
    machine: SessionMachine,
    prompt: Prompt,
    out: String,
    exit: bool,
}

impl ConsoleApp {
    pub fn new(machine: SessionMachine) -> Self {
        Self {
            machine,
            prompt: Prompt::Name,
            out: views::welcome(),
            exit: false,
        }
    }

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut SessionMachine {
        &mut self.machine
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn should_exit(&self) -> bool {
        self.exit
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.out)
    }

    pub async fn handle_line(&mut self, line: &str) {
        match std::mem::replace(&mut self.prompt, Prompt::Name) {
            Prompt::Name => {
                self.prompt = Prompt::Code {
                    name: line.to_string(),
                };
                self.say(views::CODE_PROMPT);
            }
            Prompt::Code { name } => self.verify(&name, line).await,
            Prompt::Rules => self.start().await,
            Prompt::Answering => {
                self.prompt = Prompt::Answering;
                self.handle_command(line);
            }
            Prompt::ConfirmFinish => {
                let confirmed = parse_confirmation(line);
                match self.machine.finish_manually(confirmed) {
                    Some(summary) => self.show_finished(summary),
                    None => {
                        self.prompt = Prompt::Answering;
                        self.show_question();
                    }
                }
            }
            Prompt::Finished => {
                self.prompt = Prompt::Finished;
                self.exit = true;
            }
        }
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        let outcome = self.machine.handle_event(event);
        self.apply(outcome);
    }

    pub fn handle_notice(&mut self, notice: Notice) {
        self.out.push_str(&views::notice(&notice));
    }

    /// Ctrl+C. Outside a running test it simply ends the program.
    pub fn handle_interrupt(&mut self) {
        if self.machine.phase() != Phase::Running {
            self.exit = true;
            return;
        }
        self.handle_event(SessionEvent::Focus(FocusSignal::UnloadAttempt));
    }

    async fn verify(&mut self, name: &str, code: &str) {
        match self.machine.verify(name, code).await {
            Ok(()) => {
                self.prompt = Prompt::Rules;
                self.out
                    .push_str(&views::rules(QUESTION_LIMIT, DURATION_BUDGET_SECONDS));
            }
            Err(e) => {
                let message = match e {
                    SessionError::Validation => "Ism kiritilishi shart.".to_string(),
                    SessionError::VerificationDenied { message } => {
                        message.unwrap_or_else(|| "Kirish rad etildi.".to_string())
                    }
                    SessionError::TransientNetwork(_) => {
                        "Server bilan aloqa yo'q. Qaytadan urinib ko'ring.".to_string()
                    }
                    other => other.to_string(),
                };
                self.prompt = Prompt::Name;
                self.handle_notice(Notice::error(message));
                self.say(views::NAME_PROMPT);
            }
        }
    }

    async fn start(&mut self) {
        match self.machine.confirm_rules().await {
            Ok(()) => {
                self.prompt = Prompt::Answering;
                self.show_question();
            }
            Err(e) => {
                let message = match e {
                    SessionError::QuestionFetch { status } => {
                        format!("Savollarni yuklab bo'lmadi (server javobi {status}).")
                    }
                    _ => "Savollarni yuklab bo'lmadi. Tarmoqni tekshiring.".to_string(),
                };
                self.prompt = Prompt::Rules;
                self.handle_notice(Notice::error(message));
                self.say("Qayta urinish uchun Enter bosing.");
            }
        }
    }

    fn handle_command(&mut self, line: &str) {
        match parse_command(line) {
            Command::Choose(index) => {
                let selection = self.machine.current_question().and_then(|q| {
                    q.options
                        .get(index)
                        .map(|option| (q.id.clone(), option.clone()))
                });
                match selection {
                    Some((id, option)) => match self.machine.select_answer(&id, &option) {
                        Ok(()) => self.show_question(),
                        Err(e) => {
                            tracing::warn!(error = %e, "answer rejected");
                            self.handle_notice(Notice::warning(e.to_string()));
                        }
                    },
                    None => self.say("Bunday javob varianti yo'q."),
                }
            }
            Command::Next => self.move_to(Navigation::Next),
            Command::Previous => self.move_to(Navigation::Previous),
            Command::Jump(index) => self.move_to(Navigation::Jump(index)),
            Command::Finish => {
                self.prompt = Prompt::ConfirmFinish;
                self.say(views::FINISH_CONFIRM_PROMPT);
            }
            Command::Help => self.out.push_str(&views::help()),
            Command::Unknown(_) => {
                self.say("Noma'lum buyruq.");
                self.out.push_str(&views::help());
            }
        }
    }

    fn move_to(&mut self, navigation: Navigation) {
        self.machine.navigate(navigation);
        self.show_question();
    }

    fn apply(&mut self, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Ignored => {}
            EventOutcome::Ticked { remaining_seconds } => {
                if TIME_WARNINGS.contains(&remaining_seconds) {
                    self.out.push_str(&views::time_warning(remaining_seconds));
                }
            }
            EventOutcome::Violation { count } => self.out.push_str(&views::violation(count)),
            EventOutcome::ExitDeterred { advisory } => self.say(advisory),
            EventOutcome::LeaveConfirmed => {
                self.say("Test tark etildi. Javoblar saqlanmadi.");
                self.exit = true;
            }
            EventOutcome::Finished(summary) => self.show_finished(summary),
        }
    }

    fn show_question(&mut self) {
        let question = self.machine.current_question();
        let chosen = question.and_then(|q| self.machine.answers().get(&q.id));
        let view = views::question(
            self.machine.cursor(),
            self.machine.questions().len(),
            question,
            chosen,
            self.machine.session().time_remaining_seconds,
        );
        self.out.push_str(&view);
    }

    fn show_finished(&mut self, summary: FinishSummary) {
        if summary.reason == FinishReason::Timeout {
            self.say("Vaqt tugadi.");
        }
        self.prompt = Prompt::Finished;
        self.out.push_str(&views::finished(
            summary.score,
            self.machine.session().violation_count,
        ));
    }

    fn say(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }
}

/// Runs one assessment session on the controlling terminal.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
    let (interrupts_tx, mut interrupts_rx) = mpsc::unbounded_channel();

    let focus = if state.config.focus_reporting && std::io::stdout().is_terminal() {
        FocusMonitor::terminal()
    } else {
        FocusMonitor::headless()
    };
    let machine = state.session_machine(focus, events_tx.clone(), notice_tx);
    let mut app = ConsoleApp::new(machine);

    let reader = tokio::spawn(read_stdin(lines_tx, events_tx));
    // Ctrl+C pressed while a line is being handled waits in the channel.
    let interrupts = tokio::spawn(forward_interrupts(tokio::signal::ctrl_c, interrupts_tx));
    let mut stdout = tokio::io::stdout();
    flush(&mut stdout, &mut app).await?;

    loop {
        tokio::select! {
            line = lines_rx.recv() => match line {
                Some(line) => app.handle_line(&line).await,
                None => {
                    tracing::info!("Input closed, leaving");
                    break;
                }
            },
            Some(event) = events_rx.recv() => app.handle_event(event),
            Some(notice) = notice_rx.recv() => app.handle_notice(notice),
            Some(()) = interrupts_rx.recv() => app.handle_interrupt(),
        }

        flush(&mut stdout, &mut app).await?;
        if app.should_exit() {
            break;
        }
    }

    reader.abort();
    interrupts.abort();

    // Upload started at finish may still be running; its outcome is the last thing shown.
    if let Some(handle) = app.machine_mut().take_submission() {
        if let Err(e) = handle.await {
            tracing::warn!("Submission task did not complete: {}", e);
        }
        while let Ok(notice) = notice_rx.try_recv() {
            app.handle_notice(notice);
        }
        flush(&mut stdout, &mut app).await?;
    }

    Ok(())
}

async fn flush<W: AsyncWrite + Unpin>(writer: &mut W, app: &mut ConsoleApp) -> std::io::Result<()> {
    let text = app.take_output();
    if text.is_empty() {
        return Ok(());
    }
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}

/// Forwards every signal `next` yields until listening fails or the receiver
/// is gone.
async fn forward_interrupts<F, Fut>(mut next: F, interrupts: UnboundedSender<()>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    loop {
        match next().await {
            Ok(()) => {
                if interrupts.send(()).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                break;
            }
        }
    }
}

async fn read_stdin(lines: UnboundedSender<String>, events: UnboundedSender<SessionEvent>) {
    let mut stdin = tokio::io::stdin();
    let mut decoder = InputDecoder::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = match stdin.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Failed to read stdin: {}", e);
                break;
            }
        };
        for event in decoder.feed(&buf[..n]) {
            if !dispatch(event, &lines, &events) {
                return;
            }
        }
    }

    if let Some(event) = decoder.finish() {
        dispatch(event, &lines, &events);
    }
}

fn dispatch(
    event: InputEvent,
    lines: &UnboundedSender<String>,
    events: &UnboundedSender<SessionEvent>,
) -> bool {
    match event {
        InputEvent::Line(line) => lines.send(line).is_ok(),
        InputEvent::Focus(signal) => events.send(SessionEvent::Focus(signal)).is_ok(),
    }
}
