use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::chat::{ConnectionStatus, Transcript};
use crate::model::Model;
use crate::ollama::{OllamaClient, OllamaError, ServerInfo};

/// Banner text for any failed generate request
pub const SEND_FAILED: &str =
    "Failed to get response from Ollama. Please check the API configuration and try again.";

type ProbeTask = JoinHandle<Result<ServerInfo, OllamaError>>;
type SendTask = JoinHandle<Result<String, OllamaError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Prompt input
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Chat state
    pub transcript: Transcript,
    pub model: Model,
    pub status: ConnectionStatus,
    pub server_version: Option<String>,
    pub probe_count: usize,
    probe_task: Option<ProbeTask>,
    send_task: Option<SendTask>,

    // Scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    chat_line_count: u16, // Wrapped rows of the transcript at the last draw
    stick_to_bottom: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub model_picker_state: ListState,

    // None when no host is configured
    pub ollama: Option<OllamaClient>,
}

impl App {
    pub fn new(ollama: Option<OllamaClient>, model: Model) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            input: String::new(),
            input_cursor: 0,
            transcript: Transcript::new(),
            model,
            status: ConnectionStatus::default(),
            server_version: None,
            probe_count: 0,
            probe_task: None,
            send_task: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_line_count: 0,
            stick_to_bottom: false,
            animation_frame: 0,
            show_model_picker: false,
            model_picker_state: ListState::default(),
            ollama,
        }
    }

    pub fn is_checking(&self) -> bool {
        self.probe_task.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.send_task.is_some()
    }

    /// Whether the prompt box accepts text and Enter sends it
    pub fn input_enabled(&self) -> bool {
        self.status.ok && !self.is_loading() && !self.is_checking()
    }

    /// Text for the error banner, if one should be shown
    pub fn banner(&self) -> Option<&str> {
        if self.status.ok {
            None
        } else {
            self.status.detail.as_deref()
        }
    }

    /// Starts a connectivity check for the current model. A check already in
    /// flight is superseded and its result is never read.
    pub fn start_probe(&mut self) {
        self.probe_count += 1;
        let model = self.model;
        let client = self.ollama.clone();
        info!(model = %model, cycle = self.probe_count, "probing ollama");

        self.probe_task = Some(tokio::spawn(async move {
            match client {
                Some(client) => client.probe(model.as_str()).await,
                None => Err(OllamaError::NotConfigured),
            }
        }));
    }

    /// Manual re-check from the banner. Ignored while a check is running.
    pub fn retry(&mut self) {
        if !self.is_checking() {
            self.start_probe();
        }
    }

    pub fn select_model(&mut self, model: Model) {
        self.show_model_picker = false;
        if model != self.model {
            info!(from = %self.model, to = %model, "model changed");
            self.model = model;
            self.server_version = None;
            self.start_probe();
        }
    }

    /// Sends the current input. Returns false when nothing was sent: blank
    /// input, a request already outstanding, or input disabled.
    pub fn submit(&mut self) -> bool {
        if self.input.trim().is_empty() || !self.input_enabled() {
            return false;
        }

        let prompt = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        self.transcript.push_user(prompt.clone());
        self.status = ConnectionStatus::ok();
        self.input_mode = InputMode::Normal;
        self.scroll_chat_to_bottom();

        let model = self.model;
        let client = self.ollama.clone();
        info!(model = %model, chars = prompt.chars().count(), "sending prompt");

        self.send_task = Some(tokio::spawn(async move {
            match client {
                Some(client) => client.generate(model.as_str(), &prompt).await,
                None => Err(OllamaError::NotConfigured),
            }
        }));
        true
    }

    /// Applies results of finished network tasks. Called once per loop turn.
    pub async fn poll_tasks(&mut self) {
        if self.probe_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.probe_task.take() {
                let result = flatten_join(task.await);
                self.finish_probe(result);
            }
        }

        if self.send_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.send_task.take() {
                let result = flatten_join(task.await);
                self.finish_send(result);
            }
        }
    }

    fn finish_probe(&mut self, result: Result<ServerInfo, String>) {
        match result {
            Ok(info) => {
                info!(model = %self.model, version = ?info.version, "ollama reachable");
                self.status = ConnectionStatus::ok();
                self.server_version = info.version;
            }
            Err(detail) => {
                warn!(model = %self.model, %detail, "probe failed");
                self.status = ConnectionStatus::failed(detail);
                self.server_version = None;
                self.input_mode = InputMode::Normal;
            }
        }
    }

    fn finish_send(&mut self, result: Result<String, String>) {
        match result {
            Ok(reply) => {
                self.transcript.push_assistant(reply);
                info!(messages = self.transcript.len(), "reply received");
                self.input_mode = InputMode::Editing;
                self.scroll_chat_to_bottom();
            }
            Err(detail) => {
                error!(model = %self.model, %detail, "generate failed");
                self.status = ConnectionStatus::failed(SEND_FAILED);
                self.input_mode = InputMode::Normal;
            }
        }
    }

    /// Waits for every outstanding task and applies its result
    #[cfg(test)]
    pub async fn settle(&mut self) {
        if let Some(task) = self.probe_task.take() {
            let result = flatten_join(task.await);
            self.finish_probe(result);
        }
        if let Some(task) = self.send_task.take() {
            let result = flatten_join(task.await);
            self.finish_send(result);
        }
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }

    // Model picker methods
    pub fn open_model_picker(&mut self) {
        self.model_picker_state.select(Some(self.model.index()));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = Model::all().len();
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn confirm_model_picker(&mut self) {
        let picked = self
            .model_picker_state
            .selected()
            .and_then(|i| Model::all().get(i).copied());
        match picked {
            Some(model) => self.select_model(model),
            None => self.show_model_picker = false,
        }
    }

    // Scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up(self.visible_height() / 2);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down(self.visible_height() / 2);
    }

    /// Jumps to the end now and again after the next layout, since new
    /// content is only measured when it is drawn
    pub fn scroll_chat_to_bottom(&mut self) {
        self.stick_to_bottom = true;
        self.chat_scroll = self.max_chat_scroll();
    }

    /// Records the chat area and its wrapped line count from the last draw
    pub fn set_chat_layout(&mut self, height: u16, line_count: u16) {
        self.chat_height = height;
        self.chat_line_count = line_count;

        if self.stick_to_bottom {
            self.chat_scroll = self.max_chat_scroll();
            self.stick_to_bottom = false;
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_chat_scroll());
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn max_chat_scroll(&self) -> u16 {
        self.chat_line_count.saturating_sub(self.visible_height())
    }
}

fn flatten_join<T>(joined: Result<Result<T, OllamaError>, tokio::task::JoinError>) -> Result<T, String> {
    match joined {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("Request task failed: {e}")),
    }
}
