use std::sync::Arc;

use futures_util::StreamExt;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use trj_chat_core::{
    ConfigChange, InferenceService, PageView, Session, SliderSpec, TEMPERATURE, TOP_P,
};

use crate::tui::{AppEvent, StreamUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Models,
    Temperature,
    TopP,
    Input,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Models => Focus::Temperature,
            Focus::Temperature => Focus::TopP,
            Focus::TopP => Focus::Input,
            Focus::Input => Focus::Models,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Models => Focus::Input,
            Focus::Temperature => Focus::Models,
            Focus::TopP => Focus::Temperature,
            Focus::Input => Focus::TopP,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub focus: Focus,
    pub session: Session,
    service: Arc<dyn InferenceService>,
    events: UnboundedSender<AppEvent>,

    pub model_state: ListState,

    // Prompt being typed; cursor counts chars, not bytes
    pub input: String,
    pub cursor: usize,

    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_area: Option<Rect>,

    // 0-2 for the "Thinking" ellipsis
    pub animation_frame: u8,
}

impl App {
    pub fn new(
        session: Session,
        service: Arc<dyn InferenceService>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            focus: Focus::Input,
            session,
            service,
            events,
            model_state: ListState::default(),
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
        }
    }

    /// Re-queries the installed models and resyncs the list highlight.
    pub async fn refresh(&mut self) -> trj_chat_core::Result<()> {
        let result = self.session.refresh_catalog(self.service.as_ref()).await;
        self.sync_model_state();
        result
    }

    pub fn models(&self) -> &[String] {
        self.session
            .state()
            .catalog
            .catalog()
            .map(|c| c.models())
            .unwrap_or_default()
    }

    fn sync_model_state(&mut self) {
        let selected = self
            .session
            .state()
            .config
            .selected_model
            .as_deref()
            .and_then(|name| self.models().iter().position(|m| m == name));
        self.model_state.select(selected);
    }

    /// Moves the model highlight and selects the model under it.
    pub fn select_model_offset(&mut self, offset: isize) {
        let len = self.models().len();
        if len == 0 {
            return;
        }
        let next = match self.model_state.selected() {
            Some(i) => (i as isize + offset).clamp(0, len as isize - 1) as usize,
            None => 0,
        };
        let model = self.models()[next].clone();
        if let Err(e) = self.session.on_config_change(ConfigChange::SelectModel(Some(model))) {
            tracing::debug!("model selection rejected: {}", e);
        }
        self.sync_model_state();
    }

    pub fn clear_model(&mut self) {
        if let Err(e) = self.session.on_config_change(ConfigChange::SelectModel(None)) {
            tracing::debug!("clearing model rejected: {}", e);
        }
        self.sync_model_state();
    }

    /// Moves the focused slider by whole steps.
    pub fn nudge_slider(&mut self, steps: i32) {
        let config = &self.session.state().config;
        let change = match self.focus {
            Focus::Temperature => {
                ConfigChange::SetTemperature(TEMPERATURE.nudge(config.temperature, steps))
            }
            Focus::TopP => ConfigChange::SetTopP(TOP_P.nudge(config.top_p, steps)),
            _ => return,
        };
        if let Err(e) = self.session.on_config_change(change) {
            tracing::debug!("slider change rejected: {}", e);
        }
    }

    pub fn focused_slider(&self) -> Option<&'static SliderSpec> {
        match self.focus {
            Focus::Temperature => Some(&TEMPERATURE),
            Focus::TopP => Some(&TOP_P),
            _ => None,
        }
    }

    /// Starts a turn for the typed prompt and streams the reply in the background.
    pub fn submit_input(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }

        let before = self.session.state().conversation.len();
        let result = self.session.submit(&self.input);

        // Keep the text when nothing was recorded, e.g. a turn is still running
        if self.session.state().conversation.len() > before {
            self.input.clear();
            self.cursor = 0;
        }

        match result {
            Ok(Some(request)) => {
                tracing::info!(model = %request.model, messages = request.messages.len(), "starting chat turn");
                let service = self.service.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let outcome = match service.chat_stream(request).await {
                        Ok(mut fragments) => loop {
                            match fragments.next().await {
                                Some(Ok(text)) => {
                                    if events.send(AppEvent::Stream(StreamUpdate::Fragment(text))).is_err() {
                                        return;
                                    }
                                }
                                Some(Err(e)) => break StreamUpdate::Failed(e),
                                None => break StreamUpdate::Done,
                            }
                        },
                        Err(e) => StreamUpdate::Failed(e),
                    };
                    let _ = events.send(AppEvent::Stream(outcome));
                });
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("submit rejected: {}", e),
        }

        self.scroll_chat_to_bottom();
    }

    pub fn apply_stream_update(&mut self, update: StreamUpdate) {
        match update {
            StreamUpdate::Fragment(text) => self.session.push_fragment(&text),
            StreamUpdate::Done => {
                if let Some(reply) = self.session.complete_turn() {
                    tracing::info!(chars = reply.content.chars().count(), "chat turn complete");
                }
            }
            StreamUpdate::Failed(error) => {
                self.session.interrupt_turn(error);
            }
        }
        self.scroll_chat_to_bottom();
    }

    pub fn tick_animation(&mut self) {
        if self.session.is_streaming() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    fn max_chat_scroll(&self) -> u16 {
        let width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };
        let height = if self.chat_height > 0 { self.chat_height } else { 20 };
        chat_line_count(&self.session.render(), width).saturating_sub(height)
    }
}

/// Lines the chat pane needs at `width` columns, matching the layout in `ui`.
pub fn chat_line_count(page: &PageView, width: usize) -> u16 {
    let PageView::Ready {
        transcript,
        pending,
        notice,
        ..
    } = page
    else {
        return 0;
    };

    let mut total: usize = 0;
    for message in transcript {
        // Label, body, blank separator
        total += 1 + wrapped_lines(&message.content, width) + 1;
    }
    if let Some(partial) = pending {
        total += 1;
        total += if partial.is_empty() { 1 } else { wrapped_lines(partial, width) };
    }
    if let Some(notice) = notice {
        total += wrapped_lines(&notice.text, width);
    }
    total.min(u16::MAX as usize) as u16
}

fn wrapped_lines(text: &str, width: usize) -> usize {
    let width = width.max(1);
    text.split('\n')
        .map(|line| {
            let chars = line.chars().count();
            if chars == 0 {
                1
            } else {
                chars.div_ceil(width)
            }
        })
        .sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::stream;
    use tokio::sync::mpsc;
    use trj_chat_core::{ChatError, ChatRequest, Config, FragmentStream};

    pub(crate) struct ScriptedService {
        models: Vec<String>,
        fragments: Vec<Result<String, ChatError>>,
    }

    impl ScriptedService {
        pub(crate) fn new(models: &[&str], fragments: Vec<Result<String, ChatError>>) -> Self {
            Self {
                models: models.iter().map(|m| m.to_string()).collect(),
                fragments,
            }
        }
    }

    #[async_trait]
    impl InferenceService for ScriptedService {
        async fn list_models(&self) -> trj_chat_core::Result<Vec<String>> {
            if self.models.is_empty() {
                return Err(ChatError::ServiceUnavailable("connection refused".into()));
            }
            Ok(self.models.clone())
        }

        async fn chat_stream(&self, _request: ChatRequest) -> trj_chat_core::Result<FragmentStream> {
            Ok(stream::iter(self.fragments.clone()).boxed())
        }
    }

    pub(crate) async fn app_with(
        service: ScriptedService,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = App::new(Session::from_config(&Config::new()), Arc::new(service), tx);
        let _ = app.refresh().await;
        (app, rx)
    }

    /// Feeds stream updates back into the app until the turn settles.
    async fn pump(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        while app.session.is_streaming() {
            match rx.recv().await {
                Some(AppEvent::Stream(update)) => app.apply_stream_update(update),
                Some(_) => {}
                None => break,
            }
        }
    }

    fn type_text(app: &mut App, text: &str) {
        app.input = text.to_string();
        app.cursor = text.chars().count();
    }

    #[tokio::test]
    async fn test_refresh_highlights_selected_model() {
        let (app, _rx) = app_with(ScriptedService::new(&["llama3", "mistral"], vec![])).await;
        assert_eq!(app.models(), ["llama3", "mistral"]);
        assert_eq!(app.model_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_model_navigation_selects_and_clamps() {
        let (mut app, _rx) = app_with(ScriptedService::new(&["llama3", "mistral"], vec![])).await;

        app.select_model_offset(1);
        assert_eq!(app.session.state().config.selected_model.as_deref(), Some("mistral"));
        app.select_model_offset(1);
        assert_eq!(app.model_state.selected(), Some(1));

        app.clear_model();
        assert_eq!(app.session.state().config.selected_model, None);
        assert_eq!(app.model_state.selected(), None);
    }

    #[tokio::test]
    async fn test_slider_nudge_stays_in_range() {
        let (mut app, _rx) = app_with(ScriptedService::new(&["llama3"], vec![])).await;

        app.focus = Focus::Temperature;
        app.nudge_slider(5);
        assert_eq!(app.session.state().config.temperature, 0.75);
        app.nudge_slider(1000);
        assert_eq!(app.session.state().config.temperature, 2.0);

        app.focus = Focus::TopP;
        app.nudge_slider(-1000);
        assert_eq!(app.session.state().config.top_p, 0.0);
    }

    #[tokio::test]
    async fn test_submit_streams_reply_into_history() {
        let fragments = vec![Ok("Hi".to_string()), Ok(" there!".to_string())];
        let (mut app, mut rx) = app_with(ScriptedService::new(&["llama3"], fragments)).await;

        type_text(&mut app, "Hello");
        app.submit_input();
        assert!(app.input.is_empty());
        assert!(app.session.is_streaming());

        pump(&mut app, &mut rx).await;
        let messages = app.session.state().conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Hi there!");
    }

    #[tokio::test]
    async fn test_failed_stream_drops_partial_reply() {
        let fragments = vec![
            Ok("Hi".to_string()),
            Err(ChatError::StreamInterrupted("connection reset".into())),
        ];
        let (mut app, mut rx) = app_with(ScriptedService::new(&["llama3"], fragments)).await;

        type_text(&mut app, "Hello");
        app.submit_input();
        pump(&mut app, &mut rx).await;

        let state = app.session.state();
        assert_eq!(state.conversation.len(), 1);
        assert!(state.notice.is_some());
    }

    #[tokio::test]
    async fn test_submit_while_streaming_keeps_input() {
        let (mut app, _rx) = app_with(ScriptedService::new(&["llama3"], vec![])).await;

        type_text(&mut app, "first");
        app.submit_input();
        type_text(&mut app, "second");
        app.submit_input();

        assert_eq!(app.input, "second");
        assert_eq!(app.session.state().conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let (mut app, _rx) = app_with(ScriptedService::new(&["llama3"], vec![])).await;
        type_text(&mut app, "   ");
        app.submit_input();
        assert!(app.session.state().conversation.is_empty());
        assert!(!app.session.is_streaming());
    }

    #[test]
    fn test_wrapped_lines_counts_chars() {
        assert_eq!(wrapped_lines("", 10), 1);
        assert_eq!(wrapped_lines("abcdefghij", 10), 1);
        assert_eq!(wrapped_lines("abcdefghijk", 10), 2);
        assert_eq!(wrapped_lines("ééééé\nab", 4), 3);
    }

    #[test]
    fn test_focus_cycle_round_trips() {
        let mut focus = Focus::Models;
        for _ in 0..4 {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::Models);
        assert_eq!(Focus::Models.prev(), Focus::Input);
    }
}
