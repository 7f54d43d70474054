//! Host environment: the page runtime the enhancer is attached to.
//!
//! [`Host`] is the state handlers may touch (document, timers, prompts,
//! console, scrolling). [`Page`] pairs it with the listener registry and
//! implements user interactions and their default actions.

mod prompts;
mod timers;

pub use prompts::Dialog;
pub use prompts::Prompts;
pub use prompts::ScriptedPrompts;
pub use timers::TimerId;

use pe_core::EnhancerError;
use pe_core::EnhancerResult;
use pe_dom::Document;
use pe_dom::Event;
use pe_dom::EventKind;
use pe_dom::EventListeners;
use pe_dom::ListenerId;
use pe_dom::NodeId;
use std::collections::VecDeque;
use timers::TimerQueue;
use tracing::debug;
use tracing::info;
use url::Url;

/// Runtime limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Upper bound on timer callbacks run by a single `advance_time` call.
    pub max_timer_runs_per_advance: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_timer_runs_per_advance: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

/// A `scroll_into_view` request issued by page code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub node: NodeId,
    pub behavior: ScrollBehavior,
}

/// Document load progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
}

/// Mutable state lent to event handlers and timer callbacks.
pub struct Host {
    pub document: Document,
    location: Url,
    timers: TimerQueue,
    prompts: Box<dyn Prompts>,
    queued_confirms: VecDeque<bool>,
    dialogs: Vec<Dialog>,
    console: Vec<String>,
    scrolls: Vec<ScrollRequest>,
    max_timer_runs: usize,
}

impl core::fmt::Debug for Host {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Host")
            .field("location", &self.location.as_str())
            .field("nodes", &self.document.node_count())
            .field("timers", &self.timers)
            .field("dialogs", &self.dialogs.len())
            .field("console", &self.console.len())
            .field("scrolls", &self.scrolls.len())
            .finish()
    }
}

impl Host {
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Path component of the location, as `location.pathname` reports it.
    pub fn pathname(&self) -> &str {
        self.location.path()
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn set_timeout(
        &mut self,
        delay_ms: u64,
        callback: impl FnOnce(&mut Host) + 'static,
    ) -> TimerId {
        self.timers.schedule(delay_ms, Box::new(callback))
    }

    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Moves virtual time forward, running every timer that comes due,
    /// including timers scheduled by those callbacks. Returns the number of
    /// callbacks run.
    pub fn advance_time(&mut self, delta_ms: u64) -> usize {
        let target = self.timers.now_ms().saturating_add(delta_ms);
        let mut runs = 0_usize;
        while runs < self.max_timer_runs {
            let Some(timer) = self.timers.pop_due(target) else {
                break;
            };
            (timer.callback)(self);
            runs = runs.saturating_add(1);
        }
        if runs >= self.max_timer_runs && !self.timers.is_empty() {
            debug!(runs, pending = self.timers.len(), "timer run limit reached");
        }
        self.timers.settle_at(target);
        runs
    }

    /// Blocking confirmation prompt.
    pub fn confirm(&mut self, message: &str) -> bool {
        let accepted = match self.queued_confirms.pop_front() {
            Some(answer) => answer,
            None => self.prompts.confirm(message),
        };
        debug!(message, accepted, "confirm dialog");
        self.dialogs.push(Dialog::Confirm {
            message: message.to_owned(),
            accepted,
        });
        accepted
    }

    /// Blocking alert prompt.
    pub fn alert(&mut self, message: &str) {
        self.prompts.alert(message);
        debug!(message, "alert dialog");
        self.dialogs.push(Dialog::Alert {
            message: message.to_owned(),
        });
    }

    /// Answers the next confirm ahead of the prompt backend.
    pub fn queue_confirm_answer(&mut self, answer: bool) {
        self.queued_confirms.push_back(answer);
    }

    pub fn console_log(&mut self, message: &str) {
        info!(target: "console", "{message}");
        self.console.push(message.to_owned());
    }

    pub fn scroll_into_view(&mut self, node: NodeId, behavior: ScrollBehavior) {
        debug!(node, ?behavior, "scroll into view");
        self.scrolls.push(ScrollRequest { node, behavior });
    }

    pub fn dialogs(&self) -> &[Dialog] {
        &self.dialogs
    }

    pub fn console(&self) -> &[String] {
        &self.console
    }

    pub fn scrolls(&self) -> &[ScrollRequest] {
        &self.scrolls
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    Cancelled,
}

/// What a click ended up doing once listeners ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Disabled control; no event was dispatched.
    Ignored,
    /// A listener called `prevent_default`.
    Prevented,
    Navigated { href: String },
    Submitted { form: NodeId, outcome: SubmitOutcome },
    /// Nothing with a default action was clicked.
    NoDefault,
}

type ReadyCallback = Box<dyn FnOnce(&mut Page)>;

/// A loaded page: host state, listeners and interaction log.
pub struct Page {
    host: Host,
    listeners: EventListeners<Host>,
    ready_state: ReadyState,
    ready_callbacks: Vec<ReadyCallback>,
    submissions: Vec<NodeId>,
    navigations: Vec<String>,
}

impl core::fmt::Debug for Page {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Page")
            .field("host", &self.host)
            .field("listeners", &self.listeners)
            .field("ready_state", &self.ready_state)
            .field("submissions", &self.submissions)
            .field("navigations", &self.navigations)
            .finish()
    }
}

impl Page {
    pub fn new(document: Document, location: Url) -> Self {
        Self::with_config(document, location, HostConfig::default())
    }

    pub fn with_config(document: Document, location: Url, config: HostConfig) -> Self {
        Self {
            host: Host {
                document,
                location,
                timers: TimerQueue::default(),
                prompts: Box::new(ScriptedPrompts::new(true)),
                queued_confirms: VecDeque::new(),
                dialogs: Vec::new(),
                console: Vec::new(),
                scrolls: Vec::new(),
                max_timer_runs: config.max_timer_runs_per_advance.max(1),
            },
            listeners: EventListeners::default(),
            ready_state: ReadyState::Loading,
            ready_callbacks: Vec::new(),
            submissions: Vec::new(),
            navigations: Vec::new(),
        }
    }

    pub fn set_prompts(&mut self, prompts: impl Prompts + 'static) {
        self.host.prompts = Box::new(prompts);
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    pub fn document(&self) -> &Document {
        &self.host.document
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Runs `callback` once the structure is ready (immediately if it already is).
    pub fn on_ready(&mut self, callback: impl FnOnce(&mut Page) + 'static) {
        if self.ready_state == ReadyState::Interactive {
            callback(self);
        } else {
            self.ready_callbacks.push(Box::new(callback));
        }
    }

    /// Signals that the document structure has finished loading.
    pub fn mark_ready(&mut self) {
        if self.ready_state == ReadyState::Interactive {
            return;
        }
        self.ready_state = ReadyState::Interactive;
        for callback in std::mem::take(&mut self.ready_callbacks) {
            callback(self);
        }
    }

    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        kind: EventKind,
        handler: impl FnMut(&mut Event, &mut Host) + 'static,
    ) -> ListenerId {
        self.listeners.add(node, kind, handler)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self, node: NodeId, kind: EventKind) -> usize {
        self.listeners.count_for(node, kind)
    }

    /// Dispatches an event at `target`, bubbling through its ancestors.
    pub fn dispatch(&mut self, kind: EventKind, target: NodeId) -> EnhancerResult<Event> {
        if !self.host.document.contains(target) {
            return Err(EnhancerError::new(
                "dom.unknown_node",
                format!("node {target} does not exist"),
            ));
        }
        let path = self.host.document.event_path(target);
        let mut event = Event::new(kind, target);
        self.listeners.dispatch(&path, &mut event, &mut self.host);
        Ok(event)
    }

    /// Clicks `target` and performs the default action unless prevented.
    pub fn click(&mut self, target: NodeId) -> EnhancerResult<ClickOutcome> {
        if self.is_disabled_control(target) {
            debug!(target, "click on disabled control ignored");
            return Ok(ClickOutcome::Ignored);
        }

        let event = self.dispatch(EventKind::Click, target)?;
        if event.default_prevented() {
            return Ok(ClickOutcome::Prevented);
        }

        let document = &self.host.document;
        for node in document.event_path(target) {
            let Some(tag) = document.tag_name(node) else {
                continue;
            };
            if tag == "a" {
                if let Some(href) = document.get_attribute(node, "href") {
                    let href = href.to_owned();
                    debug!(href, "navigation");
                    self.navigations.push(href.clone());
                    return Ok(ClickOutcome::Navigated { href });
                }
            }
            if is_submit_control(document, node) {
                let Some(form) = form_owner(document, node) else {
                    return Ok(ClickOutcome::NoDefault);
                };
                let outcome = self.submit(form)?;
                return Ok(ClickOutcome::Submitted { form, outcome });
            }
        }

        Ok(ClickOutcome::NoDefault)
    }

    /// Fires `submit` at a form; un-cancelled submissions are recorded as sent.
    pub fn submit(&mut self, form: NodeId) -> EnhancerResult<SubmitOutcome> {
        if self.host.document.tag_name(form) != Some("form") {
            return Err(EnhancerError::new(
                "host.not_a_form",
                format!("node {form} is not a form"),
            ));
        }

        let event = self.dispatch(EventKind::Submit, form)?;
        if event.default_prevented() {
            debug!(form, "submission cancelled");
            return Ok(SubmitOutcome::Cancelled);
        }
        debug!(form, "submission sent");
        self.submissions.push(form);
        Ok(SubmitOutcome::Sent)
    }

    /// Replaces a control's value as typing would, then fires `input`.
    pub fn input(&mut self, target: NodeId, value: &str) -> EnhancerResult<Event> {
        self.host.document.set_value(target, value)?;
        self.dispatch(EventKind::Input, target)
    }

    pub fn advance_time(&mut self, delta_ms: u64) -> usize {
        self.host.advance_time(delta_ms)
    }

    pub fn submissions(&self) -> &[NodeId] {
        &self.submissions
    }

    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    fn is_disabled_control(&self, node: NodeId) -> bool {
        let document = &self.host.document;
        matches!(
            document.tag_name(node),
            Some("button" | "input" | "select" | "textarea")
        ) && document.has_attribute(node, "disabled")
    }
}

fn is_submit_control(document: &Document, node: NodeId) -> bool {
    let kind = document
        .get_attribute(node, "type")
        .map(|value| value.trim().to_ascii_lowercase());
    match document.tag_name(node) {
        Some("button") => kind.is_none_or(|kind| kind == "submit" || kind.is_empty()),
        Some("input") => kind.is_some_and(|kind| kind == "submit" || kind == "image"),
        _ => false,
    }
}

/// The form a control submits: its `form` attribute target or nearest ancestor form.
fn form_owner(document: &Document, control: NodeId) -> Option<NodeId> {
    if let Some(form_id) = document.get_attribute(control, "form") {
        return document
            .get_element_by_id(form_id)
            .filter(|form| document.tag_name(*form) == Some("form"));
    }

    let mut cursor = document.parent_element(control);
    while let Some(current) = cursor {
        if document.tag_name(current) == Some("form") {
            return Some(current);
        }
        cursor = document.parent_element(current);
    }
    None
}
