//! Page enhancer for Plataforma Educativa pages.
//!
//! [`PageEnhancer::attach`] runs the setup routines once against a ready
//! [`Page`]: alert auto-dismiss, delete confirmation, required-field
//! validation, submit busy state, character counters, active navigation
//! highlight, smooth anchors, password toggles and the double-submit guard.

mod config;
mod numeric;

pub use config::DestructiveMatch;
pub use config::EnhancerConfig;
pub use config::Routines;

use pe_core::EnhancerError;
use pe_core::EnhancerResult;
use pe_dom::Document;
use pe_dom::EventKind;
use pe_dom::NodeId;
use pe_dom::SelectorList;
use pe_host::Page;
use pe_host::ReadyState;
use pe_host::ScrollBehavior;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// What the routines matched and wired up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancementReport {
    pub alerts_scheduled: usize,
    pub confirm_buttons: usize,
    pub validated_forms: usize,
    pub busy_form: bool,
    pub counters: usize,
    pub highlighted_links: usize,
    pub smooth_anchors: usize,
    pub password_toggles: usize,
    /// Toggles built for inputs outside a form group and never inserted.
    pub discarded_toggles: usize,
    pub guarded_forms: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PageEnhancer {
    config: EnhancerConfig,
}

impl PageEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Defers [`PageEnhancer::attach`] until the page signals readiness.
    pub fn install(self, page: &mut Page) -> EnhancerResult<()> {
        self.config.validate()?;
        page.on_ready(move |page| match self.attach(page) {
            Ok(report) => debug!(?report, "page enhanced"),
            Err(error) => warn!(%error, "page enhancement failed"),
        });
        Ok(())
    }

    /// Runs every enabled routine, in order, against a ready page.
    pub fn attach(&self, page: &mut Page) -> EnhancerResult<EnhancementReport> {
        if page.ready_state() != ReadyState::Interactive {
            return Err(EnhancerError::new(
                "enhancer.page_not_ready",
                "the enhancer attaches once the document structure has loaded",
            ));
        }
        self.config.validate()?;

        let routines = self.config.routines;
        let mut report = EnhancementReport::default();
        let forms = select(page.document(), &self.config.form_selector);

        if routines.alert_dismiss {
            report.alerts_scheduled = self.schedule_alert_dismissal(page);
        }
        if routines.destructive_confirm {
            report.confirm_buttons = self.confirm_destructive_actions(page);
        }
        if routines.required_validation {
            report.validated_forms = self.validate_required_fields(page, &forms);
        }
        if routines.busy_submit {
            report.busy_form = self.mark_busy_on_submit(page);
        }
        if routines.character_counter {
            report.counters = self.attach_character_counters(page)?;
        }
        if routines.nav_highlight {
            report.highlighted_links = self.highlight_active_navigation(page)?;
        }
        if routines.smooth_scroll {
            report.smooth_anchors = self.enable_smooth_scrolling(page);
        }
        if routines.password_toggle {
            let (attached, discarded) = self.add_password_toggles(page)?;
            report.password_toggles = attached;
            report.discarded_toggles = discarded;
        }
        if routines.double_submit_guard {
            report.guarded_forms = guard_double_submit(page, &forms);
        }

        page.host_mut().console_log(&self.config.ready_message);
        info!(path = page.host().pathname(), "enhancer ready");
        Ok(report)
    }

    fn schedule_alert_dismissal(&self, page: &mut Page) -> usize {
        let alerts = select(page.document(), &self.config.alert_selector);
        let fade_delay = self.config.alert_fade_delay_ms;
        let remove_delay = self.config.alert_remove_delay_ms;

        for alert in alerts.iter().copied() {
            page.host_mut().set_timeout(fade_delay, move |host| {
                log_failure("alert fade", host.document.set_style(alert, "opacity", "0"));
                host.set_timeout(remove_delay, move |host| {
                    log_failure("alert removal", host.document.remove(alert));
                });
            });
        }

        debug!(count = alerts.len(), "alert dismissal scheduled");
        alerts.len()
    }

    fn confirm_destructive_actions(&self, page: &mut Page) -> usize {
        let document = page.document();
        let buttons = select(document, &self.config.destructive_selector)
            .into_iter()
            .filter(|button| match &self.config.destructive_match {
                DestructiveMatch::TextContains(text) => {
                    document.text_content(*button).contains(text.as_str())
                }
                DestructiveMatch::Attribute(name) => document.has_attribute(*button, name),
            })
            .collect::<Vec<_>>();

        for button in buttons.iter().copied() {
            let message = self.config.confirm_message.clone();
            page.add_event_listener(button, EventKind::Click, move |event, host| {
                if !host.confirm(&message) {
                    event.prevent_default();
                }
            });
        }

        debug!(count = buttons.len(), "delete confirmation attached");
        buttons.len()
    }

    fn validate_required_fields(&self, page: &mut Page, forms: &[NodeId]) -> usize {
        let Some(required) = parse_selector(&self.config.required_selector) else {
            return 0;
        };

        for form in forms.iter().copied() {
            let required = required.clone();
            let invalid_color = self.config.invalid_border_color.clone();
            let valid_color = self.config.valid_border_color.clone();
            let message = self.config.required_alert_message.clone();

            page.add_event_listener(form, EventKind::Submit, move |event, host| {
                let mut all_filled = true;
                for field in host.document.select_in(form, &required) {
                    let filled = !trim_script_whitespace(&host.document.value(field)).is_empty();
                    all_filled &= filled;
                    let color = if filled { &valid_color } else { &invalid_color };
                    log_failure(
                        "border reset",
                        host.document.set_style(field, "border-color", color),
                    );
                }
                if !all_filled {
                    event.prevent_default();
                    host.alert(&message);
                }
            });
        }

        debug!(count = forms.len(), "required-field validation attached");
        forms.len()
    }

    fn mark_busy_on_submit(&self, page: &mut Page) -> bool {
        let Some(form) = page.document().get_element_by_id(&self.config.busy_form_id) else {
            debug!(id = %self.config.busy_form_id, "no busy-state form on page");
            return false;
        };
        let Some(button_selector) = parse_selector(&self.config.busy_button_selector) else {
            return false;
        };
        let label = self.config.busy_label.clone();

        page.add_event_listener(form, EventKind::Submit, move |_, host| {
            let Some(button) = host.document.select_in(form, &button_selector).first().copied()
            else {
                debug!(form, "busy-state form has no submit button");
                return;
            };
            log_failure("busy label", host.document.set_text_content(button, &label));
            log_failure(
                "busy disable",
                host.document.set_attribute(button, "disabled", ""),
            );
        });
        true
    }

    fn attach_character_counters(&self, page: &mut Page) -> EnhancerResult<usize> {
        let textareas = select(page.document(), &self.config.counter_textarea_selector);
        let mut attached = 0_usize;

        for textarea in textareas {
            let document = &mut page.host_mut().document;
            let Some(max_length) = document
                .get_attribute(textarea, "maxlength")
                .filter(|value| !value.is_empty())
                .map(numeric::to_number)
            else {
                continue;
            };
            let Some(container) = document.parent(textarea) else {
                continue;
            };

            let counter = document.create_element("small");
            apply_styles(
                document,
                counter,
                &[
                    ("display", "block"),
                    ("text-align", "right"),
                    ("color", self.config.counter_color.as_str()),
                ],
            )?;
            if let Err(error) = document.append_child(container, counter) {
                warn!(textarea, %error, "character counter skipped");
                continue;
            }

            let binding = CounterBinding {
                textarea,
                counter,
                max_length,
                suffix: self.config.counter_suffix.clone(),
            };
            binding.refresh(document);
            page.add_event_listener(textarea, EventKind::Input, move |_, host| {
                binding.refresh(&mut host.document);
            });
            attached = attached.saturating_add(1);
        }

        debug!(count = attached, "character counters attached");
        Ok(attached)
    }

    fn highlight_active_navigation(&self, page: &mut Page) -> EnhancerResult<usize> {
        let links = select(page.document(), &self.config.nav_link_selector);
        let path = page.host().pathname().to_owned();
        let document = &mut page.host_mut().document;

        let mut highlighted = 0_usize;
        for link in links {
            if document.get_attribute(link, "href") != Some(path.as_str()) {
                continue;
            }
            apply_styles(
                document,
                link,
                &[("font-weight", "bold"), ("text-decoration", "underline")],
            )?;
            highlighted = highlighted.saturating_add(1);
        }

        debug!(path, count = highlighted, "active navigation highlighted");
        Ok(highlighted)
    }

    fn enable_smooth_scrolling(&self, page: &mut Page) -> usize {
        let anchors = select(page.document(), &self.config.anchor_selector);

        for anchor in anchors.iter().copied() {
            page.add_event_listener(anchor, EventKind::Click, move |event, host| {
                event.prevent_default();
                let Some(href) = host.document.get_attribute(anchor, "href").map(ToOwned::to_owned)
                else {
                    return;
                };
                match host.document.query_selector(&href) {
                    Ok(Some(target)) => host.scroll_into_view(target, ScrollBehavior::Smooth),
                    Ok(None) => debug!(href, "scroll target not found"),
                    Err(error) => debug!(href, %error, "scroll target unusable"),
                }
            });
        }

        debug!(count = anchors.len(), "smooth scrolling attached");
        anchors.len()
    }

    fn add_password_toggles(&self, page: &mut Page) -> EnhancerResult<(usize, usize)> {
        let inputs = select(page.document(), &self.config.password_selector);
        let (mut attached, mut discarded) = (0_usize, 0_usize);

        for input in inputs {
            let document = &mut page.host_mut().document;
            let toggle = document.create_element("button");
            document.set_attribute(toggle, "type", "button")?;
            document.set_text_content(toggle, &self.config.toggle_hidden_glyph)?;
            document.set_style(toggle, "margin-left", &self.config.toggle_margin_left)?;

            let in_group = document
                .parent(input)
                .is_some_and(|parent| document.has_class(parent, &self.config.toggle_container_class));
            if !in_group {
                discarded = discarded.saturating_add(1);
                continue;
            }
            if let Err(error) = document.insert_after(input, toggle) {
                warn!(input, %error, "password toggle skipped");
                continue;
            }

            let hidden_glyph = self.config.toggle_hidden_glyph.clone();
            let visible_glyph = self.config.toggle_visible_glyph.clone();
            page.add_event_listener(toggle, EventKind::Click, move |_, host| {
                let document = &mut host.document;
                let masked = document
                    .get_attribute(input, "type")
                    .is_some_and(|kind| kind.eq_ignore_ascii_case("password"));
                let (next_type, glyph) = if masked {
                    ("text", &visible_glyph)
                } else {
                    ("password", &hidden_glyph)
                };
                log_failure("password type", document.set_attribute(input, "type", next_type));
                log_failure("toggle glyph", document.set_text_content(toggle, glyph));
            });
            attached = attached.saturating_add(1);
        }

        debug!(attached, discarded, "password toggles built");
        Ok((attached, discarded))
    }
}

/// Lets the first submission of each form through and cancels every later one.
fn guard_double_submit(page: &mut Page, forms: &[NodeId]) -> usize {
    for form in forms.iter().copied() {
        let mut submitted = false;
        page.add_event_listener(form, EventKind::Submit, move |event, _| {
            if submitted {
                event.prevent_default();
                debug!(form, "repeat submission blocked");
                return;
            }
            submitted = true;
        });
    }

    debug!(count = forms.len(), "double-submit guard attached");
    forms.len()
}

/// Textarea and the `<small>` element reporting its remaining characters.
struct CounterBinding {
    textarea: NodeId,
    counter: NodeId,
    max_length: f64,
    suffix: String,
}

impl CounterBinding {
    fn refresh(&self, document: &mut Document) {
        let length = document.value(self.textarea).encode_utf16().count();
        let remaining = self.max_length - length as f64;
        let text = format!("{} {}", numeric::to_display(remaining), self.suffix);
        log_failure("counter update", document.set_text_content(self.counter, &text));
    }
}

/// Trims the way script `String.prototype.trim` does, byte order mark included.
fn trim_script_whitespace(text: &str) -> &str {
    text.trim_matches(|ch: char| ch.is_whitespace() || ch == '\u{feff}')
}

fn select(document: &Document, selector: &str) -> Vec<NodeId> {
    parse_selector(selector)
        .map(|list| document.select_in(document.root(), &list))
        .unwrap_or_default()
}

fn parse_selector(selector: &str) -> Option<SelectorList> {
    match SelectorList::parse(selector) {
        Ok(list) => Some(list),
        Err(error) => {
            warn!(selector, %error, "configured selector skipped");
            None
        }
    }
}

fn apply_styles(document: &mut Document, node: NodeId, styles: &[(&str, &str)]) -> EnhancerResult<()> {
    for (property, value) in styles {
        document.set_style(node, property, value)?;
    }
    Ok(())
}

fn log_failure<T>(action: &str, result: EnhancerResult<T>) {
    if let Err(error) = result {
        warn!(action, %error, "page update failed");
    }
}

#[cfg(test)]
mod tests {
    use super::DestructiveMatch;
    use super::EnhancementReport;
    use super::EnhancerConfig;
    use super::PageEnhancer;
    use super::Routines;
    use pe_dom::EventKind;
    use pe_host::ClickOutcome;
    use pe_host::Dialog;
    use pe_host::Page;
    use pe_host::ScriptedPrompts;
    use pe_host::ScrollBehavior;
    use pe_host::SubmitOutcome;
    use pe_html::HtmlParser;
    use std::cell::RefCell;
    use std::rc::Rc;
    use url::Url;

    const READY: &str = "✅ Plataforma Educativa cargada correctamente";

    fn ready_page(path: &str, html: &str) -> Page {
        let location = Url::parse("https://plataforma.test")
            .and_then(|base| base.join(path))
            .unwrap_or_else(|error| panic!("test url: {error}"));
        let mut page = Page::new(HtmlParser.parse(html), location);
        page.mark_ready();
        page
    }

    fn enhance(page: &mut Page) -> EnhancementReport {
        PageEnhancer::default()
            .attach(page)
            .unwrap_or_else(|error| panic!("attach failed: {error}"))
    }

    fn find(page: &Page, selector: &str) -> usize {
        match page.document().query_selector(selector) {
            Ok(Some(node)) => node,
            other => panic!("no match for {selector}: {other:?}"),
        }
    }

    fn alerts(page: &Page) -> usize {
        page.host()
            .dialogs()
            .iter()
            .filter(|dialog| matches!(dialog, Dialog::Alert { .. }))
            .count()
    }

    #[test]
    fn attach_requires_a_ready_page() {
        let location = Url::parse("https://plataforma.test/")
            .unwrap_or_else(|error| panic!("test url: {error}"));
        let mut page = Page::new(HtmlParser.parse("<p></p>"), location);
        let error = PageEnhancer::default().attach(&mut page).err();
        assert_eq!(error.map(|e| e.code), Some("enhancer.page_not_ready"));
    }

    #[test]
    fn install_runs_on_ready_and_logs_once() {
        let location = Url::parse("https://plataforma.test/")
            .unwrap_or_else(|error| panic!("test url: {error}"));
        let mut page = Page::new(HtmlParser.parse("<form><input required></form>"), location);
        assert!(PageEnhancer::default().install(&mut page).is_ok());
        assert!(page.host().console().is_empty());

        page.mark_ready();
        page.mark_ready();
        assert_eq!(page.host().console(), &[READY.to_owned()]);
        let form = find(&page, "form");
        assert_eq!(page.listener_count(form, EventKind::Submit), 2);
    }

    #[test]
    fn invalid_config_is_rejected_before_install() {
        let mut page = ready_page("/", "<p></p>");
        let enhancer = PageEnhancer::new(EnhancerConfig {
            form_selector: String::new(),
            ..EnhancerConfig::default()
        });
        assert_eq!(
            enhancer.install(&mut page).err().map(|e| e.code),
            Some("enhancer.invalid_config")
        );
        assert!(page.host().console().is_empty());
    }

    #[test]
    fn alerts_fade_then_disappear() {
        let mut page = ready_page(
            "/",
            "<div class=\"alert alert-success\">Guardado</div><div class=alert>Aviso</div>",
        );
        let report = enhance(&mut page);
        assert_eq!(report.alerts_scheduled, 2);
        let first = find(&page, ".alert-success");

        page.advance_time(4999);
        assert_eq!(page.document().style(first, "opacity"), None);
        page.advance_time(1);
        assert_eq!(page.document().style(first, "opacity").as_deref(), Some("0"));
        page.advance_time(299);
        assert!(page.document().is_connected(first));
        page.advance_time(1);
        assert!(!page.document().is_connected(first));
        assert_eq!(page.document().query_selector_all(".alert").ok(), Some(Vec::new()));
    }

    #[test]
    fn alert_removed_early_is_left_alone() {
        let mut page = ready_page("/", "<div class=alert>Aviso</div>");
        enhance(&mut page);
        let alert = find(&page, ".alert");
        assert!(page.host_mut().document.remove(alert).is_ok());

        assert_eq!(page.advance_time(6000), 2);
        assert!(!page.document().is_connected(alert));
        assert_eq!(page.host().pending_timers(), 0);
    }

    #[test]
    fn delete_buttons_ask_for_confirmation() {
        let mut page = ready_page(
            "/usuarios",
            "<a class=\"btn btn-danger\" href=\"/usuarios/3/eliminar\">Eliminar</a>\
             <a class=\"btn btn-danger\" href=\"/salir\">Cerrar sesión</a>\
             <a class=btn href=\"/usuarios/4/eliminar\">Eliminar</a>",
        );
        page.set_prompts(ScriptedPrompts::with_answers(true, [false]));
        let report = enhance(&mut page);
        assert_eq!(report.confirm_buttons, 1);

        let delete = find(&page, "a[href$='3/eliminar']");
        assert_eq!(page.click(delete).ok(), Some(ClickOutcome::Prevented));
        assert!(matches!(
            page.click(delete),
            Ok(ClickOutcome::Navigated { .. })
        ));

        let logout = find(&page, "a[href='/salir']");
        assert!(matches!(
            page.click(logout),
            Ok(ClickOutcome::Navigated { .. })
        ));
        let messages = page
            .host()
            .dialogs()
            .iter()
            .map(|dialog| dialog.message().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            messages,
            vec!["¿Estás seguro de que deseas eliminar este elemento?"; 2]
        );
    }

    #[test]
    fn text_match_is_case_sensitive_and_attribute_match_is_opt_in() {
        let html = "<button class=btn-danger>eliminar</button>\
                    <button class=btn-danger data-confirm>Quitar</button>";

        let mut page = ready_page("/", html);
        assert_eq!(enhance(&mut page).confirm_buttons, 0);

        let mut page = ready_page("/", html);
        let enhancer = PageEnhancer::new(EnhancerConfig {
            destructive_match: DestructiveMatch::Attribute("data-confirm".to_owned()),
            ..EnhancerConfig::default()
        });
        let report = enhancer
            .attach(&mut page)
            .unwrap_or_else(|error| panic!("attach failed: {error}"));
        assert_eq!(report.confirm_buttons, 1);
    }

    #[test]
    fn blank_required_field_cancels_submission() {
        let mut page = ready_page(
            "/actividades/nueva",
            "<form action=\"/actividades\">\
               <input name=titulo required value=\"Tarea 1\">\
               <input name=fecha required value=\"   \">\
               <textarea name=descripcion required>Leer capítulo 2</textarea>\
               <input name=nota>\
             </form>",
        );
        enhance(&mut page);
        let form = find(&page, "form");

        assert_eq!(page.submit(form).ok(), Some(SubmitOutcome::Cancelled));
        let document = page.document();
        let border = |selector: &str| document.style(find(&page, selector), "border-color");
        assert_eq!(border("[name=titulo]").as_deref(), Some("#ddd"));
        assert_eq!(border("[name=fecha]").as_deref(), Some("red"));
        assert_eq!(border("[name=descripcion]").as_deref(), Some("#ddd"));
        assert_eq!(border("[name=nota]"), None);
        assert_eq!(alerts(&page), 1);
        assert_eq!(
            page.host().dialogs()[0].message(),
            "Por favor completa todos los campos requeridos"
        );
        assert!(page.submissions().is_empty());
    }

    #[test]
    fn unvalued_required_checkbox_passes_and_bom_only_field_fails() {
        let mut page = ready_page(
            "/registro",
            "<form><input type=checkbox name=acepto required></form>\
             <form id=bom><input name=nombre required value=\"\u{feff} \"></form>",
        );
        enhance(&mut page);

        let consent = find(&page, "form");
        assert_eq!(page.submit(consent).ok(), Some(SubmitOutcome::Sent));
        let checkbox = find(&page, "[name=acepto]");
        assert_eq!(
            page.document().style(checkbox, "border-color").as_deref(),
            Some("#ddd")
        );

        let bom = find(&page, "#bom");
        assert_eq!(page.submit(bom).ok(), Some(SubmitOutcome::Cancelled));
        assert_eq!(alerts(&page), 1);
    }

    #[test]
    fn second_submit_is_cancelled() {
        let mut page = ready_page("/", "<form><input name=q value=rust></form>");
        enhance(&mut page);
        let form = find(&page, "form");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        page.add_event_listener(form, EventKind::Submit, move |event, _| {
            log.borrow_mut().push(event.default_prevented());
        });

        assert_eq!(page.submit(form).ok(), Some(SubmitOutcome::Sent));
        assert_eq!(page.submit(form).ok(), Some(SubmitOutcome::Cancelled));
        assert_eq!(*seen.borrow(), vec![false, true]);
        assert_eq!(page.submissions(), &[form]);
    }

    #[test]
    fn failed_validation_still_consumes_the_first_submit() {
        let mut page = ready_page("/", "<form><input name=nombre required></form>");
        enhance(&mut page);
        let form = find(&page, "form");
        let field = find(&page, "input");

        assert_eq!(page.submit(form).ok(), Some(SubmitOutcome::Cancelled));
        assert!(page.input(field, "Ana").is_ok());
        assert_eq!(page.submit(form).ok(), Some(SubmitOutcome::Cancelled));

        assert_eq!(alerts(&page), 1);
        assert_eq!(
            page.document().style(field, "border-color").as_deref(),
            Some("#ddd")
        );
        assert!(page.submissions().is_empty());
    }

    #[test]
    fn activity_form_button_turns_busy_even_when_invalid() {
        let mut page = ready_page(
            "/actividades/nueva",
            "<form id=activityForm><input name=titulo required>\
             <button type=submit>Crear actividad</button></form>",
        );
        let report = enhance(&mut page);
        assert!(report.busy_form);
        let button = find(&page, "button");

        assert!(matches!(
            page.click(button),
            Ok(ClickOutcome::Submitted {
                outcome: SubmitOutcome::Cancelled,
                ..
            })
        ));
        assert_eq!(page.document().text_content(button), "Enviando...");
        assert!(page.document().has_attribute(button, "disabled"));
        assert_eq!(page.click(button).ok(), Some(ClickOutcome::Ignored));
    }

    #[test]
    fn activity_form_without_button_is_ignored() {
        let mut page = ready_page("/", "<form id=activityForm><input name=t></form>");
        enhance(&mut page);
        let form = find(&page, "form");
        assert_eq!(page.submit(form).ok(), Some(SubmitOutcome::Sent));
    }

    #[test]
    fn counter_shows_remaining_characters() {
        let text = "a".repeat(30);
        let mut page = ready_page(
            "/",
            &format!(
                "<div class=form-group><textarea name=d maxlength=100>{text}</textarea></div>\
                 <textarea name=libre></textarea>"
            ),
        );
        let report = enhance(&mut page);
        assert_eq!(report.counters, 1);

        let group = find(&page, ".form-group");
        let counter = page.document().children(group).last().copied();
        let counter = counter.unwrap_or_else(|| panic!("counter missing"));
        assert_eq!(page.document().tag_name(counter), Some("small"));
        assert_eq!(page.document().text_content(counter), "70 caracteres restantes");
        assert_eq!(page.document().style(counter, "display").as_deref(), Some("block"));
        assert_eq!(page.document().style(counter, "text-align").as_deref(), Some("right"));
        assert_eq!(page.document().style(counter, "color").as_deref(), Some("#666"));

        let textarea = find(&page, "textarea[name=d]");
        assert!(page.input(textarea, &"b".repeat(105)).is_ok());
        assert_eq!(page.document().text_content(counter), "-5 caracteres restantes");
        assert!(page.input(textarea, "¡Hola! 👋").is_ok());
        assert_eq!(page.document().text_content(counter), "91 caracteres restantes");
    }

    #[test]
    fn counter_ignores_the_line_break_server_templates_emit() {
        let mut page = ready_page(
            "/preguntas/nueva",
            "<div class=form-group><label for=question_text>Pregunta</label>\
             <textarea id=question_text maxlength=10 name=question_text>\r\nHola</textarea></div>",
        );
        enhance(&mut page);
        let counter = find(&page, ".form-group small");
        assert_eq!(page.document().text_content(counter), "6 caracteres restantes");

        let textarea = find(&page, "#question_text");
        assert!(page.input(textarea, "a\r\nb").is_ok());
        assert_eq!(page.document().text_content(counter), "7 caracteres restantes");
    }

    #[test]
    fn non_numeric_maxlength_counts_as_nan() {
        let mut page = ready_page("/", "<div><textarea maxlength=cien>x</textarea></div>");
        enhance(&mut page);
        let counter = find(&page, "small");
        assert_eq!(page.document().text_content(counter), "NaN caracteres restantes");
    }

    #[test]
    fn highlights_only_exact_path_links() {
        let mut page = ready_page(
            "/actividades",
            "<nav class=nav-links><a href=\"/actividades\">Actividades</a>\
             <a href=\"/actividades/\">Otra</a><a href=\"/inicio\">Inicio</a></nav>\
             <a href=\"/actividades\">Fuera</a>",
        );
        let report = enhance(&mut page);
        assert_eq!(report.highlighted_links, 1);

        let active = find(&page, ".nav-links a[href='/actividades']");
        assert_eq!(page.document().style(active, "font-weight").as_deref(), Some("bold"));
        assert_eq!(
            page.document().style(active, "text-decoration").as_deref(),
            Some("underline")
        );
        let trailing = find(&page, ".nav-links a[href='/actividades/']");
        assert_eq!(page.document().style(trailing, "font-weight"), None);
    }

    #[test]
    fn anchors_scroll_smoothly_to_existing_targets() {
        let mut page = ready_page(
            "/",
            "<a id=ir href=\"#temario\">Temario</a><a id=vacio href=\"#\">Arriba</a>\
             <a id=roto href=\"#nada\">Nada</a><section id=temario></section>",
        );
        assert_eq!(enhance(&mut page).smooth_anchors, 3);
        let section = find(&page, "section");

        for id in ["#ir", "#vacio", "#roto"] {
            let anchor = find(&page, id);
            assert_eq!(page.click(anchor).ok(), Some(ClickOutcome::Prevented));
        }
        let scrolls = page.host().scrolls();
        assert_eq!(scrolls.len(), 1);
        assert_eq!(scrolls[0].node, section);
        assert_eq!(scrolls[0].behavior, ScrollBehavior::Smooth);
        assert!(page.navigations().is_empty());
    }

    #[test]
    fn password_toggle_flips_type_and_glyph() {
        let mut page = ready_page(
            "/login",
            "<div class=form-group><input type=password name=clave><span>?</span></div>\
             <p><input type=password name=otra></p>",
        );
        let report = enhance(&mut page);
        assert_eq!(report.password_toggles, 1);
        assert_eq!(report.discarded_toggles, 1);

        let input = find(&page, "[name=clave]");
        let toggle = find(&page, ".form-group button");
        let group = find(&page, ".form-group");
        assert_eq!(page.document().children(group).get(1).copied(), Some(toggle));
        assert_eq!(page.document().get_attribute(toggle, "type"), Some("button"));
        assert_eq!(
            page.document().style(toggle, "margin-left").as_deref(),
            Some("10px")
        );
        assert_eq!(page.document().text_content(toggle), "👁️");

        assert_eq!(page.click(toggle).ok(), Some(ClickOutcome::NoDefault));
        assert_eq!(page.document().get_attribute(input, "type"), Some("text"));
        assert_eq!(page.document().text_content(toggle), "🙈");

        assert!(page.click(toggle).is_ok());
        assert_eq!(page.document().get_attribute(input, "type"), Some("password"));
        assert_eq!(page.document().text_content(toggle), "👁️");

        assert_eq!(page.document().query_selector_all("p button").ok(), Some(Vec::new()));
    }

    #[test]
    fn disabled_routines_are_skipped() {
        let mut page = ready_page(
            "/",
            "<div class=alert>Hola</div><form><input required></form>",
        );
        let enhancer = PageEnhancer::new(EnhancerConfig {
            routines: Routines {
                alert_dismiss: false,
                required_validation: false,
                ..Routines::default()
            },
            ..EnhancerConfig::default()
        });
        let report = enhancer
            .attach(&mut page)
            .unwrap_or_else(|error| panic!("attach failed: {error}"));
        assert_eq!(report.alerts_scheduled, 0);
        assert_eq!(report.validated_forms, 0);
        assert_eq!(report.guarded_forms, 1);
        assert_eq!(page.host().pending_timers(), 0);

        let form = find(&page, "form");
        assert_eq!(page.submit(form).ok(), Some(SubmitOutcome::Sent));
        assert_eq!(page.host().console(), &[READY.to_owned()]);
    }
}
