//! Enhancer configuration: every selector, delay, message and style literal.

use pe_core::EnhancerError;
use pe_core::EnhancerResult;

/// How destructive-action buttons are recognised among the danger buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestructiveMatch {
    /// Text content contains this case-sensitive substring.
    TextContains(String),
    /// The element carries this attribute, whatever its text says.
    Attribute(String),
}

impl Default for DestructiveMatch {
    fn default() -> Self {
        Self::TextContains("Eliminar".to_owned())
    }
}

/// Per-routine switches. All routines run by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routines {
    pub alert_dismiss: bool,
    pub destructive_confirm: bool,
    pub required_validation: bool,
    pub busy_submit: bool,
    pub character_counter: bool,
    pub nav_highlight: bool,
    pub smooth_scroll: bool,
    pub password_toggle: bool,
    pub double_submit_guard: bool,
}

impl Default for Routines {
    fn default() -> Self {
        Self {
            alert_dismiss: true,
            destructive_confirm: true,
            required_validation: true,
            busy_submit: true,
            character_counter: true,
            nav_highlight: true,
            smooth_scroll: true,
            password_toggle: true,
            double_submit_guard: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancerConfig {
    pub routines: Routines,

    pub alert_selector: String,
    /// Delay before an alert fades out.
    pub alert_fade_delay_ms: u64,
    /// Delay between the fade and the removal.
    pub alert_remove_delay_ms: u64,

    pub destructive_selector: String,
    pub destructive_match: DestructiveMatch,
    pub confirm_message: String,

    pub form_selector: String,
    pub required_selector: String,
    pub invalid_border_color: String,
    pub valid_border_color: String,
    pub required_alert_message: String,

    pub busy_form_id: String,
    pub busy_button_selector: String,
    pub busy_label: String,

    pub counter_textarea_selector: String,
    pub counter_suffix: String,
    pub counter_color: String,

    pub nav_link_selector: String,
    pub anchor_selector: String,

    pub password_selector: String,
    pub toggle_container_class: String,
    pub toggle_hidden_glyph: String,
    pub toggle_visible_glyph: String,
    pub toggle_margin_left: String,

    pub ready_message: String,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            routines: Routines::default(),
            alert_selector: ".alert".to_owned(),
            alert_fade_delay_ms: 5000,
            alert_remove_delay_ms: 300,
            destructive_selector: ".btn-danger".to_owned(),
            destructive_match: DestructiveMatch::default(),
            confirm_message: "¿Estás seguro de que deseas eliminar este elemento?".to_owned(),
            form_selector: "form".to_owned(),
            required_selector: "[required]".to_owned(),
            invalid_border_color: "red".to_owned(),
            valid_border_color: "#ddd".to_owned(),
            required_alert_message: "Por favor completa todos los campos requeridos".to_owned(),
            busy_form_id: "activityForm".to_owned(),
            busy_button_selector: "button[type=\"submit\"]".to_owned(),
            busy_label: "Enviando...".to_owned(),
            counter_textarea_selector: "textarea".to_owned(),
            counter_suffix: "caracteres restantes".to_owned(),
            counter_color: "#666".to_owned(),
            nav_link_selector: ".nav-links a".to_owned(),
            anchor_selector: "a[href^=\"#\"]".to_owned(),
            password_selector: "input[type=\"password\"]".to_owned(),
            toggle_container_class: "form-group".to_owned(),
            toggle_hidden_glyph: "👁️".to_owned(),
            toggle_visible_glyph: "🙈".to_owned(),
            toggle_margin_left: "10px".to_owned(),
            ready_message: "✅ Plataforma Educativa cargada correctamente".to_owned(),
        }
    }
}

impl EnhancerConfig {
    pub fn validate(&self) -> EnhancerResult<()> {
        let selectors = [
            ("alert_selector", &self.alert_selector),
            ("destructive_selector", &self.destructive_selector),
            ("form_selector", &self.form_selector),
            ("required_selector", &self.required_selector),
            ("busy_button_selector", &self.busy_button_selector),
            ("counter_textarea_selector", &self.counter_textarea_selector),
            ("nav_link_selector", &self.nav_link_selector),
            ("anchor_selector", &self.anchor_selector),
            ("password_selector", &self.password_selector),
        ];
        if let Some((name, _)) = selectors
            .iter()
            .find(|(_, selector)| selector.trim().is_empty())
        {
            return Err(EnhancerError::new(
                "enhancer.invalid_config",
                format!("{name} must not be empty"),
            ));
        }

        if self.alert_fade_delay_ms == 0 {
            return Err(EnhancerError::new(
                "enhancer.invalid_config",
                "alert fade delay must be positive",
            ));
        }

        let marker = match &self.destructive_match {
            DestructiveMatch::TextContains(text) => text,
            DestructiveMatch::Attribute(name) => name,
        };
        if marker.is_empty() {
            return Err(EnhancerError::new(
                "enhancer.invalid_config",
                "destructive match marker must not be empty",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DestructiveMatch;
    use super::EnhancerConfig;

    #[test]
    fn default_config_is_valid() {
        let config = EnhancerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(
            config.destructive_match,
            DestructiveMatch::TextContains("Eliminar".to_owned())
        );
        assert!(config.routines.double_submit_guard);
    }

    #[test]
    fn rejects_blank_selectors_and_zero_fade_delay() {
        let config = EnhancerConfig {
            nav_link_selector: "  ".to_owned(),
            ..EnhancerConfig::default()
        };
        let error = config.validate().err();
        assert_eq!(error.as_ref().map(|e| e.code), Some("enhancer.invalid_config"));
        assert!(error.is_some_and(|e| e.message.contains("nav_link_selector")));

        let config = EnhancerConfig {
            alert_fade_delay_ms: 0,
            ..EnhancerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EnhancerConfig {
            destructive_match: DestructiveMatch::Attribute(String::new()),
            ..EnhancerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
