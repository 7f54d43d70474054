//! Scripted interactions replayed against an enhanced page.

use pe_core::EnhancerError;
use pe_core::EnhancerResult;
use pe_dom::NodeId;
use pe_host::Page;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum Step {
    Click { selector: String },
    Submit { selector: String },
    Input { selector: String, value: String },
    /// Moves the virtual clock forward.
    Advance { ms: u64 },
    /// Answers the next confirm dialog.
    Confirm { accept: bool },
}

impl Scenario {
    pub(crate) fn from_json(text: &str) -> EnhancerResult<Self> {
        serde_json::from_str(text)
            .map_err(|error| EnhancerError::new("scenario.parse", error.to_string()))
    }

    pub(crate) fn replay(&self, page: &mut Page) -> EnhancerResult<()> {
        for (index, step) in self.steps.iter().enumerate() {
            debug!(index, ?step, "scenario step");
            match step {
                Step::Click { selector } => {
                    let target = resolve(page, selector)?;
                    let outcome = page.click(target)?;
                    debug!(index, ?outcome, "click finished");
                }
                Step::Submit { selector } => {
                    let form = resolve(page, selector)?;
                    let outcome = page.submit(form)?;
                    debug!(index, ?outcome, "submit finished");
                }
                Step::Input { selector, value } => {
                    let target = resolve(page, selector)?;
                    page.input(target, value)?;
                }
                Step::Advance { ms } => {
                    let ran = page.advance_time(*ms);
                    debug!(index, ran, "timers fired");
                }
                Step::Confirm { accept } => page.host_mut().queue_confirm_answer(*accept),
            }
        }
        Ok(())
    }
}

fn resolve(page: &Page, selector: &str) -> EnhancerResult<NodeId> {
    page.document()
        .query_selector(selector)?
        .ok_or_else(|| EnhancerError::new("scenario.no_match", format!("nothing matches `{selector}`")))
}
