//! Pipeline Runner
//!
//! Executes the fixed, ordered step list over one request context.
//! The first [`StepOutcome::Terminate`] stops execution: no later step
//! runs and no later side effect happens. [`StepOutcome::Fatal`] is
//! logged and converted to a 5xx-class outcome.

use crate::context::RequestContext;
use crate::outcome::{PipelineOutcome, StepOutcome};
use crate::steps::{self, PipelineEnv};

type StepFn = fn(&mut RequestContext, &PipelineEnv) -> StepOutcome;

/// A named pipeline step
pub struct Step {
    /// Name used in logs and inspection
    pub name: &'static str,
    run: StepFn,
}

/// The ordered, short-circuiting preprocessing chain
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// The standard step order. Gates come after context assembly;
    /// within the gates, the exclusivity and ban decisions precede the
    /// generic join prompt (an ineligible or banned user must never see
    /// it) and the analytics pop runs last.
    pub fn standard() -> Self {
        Self {
            steps: vec![
                Step { name: "enforce_transport_security", run: steps::enforce_transport_security },
                Step { name: "consume_auth_token", run: steps::consume_auth_token },
                Step { name: "fetch_identity", run: steps::fetch_identity },
                Step { name: "resolve_tenant", run: steps::resolve_tenant },
                Step { name: "canonicalize_domain", run: steps::canonicalize_domain },
                Step { name: "fetch_membership", run: steps::fetch_membership },
                Step { name: "negotiate_locale", run: steps::negotiate_locale },
                Step { name: "generate_correlation_id", run: steps::generate_correlation_id },
                Step { name: "configure_mail_target", run: steps::configure_mail_target },
                Step { name: "fetch_plan_pricing", run: steps::fetch_plan_pricing },
                Step { name: "fetch_admin_status", run: steps::fetch_admin_status },
                Step { name: "fetch_plan_expiration", run: steps::fetch_plan_expiration },
                Step { name: "warn_missing_payment_info", run: steps::warn_missing_payment_info },
                Step { name: "gate_on_tenant_exclusivity", run: steps::gate_on_tenant_exclusivity },
                Step { name: "gate_on_membership", run: steps::gate_on_membership },
                Step { name: "gate_on_email_confirmation", run: steps::gate_on_email_confirmation },
                Step { name: "surface_analytics_event", run: steps::surface_analytics_event },
            ],
        }
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    /// Run the chain over one request
    pub fn run(&self, ctx: &mut RequestContext, env: &PipelineEnv) -> PipelineOutcome {
        for step in &self.steps {
            match (step.run)(ctx, env) {
                StepOutcome::Continue => {
                    tracing::trace!(step = step.name, "continue");
                }
                StepOutcome::Terminate(redirect) => {
                    tracing::debug!(
                        step = step.name,
                        status = redirect.status.as_u16(),
                        target = %redirect.target.path(),
                        "pipeline terminated"
                    );
                    return PipelineOutcome::Redirect(redirect);
                }
                StepOutcome::Fatal(error) => {
                    tracing::error!(step = step.name, error = %error, "pipeline failed");
                    return PipelineOutcome::ServerError(error);
                }
            }
        }
        PipelineOutcome::Proceed
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}
