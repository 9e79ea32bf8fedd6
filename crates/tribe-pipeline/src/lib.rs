//! OpenTribe Pipeline - per-request preprocessing for multi-tenant hosts
//!
//! Before any business handler runs, every inbound request walks a
//! fixed, ordered, short-circuiting chain: transport security, token
//! and session auth, tenant resolution, domain canonicalization,
//! membership lookup, locale negotiation, correlation id, billing
//! snapshot, and the access gates.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       PIPELINE RUNNER                          │
//! │                                                                │
//! │  request ─► ssl ─► token ─► identity ─► tenant ─► domain ─►   │
//! │  membership ─► locale ─► correlation ─► mail ─► billing ─►    │
//! │  gates (exclusivity │ ban │ join │ confirmation) ─► handler   │
//! │                                                                │
//! │  any step may terminate with a redirect; the rest never runs  │
//! └──────────────────────────┬─────────────────────────────────────┘
//!                            │
//!          ┌─────────────────▼──────────────────┐
//!          │          REQUEST CONTEXT           │
//!          │  tenant · user · membership ·      │
//!          │  locale · correlation id · mail    │
//!          └────────────────────────────────────┘
//! ```
//!
//! Collaborators (identity exchange, tenant directory, memberships,
//! translations, plan info, alerting, session store) are narrow traits;
//! in-memory implementations ship for embedded hosts and tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod event;
pub mod model;
pub mod outcome;
pub mod runner;
pub mod services;
pub mod session;
pub mod steps;

pub use context::{MailTarget, RequestContext, RequestInfo};
pub use event::CorrelationId;
pub use model::{Membership, MembershipStatus, User, UserId};
pub use outcome::{PipelineOutcome, Redirect, RedirectStatus, RedirectTarget, StepOutcome};
pub use runner::{Pipeline, Step};
pub use services::{
    IdentityError, IdentityService, MembershipReader, NotificationSink, PlanInfoProvider,
};
pub use session::{FlashKind, FlashMessage, SessionStore};
pub use steps::PipelineEnv;
