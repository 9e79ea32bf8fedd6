//! Pipeline Steps
//!
//! Each step is a plain function over (context, environment) returning
//! a [`StepOutcome`]. Steps never touch shared state except through the
//! environment's collaborators, so every one of them is testable
//! against a context snapshot in isolation.

use crate::context::{MailTarget, RequestContext};
use crate::event::CorrelationId;
use crate::outcome::{Redirect, RedirectTarget, StepOutcome};
use crate::services::{
    IdentityError, IdentityService, MembershipReader, NotificationSink, PlanInfoProvider,
};
use crate::session::{FlashMessage, SessionStore};
use chrono::Utc;
use std::sync::Arc;
use tribe_common::{AppConfig, GateError, Timestamp};
use tribe_tenant::locale as locale_negotiation;
use tribe_tenant::{resolver, BundleCache, TenantDirectory, TranslationService, UnresolvedHost};

/// Collaborators and shared caches the steps run against.
/// Session is per-request; everything else is shared across requests.
pub struct PipelineEnv {
    /// Platform configuration
    pub config: Arc<AppConfig>,
    /// Tenant directory, refreshed out-of-band
    pub directory: Arc<dyn TenantDirectory>,
    /// Identity exchange and lookup
    pub identity: Arc<dyn IdentityService>,
    /// Membership query collaborator
    pub memberships: Arc<dyn MembershipReader>,
    /// Tenant translation override source
    pub translations: Arc<dyn TranslationService>,
    /// Plan/billing facts
    pub plans: Arc<dyn PlanInfoProvider>,
    /// Operator alert sink
    pub notifier: Arc<dyn NotificationSink>,
    /// Process-wide translation bundle cache
    pub bundles: Arc<BundleCache>,
    /// Session store of the requesting client
    pub session: Arc<dyn SessionStore>,
}

/// Query parameter carrying a one-time login token
pub const AUTH_TOKEN_PARAM: &str = "auth";
/// Query parameter carrying an invitation code
pub const INVITATION_CODE_PARAM: &str = "code";
/// Query parameter carrying an explicit locale request
pub const LOCALE_PARAM: &str = "locale";

/// Paths the membership and confirmation gates must let through so the
/// confirmation flow itself stays reachable
const GATE_EXEMPT_PATHS: [&str; 2] = [
    "/sessions/confirmation_pending",
    "/people/check_email_availability",
];

/// Confirmation-flow endpoints (the confirmation gate must not bounce
/// the user out of the flow that resolves it)
const CONFIRMATION_FLOW_PREFIX: &str = "/confirmations";

fn is_gate_exempt(path: &str) -> bool {
    GATE_EXEMPT_PATHS.contains(&path)
}

/// Redirect plain-HTTP traffic to HTTPS when the installation demands
/// it. Requests already terminated upstream (platform proxy) and the
/// robots endpoint are exempt.
pub fn enforce_transport_security(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    if !env.config.always_use_ssl || ctx.request.secure {
        return StepOutcome::Continue;
    }
    if let Some(via) = &ctx.request.via {
        if via.contains(&env.config.proxy_via_token) {
            return StepOutcome::Continue;
        }
    }
    if ctx.request.path == "/robots.txt" {
        return StepOutcome::Continue;
    }

    let url = format!("https://{}{}", ctx.request.host, ctx.request.full_path());
    StepOutcome::Terminate(Redirect::found(RedirectTarget::Url(url)))
}

/// Exchange a one-time login token for a session identity, then bounce
/// to the same path with the token stripped so it cannot be replayed or
/// leak through links and referrers.
pub fn consume_auth_token(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    let Some(token) = ctx.request.query_param(AUTH_TOKEN_PARAM) else {
        return StepOutcome::Continue;
    };

    match env.identity.consume_login_token(token) {
        Ok(Some(user_id)) => {
            env.session.set_identity(user_id);
            tracing::info!(user = %user_id, "login token consumed");
            let path = ctx.request.full_path_without_param(AUTH_TOKEN_PARAM);
            StepOutcome::Terminate(Redirect::found(RedirectTarget::Url(path)))
        }
        Ok(None) => StepOutcome::Continue,
        Err(e) => StepOutcome::Fatal(GateError::IdentityService(e.to_string())),
    }
}

/// Resolve the session identity into a user on the context
pub fn fetch_identity(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    let Some(user_id) = env.session.identity() else {
        return StepOutcome::Continue;
    };

    match env.identity.find_user(&user_id) {
        Ok(Some(user)) => {
            ctx.user = Some(user);
            StepOutcome::Continue
        }
        Ok(None) => StepOutcome::Continue,
        Err(IdentityError::Unauthorized) => session_unauthorized(ctx, env),
        Err(e) => StepOutcome::Fatal(GateError::IdentityService(e.to_string())),
    }
}

/// Upstream reported the session itself unauthorized: recover by
/// clearing it, telling the user and the operators, and bouncing home.
fn session_unauthorized(ctx: &RequestContext, env: &PipelineEnv) -> StepOutcome {
    env.session.clear_identity();
    env.session
        .push_flash(FlashMessage::error("layouts.notifications.error_with_session"));
    env.notifier.notify(
        "Upstream session unauthorized",
        "Session was unauthorized upstream. Normal if it just expired; \
         frequent occurrences mean something is wrong.",
        serde_json::json!({
            "host": ctx.request.host,
            "path": ctx.request.full_path(),
        }),
    );
    tracing::warn!(host = %ctx.request.host, "session invalidated upstream");
    StepOutcome::Terminate(Redirect::found(RedirectTarget::TenantRoot))
}

/// Walk the resolution ladder for the request host
pub fn resolve_tenant(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    let root_domain = env.config.root_domain_without_port();
    match resolver::resolve(env.directory.as_ref(), root_domain, &ctx.request.host) {
        Some(tenant) => {
            tracing::debug!(tenant = %tenant.ident, host = %ctx.request.host, "tenant resolved");
            ctx.tenant = Some(tenant);
            StepOutcome::Continue
        }
        None => {
            let target = match resolver::unresolved_target(
                env.directory.as_ref(),
                env.config.tenant_not_found_redirect.as_deref(),
            ) {
                UnresolvedHost::Redirect(url) => RedirectTarget::Url(url),
                UnresolvedHost::CreateTenant => RedirectTarget::CreateTenant,
                UnresolvedHost::NotFound => RedirectTarget::TenantNotFound,
            };
            StepOutcome::Terminate(Redirect::found(target))
        }
    }
}

/// Permanently redirect to the tenant's canonical domain when the
/// request arrived on an alias
pub fn canonicalize_domain(ctx: &mut RequestContext, _env: &PipelineEnv) -> StepOutcome {
    let Some(tenant) = &ctx.tenant else {
        return StepOutcome::Continue;
    };

    match resolver::canonical_redirect_domain(tenant, &ctx.request.host) {
        Some(domain) => {
            let url = format!(
                "{}://{}{}",
                ctx.request.scheme(),
                domain,
                ctx.request.full_path()
            );
            StepOutcome::Terminate(Redirect::permanent(RedirectTarget::Url(url)))
        }
        None => StepOutcome::Continue,
    }
}

/// Load the user's accepted membership and record the page load
/// out-of-band at most once per day
pub fn fetch_membership(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    let (Some(user), Some(tenant)) = (&ctx.user, &ctx.tenant) else {
        return StepOutcome::Continue;
    };

    if let Some(membership) = env
        .memberships
        .find_accepted(&user.user_id, &tenant.tenant_id)
    {
        let today = Utc::now().date_naive();
        if membership.last_page_load != Some(today) {
            // Fire-and-forget; the collaborator owns delivery.
            env.memberships
                .record_page_load(membership.membership_id, &ctx.request.host);
        }
        ctx.membership = Some(membership);
    }
    StepOutcome::Continue
}

/// Negotiate the working locale, load the tenant's translation bundle
/// into the shared cache, and remember the locale-scoped customization
pub fn negotiate_locale(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    if let Some(tenant) = &ctx.tenant {
        let result = if env.config.refresh_translations_per_request {
            env.bundles
                .refresh(tenant.tenant_id, env.translations.as_ref())
        } else {
            env.bundles
                .get_or_fetch(tenant.tenant_id, env.translations.as_ref())
        };
        if let Err(e) = result {
            return StepOutcome::Fatal(e);
        }
    }

    let user_locale = ctx.user.as_ref().and_then(|u| u.locale.as_deref());
    let param_locale = ctx.request.query_param(LOCALE_PARAM);

    let locale = match locale_negotiation::negotiate(
        user_locale,
        param_locale,
        ctx.tenant.as_ref(),
        &env.config.available_locales,
    ) {
        Ok(locale) => locale,
        Err(e) => return StepOutcome::Fatal(e),
    };

    ctx.customization = ctx
        .tenant
        .as_ref()
        .and_then(|t| t.customization_for(&locale).cloned());
    ctx.return_to = Some(return_to_after_locale_change(
        &ctx.request.full_path(),
        param_locale,
    ));
    ctx.locale = Some(locale);
    StepOutcome::Continue
}

/// Path the client should come back to after switching locale: the
/// current full path with the locale segment removed
fn return_to_after_locale_change(full_path: &str, locale_param: Option<&str>) -> String {
    let mut path = full_path.to_string();
    if let Some(locale) = locale_param {
        let segment = format!("/{locale}");
        if let Some(pos) = path.find(&segment) {
            path.replace_range(pos..pos + segment.len(), "");
        }
    }
    path.strip_prefix('/').unwrap_or(&path).to_string()
}

/// Stamp the context with its correlation id
pub fn generate_correlation_id(ctx: &mut RequestContext, _env: &PipelineEnv) -> StepOutcome {
    ctx.correlation_id = Some(CorrelationId::generate(&ctx.request, Timestamp::now()));
    StepOutcome::Continue
}

/// Decide where mail generated during this request should link: the
/// tenant's own domain, or `www.{root domain}` when no tenant resolved
pub fn configure_mail_target(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    let host = match &ctx.tenant {
        Some(tenant) => tenant.full_domain(env.config.root_domain_without_port()),
        None => format!("www.{}", env.config.root_domain_without_port()),
    };
    ctx.mail_target = Some(MailTarget {
        host,
        secure: env.config.always_use_ssl,
    });
    StepOutcome::Continue
}

/// Surface the promotional plan pricing snapshot to the views
pub fn fetch_plan_pricing(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    ctx.plan_pricing = Some(env.config.plan_pricing.clone());
    StepOutcome::Continue
}

/// Flag whether the current user administers the current tenant
pub fn fetch_admin_status(ctx: &mut RequestContext, _env: &PipelineEnv) -> StepOutcome {
    ctx.is_admin = match (&ctx.user, &ctx.tenant) {
        (Some(user), Some(tenant)) => user.has_admin_rights_in(&tenant.tenant_id),
        _ => false,
    };
    StepOutcome::Continue
}

/// Flag whether the tenant's plan has expired
pub fn fetch_plan_expiration(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    if let Some(tenant) = &ctx.tenant {
        ctx.plan_expired = env.plans.is_plan_expired(&tenant.tenant_id);
    }
    StepOutcome::Continue
}

/// Warn (on this response only) when the user has open listings whose
/// payment details are incomplete
pub fn warn_missing_payment_info(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    let (Some(user), Some(tenant)) = (&ctx.user, &ctx.tenant) else {
        return StepOutcome::Continue;
    };

    if env
        .plans
        .has_missing_payment_info(&user.user_id, &tenant.tenant_id)
    {
        ctx.flash_now
            .push(FlashMessage::warning("payments.missing_payment_info"));
    }
    StepOutcome::Continue
}

/// Send signed-in non-members to the ban page or the join form.
/// Ban is checked first: a banned user must never see the join prompt.
pub fn gate_on_membership(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    if is_gate_exempt(&ctx.request.path) {
        return StepOutcome::Continue;
    }
    let Some(user) = &ctx.user else {
        return StepOutcome::Continue;
    };
    if ctx.membership.is_some() || user.admin {
        return StepOutcome::Continue;
    }

    if let Some(tenant) = &ctx.tenant {
        if user.is_banned_in(&tenant.tenant_id) {
            env.session.keep_flash();
            return StepOutcome::Terminate(Redirect::found(RedirectTarget::BannedAccess));
        }
    }

    if let Some(code) = ctx.request.query_param(INVITATION_CODE_PARAM) {
        env.session.set_invitation_code(code);
    }
    env.session.keep_flash();
    StepOutcome::Terminate(Redirect::found(RedirectTarget::JoinTenant))
}

/// Organizations-only tenants sign private accounts out entirely
pub fn gate_on_tenant_exclusivity(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    let (Some(user), Some(tenant)) = (&ctx.user, &ctx.tenant) else {
        return StepOutcome::Continue;
    };

    if tenant.only_organizations && !user.organization {
        env.session.clear_identity();
        env.session.push_flash(FlashMessage::warning(
            "layouts.notifications.can_not_login_with_private_user",
        ));
        ctx.user = None;
        return StepOutcome::Terminate(Redirect::found(RedirectTarget::Login));
    }
    StepOutcome::Continue
}

/// Hold members with a pending required email confirmation at the
/// announcement page, while letting the confirmation flow itself pass
pub fn gate_on_email_confirmation(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    if is_gate_exempt(&ctx.request.path)
        || ctx.request.path.starts_with(CONFIRMATION_FLOW_PREFIX)
    {
        return StepOutcome::Continue;
    }
    let (Some(user), Some(tenant)) = (&ctx.user, &ctx.tenant) else {
        return StepOutcome::Continue;
    };

    if user.pending_email_confirmation_in(&tenant.tenant_id) {
        env.session.push_flash(FlashMessage::warning(
            "layouts.notifications.you_need_to_confirm_your_account_first",
        ));
        return StepOutcome::Terminate(Redirect::found(RedirectTarget::ConfirmationPending));
    }
    StepOutcome::Continue
}

/// Pop a parked analytics event off the session for the frontend.
/// Runs last so an earlier termination leaves the event parked.
pub fn surface_analytics_event(ctx: &mut RequestContext, env: &PipelineEnv) -> StepOutcome {
    ctx.analytics_event = env.session.take_analytics_event();
    StepOutcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestInfo;
    use crate::model::{Membership, User};
    use crate::services::{MemoryIdentity, MemoryMemberships, MemorySink, StaticPlanInfo};
    use crate::session::MemorySession;
    use tribe_tenant::{InMemoryDirectory, StaticTranslations, Tenant};

    struct TestEnv {
        env: PipelineEnv,
        session: Arc<MemorySession>,
        identity: Arc<MemoryIdentity>,
        memberships: Arc<MemoryMemberships>,
        plans: Arc<StaticPlanInfo>,
        sink: Arc<MemorySink>,
        directory: Arc<InMemoryDirectory>,
    }

    fn test_env(config: AppConfig) -> TestEnv {
        let session = Arc::new(MemorySession::new());
        let identity = Arc::new(MemoryIdentity::new());
        let memberships = Arc::new(MemoryMemberships::new());
        let plans = Arc::new(StaticPlanInfo::new());
        let sink = Arc::new(MemorySink::new());
        let directory = Arc::new(InMemoryDirectory::new());

        let env = PipelineEnv {
            config: Arc::new(config),
            directory: directory.clone(),
            identity: identity.clone(),
            memberships: memberships.clone(),
            translations: Arc::new(StaticTranslations::new()),
            plans: plans.clone(),
            notifier: sink.clone(),
            bundles: Arc::new(BundleCache::new()),
            session: session.clone(),
        };

        TestEnv {
            env,
            session,
            identity,
            memberships,
            plans,
            sink,
            directory,
        }
    }

    fn default_config() -> AppConfig {
        AppConfig {
            root_domain: "example.com".to_string(),
            available_locales: vec!["en".into(), "es".into()],
            ..AppConfig::default()
        }
    }

    fn ctx(request: RequestInfo) -> RequestContext {
        RequestContext::new(request)
    }

    fn assert_terminates(outcome: StepOutcome, target: RedirectTarget) {
        match outcome {
            StepOutcome::Terminate(redirect) => assert_eq!(redirect.target, target),
            other => panic!("expected terminate, got {other:?}"),
        }
    }

    #[test]
    fn test_ssl_redirect_and_exemptions() {
        let t = test_env(AppConfig {
            always_use_ssl: true,
            ..default_config()
        });

        let mut plain = ctx(RequestInfo::new("sub.example.com", "/listings").with_param("page", "2"));
        assert_terminates(
            enforce_transport_security(&mut plain, &t.env),
            RedirectTarget::Url("https://sub.example.com/listings?page=2".into()),
        );

        let mut tls = ctx(RequestInfo::new("sub.example.com", "/listings").over_tls());
        assert!(matches!(
            enforce_transport_security(&mut tls, &t.env),
            StepOutcome::Continue
        ));

        let mut proxied =
            ctx(RequestInfo::new("sub.example.com", "/listings").with_via("1.1 tribe_proxy"));
        assert!(matches!(
            enforce_transport_security(&mut proxied, &t.env),
            StepOutcome::Continue
        ));

        let mut robots = ctx(RequestInfo::new("sub.example.com", "/robots.txt"));
        assert!(matches!(
            enforce_transport_security(&mut robots, &t.env),
            StepOutcome::Continue
        ));
    }

    #[test]
    fn test_token_consumption_strips_param_and_signs_in() {
        let t = test_env(default_config());
        let user = User::new();
        let user_id = user.user_id;
        t.identity.add_user(user);
        t.identity.issue_token("tok123", user_id);

        let mut c = ctx(RequestInfo::new("sub.example.com", "/listings")
            .with_param("auth", "tok123")
            .with_param("page", "2"));

        assert_terminates(
            consume_auth_token(&mut c, &t.env),
            RedirectTarget::Url("/listings?page=2".into()),
        );
        assert_eq!(t.session.identity(), Some(user_id));

        // The exchange consumed the token: replaying the old URL does
        // not redirect again
        let mut replay = ctx(RequestInfo::new("sub.example.com", "/listings")
            .with_param("auth", "tok123"));
        assert!(matches!(
            consume_auth_token(&mut replay, &t.env),
            StepOutcome::Continue
        ));
    }

    #[test]
    fn test_fetch_identity_resolves_session_user() {
        let t = test_env(default_config());
        let user = User::new().with_locale("es");
        let user_id = user.user_id;
        t.identity.add_user(user);
        t.session.set_identity(user_id);

        let mut c = ctx(RequestInfo::new("sub.example.com", "/"));
        assert!(matches!(fetch_identity(&mut c, &t.env), StepOutcome::Continue));
        assert_eq!(c.user.as_ref().map(|u| u.user_id), Some(user_id));
    }

    #[test]
    fn test_unauthorized_session_is_recovered() {
        let t = test_env(default_config());
        let user = User::new();
        let user_id = user.user_id;
        t.identity.add_user(user);
        t.session.set_identity(user_id);
        t.identity.revoke_sessions(user_id);

        let mut c = ctx(RequestInfo::new("sub.example.com", "/listings"));
        assert_terminates(fetch_identity(&mut c, &t.env), RedirectTarget::TenantRoot);

        assert!(t.session.identity().is_none());
        assert_eq!(t.sink.alerts().len(), 1);

        t.session.rotate_flash();
        assert_eq!(
            t.session.current_flash(),
            vec![FlashMessage::error("layouts.notifications.error_with_session")]
        );
    }

    #[test]
    fn test_resolve_tenant_via_ident() {
        let t = test_env(default_config());
        t.directory.insert(Tenant::new("sub", "en"));
        t.directory.insert(Tenant::new("other", "en"));

        let mut c = ctx(RequestInfo::new("sub.example.com", "/"));
        assert!(matches!(resolve_tenant(&mut c, &t.env), StepOutcome::Continue));
        assert_eq!(c.tenant.as_ref().unwrap().ident, "sub");
    }

    #[test]
    fn test_unresolved_empty_directory_goes_to_creation() {
        let t = test_env(default_config());
        let mut c = ctx(RequestInfo::new("nowhere.example.com", "/"));
        assert_terminates(resolve_tenant(&mut c, &t.env), RedirectTarget::CreateTenant);
    }

    #[test]
    fn test_canonicalization_is_permanent() {
        let t = test_env(default_config());
        let mut c = ctx(RequestInfo::new("sub.example.com", "/listings"));
        c.tenant = Some(Tenant::new("sub", "en").with_domain("market.example.com"));

        match canonicalize_domain(&mut c, &t.env) {
            StepOutcome::Terminate(redirect) => {
                assert_eq!(redirect.status.as_u16(), 301);
                assert_eq!(
                    redirect.target,
                    RedirectTarget::Url("http://market.example.com/listings".into())
                );
            }
            other => panic!("expected terminate, got {other:?}"),
        }
    }

    #[test]
    fn test_membership_fetch_records_page_load_once_per_day() {
        let t = test_env(default_config());
        let tenant = Tenant::new("sub", "en");
        let user = User::new();
        t.memberships
            .add(Membership::accepted(user.user_id, tenant.tenant_id));

        let mut c = ctx(RequestInfo::new("sub.example.com", "/"));
        c.tenant = Some(tenant.clone());
        c.user = Some(user.clone());

        fetch_membership(&mut c, &t.env);
        assert!(c.membership.is_some());
        assert_eq!(t.memberships.recorded_page_loads().len(), 1);

        // Same day again: no second record
        let mut again = ctx(RequestInfo::new("sub.example.com", "/"));
        again.tenant = Some(tenant);
        again.user = Some(user);
        fetch_membership(&mut again, &t.env);
        assert_eq!(t.memberships.recorded_page_loads().len(), 1);
    }

    #[test]
    fn test_locale_negotiation_scenario() {
        // user fr, tenant {en, es}, param es => es
        let t = test_env(default_config());
        let mut c = ctx(RequestInfo::new("sub.example.com", "/").with_param("locale", "es"));
        c.tenant =
            Some(Tenant::new("sub", "en").with_locales(vec!["en".into(), "es".into()]));
        c.user = Some(User::new().with_locale("fr"));

        assert!(matches!(negotiate_locale(&mut c, &t.env), StepOutcome::Continue));
        assert_eq!(c.locale.as_deref(), Some("es"));
    }

    #[test]
    fn test_unavailable_locale_is_fatal() {
        let t = test_env(default_config());
        let mut c = ctx(RequestInfo::new("sub.example.com", "/"));
        c.tenant = Some(Tenant::new("sub", "sv").with_locales(vec!["sv".into()]));

        assert!(matches!(
            negotiate_locale(&mut c, &t.env),
            StepOutcome::Fatal(GateError::LocaleNotAvailable(_))
        ));
        assert!(c.locale.is_none());
    }

    #[test]
    fn test_return_to_strips_locale_segment() {
        assert_eq!(
            return_to_after_locale_change("/es/listings?locale=es", Some("es")),
            "listings?locale=es"
        );
        assert_eq!(return_to_after_locale_change("/listings", None), "listings");
    }

    #[test]
    fn test_mail_target_prefers_tenant_domain() {
        let t = test_env(AppConfig {
            always_use_ssl: true,
            ..default_config()
        });

        let mut with_tenant = ctx(RequestInfo::new("sub.example.com", "/"));
        with_tenant.tenant = Some(Tenant::new("sub", "en").with_domain("market.example.com"));
        configure_mail_target(&mut with_tenant, &t.env);
        assert_eq!(
            with_tenant.mail_target,
            Some(MailTarget {
                host: "market.example.com".into(),
                secure: true
            })
        );

        let mut bare = ctx(RequestInfo::new("unknown.example.com", "/"));
        configure_mail_target(&mut bare, &t.env);
        assert_eq!(bare.mail_target.unwrap().host, "www.example.com");
    }

    #[test]
    fn test_admin_and_plan_flags() {
        let t = test_env(default_config());
        let tenant = Tenant::new("sub", "en");
        t.plans.expire(tenant.tenant_id);

        let mut c = ctx(RequestInfo::new("sub.example.com", "/"));
        c.user = Some(User::new().admin_of(tenant.tenant_id));
        c.tenant = Some(tenant);

        fetch_admin_status(&mut c, &t.env);
        fetch_plan_expiration(&mut c, &t.env);

        assert!(c.is_admin);
        assert!(c.plan_expired);
    }

    #[test]
    fn test_payment_warning_is_flash_now() {
        let t = test_env(default_config());
        let tenant = Tenant::new("sub", "en");
        let user = User::new();
        t.plans.mark_missing_payment(user.user_id, tenant.tenant_id);

        let mut c = ctx(RequestInfo::new("sub.example.com", "/"));
        c.user = Some(user);
        c.tenant = Some(tenant);

        warn_missing_payment_info(&mut c, &t.env);
        assert_eq!(c.flash_now.len(), 1);
        // Not queued in the session: it must not survive a redirect
        t.session.rotate_flash();
        assert!(t.session.current_flash().is_empty());
    }

    #[test]
    fn test_banned_user_never_sees_join_prompt() {
        let t = test_env(default_config());
        let tenant = Tenant::new("sub", "en");
        // Banned AND without membership: ban must win
        let user = User::new().banned_in_tenant(tenant.tenant_id);

        let mut c = ctx(RequestInfo::new("sub.example.com", "/").with_param("code", "WELCOME"));
        c.user = Some(user);
        c.tenant = Some(tenant);

        assert_terminates(gate_on_membership(&mut c, &t.env), RedirectTarget::BannedAccess);
        // The invitation code is not persisted for banned users
        assert!(t.session.take_invitation_code().is_none());
    }

    #[test]
    fn test_join_redirect_persists_invitation_code() {
        let t = test_env(default_config());
        let mut c = ctx(RequestInfo::new("sub.example.com", "/").with_param("code", "WELCOME"));
        c.user = Some(User::new());
        c.tenant = Some(Tenant::new("sub", "en"));

        assert_terminates(gate_on_membership(&mut c, &t.env), RedirectTarget::JoinTenant);
        assert_eq!(t.session.take_invitation_code().as_deref(), Some("WELCOME"));
    }

    #[test]
    fn test_members_admins_and_anonymous_pass_the_join_gate() {
        let t = test_env(default_config());
        let tenant = Tenant::new("sub", "en");

        let mut anonymous = ctx(RequestInfo::new("sub.example.com", "/"));
        anonymous.tenant = Some(tenant.clone());
        assert!(matches!(
            gate_on_membership(&mut anonymous, &t.env),
            StepOutcome::Continue
        ));

        let mut admin = ctx(RequestInfo::new("sub.example.com", "/"));
        admin.tenant = Some(tenant.clone());
        admin.user = Some(User::new().as_admin());
        assert!(matches!(
            gate_on_membership(&mut admin, &t.env),
            StepOutcome::Continue
        ));

        let member = User::new();
        let mut with_membership = ctx(RequestInfo::new("sub.example.com", "/"));
        with_membership.membership =
            Some(Membership::accepted(member.user_id, tenant.tenant_id));
        with_membership.user = Some(member);
        with_membership.tenant = Some(tenant);
        assert!(matches!(
            gate_on_membership(&mut with_membership, &t.env),
            StepOutcome::Continue
        ));
    }

    #[test]
    fn test_exclusivity_violation_signs_out() {
        let t = test_env(default_config());
        let user = User::new();
        t.session.set_identity(user.user_id);

        let mut c = ctx(RequestInfo::new("sub.example.com", "/"));
        c.tenant = Some(Tenant::new("sub", "en").organizations_only());
        c.user = Some(user);

        assert_terminates(gate_on_tenant_exclusivity(&mut c, &t.env), RedirectTarget::Login);
        assert!(t.session.identity().is_none());
        assert!(c.user.is_none());

        // Organizations stay signed in
        let mut org = ctx(RequestInfo::new("sub.example.com", "/"));
        org.tenant = Some(Tenant::new("sub", "en").organizations_only());
        org.user = Some(User::new().as_organization());
        assert!(matches!(
            gate_on_tenant_exclusivity(&mut org, &t.env),
            StepOutcome::Continue
        ));
    }

    #[test]
    fn test_confirmation_gate_and_exemptions() {
        let t = test_env(default_config());
        let tenant = Tenant::new("sub", "en");
        let user = User::new().pending_confirmation(tenant.tenant_id);

        let mut c = ctx(RequestInfo::new("sub.example.com", "/listings"));
        c.tenant = Some(tenant.clone());
        c.user = Some(user.clone());
        assert_terminates(
            gate_on_email_confirmation(&mut c, &t.env),
            RedirectTarget::ConfirmationPending,
        );

        // The confirmation flow itself passes
        let mut flow = ctx(RequestInfo::new("sub.example.com", "/confirmations/abc"));
        flow.tenant = Some(tenant.clone());
        flow.user = Some(user.clone());
        assert!(matches!(
            gate_on_email_confirmation(&mut flow, &t.env),
            StepOutcome::Continue
        ));

        // So does the announcement page
        let mut pending = ctx(RequestInfo::new(
            "sub.example.com",
            "/sessions/confirmation_pending",
        ));
        pending.tenant = Some(tenant);
        pending.user = Some(user);
        assert!(matches!(
            gate_on_email_confirmation(&mut pending, &t.env),
            StepOutcome::Continue
        ));
    }

    #[test]
    fn test_analytics_event_popped_once() {
        let t = test_env(default_config());
        t.session
            .set_analytics_event(serde_json::json!(["event", "signup"]));

        let mut c = ctx(RequestInfo::new("sub.example.com", "/"));
        surface_analytics_event(&mut c, &t.env);
        assert_eq!(c.analytics_event, Some(serde_json::json!(["event", "signup"])));

        let mut next = ctx(RequestInfo::new("sub.example.com", "/"));
        surface_analytics_event(&mut next, &t.env);
        assert!(next.analytics_event.is_none());
    }
}
