//! Scenario evaluation.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use edge_cache::{CacheControl, CacheDecision, MemoryCookieJar};
use edge_core::Response;
use serde::Serialize;

use super::EvaluateArgs;
use crate::context::Context;
use crate::output::state_badge;
use crate::scenario::Scenario;

/// Everything a scenario produced.
#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    pub decision: CacheDecision,
    pub can_inject_esi: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_tags: Option<String>,
    pub vary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred_to: Option<u64>,
    pub headers: BTreeMap<String, String>,
    pub set_cookies: Vec<String>,
}

/// Run the evaluate command.
pub fn run(args: EvaluateArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.scenario);
    tracing::debug!(scenario = %path.display(), "loading scenario");

    let scenario = Scenario::load(&path)?;
    let report = evaluate(&scenario, ctx)?;

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    print_report(&report, ctx);
    Ok(())
}

/// Replay a scenario through a fresh coordinator.
pub fn evaluate(scenario: &Scenario, ctx: &Context) -> Result<EvaluationReport> {
    let config = ctx.cache_config()?;
    let request = scenario.request()?;

    let mut control = CacheControl::new(config, &request);
    if let Some(ref base_url) = ctx.config.base_url {
        control = control.with_base_url(base_url.clone());
    }
    control.set_esi_request(scenario.esi_request);

    if let Some(ttl) = scenario.cacheable_ttl {
        control.mark_cacheable(ttl, "scenario");
    }
    if let Some(ref reason) = scenario.not_cacheable {
        control.mark_not_cacheable(reason, None);
    }
    control.add_cache_tags(scenario.cache_tags.iter().cloned());

    let element_tags = match scenario.layout {
        Some(ref layout) => {
            let mut tree = layout.build()?;
            let tags = control.element_cache_tags(&mut tree, &layout.root);
            control.add_cache_tags(tags.split(','));
            Some(tags)
        }
        None => None,
    };

    control.set_esi_on(scenario.esi_on);
    if !scenario.purge_tags.is_empty() {
        control.add_purge_tags(scenario.purge_tags.iter().cloned(), "scenario");
    }
    let can_inject_esi = control.can_inject_esi();

    let mut response = Response::new(scenario.status()?);
    if let Some(ref cache_control) = scenario.cache_control {
        if !response.set_header("Cache-Control", cache_control) {
            bail!("Invalid upstream Cache-Control: {:?}", cache_control);
        }
    }

    let mut jar = MemoryCookieJar::from_request(&request.cookies);
    let rendered = control.render_cache_control(&mut response, scenario.vary.clone(), &mut jar);
    control.render_purge(&mut response);
    tracing::debug!(
        state = %control.decision().state(),
        headers = response.headers.len(),
        "scenario evaluated"
    );

    Ok(EvaluationReport {
        decision: control.decision().clone(),
        can_inject_esi,
        element_tags,
        vary: rendered.vary.raw,
        deferred_to: rendered.deferred_to,
        headers: response.to_pairs().into_iter().collect(),
        set_cookies: jar.set_cookie_headers(),
    })
}

fn print_report(report: &EvaluationReport, ctx: &Context) {
    ctx.output.header("Decision");
    ctx.output
        .kv("state", &state_badge(&report.decision.state().to_string()));
    ctx.output.kv("ttl", &report.decision.ttl_secs().to_string());
    if !report.decision.reason().is_empty() {
        ctx.output.kv("reason", report.decision.reason());
    }
    ctx.output.kv("can inject esi", &report.can_inject_esi.to_string());
    if let Some(ref tags) = report.element_tags {
        ctx.output.kv("element tags", tags);
    }
    if !report.vary.is_empty() {
        ctx.output.kv("vary", &report.vary);
    }
    if let Some(max_age) = report.deferred_to {
        ctx.output.kv("deferred to upstream s-maxage", &max_age.to_string());
    }

    ctx.output.header("Headers");
    if report.headers.is_empty() {
        ctx.output.info("(none)");
    }
    for (name, value) in &report.headers {
        ctx.output.kv(name, value);
    }

    if !report.set_cookies.is_empty() {
        ctx.output.header("Set-Cookie");
        for cookie in &report.set_cookies {
            ctx.output.list_item(cookie);
        }
    }
}
