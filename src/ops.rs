//! Aggregation operations.
//!
//! Every operation walks the same path: validate, consult the response
//! cache, run fetch branches (concurrently where independent), call the
//! completion service exactly once, normalize the output, attach
//! deterministic sources, cache the success. Branches an operation can
//! live without degrade to empty collections; synthesis and parse
//! failures always abort.
//!
//! | Operation | Fetch branches | Fetch failure | TTL |
//! |---|---|---|---|
//! | [`university_score`] | light snippets | surfaced | 12 h |
//! | [`profile_match`] | none | — | not cached |
//! | [`budget_info`] | living-cost threads | degraded | 24 h |
//! | [`overall_insight`] | university ∥ living-cost | degraded | 12 h |
//! | [`required_documents`] | none | — | 24 h |
//! | [`compare_universities`] | snippets per university | degraded | 12 h |

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::cache::{self, CacheEntry, ResponseCache};
use crate::completion::Synthesizer;
use crate::error::OpError;
use crate::normalize;
use crate::prompt;
use crate::reddit::{
    FetchError, ThreadSnippet, ThreadSource, ThreadSummary, DEFAULT_KEEP, SEARCH_WINDOW,
};
use crate::sources;
use crate::validate;

/// Shared dependencies for every operation.
pub struct OpContext {
    pub threads: Arc<dyn ThreadSource>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub cache: ResponseCache,
}

impl OpContext {
    pub fn new(
        threads: Arc<dyn ThreadSource>,
        synthesizer: Arc<dyn Synthesizer>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            threads,
            synthesizer,
            cache,
        }
    }
}

// ============ Request types ============

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityScoreRequest {
    pub name: Option<String>,
    pub country: Option<String>,
}

/// Free-text profile fields arrive as whatever JSON type the client
/// sent; the prompt layer renders them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMatchRequest {
    pub cgpa: Option<Value>,
    pub degree: Option<Value>,
    pub ielts: Option<Value>,
    pub budget: Option<Value>,
    pub country_preference: Option<Value>,
    pub need_scholarship: Option<bool>,
    pub want_pr: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInfoRequest {
    pub country: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallInsightRequest {
    pub university: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredDocumentsRequest {
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareUniversitiesRequest {
    pub universities: Option<Vec<String>>,
}

// ============ Operations ============

/// Score one university from light discussion snippets.
///
/// The single fetch is not degradable: the score depends on it, so a
/// failure surfaces as [`OpError::Fetch`].
pub async fn university_score(
    ctx: &OpContext,
    request: UniversityScoreRequest,
) -> Result<Value, OpError> {
    let name = validate::require_nonblank(request.name.as_deref(), "Missing university name")?;
    let country = validate::optional_trimmed(request.country.as_deref());

    let mut key_parts = vec!["university-score", name.as_str()];
    if let Some(country) = country.as_deref() {
        key_parts.push(country);
    }
    let key = cache::normalize_key(&key_parts);

    with_response_cache(ctx, key, cache::ttl::UNIVERSITY_SCORE, || {
        score_payload(ctx, &name, country.as_deref())
    })
    .await
}

async fn score_payload(
    ctx: &OpContext,
    name: &str,
    country: Option<&str>,
) -> Result<Value, OpError> {
    let query = review_query(name, country);
    let snippets = ctx
        .threads
        .light_snippets(&query, SEARCH_WINDOW, DEFAULT_KEEP)
        .await?;

    let raw = ctx
        .synthesizer
        .complete(&prompt::university_score(name, country, &snippets))
        .await?;
    let mut payload = normalize::parse_object(&raw)?;
    normalize::ensure_arrays(&mut payload, &["pros", "cons"]);
    // The request decides the country field, not the model.
    match country {
        Some(country) => {
            payload.insert("country".to_string(), json!(country));
        }
        None => {
            payload.remove("country");
        }
    }
    Ok(Value::Object(payload))
}

/// Recommend safe/moderate/ambitious options for a profile.
///
/// No fetches and no caching: answers are specific to one profile.
pub async fn profile_match(
    ctx: &OpContext,
    request: ProfileMatchRequest,
) -> Result<Value, OpError> {
    let raw = ctx
        .synthesizer
        .complete(&prompt::profile_match(&request))
        .await?;
    let mut payload = normalize::parse_object(&raw)?;
    normalize::normalize_profile_buckets(&mut payload);
    Ok(Value::Object(payload))
}

/// Cost overview for a country (optionally narrowed to a city).
pub async fn budget_info(ctx: &OpContext, request: BudgetInfoRequest) -> Result<Value, OpError> {
    let country = validate::require_nonblank(request.country.as_deref(), "Country is required")?;
    let city = validate::optional_trimmed(request.city.as_deref());
    let location_label = match city.as_deref() {
        Some(city) => format!("{city}, {country}"),
        None => country.clone(),
    };

    let mut key_parts = vec!["budget-info", country.as_str()];
    if let Some(city) = city.as_deref() {
        key_parts.push(city);
    }
    let key = cache::normalize_key(&key_parts);

    with_response_cache(ctx, key, cache::ttl::BUDGET, || {
        budget_payload(ctx, &country, &location_label)
    })
    .await
}

async fn budget_payload(
    ctx: &OpContext,
    country: &str,
    location_label: &str,
) -> Result<Value, OpError> {
    let threads = degraded(
        fetch_threads(ctx, &living_cost_query(location_label)).await,
        "living-cost",
    );

    let raw = ctx
        .synthesizer
        .complete(&prompt::budget_info(location_label, &threads))
        .await?;
    let mut payload = normalize::parse_object(&raw)?;
    normalize::ensure_nested_array(&mut payload, "living", "drivers");
    attach_sources(
        &mut payload,
        sources::budget_sources(country, location_label),
    );
    Ok(Value::Object(payload))
}

/// Compact worth-it verdict for a university in a country.
pub async fn overall_insight(
    ctx: &OpContext,
    request: OverallInsightRequest,
) -> Result<Value, OpError> {
    const MESSAGE: &str = "University and country are required";
    let university = validate::require_nonblank(request.university.as_deref(), MESSAGE)?;
    let country = validate::require_nonblank(request.country.as_deref(), MESSAGE)?;

    let key = cache::normalize_key(&["overall-insight", &university, &country]);
    with_response_cache(ctx, key, cache::ttl::OVERALL, || {
        overall_payload(ctx, &university, &country)
    })
    .await
}

async fn overall_payload(
    ctx: &OpContext,
    university: &str,
    country: &str,
) -> Result<Value, OpError> {
    let university_query = review_query(university, None);
    let living_query = living_cost_query(country);
    let (university_result, living_result) = tokio::join!(
        fetch_threads(ctx, &university_query),
        fetch_threads(ctx, &living_query),
    );
    let university_threads = degraded(university_result, "university");
    let living_cost_threads = degraded(living_result, "living-cost");

    let raw = ctx
        .synthesizer
        .complete(&prompt::overall_insight(
            university,
            country,
            &university_threads,
            &living_cost_threads,
        ))
        .await?;
    let mut payload = normalize::parse_object(&raw)?;
    normalize::ensure_array(&mut payload, "quickNotes");
    normalize::normalize_similar_universities(&mut payload, country);
    attach_sources(&mut payload, sources::overall_sources(university, country));
    Ok(Value::Object(payload))
}

/// Visa document checklist for a country. Knowledge-only: no fetches.
pub async fn required_documents(
    ctx: &OpContext,
    request: RequiredDocumentsRequest,
) -> Result<Value, OpError> {
    let country = validate::require_nonblank(request.country.as_deref(), "Country is required")?;
    let key = cache::normalize_key(&["required-documents", &country]);
    with_response_cache(ctx, key, cache::ttl::DOCUMENTS, || {
        documents_payload(ctx, &country)
    })
    .await
}

async fn documents_payload(ctx: &OpContext, country: &str) -> Result<Value, OpError> {
    let raw = ctx
        .synthesizer
        .complete(&prompt::required_documents(country))
        .await?;
    let mut payload = normalize::parse_object(&raw)?;
    normalize::ensure_arrays(&mut payload, &["documents", "importantNotes"]);
    normalize::ensure_object(&mut payload, "categories");
    attach_sources(&mut payload, sources::documents_sources(country));
    Ok(Value::Object(payload))
}

/// Side-by-side comparison of 2 to 3 universities.
pub async fn compare_universities(
    ctx: &OpContext,
    request: CompareUniversitiesRequest,
) -> Result<Value, OpError> {
    let raw_list = request.universities.unwrap_or_default();
    let universities = validate::comparison_list(&raw_list)?;

    let mut key_parts = vec!["compare-universities"];
    key_parts.extend(universities.iter().map(|u| u.as_str()));
    let key = cache::normalize_key(&key_parts);

    with_response_cache(ctx, key, cache::ttl::COMPARE, || {
        compare_payload(ctx, &universities)
    })
    .await
}

async fn compare_payload(ctx: &OpContext, universities: &[String]) -> Result<Value, OpError> {
    let snippet_futures = universities.iter().map(|university| async move {
        let result = ctx
            .threads
            .light_snippets(&review_query(university, None), SEARCH_WINDOW, DEFAULT_KEEP)
            .await;
        match result {
            Ok(snippets) => snippets,
            Err(err) => {
                tracing::warn!(university = %university, error = %err, "comparison fetch degraded to empty");
                Vec::new()
            }
        }
    });
    let all_snippets: Vec<Vec<ThreadSnippet>> = join_all(snippet_futures).await;

    let raw = ctx
        .synthesizer
        .complete(&prompt::compare_universities(universities, &all_snippets))
        .await?;
    let mut payload = normalize::parse_object(&raw)?;
    normalize::ensure_arrays(&mut payload, &["comparison", "comparisonPoints", "insights"]);
    attach_sources(&mut payload, sources::compare_sources(universities));
    Ok(Value::Object(payload))
}

// ============ Shared plumbing ============

/// Serve from cache when possible; otherwise produce, then cache the
/// success. Errors from `produce` are never written back.
async fn with_response_cache<F, Fut>(
    ctx: &OpContext,
    key: String,
    ttl_secs: u64,
    produce: F,
) -> Result<Value, OpError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, OpError>>,
{
    if let Some(entry) = ctx.cache.get(&key).await {
        return Ok(annotate_cached(entry));
    }
    let value = produce().await?;
    ctx.cache.set(&key, &value, ttl_secs).await;
    Ok(value)
}

/// Cached payloads carry their write time so clients can show staleness.
fn annotate_cached(entry: CacheEntry) -> Value {
    let mut value = entry.data;
    if let Value::Object(object) = &mut value {
        object.insert("cachedAt".to_string(), json!(entry.cached_at));
    }
    value
}

fn attach_sources(payload: &mut Map<String, Value>, links: Vec<sources::SourceLink>) {
    payload.insert(
        "sources".to_string(),
        serde_json::to_value(links).unwrap_or_default(),
    );
}

/// Search, then pull each kept listing's full thread concurrently.
/// Either stage failing fails the whole branch.
async fn fetch_threads(ctx: &OpContext, query: &str) -> Result<Vec<ThreadSummary>, FetchError> {
    let listings = ctx
        .threads
        .search_threads(query, SEARCH_WINDOW, DEFAULT_KEEP)
        .await?;
    let details = listings
        .iter()
        .map(|listing| ctx.threads.fetch_thread_detail(&listing.permalink));
    join_all(details).await.into_iter().collect()
}

/// Collapse a failed branch to empty, keeping the operation alive.
fn degraded<T>(result: Result<Vec<T>, FetchError>, branch: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(branch, error = %err, "fetch branch degraded to empty");
            Vec::new()
        }
    }
}

fn review_query(name: &str, country: Option<&str>) -> String {
    match country {
        Some(country) => format!("{name} {country} university student reviews"),
        None => format!("{name} university student reviews"),
    }
}

fn living_cost_query(location: &str) -> String {
    format!("{location} student living costs accommodation food monthly budget")
}
