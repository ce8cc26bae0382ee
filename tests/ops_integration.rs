//! Integration tests for the aggregation operations and HTTP surface.
//!
//! These tests drive the real orchestration path (validation, cache,
//! fetch fan-out, synthesis, normalization, sources) over stub thread
//! and completion sources, so every behavior here runs without network.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uniscope::cache::{MemoryBackend, ResponseCache};
use uniscope::completion::{CompletionError, SynthesisRequest, Synthesizer};
use uniscope::config::Config;
use uniscope::error::OpError;
use uniscope::ops::{self, OpContext};
use uniscope::reddit::{
    FetchError, RecencyWindow, ThreadListing, ThreadSnippet, ThreadSource, ThreadSummary,
};
use uniscope::server::run_server_with_ops;

// ─── Stub thread source ─────────────────────────────────────────────

/// Deterministic [`ThreadSource`] whose payloads embed the query, so
/// captured prompts prove which fetches fed the model.
struct StubThreads {
    fail_when_query_contains: Option<String>,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl StubThreads {
    fn new() -> Self {
        Self {
            fail_when_query_contains: None,
            search_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        }
    }

    /// Fail any search whose query contains `pattern`; other branches
    /// keep working.
    fn failing_when(pattern: &str) -> Self {
        Self {
            fail_when_query_contains: Some(pattern.to_string()),
            ..Self::new()
        }
    }

    fn check(&self, query: &str) -> Result<(), FetchError> {
        if let Some(pattern) = &self.fail_when_query_contains {
            if query.contains(pattern) {
                return Err(FetchError::Status(503));
            }
        }
        Ok(())
    }

    fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn detail_count(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThreadSource for StubThreads {
    async fn search_threads(
        &self,
        query: &str,
        _window: RecencyWindow,
        keep: usize,
    ) -> Result<Vec<ThreadListing>, FetchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check(query)?;
        Ok((0..keep.min(2))
            .map(|i| ThreadListing {
                title: format!("Thread {i} about {query}"),
                permalink: format!("/r/studyabroad/{i}"),
                self_text: format!("selftext {i} about {query}"),
                score: Some(10 + i as i64),
                subreddit: Some("studyAbroad".to_string()),
                created_at_epoch_seconds: Some(1_700_000_000),
            })
            .collect())
    }

    async fn fetch_thread_detail(&self, permalink: &str) -> Result<ThreadSummary, FetchError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ThreadSummary {
            title: format!("Detail for {permalink}"),
            body_text: "post body".to_string(),
            url: format!("https://www.reddit.com{permalink}"),
            score: Some(12),
            comment_count: Some(4),
            created_at_epoch_seconds: Some(1_700_000_000),
            subreddit: Some("studyAbroad".to_string()),
            top_comments_text: "first reply\n\nsecond reply".to_string(),
        })
    }

    async fn light_snippets(
        &self,
        query: &str,
        _window: RecencyWindow,
        keep: usize,
    ) -> Result<Vec<ThreadSnippet>, FetchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check(query)?;
        Ok((0..keep.min(2))
            .map(|i| ThreadSnippet {
                title: format!("Snippet {i} about {query}"),
                snippet: format!("students discussing {query}"),
                score: Some(5),
                subreddit: Some("studyAbroad".to_string()),
            })
            .collect())
    }
}

// ─── Stub synthesizer ───────────────────────────────────────────────

/// Canned [`Synthesizer`] that counts calls and captures the last
/// request for prompt assertions.
struct StubSynthesizer {
    reply: Option<String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<SynthesisRequest>>,
}

impl StubSynthesizer {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_user_prompt(&self) -> String {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.user.clone())
            .unwrap_or_default()
    }

    fn last_temperature(&self) -> f64 {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.temperature)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Synthesizer for StubSynthesizer {
    async fn complete(&self, request: &SynthesisRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(CompletionError::Status {
                status: 500,
                body: "model overloaded".to_string(),
            }),
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn context_with_cache(
    threads: StubThreads,
    synthesizer: StubSynthesizer,
    cache: ResponseCache,
) -> (OpContext, Arc<StubThreads>, Arc<StubSynthesizer>) {
    let threads = Arc::new(threads);
    let synthesizer = Arc::new(synthesizer);
    let ctx = OpContext::new(threads.clone(), synthesizer.clone(), cache);
    (ctx, threads, synthesizer)
}

fn context(
    threads: StubThreads,
    synthesizer: StubSynthesizer,
) -> (OpContext, Arc<StubThreads>, Arc<StubSynthesizer>) {
    context_with_cache(threads, synthesizer, ResponseCache::disabled())
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

// ─── Operation tests ────────────────────────────────────────────────

/// Prove that a fenced, partially-malformed model reply flows through
/// fetch, prompt assembly, and normalization into a clean payload.
#[tokio::test]
async fn test_university_score_end_to_end() {
    let reply = r#"```json
{"name":"University of Glasgow, Scotland","rating":8,"summary":"Solid choice.","pros":["strong teaching","lively city"],"cons":"rainy","country":"model-country","evidenceStrength":"3 recent threads"}
```"#;
    let (ctx, _, synthesizer) = context(StubThreads::new(), StubSynthesizer::replying(reply));

    let result = ops::university_score(
        &ctx,
        ops::UniversityScoreRequest {
            name: Some("  University of Glasgow  ".to_string()),
            country: Some("UK".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(result["rating"], 8);
    assert_eq!(result["pros"], json!(["strong teaching", "lively city"]));
    // Non-array collections are flattened to empty, never passed through.
    assert_eq!(result["cons"], json!([]));
    // The request decides the country, not the model.
    assert_eq!(result["country"], "UK");
    assert!(result.get("cachedAt").is_none());

    assert_eq!(synthesizer.call_count(), 1);
    assert_eq!(synthesizer.last_temperature(), 0.4);
    let prompt = synthesizer.last_user_prompt();
    assert!(
        prompt.contains("University of Glasgow UK university student reviews"),
        "snippets for the trimmed name and country should reach the model, got: {prompt}"
    );
}

/// Prove that without a requested country, a model-invented one is
/// removed from the payload.
#[tokio::test]
async fn test_university_score_without_country_drops_model_country() {
    let reply = r#"{"rating":7,"pros":[],"cons":[],"country":"Germany"}"#;
    let (ctx, _, synthesizer) = context(StubThreads::new(), StubSynthesizer::replying(reply));

    let result = ops::university_score(
        &ctx,
        ops::UniversityScoreRequest {
            name: Some("Oxford".to_string()),
            country: None,
        },
    )
    .await
    .unwrap();

    assert!(result.get("country").is_none());
    let prompt = synthesizer.last_user_prompt();
    assert!(prompt.contains("Oxford university student reviews"));
}

/// Prove that the score fetch is not degradable: its failure surfaces
/// and no synthesis happens.
#[tokio::test]
async fn test_university_score_surfaces_fetch_failure() {
    let (ctx, _, synthesizer) = context(
        StubThreads::failing_when("reviews"),
        StubSynthesizer::replying("{}"),
    );

    let err = ops::university_score(
        &ctx,
        ops::UniversityScoreRequest {
            name: Some("Oxford".to_string()),
            country: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OpError::Fetch(_)));
    assert!(!err.is_client_error());
    assert_eq!(synthesizer.call_count(), 0);
}

/// Prove that validation rejects before any fetch or synthesis call.
#[tokio::test]
async fn test_validation_rejects_before_any_outbound_call() {
    let (ctx, threads, synthesizer) =
        context(StubThreads::new(), StubSynthesizer::replying("{}"));

    let err = ops::university_score(
        &ctx,
        ops::UniversityScoreRequest {
            name: Some("   ".to_string()),
            country: Some("UK".to_string()),
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.to_string(), "Missing university name");

    let err = ops::overall_insight(
        &ctx,
        ops::OverallInsightRequest {
            university: Some("Oxford".to_string()),
            country: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "University and country are required");

    let err = ops::budget_info(
        &ctx,
        ops::BudgetInfoRequest {
            country: None,
            city: Some("Munich".to_string()),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Country is required");

    assert_eq!(threads.search_count(), 0);
    assert_eq!(synthesizer.call_count(), 0);
}

/// Prove that a failed living-cost branch degrades to an empty thread
/// list while the university branch still feeds the model.
#[tokio::test]
async fn test_overall_insight_degrades_failed_living_cost_branch() {
    let reply = r#"{"university":"Oxford","country":"UK","isWorthItVerdict":"yes","quickNotes":"one note","similarUniversities":[{"name":"Cambridge"},{"name":"  "},"junk"]}"#;
    let (ctx, threads, synthesizer) = context(
        StubThreads::failing_when("living costs"),
        StubSynthesizer::replying(reply),
    );

    let result = ops::overall_insight(
        &ctx,
        ops::OverallInsightRequest {
            university: Some("Oxford".to_string()),
            country: Some("UK".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(synthesizer.call_count(), 1);
    let prompt = synthesizer.last_user_prompt();
    assert!(
        prompt.contains("Detail for /r/studyabroad/0"),
        "healthy branch should deliver full threads, got: {prompt}"
    );
    assert!(
        prompt.contains("Threads about student living costs in the country:\n[]"),
        "failed branch should collapse to an empty list, got: {prompt}"
    );

    // Scalar quickNotes flattened, unusable similar entries dropped,
    // missing countries defaulted to the requested one.
    assert_eq!(result["quickNotes"], json!([]));
    assert_eq!(
        result["similarUniversities"],
        json!([{"name": "Cambridge", "country": "UK"}])
    );
    assert_eq!(result["sources"][0]["label"], "Reddit reviews about Oxford");
    assert_eq!(result["sources"][1]["type"], "living_costs");

    // University branch: one search plus one detail per kept listing.
    assert_eq!(threads.search_count(), 2);
    assert_eq!(threads.detail_count(), 2);
}

/// Prove that both overall-insight branches deliver threads when healthy.
#[tokio::test]
async fn test_overall_insight_feeds_both_branches() {
    let reply = r#"{"quickNotes":[],"similarUniversities":[]}"#;
    let (ctx, threads, synthesizer) =
        context(StubThreads::new(), StubSynthesizer::replying(reply));

    ops::overall_insight(
        &ctx,
        ops::OverallInsightRequest {
            university: Some("TU Delft".to_string()),
            country: Some("Netherlands".to_string()),
        },
    )
    .await
    .unwrap();

    let prompt = synthesizer.last_user_prompt();
    assert!(prompt.contains("TU Delft university student reviews"));
    assert!(prompt.contains("Netherlands student living costs"));
    assert_eq!(threads.search_count(), 2);
    assert_eq!(threads.detail_count(), 4);
}

/// Prove the budget flow: city-qualified location label, thread context
/// in the prompt, nested coercion, and the four deterministic sources.
#[tokio::test]
async fn test_budget_info_label_coercion_and_sources() {
    let reply = r#"{"location":"Munich, Germany","living":{"monthlyRangeLocal":"900-1400 EUR","drivers":"rent"}}"#;
    let (ctx, threads, synthesizer) =
        context(StubThreads::new(), StubSynthesizer::replying(reply));

    let result = ops::budget_info(
        &ctx,
        ops::BudgetInfoRequest {
            country: Some("Germany".to_string()),
            city: Some("  Munich  ".to_string()),
        },
    )
    .await
    .unwrap();

    let prompt = synthesizer.last_user_prompt();
    assert!(prompt.contains("Location: Munich, Germany"));
    assert!(prompt.contains("Detail for /r/studyabroad/0"));
    assert_eq!(threads.detail_count(), 2);

    assert_eq!(result["living"]["drivers"], json!([]));

    let sources = result["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 4);
    assert_eq!(sources[0]["type"], "official");
    assert_eq!(sources[2]["label"], "Flight prices (Skyscanner search)");
    assert!(
        sources[2]["url"]
            .as_str()
            .unwrap()
            .contains("Munich%2C%20Germany"),
        "location label should be URL-encoded, got: {}",
        sources[2]["url"]
    );
    assert_eq!(sources[3]["type"], "community");
}

/// Prove that successful answers replay from the cache: one synthesis,
/// normalized keys, and a `cachedAt` stamp on the replay.
#[tokio::test]
async fn test_successful_response_cached_and_replayed() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = ResponseCache::with_backend(backend.clone());
    let reply = r#"{"rating":9,"pros":["a"],"cons":["b"]}"#;
    let (ctx, _, synthesizer) =
        context_with_cache(StubThreads::new(), StubSynthesizer::replying(reply), cache);

    let first = ops::university_score(
        &ctx,
        ops::UniversityScoreRequest {
            name: Some("University of Glasgow".to_string()),
            country: Some("UK".to_string()),
        },
    )
    .await
    .unwrap();
    assert!(first.get("cachedAt").is_none());
    assert_eq!(backend.len(), 1);

    // Same inputs up to case and spacing hit the same entry.
    let second = ops::university_score(
        &ctx,
        ops::UniversityScoreRequest {
            name: Some("  UNIVERSITY   OF   GLASGOW ".to_string()),
            country: Some("uk".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(synthesizer.call_count(), 1);
    assert!(second["cachedAt"].is_i64());
    assert_eq!(second["rating"], first["rating"]);
    assert_eq!(second["pros"], first["pros"]);

    // Omitting the country is a different question, hence a fresh entry.
    ops::university_score(
        &ctx,
        ops::UniversityScoreRequest {
            name: Some("University of Glasgow".to_string()),
            country: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(synthesizer.call_count(), 2);
    assert_eq!(backend.len(), 2);
}

/// Prove that failures are never written to the cache and repeat calls
/// re-synthesize.
#[tokio::test]
async fn test_failures_never_cached() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = ResponseCache::with_backend(backend.clone());
    let (ctx, _, synthesizer) =
        context_with_cache(StubThreads::new(), StubSynthesizer::failing(), cache);

    let request = ops::RequiredDocumentsRequest {
        country: Some("Canada".to_string()),
    };
    let err = ops::required_documents(&ctx, request.clone()).await.unwrap_err();
    assert!(matches!(err, OpError::Synthesis(_)));
    assert!(backend.is_empty());

    ops::required_documents(&ctx, request).await.unwrap_err();
    assert_eq!(synthesizer.call_count(), 2);
    assert!(backend.is_empty());
}

/// Prove that a non-object reply is a parse error, also left uncached.
#[tokio::test]
async fn test_non_object_reply_is_a_parse_error() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = ResponseCache::with_backend(backend.clone());
    let (ctx, _, _) = context_with_cache(
        StubThreads::new(),
        StubSynthesizer::replying("```json\n[1, 2]\n```"),
        cache,
    );

    let err = ops::required_documents(
        &ctx,
        ops::RequiredDocumentsRequest {
            country: Some("Canada".to_string()),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OpError::Parse(_)));
    assert!(backend.is_empty());
}

/// Prove that profile matching never touches the cache or the thread
/// source, and that every bucket comes back well shaped.
#[tokio::test]
async fn test_profile_match_uncached_and_bucket_shaped() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = ResponseCache::with_backend(backend.clone());
    let reply = r#"{"safe":{"universities":[{"name":"A","country":"X","reason":"fits"}]},"moderate":"oops"}"#;
    let (ctx, threads, synthesizer) =
        context_with_cache(StubThreads::new(), StubSynthesizer::replying(reply), cache);

    let request = ops::ProfileMatchRequest {
        cgpa: Some(json!(3.7)),
        degree: Some(json!("Computer Science")),
        need_scholarship: Some(true),
        ..Default::default()
    };
    let first = ops::profile_match(&ctx, request.clone()).await.unwrap();
    let second = ops::profile_match(&ctx, request).await.unwrap();

    assert_eq!(synthesizer.call_count(), 2);
    assert!(backend.is_empty());
    assert_eq!(threads.search_count(), 0);

    assert_eq!(
        first["safe"]["universities"],
        json!([{"name": "A", "country": "X", "reason": "fits"}])
    );
    assert_eq!(first["moderate"]["universities"], json!([]));
    assert_eq!(first["ambitious"]["universities"], json!([]));
    assert!(second.get("cachedAt").is_none());

    let prompt = synthesizer.last_user_prompt();
    assert!(prompt.contains("CGPA: 3.7"));
    assert!(prompt.contains("Needs scholarship: Yes"));
}

/// Prove the comparison cardinality rules, checked before any fetch.
#[tokio::test]
async fn test_compare_cardinality_rules() {
    let (ctx, threads, synthesizer) =
        context(StubThreads::new(), StubSynthesizer::replying("{}"));

    let cases: Vec<(Option<Vec<String>>, &str)> = vec![
        (
            Some(vec!["Oxford".to_string()]),
            "At least 2 universities are required",
        ),
        (None, "At least 2 universities are required"),
        (
            Some(vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ]),
            "Maximum 3 universities can be compared",
        ),
        (
            Some(vec!["Oxford".to_string(), "   ".to_string()]),
            "At least 2 valid university names are required",
        ),
    ];
    for (universities, expected) in cases {
        let err = ops::compare_universities(
            &ctx,
            ops::CompareUniversitiesRequest { universities },
        )
        .await
        .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), expected);
    }

    assert_eq!(threads.search_count(), 0);
    assert_eq!(synthesizer.call_count(), 0);
}

/// Prove that a comparison keeps going when one university's snippets
/// fail, marking just that one as having no data.
#[tokio::test]
async fn test_compare_degrades_only_failed_university() {
    let reply = r#"{"comparison":{"name":"bad-shape"},"summary":"s"}"#;
    let (ctx, _, synthesizer) = context(
        StubThreads::failing_when("Cambridge"),
        StubSynthesizer::replying(reply),
    );

    let result = ops::compare_universities(
        &ctx,
        ops::CompareUniversitiesRequest {
            universities: Some(vec!["Oxford".to_string(), "Cambridge".to_string()]),
        },
    )
    .await
    .unwrap();

    let prompt = synthesizer.last_user_prompt();
    assert!(
        prompt.contains("1. Oxford: \"Snippet 0 about Oxford university student reviews\""),
        "healthy university should show titled snippets, got: {prompt}"
    );
    assert!(prompt.contains("2. Cambridge: No Reddit data"));

    assert_eq!(result["comparison"], json!([]));
    let sources = result["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 4);
    assert_eq!(sources[0]["label"], "Reddit discussions about Oxford");
}

// ─── HTTP surface tests ─────────────────────────────────────────────

/// Prove the HTTP surface end to end: health probe, a successful
/// operation, and 400s carrying validation reasons verbatim.
#[tokio::test]
async fn test_http_surface_end_to_end() {
    let port = find_free_port();
    let mut cfg = Config::default();
    cfg.server.bind = format!("127.0.0.1:{port}");

    let reply = r#"{"rating":8,"pros":["a"],"cons":["b"]}"#;
    let (ctx, _, _) = context(StubThreads::new(), StubSynthesizer::replying(reply));
    let ops = Arc::new(ctx);

    let server_handle = tokio::spawn(async move {
        run_server_with_ops(&cfg, ops).await.ok();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let resp = client
        .post(format!("http://127.0.0.1:{}/api/university-score", port))
        .json(&json!({"name": "University of Glasgow", "country": "UK"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["rating"], 8);
    assert_eq!(body["country"], "UK");

    let resp = client
        .post(format!("http://127.0.0.1:{}/api/university-score", port))
        .json(&json!({"name": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Missing university name");

    let resp = client
        .post(format!("http://127.0.0.1:{}/api/compare-universities", port))
        .json(&json!({"universities": ["Oxford"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "At least 2 universities are required");

    // Unknown routes fall through to 404.
    let resp = client
        .post(format!("http://127.0.0.1:{}/api/nonexistent", port))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server_handle.abort();
}

/// Prove that upstream failures reach clients only as the generic 500
/// message, never with provider detail.
#[tokio::test]
async fn test_http_masks_internal_failures() {
    let port = find_free_port();
    let mut cfg = Config::default();
    cfg.server.bind = format!("127.0.0.1:{port}");

    let (ctx, _, _) = context(StubThreads::new(), StubSynthesizer::failing());
    let ops = Arc::new(ctx);

    let server_handle = tokio::spawn(async move {
        run_server_with_ops(&cfg, ops).await.ok();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{}/api/required-documents", port))
        .json(&json!({"country": "Canada"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "The service is temporarily unavailable. Please try again."
    );
    assert!(!body["error"].as_str().unwrap().contains("overloaded"));

    server_handle.abort();
}
