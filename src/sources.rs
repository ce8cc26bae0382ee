//! Deterministic source links attached to responses.
//!
//! Links are built from validated request fields only, never from model
//! output, so clients always get stable verification pointers no matter
//! what the synthesis step produced.

use serde::Serialize;
use urlencoding::encode;

/// Link category shown by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Official,
    Flights,
    Community,
    Reddit,
    LivingCosts,
}

/// One verification pointer: `{type, label, url}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceLink {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub label: String,
    pub url: String,
}

fn google_search(query: &str) -> String {
    format!("https://www.google.com/search?q={}", encode(query))
}

fn reddit_search(query: &str) -> String {
    format!("https://www.reddit.com/search/?q={}", encode(query))
}

/// Links for the budget overview: visa fees, insurance, flights, and
/// community cost threads.
pub fn budget_sources(country: &str, location_label: &str) -> Vec<SourceLink> {
    vec![
        SourceLink {
            kind: SourceKind::Official,
            label: format!("{country} official student visa information (search)"),
            url: google_search(&format!("{country} official student visa fee")),
        },
        SourceLink {
            kind: SourceKind::Official,
            label: format!(
                "{country} official healthcare / insurance for international students (search)"
            ),
            url: google_search(&format!(
                "{country} mandatory health insurance for international students"
            )),
        },
        SourceLink {
            kind: SourceKind::Flights,
            label: "Flight prices (Skyscanner search)".to_string(),
            url: format!(
                "https://www.skyscanner.net/transport/flights-to/{}/",
                encode(country)
            ),
        },
        SourceLink {
            kind: SourceKind::Community,
            label: "Reddit threads on student living costs".to_string(),
            url: reddit_search(&format!("{location_label} student living costs")),
        },
    ]
}

/// Links for the overall verdict: review and living-cost searches.
pub fn overall_sources(university: &str, country: &str) -> Vec<SourceLink> {
    vec![
        SourceLink {
            kind: SourceKind::Reddit,
            label: format!("Reddit reviews about {university}"),
            url: reddit_search(&format!("{university} university student")),
        },
        SourceLink {
            kind: SourceKind::LivingCosts,
            label: format!("Reddit threads on student living costs in {country}"),
            url: reddit_search(&format!("{country} student living costs")),
        },
    ]
}

/// Links for the visa document checklist.
pub fn documents_sources(country: &str) -> Vec<SourceLink> {
    vec![
        SourceLink {
            kind: SourceKind::Official,
            label: format!("{country} official student visa document requirements"),
            url: google_search(&format!("{country} official student visa required documents")),
        },
        SourceLink {
            kind: SourceKind::Official,
            label: format!("{country} embassy/consulate student visa page"),
            url: google_search(&format!("{country} embassy student visa application documents")),
        },
    ]
}

/// Two links per compared university: community discussions plus an
/// official-site search.
pub fn compare_sources(universities: &[String]) -> Vec<SourceLink> {
    let mut links = Vec::with_capacity(universities.len() * 2);
    for university in universities {
        links.push(SourceLink {
            kind: SourceKind::Reddit,
            label: format!("Reddit discussions about {university}"),
            url: reddit_search(&format!("{university} university student")),
        });
        links.push(SourceLink {
            kind: SourceKind::Official,
            label: format!("{university} official website"),
            url: google_search(&format!("{university} official website")),
        });
    }
    links
}
