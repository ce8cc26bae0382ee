//! Synthesis request assembly.
//!
//! Wording here is presentation, not contract: operations depend only
//! on the JSON shapes the prompts demand and the normalizer enforces.
//! Fetched thread data is embedded as serialized JSON so the model sees
//! exactly what the fetcher kept.

use serde_json::Value;

use crate::completion::SynthesisRequest;
use crate::ops::ProfileMatchRequest;
use crate::reddit::{truncate_chars, ThreadSnippet, ThreadSummary};

const DEFAULT_TEMPERATURE: f64 = 0.4;
/// Document checklists want steadier output than verdict-style prose.
const DOCUMENTS_TEMPERATURE: f64 = 0.3;

/// Characters of each snippet shown in comparison context lines.
const COMPARE_SNIPPET_CHARS: usize = 180;

pub fn university_score(
    name: &str,
    country: Option<&str>,
    snippets: &[ThreadSnippet],
) -> SynthesisRequest {
    let subject = match country {
        Some(country) => format!("Uni: \"{name}\" | Country: \"{country}\""),
        None => format!("Uni: \"{name}\""),
    };
    let system = "You score universities for international applicants from community \
        discussion snippets. Treat well-known nicknames (UofG, Oxbridge) as the university \
        itself. Reply only with valid JSON. Keep it very short: 2 pros, 2 cons, a 1-2 \
        sentence summary, and one short line on evidence strength."
        .to_string();
    let user = format!(
        r#"{subject}

Discussion snippets (title + snippet):
{snippets_json}

JSON only:
{{"name":"...","rating":1-10,"summary":"1-2 sentences","pros":["...","..."],"cons":["...","..."],"evidenceStrength":"one short phrase"}}
Name: include the country only when given (e.g. "University of Glasgow, Scotland")."#,
        snippets_json = serde_json::to_string(snippets).unwrap_or_default()
    );
    SynthesisRequest {
        system,
        user,
        temperature: DEFAULT_TEMPERATURE,
    }
}

pub fn profile_match(request: &ProfileMatchRequest) -> SynthesisRequest {
    let system = "You are an experienced international admissions advisor. Given a \
        student profile, recommend realistic university options grouped into safe, \
        moderate, and ambitious buckets. Favor commonly known, reasonably reputable \
        universities for international students."
        .to_string();
    let user = format!(
        r#"Student profile:
- CGPA: {cgpa}
- Degree / background: {degree}
- IELTS (or equivalent): {ielts}
- Budget: {budget}
- Country preference: {country}
- Needs scholarship: {scholarship}
- Wants PR-friendly country: {pr}

Suggest 3-5 universities per bucket (safe, moderate, ambitious). For each one give
"name", "country", a 1-2 sentence "reason" tailored to this profile, and "city"
when relevant. Only include universities teaching primarily in English at this
degree level, in countries that roughly fit the stated budget, scholarship, and
PR preferences.

Respond ONLY as strict JSON with this shape:
{{
  "safe": {{ "universities": {{ "name": string, "country": string, "city"?: string, "reason": string }}[] }},
  "moderate": {{ "universities": {{ "name": string, "country": string, "city"?: string, "reason": string }}[] }},
  "ambitious": {{ "universities": {{ "name": string, "country": string, "city"?: string, "reason": string }}[] }}
}}"#,
        cgpa = field_text(&request.cgpa),
        degree = field_text(&request.degree),
        ielts = field_text(&request.ielts),
        budget = field_text(&request.budget),
        country = field_text(&request.country_preference),
        scholarship = yes_no(request.need_scholarship),
        pr = yes_no(request.want_pr),
    );
    SynthesisRequest {
        system,
        user,
        temperature: DEFAULT_TEMPERATURE,
    }
}

pub fn budget_info(location_label: &str, threads: &[ThreadSummary]) -> SynthesisRequest {
    let system = "You summarise approximate cost information for international \
        students. Use the provided discussion threads mainly for monthly living-cost \
        ranges and lifestyle detail; use general knowledge for visa fees, mandatory \
        insurance, and flights. Never claim to have browsed a website; present \
        approximate ranges with clear disclaimers pointing at official sites."
        .to_string();
    let user = format!(
        r#"Location: {location_label}

Recent student living-cost threads (post + top comments):
{threads_json}

Produce a concise JSON summary covering:
1. Visa & mandatory fees: typical application fee range (local currency and USD), mandatory healthcare / insurance charges, and when these are usually paid.
2. Pre-arrival costs outside tuition: accommodation deposit / first month rent, one-way flight cost range in USD from common source regions, other upfront expenses (biometrics, translations, medical checks, proof of funds).
3. Monthly living expenses: low, typical, and high monthly budgets in local currency and USD, short bullets on what drives costs up or down, a short paragraph on what students report about affordability, and one line on evidence strength.
4. Part-time work: legal hour limits during term and vacations, typical hourly wage range (local currency and USD), and a note on how realistic covering living costs from part-time work alone is.
5. A disclaimer that every number is approximate, changes quickly, and must be verified on official government and university websites.

Respond ONLY as strict JSON with this shape:
{{
  "location": string,
  "visa": {{
    "feeRangeLocal": string,
    "feeRangeUsd": string,
    "insuranceOrHealthCharge": string,
    "notes": string
  }},
  "preArrival": {{
    "accommodationDeposit": string,
    "flightRangeUsd": string,
    "otherUpfrontCosts": string
  }},
  "living": {{
    "monthlyRangeLocal": string,
    "monthlyRangeUsd": string,
    "drivers": string[],
    "redditSummary": string,
    "evidenceStrength": string
  }},
  "partTime": {{
    "maxHoursPerWeekTerm": string,
    "maxHoursPerWeekVacation": string,
    "hourlyRangeLocal": string,
    "hourlyRangeUsd": string,
    "notes": string
  }},
  "disclaimer": string
}}"#,
        threads_json = serde_json::to_string_pretty(threads).unwrap_or_default()
    );
    SynthesisRequest {
        system,
        user,
        temperature: DEFAULT_TEMPERATURE,
    }
}

pub fn overall_insight(
    university: &str,
    country: &str,
    university_threads: &[ThreadSummary],
    living_cost_threads: &[ThreadSummary],
) -> SynthesisRequest {
    let system = "You advise international students on studying abroad. Given \
        community threads about a university and about living costs in a country, \
        answer in crisp phrases, never essays. Cover what applicants care about: \
        rough yearly cost in INR, USD, and EUR (convert when needed), placements \
        and ROI, commonly-reported acceptance rates (note they vary by program and \
        are unofficial unless stated), and whether student sentiment reads positive \
        or mixed. Be honest when the data is thin, but still give a rough idea."
        .to_string();
    let user = format!(
        r#"University: {university}
Country: {country}

Threads about the university (post + comments):
{university_json}

Threads about student living costs in the country:
{living_cost_json}

Give a VERY SHORT JSON-only answer in exactly this shape, compact phrases only:
{{
  "university": string,
  "country": string,
  "isWorthItVerdict": string,
  "reviewMood": string,
  "yearlyCostInr": string,
  "yearlyCostUsd": string,
  "yearlyCostEur": string,
  "acceptanceRate": string,
  "difficultyLevel": string,
  "quickNotes": string[],
  "similarUniversities": [ {{ "name": string, "country": string }} ]
}}

quickNotes: 3-4 bullet-style notes, at most 10-12 words each.
similarUniversities: 3-5 full university names similar in prestige, focus, or location.
Respond ONLY with JSON, no extra text."#,
        university_json = serde_json::to_string_pretty(university_threads).unwrap_or_default(),
        living_cost_json = serde_json::to_string_pretty(living_cost_threads).unwrap_or_default(),
    );
    SynthesisRequest {
        system,
        user,
        temperature: DEFAULT_TEMPERATURE,
    }
}

pub fn required_documents(country: &str) -> SynthesisRequest {
    let system = "You are an expert on international student visa requirements. \
        Provide accurate, comprehensive lists of required documents for student \
        visa applications, always covering the common requirements (transcripts, \
        language scores, financial proof, passport, photos) plus anything \
        country-specific. Format the response as valid JSON."
        .to_string();
    let user = format!(
        r#"List every document an international student needs for a student visa application to {country}.

Include a 2-3 sentence summary of this country's requirements, a complete document
checklist with brief descriptions, a by-category organization (Academic, Financial,
Identity, Health, Other), any special country-specific notes, and accepted formats
(PDF, originals, certified translations).

Respond ONLY as strict JSON with this structure:
{{
  "country": "{country}",
  "summary": "Brief 2-3 sentence summary of document requirements",
  "documents": [
    {{
      "name": "Document name",
      "description": "What this document is and why it is needed",
      "notes": "Optional special notes"
    }}
  ],
  "categories": {{
    "Academic Documents": [ {{ "name": "Document name", "description": "Description" }} ],
    "Financial Documents": [],
    "Identity Documents": [],
    "Other Documents": []
  }},
  "importantNotes": [
    "Important note 1",
    "Important note 2"
  ]
}}"#
    );
    SynthesisRequest {
        system,
        user,
        temperature: DOCUMENTS_TEMPERATURE,
    }
}

pub fn compare_universities(
    universities: &[String],
    snippets: &[Vec<ThreadSnippet>],
) -> SynthesisRequest {
    let context = universities
        .iter()
        .enumerate()
        .map(|(idx, university)| {
            let digest = snippets.get(idx).map(|s| snippet_digest(s)).unwrap_or_default();
            if digest.is_empty() {
                format!("{}. {university}: No Reddit data", idx + 1)
            } else {
                format!("{}. {university}: {digest}", idx + 1)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let system = "Compare universities from community snippets and general knowledge. \
        Reply only with valid JSON. Use exactly one short sentence per description, \
        and one sentence each for the summary and every insight."
        .to_string();
    let user = format!(
        r#"Compare these {count} universities (one sentence per answer):

{context}

Criteria: 1) Academic Quality & Reputation 2) Student Life & Campus Experience 3) Career Outcomes & Job Prospects 4) Value for Money.

For each university and each criterion: a 1-10 rating and ONE short sentence. Then a one-sentence overall summary and 2 short insight sentences.

JSON only:
{{
  "comparison": [
    {{ "name": "University name", "points": [
      {{ "rating": 8, "description": "One sentence." }},
      {{ "rating": 7, "description": "One sentence." }},
      {{ "rating": 9, "description": "One sentence." }},
      {{ "rating": 8, "description": "One sentence." }}
    ]}}
  ],
  "comparisonPoints": [
    {{ "name": "Academic Quality & Reputation" }},
    {{ "name": "Student Life & Campus Experience" }},
    {{ "name": "Career Outcomes & Job Prospects" }},
    {{ "name": "Value for Money" }}
  ],
  "summary": "One sentence overall.",
  "insights": ["Short insight 1.", "Short insight 2."]
}}"#,
        count = universities.len(),
    );
    SynthesisRequest {
        system,
        user,
        temperature: DEFAULT_TEMPERATURE,
    }
}

/// One context line per university: quoted titles with trimmed snippets,
/// pipe separated.
fn snippet_digest(snippets: &[ThreadSnippet]) -> String {
    snippets
        .iter()
        .map(|s| {
            format!(
                "\"{}\" {}",
                s.title,
                truncate_chars(&s.snippet, COMPARE_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Free-text profile field rendered for the prompt; anything unusable
/// shows as `N/A`.
fn field_text(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "N/A".to_string(),
    }
}

fn yes_no(flag: Option<bool>) -> &'static str {
    if flag.unwrap_or(false) {
        "Yes"
    } else {
        "No"
    }
}
