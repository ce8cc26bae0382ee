//! # Uniscope
//!
//! A community-grounded study-abroad insight API. Each endpoint turns a
//! small JSON request into one synthesized answer: gather recent Reddit
//! discussion about a university or location, hand that evidence to an
//! LLM completion with a strict JSON-only prompt, normalize whatever
//! comes back, and attach deterministic source links. Successful
//! answers are cached in Redis so repeat questions skip the pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌─────────────┐
//! │ HTTP API │──▶│   Operations   │──▶│ Completion  │
//! │  (axum)  │   │ validate, fan  │   │ (one call)  │
//! └──────────┘   │ out, normalize │   └─────────────┘
//!                └───────┬────────┘
//!                ┌───────┴────────┐
//!                ▼                ▼
//!          ┌──────────┐    ┌──────────┐
//!          │  Reddit  │    │  Redis   │
//!          │ fetches  │    │  cache   │
//!          └──────────┘    └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Layered TOML + env configuration |
//! | [`server`] | Axum HTTP surface |
//! | [`ops`] | One function per endpoint, orchestrating the rest |
//! | [`validate`] | Request validation |
//! | [`cache`] | Redis response cache with per-operation TTLs |
//! | [`reddit`] | Public Reddit JSON search and thread fetches |
//! | [`completion`] | OpenAI-compatible chat completion client |
//! | [`prompt`] | Prompt builders, one per operation |
//! | [`normalize`] | Fence stripping and shape coercion for model output |
//! | [`sources`] | Deterministic source-link construction |
//! | [`error`] | Operation error taxonomy |

pub mod cache;
pub mod completion;
pub mod config;
pub mod error;
pub mod normalize;
pub mod ops;
pub mod prompt;
pub mod reddit;
pub mod server;
pub mod sources;
pub mod validate;
