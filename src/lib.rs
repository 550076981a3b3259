//! # stepsite
//!
//! Static-site build pipeline for the Stepping Stones Community Resources
//! website. The CMS is gone; its JSON export is the data source. Every build
//! reads the export, scrubs the legacy markup, and regenerates the entire
//! site from scratch.
//!
//! # Architecture: Load → Sanitize → Compose → Write
//!
//! ```text
//! 1. Load      data/*.json  →  ContentStore     (records + config in memory)
//! 2. Classify  record link  →  RouteKind        (ordered path predicates)
//! 3. Sanitize  raw HTML     →  safe HTML        (ten ordered rewrite passes)
//! 4. Compose   route kind   →  section sequence (fixed order per kind)
//! 5. Write     document     →  dist/ + mirror/  (identical content, twice)
//! ```
//!
//! The build is deliberately single-threaded and synchronous: one pass over
//! the loaded collections in source order, no incremental mode, no partial
//! success. Both output trees are deleted and regenerated per run, so two
//! builds over the same input are byte-identical.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `site.json` loading, optional overrides, asset map, documented defaults |
//! | [`content`] | Entity types and the `ContentStore` loaded from the data directory |
//! | [`routes`] | Canonical URL → output path; ordered route-kind classification |
//! | [`sanitize`] | The ten-pass legacy-HTML rewrite pipeline |
//! | [`extract`] | Home-page decomposition: lead, highlight, feature cards, remainder |
//! | [`templates`] | Maud components: shell, chrome, heroes, grids, FAQ, CTA bands |
//! | [`compose`] | Route-keyed body assembly + per-route metadata override table |
//! | [`generate`] | Orchestration: clean, copy assets, render, sitemap, robots |
//! | [`ingest`] | Post import from Markdown/CSV with all-or-nothing validation |
//! | [`validate`] | Post-build link checker and QA checker |
//!
//! # Design Decisions
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time
//! HTML macro system, rather than Handlebars or Tera:
//!
//! - **Compile-time checking**: malformed HTML is a build error, not a runtime surprise.
//! - **Type-safe**: template variables are Rust expressions — no stringly-typed lookups.
//! - **XSS-safe by default**: all interpolation is auto-escaped; only
//!   sanitized legacy bodies go through `PreEscaped`.
//! - **Zero runtime files**: no template directory to ship or get out of sync.
//!
//! ## Pattern Matching Over HTML Parsing
//!
//! The sanitizer and the home-page extractor rewrite markup with regular
//! expressions instead of a parse-tree walk. The legacy corpus is small,
//! fixed, and full of markup a strict parser would "fix" in ways that change
//! the output. The extractor is a pure function with golden-input tests, so
//! a structural reimplementation can swap in behind the same contract if the
//! corpus ever grows.
//!
//! ## Ordered Route Classification
//!
//! A path can satisfy several route predicates (a service slug can end in
//! the location suffix). Classification runs a fixed predicate chain and the
//! first match wins, which keeps the mapping deterministic without a
//! priority field in the data.
//!
//! ## Dual Output Trees
//!
//! Every document is written twice from the identical rendered string: the
//! public tree that gets deployed, and a mirror tree (pages and posts split)
//! kept for inspection and versioning diffs.

pub mod compose;
pub mod config;
pub mod content;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod routes;
pub mod sanitize;
pub mod templates;
pub mod validate;
