//! End-to-end completion behavior against a fixed resolver.

use std::sync::Arc;

use tdconsole_engine::{CompletionEngine, NullResolver, ValueResolver};

/// Resolver returning a small fixed catalog:
/// - instances: dev, prod
/// - collections: acme, zenith
/// - acme tables: orders, users; acme functions: ingest
/// - zenith tables: users; zenith functions: report
#[derive(Debug)]
struct FixedResolver;

impl ValueResolver for FixedResolver {
    fn instance_names(&self) -> Vec<String> {
        vec!["dev".into(), "prod".into()]
    }

    fn collection_names(&self) -> Vec<String> {
        vec!["acme".into(), "zenith".into()]
    }

    fn function_names(&self, collection: Option<&str>) -> Vec<String> {
        match collection {
            Some("acme") => vec!["ingest".into()],
            Some("zenith") => vec!["report".into()],
            Some(_) => Vec::new(),
            None => vec!["ingest".into(), "report".into()],
        }
    }

    fn table_names(&self, collection: Option<&str>) -> Vec<String> {
        match collection {
            Some("acme") => vec!["orders".into(), "users".into()],
            Some("zenith") => vec!["users".into()],
            Some(_) => Vec::new(),
            None => vec!["orders".into(), "users".into()],
        }
    }
}

fn engine() -> CompletionEngine {
    CompletionEngine::new(Arc::new(FixedResolver))
}

#[test]
fn committed_group_offers_its_leaves() {
    // Scenario 1: candidates one level down, flags not yet visible.
    let out = engine().complete("td table ");
    assert_eq!(out, vec!["sample", "schema"]);
}

#[test]
fn partial_token_prefix_filters_without_changing_level() {
    // Scenario 2: the level must match scenario 1 despite "s" being a
    // prefix of an existing child.
    let out = engine().complete("td table s");
    assert_eq!(out, vec!["sample", "schema"]);

    let out = engine().complete("td table sa");
    assert_eq!(out, vec!["sample"]);
}

#[test]
fn exact_partial_match_keeps_siblings_visible() {
    // "sample" matches a child exactly but is uncommitted; "schema" would
    // be hidden if the walk descended prematurely.
    let out = engine().complete("td table sample");
    assert_eq!(out, vec!["sample"]);
}

#[test]
fn active_coll_flag_resolves_collections() {
    // Scenario 3: value slot has no literals; the resolver's collection
    // list is returned unfiltered for an empty fragment.
    let out = engine().complete("td table sample --coll ");
    assert_eq!(out, vec!["acme", "zenith"]);
}

#[test]
fn active_coll_flag_prefix_filters_collections() {
    let out = engine().complete("td table sample --coll ac");
    assert_eq!(out, vec!["acme"]);
}

#[test]
fn bound_collection_scopes_name_lookup() {
    // Scenario 4: --name resolves tables within the bound collection.
    let out = engine().complete("td table sample --coll acme --name ");
    assert_eq!(out, vec!["orders", "users"]);

    let out = engine().complete("td fn sample --coll zenith --name ");
    assert_eq!(out, vec!["report"]);
}

#[test]
fn used_flags_never_reappear_as_literals() {
    // Scenario 4, continued: back at the flag level, --coll is spent.
    let out = engine().complete("td table sample --coll acme ");
    assert_eq!(out, vec!["--name"]);
}

#[test]
fn instance_flag_resolves_instance_names() {
    // Scenario 5.
    let out = engine().complete("tdserver start --instance ");
    assert_eq!(out, vec!["dev", "prod"]);
}

#[test]
fn repeated_flag_still_gets_value_completion() {
    // Scenario 6: the literal --coll is excluded, but the active value
    // slot of the repeated flag still resolves.
    let out = engine().complete("td table sample --coll acme --coll ");
    assert_eq!(out, vec!["acme", "zenith"]);
}

#[test]
fn unscoped_name_lookup_unions_tables_and_functions() {
    // No table/fn scope resolved: union of both entity classes, sorted.
    let out = engine().complete("td bogus sample --name ");
    assert_eq!(out, vec!["ingest", "orders", "report", "users"]);
}

#[test]
fn name_bound_first_narrows_collections() {
    // Reverse narrowing: only collections containing table "orders".
    let out = engine().complete("td table sample --name orders --coll ");
    assert_eq!(out, vec!["acme"]);

    // "users" exists in both collections.
    let out = engine().complete("td table sample --name users --coll ");
    assert_eq!(out, vec!["acme", "zenith"]);
}

#[test]
fn unknown_committed_token_yields_no_static_candidates() {
    let out = engine().complete("td bogus ");
    assert!(out.is_empty());
}

#[test]
fn empty_input_offers_root_groups() {
    let out = engine().complete("");
    assert_eq!(out, vec!["td", "tdserver"]);
}

#[test]
fn completion_is_idempotent_for_fixed_resolver_state() {
    let engine = engine();
    for text in ["", "td ", "td table s", "td table sample --coll ", "tdserver start --instance d"] {
        assert_eq!(engine.complete(text), engine.complete(text), "input: {text:?}");
    }
}

#[test]
fn resolver_failure_degrades_to_no_suggestions() {
    let engine = CompletionEngine::new(Arc::new(NullResolver));
    assert!(engine.complete("td table sample --coll ").is_empty());
    // Static grammar still works without any backend.
    assert_eq!(engine.complete("td table "), vec!["sample", "schema"]);
}

#[test]
fn quoted_fragments_complete_like_plain_ones() {
    // An unterminated quote must not break completion; the fallback split
    // keeps the raw fragment, which simply matches nothing.
    let out = engine().complete("td table sample --coll 'ac");
    assert!(out.is_empty());

    // A closed quote lexes cleanly and the fragment prefix-filters.
    let out = engine().complete("td table sample --coll ac");
    assert_eq!(out, vec!["acme"]);
}

#[test]
fn selection_rewrites_trailing_token_and_reinvokes_cleanly() {
    let engine = engine();
    let out = engine.complete("td tab");
    assert_eq!(out, vec!["table"]);

    let rewritten = CompletionEngine::apply_completion("td tab", "table");
    assert_eq!(rewritten, "td table ");
    assert_eq!(engine.complete(&rewritten), vec!["sample", "schema"]);
}
