//! Completion request handler.
//!
//! One [`CompletionEngine::complete`] call per keystroke: tokenize, walk
//! the grammar for static candidates, independently scan the tokens for an
//! active flag/scope/bound value, swap in dynamically resolved values when
//! a flag is active, then prefix-filter and deduplicate. Pure with respect
//! to its inputs — same text plus same resolver state yields the same
//! output, and nothing is persisted between calls.

use std::collections::HashSet;
use std::sync::Arc;

use tdconsole_types::CommandScope;
use tdconsole_util::shell_lexing::{Token, tokenize};

use crate::filter::filter_candidates;
use crate::grammar::{FLAG_MARKER, GrammarTree, build_grammar};
use crate::resolver::ValueResolver;
use crate::walk::walk;

/// Flag whose value narrows by collection.
const COLL_FLAG: &str = "--coll";
/// Flag naming a table or function, depending on scope.
const NAME_FLAG: &str = "--name";
/// Flag naming a server instance.
const INSTANCE_FLAG: &str = "--instance";

/// The console's completion engine: a read-only grammar plus an injected
/// value resolver.
#[derive(Debug)]
pub struct CompletionEngine {
    tree: GrammarTree,
    resolver: Arc<dyn ValueResolver>,
}

/// Per-request context derived from the raw tokens, independent of the
/// grammar walk.
#[derive(Debug)]
struct RequestContext {
    /// Trailing token text when the input does not end in whitespace.
    fragment: String,
    /// Flag immediately preceding the in-progress position, if it is one
    /// the grammar knows.
    active_flag: Option<String>,
    /// Coarse subcommand grouping used to pick a data source.
    scope: Option<CommandScope>,
    /// Flag tokens already committed on the line.
    used_flags: HashSet<String>,
}

impl RequestContext {
    fn scan(tree: &GrammarTree, tokens: &[Token], ends_with_space: bool) -> Self {
        let fragment = if ends_with_space {
            String::new()
        } else {
            tokens.last().map(|token| token.text.clone()).unwrap_or_default()
        };

        let previous = if ends_with_space {
            tokens.last()
        } else if tokens.len() >= 2 {
            tokens.get(tokens.len() - 2)
        } else {
            None
        };
        let flag_names = tree.flag_names();
        let active_flag = previous
            .map(|token| token.text.as_str())
            .filter(|text| flag_names.contains(*text))
            .map(str::to_string);

        let scope = match tokens.first().map(|token| token.text.as_str()) {
            Some("tdserver") => Some(CommandScope::Server),
            Some("td") => match tokens.get(1).map(|token| token.text.as_str()) {
                Some("table") => Some(CommandScope::Table),
                Some("fn") => Some(CommandScope::Function),
                _ => None,
            },
            _ => None,
        };

        // Only committed tokens count: a flag still being typed must not
        // exclude itself from the dropdown.
        let committed = if ends_with_space {
            tokens
        } else {
            &tokens[..tokens.len().saturating_sub(1)]
        };
        let used_flags = committed
            .iter()
            .filter(|token| token.text.starts_with(FLAG_MARKER))
            .map(|token| token.text.clone())
            .collect();

        Self {
            fragment,
            active_flag,
            scope,
            used_flags,
        }
    }
}

impl CompletionEngine {
    /// Engine over the built-in console grammar.
    pub fn new(resolver: Arc<dyn ValueResolver>) -> Self {
        Self::with_grammar(build_grammar(), resolver)
    }

    /// Engine over a caller-supplied grammar. Used by tests.
    pub fn with_grammar(tree: GrammarTree, resolver: Arc<dyn ValueResolver>) -> Self {
        Self { tree, resolver }
    }

    /// Candidates for the token at the end of `raw`, in presentation order.
    pub fn complete(&self, raw: &str) -> Vec<String> {
        let tokens = tokenize(raw);
        let ends_with_space = raw.chars().last().is_some_and(char::is_whitespace);

        let walked = walk(&self.tree, &tokens, ends_with_space);
        let context = RequestContext::scan(&self.tree, &tokens, ends_with_space);

        // Dynamic values replace the static set entirely while a flag's
        // value is being typed; the tree has nothing literal to offer there.
        let candidates = match context.active_flag.as_deref() {
            Some(flag) => self.resolve_dynamic(flag, context.scope, &tokens),
            None => walked.candidates,
        };

        filter_candidates(candidates, &context.fragment, &context.used_flags)
    }

    /// Replace the trailing token of `raw` with `chosen` and commit it with
    /// a trailing space, leaving the cursor at end-of-text.
    pub fn apply_completion(raw: &str, chosen: &str) -> String {
        if raw.chars().last().is_none_or(char::is_whitespace) {
            return format!("{raw}{chosen} ");
        }
        let token_start = raw
            .char_indices()
            .rev()
            .take_while(|(_, ch)| !ch.is_whitespace())
            .last()
            .map(|(index, _)| index)
            .unwrap_or(0);
        format!("{}{chosen} ", &raw[..token_start])
    }

    fn resolve_dynamic(&self, flag: &str, scope: Option<CommandScope>, tokens: &[Token]) -> Vec<String> {
        match flag {
            COLL_FLAG => match bound_value(tokens, NAME_FLAG) {
                Some(name) => self.collections_containing(&name, scope),
                None => self.resolver.collection_names(),
            },
            NAME_FLAG => {
                let bound_coll = bound_value(tokens, COLL_FLAG);
                let collection = bound_coll.as_deref();
                match scope {
                    Some(CommandScope::Table) => self.resolver.table_names(collection),
                    Some(CommandScope::Function) => self.resolver.function_names(collection),
                    _ => {
                        let mut union = self.resolver.function_names(collection);
                        union.extend(self.resolver.table_names(collection));
                        union.sort();
                        union.dedup();
                        union
                    }
                }
            }
            INSTANCE_FLAG => self.resolver.instance_names(),
            _ => Vec::new(),
        }
    }

    /// Collections that contain the already-bound table or function name,
    /// so `--coll` narrows once `--name` was given first.
    fn collections_containing(&self, name: &str, scope: Option<CommandScope>) -> Vec<String> {
        let mut matches = Vec::new();
        for collection in self.resolver.collection_names() {
            let in_tables = || self.resolver.table_names(Some(&collection)).iter().any(|n| n == name);
            let in_functions = || self.resolver.function_names(Some(&collection)).iter().any(|n| n == name);
            let hit = match scope {
                Some(CommandScope::Table) => in_tables(),
                Some(CommandScope::Function) => in_functions(),
                _ => in_tables() || in_functions(),
            };
            if hit {
                matches.push(collection);
            }
        }
        matches
    }
}

/// Value already supplied for `flag` on the line: the token following the
/// last non-trailing occurrence of `flag`, skipping values that look like
/// flags themselves. The handler only asks about flags other than the
/// active one, so the value is never the token still being typed.
fn bound_value(tokens: &[Token], flag: &str) -> Option<String> {
    let mut bound = None;
    for index in 0..tokens.len().saturating_sub(1) {
        if tokens[index].text == flag {
            let value = &tokens[index + 1].text;
            if !value.starts_with(FLAG_MARKER) && !value.is_empty() {
                bound = Some(value.clone());
            }
        }
    }
    bound
}
