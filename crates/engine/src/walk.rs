//! Cursor walk over the grammar tree.
//!
//! Advances a cursor through the tree token by token and produces the set
//! of statically valid next tokens. The walk is a pure function of the
//! tree and the token sequence — no state survives between calls — which
//! is what makes repeated completion requests idempotent.
//!
//! Policy points, in the order the loop applies them:
//!
//! - A trailing token not followed by whitespace is *in progress*. Even
//!   when it exactly matches a child, the walk does not descend: the
//!   current level's full sibling set stays available until the user
//!   commits the token. An in-progress token that matches nothing keeps
//!   the level too (the prefix filter narrows it later).
//! - A committed token with no matching child is accepted as the value of
//!   the flag the cursor sits on, if any: the flag is recorded as active
//!   and the cursor pops to the flag's parent so sibling flags remain
//!   reachable. With no active flag, the walk halts and the static
//!   candidate set is empty from there on.
//! - Descending into a flag records the sibling set at the current level
//!   as a fallback, used when the walk ends on a node with no literal
//!   children (a flag awaiting its value).

use tdconsole_util::shell_lexing::Token;

use crate::grammar::{GrammarTree, NodeId};

/// Outcome of walking the tokens against the grammar.
#[derive(Clone, Debug)]
pub struct WalkResult {
    /// Node the cursor ended on.
    pub cursor: NodeId,
    /// Statically valid next tokens at the final cursor position. Empty
    /// when the walk halted on an unknown committed token.
    pub candidates: Vec<String>,
    /// Flag whose value the walk last consumed, if any.
    pub active_flag: Option<String>,
    /// True when an unknown committed token stopped the walk.
    pub halted: bool,
}

/// Walk `tokens` from the root. `ends_with_space` tells the walk whether
/// the final token has been committed with trailing whitespace.
pub fn walk(tree: &GrammarTree, tokens: &[Token], ends_with_space: bool) -> WalkResult {
    let mut cursor = tree.root();
    let mut fallback: Option<Vec<String>> = None;
    let mut active_flag: Option<String> = None;
    let mut halted = false;
    let count = tokens.len();

    for (index, token) in tokens.iter().enumerate() {
        if token.text.is_empty() {
            continue;
        }
        let is_last = index + 1 == count;
        let is_partial = is_last && !ends_with_space;
        let child = tree.child(cursor, &token.text);

        if is_partial && child.is_some() {
            // Exact match on an in-progress token: stay at this level so
            // the full sibling set remains available.
            break;
        }

        let Some(child) = child else {
            if tree.node(cursor).is_flag {
                // Unrecognized token after a flag is the flag's value —
                // this recovery runs for in-progress tokens too.
                active_flag = tree.node(cursor).token.clone();
                match tree.node(cursor).parent {
                    Some(parent) => {
                        cursor = parent;
                        continue;
                    }
                    None => {
                        halted = true;
                        break;
                    }
                }
            }
            if is_partial {
                // Trailing in-progress token: keep the level; the prefix
                // filter narrows it.
                break;
            }
            halted = true;
            break;
        };

        let child_node = tree.node(child);
        if child_node.is_flag {
            fallback = Some(tree.literal_children(cursor));
        }
        if child_node.is_value_slot {
            // Synthetic slot matched literally: treat it as the flag's
            // value without descending below the flag.
            if let Some(flag) = child_node.parent {
                active_flag = tree.node(flag).token.clone();
                cursor = flag;
            }
            continue;
        }
        cursor = child;
    }

    let candidates = if halted {
        Vec::new()
    } else {
        let literals = tree.literal_children(cursor);
        if literals.is_empty() {
            fallback.unwrap_or_default()
        } else {
            literals
        }
    };

    WalkResult {
        cursor,
        candidates,
        active_flag,
        halted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::build_grammar;
    use tdconsole_util::shell_lexing::tokenize;

    fn walk_text(text: &str) -> WalkResult {
        let tree = build_grammar();
        let tokens = tokenize(text);
        let ends_with_space = text.chars().last().is_some_and(char::is_whitespace);
        walk(&tree, &tokens, ends_with_space)
    }

    #[test]
    fn empty_input_offers_the_root_level() {
        let result = walk_text("");
        assert_eq!(result.candidates, vec!["td", "tdserver"]);
        assert!(!result.halted);
    }

    #[test]
    fn committed_tokens_descend() {
        let result = walk_text("td table ");
        assert_eq!(result.candidates, vec!["sample", "schema"]);
    }

    #[test]
    fn exact_partial_match_does_not_descend() {
        // "sample" matches a child exactly, but without a trailing space the
        // walk must stay at the "table" level.
        let result = walk_text("td table sample");
        assert_eq!(result.candidates, vec!["sample", "schema"]);
    }

    #[test]
    fn partial_unknown_token_keeps_the_level() {
        let result = walk_text("td table s");
        assert_eq!(result.candidates, vec!["sample", "schema"]);
        assert!(!result.halted);
    }

    #[test]
    fn committed_unknown_token_halts_with_no_candidates() {
        let result = walk_text("td bogus ");
        assert!(result.halted);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn flag_value_pops_back_to_sibling_flags() {
        let result = walk_text("td table sample --coll acme ");
        assert_eq!(result.candidates, vec!["--coll", "--name"]);
        assert_eq!(result.active_flag.as_deref(), Some("--coll"));
        assert!(!result.halted);
    }

    #[test]
    fn pending_flag_value_falls_back_to_sibling_set() {
        // Cursor ends on the --coll node, which has no literal children;
        // the remembered sibling set is surfaced instead.
        let result = walk_text("td table sample --coll ");
        assert_eq!(result.candidates, vec!["--coll", "--name"]);
    }

    #[test]
    fn second_flag_after_value_still_descends() {
        let result = walk_text("td table sample --coll acme --name ");
        assert_eq!(result.candidates, vec!["--coll", "--name"]);
        assert_eq!(result.active_flag.as_deref(), Some("--coll"));
    }

    #[test]
    fn server_group_walks_to_instance_flag() {
        let result = walk_text("tdserver start ");
        assert_eq!(result.candidates, vec!["--instance"]);
    }

    #[test]
    fn walk_never_descends_past_an_unknown_committed_token() {
        // Tokens after the halt must not resurrect candidates.
        let result = walk_text("td bogus sample ");
        assert!(result.halted);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn repeated_walks_are_identical() {
        let first = walk_text("td table sample --coll acme ");
        let second = walk_text("td table sample --coll acme ");
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(first.active_flag, second.active_flag);
    }
}
