//! Name resolution against the scope stack.
//!
//! A scope stack is a list of levels (name segment lists as written, updirs
//! unresolved) with unwind fences between digressions. Resolving an inline
//! name first collapses the levels a backtracking name reaches back into,
//! then applies the remaining levels left to right.

use logipard_types::is_updir_segment;

/// One entry of the scope stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEntry {
    /// Name segments as written in one digression
    Level(Vec<String>),
    /// Unwind fence: `}` pops never cross it
    Fence,
}

impl ScopeEntry {
    pub fn level<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        ScopeEntry::Level(segments.into_iter().map(Into::into).collect())
    }
}

/// Resolve `inline` as written in the scope given by `stack` into a canonical name
pub fn resolve_name(stack: &[ScopeEntry], inline: &[String]) -> Vec<String> {
    let levels = collapse_backtracks(stack, inline);
    apply_levels(&levels)
}

/// Phase 1: walk the levels backwards, folding each backtrack key or updir
/// run into the earlier levels it cancels. Returns the surviving levels in
/// chronological order.
fn collapse_backtracks(stack: &[ScopeEntry], inline: &[String]) -> Vec<Vec<String>> {
    let mut pending: Vec<Vec<String>> = stack
        .iter()
        .filter_map(|entry| match entry {
            ScopeEntry::Level(segments) if !segments.is_empty() => Some(segments.clone()),
            _ => None,
        })
        .collect();
    if !inline.is_empty() {
        pending.push(inline.to_vec());
    }

    let mut collapsed = Vec::new();
    while let Some(mut level) = pending.pop() {
        let first = level[0].clone();

        if is_updir_segment(&first) {
            // the run itself becomes a plain "stay" marker, its extra dots
            // consume trailing segments of earlier levels
            let mut updirs_left = first.len() - 1;
            level[0] = ".".to_string();
            collapsed.push(level);

            while updirs_left > 0 {
                let Some(earlier) = pending.last_mut() else { break };
                while updirs_left > 0 {
                    let Some(segment) = earlier.pop() else { break };
                    if is_updir_segment(&segment) {
                        updirs_left += segment.len() - 1;
                    } else {
                        updirs_left -= 1;
                    }
                }
                if earlier.is_empty() {
                    pending.pop();
                }
            }
            continue;
        }

        collapsed.push(level);
        while let Some(earlier) = pending.last_mut() {
            if earlier.last() == Some(&first) {
                break;
            }
            earlier.pop();
            if earlier.is_empty() {
                pending.pop();
            }
        }
    }

    collapsed.reverse();
    collapsed
}

/// Phase 2: build the path. Each level's first plain segment backtracks to
/// an equal segment already in the path; later segments simply nest.
fn apply_levels(levels: &[Vec<String>]) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::new();

    for level in levels {
        let mut backtrack = true;
        for segment in level {
            if is_updir_segment(segment) {
                for _ in 1..segment.len() {
                    if resolved.pop().is_none() {
                        break;
                    }
                }
            } else {
                if backtrack {
                    while let Some(popped) = resolved.pop() {
                        if popped == *segment {
                            break;
                        }
                    }
                }
                resolved.push(segment.clone());
            }
            backtrack = false;
        }
    }

    resolved
}
