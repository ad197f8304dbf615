//! Merge of historical (snapshot-sourced) and live (stream-sourced) agent
//! thought logs into one deduplicated, chronologically ordered sequence.
//!
//! Pure and deterministic: safe to invoke on every read or offload to a
//! background task without semantic difference.

use crate::protocol::{AgentThought, ThoughtType};
use std::collections::HashMap;

/// Merge two thought sequences that may share ids, arrive out of
/// chronological order, and contain redundant feedback.
///
/// Algorithm:
/// 1. Insert `historical` then `live` into an insertion-ordered id map.
///    A later insertion with the same id overwrites in place, so live data
///    wins over stale historical data while keeping the original position.
/// 2. Thoughts without an id bypass the map entirely: they are retained
///    after the mapped entries in arrival order, never deduplicated.
/// 3. Collapse consecutive identical feedback entries (same role, same
///    content); `thought`/`action`/`revision` types are never collapsed.
/// 4. Stable-sort by timestamp ascending. Arrival order breaks ties, which
///    keeps the output deterministic even for equal timestamps.
pub fn reconcile(historical: &[AgentThought], live: &[AgentThought]) -> Vec<AgentThought> {
    let mut ordered: Vec<AgentThought> = Vec::with_capacity(historical.len() + live.len());
    let mut index_by_id: HashMap<&str, usize> = HashMap::new();
    let mut unidentified: Vec<AgentThought> = Vec::new();

    for thought in historical.iter().chain(live.iter()) {
        match thought.id.as_deref() {
            Some(id) => {
                if let Some(&slot) = index_by_id.get(id) {
                    // Re-emitted thought with corrected fields; latest copy wins.
                    ordered[slot] = thought.clone();
                } else {
                    index_by_id.insert(id, ordered.len());
                    ordered.push(thought.clone());
                }
            }
            None => unidentified.push(thought.clone()),
        }
    }

    ordered.extend(unidentified);

    let mut collapsed = collapse_repeated_feedback(ordered);
    collapsed.sort_by_key(|thought| thought.timestamp);
    collapsed
}

/// Drop a feedback entry when the immediately preceding kept entry is
/// feedback from the same agent with identical content. Anti-flicker for
/// backends that re-emit the same verdict every polling cycle.
fn collapse_repeated_feedback(thoughts: Vec<AgentThought>) -> Vec<AgentThought> {
    let mut kept: Vec<AgentThought> = Vec::with_capacity(thoughts.len());

    for thought in thoughts {
        let redundant = thought.thought_type == ThoughtType::Feedback
            && kept.last().is_some_and(|previous| {
                previous.thought_type == ThoughtType::Feedback
                    && previous.agent_role == thought.agent_role
                    && previous.content == thought.content
            });
        if !redundant {
            kept.push(thought);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AgentRole;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, seconds).unwrap()
    }

    fn thought(id: &str, content: &str, seconds: u32) -> AgentThought {
        AgentThought {
            id: Some(id.to_string()),
            agent_role: AgentRole::Drafter,
            agent_name: None,
            content: content.to_string(),
            thought_type: ThoughtType::Thought,
            timestamp: ts(seconds),
        }
    }

    fn feedback(id: &str, role: AgentRole, content: &str, seconds: u32) -> AgentThought {
        AgentThought {
            id: Some(id.to_string()),
            agent_role: role,
            agent_name: None,
            content: content.to_string(),
            thought_type: ThoughtType::Feedback,
            timestamp: ts(seconds),
        }
    }

    #[test]
    fn empty_inputs_yield_empty_output() {
        assert!(reconcile(&[], &[]).is_empty());
    }

    #[test]
    fn dedup_is_idempotent() {
        let batch = vec![
            thought("a", "one", 1),
            thought("b", "two", 2),
            thought("c", "three", 3),
        ];
        let doubled = reconcile(&batch, &batch);
        let single = reconcile(&batch, &[]);
        assert_eq!(doubled, single);
        assert_eq!(doubled.len(), 3);
    }

    #[test]
    fn live_wins_on_id_collision() {
        let historical = vec![thought("a", "X", 1)];
        let live = vec![thought("a", "Y", 1)];
        let merged = reconcile(&historical, &live);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "Y");
    }

    #[test]
    fn overwrite_keeps_original_position() {
        let historical = vec![thought("a", "first", 1), thought("b", "second", 2)];
        let live = vec![thought("a", "first-corrected", 1)];
        let merged = reconcile(&historical, &live);
        assert_eq!(merged[0].content, "first-corrected");
        assert_eq!(merged[1].content, "second");
    }

    #[test]
    fn output_is_chronological() {
        let historical = vec![thought("c", "late", 9), thought("a", "early", 1)];
        let live = vec![thought("b", "middle", 5)];
        let merged = reconcile(&historical, &live);
        let times: Vec<_> = merged.iter().map(|t| t.timestamp).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
        assert_eq!(merged[0].content, "early");
        assert_eq!(merged[2].content, "late");
    }

    #[test]
    fn equal_timestamps_preserve_arrival_order() {
        let live = vec![thought("a", "first", 3), thought("b", "second", 3)];
        let merged = reconcile(&[], &live);
        assert_eq!(merged[0].content, "first");
        assert_eq!(merged[1].content, "second");
    }

    #[test]
    fn identical_consecutive_feedback_collapses() {
        let live = vec![
            feedback("f1", AgentRole::SafetyGuardian, "Looks safe.", 1),
            feedback("f2", AgentRole::SafetyGuardian, "Looks safe.", 2),
        ];
        let merged = reconcile(&[], &live);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id.as_deref(), Some("f1"));
    }

    #[test]
    fn differing_feedback_content_keeps_both() {
        let live = vec![
            feedback("f1", AgentRole::SafetyGuardian, "Looks safe.", 1),
            feedback("f2", AgentRole::SafetyGuardian, "One concern remains.", 2),
        ];
        assert_eq!(reconcile(&[], &live).len(), 2);
    }

    #[test]
    fn feedback_from_different_roles_keeps_both() {
        let live = vec![
            feedback("f1", AgentRole::SafetyGuardian, "Looks safe.", 1),
            feedback("f2", AgentRole::ClinicalCritic, "Looks safe.", 2),
        ];
        assert_eq!(reconcile(&[], &live).len(), 2);
    }

    #[test]
    fn non_feedback_types_never_collapse() {
        let duplicate_content = vec![
            thought("t1", "Repeating myself.", 1),
            thought("t2", "Repeating myself.", 2),
        ];
        assert_eq!(reconcile(&[], &duplicate_content).len(), 2);
    }

    #[test]
    fn interleaved_feedback_does_not_collapse() {
        let live = vec![
            feedback("f1", AgentRole::SafetyGuardian, "Looks safe.", 1),
            thought("t1", "Adjusting step 2.", 2),
            feedback("f2", AgentRole::SafetyGuardian, "Looks safe.", 3),
        ];
        assert_eq!(reconcile(&[], &live).len(), 3);
    }

    #[test]
    fn thoughts_without_id_are_retained_not_deduplicated() {
        let orphan = AgentThought {
            id: None,
            agent_role: AgentRole::Supervisor,
            agent_name: None,
            content: "routing to clinical critic".to_string(),
            thought_type: ThoughtType::Action,
            timestamp: ts(4),
        };
        let merged = reconcile(&[orphan.clone()], &[orphan.clone()]);
        // No id means no dedup contract; both copies survive.
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn thoughts_without_id_sort_by_timestamp() {
        let orphan = AgentThought {
            id: None,
            agent_role: AgentRole::Supervisor,
            agent_name: None,
            content: "orphan".to_string(),
            thought_type: ThoughtType::Thought,
            timestamp: ts(2),
        };
        let merged = reconcile(&[thought("a", "one", 1), thought("b", "three", 3)], &[orphan]);
        assert_eq!(merged[1].content, "orphan");
    }

    #[test]
    fn output_length_equals_distinct_ids_after_collapse() {
        let batch = vec![
            thought("a", "one", 1),
            thought("b", "two", 2),
            thought("a", "one again", 1),
        ];
        let merged = reconcile(&batch, &batch);
        assert_eq!(merged.len(), 2);
    }
}
