//! Interest-overlap scoring and pairing (spec.md §4.D).

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// A pool member eligible for pairing this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub username: String,
    pub interests: Vec<String>,
    pub joined_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub a: String,
    pub b: String,
    pub score: usize,
}

/// Intersection of two interest lists, preserving `a`'s order. Used both to
/// compute the pairing score and to report `commonInterests` to callers.
#[must_use]
pub fn common_interests(a: &[String], b: &[String]) -> Vec<String> {
    let b_set: HashSet<&String> = b.iter().collect();
    a.iter().filter(|tag| b_set.contains(tag)).cloned().collect()
}

#[must_use]
pub fn score(a: &[String], b: &[String]) -> usize {
    common_interests(a, b).len()
}

/// Greedily pairs candidates by descending interest-overlap score,
/// excluding same-username pairs (spec.md §4.D step 4, invariant 4) and
/// any candidate for which `in_cooldown` returns true.
///
/// Ties break by ascending `joined_at` (older queuers first), matching the
/// tie-break rule in spec.md §4.D.
///
/// Returns the committed pairs and the candidates left unmatched, in their
/// original relative order, for `random_match` to consume next.
pub fn greedy_match(
    candidates: &[Candidate],
    in_cooldown: impl Fn(&str) -> bool,
) -> (Vec<MatchedPair>, Vec<Candidate>) {
    let mut scored_pairs: Vec<(usize, i64, usize, usize)> = Vec::new();
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let a = &candidates[i];
            let b = &candidates[j];
            if a.username == b.username {
                continue;
            }
            let s = score(&a.interests, &b.interests);
            let tie_break = a.joined_at.min(b.joined_at);
            scored_pairs.push((s, tie_break, i, j));
        }
    }

    // Descending score, then ascending joined_at (older first).
    scored_pairs.sort_by(|x, y| y.0.cmp(&x.0).then_with(|| x.1.cmp(&y.1)));

    let mut matched = vec![false; candidates.len()];
    let mut pairs = Vec::new();
    for (s, _, i, j) in scored_pairs {
        if matched[i] || matched[j] {
            continue;
        }
        if in_cooldown(&candidates[i].id) || in_cooldown(&candidates[j].id) {
            continue;
        }
        matched[i] = true;
        matched[j] = true;
        pairs.push(MatchedPair {
            a: candidates[i].id.clone(),
            b: candidates[j].id.clone(),
            score: s,
        });
    }

    let remaining = candidates
        .iter()
        .enumerate()
        .filter(|(idx, _)| !matched[*idx])
        .map(|(_, c)| c.clone())
        .collect();

    (pairs, remaining)
}

/// Shuffles the remainder and pairs adjacent entries, still honoring
/// cooldown (spec.md §4.D step 6, "Random fallback"). Any candidate left
/// over (odd count, or blocked by cooldown) stays queued.
pub fn random_match(
    mut remaining: Vec<Candidate>,
    rng: &mut impl Rng,
    in_cooldown: impl Fn(&str) -> bool,
) -> (Vec<MatchedPair>, Vec<Candidate>) {
    remaining.shuffle(rng);

    let mut pairs = Vec::new();
    let mut still_queued = Vec::new();
    let mut iter = remaining.into_iter().peekable();

    while let Some(a) = iter.next() {
        if in_cooldown(&a.id) {
            still_queued.push(a);
            continue;
        }
        // Scan forward for the first partner not blocked by cooldown or a
        // repeated username; anything skipped over stays queued.
        let mut skipped = Vec::new();
        let mut partner = None;
        while let Some(candidate) = iter.peek() {
            if candidate.username == a.username || in_cooldown(&candidate.id) {
                skipped.push(iter.next().unwrap());
                continue;
            }
            partner = iter.next();
            break;
        }
        still_queued.extend(skipped);
        match partner {
            Some(b) => pairs.push(MatchedPair {
                a: a.id.clone(),
                b: b.id.clone(),
                score: 0,
            }),
            None => still_queued.push(a),
        }
    }

    (pairs, still_queued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn candidate(id: &str, username: &str, interests: &[&str], joined_at: i64) -> Candidate {
        Candidate {
            id: id.to_owned(),
            username: username.to_owned(),
            interests: interests.iter().map(|s| (*s).to_owned()).collect(),
            joined_at,
        }
    }

    #[test]
    fn common_interests_preserves_first_arg_order() {
        let a = vec!["music".to_owned(), "chess".to_owned(), "art".to_owned()];
        let b = vec!["art".to_owned(), "chess".to_owned()];
        assert_eq!(common_interests(&a, &b), vec!["chess", "art"]);
    }

    /// S1. Interest-match preference.
    #[test]
    fn greedy_match_prefers_highest_overlap_and_leaves_the_rest_queued() {
        let a = candidate("a", "alice", &["music", "chess"], 0);
        let b = candidate("b", "bob", &["chess", "art"], 1);
        let c = candidate("c", "carol", &["music", "chess"], 2);

        let (pairs, remaining) = greedy_match(&[a, b, c], |_| false);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].score, 2);
        assert!(
            (pairs[0].a == "a" && pairs[0].b == "c") || (pairs[0].a == "c" && pairs[0].b == "a")
        );
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b");
    }

    /// S2 / invariant 4: no pair shares a username, and no user is paired
    /// with themselves.
    #[test]
    fn greedy_match_excludes_shared_username_pairs() {
        let a = candidate("a1", "alice", &["music"], 0);
        let a2 = candidate("a2", "alice", &["music"], 1);
        let (pairs, remaining) = greedy_match(&[a, a2], |_| false);
        assert!(pairs.is_empty());
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn greedy_match_skips_pairs_with_a_cooldown_endpoint() {
        let a = candidate("a", "alice", &["music"], 0);
        let b = candidate("b", "bob", &["music"], 1);
        let (pairs, remaining) = greedy_match(&[a, b], |id| id == "a");
        assert!(pairs.is_empty());
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn greedy_match_breaks_score_ties_with_older_joined_at() {
        // b-c tie at score 1 with a-b also at score 1; a joined before b
        // and c, so a-b (older pair) should commit ahead of b-c.
        let a = candidate("a", "alice", &["music"], 0);
        let b = candidate("b", "bob", &["music", "chess"], 5);
        let c = candidate("c", "carol", &["chess"], 10);
        let (pairs, remaining) = greedy_match(&[a, b, c], |_| false);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a, "a");
        assert_eq!(pairs[0].b, "b");
        assert_eq!(remaining[0].id, "c");
    }

    /// S3. Random fallback: zero-overlap users still pair, with score 0.
    #[test]
    fn random_match_pairs_zero_overlap_users() {
        let a = candidate("a", "alice", &[], 0);
        let b = candidate("b", "bob", &[], 1);
        let mut rng = StdRng::seed_from_u64(7);
        let (pairs, remaining) = random_match(vec![a, b], &mut rng, |_| false);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].score, 0);
        assert!(remaining.is_empty());
    }

    #[test]
    fn random_match_leaves_odd_one_out_queued() {
        let a = candidate("a", "alice", &[], 0);
        let b = candidate("b", "bob", &[], 1);
        let c = candidate("c", "carol", &[], 2);
        let mut rng = StdRng::seed_from_u64(1);
        let (pairs, remaining) = random_match(vec![a, b, c], &mut rng, |_| false);
        assert_eq!(pairs.len(), 1);
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn random_match_respects_cooldown() {
        let a = candidate("a", "alice", &[], 0);
        let b = candidate("b", "bob", &[], 1);
        let mut rng = StdRng::seed_from_u64(3);
        let (pairs, remaining) = random_match(vec![a, b], &mut rng, |id| id == "b");
        assert!(pairs.is_empty());
        assert_eq!(remaining.len(), 2);
    }
}
