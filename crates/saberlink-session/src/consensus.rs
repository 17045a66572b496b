//! Majority-vote level consensus.
//!
//! A level "wins" when strictly more than half of all registered players
//! (pending ones included) have chosen it:
//!
//! ```text
//! threshold = floor(players / 2) + 1      (no players → never satisfied)
//! ```
//!
//! Tie-break: the highest count wins; between equal counts, the level whose
//! first holder comes first in iteration order wins. A strict majority can
//! only be held by one level, so this only decides which candidate is
//! tested, never the outcome. The cover is taken from the first holder,
//! in iteration order, whose record has a non-empty cover URL.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::PlayerSession;

/// Cover URL of the level a strict majority of `sessions` chose, if any.
///
/// Players with no level (or an empty URL) still count toward the total.
pub fn majority_level_cover<'a, I>(sessions: I) -> Option<String>
where
    I: IntoIterator<Item = &'a PlayerSession>,
{
    let sessions: Vec<&PlayerSession> = sessions.into_iter().collect();
    if sessions.is_empty() {
        return None;
    }
    let threshold = sessions.len() / 2 + 1;

    // url -> (first seen at, count). The first-seen index keeps ties
    // resolving the same way every time.
    let mut tally: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (index, url) in sessions
        .iter()
        .filter_map(|s| s.chosen_level.as_ref())
        .map(|level| level.url.as_str())
        .filter(|url| !url.is_empty())
        .enumerate()
    {
        tally.entry(url).or_insert((index, 0)).1 += 1;
    }

    let leader = tally
        .into_iter()
        .min_by_key(|&(_, (first, count))| (Reverse(count), first))
        .map(|(url, (_, count))| (url, count));

    let (url, count) = leader?;
    if count < threshold {
        return None;
    }

    sessions
        .iter()
        .filter_map(|s| s.chosen_level.as_ref())
        .find(|level| level.url == url && !level.cover_url.is_empty())
        .map(|level| level.cover_url.clone())
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::{ChosenLevel, SessionRegistry};

    /// Builds a registry where player `i` chose `levels[i]` (`None` = no pick).
    fn registry_with(levels: &[Option<&str>]) -> SessionRegistry {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        for (i, level) in levels.iter().enumerate() {
            let name = format!("p{i:02}");
            reg.upsert(&name, "t", now);
            if let Some(url) = level {
                reg.set_chosen_level(
                    &name,
                    "t",
                    ChosenLevel {
                        url: url.to_string(),
                        cover_url: format!("{url}.jpg"),
                    },
                )
                .unwrap();
            }
        }
        reg
    }

    #[test]
    fn test_empty_registry_has_no_majority() {
        let reg = SessionRegistry::new();
        assert_eq!(majority_level_cover(reg.all()), None);
    }

    #[test]
    fn test_three_of_four_is_majority() {
        let reg = registry_with(&[Some("U"), Some("U"), Some("V"), Some("U")]);
        assert_eq!(majority_level_cover(reg.all()), Some("U.jpg".into()));
    }

    #[test]
    fn test_two_of_four_is_not_majority() {
        let reg = registry_with(&[Some("U"), Some("U"), Some("V"), Some("V")]);
        assert_eq!(majority_level_cover(reg.all()), None);
    }

    #[test]
    fn test_players_without_a_level_count_toward_total() {
        let reg = registry_with(&[Some("U"), Some("U"), None, None, None]);
        assert_eq!(majority_level_cover(reg.all()), None);

        let reg = registry_with(&[Some("U"), Some("U"), Some("U"), None, None]);
        assert_eq!(majority_level_cover(reg.all()), Some("U.jpg".into()));
    }

    #[test]
    fn test_single_player_with_level_is_majority() {
        let reg = registry_with(&[Some("U")]);
        assert_eq!(majority_level_cover(reg.all()), Some("U.jpg".into()));
    }

    #[test]
    fn test_single_player_without_level_has_no_majority() {
        let reg = registry_with(&[None]);
        assert_eq!(majority_level_cover(reg.all()), None);
    }

    #[test]
    fn test_tally_scales_to_large_lobbies() {
        let levels: Vec<Option<&str>> = (0..2000)
            .map(|i| if i % 3 == 0 { Some("V") } else { Some("U") })
            .collect();
        let reg = registry_with(&levels);
        assert_eq!(majority_level_cover(reg.all()), Some("U.jpg".into()));
    }

    #[test]
    fn test_empty_url_never_wins() {
        let reg = registry_with(&[Some(""), Some(""), Some("")]);
        assert_eq!(majority_level_cover(reg.all()), None);
    }

    /// Property: for N players with k on the same level, a cover is
    /// attached iff k >= N/2 + 1.
    #[test]
    fn test_majority_threshold_holds_for_all_small_sizes() {
        for n in 1..=9usize {
            for k in 0..=n {
                let levels: Vec<Option<&str>> = (0..n)
                    .map(|i| if i < k { Some("U") } else { None })
                    .collect();
                let reg = registry_with(&levels);

                let expected = k >= n / 2 + 1;
                assert_eq!(
                    majority_level_cover(reg.all()).is_some(),
                    expected,
                    "n={n} k={k}"
                );
            }
        }
    }
}
