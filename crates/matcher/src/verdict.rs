/// Drop verdicts naming anything outside the offered set.
///
/// Defends against the oracle referencing names from its own hallucination
/// or prior context: a verdict is only valid if the batch actually
/// contained it.
pub fn filter_to_offered(verdicts: Vec<String>, offered: &[String]) -> Vec<String> {
    let (kept, dropped): (Vec<String>, Vec<String>) = verdicts
        .into_iter()
        .partition(|verdict| offered.iter().any(|name| name == verdict));
    if !dropped.is_empty() {
        log::warn!("Discarding verdicts not offered in batch: {dropped:?}");
    }
    kept
}

/// Union verdicts across batches, keeping the first occurrence of each name.
pub fn dedup_preserving_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let out = dedup_preserving_order(strings(&["b", "a", "b", "c"]));
        assert_eq!(out, strings(&["b", "a", "c"]));
    }

    #[test]
    fn filter_drops_names_outside_the_batch() {
        let offered = strings(&["guides", "reference"]);
        let out = filter_to_offered(strings(&["guides", "made-up", "reference"]), &offered);
        assert_eq!(out, strings(&["guides", "reference"]));
    }

    #[test]
    fn filter_of_empty_verdicts_is_empty() {
        let offered = strings(&["guides"]);
        assert_eq!(filter_to_offered(vec![], &offered), Vec::<String>::new());
    }
}
