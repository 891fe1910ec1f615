use strsim::levenshtein;

/// Return up to 3 suggestions by edit distance. Case is ignored when
/// scoring, candidates are returned as spelled.
pub fn suggest(needle: &str, candidates: impl IntoIterator<Item = String>) -> Vec<String> {
    let needle = needle.trim();
    if needle.is_empty() {
        return vec![];
    }
    let folded = needle.to_ascii_lowercase();

    let mut scored: Vec<(usize, String)> = candidates
        .into_iter()
        .filter(|c| !c.is_empty() && c != needle)
        .map(|c| (levenshtein(&folded, &c.to_ascii_lowercase()), c))
        .collect();

    let max_dist = match needle.len() {
        0..=3 => 1,
        4..=6 => 2,
        7..=10 => 3,
        _ => 4,
    };

    scored.retain(|(d, _)| *d <= max_dist);
    scored.sort_by(|(da, a), (db, b)| da.cmp(db).then(a.len().cmp(&b.len())).then(a.cmp(b)));
    scored.dedup_by(|(_, a), (_, b)| a == b);

    scored.into_iter().take(3).map(|(_, s)| s).collect()
}

pub fn did_you_mean(needle: &str, candidates: impl IntoIterator<Item = String>) -> Option<String> {
    let v = suggest(needle, candidates);
    match v.len() {
        0 => None,
        1 => Some(format!("did you mean `{}`?", v[0])),
        _ => Some(format!(
            "did you mean one of: {}?",
            v.iter()
                .map(|s| format!("`{}`", s))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn close_names_are_suggested() {
        let got = did_you_mean("countr", names(&["counter", "total", "count"]));
        assert_eq!(got.as_deref(), Some("did you mean one of: `count`, `counter`?"));
    }

    #[test]
    fn far_names_are_not() {
        assert!(did_you_mean("x", names(&["alpha", "beta"])).is_none());
    }

    #[test]
    fn case_is_ignored_for_scoring() {
        assert_eq!(suggest("WRITETXT", names(&["WriteText"])), vec!["WriteText"]);
    }
}
