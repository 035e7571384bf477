use strsim::levenshtein;

use super::lexer::VARIABLE_QUOTE;

/// Return up to 3 visible names close to `needle` by edit distance.
pub fn suggest(needle: &str, candidates: impl IntoIterator<Item = String>) -> Vec<String> {
    if needle.is_empty() {
        return vec![];
    }

    let mut scored: Vec<(usize, String)> = candidates
        .into_iter()
        .filter(|c| !c.is_empty() && c != needle)
        .map(|c| (levenshtein(needle, &c), c))
        .collect();

    // Names are usually a few kana or kanji, so distances are counted in chars.
    let max_dist = match needle.chars().count() {
        0..=2 => 1,
        3..=6 => 2,
        _ => 3,
    };

    scored.retain(|(d, _)| *d <= max_dist);
    scored.sort_by(|(da, a), (db, b)| da.cmp(db).then(a.len().cmp(&b.len())).then(a.cmp(b)));
    scored.dedup_by(|(_, a), (_, b)| a == b);

    scored.into_iter().take(3).map(|(_, s)| s).collect()
}

pub fn did_you_mean(needle: &str, candidates: impl IntoIterator<Item = String>) -> Option<String> {
    let quote = |s: &String| format!("{VARIABLE_QUOTE}{s}{VARIABLE_QUOTE}");
    let v = suggest(needle, candidates);
    match v.len() {
        0 => None,
        1 => Some(format!("did you mean {}?", quote(&v[0]))),
        _ => Some(format!(
            "did you mean one of: {}?",
            v.iter().map(quote).collect::<Vec<_>>().join(", ")
        )),
    }
}
