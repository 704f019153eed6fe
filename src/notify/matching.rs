//! Store-name matching. Users type favorite store names freely ("Kiwi") and
//! price submissions carry whatever the submitter picked ("Kiwi Majorstuen"),
//! so matching is case-insensitive, trimmed, symmetric substring containment.
//! Deliberately loose; tightening it is an open product question.

pub(crate) fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn fuzzy_match(submitted: &str, favorite: &str) -> bool {
    let submitted = normalize(submitted);
    let favorite = normalize(favorite);
    if submitted.is_empty() || favorite.is_empty() {
        return false;
    }
    submitted.contains(&favorite) || favorite.contains(&submitted)
}

pub(crate) fn matches_any(submitted: &str, favorites: &[String]) -> bool {
    favorites
        .iter()
        .any(|favorite| fuzzy_match(submitted, favorite))
}
