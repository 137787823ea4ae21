/// Checks two strings for equivalence as slugs, without allocating.
///
/// Two slugs are equivalent when their ASCII alphanumeric characters match
/// pairwise (case-insensitively), while all other characters are ignored.
/// Under these rules, `"LOG_PATH"`, `"logPath"`, `"log-path"` and `"logpath"`
/// are all the same slug.
pub fn eq_as_slugs(a: &str, b: &str) -> bool {
    let mut iter_a = a.chars().filter(|&c| c.is_ascii_alphanumeric());
    let mut iter_b = b.chars().filter(|&c| c.is_ascii_alphanumeric());

    loop {
        match (iter_a.next(), iter_b.next()) {
            (Some(c1), Some(c2)) => {
                if !c1.eq_ignore_ascii_case(&c2) {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Looks up the field whose name or alias is equivalent (as a slug) to the
/// given key.
///
/// Intended for hand-written `serde` visitors, where each field is listed
/// along with all names it may appear under.
pub fn match_field<F: Copy>(key: &str, fields: &[(F, &[&str])]) -> Option<F> {
    fields
        .iter()
        .find(|(_, names)| names.iter().any(|name| eq_as_slugs(key, name)))
        .map(|(field, _)| *field)
}
