/// URL-friendly form of a product name.
///
/// Lowercases ASCII letters, keeps alphanumerics and collapses every other run
/// of characters into a single `-`. Leading and trailing separators are dropped.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_joins_words() {
        assert_eq!(slugify("Blue Ceramic Vase"), "blue-ceramic-vase");
    }

    #[test]
    fn collapses_punctuation_runs_and_trims() {
        assert_eq!(slugify("  Hand--made!! (large)  "), "hand-made-large");
    }

    #[test]
    fn empty_for_symbols_only() {
        assert_eq!(slugify("!!!"), "");
    }
}
