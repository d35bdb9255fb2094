/// Canonical form of a category string.
///
/// Shared by the cleaning step, the dataset loader and the inference
/// boundary so encoders only ever see one spelling of each category:
/// surrounding whitespace is removed, inner whitespace runs collapse to a
/// single space and the result is lowercased.
pub fn normalize_category(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_are_folded() {
        assert_eq!(normalize_category("  Cash "), "cash");
        assert_eq!(normalize_category("SUV"), "suv");
        assert_eq!(normalize_category("Prime\t  Sedan"), "prime sedan");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["Sedan", " mini ", "UPI  Online", ""] {
            let once = normalize_category(raw);
            assert_eq!(normalize_category(&once), once);
        }
    }
}
