use once_cell::sync::Lazy;
use regex::Regex;

/// Repairs UTF-8 text that was decoded as latin-1 somewhere upstream
/// (`"cafÃ©"` becomes `"café"`).
///
/// The string is re-encoded as latin-1 bytes and decoded as UTF-8. Input that
/// is not representable in latin-1, or whose bytes are not valid UTF-8, is
/// returned unchanged.
pub fn fix_latin1_string(input: &str) -> String {
    let mut bytes = Vec::with_capacity(input.len());
    for ch in input.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(byte) => bytes.push(byte),
            Err(_) => return input.to_string(),
        }
    }

    String::from_utf8(bytes).unwrap_or_else(|_| input.to_string())
}

static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("parenthesized pattern compiles"));

/// Removes parenthesized annotations, e.g. the zone name in
/// `"Thu Aug 10 2023 13:13:35 GMT+0200 (Central European Summer Time)"`.
pub fn strip_parenthesized(input: &str) -> String {
    PARENTHESIZED.replace_all(input, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_mojibake() {
        assert_eq!(fix_latin1_string("cafÃ©"), "café");
        assert_eq!(fix_latin1_string("plain ascii"), "plain ascii");
    }

    #[test]
    fn leaves_non_latin1_input_alone() {
        assert_eq!(fix_latin1_string("emoji 🎉"), "emoji 🎉");
        assert_eq!(fix_latin1_string("café"), "café");
    }

    #[test]
    fn strips_zone_annotation() {
        assert_eq!(
            strip_parenthesized("Thu Aug 10 2023 13:13:35 GMT+0200 (Central European Summer Time)"),
            "Thu Aug 10 2023 13:13:35 GMT+0200"
        );
        assert_eq!(strip_parenthesized("no annotation"), "no annotation");
        assert_eq!(strip_parenthesized("(note) 2023-06-02 (local)"), "2023-06-02");
    }
}
