//! Purchaser name handling.

/// Placeholder replaced by the purchaser's name in command templates.
pub const PLAYER_TOKEN: &str = "%player%";

/// Strip line breaks and surrounding whitespace from a purchaser name.
///
/// Line breaks would let a name smuggle a second console command into the
/// template. Other characters pass through unchanged.
pub fn sanitize_player_name(name: &str) -> String {
    let stripped: String = name.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    stripped.trim().to_string()
}

/// Replace every `%player%` (any case) in `template` with `player`.
///
/// An empty name leaves the template untouched.
pub fn substitute_player(template: &str, player: &str) -> String {
    if player.is_empty() {
        return template.to_string();
    }

    let token = PLAYER_TOKEN.as_bytes();
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len() + player.len());
    let mut last = 0;
    let mut i = 0;

    // The token is ASCII, so a match always starts on a char boundary.
    while i + token.len() <= bytes.len() {
        if bytes[i..i + token.len()].eq_ignore_ascii_case(token) {
            out.push_str(&template[last..i]);
            out.push_str(player);
            i += token.len();
            last = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&template[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_line_breaks() {
        assert_eq!(sanitize_player_name("Ste/ve\r\nX"), "Ste/veX");
        assert_eq!(sanitize_player_name("  alice \n"), "alice");
        assert_eq!(sanitize_player_name("\r\n"), "");
    }

    #[test]
    fn test_substitute_any_case() {
        assert_eq!(
            substitute_player("give %player% diamond 1", "alice"),
            "give alice diamond 1"
        );
        assert_eq!(
            substitute_player("tell %PLAYER% thanks, %Player%!", "bob"),
            "tell bob thanks, bob!"
        );
    }

    #[test]
    fn test_substitute_sanitized_name() {
        let name = sanitize_player_name("Ste/ve\r\nX");
        assert_eq!(substitute_player("give %player% apple", &name), "give Ste/veX apple");
    }

    #[test]
    fn test_empty_name_is_noop() {
        assert_eq!(substitute_player("give %player% apple", ""), "give %player% apple");
    }

    #[test]
    fn test_multibyte_text_around_token() {
        assert_eq!(
            substitute_player("say ¡hola %player%! ✨", "Jörg"),
            "say ¡hola Jörg! ✨"
        );
        assert_eq!(substitute_player("%player", "x"), "%player");
    }
}
