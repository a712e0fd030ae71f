//! Outbound frame formats
//!
//! All frames are plain text. System notifications start with a fixed
//! marker prefix and end with the member count after a literal phrase;
//! clients parse the count by pattern-matching on that exact phrase, so
//! the wording below is part of the wire contract.

/// Marker prefix for system notifications
pub const SYSTEM_PREFIX: &str = "SYS: ";

/// System notification broadcast when a member joins a room
pub fn joined_line(username: &str, count: usize) -> String {
    format!("{SYSTEM_PREFIX}{username} joined. Users in room: {count}")
}

/// System notification broadcast when a member leaves a room
pub fn left_line(username: &str, count: usize) -> String {
    format!("{SYSTEM_PREFIX}{username} left. Users in room: {count}")
}

/// Chat frame, delivered verbatim to every member including the sender
pub fn chat_line(username: &str, body: &str) -> String {
    format!("[{username}] {body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_line_literal() {
        assert_eq!(joined_line("Alice", 3), "SYS: Alice joined. Users in room: 3");
    }

    #[test]
    fn test_left_line_literal() {
        assert_eq!(left_line("Bob1", 0), "SYS: Bob1 left. Users in room: 0");
    }

    #[test]
    fn test_chat_line_literal() {
        assert_eq!(chat_line("Alice", "hello there"), "[Alice] hello there");
    }

    #[test]
    fn test_system_lines_carry_prefix() {
        assert!(joined_line("x", 1).starts_with(SYSTEM_PREFIX));
        assert!(left_line("x", 1).starts_with(SYSTEM_PREFIX));
        assert!(!chat_line("x", "y").starts_with(SYSTEM_PREFIX));
    }
}
