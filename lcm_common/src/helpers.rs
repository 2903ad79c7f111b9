/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// A user id is a guest id if it is missing, blank, the literal "null", or carries the `guest` prefix that
/// the storefront assigns to anonymous checkouts.
pub fn is_guest_id(user_id: &str) -> bool {
    let id = user_id.trim();
    id.is_empty() || id == "null" || id == "guest" || id.starts_with("guest_")
}
