/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Returns GREY when the field is empty (None or "" or "--:--"),
/// and RESET otherwise.
pub fn color_for_optional_field<T: AsRef<str>>(value: Option<T>) -> &'static str {
    match value {
        Some(v) if !v.as_ref().trim().is_empty() && v.as_ref() != "--:--" => RESET,
        _ => GREY,
    }
}

pub fn colorize_optional(value: Option<&str>) -> String {
    let color = color_for_optional_field(value);
    format!("{color}{}{RESET}", value.unwrap_or("--:--"))
}

/// Reachability color: green when reachable, red otherwise.
pub fn color_for_reachable(ok: bool) -> &'static str {
    if ok { GREEN } else { RED }
}
