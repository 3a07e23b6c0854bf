//! Formatting utilities used for CLI output.

use crate::models::attendance::Condition;
use crate::utils::colors::{GREEN, GREY, RED, RESET, YELLOW};

pub fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}

/// Short label + ANSI color for an attendance condition.
pub fn describe_condition(c: Option<Condition>) -> (String, &'static str) {
    match c {
        Some(Condition::OnTime) => ("On time".into(), GREEN),
        Some(Condition::Late) => ("Late".into(), YELLOW),
        Some(Condition::Incomplete) => ("Incomplete".into(), YELLOW),
        Some(Condition::Absent) => ("Absent".into(), RED),
        None => ("--".into(), GREY),
    }
}

pub fn colorize_condition(c: Option<Condition>) -> String {
    let (label, color) = describe_condition(c);
    format!("{color}{label}{RESET}")
}

pub fn percentage(value: u32) -> String {
    let color = if value >= 90 {
        GREEN
    } else if value >= 70 {
        YELLOW
    } else {
        RED
    };
    format!("{color}{value}%{RESET}")
}
