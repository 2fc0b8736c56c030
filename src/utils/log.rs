// src/utils/log.rs

//! Operator console output helpers.
//!
//! Run summaries are for humans watching a scheduled job; these helpers keep
//! that output consistent without dragging a formatting dependency in.
//! Diagnostics go through the `log` facade as usual.

/// Print a header line.
pub fn header(title: &str) {
    let border = "═".repeat(60);
    println!("{border}");
    println!("  {title}");
    println!("{border}");
}

/// Print a success message.
pub fn success(message: &str) {
    println!("{message}");
}

/// Print a sub-item (indented).
pub fn sub_item(message: &str) {
    println!("    {message}");
}

/// Print a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("[SUMMARY] {title}");
    for (key, value) in items {
        println!("    {key}: {value}");
    }
}
