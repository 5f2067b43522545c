//! Terminal formatting: headers, aligned tables, numbers and currency.

use serde::Serialize;

use crate::colors;

/// Compact AED amount: `AED 1.23M`, `AED 4.5K`, `AED 12.00`.
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("AED {sign}{}", scaled(value.abs(), 2))
}

/// Compact count: `1.23M`, `4.5K`, `999`.
pub fn format_number(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    if abs >= 1_000.0 {
        format!("{sign}{}", scaled(abs, 0))
    } else {
        format!("{sign}{abs:.0}")
    }
}

fn scaled(abs: f64, decimals: usize) -> String {
    if abs >= 1_000_000.0 {
        format!("{:.2}M", abs / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}K", abs / 1_000.0)
    } else {
        format!("{abs:.decimals$}")
    }
}

pub fn format_pct(value: f64) -> String {
    format!("{value:.1}%")
}

/// Print a bold section title with an optional dimmed subtitle.
pub fn print_header(title: &str, subtitle: Option<&str>) {
    match subtitle {
        Some(subtitle) => println!(
            "\n{}{}{} {}{}{}",
            colors::BOLD,
            title,
            colors::RESET,
            colors::DIM,
            subtitle,
            colors::RESET
        ),
        None => println!("\n{}{}{}", colors::BOLD, title, colors::RESET),
    }
    println!("{}", "─".repeat(50));
}

/// Print `label: value` with the label padded to `width`.
pub fn print_field(label: &str, value: impl std::fmt::Display, width: usize) {
    println!("  {}{label:<width$}{} {value}", colors::CYAN, colors::RESET);
}

/// Print rows under a header, each column padded to its widest cell.
///
/// Columns after the first are right-aligned.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .enumerate()
        .map(|(i, (h, w))| align(h, *w, i == 0))
        .collect();
    println!("  {}{}{}", colors::BOLD, header.join("  "), colors::RESET);

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, w))| align(cell, *w, i == 0))
            .collect();
        println!("  {}", cells.join("  "));
    }

    if rows.is_empty() {
        println!("  {}(no rows){}", colors::DIM, colors::RESET);
    }
}

fn align(text: &str, width: usize, left: bool) -> String {
    if left {
        format!("{text:<width$}")
    } else {
        format!("{text:>width$}")
    }
}

/// Print any report as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a yellow warning on stderr.
pub fn warn(message: impl std::fmt::Display) {
    eprintln!("{}warning:{} {message}", colors::YELLOW, colors::RESET);
}

/// Print a green completion line.
pub fn done(message: impl std::fmt::Display) {
    println!("\n{}Done{} {message}", colors::GREEN, colors::RESET);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_scales() {
        assert_eq!(format_currency(1_234_567.0), "AED 1.23M");
        assert_eq!(format_currency(4_500.0), "AED 4.5K");
        assert_eq!(format_currency(12.0), "AED 12.00");
        assert_eq!(format_currency(-2_500.0), "AED -2.5K");
    }

    #[test]
    fn test_number_scales() {
        assert_eq!(format_number(2_000_000.0), "2.00M");
        assert_eq!(format_number(1_500.0), "1.5K");
        assert_eq!(format_number(999.4), "999");
    }

    #[test]
    fn test_alignment() {
        assert_eq!(align("ab", 4, true), "ab  ");
        assert_eq!(align("ab", 4, false), "  ab");
    }
}
