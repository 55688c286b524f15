use std::fmt::Display;

use crate::terminal::colors;
use colored::*;
use tracing::info;

pub const TOTAL_WIDTH: usize = 64;
const KEY_WIDTH: usize = 16;

pub fn print(msg: &str) {
    info!(target: "gscn::print", raw_msg = msg);
}

pub fn header(msg: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }

    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = console::measure_text_width(&formatted);

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().color(colors::PRIMARY),
        "─".repeat(right)
    )
    .color(colors::SEPARATOR);

    print(&line.to_string());
}

pub fn fat_separator() {
    print(&"═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
}

pub fn aligned_line<V: Display>(key: &str, value: V) {
    let dots: String = ".".repeat((KEY_WIDTH + 1).saturating_sub(key.len()));
    let colon: String = format!("{}{}", dots.color(colors::SEPARATOR), ":".color(colors::SEPARATOR));
    print_status(format!(
        "{}{} {}",
        key.color(colors::PRIMARY),
        colon,
        value.to_string().color(colors::TEXT_DEFAULT)
    ));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    print(&format!("{} {}", prefix, msg.as_ref().color(colors::TEXT_DEFAULT)));
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{}{}", space, msg));
}

/// Boxed table sized to its widest cell per column.
pub fn table<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) {
    print_lines(&render_table(headers, rows));
}

fn print_lines(lines: &[String]) {
    for line in lines {
        print(line);
    }
}

fn render_table<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| console::measure_text_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(console::measure_text_width(cell.as_ref()));
        }
    }

    let border = |left: &str, mid: &str, right: &str| -> String {
        let spans: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{left}{}{right}", spans.join(mid))
            .color(colors::SEPARATOR)
            .to_string()
    };

    let titles: Vec<String> = headers
        .iter()
        .map(|h| h.color(colors::PRIMARY).bold().to_string())
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 4);
    lines.push(border("┌", "┬", "┐"));
    lines.push(table_row(&titles, &widths));
    lines.push(border("├", "┼", "┤"));
    lines.extend(rows.iter().map(|row| table_row(row, &widths)));
    lines.push(border("└", "┴", "┘"));
    lines
}

fn table_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let bar: String = "│".color(colors::SEPARATOR).to_string();
    let body: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let cell = cell.as_ref();
            let pad = width.saturating_sub(console::measure_text_width(cell));
            format!(" {cell}{} ", " ".repeat(pad))
        })
        .collect();
    format!("{bar}{}{bar}", body.join(&bar))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
