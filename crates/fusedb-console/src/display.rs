use fusedb_core::{Rows, Value};

/// Render a result cursor as an aligned text table and return the row
/// count.
pub fn print_rows(rows: Rows) -> usize {
    let headers: Vec<String> = rows.columns().iter().map(|c| c.name.clone()).collect();
    let decoded: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(render_value).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in &decoded {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    print_line(&headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    print_line(&rule, &widths);
    for row in &decoded {
        print_line(row, &widths);
    }
    decoded.len()
}

fn render_value(value: &Value) -> String {
    value.to_string()
}

fn print_line(cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect();
    println!("| {} |", padded.join(" | "));
}
