use std::fmt::Write as _;

/// Renders rows as left-aligned text columns separated by two spaces.
pub fn render_table<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> String {
    let cell = |value: &str| value.replace(['\n', '\r', '\t'], " ");
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|h| cell(h.as_ref()).chars().count().max(3))
        .collect();
    for row in rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell(value).chars().count());
        }
    }

    let mut output = String::new();
    let mut push_line = |values: Vec<String>| {
        let padded = values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(output, "{}", padded.trim_end());
    };

    push_line(headers.iter().map(|h| cell(h.as_ref())).collect());
    push_line(widths.iter().map(|w| "-".repeat(*w)).collect());
    for row in rows {
        push_line(row.iter().map(|value| cell(value)).collect());
    }
    output
}
