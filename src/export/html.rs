//! Printable HTML summary built from a compiled record.

use crate::record::Record;
use crate::sections::analyze::ChecklistFlags;
use crate::sections::apply_design::DesignTable;

pub const DASH: &str = "—";

/// Header and details values shared by both export formats.
#[derive(Debug, Clone)]
pub struct DocumentHead<'a> {
    pub title: &'a str,
    pub subtitle: &'a str,
    pub course: &'a str,
    pub assignment: &'a str,
    pub salt: &'a str,
    pub doc_id: &'a str,
    pub device: &'a str,
    pub time: &'a str,
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Re-join a comma list with single spaces, dropping empty entries.
fn escape_list(s: &str) -> String {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(escape_html)
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        DASH
    } else {
        s
    }
}

/// `course — assignment • name • section • time`
/// Unescaped; `header_line` is the markup form.
pub fn header_text(record: &Record, head: &DocumentHead<'_>) -> String {
    format!(
        "{} {DASH} {} • {} • {} • {}",
        head.course,
        head.assignment,
        record.meta.student_name,
        or_dash(&record.meta.class_section),
        head.time,
    )
}

pub fn header_line(record: &Record, head: &DocumentHead<'_>) -> String {
    escape_html(&header_text(record, head))
}

pub fn details_line(head: &DocumentHead<'_>) -> String {
    format!(
        "Salt: {} • Doc ID: {} • Device: {}",
        escape_html(head.salt),
        escape_html(head.doc_id),
        escape_html(head.device),
    )
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "YES"
    } else {
        "NO"
    }
}

fn checklist_item(label: &str, f: &ChecklistFlags) -> String {
    format!(
        "<li><b>{label}</b> {DASH} Dup: <b>{}</b>, Red: <b>{}</b>, Inc: <b>{}</b>, No IDs: <b>{}</b></li>",
        yes_no(f.dup),
        yes_no(f.red),
        yes_no(f.inc),
        yes_no(f.id),
    )
}

fn card(title: &str, body: &str, wide: bool) -> String {
    let style = if wide { r#" style="grid-column:1 / -1;""# } else { "" };
    format!(r#"<div class="card"{style}><div class="title">{title}</div>{body}</div>"#)
}

fn identity_card(record: &Record) -> String {
    let body = format!(
        r#"<ul><li>Name: <b>{}</b></li><li>Section: <b>{}</b></li><li class="muted">Date: {}</li></ul>"#,
        escape_html(or_dash(&record.meta.student_name)),
        escape_html(or_dash(&record.meta.class_section)),
        escape_html(&record.meta.today),
    );
    card("Identity (Welcome)", &body, false)
}

fn propose_card(record: &Record) -> String {
    let items: String = record
        .propose
        .solutions
        .iter()
        .map(|s| format!("<li>{}</li>", escape_html(s)))
        .collect();
    let body = if items.is_empty() {
        format!("<ul><li>{DASH}</li></ul>")
    } else {
        format!("<ul>{items}</ul>")
    };
    card("Propose (Selected)", &body, false)
}

fn analyze_card(record: &Record) -> String {
    let body = format!(
        "<ul>{}{}</ul>",
        checklist_item("Workshops", &record.analyze.workshops),
        checklist_item("Registrations", &record.analyze.registrations),
    );
    card("Analyze", &body, false)
}

fn apply_card(record: &Record) -> String {
    let s = &record.apply.summaries;
    // The instructor table has no PK summary.
    let rows = [
        (DesignTable::Attendee, s.attendee_pk.as_str(), s.attendee_fields.as_str()),
        (DesignTable::Instructor, DASH, s.instructor_fields.as_str()),
        (DesignTable::Workshop, s.workshop_pk.as_str(), s.workshop_fields.as_str()),
        (DesignTable::Registration, s.reg_pk.as_str(), s.reg_fields.as_str()),
    ];
    let items: String = rows
        .iter()
        .map(|(which, pk, fields)| {
            let fields = if fields.is_empty() {
                DASH.to_string()
            } else {
                escape_list(fields)
            };
            format!(
                "<li><b>{}</b> • PK: <b>{}</b> {DASH} {}</li>",
                escape_html(record.apply.name(*which)),
                escape_html(or_dash(pk)),
                fields,
            )
        })
        .collect();
    card("Apply (4 Tables)", &format!("<ul>{items}</ul>"), false)
}

fn m2m_card(record: &Record) -> String {
    let items: String = record
        .m2m
        .tables
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            let name = if t.name.is_empty() {
                format!("Table {}", idx + 1)
            } else {
                t.name.clone()
            };
            let cols = if t.rows.is_empty() {
                DASH.to_string()
            } else {
                t.rows
                    .iter()
                    .map(|r| {
                        let mut cell = escape_html(or_dash(&r.column_name));
                        if r.is_primary_key {
                            cell.push_str(" <b>[PK]</b>");
                        }
                        if r.is_foreign_key {
                            cell.push_str(" <b>[FK]</b>");
                        }
                        cell
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!("<li><b>{}</b><br/>{cols}</li>", escape_html(&name))
        })
        .collect();
    let body = if items.is_empty() {
        format!("<ul><li>{DASH}</li></ul>")
    } else {
        format!("<ul>{items}</ul>")
    };
    card("M2M Redesign (5 Tables)", &body, true)
}

const STYLE: &str = "@page{size:Letter;margin:12mm}\
body{font-family:ui-sans-serif,system-ui,sans-serif;margin:0;font-size:12px;color:#0f172a}\
h1{font-size:18px;margin:0 0 2px}h2{font-size:14px;margin:0 0 8px;color:#334155}\
.meta{font-size:11px;color:#475569;margin:2px 0 10px}.meta small{color:#64748b}\
.grid{display:grid;grid-template-columns:1fr 1fr;gap:10px}\
.card{border:1px solid #e2e8f0;border-radius:10px;padding:8px;break-inside:avoid}\
.title{font-weight:600;margin:0 0 6px}ul{margin:0;padding-left:16px}.muted{color:#64748b}";

pub fn render(record: &Record, head: &DocumentHead<'_>) -> String {
    let cards = [
        identity_card(record),
        propose_card(record),
        analyze_card(record),
        apply_card(record),
        m2m_card(record),
    ]
    .concat();
    format!(
        concat!(
            r#"<!doctype html><html><head><meta charset="utf-8"><title>{assignment} Summary</title>"#,
            "<style>{style}</style></head><body>",
            "<h1>{title}</h1><h2>{subtitle}</h2>",
            r#"<div class="meta">{header}<br/><small>{details}</small></div>"#,
            r#"<div class="grid">{cards}</div>"#,
            "<script>window.focus&&window.focus();setTimeout(function(){{window.print()}},150);</script>",
            "</body></html>"
        ),
        assignment = escape_html(head.assignment),
        style = STYLE,
        title = escape_html(head.title),
        subtitle = escape_html(head.subtitle),
        header = header_line(record, head),
        details = details_line(head),
        cards = cards,
    )
}
