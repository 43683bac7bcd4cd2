//! Warning, roster and memo administration pages

use axum::response::Html;
use trackr_common::db::{PeriodMemo, Warning};
use trackr_common::RosterEntry;

use super::{escape, layout};
use crate::session::Flash;

/// A warning with its local-time display fields
pub struct WarningRow {
    pub warning: Warning,
    /// `active`, `expired` or `inactive`
    pub status: &'static str,
    pub issued: String,
    pub expires: String,
}

pub fn warnings_page(rows: &[WarningRow], default_days: i64, flashes: &[Flash]) -> Html<String> {
    let table_rows: String = rows
        .iter()
        .map(|row| {
            let w = &row.warning;
            let deactivate = if row.status == "active" {
                format!(
                    r#"<form method="post" action="/admin/warnings/{}/deactivate" class="inline"><button type="submit">Lift</button></form>"#,
                    w.id
                )
            } else {
                String::new()
            };
            format!(
                r#"<tr class="status-{status}">
    <td>{student_id}</td><td>{name}</td><td>{reason}</td><td>{issued}</td><td>{expires}</td><td>{status}</td>
    <td>{deactivate}
        <form method="post" action="/admin/warnings/{id}/delete" class="inline"><button type="submit" class="danger">Delete</button></form>
    </td>
</tr>"#,
                status = row.status,
                student_id = escape(&w.student_id),
                name = escape(&w.student_name),
                reason = escape(&w.reason),
                issued = escape(&row.issued),
                expires = escape(&row.expires),
                deactivate = deactivate,
                id = w.id,
            )
        })
        .collect();

    let body = format!(
        r#"<form method="post" action="/admin/warnings/add" class="filters">
    <label>Student ID <input type="text" name="student_id" required></label>
    <label>Days <input type="number" name="days" min="1" max="{max_days}" value="{days}"></label>
    <label>Reason <input type="text" name="reason"></label>
    <button type="submit">Issue warning</button>
</form>
<table>
    <thead><tr><th>Student ID</th><th>Name</th><th>Reason</th><th>Issued</th><th>Expires</th><th>Status</th><th></th></tr></thead>
    <tbody>{rows}</tbody>
</table>
<form method="post" action="/admin/warnings/delete_all">
    <button type="submit" class="danger" onclick="return confirm('Delete every warning?')">Delete all warnings</button>
</form>"#,
        days = default_days,
        max_days = crate::api::MAX_WARNING_DAYS,
        rows = table_rows,
    );

    layout("Warnings", flashes, true, &body)
}

pub fn students_page(entries: &[RosterEntry], flashes: &[Flash]) -> Html<String> {
    let rows: String = entries
        .iter()
        .map(|e| {
            format!(
                r#"<tr>
    <td>{id}</td><td>{name}</td>
    <td><form method="post" action="/update_seat" class="inline">
        <input type="hidden" name="student_id" value="{id}">
        <input type="text" name="seat" value="{seat}" size="6">
        <button type="submit">Save</button>
    </form></td>
    <td><button type="button" class="danger" data-delete="{id}">Remove</button></td>
</tr>"#,
                id = escape(&e.student_id),
                name = escape(&e.name),
                seat = escape(&e.seat),
            )
        })
        .collect();

    let body = format!(
        r#"<p>{count} students on the roster.</p>
<section>
<h2>Add student</h2>
<form id="add-student" class="filters">
    <label>Student ID <input type="text" name="student_id" required></label>
    <label>Name <input type="text" name="name" required></label>
    <label>Seat <input type="text" name="seat"></label>
    <button type="submit">Add</button>
</form>
<h2>Bulk update</h2>
<p class="muted">One change per line: <code>student_id,new_seat[,new_name]</code></p>
<form id="bulk-update">
    <textarea name="changes" rows="5" cols="40"></textarea>
    <button type="submit">Apply</button>
</form>
<p id="api-result"></p>
</section>
<table>
    <thead><tr><th>Student ID</th><th>Name</th><th>Seat</th><th></th></tr></thead>
    <tbody>{rows}</tbody>
</table>
<script>
async function postJson(url, payload) {{
    const response = await fetch(url, {{
        method: 'POST',
        headers: {{ 'Content-Type': 'application/json' }},
        body: JSON.stringify(payload),
    }});
    const data = await response.json();
    document.getElementById('api-result').textContent = data.message || data.error;
    if (response.ok) setTimeout(() => location.reload(), 800);
}}
document.getElementById('add-student').addEventListener('submit', (event) => {{
    event.preventDefault();
    const form = new FormData(event.target);
    postJson('/api/add_direct_student', Object.fromEntries(form.entries()));
}});
document.getElementById('bulk-update').addEventListener('submit', (event) => {{
    event.preventDefault();
    const text = new FormData(event.target).get('changes');
    const changes = text.split('\n').map(l => l.trim()).filter(l => l).map(l => {{
        const [student_id, new_seat, new_name] = l.split(',').map(v => v.trim());
        return {{ student_id, new_seat: new_seat || null, new_name: new_name || null }};
    }});
    postJson('/api/bulk_update_seats', {{ changes }});
}});
document.querySelectorAll('[data-delete]').forEach((button) => {{
    button.addEventListener('click', () => {{
        if (confirm('Remove ' + button.dataset.delete + ' from the roster?')) {{
            postJson('/api/delete_student', {{ student_id: button.dataset.delete }});
        }}
    }});
}});
</script>"#,
        count = entries.len(),
        rows = rows,
    );

    layout("Students", flashes, true, &body)
}

pub struct MemoView {
    pub date: String,
    /// `(period label, current memo text)` for every period of the day
    pub slots: Vec<(String, String)>,
    pub recent: Vec<PeriodMemo>,
    pub flashes: Vec<Flash>,
}

pub fn memos_page(view: &MemoView) -> Html<String> {
    let date = escape(&view.date);
    let slots: String = view
        .slots
        .iter()
        .map(|(label, text)| {
            format!(
                r#"<form method="post" action="/admin/memos" class="memo">
    <input type="hidden" name="date" value="{date}">
    <input type="hidden" name="period" value="{label}">
    <label>{label} <textarea name="memo_text" rows="2" cols="50">{text}</textarea></label>
    <button type="submit">Save</button>
</form>"#,
                date = date,
                label = escape(label),
                text = escape(text),
            )
        })
        .collect();

    let recent: String = view
        .recent
        .iter()
        .map(|m| {
            format!(
                r#"<tr><td><a href="/admin/memos?date={d}">{d}</a></td><td>{}</td><td>{}</td></tr>"#,
                escape(&m.period),
                escape(&m.memo_text),
                d = escape(&m.date),
            )
        })
        .collect();

    let body = format!(
        r#"<form method="get" action="/admin/memos" class="filters">
    <label>Date <input type="date" name="date" value="{date}"></label>
    <button type="submit">Open</button>
</form>
{slots}
<h2>Recent memos</h2>
<table><thead><tr><th>Date</th><th>Period</th><th>Memo</th></tr></thead><tbody>{recent}</tbody></table>"#,
        date = date,
        slots = slots,
        recent = recent,
    );

    layout("Period Memos", &view.flashes, true, &body)
}
