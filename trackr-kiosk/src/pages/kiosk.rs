//! Student-facing kiosk page

use axum::response::Html;

use super::{escape, layout};
use crate::session::Flash;

pub struct KioskView {
    pub now_display: String,
    pub period_display: String,
    pub periods: Vec<(u8, String)>,
    pub flashes: Vec<Flash>,
    pub is_admin: bool,
}

pub fn kiosk_page(view: &KioskView) -> Html<String> {
    let schedule: String = view
        .periods
        .iter()
        .map(|(n, window)| format!("<li>Period {}: {}</li>", n, escape(window)))
        .collect();

    let body = format!(
        r#"<section class="kiosk">
    <p class="clock">{now}</p>
    <p class="period">Current: <strong>{period}</strong></p>
    <form method="post" action="/attendance" autocomplete="off">
        <label>Student ID <input type="text" name="student_id" id="student_id" autofocus required></label>
        <label>Name <input type="text" name="name" id="name"></label>
        <p id="lookup"></p>
        <button type="submit">Check in</button>
    </form>
    <details><summary>Period schedule</summary><ul>{schedule}</ul></details>
    {admin_link}
</section>
<script>
document.getElementById('student_id').addEventListener('change', async (event) => {{
    const out = document.getElementById('lookup');
    out.textContent = '';
    const id = event.target.value.trim();
    if (!id) return;
    const response = await fetch('/lookup_name?student_id=' + encodeURIComponent(id));
    if (response.ok) {{
        const data = await response.json();
        document.getElementById('name').value = data.name;
        out.textContent = 'Seat ' + data.seat;
    }} else {{
        out.textContent = 'Student ID not found';
    }}
}});
</script>"#,
        now = escape(&view.now_display),
        period = escape(&view.period_display),
        schedule = schedule,
        admin_link = if view.is_admin {
            r#"<p><a href="/list">Admin records</a></p>"#
        } else {
            r#"<p class="muted"><a href="/admin">Admin</a></p>"#
        },
    );

    layout("Library Attendance", &view.flashes, false, &body)
}
