//! Admin login and attendance reporting pages

use axum::response::Html;
use percent_encoding::utf8_percent_encode;
use trackr_common::db::AttendanceRecord;

use super::{escape, layout};
use crate::pagination::Pagination;
use crate::reporting::{DatePeriodGroups, ListQuery, SortKey, Stats, QUERY_VALUE};
use crate::session::Flash;

pub fn login_page(flashes: &[Flash]) -> Html<String> {
    let body = r#"<form method="post" action="/admin" class="login">
    <label>Password <input type="password" name="password" autofocus required></label>
    <button type="submit">Log in</button>
</form>
<p><a href="/attendance">Back to kiosk</a></p>"#;
    layout("Admin Login", flashes, false, body)
}

/// Everything the records page shows
pub struct ListView<'a> {
    pub rows: &'a [AttendanceRecord],
    pub total: usize,
    pub query: &'a ListQuery,
    pub pagination: Pagination,
    pub period_labels: Vec<String>,
    pub flashes: Vec<Flash>,
}

fn sort_header(query: &ListQuery, key: SortKey, title: &str) -> String {
    let current = query.sort_key();
    let order = if current == key {
        query.sort_order().toggled()
    } else {
        query.sort_order()
    };
    let marker = if current == key {
        match query.sort_order().as_str() {
            "asc" => " ▲",
            _ => " ▼",
        }
    } else {
        ""
    };
    let filter = query.filter();
    let mut href = format!("/list?sort={}&order={}", key.as_str(), order.as_str());
    for (name, value) in [
        ("date", &filter.date),
        ("period", &filter.period),
        ("student_id", &filter.student_id),
    ] {
        if let Some(value) = value {
            href.push_str(&format!("&{}={}", name, utf8_percent_encode(value, QUERY_VALUE)));
        }
    }
    format!(r#"<th><a href="{}">{}{}</a></th>"#, escape(&href), title, marker)
}

fn selected(condition: bool) -> &'static str {
    if condition {
        " selected"
    } else {
        ""
    }
}

pub fn list_page(view: &ListView<'_>) -> Html<String> {
    let filter = view.query.filter();
    let query_string = view.query.to_query_string();

    let period_options: String = view
        .period_labels
        .iter()
        .map(|label| {
            format!(
                r#"<option value="{v}"{s}>{v}</option>"#,
                v = escape(label),
                s = selected(filter.period.as_deref() == Some(label.as_str()))
            )
        })
        .collect();

    let sort_options: String = [
        (SortKey::Date, "Date"),
        (SortKey::StudentId, "Student ID"),
        (SortKey::Name, "Name"),
        (SortKey::Seat, "Seat"),
        (SortKey::Period, "Period"),
    ]
    .iter()
    .map(|(key, title)| {
        format!(
            r#"<option value="{}"{}>{}</option>"#,
            key.as_str(),
            selected(view.query.sort_key() == *key),
            title
        )
    })
    .collect();

    let rows: String = view
        .rows
        .iter()
        .map(|r| {
            format!(
                r#"<tr>
    <td><input type="checkbox" name="ids" value="{id}"></td>
    <td>{date}</td><td>{time}</td><td>{student_id}</td><td>{name}</td><td>{seat}</td><td>{period}</td>
    <td><button type="submit" formaction="/delete_record/{id}" class="danger" onclick="return confirm('Delete this record?')">Delete</button></td>
</tr>"#,
                id = r.id,
                date = escape(&r.date_only),
                time = escape(&r.time_only),
                student_id = escape(&r.student_id),
                name = escape(&r.name),
                seat = escape(&r.seat),
                period = escape(&r.period),
            )
        })
        .collect();

    let pager = render_pager(&view.pagination, &query_string);

    let body = format!(
        r#"<form method="get" action="/list" class="filters">
    <label>Date <input type="date" name="date" value="{date}"></label>
    <label>Period <select name="period"><option value="">All</option>{period_options}</select></label>
    <label>Student ID <input type="text" name="student_id" value="{student_id}"></label>
    <label>Sort <select name="sort">{sort_options}</select></label>
    <label>Order <select name="order">
        <option value="desc"{desc}>Newest first</option>
        <option value="asc"{asc}>Oldest first</option>
    </select></label>
    <button type="submit">Apply</button>
    <a href="/list">Reset</a>
</form>
<p class="actions">
    {total} records &middot;
    <a href="/export/csv?{qs}">Export CSV</a> &middot;
    <a href="/export/xlsx?{qs}">Export Excel</a>
</p>
<form method="post" action="/attendance/admin_add" class="inline">
    <label>Add attendance (override) <input type="text" name="student_id" required placeholder="Student ID"></label>
    <button type="submit">Add</button>
</form>
<form method="post" action="/delete_records">
<table>
    <thead><tr>
        <th></th>{h_date}<th>Time</th>{h_id}{h_name}{h_seat}{h_period}<th></th>
    </tr></thead>
    <tbody>{rows}</tbody>
</table>
<button type="submit" class="danger" onclick="return confirm('Delete selected records?')">Delete selected</button>
</form>
{pager}
<form method="post" action="/delete_before" class="inline">
    <label>Delete all records before <input type="date" name="cutoff_date" required></label>
    <button type="submit" class="danger" onclick="return confirm('Delete all older records?')">Delete</button>
</form>"#,
        date = escape(filter.date.as_deref().unwrap_or("")),
        student_id = escape(filter.student_id.as_deref().unwrap_or("")),
        period_options = period_options,
        sort_options = sort_options,
        desc = selected(view.query.sort_order().as_str() == "desc"),
        asc = selected(view.query.sort_order().as_str() == "asc"),
        total = view.total,
        qs = escape(&query_string),
        h_date = sort_header(view.query, SortKey::Date, "Date"),
        h_id = sort_header(view.query, SortKey::StudentId, "Student ID"),
        h_name = sort_header(view.query, SortKey::Name, "Name"),
        h_seat = sort_header(view.query, SortKey::Seat, "Seat"),
        h_period = sort_header(view.query, SortKey::Period, "Period"),
        rows = rows,
        pager = pager,
    );

    layout("Attendance Records", &view.flashes, true, &body)
}

fn render_pager(pagination: &Pagination, query_string: &str) -> String {
    if pagination.total_pages <= 1 {
        return String::new();
    }
    let link = |page: usize, text: &str| {
        format!(
            r#"<a href="/list?{}&amp;page={}">{}</a>"#,
            escape(query_string),
            page,
            text
        )
    };
    let previous = if pagination.has_previous() {
        link(pagination.page - 1, "&laquo; Previous")
    } else {
        String::new()
    };
    let next = if pagination.has_next() {
        link(pagination.page + 1, "Next &raquo;")
    } else {
        String::new()
    };
    format!(
        r#"<p class="pager">{} Page {} of {} {}</p>"#,
        previous, pagination.page, pagination.total_pages, next
    )
}

pub fn by_period_page(groups: &DatePeriodGroups, date: &str, flashes: &[Flash]) -> Html<String> {
    let sections: String = groups
        .iter()
        .map(|(day, periods)| {
            let blocks: String = periods
                .iter()
                .map(|(label, rows)| {
                    let items: String = rows
                        .iter()
                        .map(|r| {
                            format!(
                                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                                escape(&r.time_only),
                                escape(&r.student_id),
                                escape(&r.name),
                                escape(&r.seat)
                            )
                        })
                        .collect();
                    format!(
                        r#"<h3>{} ({})</h3>
<table><thead><tr><th>Time</th><th>Student ID</th><th>Name</th><th>Seat</th></tr></thead><tbody>{}</tbody></table>"#,
                        escape(label),
                        rows.len(),
                        items
                    )
                })
                .collect();
            format!("<section><h2>{}</h2>{}</section>", escape(day), blocks)
        })
        .collect();

    let body = format!(
        r#"<form method="get" action="/by_period" class="filters">
    <label>Date <input type="date" name="date" value="{date}"></label>
    <button type="submit">Show</button>
    <a href="/by_period">All dates</a>
</form>
{content}"#,
        date = escape(date),
        content = if sections.is_empty() {
            r#"<p class="muted">No records.</p>"#.to_string()
        } else {
            sections
        },
    );

    layout("Attendance by Period", flashes, true, &body)
}

pub fn stats_page(stats: &Stats, today: &str, flashes: &[Flash]) -> Html<String> {
    let today_rows: String = stats
        .today
        .iter()
        .map(|load| {
            let status = if load.closed {
                "closed".to_string()
            } else {
                format!("{} / {}", load.count, load.capacity)
            };
            format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&load.label),
                escape(&status)
            )
        })
        .collect();

    let period_rows: String = stats
        .per_period
        .iter()
        .map(|(label, count)| format!("<tr><td>{}</td><td>{}</td></tr>", escape(label), count))
        .collect();

    let date_rows: String = stats
        .per_date
        .iter()
        .map(|(date, count)| format!("<tr><td>{}</td><td>{}</td></tr>", escape(date), count))
        .collect();

    let top_rows: String = stats
        .top_students
        .iter()
        .map(|s| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&s.student_id),
                escape(&s.name),
                s.visits
            )
        })
        .collect();

    let body = format!(
        r#"<p>{total} records from {unique} students.</p>
<div class="grid">
<section><h2>Today ({today})</h2>
<table><thead><tr><th>Period</th><th>Attendance</th></tr></thead><tbody>{today_rows}</tbody></table></section>
<section><h2>By period</h2>
<table><thead><tr><th>Period</th><th>Records</th></tr></thead><tbody>{period_rows}</tbody></table></section>
<section><h2>By date</h2>
<table><thead><tr><th>Date</th><th>Records</th></tr></thead><tbody>{date_rows}</tbody></table></section>
<section><h2>Top students</h2>
<table><thead><tr><th>Student ID</th><th>Name</th><th>Visits</th></tr></thead><tbody>{top_rows}</tbody></table></section>
</div>"#,
        total = stats.total,
        unique = stats.unique_students,
        today = escape(today),
        today_rows = today_rows,
        period_rows = period_rows,
        date_rows = date_rows,
        top_rows = top_rows,
    );

    layout("Statistics", flashes, true, &body)
}
