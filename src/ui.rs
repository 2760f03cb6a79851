use crate::session::Session;
use crate::tooltip::{MARGIN, SPACING};
use crate::views::dashboard::{DashboardSnapshot, WEEKDAYS};
use crate::views::path::{HabitDetail, HabitLink};
use crate::views::today::{HabitCard, TodaySnapshot};
use std::fmt::Write;

/// Feedback banner on the editor page.
#[derive(Debug, Clone, Copy)]
pub enum Notice<'a> {
    Ok(&'a str),
    Error(&'a str),
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, session: Option<&Session>, body: &str, script: &str) -> String {
    let nav = session.map(render_nav).unwrap_or_default();
    fill(
        LAYOUT_HTML,
        &[
            ("TITLE", escape_html(title).as_str()),
            ("NAV", nav.as_str()),
            ("SCRIPT", script),
            ("BODY", body),
        ],
    )
}

/// Substitutes `{{KEY}}` placeholders in one pass over the template.
/// Substituted text is never rescanned; unknown placeholders stay as written.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let known = after.find("}}").and_then(|end| {
            values
                .iter()
                .find(|(key, _)| *key == &after[..end])
                .map(|(_, value)| (end, *value))
        });
        match known {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_nav(session: &Session) -> String {
    NAV_HTML.replace("{{USER}}", &escape_html(&session.name))
}

pub fn render_login(error: Option<&str>) -> String {
    let notice = error
        .map(|message| format!(r#"<p class="notice error" role="alert">{}</p>"#, escape_html(message)))
        .unwrap_or_default();
    let body = LOGIN_HTML.replace("{{NOTICE}}", &notice);
    page("Sign in", None, &body, "")
}

pub fn render_today(session: &Session, snapshot: &TodaySnapshot) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<h1>Today</h1><p class="subtitle">{}</p><div class="habits">"#,
        escape_html(&snapshot.date)
    );
    for card in &snapshot.habits {
        body.push_str(&render_card(card));
    }
    body.push_str(r#"</div><div class="status" id="status"></div>"#);
    page("Today", Some(session), &body, TODAY_SCRIPT)
}

fn render_card(card: &HabitCard) -> String {
    let habit = card.habit.as_str();
    let mut tasks = String::new();
    if card.tasks.is_empty() {
        tasks.push_str(r#"<p class="empty">No tasks for today.</p>"#);
    }
    for (index, task) in card.tasks.iter().enumerate() {
        let checked = card.checklist.tasks.get(index).copied().unwrap_or(false);
        let _ = write!(
            tasks,
            r#"<label class="task"><span>{}</span><input type="checkbox" class="task-check" data-habit="{habit}" data-index="{index}"{}></label>"#,
            escape_html(task),
            checked_attr(checked)
        );
    }
    format!(
        r#"<section class="habit" data-habit="{habit}">
  <div class="habit-header {shade}">
    <span class="habit-name">{label}</span>
    <input type="checkbox" class="habit-check" data-habit="{habit}" aria-label="{label} done"{checked}>
  </div>
  <div class="habit-tasks">{tasks}</div>
</section>
"#,
        shade = card.shade.css_class(),
        label = escape_html(&card.label),
        checked = checked_attr(card.checklist.top),
    )
}

fn checked_attr(checked: bool) -> &'static str {
    if checked { " checked" } else { "" }
}

pub fn render_dashboard(session: &Session, snapshot: &DashboardSnapshot) -> String {
    let mut body = String::from(r#"<h1>Dashboard</h1><section class="stats">"#);
    for stat in &snapshot.stats {
        let _ = write!(
            body,
            r#"<div class="stat"><span class="label">{}</span><span class="value">{}%</span></div>"#,
            escape_html(&stat.label),
            stat.percentage
        );
    }
    let _ = write!(
        body,
        r#"</section>
<div class="month-nav">
  <a class="button" href="/dashboard?year={}&amp;month={}">Prev</a>
  <h2>{}</h2>
  <a class="button" href="/dashboard?year={}&amp;month={}">Next</a>
</div>
<div class="calendar">"#,
        snapshot.prev.year,
        snapshot.prev.month,
        escape_html(&snapshot.label),
        snapshot.next.year,
        snapshot.next.month
    );
    for weekday in WEEKDAYS {
        let _ = write!(body, r#"<div class="weekday">{weekday}</div>"#);
    }
    for cell in &snapshot.cells {
        match cell {
            None => body.push_str(r#"<div class="day blank"></div>"#),
            Some(cell) => {
                let habits = cell
                    .habits
                    .as_ref()
                    .and_then(|rows| serde_json::to_string(rows).ok())
                    .map(|json| format!(r#" data-habits="{}""#, escape_html(&json)))
                    .unwrap_or_default();
                let _ = write!(
                    body,
                    r#"<div class="day {}" data-date="{}"{habits}>{}</div>"#,
                    cell.shade,
                    escape_html(&cell.date),
                    cell.day
                );
            }
        }
    }
    body.push_str(r#"</div><div id="tooltip" class="tooltip" hidden></div>"#);

    let script = DASHBOARD_SCRIPT
        .replace("{{SPACING}}", &SPACING.to_string())
        .replace("{{MARGIN}}", &MARGIN.to_string());
    page("Dashboard", Some(session), &body, &script)
}

pub fn render_editor(session: &Session, text: &str, notice: Option<Notice<'_>>) -> String {
    let notice = match notice {
        Some(Notice::Ok(message)) => {
            format!(r#"<p class="notice ok" role="status">{}</p>"#, escape_html(message))
        }
        Some(Notice::Error(message)) => {
            format!(r#"<p class="notice error" role="alert">{}</p>"#, escape_html(message))
        }
        None => String::new(),
    };
    let body = EDITOR_HTML
        .replace("{{NOTICE}}", &notice)
        .replace("{{TEXT}}", &escape_html(text));
    page("Update your Path", Some(session), &body, "")
}

pub fn render_path(session: &Session, links: &[HabitLink]) -> String {
    let mut body = String::from(r#"<h1>Your Path of Five</h1><div class="links">"#);
    for link in links {
        let _ = write!(
            body,
            r#"<a class="habit-link" href="{}">{}</a>"#,
            escape_html(&link.href),
            escape_html(&link.label)
        );
    }
    body.push_str("</div>");
    page("Your Path", Some(session), &body, "")
}

pub fn render_habit(session: &Session, detail: &HabitDetail) -> String {
    let mut body = format!("<h1>{}</h1>", escape_html(&detail.label));
    for section in &detail.sections {
        let _ = write!(body, "<section><h2>{}</h2>", escape_html(section.label));
        if section.items.is_empty() {
            body.push_str(r#"<p class="empty">No items added</p>"#);
        } else {
            body.push_str("<ul>");
            for item in &section.items {
                let _ = write!(body, "<li>{}</li>", escape_html(item));
            }
            body.push_str("</ul>");
        }
        body.push_str("</section>");
    }
    page(&detail.label, Some(session), &body, "")
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} - Path of Five</title>
  <style>
    :root {
      --bg: #f8f3e6;
      --ink: #2b2a28;
      --muted: #6f6a65;
      --accent: #2f4858;
      --card: #ffffff;
      --border: rgba(47, 72, 88, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
    }

    .app {
      width: min(640px, 100%);
      margin: 0 auto;
      padding: 0 16px 48px;
    }

    .brand {
      position: relative;
      text-align: center;
      font-weight: 700;
      font-size: 1.15rem;
      padding: 16px 0;
    }

    .brand .settings {
      position: absolute;
      right: 4px;
      top: 12px;
      font-size: 1.5rem;
      text-decoration: none;
      color: var(--accent);
    }

    nav {
      display: flex;
      justify-content: space-between;
      align-items: center;
      gap: 8px;
      margin-bottom: 16px;
    }

    nav a,
    nav button,
    .button {
      padding: 6px 12px;
      border: 1px solid var(--border);
      border-radius: 8px;
      background: var(--card);
      color: var(--accent);
      text-decoration: none;
      font: inherit;
      cursor: pointer;
    }

    nav form {
      margin: 0;
    }

    h1 {
      font-size: 1.6rem;
      margin: 8px 0 16px;
    }

    .subtitle,
    .empty {
      color: var(--muted);
      font-size: 0.9rem;
    }

    .habits {
      display: grid;
      gap: 12px;
    }

    .habit {
      border: 1px solid var(--border);
      border-radius: 14px;
      overflow: hidden;
      background: var(--card);
    }

    .habit-header {
      display: flex;
      justify-content: space-between;
      align-items: center;
      padding: 16px;
      cursor: pointer;
      transition: background 300ms ease;
      font-weight: 600;
    }

    .habit-header input,
    .task input {
      width: 20px;
      height: 20px;
    }

    .progress-complete { background: #16a34a; color: white; }
    .progress-strong { background: #4ade80; color: white; }
    .progress-partial { background: #fde047; color: black; }
    .progress-low { background: #fecaca; color: black; }

    .habit-tasks {
      max-height: 0;
      overflow: hidden;
      transition: max-height 300ms ease;
      background: #f9fafb;
      padding: 0 8px;
    }

    .habit.open .habit-tasks {
      max-height: 999px;
      padding: 8px;
    }

    .task {
      display: flex;
      justify-content: space-between;
      align-items: center;
      background: var(--card);
      border-radius: 8px;
      padding: 8px 12px;
      margin-bottom: 8px;
      cursor: pointer;
    }

    .stats {
      display: grid;
      grid-template-columns: repeat(2, 1fr);
      gap: 12px;
      margin-bottom: 24px;
    }

    .stat {
      background: #f3f4f6;
      border: 1px solid var(--border);
      border-radius: 14px;
      padding: 16px;
      display: grid;
      gap: 4px;
    }

    .stat .value {
      font-size: 1.3rem;
      font-weight: 700;
    }

    .month-nav {
      display: flex;
      justify-content: space-between;
      align-items: center;
      margin-bottom: 12px;
    }

    .calendar {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 8px;
      background: var(--card);
      padding: 12px;
      border-radius: 14px;
      border: 1px solid var(--border);
    }

    .weekday {
      text-align: center;
      font-weight: 600;
    }

    .day {
      height: 56px;
      display: flex;
      align-items: center;
      justify-content: center;
      border-radius: 6px;
      color: white;
      font-weight: 600;
    }

    .day.blank { border: 1px solid var(--border); }
    .shade-5 { background: #16a34a; }
    .shade-4 { background: #4ade80; }
    .shade-3 { background: #facc15; }
    .shade-2 { background: #fbbf24; }
    .shade-1 { background: #d97706; }
    .shade-0 { background: #dc2626; }
    .shade-none { background: #9ca3af; }

    .tooltip {
      position: fixed;
      z-index: 9999;
      max-width: 90vw;
      background: var(--card);
      color: black;
      border: 1px solid var(--border);
      border-radius: 14px;
      box-shadow: 0 12px 32px rgba(47, 72, 88, 0.2);
      padding: 16px;
    }

    .tooltip .row {
      display: flex;
      justify-content: space-between;
      gap: 24px;
      border-bottom: 1px solid var(--border);
      padding: 4px 0;
    }

    .links {
      display: grid;
      gap: 12px;
    }

    .habit-link {
      display: block;
      padding: 16px;
      border-radius: 14px;
      background: var(--card);
      border: 1px solid var(--border);
      color: var(--ink);
      font-size: 1.2rem;
      font-weight: 600;
      text-decoration: none;
    }

    textarea {
      width: 100%;
      height: 24rem;
      font-family: monospace;
      font-size: 0.9rem;
      padding: 12px;
      border-radius: 8px;
      border: 1px solid var(--border);
    }

    .notice.ok { color: #2d7a4b; }
    .notice.error { color: #c63b2b; font-weight: 600; }

    .status {
      min-height: 1.2em;
      color: #c63b2b;
      margin-top: 12px;
    }

    .login {
      text-align: center;
      padding: 48px 0;
    }

    .login h1 {
      font-size: 2.4rem;
    }

    .login input {
      padding: 8px 12px;
      border-radius: 8px;
      border: 1px solid var(--border);
      font: inherit;
    }
  </style>
</head>
<body>
  <main class="app">
    {{NAV}}
    {{BODY}}
  </main>
  <script>{{SCRIPT}}</script>
</body>
</html>
"#;

const NAV_HTML: &str = r#"<div class="brand">Path of Five
      <a class="settings" href="/cyourpath" title="Change your path">&#9881;</a>
    </div>
    <nav>
      <a href="/today">Today</a>
      <a href="/yourpath">Your Path</a>
      <a href="/dashboard">Dashboard</a>
      <form method="post" action="/logout"><button type="submit" title="Signed in as {{USER}}">Logout</button></form>
    </nav>"#;

const LOGIN_HTML: &str = r#"<section class="login">
  <h2>Welcome to</h2>
  <h1>Path of Five</h1>
  {{NOTICE}}
  <form method="post" action="/login">
    <input name="name" placeholder="Your name" autocomplete="name" required />
    <button class="button" type="submit">Sign in</button>
  </form>
</section>"#;

const EDITOR_HTML: &str = r#"<h1>Update your Path of Five (JSON)</h1>
{{NOTICE}}
<form method="post" action="/cyourpath">
  <textarea name="text" spellcheck="false">{{TEXT}}</textarea>
  <button class="button" type="submit">Save</button>
</form>"#;

const TODAY_SCRIPT: &str = r#"
    const statusEl = document.getElementById('status');
    const shades = ['progress-complete', 'progress-strong', 'progress-partial', 'progress-low'];

    const applyCard = (card) => {
      const section = document.querySelector(`.habit[data-habit="${card.habit}"]`);
      if (!section) {
        return;
      }
      section.querySelector('.habit-check').checked = card.checklist.top;
      section.querySelectorAll('.task-check').forEach((box) => {
        box.checked = Boolean(card.checklist.tasks[Number(box.dataset.index)]);
      });
      const header = section.querySelector('.habit-header');
      header.classList.remove(...shades);
      header.classList.add(`progress-${card.shade}`);
    };

    const send = async (url, payload) => {
      const res = await fetch(url, {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify(payload)
      });
      if (!res.ok) {
        const msg = await res.text();
        throw new Error(msg || 'Request failed');
      }
      applyCard(await res.json());
      statusEl.textContent = '';
    };

    document.querySelectorAll('.habit-header').forEach((header) => {
      header.addEventListener('click', () => header.parentElement.classList.toggle('open'));
    });

    document.querySelectorAll('.habit-check').forEach((box) => {
      box.addEventListener('click', (event) => event.stopPropagation());
      box.addEventListener('change', () => {
        send('/api/today/habit', { habit: box.dataset.habit, value: box.checked })
          .catch((err) => { statusEl.textContent = err.message; });
      });
    });

    document.querySelectorAll('.task-check').forEach((box) => {
      box.addEventListener('change', () => {
        send('/api/today/task', {
          habit: box.dataset.habit,
          index: Number(box.dataset.index),
          value: box.checked
        }).catch((err) => { statusEl.textContent = err.message; });
      });
    });
"#;

/// Runs `tooltip::place` and `tooltip::dismisses` in the browser. The branch
/// order here must match those functions.
const DASHBOARD_SCRIPT: &str = r#"
    const SPACING = {{SPACING}};
    const MARGIN = {{MARGIN}};
    const tooltip = document.getElementById('tooltip');
    let anchor = null;

    const closeTooltip = () => {
      tooltip.hidden = true;
      anchor = null;
    };

    const placeTooltip = () => {
      if (!anchor) {
        return;
      }
      const rect = anchor.getBoundingClientRect();
      const tip = tooltip.getBoundingClientRect();
      const viewportWidth = window.innerWidth;
      const viewportHeight = window.innerHeight;

      const centeredLeft = rect.left + rect.width / 2 - tip.width / 2;
      const left = Math.min(viewportWidth - tip.width - MARGIN, Math.max(MARGIN, centeredLeft));

      const above = rect.top - SPACING - tip.height;
      const below = rect.bottom + SPACING;
      let top;
      if (above >= MARGIN) {
        top = above;
      } else if (below + tip.height <= viewportHeight - MARGIN) {
        top = below;
      } else {
        top = Math.min(Math.max(MARGIN, rect.top - tip.height / 2), viewportHeight - tip.height - MARGIN);
      }

      tooltip.style.left = `${left}px`;
      tooltip.style.top = `${top}px`;
    };

    const openTooltip = (cell) => {
      if (!cell.dataset.habits) {
        closeTooltip();
        return;
      }
      const rows = JSON.parse(cell.dataset.habits);
      const title = document.createElement('p');
      title.style.fontWeight = '700';
      title.textContent = cell.dataset.date;
      tooltip.replaceChildren(title);
      rows.forEach(([habit, done]) => {
        const row = document.createElement('div');
        row.className = 'row';
        const name = document.createElement('span');
        name.textContent = habit.charAt(0).toUpperCase() + habit.slice(1);
        const mark = document.createElement('span');
        mark.textContent = done ? '✔' : '✖';
        row.append(name, mark);
        tooltip.append(row);
      });
      anchor = cell;
      tooltip.hidden = false;
      placeTooltip();
    };

    document.querySelectorAll('.day[data-date]').forEach((cell) => {
      cell.addEventListener('click', () => openTooltip(cell));
      cell.addEventListener('mouseenter', () => openTooltip(cell));
      cell.addEventListener('mouseleave', closeTooltip);
    });

    window.addEventListener('scroll', closeTooltip, true);
    window.addEventListener('resize', closeTooltip);
    document.addEventListener('pointerdown', (event) => {
      if (tooltip.hidden || anchor === event.target) {
        return;
      }
      const box = tooltip.getBoundingClientRect();
      const inside = event.clientX >= box.left && event.clientX <= box.right
        && event.clientY >= box.top && event.clientY <= box.bottom;
      if (!inside) {
        closeTooltip();
      }
    });
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::HabitChecklist;
    use crate::habits::HabitId;

    fn session() -> Session {
        Session {
            uid: "u1".to_string(),
            name: "<Ada>".to_string(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn today_page_marks_empty_habits_and_escapes_tasks() {
        let checklist = HabitChecklist::reconcile(1, false, Some(&[true]));
        let snapshot = TodaySnapshot {
            date: "2025-04-02".to_string(),
            habits: vec![
                HabitCard {
                    habit: HabitId::Ring,
                    label: "Ring".to_string(),
                    tasks: vec!["<b>stretch</b>".to_string()],
                    shade: checklist.shade(),
                    checklist,
                },
                HabitCard {
                    habit: HabitId::Thumb,
                    label: "Thumb".to_string(),
                    tasks: Vec::new(),
                    checklist: HabitChecklist::default(),
                    shade: HabitChecklist::default().shade(),
                },
            ],
        };
        let html = render_today(&session(), &snapshot);
        assert!(html.contains("&lt;b&gt;stretch&lt;/b&gt;"));
        assert!(html.contains("No tasks for today."));
        assert!(html.contains(r#"data-index="0" checked"#));
        assert!(html.contains("&lt;Ada&gt;"));
    }

    #[test]
    fn editor_text_cannot_break_out_of_placeholders() {
        let html = render_editor(&session(), "{{SCRIPT}} </textarea>", Some(Notice::Error("Invalid JSON. Fix it and try again.")));
        assert!(html.contains("{{SCRIPT}} &lt;/textarea&gt;"));
        assert!(html.contains(r#"role="alert""#));
    }

    #[test]
    fn display_name_cannot_pull_in_other_placeholders() {
        let sneaky = Session {
            uid: "u1".to_string(),
            name: "{{SCRIPT}}{{BODY}}".to_string(),
        };
        let signed_in = page("Today", Some(&sneaky), "<main>body</main>", "let marker = 1;");
        assert!(signed_in.contains(r#"title="Signed in as {{SCRIPT}}{{BODY}}""#));
        assert_eq!(signed_in.matches("let marker = 1;").count(), 1);
        assert_eq!(signed_in.matches("<main>body</main>").count(), 1);
    }

    #[test]
    fn fill_leaves_unknown_placeholders_alone() {
        assert_eq!(fill("a {{X}} {{Y}} {{", &[("X", "{{Y}}")]), "a {{Y}} {{Y}} {{");
    }

    #[test]
    fn dashboard_script_mirrors_tooltip_rules() {
        let script = DASHBOARD_SCRIPT;
        let order = [
            "const centeredLeft = rect.left + rect.width / 2 - tip.width / 2;",
            "Math.min(viewportWidth - tip.width - MARGIN, Math.max(MARGIN, centeredLeft))",
            "const above = rect.top - SPACING - tip.height;",
            "const below = rect.bottom + SPACING;",
            "if (above >= MARGIN)",
            "else if (below + tip.height <= viewportHeight - MARGIN)",
            "Math.min(Math.max(MARGIN, rect.top - tip.height / 2), viewportHeight - tip.height - MARGIN)",
            "window.addEventListener('scroll', closeTooltip, true);",
            "window.addEventListener('resize', closeTooltip);",
            "if (!inside)",
        ];
        let mut from = 0;
        for fragment in order {
            let found = script[from..].find(fragment);
            assert!(found.is_some(), "missing or out of order: {fragment}");
            from += found.unwrap_or_default() + fragment.len();
        }

        let rendered = DASHBOARD_SCRIPT
            .replace("{{SPACING}}", &SPACING.to_string())
            .replace("{{MARGIN}}", &MARGIN.to_string());
        assert!(rendered.contains(&format!("const SPACING = {SPACING};")));
        assert!(rendered.contains(&format!("const MARGIN = {MARGIN};")));
    }

    #[test]
    fn habit_page_shows_placeholder_for_empty_lists() {
        let detail = HabitDetail::new(HabitId::Pinky, Default::default());
        let html = render_habit(&session(), &detail);
        assert_eq!(html.matches("No items added").count(), 3);
    }
}
