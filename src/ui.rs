use crate::models::{CompanyInfo, StudentProfile};

pub fn render_index(profile: &StudentProfile, company: &CompanyInfo) -> String {
    let student = if profile.name.is_empty() {
        "Student"
    } else {
        profile.name.as_str()
    };
    let company = if company.name.is_empty() {
        "your internship company"
    } else {
        company.name.as_str()
    };
    INDEX_HTML
        .replace("{{STUDENT}}", &escape(student))
        .replace("{{COMPANY}}", &escape(company))
}

pub fn render_dashboard(poll_secs: u64) -> String {
    DASHBOARD_HTML.replace("{{POLL_MS}}", &(poll_secs.max(1) * 1000).to_string())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="id">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>PKL Hub</title>
  <style>
    :root {
      --bg: #f4f6fb;
      --ink: #1f2a37;
      --accent: #2f6fed;
      --card: #ffffff;
      --muted: #6b7280;
    }

    * { box-sizing: border-box; }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
    }

    header {
      padding: 28px 24px 12px;
      max-width: 960px;
      margin: 0 auto;
    }

    h1 { margin: 0 0 4px; }

    .subtitle { margin: 0; color: var(--muted); }

    nav {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
      max-width: 960px;
      margin: 12px auto;
      padding: 0 24px;
    }

    nav a {
      padding: 8px 14px;
      border-radius: 999px;
      background: var(--card);
      color: var(--ink);
      text-decoration: none;
      box-shadow: 0 2px 6px rgba(31, 42, 55, 0.08);
    }

    nav a.active { background: var(--accent); color: #fff; }

    main {
      max-width: 960px;
      margin: 0 auto;
      padding: 12px 24px 48px;
    }

    .card {
      background: var(--card);
      border-radius: 16px;
      padding: 18px 20px;
      margin-bottom: 12px;
      box-shadow: 0 6px 18px rgba(31, 42, 55, 0.06);
    }

    .card h3 { margin: 0 0 6px; }
    .card p { margin: 4px 0; white-space: pre-wrap; }
    .card img { max-width: 100%; border-radius: 12px; }
    .meta { color: var(--muted); font-size: 0.9rem; }
    .empty { color: var(--muted); text-align: center; padding: 32px; }
  </style>
</head>
<body>
  <header>
    <h1>PKL Hub</h1>
    <p class="subtitle">{{STUDENT}} &middot; {{COMPANY}}</p>
  </header>
  <nav>
    <a href="#profile">Profile</a>
    <a href="#company">Company</a>
    <a href="#journal">Journal</a>
    <a href="#gallery">Gallery</a>
    <a href="#reports">Reports</a>
    <a href="#portfolio">Portfolio</a>
    <a href="/api/export/journal.txt">Journal (txt)</a>
    <a href="/api/export/reports.pdf">Reports (pdf)</a>
  </nav>
  <main id="content"></main>

  <script>
    const content = document.getElementById('content');
    const tabKey = 'pklTabId';
    let tabId = sessionStorage.getItem(tabKey);
    if (!tabId) {
      tabId = crypto.randomUUID();
      sessionStorage.setItem(tabKey, tabId);
    }

    const post = (url, body) =>
      fetch(url, {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify(body)
      }).catch(() => {});

    const esc = (text) => {
      const div = document.createElement('div');
      div.textContent = text ?? '';
      return div.innerHTML;
    };

    const imageSrc = (src) =>
      /^(data:image\/|https?:\/\/)/i.test(src || '') ? esc(src).replaceAll('"', '&quot;') : '';

    const card = (title, meta, body, image) => `
      <div class="card">
        <h3>${esc(title)}</h3>
        ${meta ? `<div class="meta">${esc(meta)}</div>` : ''}
        ${imageSrc(image) ? `<img src="${imageSrc(image)}" alt="${esc(title)}" />` : ''}
        ${body ? `<p>${esc(body)}</p>` : ''}
      </div>`;

    const views = {
      profile: async () => {
        const p = await (await fetch('/api/profile')).json();
        return card(p.name || 'No profile yet', [p.studentId, p.school, p.major].filter(Boolean).join(' · '), p.bio, p.photo);
      },
      company: async () => {
        const c = await (await fetch('/api/company')).json();
        return card(c.name || 'No company info yet', [c.industry, c.address].filter(Boolean).join(' · '), [c.supervisor && `Supervisor: ${c.supervisor}`, c.description].filter(Boolean).join('\n'));
      },
      journal: async () => {
        const items = await (await fetch('/api/journal')).json();
        return items.map((e) => card(e.activity, e.date, [e.description, e.learnings && `Learnings: ${e.learnings}`].filter(Boolean).join('\n'))).join('');
      },
      gallery: async () => {
        const items = await (await fetch('/api/gallery')).json();
        return items.map((g) => card(g.title, [g.category, g.date].filter(Boolean).join(' · '), g.description, g.image)).join('');
      },
      reports: async () => {
        const items = await (await fetch('/api/reports')).json();
        return items.map((r) => card(r.title, r.month, r.content)).join('');
      },
      portfolio: async () => {
        const items = await (await fetch('/api/portfolio')).json();
        return items.map((p) => card(p.title, (p.technologies || []).join(', '), p.description, p.image)).join('');
      }
    };

    const current = () => {
      const name = location.hash.replace('#', '');
      return views[name] ? name : 'profile';
    };

    const render = async () => {
      const name = current();
      document.querySelectorAll('nav a').forEach((a) => {
        a.classList.toggle('active', a.getAttribute('href') === `#${name}`);
      });
      try {
        const html = await views[name]();
        content.innerHTML = html || '<div class="empty">Nothing here yet.</div>';
      } catch (err) {
        content.innerHTML = '<div class="empty">Unable to load this page.</div>';
      }
    };

    window.addEventListener('hashchange', () => {
      post('/api/track', { tab_id: tabId, path: `/${current()}` });
      render();
    });

    const events = new EventSource('/api/events');
    events.addEventListener('storage', () => render());

    post('/api/track/session', { tab_id: tabId, path: `/${current()}` });
    render();
  </script>
</body>
</html>
"##;

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="id">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>PKL Hub &middot; Visitors</title>
  <style>
    body {
      margin: 0;
      padding: 24px;
      background: #0f172a;
      color: #e2e8f0;
      font-family: "Inter", "Segoe UI", sans-serif;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 12px;
      margin-bottom: 20px;
    }

    .stat {
      background: #1e293b;
      border-radius: 14px;
      padding: 16px;
    }

    .stat span { display: block; color: #94a3b8; font-size: 0.85rem; }
    .stat strong { font-size: 1.6rem; }

    table { width: 100%; border-collapse: collapse; }
    th, td { padding: 8px; text-align: left; border-bottom: 1px solid #334155; }
    tr.session { cursor: pointer; }
    tr.session:hover { background: #1e293b; }

    #detail {
      margin-top: 20px;
      background: #1e293b;
      border-radius: 14px;
      padding: 16px;
    }

    iframe { width: 100%; height: 260px; border: 0; border-radius: 10px; }
    .low { color: #4ade80; }
    .medium { color: #facc15; }
    .high { color: #f87171; }
  </style>
</head>
<body>
  <h1>Visitor analytics</h1>
  <div class="grid" id="stats"></div>
  <table>
    <thead><tr><th>Session</th><th>Type</th><th>Pages</th><th>Last activity</th></tr></thead>
    <tbody id="sessions"></tbody>
  </table>
  <div id="detail" hidden></div>

  <script>
    const POLL_MS = {{POLL_MS}};
    const esc = (text) => {
      const div = document.createElement('div');
      div.textContent = text ?? '';
      return div.innerHTML;
    };
    const stat = (label, value) => `<div class="stat"><span>${label}</span><strong>${value}</strong></div>`;

    const load = async () => {
      const res = await fetch('/api/admin/dashboard');
      if (!res.ok) return;
      const snap = await res.json();
      const s = snap.stats;
      if (s) {
        document.getElementById('stats').innerHTML = [
          stat('Sessions', s.display_sessions),
          stat('Page views', s.display_page_views),
          stat('Live now', s.live_visitors),
          stat('Today', s.today_sessions),
          stat('Mobile', `${s.mobile_percentage}%`),
          stat('Avg depth', s.avg_page_depth)
        ].join('');
      }
      document.getElementById('sessions').innerHTML = snap.sessions.map((x) => `
        <tr class="session" data-id="${esc(x.id)}">
          <td>${esc(x.id.slice(0, 16))}</td>
          <td>${esc(x.user_type)}</td>
          <td>${x.pages.length}</td>
          <td>${new Date(x.last_activity).toLocaleString()}</td>
        </tr>`).join('');
    };

    document.getElementById('sessions').addEventListener('click', async (event) => {
      const row = event.target.closest('tr.session');
      if (!row) return;
      const res = await fetch(`/api/admin/sessions/${encodeURIComponent(row.dataset.id)}`);
      if (!res.ok) return;
      const d = await res.json();
      const geo = d.geo
        ? `<p>${esc(d.geo.ip)} &middot; ${esc(d.geo.city)}, ${esc(d.geo.country)} &middot; ${esc(d.geo.org)}</p>`
        : '<p>Location unavailable</p>';
      const map = d.map_url ? `<iframe src="${d.map_url}" loading="lazy"></iframe>` : '';
      const detail = document.getElementById('detail');
      detail.hidden = false;
      detail.innerHTML = `
        <h2>${esc(d.session.id)}</h2>
        <p>${esc(d.session.device.userAgent)} (${esc(d.session.device.language)})</p>
        <p>Duration ${Math.round(d.duration_ms / 1000)}s &middot;
          risk <strong class="${d.risk.level}">${d.risk.score}</strong></p>
        ${geo}
        ${map}
        <ol>${d.session.pages.map((p) => `<li>${esc(p.path)} <small>${new Date(p.timestamp).toLocaleTimeString()}</small></li>`).join('')}</ol>`;
    });

    load();
    setInterval(load, POLL_MS);
  </script>
</body>
</html>
"##;
