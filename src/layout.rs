use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::database::BadgeCounts;
use crate::nav::{self, BadgeKind};
use crate::session::{Role, Session};

const STYLES: &str = r#"
    * { box-sizing: border-box; }
    body { font-family: Arial, sans-serif; margin: 0; background: #f5f5f5; color: #212529; }
    .sidebar { position: fixed; top: 0; left: 0; bottom: 0; width: 240px; background: #1f2d3d; color: #fff; overflow-y: auto; }
    .sidebar .brand { padding: 20px; font-size: 18px; font-weight: bold; border-bottom: 1px solid #2c3e50; }
    .sidebar .brand small { display: block; font-size: 12px; font-weight: normal; color: #adb5bd; margin-top: 4px; }
    .sidebar ul { list-style: none; margin: 0; padding: 10px 0; }
    .sidebar a { display: flex; align-items: center; gap: 10px; padding: 12px 20px; color: #ced4da; text-decoration: none; }
    .sidebar a:hover { background: #2c3e50; color: #fff; }
    .sidebar a.active { background: #007bff; color: #fff; }
    .sidebar .label { flex: 1; }
    .sidebar .logout { border-top: 1px solid #2c3e50; }
    .badge { background: #dc3545; color: #fff; border-radius: 10px; padding: 2px 8px; font-size: 12px; }
    .topbar { position: fixed; top: 0; left: 240px; right: 0; height: 60px; background: #fff; display: flex; align-items: center; justify-content: space-between; padding: 0 25px; border-bottom: 1px solid #ddd; }
    .topbar h1 { font-size: 20px; margin: 0; }
    .topbar .user { display: flex; align-items: center; gap: 15px; }
    .bell { position: relative; font-size: 20px; }
    .bell .badge { position: absolute; top: -8px; right: -12px; }
    .content { margin-left: 240px; padding: 85px 25px 25px; }
    .card { background: #fff; padding: 20px; border-radius: 10px; margin-bottom: 20px; }
    .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; }
    .stat { background: #fff; padding: 15px; border-radius: 8px; border-left: 4px solid #007bff; }
    .stat.green { border-left-color: #28a745; }
    .stat h4 { margin: 0 0 8px; }
    .stat p { font-size: 24px; margin: 0; }
    .login { max-width: 400px; margin: 80px auto; background: #fff; padding: 25px; border-radius: 10px; }
    .login label { display: block; margin: 15px 0 5px; font-weight: bold; }
    .login input { width: 100%; padding: 10px; border: 1px solid #ddd; border-radius: 4px; }
    .login button { width: 100%; margin-top: 20px; background: #007bff; color: #fff; padding: 12px; border: none; border-radius: 4px; cursor: pointer; }
    .login button:hover { background: #0056b3; }
    .error { background: #f8d7da; color: #721c24; border: 1px solid #f5c6cb; padding: 10px; border-radius: 5px; }
"#;

/// Everything the sidebar and topbar need for one request.
pub struct Chrome<'a> {
    pub role: Role,
    pub page: &'a str,
    pub session: &'a Session,
    pub badges: BadgeCounts,
}

impl Chrome<'_> {
    fn title(&self) -> String {
        nav::page_title(self.role, self.page)
    }

    /// The topbar bell shows the certificate count, the only badge both
    /// portals have.
    fn notifications(&self) -> Option<i64> {
        BadgeKind::Certificates.value(&self.badges)
    }
}

fn document(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | LMS" }
                style { (PreEscaped(STYLES)) }
            }
            body { (body) }
        }
    }
}

fn sidebar(chrome: &Chrome) -> Markup {
    html! {
        nav.sidebar {
            div.brand {
                "🎓 LMS"
                small { (chrome.role.portal_name()) }
            }
            ul {
                @for item in nav::menu(chrome.role) {
                    li {
                        a.active[item.is_active(chrome.page)] href=(item.href(chrome.role)) {
                            span.icon { (item.icon) }
                            span.label { (item.label) }
                            @if let Some(count) = item.badge.and_then(|b| b.value(&chrome.badges)) {
                                span.badge { (count) }
                            }
                        }
                    }
                }
                li.logout {
                    a href=(chrome.role.logout_path()) {
                        span.icon { "🚪" }
                        span.label { "Logout" }
                    }
                }
            }
        }
    }
}

fn topbar(chrome: &Chrome) -> Markup {
    html! {
        header.topbar {
            h1 { (chrome.title()) }
            div.user {
                span.bell title="Notifications" {
                    "🔔"
                    @if let Some(count) = chrome.notifications() {
                        span.badge { (count) }
                    }
                }
                span { (chrome.session.display_name) }
            }
        }
    }
}

pub fn render_page(chrome: &Chrome, content: Markup) -> Markup {
    document(
        &chrome.title(),
        html! {
            (sidebar(chrome))
            (topbar(chrome))
            main.content { (content) }
        },
    )
}

pub fn render_login(role: Role, error: Option<&str>, identifier: &str) -> Markup {
    let title = format!("{} Login", role.portal_name());
    document(
        &title,
        html! {
            div.login {
                h2 { "🎓 " (title) }
                @if let Some(message) = error {
                    p.error { (message) }
                }
                form method="post" action=(role.login_path()) {
                    label for="identifier" { (role.identifier_label()) }
                    input id="identifier" type="text" name="identifier" value=(identifier) required;
                    label for="password" { "Password" }
                    input id="password" type="password" name="password" required;
                    button type="submit" { "Sign in" }
                }
            }
        },
    )
}

fn stat(label: &str, value: Option<i64>, class: &str) -> Markup {
    html! {
        div class={ "stat " (class) } {
            h4 { (label) }
            p {
                @match value {
                    Some(n) => (n),
                    None => "n/a",
                }
            }
        }
    }
}

pub fn render_dashboard(chrome: &Chrome) -> Markup {
    html! {
        div.card {
            h2 { "Welcome back, " (chrome.session.display_name) }
            p { "Here is an overview of your " (chrome.role.portal_name().to_lowercase()) "." }
        }
        div.stats {
            @match chrome.role {
                Role::Admin => {
                    (stat("Total Students", chrome.badges.students, ""))
                    (stat("Certificates Issued", chrome.badges.certificates, "green"))
                }
                Role::Student => {
                    (stat("Enrolled Students", chrome.badges.students, ""))
                    (stat("My Certificates", chrome.badges.certificates, "green"))
                }
            }
        }
    }
}

pub fn render_placeholder(chrome: &Chrome) -> Markup {
    html! {
        div.card {
            h2 { (chrome.title()) }
            p { "Nothing to show here yet." }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn session(name: &str) -> Session {
        let now = Utc::now();
        Session {
            token: "t".to_string(),
            role: Role::Admin,
            subject_id: 1,
            display_name: name.to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(1),
        }
    }

    #[test]
    fn highlights_only_the_current_item() {
        let session = session("Ops");
        let chrome = Chrome {
            role: Role::Admin,
            page: "add-course",
            session: &session,
            badges: BadgeCounts::default(),
        };
        let html = render_page(&chrome, html! {}).into_string();
        assert_eq!(html.matches("class=\"active\"").count(), 1);
        let marker = html.find("class=\"active\"").unwrap();
        let start = html[..marker].rfind("<a").unwrap();
        let end = marker + html[marker..].find('>').unwrap();
        assert!(html[start..end].contains("href=\"/admin/courses\""));
    }

    #[test]
    fn badges_render_only_when_counted() {
        let session = session("Ops");
        let chrome = Chrome {
            role: Role::Admin,
            page: "dashboard",
            session: &session,
            badges: BadgeCounts { students: Some(0), certificates: None },
        };
        let html = render_page(&chrome, html! {}).into_string();
        assert_eq!(html.matches("<span class=\"badge\">").count(), 1);
        assert!(html.contains("<span class=\"badge\">0</span>"));
    }

    #[test]
    fn display_name_is_escaped() {
        let session = session("<script>x</script>");
        let chrome = Chrome {
            role: Role::Admin,
            page: "dashboard",
            session: &session,
            badges: BadgeCounts::default(),
        };
        let html = render_page(&chrome, render_dashboard(&chrome)).into_string();
        assert!(!html.contains("<script>x"));
        assert!(html.contains("&lt;script&gt;x"));
    }

    #[test]
    fn student_dashboard_shows_both_counts() {
        let mut session = session("Njeri");
        session.role = Role::Student;
        let chrome = Chrome {
            role: Role::Student,
            page: "dashboard",
            session: &session,
            badges: BadgeCounts { students: Some(42), certificates: Some(2) },
        };
        let html = render_dashboard(&chrome).into_string();
        assert!(html.contains("Enrolled Students"));
        assert!(html.contains("<p>42</p>"));
        assert!(html.contains("<p>2</p>"));
    }

    #[test]
    fn login_form_posts_to_its_portal() {
        let html = render_login(Role::Student, Some("Invalid email or password"), "a@b.c").into_string();
        assert!(html.contains("action=\"/student/login\""));
        assert!(html.contains("Invalid email or password"));
        assert!(html.contains("value=\"a@b.c\""));
    }
}
