use crate::database::BadgeCounts;
use crate::session::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeKind {
    Students,
    Certificates,
}

impl BadgeKind {
    pub fn value(&self, counts: &BadgeCounts) -> Option<i64> {
        match self {
            BadgeKind::Students => counts.students,
            BadgeKind::Certificates => counts.certificates,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavItem {
    pub page: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    /// Sub-pages that keep this item highlighted.
    pub also_active_on: &'static [&'static str],
    pub badge: Option<BadgeKind>,
}

impl NavItem {
    pub fn is_active(&self, current_page: &str) -> bool {
        self.page == current_page || self.also_active_on.contains(&current_page)
    }

    pub fn href(&self, role: Role) -> String {
        role.page_path(self.page)
    }
}

const ADMIN_MENU: &[NavItem] = &[
    NavItem {
        page: "dashboard",
        label: "Dashboard",
        icon: "🏠",
        also_active_on: &[],
        badge: None,
    },
    NavItem {
        page: "courses",
        label: "Courses",
        icon: "📚",
        also_active_on: &["add-course", "edit-course"],
        badge: None,
    },
    NavItem {
        page: "modules",
        label: "Modules",
        icon: "🧩",
        also_active_on: &["add-module", "edit-module"],
        badge: None,
    },
    NavItem {
        page: "lessons",
        label: "Lessons",
        icon: "📝",
        also_active_on: &["add-lesson", "edit-lesson"],
        badge: None,
    },
    NavItem {
        page: "quizzes",
        label: "Quizzes",
        icon: "❓",
        also_active_on: &["add-quiz", "edit-quiz", "quiz-questions"],
        badge: None,
    },
    NavItem {
        page: "students",
        label: "Students",
        icon: "🎓",
        also_active_on: &["view-student"],
        badge: Some(BadgeKind::Students),
    },
    NavItem {
        page: "certificates",
        label: "Certificates",
        icon: "🏅",
        also_active_on: &[],
        badge: Some(BadgeKind::Certificates),
    },
    NavItem {
        page: "profile",
        label: "Profile",
        icon: "👤",
        also_active_on: &[],
        badge: None,
    },
];

const STUDENT_MENU: &[NavItem] = &[
    NavItem {
        page: "dashboard",
        label: "Dashboard",
        icon: "🏠",
        also_active_on: &[],
        badge: None,
    },
    NavItem {
        page: "courses",
        label: "My Courses",
        icon: "📚",
        also_active_on: &["course", "lesson"],
        badge: None,
    },
    NavItem {
        page: "quizzes",
        label: "Quizzes",
        icon: "❓",
        also_active_on: &["take-quiz", "quiz-result"],
        badge: None,
    },
    NavItem {
        page: "certificates",
        label: "Certificates",
        icon: "🏅",
        also_active_on: &["view-certificate"],
        badge: Some(BadgeKind::Certificates),
    },
    NavItem {
        page: "profile",
        label: "Profile",
        icon: "👤",
        also_active_on: &[],
        badge: None,
    },
];

pub fn menu(role: Role) -> &'static [NavItem] {
    match role {
        Role::Admin => ADMIN_MENU,
        Role::Student => STUDENT_MENU,
    }
}

/// The menu item owning `page`, directly or as one of its sub-pages.
pub fn find_page(role: Role, page: &str) -> Option<&'static NavItem> {
    menu(role).iter().find(|item| item.is_active(page))
}

pub fn page_title(role: Role, page: &str) -> String {
    match find_page(role, page) {
        Some(item) if item.page == page => item.label.to_string(),
        _ => humanize(page),
    }
}

fn humanize(page: &str) -> String {
    page.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
