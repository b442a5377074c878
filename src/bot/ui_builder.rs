//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use teloxide::utils::html;

// Import localization
use crate::localization::{t, t_args};

use super::actions::{Action, AdminFlow, ServiceGroup};
use crate::catalog::{Article, CatalogDocument};
use crate::content::{Course, Service};
use crate::leads::Lead;
use crate::token::{ADMIN_TOKENS, BROWSE_TOKENS};

/// Reply keyboard labels. Incoming texts are matched against these exactly.
pub const MENU_SYMPTOMS: &str = "Симптомы и решения";
pub const MENU_COURSES: &str = "Курсы и обучение";
pub const MENU_SERVICES: &str = "Аудит и сопровождение";
pub const MENU_LEAD: &str = "Оставить заявку";
pub const BACK_TO_MENU: &str = "⬅️ В меню";
pub const WRITE_CONTACT: &str = "✍Написать контакт";

const SERVICE_CAPTION_MAX: usize = 32;
const COURSE_CAPTION_MAX: usize = 48;
const CATEGORY_CAPTION_MAX: usize = 42;
const LEAD_CONTACT_MAX: usize = 700;

/// Braille blank; widens the message bubble so long captions are not cut
const WIDE_PAD_CHAR: char = '⠀';
const WIDE_PAD_LEN: usize = 60;

/// A button of the main reply keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    Symptoms,
    Courses,
    Services,
    Lead,
    /// Any of the "back to menu" texts
    Menu,
}

impl MenuButton {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            MENU_SYMPTOMS => Some(MenuButton::Symptoms),
            MENU_COURSES => Some(MenuButton::Courses),
            MENU_SERVICES => Some(MenuButton::Services),
            MENU_LEAD | "📩 Оставить заявку" => Some(MenuButton::Lead),
            BACK_TO_MENU | "В меню" | "Меню" => Some(MenuButton::Menu),
            _ => None,
        }
    }
}

/// Shorten a button caption, ending it with an ellipsis when cut
pub fn shorten(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// Cut a long value for confirmation messages
pub fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

pub fn wide(text: String) -> String {
    let pad: String = std::iter::repeat(WIDE_PAD_CHAR).take(WIDE_PAD_LEN).collect();
    format!("{text}\n{pad}")
}

fn button(text: impl Into<String>, action: Action) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_data())
}

pub fn main_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(MENU_SYMPTOMS), KeyboardButton::new(MENU_COURSES)],
        vec![KeyboardButton::new(MENU_SERVICES), KeyboardButton::new(MENU_LEAD)],
    ])
    .resize_keyboard()
}

pub fn lead_contact_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(WRITE_CONTACT)],
        vec![KeyboardButton::new(BACK_TO_MENU)],
    ])
    .resize_keyboard()
}

/// Symptom categories for browsing
pub fn categories_keyboard(categories: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .map(|category| {
            vec![button(
                shorten(category, CATEGORY_CAPTION_MAX),
                Action::BrowseCategory(BROWSE_TOKENS.encode(category)),
            )]
        })
        .collect();

    rows.push(vec![button(t("btn-back-to-menu"), Action::BrowseMenu)]);
    InlineKeyboardMarkup::new(rows)
}

/// Previous/next buttons for card `index` of `total`
pub fn article_nav_keyboard(category: &str, index: usize, total: usize) -> InlineKeyboardMarkup {
    let token = BROWSE_TOKENS.encode(category);
    let mut rows = Vec::new();

    let mut nav_row = Vec::new();
    if index > 0 {
        nav_row.push(button(
            t("btn-prev"),
            Action::Navigate {
                token: token.clone(),
                index: index - 1,
            },
        ));
    }
    if index + 1 < total {
        nav_row.push(button(
            t("btn-next"),
            Action::Navigate {
                token,
                index: index + 1,
            },
        ));
    }
    if !nav_row.is_empty() {
        rows.push(nav_row);
    }

    rows.push(vec![button(t("btn-categories"), Action::BrowseCategories)]);
    rows.push(vec![button(t("btn-back-to-menu"), Action::BrowseMenu)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn render_article(article: &Article, index: usize, total: usize) -> String {
    let title = article.title.trim();
    let text = article.text.trim();
    let header = format!("({}/{})", index + 1, total);

    if !title.is_empty() {
        return format!("<b>{}</b> {}\n\n{}", html::escape(title), header, html::escape(text));
    }
    if text.is_empty() {
        return format!("{header}\n\n—");
    }
    format!("{}\n\n{}", header, html::escape(text))
}

/// Category keyboard of an admin flow. The add flow also offers a new category.
pub fn admin_categories_keyboard(flow: AdminFlow, categories: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .map(|category| {
            vec![button(
                shorten(category, CATEGORY_CAPTION_MAX),
                Action::AdminCategory {
                    flow,
                    token: ADMIN_TOKENS.encode(category),
                },
            )]
        })
        .collect();

    if flow == AdminFlow::Add {
        rows.push(vec![button(t("btn-new-category"), Action::AdminNewCategory)]);
    }
    rows.push(vec![button(t("btn-cancel"), Action::Cancel)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn admin_field_keyboard() -> InlineKeyboardMarkup {
    use crate::catalog::ArticleField;

    InlineKeyboardMarkup::new(vec![
        vec![button(t("field-title"), Action::AdminField(ArticleField::Title))],
        vec![button(t("field-text"), Action::AdminField(ArticleField::Text))],
        vec![button(t("btn-cancel"), Action::Cancel)],
    ])
}

pub fn services_root_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(t("btn-audits"), Action::ServiceGroup(ServiceGroup::Audit))],
        vec![button(t("btn-support"), Action::ServiceGroup(ServiceGroup::Support))],
        vec![button(t("btn-back-to-menu"), Action::ServicesMenu)],
    ])
}

pub fn services_list_keyboard(services: &[Service]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = services
        .iter()
        .map(|service| {
            vec![button(
                shorten(&service.name, SERVICE_CAPTION_MAX),
                Action::Service(service.id.trim().to_string()),
            )]
        })
        .collect();

    rows.push(vec![button(t("btn-back"), Action::ServicesBack)]);
    rows.push(vec![button(t("btn-back-to-menu"), Action::ServicesMenu)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn service_lead_keyboard(service_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        t("btn-lead"),
        Action::LeadStart {
            source: Some(format!("service:{service_id}")),
        },
    )]])
}

fn course_caption(course: &Course) -> String {
    let name = course.display_name();
    let caption = match course.next_dates.trim() {
        "" => name.to_string(),
        dates => format!("{name} • {dates}"),
    };
    shorten(&caption, COURSE_CAPTION_MAX)
}

pub fn courses_list_keyboard(courses: &[Course]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = courses
        .iter()
        .map(|course| vec![button(course_caption(course), Action::Course(course.id.trim().to_string()))])
        .collect();

    rows.push(vec![button(t("btn-back-to-menu"), Action::CoursesMenu)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn course_keyboard(course_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(
            t("btn-lead"),
            Action::LeadStart {
                source: Some(format!("course:{course_id}")),
            },
        )],
        vec![button(t("btn-back-to-courses"), Action::CoursesBack)],
        vec![button(t("btn-back-to-menu"), Action::CoursesMenu)],
    ])
}

/// Name, intro and bulleted sections of a service or course card
fn render_card(name: &str, short: &str, description: &str, sections: &[(String, &[String])]) -> String {
    let mut lines = vec![format!("<b>{}</b>", html::escape(name.trim()))];

    for paragraph in [short.trim(), description.trim()] {
        if !paragraph.is_empty() {
            lines.push(String::new());
            lines.push(html::escape(paragraph));
        }
    }

    for (title, items) in sections {
        let bullets: Vec<String> = items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(|item| format!("• {}", html::escape(item)))
            .collect();
        if bullets.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("<b>{title}:</b>"));
        lines.extend(bullets);
    }

    lines.join("\n")
}

pub fn render_service(service: &Service) -> String {
    render_card(
        &service.name,
        &service.short,
        &service.description,
        &[
            (t("service-tasks"), service.tasks_solved.as_slice()),
            (t("service-includes"), service.includes.as_slice()),
            (t("service-results"), service.results.as_slice()),
        ],
    )
}

pub fn render_course(course: &Course) -> String {
    render_card(
        course.display_name(),
        &course.short,
        &course.description,
        &[
            (t("course-for-who"), course.for_who.as_slice()),
            (t("course-benefits"), course.benefits.as_slice()),
            (t("course-program"), course.program.as_slice()),
            (t("course-results"), course.results.as_slice()),
        ],
    )
}

/// Category list with card counts for /list_symptoms
pub fn format_categories_overview(catalog: &CatalogDocument) -> String {
    if catalog.is_empty() {
        return t("overview-empty");
    }

    let mut lines = vec![t("overview-header"), String::new()];
    for (category, articles) in catalog {
        lines.push(format!("• {} — <b>{}</b>", html::escape(category), articles.len()));
    }
    lines.join("\n")
}

/// Numbered card titles of a category, as shown before picking a number
pub fn format_category_items(category: &str, articles: &[Article], limit: usize) -> String {
    let category = html::escape(category);
    if articles.is_empty() {
        return t_args("category-empty", &[("category", &category)]);
    }

    let shown = articles.len().min(limit).to_string();
    let total = articles.len().to_string();
    let mut lines = vec![
        format!("<b>{category}</b>"),
        t_args("category-items-shown", &[("shown", &shown), ("total", &total)]),
        String::new(),
    ];
    for (i, article) in articles.iter().take(limit).enumerate() {
        lines.push(format!("{}. {}", i + 1, untitled_or(&article.title)));
    }
    lines.join("\n")
}

/// Escaped title, or a placeholder for a card without one
pub fn untitled_or(title: &str) -> String {
    match title.trim() {
        "" => t("untitled"),
        title => html::escape(title),
    }
}

/// "Name | @username | id:123"
pub fn describe_person(name: &str, username: Option<&str>, user_id: u64) -> String {
    let mut who = Vec::new();
    if !name.trim().is_empty() {
        who.push(html::escape(name.trim()));
    }
    if let Some(username) = username.filter(|u| !u.is_empty()) {
        who.push(format!("@{}", html::escape(username)));
    }
    if user_id != 0 {
        who.push(format!("id:{user_id}"));
    }

    if who.is_empty() {
        "—".to_string()
    } else {
        who.join(" | ")
    }
}

/// One entry of /list_leads
pub fn format_lead(position: usize, lead: &Lead) -> String {
    let ts = match lead.ts.trim() {
        "" => "—",
        ts => ts,
    };
    let contact = shorten(&lead.contact_text, LEAD_CONTACT_MAX);

    let mut block = format!(
        "<b>{})</b> <i>{}</i>\n<b>{}:</b> {}\n<b>{}:</b> {}\n",
        position,
        html::escape(ts),
        t("label-who"),
        describe_person(&lead.name, lead.username.as_deref(), lead.user_id),
        t("label-contact"),
        html::escape(&contact),
    );
    if let Some(source) = lead.source.as_deref().filter(|s| !s.is_empty()) {
        block.push_str(&format!("<b>{}:</b> {}\n", t("label-source"), html::escape(source)));
    }
    block
}
