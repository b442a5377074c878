//! Callback payloads of inline buttons.
//!
//! Every button's callback data is produced by [`Action::to_data`] and read
//! back by [`Action::parse`], so the wire format lives in one place. Payloads
//! have the form `namespace:payload`.

use thiserror::Error;

use crate::catalog::ArticleField;
use crate::token::{ADMIN_TOKENS, BROWSE_TOKENS};

const MENU_MARKER: &str = "__menu__";
const BACK_MARKER: &str = "__back__";

/// Which admin flow a category keyboard belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminFlow {
    Add,
    Delete,
    Edit,
}

impl AdminFlow {
    fn namespace(&self) -> &'static str {
        match self {
            AdminFlow::Add => "adm_symcat",
            AdminFlow::Delete => "adm_symdelcat",
            AdminFlow::Edit => "adm_symeditcat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceGroup {
    Audit,
    Support,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Back to the main menu from the symptom browser
    BrowseMenu,
    /// Show the symptom categories again
    BrowseCategories,
    /// Open a symptom category by its browse token
    BrowseCategory(String),
    /// Show card `index` of the category behind `token`
    Navigate { token: String, index: usize },

    /// Category picked on an admin keyboard (admin token)
    AdminCategory { flow: AdminFlow, token: String },
    /// "New category" in the add flow
    AdminNewCategory,
    /// Field picked in the edit flow
    AdminField(ArticleField),
    /// Cancel the current admin flow
    Cancel,

    /// Start lead capture, optionally tagged with what it is about
    LeadStart { source: Option<String> },

    ServicesMenu,
    ServicesBack,
    ServiceGroup(ServiceGroup),
    Service(String),

    CoursesMenu,
    CoursesBack,
    Course(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionParseError {
    #[error("unknown action namespace")]
    UnknownNamespace,
    #[error("malformed payload for '{0}'")]
    Malformed(&'static str),
}

impl Action {
    /// Encode the action as callback data
    pub fn to_data(&self) -> String {
        match self {
            Action::BrowseMenu => format!("symcat:{MENU_MARKER}"),
            Action::BrowseCategories => format!("symcat:{BACK_MARKER}"),
            Action::BrowseCategory(token) => format!("symcat:{token}"),
            Action::Navigate { token, index } => format!("sym:item:{token}:{index}"),
            Action::AdminCategory { flow, token } => format!("{}:{}", flow.namespace(), token),
            Action::AdminNewCategory => "adm_symnew".to_string(),
            Action::AdminField(field) => format!("adm_symentry:{}", field.as_str()),
            Action::Cancel => "adm_symcancel".to_string(),
            Action::LeadStart { source } => format!("lead:{}", source.as_deref().unwrap_or("")),
            Action::ServicesMenu => "svcgrp:menu".to_string(),
            Action::ServicesBack => "svcgrp:back".to_string(),
            Action::ServiceGroup(ServiceGroup::Audit) => "svcgrp:audit".to_string(),
            Action::ServiceGroup(ServiceGroup::Support) => "svcgrp:support".to_string(),
            Action::Service(id) => format!("svc:{id}"),
            Action::CoursesMenu => format!("course:{MENU_MARKER}"),
            Action::CoursesBack => format!("course:{BACK_MARKER}"),
            Action::Course(id) => format!("course:{id}"),
        }
    }

    /// Parse callback data.
    ///
    /// An unknown namespace means the data is not ours and should be ignored;
    /// a malformed payload of a known namespace is acknowledged without any
    /// content update.
    pub fn parse(data: &str) -> Result<Action, ActionParseError> {
        match data {
            "adm_symnew" => return Ok(Action::AdminNewCategory),
            "adm_symcancel" => return Ok(Action::Cancel),
            _ => {}
        }

        let (namespace, payload) = data
            .split_once(':')
            .ok_or(ActionParseError::UnknownNamespace)?;
        let payload = payload.trim();

        match namespace {
            "symcat" => match payload {
                MENU_MARKER => Ok(Action::BrowseMenu),
                BACK_MARKER => Ok(Action::BrowseCategories),
                token if BROWSE_TOKENS.is_well_formed(token) => Ok(Action::BrowseCategory(token.to_string())),
                _ => Err(ActionParseError::Malformed("symcat")),
            },
            "sym" => parse_navigate(payload),
            "adm_symcat" => parse_admin_category(AdminFlow::Add, payload),
            "adm_symdelcat" => parse_admin_category(AdminFlow::Delete, payload),
            "adm_symeditcat" => parse_admin_category(AdminFlow::Edit, payload),
            "adm_symentry" => ArticleField::parse(payload)
                .map(Action::AdminField)
                .ok_or(ActionParseError::Malformed("adm_symentry")),
            "lead" => Ok(Action::LeadStart {
                source: Some(payload.to_string()).filter(|s| !s.is_empty()),
            }),
            "svcgrp" => match payload {
                "audit" => Ok(Action::ServiceGroup(ServiceGroup::Audit)),
                "support" => Ok(Action::ServiceGroup(ServiceGroup::Support)),
                "menu" => Ok(Action::ServicesMenu),
                "back" => Ok(Action::ServicesBack),
                _ => Err(ActionParseError::Malformed("svcgrp")),
            },
            "svc" if !payload.is_empty() => Ok(Action::Service(payload.to_string())),
            "svc" => Err(ActionParseError::Malformed("svc")),
            "course" => match payload {
                MENU_MARKER => Ok(Action::CoursesMenu),
                BACK_MARKER => Ok(Action::CoursesBack),
                "" => Err(ActionParseError::Malformed("course")),
                id => Ok(Action::Course(id.to_string())),
            },
            _ => Err(ActionParseError::UnknownNamespace),
        }
    }
}

/// `item:<token>:<index>`. Tokens are hex, so the index is whatever follows the last colon.
fn parse_navigate(payload: &str) -> Result<Action, ActionParseError> {
    let malformed = ActionParseError::Malformed("sym");
    let rest = payload.strip_prefix("item:").ok_or(malformed.clone())?;
    let (token, index) = rest.rsplit_once(':').ok_or(malformed.clone())?;
    if !BROWSE_TOKENS.is_well_formed(token) {
        return Err(malformed);
    }
    let index = index.parse::<usize>().map_err(|_| malformed)?;
    Ok(Action::Navigate {
        token: token.to_string(),
        index,
    })
}

fn parse_admin_category(flow: AdminFlow, payload: &str) -> Result<Action, ActionParseError> {
    if !ADMIN_TOKENS.is_well_formed(payload) {
        return Err(ActionParseError::Malformed(flow.namespace()));
    }
    Ok(Action::AdminCategory {
        flow,
        token: payload.to_string(),
    })
}
