//! App registry and knowledge-base input rules, plus the sample data used to
//! bootstrap a fresh install.

use rand::{distr::Alphanumeric, Rng};
use serde::Serialize;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::{
    db::{app_repository::AppRepository, faq_repository::FaqRepository},
    models::{
        app::{AppChanges, NewApp},
        faq::NewFaq,
    },
};

pub const API_KEY_PREFIX: &str = "app_";
const API_KEY_SUFFIX_LEN: usize = 13;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Site URL must be an absolute http(s) URL")]
    InvalidSiteUrl,
}

/// Trims `value` and rejects it when nothing is left.
pub fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_site_url(raw: &str) -> Result<String, ValidationError> {
    let url = Url::parse(raw.trim()).map_err(|_| ValidationError::InvalidSiteUrl)?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url.to_string()),
        _ => Err(ValidationError::InvalidSiteUrl),
    }
}

pub fn validate_app_changes(
    name: &str,
    description: Option<String>,
    site_url: Option<String>,
) -> Result<AppChanges, ValidationError> {
    let name = required_text("App name", name)?;
    let site_url = match optional_text(site_url) {
        Some(raw) => Some(validate_site_url(&raw)?),
        None => None,
    };
    Ok(AppChanges {
        name,
        description: optional_text(description),
        site_url,
    })
}

pub fn validate_faq(
    app_id: Uuid,
    question: &str,
    answer: &str,
    category: &str,
) -> Result<NewFaq, ValidationError> {
    Ok(NewFaq {
        app_id,
        question: required_text("Question", question)?,
        answer: required_text("Answer", answer)?,
        category: required_text("Category", category)?,
    })
}

/// `app_` followed by 13 random lowercase alphanumerics.
pub fn generate_api_key() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..API_KEY_SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect();
    format!("{API_KEY_PREFIX}{suffix}")
}

pub fn new_app(changes: AppChanges, api_key: Option<String>, created_by: &str) -> NewApp {
    NewApp {
        name: changes.name,
        description: changes.description,
        site_url: changes.site_url,
        api_key: optional_text(api_key).unwrap_or_else(generate_api_key),
        created_by: created_by.to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct SeedReport {
    pub app_ids: Vec<Uuid>,
    pub faq_ids: Vec<Uuid>,
}

struct SampleFaq {
    app: usize,
    question: &'static str,
    answer: &'static str,
    category: &'static str,
}

const SAMPLE_APPS: [&str; 2] = ["My Awesome App", "Cool Project"];

const SAMPLE_FAQS: [SampleFaq; 3] = [
    SampleFaq {
        app: 0,
        question: "How do I reset my password?",
        answer: "To reset your password, click on the \"Forgot Password\" link on the login page and follow the instructions sent to your email.",
        category: "Account",
    },
    SampleFaq {
        app: 0,
        question: "How do I cancel my subscription?",
        answer: "You can cancel your subscription from your account settings. Navigate to Settings > Billing > Cancel Subscription.",
        category: "Billing",
    },
    SampleFaq {
        app: 1,
        question: "What are the system requirements?",
        answer: "The app requires a modern web browser (Chrome, Firefox, Safari, or Edge) and a stable internet connection.",
        category: "General",
    },
];

/// Inserts the two sample apps and three sample FAQs. Not idempotent: every
/// call adds a fresh set.
pub async fn seed_sample_data(
    apps: &dyn AppRepository,
    faqs: &dyn FaqRepository,
    created_by: &str,
) -> Result<SeedReport, sqlx::Error> {
    let mut app_ids = Vec::with_capacity(SAMPLE_APPS.len());
    for name in SAMPLE_APPS {
        let changes = AppChanges {
            name: name.to_string(),
            description: None,
            site_url: None,
        };
        let app = apps.create_app(new_app(changes, None, created_by)).await?;
        app_ids.push(app.id);
    }

    let mut faq_ids = Vec::with_capacity(SAMPLE_FAQS.len());
    for sample in &SAMPLE_FAQS {
        let faq = faqs
            .create_faq(NewFaq {
                app_id: app_ids[sample.app],
                question: sample.question.to_string(),
                answer: sample.answer.to_string(),
                category: sample.category.to_string(),
            })
            .await?;
        faq_ids.push(faq.id);
    }

    Ok(SeedReport { app_ids, faq_ids })
}
