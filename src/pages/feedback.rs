use serde::{Deserialize, Serialize};

use crate::{
    auth::{principal::Principal, services::is_valid_email},
    ingredients::validation::{ValidationError, ValidationErrors},
};

pub const FEEDBACK_SUBJECT: &str = "New feedback";
pub const FEEDBACK_SENT: &str = "Your feedback was successfully sent. Thank you!";
pub const FEEDBACK_REDIRECT: &str = "/api/v1/software/about-us";

const COMMENT_MIN_LEN: usize = 10;
const COMMENT_MAX_LEN: usize = 500;
const CONTACT_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedbackForm {
    /// Email address to answer to, optional.
    #[serde(default)]
    pub contact: Option<String>,
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackInitial {
    pub contact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackSent {
    pub message: &'static str,
    pub redirect: &'static str,
}

impl FeedbackForm {
    /// Trimmed copy of the form, or every problem found.
    pub fn clean(&self) -> Result<FeedbackForm, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let comment = self.comment.trim().to_string();
        let comment_len = comment.chars().count();
        if comment_len < COMMENT_MIN_LEN {
            errors.push(field(
                "comment",
                format!("Ensure this value has at least {COMMENT_MIN_LEN} characters"),
            ));
        } else if comment_len > COMMENT_MAX_LEN {
            errors.push(field(
                "comment",
                format!("Ensure this value has at most {COMMENT_MAX_LEN} characters"),
            ));
        }

        let contact = self
            .contact
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
        if let Some(contact) = contact.as_deref() {
            if contact.chars().count() > CONTACT_MAX_LEN {
                errors.push(field(
                    "contact",
                    format!("Ensure this value has at most {CONTACT_MAX_LEN} characters"),
                ));
            } else if !is_valid_email(contact) {
                errors.push(field("contact", "Enter a valid email address"));
            }
        }

        if errors.is_empty() {
            Ok(FeedbackForm { contact, comment })
        } else {
            Err(errors)
        }
    }
}

fn field(name: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError::Field {
        field: name,
        message: message.into(),
    }
}

/// Body of the mail sent to the administrators.
pub fn render_message(form: &FeedbackForm, user: Option<&Principal>) -> String {
    let sender = match user {
        Some(user) => format!("{} <{}>", user.username, user.email),
        None => "anonymous user".to_string(),
    };
    let contact = form.contact.as_deref().unwrap_or("-");
    format!(
        "Feedback from {sender}\nContact: {contact}\n\n{}\n",
        form.comment
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::regular_user;

    fn form(contact: Option<&str>, comment: &str) -> FeedbackForm {
        FeedbackForm {
            contact: contact.map(String::from),
            comment: comment.into(),
        }
    }

    #[test]
    fn short_comment_is_rejected() {
        let errors = form(None, "too short").clean().unwrap_err();
        assert_eq!(errors.0.len(), 1);
        assert!(errors.messages()[0].starts_with("comment:"));
    }

    #[test]
    fn long_comment_is_rejected() {
        let comment = "x".repeat(COMMENT_MAX_LEN + 1);
        assert!(form(None, &comment).clean().is_err());
        let comment = "x".repeat(COMMENT_MAX_LEN);
        assert!(form(None, &comment).clean().is_ok());
    }

    #[test]
    fn contact_must_be_an_email() {
        let errors = form(Some("call me maybe"), "The app is great, thanks!")
            .clean()
            .unwrap_err();
        assert_eq!(errors.messages(), vec!["contact: Enter a valid email address"]);

        let long = format!("{}@example.com", "a".repeat(45));
        assert!(form(Some(&long), "The app is great, thanks!").clean().is_err());
    }

    #[test]
    fn blank_contact_is_dropped() {
        let cleaned = form(Some("  "), "  The app is great, thanks!  ").clean().unwrap();
        assert_eq!(cleaned.contact, None);
        assert_eq!(cleaned.comment, "The app is great, thanks!");
    }

    #[test]
    fn all_problems_reported_together() {
        let errors = form(Some("nope"), "short").clean().unwrap_err();
        assert_eq!(errors.0.len(), 2);
    }

    #[test]
    fn message_names_sender_and_contact() {
        let f = form(Some("jane@example.com"), "Please add more recipes.");
        let body = render_message(&f, Some(&regular_user("jane")));
        assert!(body.starts_with("Feedback from jane <jane@example.com>"));
        assert!(body.contains("Contact: jane@example.com"));
        assert!(body.contains("Please add more recipes."));

        let anonymous = render_message(&form(None, "Please add more recipes."), None);
        assert!(anonymous.contains("anonymous user"));
        assert!(anonymous.contains("Contact: -"));
    }
}
