use serde::{Deserialize, Serialize};

/// Contact form body. Every field is optional at the deserialization layer so
/// missing values surface as validation errors rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub event_category: Option<String>,
    pub event_type: Option<String>,
    pub event_date_start: Option<String>,
    pub event_date_end: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ContactSubmission {
    /// Empty result means the submission is valid.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if is_blank(&self.name) {
            errors.push(FieldError {
                field: "name",
                message: "Name is required",
            });
        }
        match self.email.as_deref().map(str::trim) {
            None | Some("") => errors.push(FieldError {
                field: "email",
                message: "A valid email is required",
            }),
            Some(value) if !is_well_formed_email(value) => errors.push(FieldError {
                field: "email",
                message: "A valid email is required",
            }),
            _ => {}
        }
        if is_blank(&self.message) {
            errors.push(FieldError {
                field: "message",
                message: "Message is required",
            });
        }

        errors
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("").trim()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn is_well_formed_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_submission() -> ContactSubmission {
        ContactSubmission {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            message: Some("Hello".into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert!(valid_submission().validate().is_empty());
    }

    #[test]
    fn missing_email_names_the_field() {
        let submission = ContactSubmission {
            email: None,
            ..valid_submission()
        };
        let errors = submission.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");
    }

    #[test]
    fn malformed_email_is_rejected() {
        for bad in ["no-at-sign", "a@b", "a@.com", "a b@c.com", "@c.com", "a@"] {
            let submission = ContactSubmission {
                email: Some(bad.into()),
                ..valid_submission()
            };
            assert!(!submission.validate().is_empty(), "accepted {bad:?}");
        }
    }

    #[test]
    fn whitespace_only_fields_are_missing() {
        let submission = ContactSubmission {
            name: Some("   ".into()),
            message: Some("".into()),
            ..valid_submission()
        };
        let fields: Vec<_> = submission.validate().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "message"]);
    }
}
