// src/models/participant.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration form submitted before the countdown starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 2, max = 100, message = "Name must be at least 2 characters."))]
    pub participant_name: String,

    #[validate(length(
        min = 10,
        max = 15,
        message = "Mobile number must be between 10 and 15 characters."
    ))]
    pub mobile_number: String,

    #[validate(length(min = 2, max = 100, message = "Panchayath must be at least 2 characters."))]
    pub panchayath: String,

    /// Mobile number of the participant who invited this one.
    #[validate(length(
        min = 10,
        max = 15,
        message = "Referrer mobile number must be between 10 and 15 characters."
    ))]
    pub referrer_mobile: Option<String>,

    /// Code from a share link the participant arrived through.
    #[validate(length(max = 64))]
    pub share_code: Option<String>,
}

impl RegistrationForm {
    /// Trims every field and turns blank optionals into `None`.
    pub fn normalized(self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            participant_name: self.participant_name.trim().to_string(),
            mobile_number: self.mobile_number.trim().to_string(),
            panchayath: self.panchayath.trim().to_string(),
            referrer_mobile: blank_to_none(self.referrer_mobile),
            share_code: blank_to_none(self.share_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            participant_name: "Anu".to_string(),
            mobile_number: "9876543210".to_string(),
            panchayath: "Kumily".to_string(),
            referrer_mobile: None,
            share_code: None,
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn short_name_is_rejected() {
        let form = RegistrationForm {
            participant_name: "A".to_string(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("participant_name"));
    }

    #[test]
    fn mobile_length_bounds() {
        for (mobile, ok) in [
            ("123456789", false),
            ("1234567890", true),
            ("123456789012345", true),
            ("1234567890123456", false),
        ] {
            let form = RegistrationForm {
                mobile_number: mobile.to_string(),
                ..valid_form()
            };
            assert_eq!(form.validate().is_ok(), ok, "mobile {mobile}");
        }
    }

    #[test]
    fn referrer_is_checked_only_when_present() {
        let absent = valid_form();
        assert!(absent.validate().is_ok());

        let short = RegistrationForm {
            referrer_mobile: Some("12345".to_string()),
            ..valid_form()
        };
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("referrer_mobile"));
    }

    #[test]
    fn normalized_drops_blank_optionals() {
        let form = RegistrationForm {
            participant_name: "  Anu ".to_string(),
            referrer_mobile: Some("   ".to_string()),
            share_code: Some(" abc ".to_string()),
            ..valid_form()
        }
        .normalized();
        assert_eq!(form.participant_name, "Anu");
        assert_eq!(form.referrer_mobile, None);
        assert_eq!(form.share_code.as_deref(), Some("abc"));
    }
}
