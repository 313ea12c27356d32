use validator::{Validate, ValidationError};

use super::{invalid, FormState};

pub const MIN_PASSWORD_LEN: usize = 6;

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.contains('@') {
        Ok(())
    } else {
        Err(invalid("email", "Email address must contain '@'"))
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(invalid("password", "Password must be more than 5 characters"))
    }
}

#[derive(Debug, Clone, Default, Validate)]
pub struct LoginForm {
    #[validate(custom = "validate_email")]
    pub email: String,
    #[validate(custom = "validate_password")]
    pub password: String,
}

impl FormState for LoginForm {
    const FIELDS: &'static [&'static str] = &["email", "password"];
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Validate)]
#[validate(schema(function = "passwords_match_registration"))]
pub struct RegistrationForm {
    #[validate(custom = "validate_email")]
    pub email: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    #[validate(custom = "validate_password")]
    pub password: String,
    pub confirm_password: String,
}

impl FormState for RegistrationForm {
    const FIELDS: &'static [&'static str] = &["email", "full_name", "phone", "password"];
}

fn passwords_match_registration(form: &RegistrationForm) -> Result<(), ValidationError> {
    if form.password == form.confirm_password {
        Ok(())
    } else {
        Err(invalid("password_mismatch", "Passwords do not match"))
    }
}

#[derive(Debug, Clone, Default, Validate)]
#[validate(schema(function = "passwords_match_change"))]
pub struct ChangePasswordForm {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(custom = "validate_password")]
    pub new_password: String,
    pub confirm_password: String,
}

impl FormState for ChangePasswordForm {
    const FIELDS: &'static [&'static str] = &["current_password", "new_password"];
}

fn passwords_match_change(form: &ChangePasswordForm) -> Result<(), ValidationError> {
    if form.new_password == form.confirm_password {
        Ok(())
    } else {
        Err(invalid("password_mismatch", "New passwords do not match"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a@b.c", "secret", true)]
    #[case("ab.c", "secret", false)]
    #[case("a@b.c", "12345", false)]
    #[case("", "", false)]
    fn login(#[case] email: &str, #[case] password: &str, #[case] valid: bool) {
        assert_eq!(LoginForm::new(email, password).is_valid(), valid);
    }

    fn registration() -> RegistrationForm {
        RegistrationForm {
            email: "ari@example.com".into(),
            full_name: "Ari Wibowo".into(),
            phone: "0812".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    #[test]
    fn registration_rules() {
        assert!(registration().is_valid());

        let mut mismatch = registration();
        mismatch.confirm_password = "secret2".into();
        assert_eq!(
            mismatch.check().unwrap_err().to_string(),
            "Validation error: Passwords do not match"
        );

        let mut no_phone = registration();
        no_phone.phone.clear();
        assert!(!no_phone.is_valid());

        let mut no_name = registration();
        no_name.full_name.clear();
        assert!(no_name.check().unwrap_err().to_string().contains("Full name"));
    }

    #[test]
    fn change_password_rules() {
        let mut form = ChangePasswordForm {
            current_password: "old-one".into(),
            new_password: "new-one".into(),
            confirm_password: "new-one".into(),
        };
        assert!(form.is_valid());

        form.confirm_password = "other".into();
        assert!(!form.is_valid());

        form.confirm_password = "new-one".into();
        form.current_password.clear();
        assert!(!form.is_valid());
    }
}
