//! Field-level validators.
//!
//! Every function here is pure: it inspects its input and returns the list of
//! human-readable problems found, an empty list meaning the value is valid.
//! Callers collect the lists of all the fields they touch and fail once with
//! the whole set, instead of stopping at the first bad field.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{NewTask, RegisterRequest, TaskPatch};

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 8;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

pub fn validate_title(title: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if title.trim().is_empty() {
        errors.push("Title cannot be empty".to_string());
    } else if title.chars().count() > TITLE_MAX_CHARS {
        errors.push(format!("Title cannot exceed {TITLE_MAX_CHARS} characters"));
    }
    errors
}

pub fn validate_description(description: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.push(format!(
            "Description cannot exceed {DESCRIPTION_MAX_CHARS} characters"
        ));
    }
    errors
}

pub fn validate_username(username: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let len = username.chars().count();

    if username.trim().is_empty() {
        errors.push("Username cannot be empty".to_string());
    } else if len < USERNAME_MIN_CHARS {
        errors.push(format!(
            "Username must be at least {USERNAME_MIN_CHARS} characters long"
        ));
    } else if len > USERNAME_MAX_CHARS {
        errors.push(format!(
            "Username cannot exceed {USERNAME_MAX_CHARS} characters"
        ));
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.push(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        );
    }
    errors
}

pub fn validate_email(email: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if email.trim().is_empty() {
        errors.push("Email cannot be empty".to_string());
    } else if !email_regex().is_match(email) {
        errors.push("Invalid email format".to_string());
    }
    errors
}

pub fn validate_password(password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if password.chars().count() < PASSWORD_MIN_CHARS {
        errors.push(format!(
            "Password must be at least {PASSWORD_MIN_CHARS} characters long"
        ));
    }
    errors
}

/// Checks the fields of a task about to be created.
pub fn validate_new_task(new_task: &NewTask) -> Vec<String> {
    let mut errors = validate_title(new_task.title.trim());
    if let Some(description) = &new_task.description {
        errors.extend(validate_description(description));
    }
    errors
}

/// Checks only the fields a patch actually carries.
pub fn validate_patch(patch: &TaskPatch) -> Vec<String> {
    let mut errors = Vec::new();
    if let Some(title) = &patch.title {
        errors.extend(validate_title(title.trim()));
    }
    if let Some(description) = &patch.description {
        errors.extend(validate_description(description));
    }
    errors
}

pub fn validate_registration(request: &RegisterRequest) -> Vec<String> {
    let mut errors = validate_username(request.username.trim());
    errors.extend(validate_email(request.email.trim()));
    errors.extend(validate_password(&request.password));
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Buy milk")]
    #[case("a")]
    #[case("  padded  ")]
    fn accepts_reasonable_titles(#[case] title: &str) {
        assert!(validate_title(title).is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn rejects_blank_titles(#[case] title: &str) {
        assert_eq!(validate_title(title), vec!["Title cannot be empty"]);
    }

    #[test]
    fn title_length_is_counted_in_characters() {
        assert!(validate_title(&"é".repeat(200)).is_empty());
        assert_eq!(
            validate_title(&"x".repeat(201)),
            vec!["Title cannot exceed 200 characters"]
        );
    }

    #[test]
    fn description_limit() {
        assert!(validate_description("").is_empty());
        assert!(validate_description(&"d".repeat(1000)).is_empty());
        assert_eq!(
            validate_description(&"d".repeat(1001)),
            vec!["Description cannot exceed 1000 characters"]
        );
    }

    #[rstest]
    #[case("ab", Some("at least 3 characters"))]
    #[case("valid_user-1", None)]
    #[case("bad@name", Some("can only contain"))]
    #[case("", Some("cannot be empty"))]
    #[case("   ", Some("cannot be empty"))]
    #[case("abc", None)]
    fn username_rules(#[case] username: &str, #[case] expected: Option<&str>) {
        let errors = validate_username(username);
        match expected {
            None => assert!(errors.is_empty(), "unexpected errors: {errors:?}"),
            Some(fragment) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains(fragment), "got {errors:?}");
            }
        }
    }

    #[test]
    fn username_upper_bound() {
        assert!(validate_username(&"u".repeat(50)).is_empty());
        assert_eq!(
            validate_username(&"u".repeat(51)),
            vec!["Username cannot exceed 50 characters"]
        );
    }

    #[rstest]
    #[case("user@example.com", true)]
    #[case("first.last+tag@sub.example.org", true)]
    #[case("user@localhost", false)]
    #[case("no-at-sign.com", false)]
    #[case("user@example.c", false)]
    fn email_shape(#[case] email: &str, #[case] valid: bool) {
        assert_eq!(validate_email(email).is_empty(), valid, "{email}");
    }

    #[test]
    fn empty_email_has_its_own_message() {
        assert_eq!(validate_email(""), vec!["Email cannot be empty"]);
    }

    #[test]
    fn password_minimum() {
        assert!(validate_password("12345678").is_empty());
        assert_eq!(
            validate_password("1234567"),
            vec!["Password must be at least 8 characters long"]
        );
    }

    #[test]
    fn patch_validation_ignores_absent_fields() {
        assert!(validate_patch(&TaskPatch::default()).is_empty());

        let patch = TaskPatch {
            title: Some(" ".into()),
            description: Some("d".repeat(1001)),
            ..TaskPatch::default()
        };
        assert_eq!(validate_patch(&patch).len(), 2);
    }

    #[test]
    fn registration_collects_every_field() {
        let request = RegisterRequest {
            username: "ab".into(),
            email: "nope".into(),
            password: "short".into(),
        };
        assert_eq!(validate_registration(&request).len(), 3);
    }

    #[test]
    fn email_pattern_compiles() {
        assert!(email_regex().is_match("user@example.com"));
    }

    proptest! {
        #[test]
        fn titles_within_bounds_are_valid(title in "\\PC{1,200}") {
            prop_assume!(!title.trim().is_empty());
            prop_assert!(validate_title(&title).is_empty());
        }

        #[test]
        fn whitespace_titles_are_rejected(title in "[ \t\n\r]{0,30}") {
            prop_assert_eq!(validate_title(&title), vec!["Title cannot be empty".to_string()]);
        }

        #[test]
        fn long_titles_are_rejected(title in "[a-z]{201,400}") {
            prop_assert_eq!(
                validate_title(&title),
                vec!["Title cannot exceed 200 characters".to_string()]
            );
        }

        #[test]
        fn description_limit_holds_for_any_text(description in "\\PC{0,3000}") {
            let valid = description.chars().count() <= DESCRIPTION_MAX_CHARS;
            prop_assert_eq!(validate_description(&description).is_empty(), valid);
        }
    }
}
