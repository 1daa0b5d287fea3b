use lazy_static::lazy_static;
use regex::Regex;

use super::dto::SignUpRequest;

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 6;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let len = username.chars().count();
    if len < USERNAME_MIN {
        return Err("Username must be at least 2 characters");
    }
    if len > USERNAME_MAX {
        return Err("Username must be no more than 20 characters");
    }
    if !USERNAME_RE.is_match(username) {
        return Err("Username must not contain special characters");
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

impl SignUpRequest {
    /// Trims the username, trims and lowercases the email.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self
    }

    /// Returns the first field error, checked in username, email, password order.
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_username(&self.username)?;
        if !is_valid_email(&self.email) {
            return Err("Invalid email address");
        }
        if self.password.chars().count() < PASSWORD_MIN {
            return Err("Password must be at least 6 characters");
        }
        Ok(())
    }
}
