//! Verification email rendering. Pure functions, no transport concerns.

pub const VERIFICATION_SUBJECT: &str = "Mystery message | Verification Code";

/// Inputs for the verification template.
#[derive(Debug, Clone, Copy)]
pub struct VerificationEmail<'a> {
    pub display_name: &'a str,
    pub code: &'a str,
}

/// Rendered message ready to hand to any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl VerificationEmail<'_> {
    pub fn render(&self) -> RenderedEmail {
        RenderedEmail {
            subject: VERIFICATION_SUBJECT.to_string(),
            text: self.text(),
            html: self.html(),
        }
    }

    fn text(&self) -> String {
        format!(
            "Hello {name},\n\n\
             Thank you for registering. Please use the following verification code \
             to complete your registration:\n\n\
             {code}\n\n\
             This code expires in one hour.\n\
             If you did not request this code, please ignore this email.",
            name = self.display_name,
            code = self.code,
        )
    }

    fn html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Verification Code</title>
</head>
<body style="font-family: Roboto, Verdana, sans-serif;">
    <h2>Hello {name},</h2>
    <p>Thank you for registering. Please use the following verification code to complete your registration:</p>
    <p style="font-size: 28px; font-weight: bold; letter-spacing: 6px;">{code}</p>
    <p>This code expires in one hour.</p>
    <p>If you did not request this code, please ignore this email.</p>
</body>
</html>"#,
            name = escape_html(self.display_name),
            code = escape_html(self.code),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
