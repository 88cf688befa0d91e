use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

/// Known email types. Unknown strings are a per-record error in the worker,
/// never a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailType {
    MeetingInvite,
    MeetingCancel,
    ForgotPassword,
    PasswordEmail,
}

impl EmailType {
    /// Case-insensitive: legacy records carry mixed-case type strings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "meeting_invite" => Some(Self::MeetingInvite),
            // Both spellings occur in historical records
            "meeting_cancel" | "meeting_cancellation" => Some(Self::MeetingCancel),
            "forgot_password" => Some(Self::ForgotPassword),
            "password_email" => Some(Self::PasswordEmail),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeetingInvite => "meeting_invite",
            Self::MeetingCancel => "meeting_cancel",
            Self::ForgotPassword => "forgot_password",
            Self::PasswordEmail => "password_email",
        }
    }
}

/// Rendered subject + plain-text + HTML bodies.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn render(email_type: EmailType, data: &Value) -> RenderedEmail {
    match email_type {
        EmailType::MeetingInvite => meeting_invite(data),
        EmailType::MeetingCancel => meeting_cancel(data),
        EmailType::ForgotPassword => forgot_password(data),
        EmailType::PasswordEmail => password_email(data),
    }
}

fn str_field<'a>(data: &'a Value, key: &str, fallback: &'a str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

/// Format an ISO-8601 instant as an IST date and time pair. Naive inputs are
/// treated as UTC. Unparseable inputs render as "-".
fn fmt_ist(iso: Option<&str>) -> (String, String) {
    let Some(iso) = iso else {
        return ("-".to_string(), "-".to_string());
    };

    let parsed = DateTime::parse_from_rfc3339(&iso.replace('Z', "+00:00"))
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S")
                .map(|naive| naive.and_utc())
        });

    let Ok(dt) = parsed else {
        return ("-".to_string(), "-".to_string());
    };

    // UTC+05:30
    let Some(ist) = FixedOffset::east_opt(5 * 3600 + 1800) else {
        return ("-".to_string(), "-".to_string());
    };
    let local = dt.with_timezone(&ist);
    (
        local.format("%d %B %Y").to_string(),
        local.format("%I:%M %p").to_string(),
    )
}

fn meeting_invite(data: &Value) -> RenderedEmail {
    let title = str_field(data, "title", "Meeting");
    let description = str_field(data, "description", "No description provided.");
    let meeting_id = str_field(data, "meeting_id", "N/A");

    let start = data.get("start_time").and_then(Value::as_str);
    let end = data.get("end_time").and_then(Value::as_str);
    let (date_str, start_str) = fmt_ist(start);
    let (_, end_str) = fmt_ist(end);

    let subject = format!("Meeting Invitation: {}", title);
    let text = format!(
        "Hello,\n\nYou are invited to the meeting below:\n\n\
         Title: {title}\nDescription: {description}\nDate: {date_str}\n\
         Start Time (IST): {start_str}\nEnd Time (IST): {end_str}\n\
         Meeting Code: {meeting_id}\n\nRegards,\nCampus Team\n"
    );
    let html = format!(
        "<html><body style=\"font-family: Arial, sans-serif; line-height:1.6;\">\
         <p>Hello,</p>\
         <p>You are cordially invited to join the upcoming virtual meeting as per the details below:</p>\
         <table style=\"border-collapse: collapse;\">\
         <tr><td><strong>Title:</strong></td><td>{title}</td></tr>\
         <tr><td><strong>Description:</strong></td><td>{description}</td></tr>\
         <tr><td><strong>Date:</strong></td><td>{date_str}</td></tr>\
         <tr><td><strong>Start Time (IST):</strong></td><td>{start_str}</td></tr>\
         <tr><td><strong>End Time (IST):</strong></td><td>{end_str}</td></tr>\
         <tr><td><strong>Meeting Code:</strong></td><td>{meeting_id}</td></tr>\
         </table>\
         <p>Warm regards,<br><strong>Campus Team</strong></p>\
         </body></html>"
    );

    RenderedEmail { subject, text, html }
}

fn meeting_cancel(data: &Value) -> RenderedEmail {
    let title = str_field(data, "title", "Meeting");
    let meeting_id = str_field(data, "meeting_id", "N/A");

    let start = data.get("start_time").and_then(Value::as_str);
    let end = data.get("end_time").and_then(Value::as_str);
    let (date_str, start_str) = fmt_ist(start);
    let (_, end_str) = fmt_ist(end);

    let subject = format!("Meeting Cancelled: {}", title);
    let text = format!(
        "Hello,\n\nThe following meeting has been cancelled:\n\n\
         Title: {title}\nDate: {date_str}\nStart Time (IST): {start_str}\n\
         End Time (IST): {end_str}\nMeeting Code: {meeting_id}\n\nRegards,\nCampus Team\n"
    );
    let html = format!(
        "<html><body style=\"font-family: Arial, sans-serif;\">\
         <p>The following meeting has been <strong>cancelled</strong>:</p>\
         <table>\
         <tr><td><strong>Title:</strong></td><td>{title}</td></tr>\
         <tr><td><strong>Date:</strong></td><td>{date_str}</td></tr>\
         <tr><td><strong>Start Time:</strong></td><td>{start_str}</td></tr>\
         <tr><td><strong>End Time:</strong></td><td>{end_str}</td></tr>\
         </table>\
         <p>Regards,<br><strong>Campus Team</strong></p>\
         </body></html>"
    );

    RenderedEmail { subject, text, html }
}

fn forgot_password(data: &Value) -> RenderedEmail {
    let email = str_field(data, "email", "user");
    let temp_password = str_field(data, "temp_password", "");
    let user_id = str_field(data, "user_id", "N/A");
    let full_name = str_field(data, "full_name", "User");

    let subject = "Temporary Password - Campus".to_string();
    let text = format!(
        "Hello {full_name},\n\n\
         A temporary password has been generated for your account ({email}).\n\n\
         User ID: {user_id}\nTemporary Password: {temp_password}\n\n\
         Please sign in and change your password immediately.\n\nRegards,\nCampus Team\n"
    );
    let html = format!(
        "<html><body style=\"font-family: Arial, sans-serif;\">\
         <p>Hello {full_name},</p>\
         <p>A temporary password has been generated for your account (<strong>{email}</strong>).</p>\
         <ul>\
         <li><strong>User ID:</strong> {user_id}</li>\
         <li><strong>Temporary Password:</strong> {temp_password}</li>\
         </ul>\
         <p>Please sign in and change your password immediately.</p>\
         <p>Regards,<br><strong>Campus Team</strong></p>\
         </body></html>"
    );

    RenderedEmail { subject, text, html }
}

fn password_email(data: &Value) -> RenderedEmail {
    let password = str_field(data, "password", "");
    let user_email = str_field(data, "user_email", "N/A");

    let subject = "Your Campus Account Credentials".to_string();
    let text = format!(
        "Dear User,\n\n\
         Welcome to Campus! We are pleased to provide you with the credentials to access your account.\n\n\
         Your Account Credentials:\nLogin Email: {user_email}\nTemporary Password: {password}\n\n\
         (Note: We recommend copying and pasting the password to avoid typing errors)\n\n\
         Please log in using your email address and the temporary password, then go to the \
         Profile section and create a new personal password.\n\n\
         Sincerely,\nCampus Team"
    );
    let html = format!(
        "<html><body style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\
         <p>Dear User,</p>\
         <p>Welcome to <strong>Campus</strong>! We are pleased to provide you with the credentials to access your account.</p>\
         <h3>Your Account Credentials:</h3>\
         <table style=\"border-collapse: collapse; margin-top: 10px;\">\
         <tr><td style=\"padding:4px 8px;\"><strong>Login Email:</strong></td>\
         <td style=\"padding:4px 8px;\">{user_email}</td></tr>\
         <tr><td style=\"padding:4px 8px;\"><strong>Temporary Password:</strong></td>\
         <td style=\"padding:4px 8px;\">{password}</td></tr>\
         </table>\
         <p style=\"margin-top: 10px;\"><em>Note: We recommend copying and pasting the password to avoid typing errors.</em></p>\
         <p>Please log in using your email address and the temporary password, then go to the \
         <strong>Profile</strong> section and create a new personal password.</p>\
         <p>Sincerely,<br>Campus Team</p>\
         </body></html>"
    );

    RenderedEmail { subject, text, html }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_cancellation_spellings() {
        assert_eq!(EmailType::parse("meeting_cancel"), Some(EmailType::MeetingCancel));
        assert_eq!(
            EmailType::parse("meeting_cancellation"),
            Some(EmailType::MeetingCancel)
        );
        assert_eq!(EmailType::parse("student_welcome"), None);
        assert_eq!(EmailType::parse(""), None);
    }

    #[test]
    fn type_parsing_ignores_case() {
        assert_eq!(EmailType::parse("Password_Email"), Some(EmailType::PasswordEmail));
        assert_eq!(
            EmailType::parse("MEETING_CANCELLATION"),
            Some(EmailType::MeetingCancel)
        );
        assert_eq!(EmailType::parse("Forgot_Password"), Some(EmailType::ForgotPassword));
    }

    #[test]
    fn meeting_invite_includes_ist_times() {
        let rendered = render(
            EmailType::MeetingInvite,
            &json!({
                "title": "Sprint Review",
                "meeting_id": "M-42",
                "start_time": "2024-06-01T09:00:00Z",
                "end_time": "2024-06-01T10:00:00Z"
            }),
        );
        assert_eq!(rendered.subject, "Meeting Invitation: Sprint Review");
        // 09:00 UTC is 14:30 IST
        assert!(rendered.text.contains("02:30 PM"));
        assert!(rendered.html.contains("M-42"));
    }

    #[test]
    fn unparseable_times_render_as_dashes() {
        let rendered = render(
            EmailType::MeetingCancel,
            &json!({"title": "Standup", "start_time": "not-a-date"}),
        );
        assert!(rendered.text.contains("Date: -"));
    }

    #[test]
    fn password_email_carries_credentials() {
        let rendered = render(
            EmailType::PasswordEmail,
            &json!({"user_email": "a@b.c", "password": "tmp123"}),
        );
        assert!(rendered.text.contains("a@b.c"));
        assert!(rendered.text.contains("tmp123"));
        assert!(rendered.html.contains("tmp123"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let rendered = render(EmailType::ForgotPassword, &json!({}));
        assert!(rendered.text.contains("Hello User"));
        assert!(rendered.text.contains("User ID: N/A"));
    }
}
