use chrono::{DateTime, Utc};

use super::Message;

/// Sent after registration; carries the one-time activation token.
pub fn welcome(from: &str, to: &str, user_id: i64, activation_token: &str, expiry: DateTime<Utc>) -> Message {
    let expiry = expiry.format("%Y-%m-%d %H:%M UTC");
    let body = format!(
        "Hi,

Thanks for signing up for a Reel account. We're excited to have you on board!

For future reference, your user ID number is {user_id}.

Please send a request to the `PUT /v1/users/activated` endpoint with the following JSON body to activate your account:

{{\"token\": \"{activation_token}\"}}

Please note that this is a one-time use token and it will expire at {expiry}.

Thanks,

The Reel Team
"
    );

    Message {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Welcome to Reel!".to_string(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_mentions_the_token_and_user() {
        let message = welcome(
            "no-reply@reel.local",
            "alice@example.com",
            42,
            "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            Utc::now(),
        );
        assert_eq!(message.to, "alice@example.com");
        assert!(message.body.contains("user ID number is 42"));
        assert!(message.body.contains(r#"{"token": "ABCDEFGHIJKLMNOPQRSTUVWXYZ"}"#));
    }
}
