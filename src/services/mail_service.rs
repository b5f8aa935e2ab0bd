use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::outbound_email::OutboundEmail;

/// Queue-backed mail dispatch. Rows land in `outbound_emails` as `pending`
/// and a background worker pushes them to the rendering webhook, so request
/// handlers never block on SMTP.
#[derive(Clone)]
pub struct MailService {
    pool: PgPool,
    client: Client,
    webhook_url: String,
}

impl MailService {
    pub fn new(pool: PgPool, webhook_url: String) -> Self {
        Self {
            pool,
            client: Client::new(),
            webhook_url,
        }
    }

    pub async fn enqueue(
        &self,
        recipient: &str,
        subject: &str,
        template: &str,
        context: &JsonValue,
    ) -> Result<OutboundEmail> {
        let row = sqlx::query_as::<_, OutboundEmail>(
            r#"INSERT INTO outbound_emails (recipient, subject, template, context, status)
               VALUES ($1, $2, $3, $4, 'pending')
               RETURNING *"#,
        )
        .bind(recipient)
        .bind(subject)
        .bind(template)
        .bind(context)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn deliver_once(&self, email_id: Uuid) -> Result<()> {
        let email = sqlx::query_as::<_, OutboundEmail>(
            r#"SELECT * FROM outbound_emails WHERE id = $1"#,
        )
        .bind(email_id)
        .fetch_one(&self.pool)
        .await?;

        let secret = crate::config::get_config().mail_webhook_secret.clone();
        let body = json!({
            "recipient": email.recipient,
            "subject": email.subject,
            "template": email.template,
            "context": email.context,
        });

        let res = self
            .client
            .post(&self.webhook_url)
            .header("X-Mail-Secret", secret)
            .json(&body)
            .send()
            .await;

        match res {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let response_body = resp.text().await.unwrap_or_default();
                sqlx::query(
                    r#"UPDATE outbound_emails
                       SET http_status = $1,
                           response_body = $2,
                           status = CASE WHEN $1 BETWEEN 200 AND 299 THEN 'sent' ELSE 'failed' END,
                           attempts = attempts + 1,
                           updated_at = NOW()
                       WHERE id = $3"#,
                )
                .bind(status)
                .bind(response_body)
                .bind(email.id)
                .execute(&self.pool)
                .await?;
            }
            Err(err) => {
                sqlx::query(
                    r#"UPDATE outbound_emails
                       SET response_body = $1,
                           status = 'failed',
                           attempts = attempts + 1,
                           updated_at = NOW()
                       WHERE id = $2"#,
                )
                .bind(format!("{}", err))
                .bind(email.id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Claims and delivers one due email. Returns false when the queue is
    /// empty so the worker loop can back off.
    pub async fn run_once(&self) -> Result<bool> {
        let row_opt = sqlx::query(
            r#"SELECT id FROM outbound_emails
               WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
               ORDER BY created_at ASC
               FOR UPDATE SKIP LOCKED
               LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: Uuid = row.try_get("id")?;

        let _ = self.deliver_once(id).await;

        let row2 = sqlx::query(
            r#"SELECT attempts, max_attempts, status FROM outbound_emails WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        let attempts: i32 = row2.try_get("attempts")?;
        let max_attempts: i32 = row2.try_get("max_attempts")?;
        let status: String = row2.try_get("status")?;

        if status == "failed" && attempts < max_attempts {
            sqlx::query(
                r#"UPDATE outbound_emails
                   SET status = 'pending',
                       next_retry_at = NOW() + make_interval(secs => LEAST(3600, 30 * power(2::float, GREATEST(0, attempts-1))::int))
                   WHERE id = $1"#,
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        Ok(true)
    }

    pub async fn send_account_created(&self, recipient: &str, full_name: &str) -> Result<()> {
        let subject = format!("{}, Thank you for joining the quiz platform.", full_name);
        let context = json!({
            "full_name": full_name,
            "name": full_name,
        });
        self.enqueue(recipient, &subject, "account_creation.html", &context)
            .await?;
        Ok(())
    }

    pub async fn send_password_reset(
        &self,
        recipient: &str,
        full_name: &str,
        reset_url: &str,
    ) -> Result<()> {
        let context = json!({
            "full_name": full_name,
            "name": full_name,
            "url": reset_url,
        });
        self.enqueue(
            recipient,
            "Your request to reset your quiz platform account password",
            "reset_password.html",
            &context,
        )
        .await?;
        Ok(())
    }

    pub async fn send_verification_code(&self, recipient: &str, code: &str) -> Result<()> {
        let context = json!({ "code": code });
        self.enqueue(
            recipient,
            "Account Verification.",
            "code_verification.html",
            &context,
        )
        .await?;
        Ok(())
    }
}
