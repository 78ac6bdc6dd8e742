//! Discord guild role adapter.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, Method};

use super::RoleNotifier;
use crate::config::DiscordConfig;
use crate::models::is_snowflake;

/// Grants and revokes guild roles through the Discord REST API.
#[derive(Clone, Debug)]
pub struct DiscordNotifier {
    http_client: Client,
    api_base: String,
    bot_token: String,
    guild_id: String,
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            guild_id: config.guild_id.clone(),
        })
    }

    fn member_role_url(&self, user_id: &str, role_ref: &str) -> String {
        format!(
            "{}/guilds/{}/members/{}/roles/{}",
            self.api_base, self.guild_id, user_id, role_ref
        )
    }

    /// Send a member role change. Ids that are not snowflakes never reach the API.
    async fn send_member_role(&self, method: Method, user_id: &str, role_ref: &str) -> bool {
        if !is_snowflake(user_id) || !is_snowflake(role_ref) {
            tracing::warn!(%method, user_id, role_ref, "Refusing role request with a non-numeric id");
            return false;
        }
        self.send(method, self.member_role_url(user_id, role_ref)).await
    }

    async fn send(&self, method: Method, url: String) -> bool {
        let result = self
            .http_client
            .request(method.clone(), &url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .header("X-Audit-Log-Reason", "Event slotting")
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(%method, %url, status = %response.status(), "Discord rejected role request");
                false
            }
            Err(e) => {
                tracing::warn!(%method, %url, "Discord request failed: {}", e);
                false
            }
        }
    }
}

impl RoleNotifier for DiscordNotifier {
    fn grant<'a>(&'a self, user_id: &'a str, role_ref: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(self.send_member_role(Method::PUT, user_id, role_ref))
    }

    fn revoke<'a>(&'a self, user_id: &'a str, role_ref: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(self.send_member_role(Method::DELETE, user_id, role_ref))
    }

    fn health_check(&self) -> BoxFuture<'_, bool> {
        let url = format!("{}/guilds/{}", self.api_base, self.guild_id);
        Box::pin(self.send(Method::GET, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(api_base: &str) -> DiscordNotifier {
        DiscordNotifier::new(
            &DiscordConfig {
                api_base: api_base.to_string(),
                bot_token: "token".to_string(),
                guild_id: "1234".to_string(),
            },
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[test]
    fn test_member_role_url() {
        let discord = notifier("https://discord.com/api/v10/");
        assert_eq!(
            discord.member_role_url("42", "99"),
            "https://discord.com/api/v10/guilds/1234/members/42/roles/99"
        );
    }

    /// Answer every request with 204 and report its request line.
    async fn recording_api() -> (String, tokio::sync::mpsc::UnboundedReceiver<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&buf);
                let line = request.lines().next().unwrap_or_default().to_string();
                let _ = tx.send(line);
                let _ = stream
                    .write_all(b"HTTP/1.1 204 No Content\r\nconnection: close\r\n\r\n")
                    .await;
            }
        });

        (format!("http://{}/api/v10", addr), rx)
    }

    #[tokio::test]
    async fn test_role_requests_stay_under_member_roles() {
        let (api_base, mut requests) = recording_api().await;
        let discord = notifier(&api_base);

        assert!(!discord.grant("42", "../../../bans/777").await);
        assert!(!discord.revoke("42", "../../../bans/777").await);
        assert!(!discord.grant("../../bans/777", "99").await);

        assert!(discord.grant("42", "99").await);
        assert_eq!(
            requests.recv().await.unwrap(),
            "PUT /api/v10/guilds/1234/members/42/roles/99 HTTP/1.1"
        );
        assert!(discord.revoke("42", "99").await);
        assert_eq!(
            requests.recv().await.unwrap(),
            "DELETE /api/v10/guilds/1234/members/42/roles/99 HTTP/1.1"
        );

        // The rejected calls never produced a request
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unreachable_api_reports_false() {
        // Nothing listens on port 9 of the loopback interface
        let discord = notifier("http://127.0.0.1:9");
        assert!(!discord.grant("42", "99").await);
        assert!(!discord.revoke("42", "99").await);
        assert!(!discord.health_check().await);
    }
}
