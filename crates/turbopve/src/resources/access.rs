//! Access control endpoints

use crate::{
    client::Client,
    error::Result,
    types::{CreateUserParams, Permissions, Role, Ticket, User},
};
use http::Method;
use secrecy::SecretString;

/// Users, roles, permissions and tickets.
#[derive(Debug, Clone)]
pub struct Access {
    pub(crate) client: Client,
}

impl Access {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Obtain a ticket for `username` without touching the client's own
    /// session.
    pub async fn login(&self, username: &str, password: impl Into<String>) -> Result<Ticket> {
        let password = SecretString::new(password.into().into_boxed_str());
        self.client.login(username, &password).await
    }

    /// Forget the client's session; the next request authenticates again.
    pub async fn logout(&self) {
        self.client.invalidate_session().await;
    }

    /// Effective privileges of the authenticated user, optionally limited
    /// to one ACL path.
    pub async fn permissions(&self, path: Option<&str>) -> Result<Permissions> {
        self.client
            .request(Method::GET, "access/permissions")
            .param_opt("path", path)
            .send()
            .await
    }

    /// List users.
    pub async fn users(&self) -> Result<Vec<User>> {
        self.client.request(Method::GET, "access/users").send().await
    }

    /// Get one user.
    #[tracing::instrument(skip(self))]
    pub async fn user(&self, userid: &str) -> Result<User> {
        let mut user: User = self
            .client
            .request_segments(Method::GET, ["access", "users", userid])
            .send()
            .await?;
        // The single-user endpoint leaves the id out.
        if user.userid.is_empty() {
            user.userid = userid.to_string();
        }
        Ok(user)
    }

    /// Create a user.
    #[tracing::instrument(skip(self, params), fields(userid = %params.userid))]
    pub async fn create_user(&self, params: &CreateUserParams) -> Result<()> {
        self.client
            .request(Method::POST, "access/users")
            .params(params)
            .send()
            .await
    }

    /// Change a user's e-mail address.
    #[tracing::instrument(skip(self))]
    pub async fn update_user(&self, userid: &str, email: &str) -> Result<()> {
        self.client
            .request_segments(Method::PUT, ["access", "users", userid])
            .param("email", email)
            .send()
            .await
    }

    /// Delete a user.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, userid: &str) -> Result<()> {
        self.client
            .request_segments(Method::DELETE, ["access", "users", userid])
            .send()
            .await
    }

    /// List roles.
    pub async fn roles(&self) -> Result<Vec<Role>> {
        self.client.request(Method::GET, "access/roles").send().await
    }
}
