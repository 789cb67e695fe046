use std::fmt;

use drive_core::Permission;
use tracing::info;

use crate::error::RemoteError;
use crate::remote::Remote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Writer,
    Reader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Writer => "writer",
            Role::Reader => "reader",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of principal a grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    User,
    Group,
    Domain,
    Anyone,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::User => "user",
            AccountType::Group => "group",
            AccountType::Domain => "domain",
            AccountType::Anyone => "anyone",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Remote {
    pub async fn list_permissions(&self, id: &str) -> Result<Vec<Permission>, RemoteError> {
        let list = self
            .client
            .list_permissions(id)
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))?;
        Ok(list.items)
    }

    /// Grants `role` to a principal. `value` is the email address or domain;
    /// it is omitted for [`AccountType::Anyone`].
    pub async fn insert_permission(
        &self,
        id: &str,
        value: Option<&str>,
        email_message: Option<&str>,
        role: Role,
        account_type: AccountType,
    ) -> Result<Permission, RemoteError> {
        let permission = Permission {
            role: role.as_str().to_string(),
            account_type: account_type.as_str().to_string(),
            value: value.filter(|v| !v.is_empty()).map(str::to_string),
            ..Permission::default()
        };
        info!(id, %role, %account_type, "inserting permission");
        self.client
            .insert_permission(id, &permission, email_message)
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))
    }

    /// Removes the grant whose permission id is the principal type name, e.g. `anyone`.
    pub async fn delete_permission(
        &self,
        id: &str,
        account_type: AccountType,
    ) -> Result<(), RemoteError> {
        info!(id, %account_type, "deleting permission");
        self.client
            .delete_permission(id, account_type.as_str())
            .await
            .map_err(|err| RemoteError::from_lookup(err, id))
    }

    pub async fn permission_id_for_email(&self, email: &str) -> Result<String, RemoteError> {
        let permission = self
            .client
            .permission_id_for_email(email)
            .await
            .map_err(|err| RemoteError::from_lookup(err, email))?;
        Ok(permission.id)
    }

    /// `<share host>/<id>`; a missing trailing slash on the host is supplied.
    pub fn public_url(&self, id: &str) -> String {
        let host = &self.config.share_host;
        if host.ends_with('/') {
            format!("{host}{id}")
        } else {
            format!("{host}/{id}")
        }
    }

    /// Makes the object readable by anyone and returns its public URL.
    pub async fn publish(&self, id: &str) -> Result<String, RemoteError> {
        self.insert_permission(id, None, None, Role::Reader, AccountType::Anyone)
            .await?;
        Ok(self.public_url(id))
    }

    pub async fn unpublish(&self, id: &str) -> Result<(), RemoteError> {
        self.delete_permission(id, AccountType::Anyone).await
    }
}
