//! First-run provisioning of the platform administrator

use anyhow::Result;
use schoolhub_db::{NewUser, Role, UserRepository};
use tracing::{info, warn};

use crate::config::BootstrapConfig;

/// Create the super admin when the store holds no users.
///
/// Returns whether an account was created. Without a configured password
/// nothing is created and a warning is logged instead.
pub async fn ensure_super_admin(users: &dyn UserRepository, config: &BootstrapConfig) -> Result<bool> {
    if users.has_users().await? {
        return Ok(false);
    }

    let Some(password) = config
        .super_admin_password
        .as_deref()
        .filter(|p| !p.is_empty())
    else {
        warn!(
            "No users exist and no bootstrap password is configured; nobody can sign in. \
             Set [bootstrap] super_admin_password or SCHOOLHUB_BOOTSTRAP_PASSWORD"
        );
        return Ok(false);
    };

    let password_hash = schoolhub_auth::hash_password(password)?;
    let user = users
        .insert_user(NewUser {
            email: config.super_admin_email.clone(),
            username: None,
            full_name: "Platform Administrator".to_string(),
            password_hash,
            role: Role::SuperAdmin,
            school_id: None,
        })
        .await?;

    info!("Created super admin {} (id {})", user.email, user.id);
    Ok(true)
}
