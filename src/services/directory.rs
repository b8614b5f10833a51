//! Accounts, staff profiles and actor resolution
//!
//! Accounts are mirrored from verified session claims the first time they are
//! seen. After that the stored role is authoritative, so a role change made
//! here takes effect on the holder's next request regardless of what their
//! token says.

use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{Actor, Capability, Claims, Operation, Role};
use crate::db::Stores;
use crate::domain::{now, NewStaffMember, StaffMember, StaffPatch, UserAccount};
use crate::logging::{AuditEvent, AuditEventType, AuditLogger};
use crate::types::{Result, WildwatchError};

#[derive(Clone)]
pub struct Directory {
    stores: Stores,
    audit: AuditLogger,
}

impl Directory {
    pub fn new(stores: Stores, audit: AuditLogger) -> Self {
        Self { stores, audit }
    }

    /// Record an account if it is new. `role` only applies on first insert.
    pub async fn register(
        &self,
        user_id: &str,
        name: &str,
        email: Option<&str>,
        role: Role,
    ) -> Result<UserAccount> {
        if user_id.trim().is_empty() {
            return Err(WildwatchError::Unauthorized("token has no subject".into()));
        }
        let at = now();
        let account = UserAccount {
            id: user_id.to_string(),
            name: name.to_string(),
            email: email.map(str::to_string),
            role,
            created_at: at,
            updated_at: at,
        };
        self.stores.directory.upsert_user(&account).await
    }

    /// Turn verified claims into the actor for this request
    pub async fn resolve_actor(&self, claims: &Claims) -> Result<Actor> {
        let account = self
            .register(&claims.sub, &claims.name, claims.email.as_deref(), claims.role)
            .await?;
        if account.role != claims.role {
            debug!(
                user_id = %account.id,
                token_role = %claims.role,
                directory_role = %account.role,
                "Directory role overrides token role"
            );
        }
        self.actor_for_account(account).await
    }

    /// Actor for a known account
    pub async fn actor_for(&self, user_id: &str) -> Result<Actor> {
        let account = self
            .stores
            .directory
            .get_user(user_id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("user", user_id))?;
        self.actor_for_account(account).await
    }

    async fn actor_for_account(&self, account: UserAccount) -> Result<Actor> {
        let mut actor = Actor::new(account.id.clone(), account.role);
        if account.role.is_staff() {
            if let Some(staff) = self.stores.directory.get_staff_by_user(&account.id).await? {
                actor = actor.with_capabilities(staff.permissions);
            }
        }
        Ok(actor)
    }

    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<UserAccount>> {
        actor.require(Operation::ViewUsers)?;
        self.stores.directory.list_users().await
    }

    pub async fn set_role(&self, actor: &Actor, user_id: &str, role: &str) -> Result<UserAccount> {
        actor.require(Operation::ChangeUserRole)?;
        let role = Role::parse(role)
            .ok_or_else(|| WildwatchError::Validation(format!("unknown role '{}'", role)))?;
        let account = self
            .stores
            .directory
            .set_user_role(user_id, role)
            .await?
            .ok_or_else(|| WildwatchError::not_found("user", user_id))?;

        info!(user_id = %user_id, role = %role, by = %actor.id, "User role changed");
        self.audit
            .log(
                AuditEvent::new(AuditEventType::RoleChanged, actor)
                    .with_metadata(serde_json::json!({ "userId": user_id, "role": role })),
            )
            .await;
        Ok(account)
    }

    pub async fn list_staff(&self, actor: &Actor) -> Result<Vec<StaffMember>> {
        actor.require(Operation::ViewStaff)?;
        self.stores.directory.list_staff().await
    }

    /// Create a staff profile, promoting a citizen account to officer
    pub async fn create_staff(&self, actor: &Actor, input: NewStaffMember) -> Result<StaffMember> {
        actor.require(Operation::ManageStaff)?;
        let account = self
            .stores
            .directory
            .get_user(&input.user_id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("user", &input.user_id))?;

        let at = now();
        let staff = StaffMember {
            id: Uuid::new_v4().to_string(),
            user_id: account.id.clone(),
            department: input.department,
            permissions: input.permissions,
            created_at: at,
            updated_at: at,
        };
        self.stores.directory.insert_staff(&staff).await?;

        if account.role == Role::Citizen {
            self.stores
                .directory
                .set_user_role(&account.id, Role::Officer)
                .await?;
            info!(user_id = %account.id, "Promoted citizen to officer");
        }

        self.audit
            .log(
                AuditEvent::new(AuditEventType::StaffChanged, actor).with_metadata(
                    serde_json::json!({ "staffId": staff.id, "userId": staff.user_id, "change": "created" }),
                ),
            )
            .await;
        Ok(staff)
    }

    pub async fn update_staff(
        &self,
        actor: &Actor,
        staff_id: &str,
        patch: StaffPatch,
    ) -> Result<StaffMember> {
        actor.require(Operation::ManageStaff)?;
        let mut staff = self
            .stores
            .directory
            .get_staff(staff_id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("staff member", staff_id))?;

        if let Some(department) = patch.department {
            staff.department = department;
        }
        if let Some(permissions) = patch.permissions {
            staff.permissions = permissions;
        }
        staff.updated_at = now();

        if !self.stores.directory.update_staff(&staff).await? {
            return Err(WildwatchError::not_found("staff member", staff_id));
        }
        self.audit
            .log(
                AuditEvent::new(AuditEventType::StaffChanged, actor).with_metadata(
                    serde_json::json!({ "staffId": staff.id, "change": "updated" }),
                ),
            )
            .await;
        Ok(staff)
    }

    /// Remove a staff profile. The account keeps its role.
    pub async fn remove_staff(&self, actor: &Actor, staff_id: &str) -> Result<()> {
        actor.require(Operation::ManageStaff)?;
        if !self.stores.directory.delete_staff(staff_id).await? {
            return Err(WildwatchError::not_found("staff member", staff_id));
        }
        self.audit
            .log(
                AuditEvent::new(AuditEventType::StaffChanged, actor).with_metadata(
                    serde_json::json!({ "staffId": staff_id, "change": "removed" }),
                ),
            )
            .await;
        Ok(())
    }

    /// Account that cases may be assigned to
    pub(crate) async fn officer(&self, user_id: &str) -> Result<UserAccount> {
        let account = self
            .stores
            .directory
            .get_user(user_id)
            .await?
            .ok_or_else(|| WildwatchError::not_found("officer", user_id))?;
        if !account.role.is_staff() {
            return Err(WildwatchError::Validation(format!(
                "user {} is not staff and cannot be assigned cases",
                user_id
            )));
        }
        Ok(account)
    }

    pub(crate) async fn user_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.stores.directory.get_user(user_id).await?.is_some())
    }

    /// Staff accounts holding MANAGE_ALERTS
    pub(crate) async fn alert_recipients(&self) -> Result<Vec<String>> {
        Ok(self
            .stores
            .directory
            .list_staff()
            .await?
            .into_iter()
            .filter(|s| s.has(Capability::ManageAlerts))
            .map(|s| s.user_id)
            .collect())
    }
}
