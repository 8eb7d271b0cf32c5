//! Authorization and ownership resolution for resource handlers.
//!
//! Every handler builds an [`AccessControl`] from the caller's [`Principal`]
//! and the [`ScopePolicy`] of its resource kind. The engine is a pure function
//! of (principal, entity, policy) plus id lookups against the store, so it
//! holds no state across requests.
//!
//! Access failures surface as `NotFound` to avoid confirming existence.
//! Filter and reference failures surface as `BadRequest`, ownership filter
//! mismatches as `InvalidScope`. The admin application is guarded separately
//! by [`AdminAppId`] and answers `Forbidden`.

use crate::domain::{EntityId, Owned, User};
use crate::error::AppError;
use crate::middleware::auth::Principal;
use crate::repository::EntityStore;

pub type PolicyResult<T> = std::result::Result<T, AppError>;

/// Manageable resource kinds, each guarded by its own scope pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Application,
    Client,
    User,
    Identity,
    Role,
    Scope,
    Token,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Application,
        ResourceKind::Client,
        ResourceKind::User,
        ResourceKind::Identity,
        ResourceKind::Role,
        ResourceKind::Scope,
        ResourceKind::Token,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Application => "application",
            ResourceKind::Client => "client",
            ResourceKind::User => "user",
            ResourceKind::Identity => "identity",
            ResourceKind::Role => "role",
            ResourceKind::Scope => "scope",
            ResourceKind::Token => "token",
        }
    }

    /// Human-readable name used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Application => "Application",
            ResourceKind::Client => "Client",
            ResourceKind::User => "User",
            ResourceKind::Identity => "Identity",
            ResourceKind::Role => "Role",
            ResourceKind::Scope => "Scope",
            ResourceKind::Token => "Token",
        }
    }

    pub fn policy(&self) -> ScopePolicy {
        let (admin, regular) = match self {
            ResourceKind::Application => ("application_admin", "application"),
            ResourceKind::Client => ("client_admin", "client"),
            ResourceKind::User => ("user_admin", "user"),
            ResourceKind::Identity => ("identity_admin", "identity"),
            ResourceKind::Role => ("role_admin", "role"),
            ResourceKind::Scope => ("scope_admin", "scope"),
            ResourceKind::Token => ("token_admin", "token"),
        };
        ScopePolicy {
            kind: *self,
            admin,
            regular,
        }
    }
}

/// The scope pair guarding one resource kind.
///
/// `admin` grants unconditional access, `regular` only to owned entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopePolicy {
    pub kind: ResourceKind,
    pub admin: &'static str,
    pub regular: &'static str,
}

/// Every scope name known to the admin API, admin scopes first
pub fn all_scope_names() -> Vec<&'static str> {
    let policies = ResourceKind::ALL.iter().map(|kind| kind.policy());
    policies
        .clone()
        .map(|policy| policy.admin)
        .chain(policies.map(|policy| policy.regular))
        .collect()
}

/// Id of the bootstrap admin application.
///
/// Its records and everything beneath them are read-only through the
/// generic handlers, whatever scopes the caller holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminAppId(EntityId);

impl AdminAppId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> EntityId {
        self.0
    }

    pub fn is_admin_app(&self, application_id: EntityId) -> bool {
        self.0 == application_id
    }

    /// Fails with `Forbidden` when the application is the admin application
    pub fn assert_mutable(&self, application_id: EntityId) -> PolicyResult<()> {
        if self.is_admin_app(application_id) {
            record_denial("admin_application", "protected");
            return Err(AppError::Forbidden(
                "The admin application cannot be modified".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which owner a listing is narrowed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipFilter {
    Unrestricted,
    Owner(EntityId),
}

impl OwnershipFilter {
    pub fn owner_id(&self) -> Option<EntityId> {
        match self {
            OwnershipFilter::Unrestricted => None,
            OwnershipFilter::Owner(id) => Some(*id),
        }
    }
}

fn record_denial(kind: &'static str, reason: &'static str) {
    metrics::counter!(
        "oauth2_admin_access_denied_total",
        "kind" => kind,
        "reason" => reason
    )
    .increment(1);
}

/// Per-request access decisions for one resource kind
#[derive(Debug, Clone, Copy)]
pub struct AccessControl<'a> {
    principal: &'a Principal,
    policy: ScopePolicy,
}

impl<'a> AccessControl<'a> {
    pub fn new(principal: &'a Principal, kind: ResourceKind) -> Self {
        Self::with_policy(principal, kind.policy())
    }

    pub fn with_policy(principal: &'a Principal, policy: ScopePolicy) -> Self {
        Self { principal, policy }
    }

    pub fn principal(&self) -> &'a Principal {
        self.principal
    }

    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }

    pub fn is_admin(&self) -> bool {
        self.principal.has_scope(self.policy.admin)
    }

    fn has_regular(&self) -> bool {
        self.principal.has_scope(self.policy.regular)
    }

    fn invalid_scope(&self, reason: &'static str, message: String) -> AppError {
        record_denial(self.policy.kind.as_str(), reason);
        AppError::InvalidScope(message)
    }

    /// The caller must hold the admin or the regular scope of this kind
    pub fn require_scope(&self) -> PolicyResult<()> {
        if self.is_admin() || self.has_regular() {
            return Ok(());
        }
        Err(self.invalid_scope(
            "missing_scope",
            format!(
                "One of the scopes '{}' or '{}' is required",
                self.policy.admin, self.policy.regular
            ),
        ))
    }

    fn is_owner<T: Owned>(&self, entity: &T) -> bool {
        matches!(
            (self.principal.user_id, entity.owner_id()),
            (Some(caller), Some(owner)) if caller == owner
        )
    }

    /// Owner-or-admin check. Absence and denial are indistinguishable.
    pub fn assert_can_access<T: Owned>(
        &self,
        entity: Option<T>,
        required_admin_scope: &str,
    ) -> PolicyResult<T> {
        let not_found = || AppError::NotFound(format!("{} not found", self.policy.kind.label()));
        let entity = entity.ok_or_else(|| not_found())?;
        if self.is_owner(&entity) || self.principal.has_scope(required_admin_scope) {
            return Ok(entity);
        }
        record_denial(self.policy.kind.as_str(), "not_owner");
        Err(not_found())
    }

    /// Same decision as [`Self::assert_can_access`], but a denied or missing
    /// parent of a subresource is reported as `BadRequest`.
    pub fn assert_can_access_subresource<T: Owned>(
        &self,
        entity: Option<T>,
        required_parent_scope: &str,
    ) -> PolicyResult<T> {
        self.assert_can_access(entity, required_parent_scope)
            .map_err(|err| match err {
                AppError::NotFound(_) => {
                    AppError::BadRequest("Parent entity not found".to_string())
                }
                other => other,
            })
    }

    /// Resolve the owner a listing must be narrowed to.
    ///
    /// Admins see everything unless they ask for a specific owner, which must
    /// exist. Everyone else only ever sees their own entities.
    pub async fn resolve_ownership_filter<R>(
        &self,
        users: &R,
        requested_owner: Option<EntityId>,
    ) -> PolicyResult<OwnershipFilter>
    where
        R: EntityStore<User> + ?Sized,
    {
        if self.is_admin() {
            return match requested_owner {
                None => Ok(OwnershipFilter::Unrestricted),
                Some(owner_id) => match users.find_by_id(owner_id).await? {
                    Some(user) => Ok(OwnershipFilter::Owner(user.id)),
                    None => Err(AppError::BadRequest(format!(
                        "Owner '{}' does not exist",
                        owner_id
                    ))),
                },
            };
        }

        let caller = self.principal.user_id.ok_or_else(|| {
            self.invalid_scope(
                "no_identity",
                "Tokens without a user identity cannot own entities".to_string(),
            )
        })?;
        match requested_owner {
            Some(owner_id) if owner_id != caller => Err(self.invalid_scope(
                "foreign_owner",
                format!(
                    "Filtering by another owner requires the '{}' scope",
                    self.policy.admin
                ),
            )),
            _ => Ok(OwnershipFilter::Owner(caller)),
        }
    }

    /// Resolve a parent-entity filter (e.g. roles of one application).
    ///
    /// `Ok(None)` means no filter was requested.
    pub async fn resolve_filter_entity<T, R>(
        &self,
        store: &R,
        field: &str,
        entity_id: Option<EntityId>,
    ) -> PolicyResult<Option<T>>
    where
        T: Owned,
        R: EntityStore<T> + ?Sized,
    {
        let entity = match entity_id {
            Some(id) => Some(
                store
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| invalid_reference(field, id))?,
            ),
            None => None,
        };

        if self.is_admin() {
            return Ok(entity);
        }
        if !self.has_regular() {
            return Err(self.invalid_scope(
                "missing_scope",
                format!("The '{}' scope is required", self.policy.regular),
            ));
        }
        if self.principal.user_id.is_none() {
            return Err(self.invalid_scope(
                "no_identity",
                "Tokens without a user identity cannot own entities".to_string(),
            ));
        }
        match (entity, entity_id) {
            (Some(entity), Some(id)) => {
                if self.is_owner(&entity) {
                    Ok(Some(entity))
                } else {
                    record_denial(self.policy.kind.as_str(), "foreign_filter");
                    Err(invalid_reference(field, id))
                }
            }
            _ => Ok(None),
        }
    }

    /// Decide the owner of a new application.
    ///
    /// Admins may assign any existing user and default to themselves. Others
    /// always own what they create. A caller without a user identity must
    /// name an owner, which only admins may do.
    pub async fn resolve_owner_assignment<R>(
        &self,
        users: &R,
        requested_owner: Option<EntityId>,
    ) -> PolicyResult<Option<EntityId>>
    where
        R: EntityStore<User> + ?Sized,
    {
        if let (true, Some(owner_id)) = (self.is_admin(), requested_owner) {
            let owner = require_entity_input(users, "owner_id", Some(owner_id)).await?;
            return Ok(Some(owner.id));
        }

        let caller = self.principal.user_id.ok_or_else(|| {
            self.invalid_scope(
                "no_identity",
                "Tokens without a user identity cannot own entities".to_string(),
            )
        })?;
        match requested_owner {
            Some(owner_id) if owner_id != caller => Err(AppError::BadRequest(format!(
                "Assigning another owner requires the '{}' scope",
                self.policy.admin
            ))),
            _ => Ok(Some(caller)),
        }
    }
}

fn invalid_reference(field: &str, id: EntityId) -> AppError {
    AppError::BadRequest(format!("Invalid {} reference '{}'", field, id))
}

/// Resolve an optional reference from a request body
pub async fn resolve_entity_input<T, R>(
    store: &R,
    field: &str,
    id: Option<EntityId>,
) -> PolicyResult<Option<T>>
where
    R: EntityStore<T> + ?Sized,
{
    match id {
        None => Ok(None),
        Some(id) => match store.find_by_id(id).await? {
            Some(entity) => Ok(Some(entity)),
            None => Err(invalid_reference(field, id)),
        },
    }
}

/// Resolve a mandatory reference from a request body
pub async fn require_entity_input<T, R>(store: &R, field: &str, id: Option<EntityId>) -> PolicyResult<T>
where
    R: EntityStore<T> + ?Sized,
{
    resolve_entity_input(store, field, id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Field '{}' is required", field)))
}
