//! # Identity Repository
//!
//! Principals, roles and benefits. Staff and clients share one identity
//! namespace with a subtype tag, so handle/email/national-id uniqueness is
//! enforced across all principals regardless of subtype.
//!
//! Credentials are hashed with argon2 on creation and verified on
//! authentication; cleartext is never stored and hashes never leave this
//! crate. Hashing and verification run outside the table guard - only the
//! index/table writes happen inside the critical section.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use tally_core::validation::{
    validate_credential, validate_email, validate_handle, validate_name, validate_national_id,
    validate_price,
};
use tally_core::{
    Benefit, CoreError, CoreResult, NewPrincipal, Principal, RemovalPolicy, Role,
    TransactionStatus,
};

use crate::store::SharedTables;
use crate::tables::PrincipalRecord;

/// Repository for identity operations.
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    tables: SharedTables,
}

impl IdentityRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        IdentityRepository { tables }
    }

    // -------------------------------------------------------------------------
    // Roles & Benefits
    // -------------------------------------------------------------------------

    /// Inserts a role with an optional base compensation.
    pub fn add_role(&self, name: &str, base_salary_cents: Option<i64>) -> CoreResult<Role> {
        validate_name(name)?;
        if let Some(salary) = base_salary_cents {
            validate_price(salary)?;
        }

        let role = Role {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            base_salary_cents,
        };

        debug!(id = %role.id, name = %role.name, "inserting role");
        self.tables
            .write()
            .roles
            .insert(role.id.clone(), role.clone());
        Ok(role)
    }

    /// Inserts a benefit.
    pub fn add_benefit(&self, value_cents: i64, description: &str) -> CoreResult<Benefit> {
        validate_price(value_cents)?;
        validate_name(description)?;

        let benefit = Benefit {
            id: Uuid::new_v4().to_string(),
            value_cents,
            description: description.trim().to_string(),
        };

        debug!(id = %benefit.id, "inserting benefit");
        self.tables
            .write()
            .benefits
            .insert(benefit.id.clone(), benefit.clone());
        Ok(benefit)
    }

    /// Returns a role by id.
    pub fn get_role(&self, id: &str) -> CoreResult<Role> {
        self.tables
            .read()
            .roles
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Role", id))
    }

    // -------------------------------------------------------------------------
    // Principals
    // -------------------------------------------------------------------------

    /// Creates a principal.
    ///
    /// Handle, email and national id are claimed atomically: all three
    /// indexes are checked under the write guard before any row is
    /// inserted, and DuplicateKey names the first violated field. The
    /// credential is hashed before the guard is taken.
    pub fn create_principal(&self, new: NewPrincipal) -> CoreResult<Principal> {
        validate_handle(&new.handle)?;
        validate_email(&new.email)?;
        validate_national_id(&new.national_id)?;
        validate_name(&new.display_name)?;
        validate_credential(&new.credential)?;

        let credential_hash = hash_credential(&new.credential)?;

        // Natural keys are case-insensitive; stored values keep the
        // caller's trimmed spelling, indexes hold the folded form.
        let handle = new.handle.trim().to_string();
        let email = new.email.trim().to_string();
        let national_id = new.national_id.trim().to_string();
        let handle_key = handle.to_lowercase();
        let email_key = email.to_lowercase();

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tables = self.tables.write();

        if let Some(role_id) = &new.role_id {
            if !tables.roles.contains_key(role_id) {
                return Err(CoreError::not_found("Role", role_id));
            }
        }

        tables.claim_principal_keys(&handle_key, &email_key, &national_id, &id)?;

        let principal = Principal {
            id: id.clone(),
            kind: new.kind,
            handle,
            email,
            national_id,
            display_name: new.display_name.trim().to_string(),
            birth_date: new.birth_date,
            role_id: new.role_id,
            created_at: now,
            updated_at: now,
        };

        tables.principals.insert(
            id.clone(),
            PrincipalRecord {
                principal: principal.clone(),
                credential_hash,
            },
        );

        info!(id = %id, handle = %principal.handle, kind = ?principal.kind, "principal created");
        Ok(principal)
    }

    /// Verifies a handle/credential pair and returns the principal id.
    ///
    /// Unknown handle and failed verification both report Unauthorized.
    pub fn authenticate(&self, handle: &str, credential: &str) -> CoreResult<String> {
        let handle_key = handle.trim().to_lowercase();

        let (id, hash) = {
            let tables = self.tables.read();
            let id = tables
                .handle_index
                .get(&handle_key)
                .ok_or(CoreError::Unauthorized)?
                .clone();
            let hash = tables
                .principals
                .get(&id)
                .ok_or(CoreError::Unauthorized)?
                .credential_hash
                .clone();
            (id, hash)
        };

        if !verify_credential(credential, &hash) {
            debug!(handle = %handle_key, "credential verification failed");
            return Err(CoreError::Unauthorized);
        }

        Ok(id)
    }

    /// Assigns a role to a principal.
    pub fn assign_role(&self, principal_id: &str, role_id: &str) -> CoreResult<()> {
        let mut tables = self.tables.write();

        if !tables.roles.contains_key(role_id) {
            return Err(CoreError::not_found("Role", role_id));
        }

        let record = tables
            .principals
            .get_mut(principal_id)
            .ok_or_else(|| CoreError::not_found("Principal", principal_id))?;

        record.principal.role_id = Some(role_id.to_string());
        record.principal.updated_at = Utc::now();

        debug!(principal_id = %principal_id, role_id = %role_id, "role assigned");
        Ok(())
    }

    /// Returns a principal by id.
    pub fn get(&self, principal_id: &str) -> CoreResult<Principal> {
        self.tables
            .read()
            .principals
            .get(principal_id)
            .map(|r| r.principal.clone())
            .ok_or_else(|| CoreError::not_found("Principal", principal_id))
    }

    /// Removes a principal under an explicit dependent-record policy.
    ///
    /// - `Restrict` fails with InvalidState while the principal still owns
    ///   transactions.
    /// - `Cascade` cancels the principal's pending transactions (returning
    ///   their reserved stock), then removes the ledger history, the
    ///   associations and the ratings together with the principal, all
    ///   under one guard.
    pub fn remove_principal(&self, principal_id: &str, policy: RemovalPolicy) -> CoreResult<()> {
        let mut tables = self.tables.write();

        let record = tables
            .principals
            .get(principal_id)
            .ok_or_else(|| CoreError::not_found("Principal", principal_id))?;
        let handle_key = record.principal.handle.to_lowercase();
        let email_key = record.principal.email.to_lowercase();
        let national_id = record.principal.national_id.clone();

        let owned: Vec<String> = tables
            .transactions
            .values()
            .filter(|t| t.principal_id == principal_id)
            .map(|t| t.id.clone())
            .collect();

        if policy == RemovalPolicy::Restrict && !owned.is_empty() {
            return Err(CoreError::invalid_state(
                "principal",
                principal_id,
                "referenced by the ledger",
                "remove",
            ));
        }

        // Cascade: release stock still reserved by pending transactions,
        // then drop the history.
        let mut released = 0usize;
        for tx_id in &owned {
            let pending_lines = match tables.transactions.get(tx_id) {
                Some(tx) if tx.status == TransactionStatus::Pending => tx.lines.clone(),
                _ => continue,
            };
            for line in &pending_lines {
                let requirements = tables.line_requirements(line);
                tables.release_stock(&requirements);
                released += 1;
            }
        }
        for tx_id in &owned {
            tables.transactions.remove(tx_id);
        }

        tables.associations.remove(principal_id);
        tables
            .ratings
            .retain(|(p, _), _| p != principal_id);

        tables.handle_index.remove(&handle_key);
        tables.email_index.remove(&email_key);
        tables.national_id_index.remove(&national_id);
        tables.principals.remove(principal_id);

        info!(
            principal_id = %principal_id,
            transactions = owned.len(),
            lines_released = released,
            "principal removed"
        );
        Ok(())
    }
}

// =============================================================================
// Credential Hashing
// =============================================================================

/// Hashes a credential for storage.
fn hash_credential(credential: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(credential.as_bytes(), &salt)
        .map_err(|e| CoreError::Internal(format!("failed to hash credential: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a credential against its stored hash.
fn verify_credential(credential: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(credential.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::Store;
    use tally_core::{CoreError, NewPrincipal, PrincipalKind, RemovalPolicy};

    fn new_principal(handle: &str, email: &str, national_id: &str) -> NewPrincipal {
        NewPrincipal {
            kind: PrincipalKind::Client,
            handle: handle.to_string(),
            email: email.to_string(),
            national_id: national_id.to_string(),
            display_name: "Ada Lovelace".to_string(),
            birth_date: None,
            role_id: None,
            credential: "correct horse battery".to_string(),
        }
    }

    #[test]
    fn test_create_and_authenticate() {
        let store = Store::new();
        let identity = store.identity();

        let ada = identity
            .create_principal(new_principal("ada", "ada@example.cl", "11.111.111-1"))
            .unwrap();

        let id = identity
            .authenticate("ada", "correct horse battery")
            .unwrap();
        assert_eq!(id, ada.id);

        assert!(matches!(
            identity.authenticate("ada", "wrong"),
            Err(CoreError::Unauthorized)
        ));
        assert!(matches!(
            identity.authenticate("nobody", "correct horse battery"),
            Err(CoreError::Unauthorized)
        ));
    }

    #[test]
    fn test_duplicate_email_across_subtypes() {
        let store = Store::new();
        let identity = store.identity();

        identity
            .create_principal(new_principal("ada", "ada@example.cl", "11.111.111-1"))
            .unwrap();

        // Same email under a different subtype still collides: one
        // namespace, not two key spaces.
        let mut staff = new_principal("ada2", "ADA@example.cl", "22.222.222-2");
        staff.kind = PrincipalKind::Staff;
        let err = identity.create_principal(staff).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { field, .. } if field == "email"));

        // The first principal stays committed.
        assert!(identity.authenticate("ada", "correct horse battery").is_ok());
    }

    #[test]
    fn test_duplicate_handle_and_national_id() {
        let store = Store::new();
        let identity = store.identity();

        identity
            .create_principal(new_principal("ada", "ada@example.cl", "11.111.111-1"))
            .unwrap();

        let err = identity
            .create_principal(new_principal("Ada", "other@example.cl", "33.333.333-3"))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { field, .. } if field == "handle"));

        let err = identity
            .create_principal(new_principal("grace", "grace@example.cl", "11.111.111-1"))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { field, .. } if field == "national_id"));
    }

    #[test]
    fn test_assign_role() {
        let store = Store::new();
        let identity = store.identity();

        let role = identity.add_role("barista", Some(52_000_000)).unwrap();
        let ada = identity
            .create_principal(new_principal("ada", "ada@example.cl", "11.111.111-1"))
            .unwrap();

        identity.assign_role(&ada.id, &role.id).unwrap();
        assert_eq!(identity.get(&ada.id).unwrap().role_id, Some(role.id));

        assert!(matches!(
            identity.assign_role(&ada.id, "missing"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_frees_natural_keys() {
        let store = Store::new();
        let identity = store.identity();

        let ada = identity
            .create_principal(new_principal("ada", "ada@example.cl", "11.111.111-1"))
            .unwrap();
        identity
            .remove_principal(&ada.id, RemovalPolicy::Restrict)
            .unwrap();

        // The natural keys are reusable after removal.
        assert!(identity
            .create_principal(new_principal("ada", "ada@example.cl", "11.111.111-1"))
            .is_ok());
    }
}
