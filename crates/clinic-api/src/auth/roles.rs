//! Role-based access control.
//!
//! Authorization is plain set membership against the named [`RoleSet`]
//! constants. Each endpoint names its set through a [`RolePolicy`] marker
//! type, used with the [`Authorized`](super::Authorized) extractor.

use clinic_core::{Identity, RoleSet};

use super::error::AuthError;

/// Require the caller's role to be in `allowed`.
///
/// # Errors
///
/// [`AuthError::RoleDenied`] (403) listing the allowed roles.
///
/// # Example
///
/// ```
/// use clinic_api::auth::{authorize, AuthError};
/// use clinic_core::{Identity, Role, RoleSet};
///
/// let clerk = Identity::staff("ana", Role::Admisionista).unwrap();
/// assert!(authorize(&clerk, RoleSet::ADMISSIONS).is_ok());
/// assert!(matches!(
///     authorize(&clerk, RoleSet::CLINICIANS),
///     Err(AuthError::RoleDenied { .. })
/// ));
/// ```
pub fn authorize(identity: &Identity, allowed: RoleSet) -> Result<&Identity, AuthError> {
    if allowed.contains(identity.role()) {
        Ok(identity)
    } else {
        Err(AuthError::RoleDenied { required: allowed })
    }
}

/// Compile-time choice of allowed roles for an endpoint.
pub trait RolePolicy: Send + Sync + 'static {
    const ROLES: RoleSet;
    /// Short name used in logs.
    const NAME: &'static str;
}

macro_rules! role_policy {
    ($(#[$meta:meta])* $name:ident => $set:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl RolePolicy for $name {
            const ROLES: RoleSet = $set;
            const NAME: &'static str = stringify!($name);
        }
    };
}

role_policy!(
    /// Administrators only.
    AdminOnly => RoleSet::ADMIN_ONLY
);
role_policy!(
    /// Physicians and administrators.
    Clinicians => RoleSet::CLINICIANS
);
role_policy!(
    /// Admissions clerks and administrators.
    Admissions => RoleSet::ADMISSIONS
);
role_policy!(
    /// Results clerks and administrators.
    Results => RoleSet::RESULTS
);
role_policy!(
    /// Roles allowed to register patients.
    Registrars => RoleSet::REGISTRARS
);
role_policy!(
    /// Any staff role.
    Staff => RoleSet::STAFF
);
role_policy!(
    /// Any authenticated caller, patients included.
    AnyRole => RoleSet::ANY
);

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::Role;

    fn identity(role: Role) -> Identity {
        match role {
            Role::Paciente => Identity::patient("p", "D1").unwrap(),
            staff => Identity::staff("s", staff).unwrap(),
        }
    }

    #[test]
    fn test_membership_table() {
        let cases = [
            (RoleSet::ADMIN_ONLY, vec![Role::Admin]),
            (RoleSet::CLINICIANS, vec![Role::Medico, Role::Admin]),
            (RoleSet::ADMISSIONS, vec![Role::Admisionista, Role::Admin]),
            (RoleSet::RESULTS, vec![Role::Resultados, Role::Admin]),
            (
                RoleSet::REGISTRARS,
                vec![Role::Admisionista, Role::Medico, Role::Admin],
            ),
            (
                RoleSet::STAFF,
                vec![Role::Medico, Role::Admisionista, Role::Resultados, Role::Admin],
            ),
        ];

        for (set, allowed) in cases {
            for role in Role::ALL {
                let caller = identity(role);
                let result = authorize(&caller, set);
                assert_eq!(
                    result.is_ok(),
                    allowed.contains(&role),
                    "{} against {}",
                    role,
                    set
                );
            }
        }
    }

    #[test]
    fn test_patient_never_staff() {
        let patient = identity(Role::Paciente);
        assert!(authorize(&patient, Staff::ROLES).is_err());
        assert!(authorize(&patient, AnyRole::ROLES).is_ok());
    }

    #[test]
    fn test_denial_lists_required_roles() {
        let err = authorize(&identity(Role::Resultados), RoleSet::CLINICIANS).unwrap_err();
        assert!(err.is_denial());
        assert!(err.to_string().contains("admin"));
        assert!(err.to_string().contains("medico"));
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(AdminOnly::NAME, "AdminOnly");
        assert_eq!(Registrars::ROLES, RoleSet::REGISTRARS);
    }
}
