//! Per-patient record ownership.

use clinic_core::{Identity, Role};

use super::error::AuthError;

/// Whether `identity` may read the record of patient `document`.
///
/// Staff roles see every record. A patient sees only the record whose
/// document number equals the one bound to their account, compared exactly.
pub fn can_access(identity: &Identity, document: &str) -> bool {
    match identity.role() {
        Role::Admin | Role::Medico | Role::Admisionista | Role::Resultados => true,
        Role::Paciente => identity.owning_document() == Some(document),
    }
}

/// [`can_access`] as a 403 on refusal.
///
/// Refusal is never reported as "not found", so a patient cannot probe which
/// document numbers exist.
pub fn authorize_patient(identity: &Identity, document: &str) -> Result<(), AuthError> {
    if can_access(identity, document) {
        Ok(())
    } else {
        Err(AuthError::OwnershipDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_sees_everything() {
        for role in [Role::Admin, Role::Medico, Role::Admisionista, Role::Resultados] {
            let staff = Identity::staff("s", role).unwrap();
            assert!(can_access(&staff, "D1"));
            assert!(can_access(&staff, "D2"));
        }
    }

    #[test]
    fn test_patient_sees_own_record_only() {
        let patient = Identity::patient("paciente_juan", "D1").unwrap();

        assert!(can_access(&patient, "D1"));
        assert!(!can_access(&patient, "D2"));
        assert!(!can_access(&patient, ""));
        assert!(!can_access(&patient, "d1"));
        assert!(!can_access(&patient, "D1 "));
    }

    #[test]
    fn test_refusal_is_forbidden() {
        let patient = Identity::patient("paciente_juan", "D1").unwrap();

        assert!(authorize_patient(&patient, "D1").is_ok());
        let err = authorize_patient(&patient, "D2").unwrap_err();
        assert!(matches!(err, AuthError::OwnershipDenied));
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
