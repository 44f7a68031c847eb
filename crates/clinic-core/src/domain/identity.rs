//! Verified caller identity.

use serde::Serialize;
use thiserror::Error;

use super::Role;

/// Why a candidate identity was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("subject must not be empty")]
    EmptySubject,
    #[error("role {0} requires an owning document")]
    MissingOwningDocument(Role),
    #[error("role {0} must not carry an owning document")]
    UnexpectedOwningDocument(Role),
}

/// The caller a request acts on behalf of.
///
/// `owning_document` is present exactly when the role is [`Role::Paciente`].
/// The constructor enforces this, so every `Identity` in circulation is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    subject: String,
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    owning_document: Option<String>,
    active: bool,
}

impl Identity {
    /// Build an identity, checking the ownership invariant.
    ///
    /// An empty owning document counts as absent.
    pub fn new(
        subject: impl Into<String>,
        role: Role,
        owning_document: Option<String>,
        active: bool,
    ) -> Result<Self, IdentityError> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(IdentityError::EmptySubject);
        }

        let owning_document = owning_document.filter(|doc| !doc.trim().is_empty());
        match (role.requires_owning_document(), owning_document.is_some()) {
            (true, false) => return Err(IdentityError::MissingOwningDocument(role)),
            (false, true) => return Err(IdentityError::UnexpectedOwningDocument(role)),
            _ => {}
        }

        Ok(Self {
            subject,
            role,
            owning_document,
            active,
        })
    }

    /// Shorthand for a staff identity (no owning document).
    pub fn staff(subject: impl Into<String>, role: Role) -> Result<Self, IdentityError> {
        Self::new(subject, role, None, true)
    }

    /// Shorthand for a patient bound to `document`.
    pub fn patient(
        subject: impl Into<String>,
        document: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        Self::new(subject, Role::Paciente, Some(document.into()), true)
    }

    /// Unique username.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Document number of the single record a patient may read.
    pub fn owning_document(&self) -> Option<&str> {
        self.owning_document.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_requires_document() {
        assert_eq!(
            Identity::new("paciente_juan", Role::Paciente, None, true),
            Err(IdentityError::MissingOwningDocument(Role::Paciente))
        );
        assert_eq!(
            Identity::new("paciente_juan", Role::Paciente, Some("  ".into()), true),
            Err(IdentityError::MissingOwningDocument(Role::Paciente))
        );

        let patient = Identity::patient("paciente_juan", "12345").unwrap();
        assert_eq!(patient.owning_document(), Some("12345"));
        assert_eq!(patient.role(), Role::Paciente);
        assert!(patient.is_active());
    }

    #[test]
    fn test_staff_rejects_document() {
        for role in [Role::Admin, Role::Medico, Role::Admisionista, Role::Resultados] {
            assert_eq!(
                Identity::new("someone", role, Some("12345".into()), true),
                Err(IdentityError::UnexpectedOwningDocument(role))
            );
            assert!(Identity::staff("someone", role).is_ok());
        }
    }

    #[test]
    fn test_empty_subject() {
        assert_eq!(
            Identity::staff("", Role::Admin),
            Err(IdentityError::EmptySubject)
        );
    }

    #[test]
    fn test_serialization_omits_absent_document() {
        let medico = Identity::staff("dr_rodriguez", Role::Medico).unwrap();
        let json = serde_json::to_value(&medico).unwrap();
        assert_eq!(json["subject"], "dr_rodriguez");
        assert_eq!(json["role"], "medico");
        assert!(json.get("owning_document").is_none());
    }
}
