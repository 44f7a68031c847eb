//! Caller roles.
//!
//! Roles are a closed set. A [`RoleSet`] is pure membership: there is no
//! ordering between roles and no role implies another.

use serde::{Deserialize, Serialize, Serializer};

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System administrator
    Admin,
    /// Physician
    Medico,
    /// Admissions clerk
    Admisionista,
    /// Lab results clerk
    Resultados,
    /// Patient, bound to exactly one clinical record
    Paciente,
}

impl Role {
    /// Every role, in display order.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Medico,
        Role::Admisionista,
        Role::Resultados,
        Role::Paciente,
    ];

    /// Wire name of the role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Medico => "medico",
            Role::Admisionista => "admisionista",
            Role::Resultados => "resultados",
            Role::Paciente => "paciente",
        }
    }

    /// Parse a role name (case-insensitive, surrounding whitespace ignored).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "medico" => Some(Role::Medico),
            "admisionista" => Some(Role::Admisionista),
            "resultados" => Some(Role::Resultados),
            "paciente" => Some(Role::Paciente),
            _ => None,
        }
    }

    /// Whether this role is bound to a single patient record.
    pub const fn requires_owning_document(&self) -> bool {
        matches!(self, Role::Paciente)
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of roles allowed to perform an operation.
///
/// Privileged sets are spelled out role by role. Adding a new role to a
/// privileged class means updating every constant below that should include it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    /// No role at all.
    pub const EMPTY: RoleSet = RoleSet(0);

    /// Every role, patients included.
    pub const ANY: RoleSet = RoleSet::of(&Role::ALL);

    /// Administrators only.
    pub const ADMIN_ONLY: RoleSet = RoleSet::of(&[Role::Admin]);

    /// Physicians and administrators.
    pub const CLINICIANS: RoleSet = RoleSet::of(&[Role::Medico, Role::Admin]);

    /// Admissions clerks and administrators.
    pub const ADMISSIONS: RoleSet = RoleSet::of(&[Role::Admisionista, Role::Admin]);

    /// Results clerks and administrators.
    pub const RESULTS: RoleSet = RoleSet::of(&[Role::Resultados, Role::Admin]);

    /// Roles allowed to register a new patient record.
    pub const REGISTRARS: RoleSet = RoleSet::of(&[Role::Admisionista, Role::Medico, Role::Admin]);

    /// All staff. Used for list, search and bulk operations patients must not reach.
    pub const STAFF: RoleSet = RoleSet::of(&[
        Role::Medico,
        Role::Admisionista,
        Role::Resultados,
        Role::Admin,
    ]);

    /// Build a set from an explicit list of roles.
    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        RoleSet(bits)
    }

    /// Membership test.
    pub const fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    /// Set union.
    #[must_use]
    pub const fn union(self, other: RoleSet) -> Self {
        RoleSet(self.0 | other.0)
    }

    /// Copy of this set with one more role.
    #[must_use]
    pub const fn with(self, role: Role) -> Self {
        RoleSet(self.0 | role.bit())
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in [`Role::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::EMPTY, RoleSet::with)
    }
}

impl std::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

impl std::fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for RoleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
