//! Load balancer types and request validation.

use std::fmt;

use crate::state::Iaas;

/// Load balancer flavours bbl knows how to provision.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LbType {
    /// Concourse web (HTTPS) and worker SSH forwarding.
    Concourse,
}

impl LbType {
    /// Name used on the command line and in state files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Concourse => "concourse",
        }
    }

    /// Load balancer types supported on `iaas`, in display order.
    #[must_use]
    pub const fn valid_for(iaas: Iaas) -> &'static [Self] {
        match iaas {
            Iaas::Gcp => &[Self::Concourse],
            Iaas::Aws | Iaas::Azure => &[],
        }
    }

    /// Resolves `name` against the types valid on `iaas`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLbType`] when `name` is not in the valid set.
    pub fn parse_for(iaas: Iaas, name: &str) -> Result<Self, InvalidLbType> {
        let valid = Self::valid_for(iaas);
        valid
            .iter()
            .copied()
            .find(|candidate| candidate.as_str() == name)
            .ok_or_else(|| InvalidLbType {
                requested: name.to_owned(),
                valid: valid
                    .iter()
                    .map(|lb| lb.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl fmt::Display for LbType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A requested LB type outside the provider's valid set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidLbType {
    /// Type named by the caller.
    pub requested: String,
    /// Comma-joined valid types.
    pub valid: String,
}

/// Input for one LB provisioning run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LbRequest {
    /// Requested LB type, as typed by the operator.
    pub lb_type: String,
}

impl LbRequest {
    /// Creates a request for the named LB type.
    #[must_use]
    pub fn new(lb_type: impl Into<String>) -> Self {
        Self {
            lb_type: lb_type.into(),
        }
    }
}
